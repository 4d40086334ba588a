#![allow(clippy::unwrap_used, clippy::expect_used)]

//! Native extraction from klibs.

use crate::helpers::fragment_builder::{ClassSpec, FragmentBuilder, FunctionSpec};
use crate::helpers::klib_builder::KlibBuilder;
use apidump::base::Platform;
use apidump::metadata::Dialect;
use apidump::model::Visibility;
use apidump::{ExtractionError, ExtractionInput, extract, render};
use rstest::rstest;
use tempfile::TempDir;

fn core_library() -> KlibBuilder {
    let fragment = FragmentBuilder::new(Dialect::Klib, "org.demo")
        .function(FunctionSpec::new("answer", "kotlin.Int"))
        .function(FunctionSpec::new("internalHelper", "kotlin.Unit").visibility(Visibility::Internal))
        .class(ClassSpec::new("Engine").visibility(Visibility::Internal).published())
        .build();
    KlibBuilder::new("org.demo:core")
        .target("linux_x64")
        .fragment("org.demo", fragment)
}

const CORE_API: &str = "\
package org.demo {
    public final fun answer(): kotlin.Int
    @PublishedApi internal final class org.demo.Engine {
    }
}

";

#[rstest]
#[case::packed(true)]
#[case::unpacked(false)]
fn test_library_rendering(#[case] packed: bool) {
    let tmp = TempDir::new().unwrap();
    let library = core_library();
    let path = if packed {
        library.write_packed(tmp.path(), "core.klib")
    } else {
        library.write_unpacked(tmp.path(), "core")
    };
    let input = ExtractionInput::new("core")
        .with_primary(path)
        .with_native_target("linux_x64");

    let files = render(&extract(Platform::Native, &input).unwrap());
    assert_eq!(files.keys().collect::<Vec<_>>(), vec!["org.demo_core.api"]);
    assert_eq!(files["org.demo_core.api"], CORE_API);
}

#[test]
fn test_dependencies_resolved_by_unique_name() {
    let tmp = TempDir::new().unwrap();
    let primary = core_library()
        .depends_on("org.demo:base")
        .write_packed(tmp.path(), "core.klib");
    let base = KlibBuilder::new("org.demo:base")
        .depends_on("stdlib")
        .write_packed(tmp.path(), "base-1.0.klib");
    let stdlib = KlibBuilder::new("stdlib").write_unpacked(tmp.path(), "klib-stdlib");

    let input = ExtractionInput::new("core")
        .with_primary(&primary)
        .with_dependency(&base)
        .with_dependency(&stdlib)
        .with_native_target("linux_x64");
    let module = extract(Platform::Native, &input).unwrap();
    assert_eq!(module.units(), vec!["org.demo:core"]);

    let missing_stdlib = ExtractionInput::new("core")
        .with_primary(&primary)
        .with_dependency(&base)
        .with_native_target("linux_x64");
    let err = extract(Platform::Native, &missing_stdlib).unwrap_err();
    assert_eq!(
        err.to_string(),
        "Unresolved dependency 'stdlib'; candidates considered: [org.demo:base]"
    );
}

#[rstest]
#[case(None)]
#[case(Some("   "))]
fn test_missing_target_rejected(#[case] target: Option<&str>) {
    let tmp = TempDir::new().unwrap();
    let path = core_library().write_packed(tmp.path(), "core.klib");
    let mut input = ExtractionInput::new("core").with_primary(path);
    input.parameters.native_target = target.map(str::to_string);

    let err = extract(Platform::Native, &input).unwrap_err();
    assert!(matches!(
        err,
        ExtractionError::MissingTargetIdentifier { requested: None }
    ));
}

#[test]
fn test_missing_target_without_library_is_empty() {
    let tmp = TempDir::new().unwrap();
    let input = ExtractionInput::new("core").with_primary(tmp.path().join("absent.klib"));
    let module = extract(Platform::Native, &input).unwrap();
    assert!(module.is_empty());
}
