#![allow(clippy::unwrap_used, clippy::expect_used)]

//! JVM extraction from class directories and jars.

use crate::helpers::class_builder::*;
use apidump::base::Platform;
use apidump::metadata::wire::ProtoWriter;
use apidump::metadata::FlagsBuilder;
use apidump::model::{ClassKind, Modality, Visibility};
use apidump::{ExtractionInput, extract, render};
use rstest::rstest;
use std::path::Path;
use tempfile::TempDir;

const MODULE: &str = "demo-lib";

fn render_jvm(paths: &[&Path]) -> String {
    let input = paths
        .iter()
        .fold(ExtractionInput::new(MODULE), |input, path| input.with_primary(*path));
    let module = extract(Platform::Jvm, &input).unwrap();
    render(&module)
        .remove(&format!("{MODULE}.api"))
        .unwrap_or_default()
}

fn foo_class() -> ClassBuilder {
    ClassBuilder::new("demo/Foo", ACC_PUBLIC | ACC_FINAL | ACC_SUPER)
        .default_constructor()
        .method(MemberSpec::new(ACC_PUBLIC, "bar", "(I)V").parameters(&["x"]))
        .method(MemberSpec::new(ACC_PRIVATE, "secret", "()V"))
        .method(MemberSpec::new(0, "packageLocal", "()Ljava/lang/String;"))
}

/// Class payload for `d1`: empty string table types, then `Class`.
fn class_payload(flags: i32) -> Vec<u8> {
    let mut payload = ProtoWriter::new().finish_delimited();
    payload.extend(ProtoWriter::new().int32(1, flags).int32(3, 0).finish());
    payload
}

#[test]
fn test_plain_class_rendering() {
    let tmp = TempDir::new().unwrap();
    foo_class().write_to(tmp.path());

    let expected = "\
package demo {
    public final class demo.Foo {
        public constructor()
        public final fun bar(x: Int): Unit
    }
}

";
    assert_eq!(render_jvm(&[tmp.path()]), expected);
}

#[test]
fn test_directory_and_jar_render_identically() {
    let tmp = TempDir::new().unwrap();
    let classes = tmp.path().join("classes");
    foo_class().write_to(&classes);
    let jar = write_jar(&tmp.path().join("demo.jar"), &[foo_class()]);

    let from_dir = render_jvm(&[&classes]);
    assert!(!from_dir.is_empty());
    assert_eq!(from_dir, render_jvm(&[&jar]));
    assert_eq!(from_dir, render_jvm(&[&classes]));
}

#[test]
fn test_local_and_compiler_generated_classes_excluded() {
    let tmp = TempDir::new().unwrap();
    foo_class().write_to(tmp.path());
    ClassBuilder::new("demo/Foo$bar$1", ACC_PUBLIC | ACC_FINAL | ACC_SUPER)
        .anonymous_in("demo/Foo")
        .default_constructor()
        .write_to(tmp.path());
    ClassBuilder::new("demo/Foo$1Helper", ACC_PUBLIC | ACC_FINAL | ACC_SUPER)
        .local_in("demo/Foo", "bar", "(I)V")
        .default_constructor()
        .write_to(tmp.path());
    ClassBuilder::new(
        "demo/Foo$WhenMappings",
        ACC_PUBLIC | ACC_FINAL | ACC_SUPER | ACC_SYNTHETIC,
    )
    .write_to(tmp.path());

    let text = render_jvm(&[tmp.path()]);
    assert!(text.contains("public final class demo.Foo {"));
    assert!(!text.contains("bar$1"), "{text}");
    assert!(!text.contains("Helper"), "{text}");
    assert!(!text.contains("WhenMappings"), "{text}");
}

#[test]
fn test_nested_class_follows_outer() {
    let tmp = TempDir::new().unwrap();
    foo_class().write_to(tmp.path());
    ClassBuilder::new("demo/Foo$Inner", ACC_PUBLIC | ACC_FINAL | ACC_SUPER)
        .nested_in("demo/Foo", "Inner", ACC_PUBLIC | ACC_STATIC | ACC_FINAL)
        .write_to(tmp.path());
    ClassBuilder::new("demo/Foo$Hidden", ACC_SUPER)
        .nested_in("demo/Foo", "Hidden", ACC_PRIVATE | ACC_STATIC)
        .write_to(tmp.path());

    let text = render_jvm(&[tmp.path()]);
    assert!(
        text.contains("        public final static class demo.Foo$Inner {"),
        "{text}"
    );
    assert!(!text.contains("Hidden"), "{text}");
}

#[test]
fn test_published_internal_class_included() {
    let tmp = TempDir::new().unwrap();
    let internal = FlagsBuilder::new()
        .visibility(Visibility::Internal)
        .modality(Modality::Final)
        .class_kind(ClassKind::Class)
        .build();
    ClassBuilder::new("demo/Exposed", ACC_PUBLIC | ACC_FINAL | ACC_SUPER)
        .published()
        .kotlin_metadata(1, &class_payload(internal.0), &["demo/Exposed"])
        .write_to(tmp.path());
    ClassBuilder::new("demo/Secret", ACC_PUBLIC | ACC_FINAL | ACC_SUPER)
        .kotlin_metadata(1, &class_payload(internal.0), &["demo/Secret"])
        .write_to(tmp.path());

    let expected = "\
package demo {
    @PublishedApi internal final class demo.Exposed {
    }
}

";
    assert_eq!(render_jvm(&[tmp.path()]), expected);
}

#[test]
fn test_internal_facade_function_hidden() {
    let tmp = TempDir::new().unwrap();
    let public = FlagsBuilder::new()
        .visibility(Visibility::Public)
        .modality(Modality::Final)
        .build();
    let internal = FlagsBuilder::new()
        .visibility(Visibility::Internal)
        .modality(Modality::Final)
        .build();
    let unit = ProtoWriter::new().int32(6, 2);
    let function = |flags: i32, name: i32| {
        ProtoWriter::new()
            .int32(9, flags)
            .int32(2, name)
            .message(3, unit.clone())
    };
    let mut payload = ProtoWriter::new().finish_delimited();
    payload.extend(
        ProtoWriter::new()
            .message(3, function(public.0, 0))
            .message(3, function(internal.0, 1))
            .finish(),
    );

    ClassBuilder::new("demo/UtilsKt", ACC_PUBLIC | ACC_FINAL | ACC_SUPER)
        .method(MemberSpec::new(ACC_PUBLIC | ACC_STATIC | ACC_FINAL, "visible", "()V"))
        .method(MemberSpec::new(ACC_PUBLIC | ACC_STATIC | ACC_FINAL, "hidden", "()V"))
        .kotlin_metadata(2, &payload, &["visible", "hidden", "kotlin/Unit"])
        .write_to(tmp.path());

    let text = render_jvm(&[tmp.path()]);
    assert!(text.contains("public final class demo.UtilsKt {"), "{text}");
    assert!(text.contains("public final static fun visible(): Unit"), "{text}");
    assert!(!text.contains("hidden"), "{text}");
}

fn flags(visibility: Visibility) -> FlagsBuilder {
    FlagsBuilder::new()
        .visibility(visibility)
        .modality(Modality::Final)
}

/// JVM name and descriptor, as `d2` indices.
fn jvm_member(name: i32, desc: i32) -> ProtoWriter {
    ProtoWriter::new().int32(1, name).int32(2, desc)
}

/// Class payload with a companion reference and properties.
fn class_with_properties(
    flags: i32,
    companion: Option<i32>,
    properties: Vec<ProtoWriter>,
) -> Vec<u8> {
    let mut class = ProtoWriter::new().int32(1, flags).int32(3, 0);
    if let Some(companion) = companion {
        class = class.int32(4, companion);
    }
    for property in properties {
        class = class.message(10, property);
    }
    let mut payload = ProtoWriter::new().finish_delimited();
    payload.extend(class.finish());
    payload
}

#[rstest]
#[case::public_setter(ACC_PUBLIC | ACC_FINAL, Visibility::Public, "{ get; set; }")]
#[case::private_setter(ACC_PRIVATE | ACC_FINAL, Visibility::Private, "{ get; }")]
fn test_kotlin_property_rendered_once(
    #[case] setter_access: u16,
    #[case] setter_visibility: Visibility,
    #[case] accessors: &str,
) {
    let tmp = TempDir::new().unwrap();
    let count = ProtoWriter::new()
        .int32(11, flags(Visibility::Public).bit(8).bit(9).bit(10).build().0)
        .int32(2, 1)
        .int32(8, flags(setter_visibility).bit(6).build().0)
        .message(
            100,
            ProtoWriter::new()
                .message(1, jvm_member(1, 6))
                .message(3, jvm_member(2, 3))
                .message(4, jvm_member(4, 5)),
        );
    let class_flags = flags(Visibility::Public).class_kind(ClassKind::Class).build();
    ClassBuilder::new("demo/Counter", ACC_PUBLIC | ACC_FINAL | ACC_SUPER)
        .field(MemberSpec::new(ACC_PRIVATE, "count", "I"))
        .default_constructor()
        .method(MemberSpec::new(ACC_PUBLIC | ACC_FINAL, "getCount", "()I"))
        .method(MemberSpec::new(setter_access, "setCount", "(I)V").parameters(&["value"]))
        .kotlin_metadata(
            1,
            &class_with_properties(class_flags.0, None, vec![count]),
            &["demo/Counter", "count", "getCount", "()I", "setCount", "(I)V", "I"],
        )
        .write_to(tmp.path());

    let expected = format!(
        "\
package demo {{
    public final class demo.Counter {{
        public final var count: Int {accessors}
        public constructor()
    }}
}}

"
    );
    assert_eq!(render_jvm(&[tmp.path()]), expected);
}

/// `demo.Config` with a `@JvmField val tag`, and a companion declaring
/// `const val MAX`.
fn write_config(root: &Path, companion_visibility: Visibility) {
    let tag = ProtoWriter::new()
        .int32(11, flags(Visibility::Public).bit(9).build().0)
        .int32(2, 2)
        .message(100, ProtoWriter::new().message(1, jvm_member(2, 3)));
    let class_flags = flags(Visibility::Public).class_kind(ClassKind::Class).build();
    ClassBuilder::new("demo/Config", ACC_PUBLIC | ACC_FINAL | ACC_SUPER)
        .field(MemberSpec::new(ACC_PUBLIC | ACC_FINAL, "tag", "Ljava/lang/String;"))
        .field(MemberSpec::new(
            ACC_PUBLIC | ACC_STATIC | ACC_FINAL,
            "Companion",
            "Ldemo/Config$Companion;",
        ))
        .field(MemberSpec::new(ACC_PUBLIC | ACC_STATIC | ACC_FINAL, "MAX", "I"))
        .default_constructor()
        .kotlin_metadata(
            1,
            &class_with_properties(class_flags.0, Some(1), vec![tag]),
            &["demo/Config", "Companion", "tag", "Ljava/lang/String;"],
        )
        .write_to(root);

    let max = ProtoWriter::new()
        .int32(11, flags(Visibility::Public).bit(11).build().0)
        .int32(2, 1)
        .message(100, ProtoWriter::new().message(1, jvm_member(1, 2)));
    let companion_flags = flags(companion_visibility)
        .class_kind(ClassKind::CompanionObject)
        .build();
    ClassBuilder::new("demo/Config$Companion", ACC_PUBLIC | ACC_FINAL | ACC_SUPER)
        .nested_in("demo/Config", "Companion", ACC_PUBLIC | ACC_STATIC | ACC_FINAL)
        .method(MemberSpec::new(ACC_PRIVATE, "<init>", "()V"))
        .kotlin_metadata(
            1,
            &class_with_properties(companion_flags.0, None, vec![max]),
            &["demo/Config.Companion", "MAX", "I"],
        )
        .write_to(root);
}

#[test]
fn test_companion_field_and_constants_in_outer_class() {
    let tmp = TempDir::new().unwrap();
    write_config(tmp.path(), Visibility::Public);

    let text = render_jvm(&[tmp.path()]);
    for line in [
        "        public final static val Companion: demo.Config$Companion { field; }\n",
        "        public final static const val MAX: Int { field; }\n",
        "        public final val tag: java.lang.String { field; }\n",
    ] {
        assert!(text.contains(line), "missing {line:?} in\n{text}");
    }
    assert!(text.contains("companion object demo.Config$Companion {"), "{text}");
    assert_eq!(text.matches("MAX").count(), 1, "{text}");
    assert_eq!(text.matches("tag").count(), 1, "{text}");
}

#[test]
fn test_companion_field_hidden_with_internal_companion() {
    let tmp = TempDir::new().unwrap();
    write_config(tmp.path(), Visibility::Internal);

    let text = render_jvm(&[tmp.path()]);
    assert!(text.contains("public final val tag: java.lang.String { field; }"), "{text}");
    assert!(!text.contains("Companion"), "{text}");
}

#[test]
fn test_multi_file_facade_takes_visibility_from_parts() {
    let tmp = TempDir::new().unwrap();
    let unit = ProtoWriter::new().int32(6, 2);
    let function = |visibility: Visibility, name: i32| {
        ProtoWriter::new()
            .int32(9, flags(visibility).build().0)
            .int32(2, name)
            .message(3, unit.clone())
    };
    let mut part = ProtoWriter::new().finish_delimited();
    part.extend(
        ProtoWriter::new()
            .message(3, function(Visibility::Public, 0))
            .message(3, function(Visibility::Internal, 1))
            .finish(),
    );
    let statics = |class: ClassBuilder| {
        class
            .method(MemberSpec::new(ACC_PUBLIC | ACC_STATIC | ACC_FINAL, "visible", "()V"))
            .method(MemberSpec::new(ACC_PUBLIC | ACC_STATIC | ACC_FINAL, "hidden", "()V"))
    };

    statics(ClassBuilder::new("demo/UtilsKt", ACC_PUBLIC | ACC_FINAL | ACC_SUPER))
        .kotlin_metadata(4, &[], &["demo/UtilsKt__AKt"])
        .write_to(tmp.path());
    statics(ClassBuilder::new(
        "demo/UtilsKt__AKt",
        ACC_FINAL | ACC_SUPER | ACC_SYNTHETIC,
    ))
    .kotlin_metadata(5, &part, &["visible", "hidden", "kotlin/Unit"])
    .metadata_extra_string("demo/UtilsKt")
    .write_to(tmp.path());

    let expected = "\
package demo {
    public final class demo.UtilsKt {
        public final static fun visible(): Unit
    }
}

";
    assert_eq!(render_jvm(&[tmp.path()]), expected);
}

#[test]
fn test_default_impls_excluded_only_with_synthetic_header() {
    let tmp = TempDir::new().unwrap();
    for (outer, synthetic) in [("demo/Shape", true), ("demo/Plain", false)] {
        ClassBuilder::new(outer, ACC_PUBLIC | ACC_INTERFACE | ACC_ABSTRACT)
            .method(MemberSpec::new(ACC_PUBLIC | ACC_ABSTRACT, "area", "()I"))
            .write_to(tmp.path());
        let default_impls = ClassBuilder::new(
            &format!("{outer}$DefaultImpls"),
            ACC_PUBLIC | ACC_FINAL | ACC_SUPER,
        )
        .nested_in(outer, "DefaultImpls", ACC_PUBLIC | ACC_STATIC | ACC_FINAL)
        .method(MemberSpec::new(
            ACC_PUBLIC | ACC_STATIC,
            "describe",
            &format!("(L{outer};)Ljava/lang/String;"),
        ));
        let default_impls = if synthetic {
            default_impls.kotlin_metadata(3, &[], &[])
        } else {
            default_impls
        };
        default_impls.write_to(tmp.path());
    }

    let text = render_jvm(&[tmp.path()]);
    assert_eq!(text.matches("fun area(): Int").count(), 2, "{text}");
    assert!(text.contains("class demo.Plain$DefaultImpls {"), "{text}");
    assert!(!text.contains("demo.Shape$DefaultImpls"), "{text}");
    assert!(!text.contains("describe(demo.Shape)"), "{text}");
}

#[test]
fn test_class_without_public_api_renders_empty_file() {
    let tmp = TempDir::new().unwrap();
    ClassBuilder::new("demo/Hidden", ACC_FINAL | ACC_SUPER)
        .default_constructor()
        .write_to(tmp.path());

    let input = ExtractionInput::new(MODULE).with_primary(tmp.path());
    let module = extract(Platform::Jvm, &input).unwrap();
    assert!(module.is_empty());
    let files = render(&module);
    assert_eq!(files.keys().collect::<Vec<_>>(), vec!["demo-lib.api"]);
    assert_eq!(files["demo-lib.api"], "");
}

#[test]
fn test_missing_artifacts_yield_empty_output() {
    let tmp = TempDir::new().unwrap();
    let input = ExtractionInput::new(MODULE).with_primary(tmp.path().join("absent"));
    let module = extract(Platform::Jvm, &input).unwrap();
    assert!(module.is_empty());
    assert!(render(&module).is_empty());
}

#[test]
fn test_corrupt_class_names_its_file() {
    let tmp = TempDir::new().unwrap();
    std::fs::write(tmp.path().join("Broken.class"), [0xCA, 0xFE, 0x00]).unwrap();
    let input = ExtractionInput::new(MODULE).with_primary(tmp.path());
    let err = extract(Platform::Jvm, &input).unwrap_err();
    assert!(err.to_string().contains("Broken.class"), "{err}");
}
