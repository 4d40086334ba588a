#![allow(clippy::unwrap_used, clippy::expect_used)]

//! Build, check, sync and publish through the dispatcher.

use crate::helpers::class_builder::{ACC_FINAL, ACC_PUBLIC, ACC_SUPER, ClassBuilder, MemberSpec};
use crate::helpers::read_file;
use apidump::base::Platform;
use apidump::{
    ApiCheckConfig, ApiError, ApiTarget, BuildOutcome, CheckOutcome, build_all, build_api,
    check_api, compare, publish_api, sync_api,
};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn foo(with_baz: bool) -> ClassBuilder {
    let class = ClassBuilder::new("demo/Foo", ACC_PUBLIC | ACC_FINAL | ACC_SUPER)
        .default_constructor()
        .method(MemberSpec::new(ACC_PUBLIC, "bar", "()V"));
    if with_baz {
        class.method(MemberSpec::new(ACC_PUBLIC, "baz", "()Ljava/lang/String;"))
    } else {
        class
    }
}

/// Compile "version" `with_baz` of the module into `<root>/classes`.
fn compile(root: &Path, with_baz: bool) -> PathBuf {
    let classes = root.join("classes");
    if classes.exists() {
        std::fs::remove_dir_all(&classes).unwrap();
    }
    foo(with_baz).write_to(&classes);
    classes
}

fn jvm_target(classes: &Path) -> ApiTarget {
    ApiTarget::new("jvm", Platform::Jvm, "demo-lib").with_primary(classes)
}

#[test]
fn test_build_is_deterministic() {
    let tmp = TempDir::new().unwrap();
    let target = jvm_target(&compile(tmp.path(), true));
    let first = tmp.path().join("first");
    let second = tmp.path().join("second");

    assert_eq!(build_api(&target, &first).unwrap(), BuildOutcome::Built { files: 1 });
    assert_eq!(build_api(&target, &second).unwrap(), BuildOutcome::Built { files: 1 });
    compare(&first, &second, "determinism").unwrap();
    assert_eq!(
        read_file(&first.join("demo-lib.api")),
        read_file(&second.join("demo-lib.api"))
    );
}

#[test]
fn test_added_function_fails_check_with_diff() {
    let tmp = TempDir::new().unwrap();
    let config = ApiCheckConfig::new();
    let project = tmp.path().join("project");
    let build_root = tmp.path().join("build");

    let target = jvm_target(&compile(tmp.path(), false));
    let generated = config.build_dir(&build_root, &target);
    let baseline = config.baseline_dir(&project, &target);
    build_api(&target, &generated).unwrap();
    assert_eq!(sync_api(&generated, &baseline).unwrap(), 1);
    assert_eq!(
        check_api(&target, &baseline, &generated).unwrap(),
        CheckOutcome::Passed
    );

    compile(tmp.path(), true);
    let CheckOutcome::Failed { report } = check_api(&target, &baseline, &generated).unwrap() else {
        panic!("expected the check to fail");
    };
    assert!(
        report.starts_with("API check failed for target 'jvm' of module 'demo-lib'."),
        "{report}"
    );
    assert!(report.contains("\nFiles are different.\n"), "{report}");
    assert!(
        report.contains("\n+        public final fun baz(): java.lang.String\n"),
        "{report}"
    );
    assert!(!report.contains("Missing files"), "{report}");
}

#[test]
fn test_surface_becoming_non_public_reports_removed_declarations() {
    let tmp = TempDir::new().unwrap();
    let project = tmp.path().join("project");
    let config = ApiCheckConfig::new();
    let target = jvm_target(&compile(tmp.path(), false));
    let generated = config.build_dir(&tmp.path().join("build"), &target);
    let baseline = config.baseline_dir(&project, &target);
    build_api(&target, &generated).unwrap();
    sync_api(&generated, &baseline).unwrap();

    let classes = tmp.path().join("classes");
    std::fs::remove_dir_all(&classes).unwrap();
    ClassBuilder::new("demo/Foo", ACC_FINAL | ACC_SUPER)
        .default_constructor()
        .write_to(&classes);

    let CheckOutcome::Failed { report } = check_api(&target, &baseline, &generated).unwrap() else {
        panic!("expected the check to fail");
    };
    assert!(!report.contains("Missing files"), "{report}");
    assert!(report.contains("\nFiles are different.\n"), "{report}");
    assert!(report.contains("\n-        public final fun bar(): Unit\n"), "{report}");
    assert_eq!(read_file(&generated.join("demo-lib.api")).as_deref(), Some(""));
}

#[test]
fn test_missing_baseline_directory_is_an_error() {
    let tmp = TempDir::new().unwrap();
    let target = jvm_target(&compile(tmp.path(), false));
    let err = check_api(&target, &tmp.path().join("api/jvm"), &tmp.path().join("out")).unwrap_err();
    assert!(matches!(err, ApiError::Compare(_)));
    assert!(err.to_string().contains("does not exist"), "{err}");
}

#[test]
fn test_target_without_artifacts_checks_against_empty_baseline() {
    let tmp = TempDir::new().unwrap();
    let target = ApiTarget::new("linuxX64", Platform::Native, "demo-lib")
        .with_primary(tmp.path().join("never-built.klib"));
    let baseline = tmp.path().join("api/linuxX64");
    std::fs::create_dir_all(&baseline).unwrap();

    assert_eq!(
        check_api(&target, &baseline, &tmp.path().join("out")).unwrap(),
        CheckOutcome::Passed
    );
}

#[test]
fn test_publish_copies_generated_tree() {
    let tmp = TempDir::new().unwrap();
    let config = ApiCheckConfig::new().include(&["demo-lib"]);
    let target = jvm_target(&compile(tmp.path(), true));
    let generated = config.build_dir(&tmp.path().join("build"), &target);
    build_api(&target, &generated).unwrap();

    let published = config.publish_dir(&tmp.path().join("root-build"), "demo-lib", &target);
    assert_eq!(publish_api(&generated, &published).unwrap(), 1);
    compare(&generated, &published, "publication").unwrap();
    assert!(published.ends_with("api/demo-lib/jvm"));
}

#[test]
fn test_build_all_writes_one_directory_per_target() {
    let tmp = TempDir::new().unwrap();
    let classes = compile(tmp.path(), true);
    let targets = vec![
        jvm_target(&classes),
        ApiTarget::new("", Platform::Js, "demo-lib").with_primary(tmp.path().join("js")),
        ApiTarget::new("ios", Platform::Native, "demo-lib").disabled(),
    ];
    let out = tmp.path().join("api");

    let results = build_all(&targets, &out).unwrap();
    let outcomes: Vec<(&str, &BuildOutcome)> = results
        .iter()
        .map(|(name, result)| (name.as_str(), result.as_ref().unwrap()))
        .collect();
    assert_eq!(
        outcomes,
        vec![
            ("jvm", &BuildOutcome::Built { files: 1 }),
            ("", &BuildOutcome::Built { files: 0 }),
            ("ios", &BuildOutcome::Skipped),
        ]
    );
    assert!(out.join("jvm/demo-lib.api").is_file());
    assert!(out.join("js").is_dir());
    assert!(!out.join("ios").exists());
}
