#![allow(clippy::unwrap_used, clippy::expect_used)]

//! Directory comparison over generated API trees.

use crate::helpers::write_file;
use apidump::{CompareError, DirectoryRole, compare};
use rstest::rstest;
use tempfile::TempDir;

const API: &str = "package demo {\n    public final fun answer(): kotlin.Int\n}\n\n";

fn tree(root: &std::path::Path, files: &[(&str, &str)]) {
    std::fs::create_dir_all(root).unwrap();
    for (name, text) in files {
        write_file(&root.join(name), text);
    }
}

#[test]
fn test_directory_equals_itself() {
    let tmp = TempDir::new().unwrap();
    let dir = tmp.path().join("api");
    tree(&dir, &[("a.api", API), ("nested/b.api", API)]);
    compare(&dir, &dir, "target 'jvm'").unwrap();
}

#[rstest]
#[case::crlf("\r\n")]
#[case::cr("\r")]
fn test_line_endings_ignored(#[case] ending: &str) {
    let tmp = TempDir::new().unwrap();
    let expected = tmp.path().join("expected");
    let actual = tmp.path().join("actual");
    tree(&expected, &[("a.api", &API.replace('\n', ending))]);
    tree(&actual, &[("a.api", API)]);
    compare(&expected, &actual, "target 'jvm'").unwrap();
}

#[test]
fn test_file_sets_reported_completely() {
    let tmp = TempDir::new().unwrap();
    let expected = tmp.path().join("expected");
    let actual = tmp.path().join("actual");
    tree(
        &expected,
        &[("shared.api", API), ("gone-1.api", API), ("gone-2.api", API)],
    );
    tree(&actual, &[("shared.api", API), ("new.api", API)]);

    let CompareError::ApiMismatch(mismatch) = compare(&expected, &actual, "target 'js'").unwrap_err()
    else {
        panic!("expected a mismatch");
    };
    assert_eq!(mismatch.missing_files, vec!["gone-1.api", "gone-2.api"]);
    assert_eq!(mismatch.extra_files, vec!["new.api"]);
    assert!(mismatch.diffs.is_empty());
    assert_eq!(
        mismatch.report(),
        "API check failed for target 'js'.\n\
         Missing files: [gone-1.api, gone-2.api]\n\
         Extra files: [new.api]"
    );
}

#[test]
fn test_missing_directories_named_by_role() {
    let tmp = TempDir::new().unwrap();
    let present = tmp.path().join("present");
    tree(&present, &[]);
    let absent = tmp.path().join("absent");

    match compare(&absent, &present, "x").unwrap_err() {
        CompareError::DirectoryMissing { which, path } => {
            assert_eq!(which, DirectoryRole::Expected);
            assert_eq!(path, absent);
        }
        other => panic!("unexpected error: {other}"),
    }
    match compare(&present, &absent, "x").unwrap_err() {
        CompareError::DirectoryMissing { which, .. } => assert_eq!(which, DirectoryRole::Actual),
        other => panic!("unexpected error: {other}"),
    }
}
