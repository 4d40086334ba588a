//! Directory comparator: expected (baseline) against actual (generated).
//!
//! ```text
//! expected/ ─┐  relative file sets ──> missing / extra
//!            ├─
//! actual/   ─┘  shared files, line by line ──> unified diffs
//! ```
//!
//! Lines are compared with line endings normalized, so a baseline checked
//! out with CRLF endings still matches LF output. Every difference is
//! collected before failing; a report is never truncated.

mod error;

pub use error::{CompareError, DirectoryRole};

use similar::TextDiff;
use std::collections::BTreeSet;
use std::fmt;
use std::fs;
use std::path::Path;
use tracing::{debug, info};
use walkdir::WalkDir;

/// Context lines around each changed region.
pub const DIFF_CONTEXT_LINES: usize = 3;

/// A unified diff of one shared file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileDiff {
    /// `/`-separated path relative to both roots
    pub path: String,
    pub diff: String,
}

/// Everything that differs between two API directories.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApiMismatch {
    /// What was checked, e.g. a target name
    pub subject: String,
    /// In expected but not actual
    pub missing_files: Vec<String>,
    /// In actual but not expected
    pub extra_files: Vec<String>,
    pub diffs: Vec<FileDiff>,
}

impl ApiMismatch {
    pub fn new(subject: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.missing_files.is_empty() && self.extra_files.is_empty() && self.diffs.is_empty()
    }

    /// The human-readable report.
    pub fn report(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for ApiMismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "API check failed for {}.", self.subject)?;
        if !self.missing_files.is_empty() {
            write!(f, "\nMissing files: [{}]", self.missing_files.join(", "))?;
        }
        if !self.extra_files.is_empty() {
            write!(f, "\nExtra files: [{}]", self.extra_files.join(", "))?;
        }
        if !self.diffs.is_empty() {
            let diffs: Vec<&str> = self.diffs.iter().map(|d| d.diff.as_str()).collect();
            write!(f, "\nFiles are different.\n{}", diffs.join("\n"))?;
        }
        Ok(())
    }
}

/// Compare two directories.
///
/// Fails with [`CompareError::DirectoryMissing`] before reading any
/// content, and with [`CompareError::ApiMismatch`] when anything differs.
pub fn compare(expected_dir: &Path, actual_dir: &Path, subject: &str) -> Result<(), CompareError> {
    for (which, path) in [
        (DirectoryRole::Expected, expected_dir),
        (DirectoryRole::Actual, actual_dir),
    ] {
        if !path.is_dir() {
            return Err(CompareError::DirectoryMissing {
                which,
                path: path.to_path_buf(),
            });
        }
    }
    info!(
        expected = %expected_dir.display(),
        actual = %actual_dir.display(),
        "comparing API directories"
    );

    let expected_files = relative_files(expected_dir)?;
    let actual_files = relative_files(actual_dir)?;

    let mut mismatch = ApiMismatch::new(subject);
    mismatch.missing_files = expected_files.difference(&actual_files).cloned().collect();
    mismatch.extra_files = actual_files.difference(&expected_files).cloned().collect();

    for relative in expected_files.intersection(&actual_files) {
        let expected_path = expected_dir.join(relative);
        let actual_path = actual_dir.join(relative);
        let expected = read_text(&expected_path)?;
        let actual = read_text(&actual_path)?;
        if let Some(diff) = diff_text(
            &expected_path.display().to_string(),
            &actual_path.display().to_string(),
            &expected,
            &actual,
        ) {
            debug!(file = %relative, "API file differs");
            mismatch.diffs.push(FileDiff {
                path: relative.clone(),
                diff,
            });
        }
    }

    if mismatch.is_empty() {
        Ok(())
    } else {
        Err(CompareError::ApiMismatch(mismatch))
    }
}

/// Unified diff of two texts, or `None` when their lines are equal.
pub fn diff_text(expected_name: &str, actual_name: &str, expected: &str, actual: &str) -> Option<String> {
    let expected = normalize_line_endings(expected);
    let actual = normalize_line_endings(actual);
    if expected == actual {
        return None;
    }
    let diff = TextDiff::from_lines(expected.as_str(), actual.as_str());
    Some(
        diff.unified_diff()
            .context_radius(DIFF_CONTEXT_LINES)
            .header(expected_name, actual_name)
            .to_string(),
    )
}

/// Split on `\r\n`, `\n` or `\r`. A trailing terminator yields a final
/// empty line.
pub fn split_lines(text: &str) -> Vec<&str> {
    let mut lines = Vec::new();
    let mut start = 0;
    let bytes = text.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'\n' => {
                lines.push(&text[start..i]);
                start = i + 1;
            }
            b'\r' => {
                lines.push(&text[start..i]);
                if bytes.get(i + 1) == Some(&b'\n') {
                    i += 1;
                }
                start = i + 1;
            }
            _ => {}
        }
        i += 1;
    }
    lines.push(&text[start..]);
    lines
}

fn normalize_line_endings(text: &str) -> String {
    split_lines(text).join("\n")
}

/// Relative paths of every file under `root`, `/`-separated.
fn relative_files(root: &Path) -> Result<BTreeSet<String>, CompareError> {
    let mut files = BTreeSet::new();
    for entry in WalkDir::new(root) {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(root).to_path_buf();
            let source = e
                .into_io_error()
                .unwrap_or_else(|| std::io::Error::other("filesystem loop"));
            CompareError::io(path, source)
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        let Ok(relative) = entry.path().strip_prefix(root) else {
            continue;
        };
        files.insert(
            relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/"),
        );
    }
    Ok(files)
}

fn read_text(path: &Path) -> Result<String, CompareError> {
    let bytes = fs::read(path).map_err(|e| CompareError::io(path, e))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}
