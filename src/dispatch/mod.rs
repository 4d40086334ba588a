//! Extraction dispatcher: build, check, sync and publish API dumps.
//!
//! ```text
//! ApiTarget ──extract──> Module ──render──> files ──write──> <build>/<api>/<target>
//!                                                                 │
//!                      <project>/<api>/<target> (baseline) ──compare
//! ```
//!
//! Targets are independent; [`build_all`] and [`check_all`] run them on the
//! rayon pool, each into its own directory.

mod error;

pub use error::ApiError;

use crate::base::Platform;
use crate::check::{self, CompareError, DirectoryRole};
use crate::extract::{self, ExtractionInput, PlatformParameters};
use crate::render;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use walkdir::WalkDir;

/// One (module, platform target) pair to dump.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiTarget {
    /// Target name; names the output directory
    pub name: String,
    pub platform: Platform,
    /// Name of the module under test
    pub module_name: String,
    #[serde(default)]
    pub primary: Vec<PathBuf>,
    #[serde(default)]
    pub dependencies: Vec<PathBuf>,
    /// Native only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub native_target: Option<String>,
    /// `false` when the target's compilation is disabled
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
}

fn enabled_by_default() -> bool {
    true
}

impl ApiTarget {
    pub fn new(name: impl Into<String>, platform: Platform, module_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            platform,
            module_name: module_name.into(),
            primary: Vec::new(),
            dependencies: Vec::new(),
            native_target: None,
            enabled: true,
        }
    }

    pub fn with_primary(mut self, path: impl Into<PathBuf>) -> Self {
        self.primary.push(path.into());
        self
    }

    pub fn with_dependency(mut self, path: impl Into<PathBuf>) -> Self {
        self.dependencies.push(path.into());
        self
    }

    pub fn with_native_target(mut self, target: impl Into<String>) -> Self {
        self.native_target = Some(target.into());
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    /// Output directory name: the target name, or the platform tag when
    /// the target is unnamed.
    pub fn directory_name(&self) -> &str {
        if self.name.is_empty() {
            self.platform.tag()
        } else {
            &self.name
        }
    }

    /// Label used in mismatch reports.
    pub fn subject(&self) -> String {
        format!(
            "target '{}' of module '{}'",
            self.directory_name(),
            self.module_name
        )
    }

    pub fn extraction_input(&self) -> ExtractionInput {
        ExtractionInput {
            module_name: self.module_name.clone(),
            primary: self.primary.clone(),
            dependencies: self.dependencies.clone(),
            parameters: PlatformParameters {
                native_target: self.native_target.clone(),
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildOutcome {
    /// Rendered files written
    Built { files: usize },
    /// The target is disabled; nothing was written
    Skipped,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckOutcome {
    Passed,
    /// The generated API differs from the baseline
    Failed { report: String },
    Skipped,
}

impl CheckOutcome {
    /// `false` only for [`CheckOutcome::Failed`].
    pub fn is_success(&self) -> bool {
        !matches!(self, Self::Failed { .. })
    }
}

// ============================================================================
// SINGLE TARGET
// ============================================================================

/// Extract and render `target`, replacing the contents of `output_dir`.
///
/// Nothing is written unless extraction succeeds.
pub fn build_api(target: &ApiTarget, output_dir: &Path) -> Result<BuildOutcome, ApiError> {
    if !target.enabled {
        warn!(
            target = %target.directory_name(),
            "API build is disabled because the target's compilation is not enabled"
        );
        return Ok(BuildOutcome::Skipped);
    }
    info!(
        target = %target.directory_name(),
        platform = %target.platform,
        "generating API"
    );

    let module = extract::extract(target.platform, &target.extraction_input())?;
    let files = render::render(&module);
    render::write_output(output_dir, &files)?;
    Ok(BuildOutcome::Built { files: files.len() })
}

/// Build `target` into `actual_dir`, then compare against `expected_dir`.
pub fn check_api(
    target: &ApiTarget,
    expected_dir: &Path,
    actual_dir: &Path,
) -> Result<CheckOutcome, ApiError> {
    if build_api(target, actual_dir)? == BuildOutcome::Skipped {
        return Ok(CheckOutcome::Skipped);
    }
    match check::compare(expected_dir, actual_dir, &target.subject()) {
        Ok(()) => Ok(CheckOutcome::Passed),
        Err(CompareError::ApiMismatch(mismatch)) => Ok(CheckOutcome::Failed {
            report: mismatch.report(),
        }),
        Err(e) => Err(e.into()),
    }
}

/// Replace the baseline with the generated files. Returns the number of
/// files copied.
pub fn sync_api(generated_dir: &Path, baseline_dir: &Path) -> Result<usize, ApiError> {
    let copied = replace_tree(generated_dir, baseline_dir)?;
    info!(baseline = %baseline_dir.display(), files = copied, "synced API baseline");
    Ok(copied)
}

/// Copy the generated files into a publication directory.
pub fn publish_api(generated_dir: &Path, publish_dir: &Path) -> Result<usize, ApiError> {
    let copied = replace_tree(generated_dir, publish_dir)?;
    info!(dir = %publish_dir.display(), files = copied, "published API");
    Ok(copied)
}

fn replace_tree(from: &Path, to: &Path) -> Result<usize, ApiError> {
    if !from.is_dir() {
        return Err(CompareError::DirectoryMissing {
            which: DirectoryRole::Actual,
            path: from.to_path_buf(),
        }
        .into());
    }
    if to.exists() {
        fs::remove_dir_all(to).map_err(|e| ApiError::io(to, e))?;
    }
    fs::create_dir_all(to).map_err(|e| ApiError::io(to, e))?;

    let mut copied = 0;
    for entry in WalkDir::new(from).sort_by_file_name() {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(from).to_path_buf();
            let source = e
                .into_io_error()
                .unwrap_or_else(|| std::io::Error::other("filesystem loop"));
            ApiError::io(path, source)
        })?;
        let Ok(relative) = entry.path().strip_prefix(from) else {
            continue;
        };
        let destination = to.join(relative);
        if entry.file_type().is_dir() {
            fs::create_dir_all(&destination).map_err(|e| ApiError::io(&destination, e))?;
        } else if entry.file_type().is_file() {
            fs::copy(entry.path(), &destination).map_err(|e| ApiError::io(&destination, e))?;
            copied += 1;
        }
    }
    Ok(copied)
}

// ============================================================================
// BATCHES
// ============================================================================

/// Build every target into `<output_root>/<target directory>` in parallel.
///
/// Fails up front if two targets share a directory; otherwise returns one
/// result per target, in input order.
pub fn build_all(
    targets: &[ApiTarget],
    output_root: &Path,
) -> Result<Vec<(String, Result<BuildOutcome, ApiError>)>, ApiError> {
    ensure_disjoint(targets, output_root)?;
    Ok(targets
        .par_iter()
        .map(|target| {
            let dir = output_root.join(target.directory_name());
            (target.name.clone(), build_api(target, &dir))
        })
        .collect())
}

/// Check every target in parallel: build into `<build_root>/<dir>`, compare
/// against `<baseline_root>/<dir>`.
pub fn check_all(
    targets: &[ApiTarget],
    baseline_root: &Path,
    build_root: &Path,
) -> Result<Vec<(String, Result<CheckOutcome, ApiError>)>, ApiError> {
    ensure_disjoint(targets, build_root)?;
    Ok(targets
        .par_iter()
        .map(|target| {
            let expected = baseline_root.join(target.directory_name());
            let actual = build_root.join(target.directory_name());
            (target.name.clone(), check_api(target, &expected, &actual))
        })
        .collect())
}

fn ensure_disjoint(targets: &[ApiTarget], root: &Path) -> Result<(), ApiError> {
    let mut seen: HashMap<&str, &str> = HashMap::new();
    for target in targets {
        if let Some(first) = seen.insert(target.directory_name(), &target.name) {
            return Err(ApiError::SharedOutputDirectory {
                first: first.to_string(),
                second: target.name.clone(),
                dir: root.join(target.directory_name()),
            });
        }
    }
    Ok(())
}
