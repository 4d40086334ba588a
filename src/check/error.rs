//! Error types for directory comparison.

use super::ApiMismatch;
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Which side of a comparison a directory is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DirectoryRole {
    Expected,
    Actual,
}

impl fmt::Display for DirectoryRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Expected => f.write_str("Expected"),
            Self::Actual => f.write_str("Actual"),
        }
    }
}

#[derive(Debug, Error)]
pub enum CompareError {
    /// A compared directory was never generated or checked in.
    #[error("{which} API folder '{}' does not exist", .path.display())]
    DirectoryMissing { which: DirectoryRole, path: PathBuf },

    /// The directories differ. Carries the full report.
    #[error("{0}")]
    ApiMismatch(ApiMismatch),

    #[error("IO error reading {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl CompareError {
    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    pub fn is_mismatch(&self) -> bool {
        matches!(self, Self::ApiMismatch(_))
    }
}
