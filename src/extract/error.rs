//! Error types for extraction.

use crate::metadata::MetadataError;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur while extracting a module's API surface.
#[derive(Debug, Error)]
pub enum ExtractionError {
    /// Input binary or metadata could not be parsed.
    #[error("Malformed artifact {}: {reason}", .path.display())]
    MalformedArtifact { path: PathBuf, reason: String },

    /// A referenced library or module is missing from the dependency closure.
    #[error(
        "Unresolved dependency '{name}'; candidates considered: [{}]",
        .candidates.join(", ")
    )]
    UnresolvedDependency {
        name: String,
        candidates: Vec<String>,
    },

    /// Native extraction without a usable target identifier.
    #[error("{}", missing_target_message(.requested))]
    MissingTargetIdentifier { requested: Option<String> },

    /// IO error while reading an artifact.
    #[error("IO error reading {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

fn missing_target_message(requested: &Option<String>) -> String {
    match requested {
        Some(requested) => format!("Unknown native target identifier '{requested}'"),
        None => "Native target identifier is required".to_string(),
    }
}

impl ExtractionError {
    /// Create a malformed-artifact error.
    pub fn malformed(path: impl AsRef<Path>, reason: impl Into<String>) -> Self {
        Self::MalformedArtifact {
            path: path.as_ref().to_path_buf(),
            reason: reason.into(),
        }
    }

    /// Attach a path to a metadata decoding failure.
    pub fn metadata(path: impl AsRef<Path>, error: MetadataError) -> Self {
        Self::malformed(path, error.to_string())
    }

    /// Create an unresolved-dependency error; candidates are sorted.
    pub fn unresolved(
        name: impl Into<String>,
        candidates: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        let mut candidates: Vec<String> = candidates.into_iter().map(Into::into).collect();
        candidates.sort();
        candidates.dedup();
        Self::UnresolvedDependency {
            name: name.into(),
            candidates,
        }
    }

    /// Create an IO error.
    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    /// Map a zip error on the given archive.
    pub fn archive(path: impl AsRef<Path>, error: zip::result::ZipError) -> Self {
        Self::malformed(path, format!("archive error: {error}"))
    }
}
