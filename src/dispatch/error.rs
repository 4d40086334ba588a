//! Orchestrator-facing error umbrella.

use crate::check::CompareError;
use crate::config::ConfigError;
use crate::extract::ExtractionError;
use crate::render::RenderError;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Extraction(#[from] ExtractionError),

    #[error(transparent)]
    Render(#[from] RenderError),

    #[error(transparent)]
    Compare(#[from] CompareError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Two targets in one batch would write the same directory.
    #[error("Targets '{first}' and '{second}' share output directory {}", .dir.display())]
    SharedOutputDirectory {
        first: String,
        second: String,
        dir: PathBuf,
    },

    #[error("IO error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ApiError {
    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }
}
