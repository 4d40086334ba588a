//! Platform extractors.
//!
//! One closed set of extractors, selected by platform tag:
//!
//! ```text
//! ExtractionInput ──> Extractor::Jvm    ──┐
//!                     Extractor::Js     ──┼──> Module (already filtered)
//!                     Extractor::Native ──┘
//! ```
//!
//! Extractors never write to disk. A primary artifact that does not exist
//! contributes no API; a target with no existing artifacts yields an empty
//! [`Module`].

pub mod artifact;
mod descriptors;
mod error;
pub mod js;
pub mod jvm;
pub mod native;

pub use error::ExtractionError;
pub use js::JsExtractor;
pub use jvm::JvmExtractor;
pub use native::NativeExtractor;

use crate::base::Platform;
use crate::model::Module;
use std::path::PathBuf;
use tracing::info;

/// Platform-specific parameters. Only native extraction has any.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlatformParameters {
    /// Target architecture identifier (`linux_x64`, `macosArm64`, ...)
    pub native_target: Option<String>,
}

/// What to extract.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractionInput {
    /// Name of the module under test; names the output unit where the
    /// platform has no unit name of its own
    pub module_name: String,
    /// Compiled artifacts of the module under test
    pub primary: Vec<PathBuf>,
    /// The dependency closure
    pub dependencies: Vec<PathBuf>,
    pub parameters: PlatformParameters,
}

impl ExtractionInput {
    pub fn new(module_name: impl Into<String>) -> Self {
        Self {
            module_name: module_name.into(),
            ..Default::default()
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
        self.parameters.native_target = Some(target.into());
        self
    }

    /// `true` when no primary artifact exists on disk.
    pub fn has_no_artifacts(&self) -> bool {
        !self.primary.iter().any(|p| p.exists())
    }
}

/// An extractor for one platform.
#[derive(Debug, Clone, Copy)]
pub enum Extractor {
    Jvm(JvmExtractor),
    Js(JsExtractor),
    Native(NativeExtractor),
}

impl Extractor {
    pub fn for_platform(platform: Platform) -> Self {
        match platform {
            Platform::Jvm => Self::Jvm(JvmExtractor::new()),
            Platform::Js => Self::Js(JsExtractor::new()),
            Platform::Native => Self::Native(NativeExtractor::new()),
        }
    }

    pub fn platform(&self) -> Platform {
        match self {
            Self::Jvm(_) => Platform::Jvm,
            Self::Js(_) => Platform::Js,
            Self::Native(_) => Platform::Native,
        }
    }

    /// Extract the filtered API surface of `input`.
    pub fn extract(&self, input: &ExtractionInput) -> Result<Module, ExtractionError> {
        info!(
            platform = %self.platform(),
            module = %input.module_name,
            primary = input.primary.len(),
            dependencies = input.dependencies.len(),
            "extracting API"
        );
        match self {
            Self::Jvm(extractor) => extractor.extract(input),
            Self::Js(extractor) => extractor.extract(input),
            Self::Native(extractor) => extractor.extract(input),
        }
    }
}

/// Extract with the extractor for `platform`.
pub fn extract(platform: Platform, input: &ExtractionInput) -> Result<Module, ExtractionError> {
    Extractor::for_platform(platform).extract(input)
}
