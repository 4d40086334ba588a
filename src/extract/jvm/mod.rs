//! JVM extractor: class directories and jars.
//!
//! ```text
//! primary paths ──collect──> *.class entries ──parse (rayon)──> ClassFile
//!                                                      │
//!                         kotlin/Metadata ──> VisibilityTable (linked)
//!                                                      │
//!                                  SurfaceBuilder ──> Module (one unit)
//! ```
//!
//! Bytecode references are fully qualified, so the dependency closure is
//! only logged.

pub mod class_file;
pub mod kotlin;
pub mod signature;
mod surface;

pub use class_file::{AccessFlags, ClassFile, ClassFileError};
pub use kotlin::{ClassVisibility, KotlinHeader, MetadataKind, VisibilityTable};

use super::artifact::{self, ArtifactEntry};
use super::{ExtractionError, ExtractionInput};
use crate::base::constants::{CLASS_FILE_EXTENSION, META_INF_DIR};
use crate::model::Module;
use rayon::prelude::*;
use std::path::PathBuf;
use surface::SurfaceBuilder;
use tracing::{debug, info, warn};

/// A parsed class and the file it came from.
#[derive(Debug, Clone)]
pub struct LoadedClass {
    pub origin: PathBuf,
    pub class: ClassFile,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct JvmExtractor;

impl JvmExtractor {
    pub fn new() -> Self {
        Self
    }

    pub fn extract(&self, input: &ExtractionInput) -> Result<Module, ExtractionError> {
        let classes = load_classes(&input.primary)?;
        if !input.dependencies.is_empty() {
            debug!(
                count = input.dependencies.len(),
                "JVM dependency closure not consulted"
            );
        }

        let visibilities = classes
            .iter()
            .map(|loaded| {
                kotlin::read_class_visibility(&loaded.class)
                    .map_err(|e| ExtractionError::metadata(&loaded.origin, e))
            })
            .filter_map(Result::transpose)
            .collect::<Result<Vec<_>, _>>()?;
        let table = VisibilityTable::build(visibilities);
        debug!(
            classes = classes.len(),
            with_metadata = table.len(),
            "loaded JVM classes"
        );

        let module = SurfaceBuilder::new(&classes, &table).build(&input.module_name)?;
        info!(
            module = %input.module_name,
            declarations = module.declaration_count(),
            "extracted JVM API"
        );
        Ok(module)
    }
}

fn is_class_entry(name: &str) -> bool {
    name.ends_with(&format!(".{CLASS_FILE_EXTENSION}")) && !name.starts_with(META_INF_DIR)
}

/// Read and parse every class under the given paths. Missing paths
/// contribute nothing.
pub fn load_classes(paths: &[PathBuf]) -> Result<Vec<LoadedClass>, ExtractionError> {
    let mut entries: Vec<ArtifactEntry> = Vec::new();
    for path in paths {
        if !path.exists() {
            warn!(path = %path.display(), "artifact does not exist, contributes no API");
            continue;
        }
        entries.extend(artifact::collect_entries(path, is_class_entry)?);
    }

    let mut classes = entries
        .into_par_iter()
        .map(|entry| {
            ClassFile::parse(&entry.bytes)
                .map(|class| LoadedClass {
                    origin: entry.origin.clone(),
                    class,
                })
                .map_err(|e| ExtractionError::malformed(&entry.origin, e.to_string()))
        })
        .collect::<Result<Vec<_>, _>>()?;
    classes.sort_by(|a, b| a.class.name.cmp(&b.class.name));
    Ok(classes)
}
