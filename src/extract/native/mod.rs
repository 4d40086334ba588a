//! Native extractor: klib archives.
//!
//! Each primary klib becomes one compiled unit named by its manifest
//! `unique_name`. Fragments are read from
//! `<component>/linkdata/package_<fq>/*.knm`; the `depends` list is
//! resolved against the dependency closure before anything is converted.

pub mod library;
pub mod resolver;

pub use library::{KlibLibrary, Manifest};
pub use resolver::LibraryResolver;

use super::descriptors::{self, UnitFragment};
use super::{ExtractionError, ExtractionInput};
use crate::base::{NativeTarget, Platform};
use crate::metadata::{Dialect, PackageFragmentProto};
use crate::model::Module;
use std::path::PathBuf;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, Default)]
pub struct NativeExtractor;

impl NativeExtractor {
    pub fn new() -> Self {
        Self
    }

    pub fn extract(&self, input: &ExtractionInput) -> Result<Module, ExtractionError> {
        let mut module = Module::new(input.module_name.as_str(), Platform::Native);

        let libraries = primary_libraries(&input.primary);
        if libraries.is_empty() {
            debug!(module = %input.module_name, "no native library found");
            return Ok(module);
        }

        let requested = input.parameters.native_target.clone();
        let target = requested
            .as_deref()
            .filter(|name| !name.trim().is_empty())
            .ok_or(ExtractionError::MissingTargetIdentifier { requested: None })
            .and_then(|name| {
                NativeTarget::from_name(name).ok_or_else(|| {
                    ExtractionError::MissingTargetIdentifier {
                        requested: Some(name.to_string()),
                    }
                })
            })?;

        let resolver = LibraryResolver::from_dependencies(&input.dependencies)?;

        for path in &libraries {
            let klib = KlibLibrary::open(path)?;
            check_target(&klib, target)?;

            let unique_name = klib.unique_name();
            let closure = resolver.resolve_closure(&klib.manifest.depends())?;
            debug!(
                library = %unique_name,
                dependencies = closure.len(),
                "resolved native dependencies"
            );

            let fragments = klib
                .fragments
                .iter()
                .map(|file| {
                    PackageFragmentProto::parse(&file.bytes, Dialect::Klib)
                        .map(|proto| UnitFragment {
                            package_hint: Some(file.package.clone()),
                            proto,
                        })
                        .map_err(|e| ExtractionError::metadata(&file.origin, e))
                })
                .collect::<Result<Vec<_>, _>>()?;

            descriptors::convert_unit(&mut module, &unique_name, &fragments)
                .map_err(|e| ExtractionError::metadata(path, e))?;
            info!(
                library = %unique_name,
                target = %target,
                fragments = fragments.len(),
                "read native library"
            );
        }
        Ok(module)
    }
}

/// Existing klibs among the primary paths.
fn primary_libraries(primary: &[PathBuf]) -> Vec<PathBuf> {
    primary
        .iter()
        .filter(|path| {
            if !path.exists() {
                warn!(path = %path.display(), "artifact does not exist, contributes no API");
                return false;
            }
            let klib = library::is_klib(path);
            if !klib {
                debug!(path = %path.display(), "not a native library, skipped");
            }
            klib
        })
        .cloned()
        .collect()
}

/// A library that lists its targets must list the requested one.
fn check_target(klib: &KlibLibrary, target: NativeTarget) -> Result<(), ExtractionError> {
    let declared = klib.manifest.native_targets();
    if declared.is_empty()
        || declared
            .iter()
            .any(|name| NativeTarget::from_name(name) == Some(target))
    {
        return Ok(());
    }
    Err(ExtractionError::malformed(
        &klib.path,
        format!(
            "library is not built for target {target}; it declares [{}]",
            declared.join(", ")
        ),
    ))
}
