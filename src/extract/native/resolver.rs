//! Resolve `depends` entries of a klib manifest against the dependency
//! closure.
//!
//! A library's unique name may differ from its file name, so every
//! dependency manifest is read up front and indexed by unique name before
//! any lookup happens.

use super::library::{self, KlibLibrary};
use crate::base::constants::JAR_FILE_EXTENSION;
use crate::extract::ExtractionError;
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Debug, Clone, Default)]
pub struct LibraryResolver {
    by_name: BTreeMap<String, PathBuf>,
}

impl LibraryResolver {
    /// Index the klibs among `dependencies` by unique name. Jars, missing
    /// paths and other files are skipped.
    pub fn from_dependencies(dependencies: &[PathBuf]) -> Result<Self, ExtractionError> {
        let mut by_name = BTreeMap::new();
        for path in dependencies {
            if !path.exists() {
                debug!(path = %path.display(), "dependency does not exist, skipped");
                continue;
            }
            if is_jar(path) || !library::is_klib(path) {
                debug!(path = %path.display(), "not a native library, skipped");
                continue;
            }
            let klib = KlibLibrary::open_manifest(path)?;
            // first occurrence wins, as on a library search path
            by_name.entry(klib.unique_name()).or_insert_with(|| path.clone());
        }
        debug!(libraries = by_name.len(), "indexed native dependencies");
        Ok(Self { by_name })
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }

    /// Every unique name known to the resolver, sorted.
    pub fn candidates(&self) -> impl Iterator<Item = &str> {
        self.by_name.keys().map(String::as_str)
    }

    /// Path of the library named `name`.
    pub fn resolve(&self, name: &str) -> Result<&Path, ExtractionError> {
        self.by_name
            .get(name)
            .map(PathBuf::as_path)
            .ok_or_else(|| ExtractionError::unresolved(name, self.candidates()))
    }

    /// Breadth-first closure of `roots` through each library's `depends`.
    /// Returns `(unique name, path)` pairs in visit order.
    pub fn resolve_closure(
        &self,
        roots: &[String],
    ) -> Result<Vec<(String, PathBuf)>, ExtractionError> {
        let mut seen: BTreeSet<String> = BTreeSet::new();
        let mut queue: VecDeque<String> = roots.iter().cloned().collect();
        let mut resolved = Vec::new();

        while let Some(name) = queue.pop_front() {
            if !seen.insert(name.clone()) {
                continue;
            }
            let path = self.resolve(&name)?.to_path_buf();
            let klib = KlibLibrary::open_manifest(&path)?;
            queue.extend(
                klib.manifest
                    .depends()
                    .into_iter()
                    .filter(|d| !seen.contains(d)),
            );
            resolved.push((name, path));
        }
        Ok(resolved)
    }
}

fn is_jar(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case(JAR_FILE_EXTENSION))
}
