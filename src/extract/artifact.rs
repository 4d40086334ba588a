//! Reading files out of artifact containers.
//!
//! A primary artifact is either a directory tree or a zip archive (jar,
//! zip, klib). Both are flattened into [`ArtifactEntry`] values with
//! `/`-separated relative names, sorted by name so that every run sees
//! the same order.

use super::ExtractionError;
use crate::base::constants::{JAR_FILE_EXTENSION, KLIB_FILE_EXTENSION};
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;
use zip::ZipArchive;

/// One file read from an artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactEntry {
    /// Where the bytes came from, for error messages
    pub origin: PathBuf,
    /// Path relative to the artifact root, `/`-separated
    pub name: String,
    pub bytes: Vec<u8>,
}

/// `true` for paths that name a zip-based container.
pub fn is_archive(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| {
            e.eq_ignore_ascii_case(JAR_FILE_EXTENSION)
                || e.eq_ignore_ascii_case("zip")
                || e.eq_ignore_ascii_case(KLIB_FILE_EXTENSION)
        })
}

/// Read every entry of `root` whose relative name passes `accept`.
///
/// A root that does not exist yields nothing.
pub fn collect_entries(
    root: &Path,
    accept: impl Fn(&str) -> bool,
) -> Result<Vec<ArtifactEntry>, ExtractionError> {
    if !root.exists() {
        return Ok(Vec::new());
    }
    if root.is_dir() {
        return read_directory(root, accept);
    }
    if is_archive(root) {
        return read_archive(root, accept);
    }

    let name = root
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default()
        .to_string();
    if !accept(&name) {
        return Ok(Vec::new());
    }
    let bytes = std::fs::read(root).map_err(|e| ExtractionError::io(root, e))?;
    Ok(vec![ArtifactEntry {
        origin: root.to_path_buf(),
        name,
        bytes,
    }])
}

fn read_directory(
    root: &Path,
    accept: impl Fn(&str) -> bool,
) -> Result<Vec<ArtifactEntry>, ExtractionError> {
    let mut entries = Vec::new();
    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(root).to_path_buf();
            match e.into_io_error() {
                Some(source) => ExtractionError::io(path, source),
                None => ExtractionError::malformed(path, "filesystem loop"),
            }
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        let Ok(relative) = entry.path().strip_prefix(root) else {
            continue;
        };
        let name = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        if !accept(&name) {
            continue;
        }
        let bytes = std::fs::read(entry.path()).map_err(|e| ExtractionError::io(entry.path(), e))?;
        entries.push(ArtifactEntry {
            origin: entry.path().to_path_buf(),
            name,
            bytes,
        });
    }
    Ok(entries)
}

/// Read the accepted entries of a zip archive.
pub fn read_archive(
    path: &Path,
    accept: impl Fn(&str) -> bool,
) -> Result<Vec<ArtifactEntry>, ExtractionError> {
    let file = File::open(path).map_err(|e| ExtractionError::io(path, e))?;
    let mut archive = ZipArchive::new(file).map_err(|e| ExtractionError::archive(path, e))?;

    let mut names: Vec<String> = archive
        .file_names()
        .filter(|name| !name.ends_with('/') && accept(name))
        .map(str::to_string)
        .collect();
    names.sort();

    let mut entries = Vec::with_capacity(names.len());
    for name in names {
        let mut file = archive
            .by_name(&name)
            .map_err(|e| ExtractionError::archive(path, e))?;
        let mut bytes = Vec::new();
        file.read_to_end(&mut bytes)
            .map_err(|e| ExtractionError::malformed(path, format!("failed to read {name}: {e}")))?;
        entries.push(ArtifactEntry {
            origin: path.join(&name),
            name,
            bytes,
        });
    }
    Ok(entries)
}
