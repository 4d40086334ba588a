//! Native library (klib) layout.
//!
//! ```text
//! <lib>.klib  (zip, or the same tree unpacked)
//! └── <component>/            usually `default`
//!     ├── manifest            Java properties
//!     └── linkdata/
//!         ├── module          module header (unused)
//!         └── package_<fq>/   one directory per package
//!             └── *.knm       serialized PackageFragment
//! ```

use crate::base::constants::{KLIB_FILE_EXTENSION, KLIB_PACKAGE_DIR_PREFIX, KNM_FILE_EXTENSION};
use crate::extract::ExtractionError;
use crate::extract::artifact;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

const MANIFEST_FILE: &str = "manifest";
const LINKDATA_DIR: &str = "linkdata";
const DEFAULT_COMPONENT: &str = "default";

pub const PROPERTY_UNIQUE_NAME: &str = "unique_name";
pub const PROPERTY_DEPENDS: &str = "depends";
pub const PROPERTY_NATIVE_TARGETS: &str = "native_targets";

/// `true` for a klib archive or an unpacked klib directory.
pub fn is_klib(path: &Path) -> bool {
    if path.is_dir() {
        return path.join(DEFAULT_COMPONENT).join(MANIFEST_FILE).is_file();
    }
    path.is_file()
        && path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case(KLIB_FILE_EXTENSION))
}

// ============================================================================
// MANIFEST
// ============================================================================

/// A parsed Java properties file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Manifest {
    properties: BTreeMap<String, String>,
}

impl Manifest {
    /// Parse properties text: `#`/`!` comments, `=`/`:`/whitespace
    /// separators, backslash line continuations and escapes.
    pub fn parse(text: &str) -> Self {
        let mut properties = BTreeMap::new();
        let mut logical = String::new();

        for raw in text.lines() {
            let line = if logical.is_empty() {
                raw.trim_start()
            } else {
                raw.trim_start_matches([' ', '\t', '\u{c}'])
            };
            if logical.is_empty() && (line.is_empty() || line.starts_with(['#', '!'])) {
                continue;
            }
            let trailing = line.chars().rev().take_while(|c| *c == '\\').count();
            if trailing % 2 == 1 {
                logical.push_str(&line[..line.len() - 1]);
                continue;
            }
            logical.push_str(line);
            let (key, value) = split_property(&logical);
            properties.insert(unescape(key), unescape(value));
            logical.clear();
        }
        if !logical.is_empty() {
            let (key, value) = split_property(&logical);
            properties.insert(unescape(key), unescape(value));
        }
        Self { properties }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(String::as_str)
    }

    /// Whitespace-separated list value; empty when absent.
    pub fn list(&self, key: &str) -> Vec<String> {
        self.get(key)
            .map(|v| v.split_whitespace().map(str::to_string).collect())
            .unwrap_or_default()
    }

    pub fn unique_name(&self) -> Option<&str> {
        self.get(PROPERTY_UNIQUE_NAME).filter(|name| !name.is_empty())
    }

    pub fn depends(&self) -> Vec<String> {
        self.list(PROPERTY_DEPENDS)
    }

    pub fn native_targets(&self) -> Vec<String> {
        self.list(PROPERTY_NATIVE_TARGETS)
    }
}

/// Split a logical line at the first unescaped separator.
fn split_property(line: &str) -> (&str, &str) {
    let mut escaped = false;
    for (i, c) in line.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' => escaped = true,
            '=' | ':' => return (&line[..i], line[i + 1..].trim_start()),
            c if c.is_whitespace() => {
                let rest = line[i..].trim_start();
                let rest = rest
                    .strip_prefix(['=', ':'])
                    .map(str::trim_start)
                    .unwrap_or(rest);
                return (&line[..i], rest);
            }
            _ => {}
        }
    }
    (line, "")
}

fn unescape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('f') => out.push('\u{c}'),
            Some(other) => out.push(other),
            None => {}
        }
    }
    out
}

// ============================================================================
// LIBRARY
// ============================================================================

/// One serialized package fragment file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FragmentFile {
    pub origin: PathBuf,
    /// Dotted package name from the directory name
    pub package: String,
    pub bytes: Vec<u8>,
}

/// A klib opened from disk.
#[derive(Debug, Clone)]
pub struct KlibLibrary {
    pub path: PathBuf,
    pub component: String,
    pub manifest: Manifest,
    pub fragments: Vec<FragmentFile>,
}

fn is_layout_entry(name: &str) -> bool {
    name.ends_with(&format!("/{MANIFEST_FILE}"))
        || (name.contains(&format!("/{LINKDATA_DIR}/"))
            && name.ends_with(&format!(".{KNM_FILE_EXTENSION}")))
}

impl KlibLibrary {
    /// Read the manifest and every fragment of the library's component.
    pub fn open(path: &Path) -> Result<Self, ExtractionError> {
        Self::read(path, is_layout_entry)
    }

    /// Read only the manifest.
    pub fn open_manifest(path: &Path) -> Result<Self, ExtractionError> {
        Self::read(path, |name| name.ends_with(&format!("/{MANIFEST_FILE}")))
    }

    fn read(path: &Path, accept: impl Fn(&str) -> bool) -> Result<Self, ExtractionError> {
        let entries = artifact::collect_entries(path, accept)?;

        let manifests: Vec<_> = entries
            .iter()
            .filter_map(|e| {
                let component = e.name.strip_suffix(&format!("/{MANIFEST_FILE}"))?;
                (!component.contains('/')).then_some((component, e))
            })
            .collect();
        let (component, manifest) = manifests
            .iter()
            .find(|(component, _)| *component == DEFAULT_COMPONENT)
            .or_else(|| manifests.first())
            .ok_or_else(|| ExtractionError::malformed(path, "klib has no manifest"))?;
        let component = component.to_string();
        let manifest = Manifest::parse(&String::from_utf8_lossy(&manifest.bytes));

        let prefix = format!("{component}/{LINKDATA_DIR}/");
        let mut fragments = Vec::new();
        for entry in entries {
            let Some(rest) = entry.name.strip_prefix(&prefix) else {
                continue;
            };
            let Some((directory, _file)) = rest.split_once('/') else {
                continue;
            };
            let Some(package) = directory.strip_prefix(KLIB_PACKAGE_DIR_PREFIX) else {
                continue;
            };
            fragments.push(FragmentFile {
                origin: entry.origin,
                package: package.to_string(),
                bytes: entry.bytes,
            });
        }

        Ok(Self {
            path: path.to_path_buf(),
            component,
            manifest,
            fragments,
        })
    }

    /// The declared unique name, falling back to the file stem.
    pub fn unique_name(&self) -> String {
        self.manifest
            .unique_name()
            .map(str::to_string)
            .or_else(|| {
                self.path
                    .file_stem()
                    .and_then(|s| s.to_str())
                    .map(str::to_string)
            })
            .unwrap_or_default()
    }
}
