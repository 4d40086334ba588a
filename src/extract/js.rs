//! JS extractor: module metadata embedded in JS output.
//!
//! The compiler appends one comment line per module to its `.js` (or
//! `.meta.js`) output:
//!
//! ```text
//! // Kotlin.kotlin_module_metadata(<abi version>, "<module>", "<base64>");
//! ```
//!
//! The payload is base64 of a gzip stream holding a delimited header and a
//! `Library` message: package fragments plus the names of imported modules.
//! Imports must resolve against the module names found in the dependency
//! closure.

use super::artifact;
use super::descriptors::{self, UnitFragment};
use super::{ExtractionError, ExtractionInput};
use crate::base::Platform;
use crate::base::constants::{JS_BUILTINS_MODULE, JS_FILE_EXTENSION};
use crate::metadata::LibraryProto;
use crate::model::Module;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use flate2::read::GzDecoder;
use regex::Regex;
use std::collections::BTreeSet;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use tracing::{debug, info, warn};

static METADATA_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^// Kotlin\.kotlin_module_metadata\((\d+), "([^"]+)", "([A-Za-z0-9+/=]*)"\);\s*$"#)
        .expect("metadata line pattern is valid")
});

/// One module's metadata as found in a JS file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JsModuleMetadata {
    /// File the line was read from
    pub origin: PathBuf,
    pub abi_version: u32,
    pub module_name: String,
    /// Base64 payload, not yet decoded
    pub encoded_body: String,
}

impl JsModuleMetadata {
    /// Base64 and gzip decoded body.
    pub fn body(&self) -> Result<Vec<u8>, ExtractionError> {
        let compressed = STANDARD
            .decode(self.encoded_body.as_bytes())
            .map_err(|e| ExtractionError::malformed(&self.origin, format!("invalid base64: {e}")))?;
        let mut body = Vec::new();
        GzDecoder::new(compressed.as_slice())
            .read_to_end(&mut body)
            .map_err(|e| ExtractionError::malformed(&self.origin, format!("invalid gzip: {e}")))?;
        Ok(body)
    }

    /// Decode the library message.
    pub fn library(&self) -> Result<LibraryProto, ExtractionError> {
        LibraryProto::parse_with_header(&self.body()?)
            .map_err(|e| ExtractionError::metadata(&self.origin, e))
    }
}

/// Every metadata line of one JS source text.
pub fn parse_metadata_lines(origin: &Path, text: &str) -> Vec<JsModuleMetadata> {
    text.lines()
        .filter_map(|line| METADATA_LINE.captures(line.trim_end()))
        .filter_map(|captures| {
            Some(JsModuleMetadata {
                origin: origin.to_path_buf(),
                abi_version: captures.get(1)?.as_str().parse().ok()?,
                module_name: captures.get(2)?.as_str().to_string(),
                encoded_body: captures.get(3)?.as_str().to_string(),
            })
        })
        .collect()
}

fn is_js_entry(name: &str) -> bool {
    name.ends_with(&format!(".{JS_FILE_EXTENSION}"))
}

/// Module metadata found under `path`; nothing for a missing path.
pub fn load_metadata(path: &Path) -> Result<Vec<JsModuleMetadata>, ExtractionError> {
    let mut modules = Vec::new();
    for entry in artifact::collect_entries(path, is_js_entry)? {
        let text = String::from_utf8_lossy(&entry.bytes);
        modules.extend(parse_metadata_lines(&entry.origin, &text));
    }
    Ok(modules)
}

#[derive(Debug, Clone, Copy, Default)]
pub struct JsExtractor;

impl JsExtractor {
    pub fn new() -> Self {
        Self
    }

    pub fn extract(&self, input: &ExtractionInput) -> Result<Module, ExtractionError> {
        let mut module = Module::new(input.module_name.as_str(), Platform::Js);

        let mut primary = Vec::new();
        for path in &input.primary {
            if !path.exists() {
                warn!(path = %path.display(), "artifact does not exist, contributes no API");
                continue;
            }
            primary.extend(load_metadata(path)?);
        }
        if primary.is_empty() {
            debug!(module = %input.module_name, "no JS module metadata found");
            return Ok(module);
        }

        let mut known: BTreeSet<String> = BTreeSet::new();
        known.insert(JS_BUILTINS_MODULE.to_string());
        for path in &input.dependencies {
            known.extend(load_metadata(path)?.into_iter().map(|m| m.module_name));
        }
        known.extend(primary.iter().map(|m| m.module_name.clone()));
        debug!(modules = known.len(), "JS modules in dependency closure");

        for metadata in &primary {
            let library = metadata.library()?;
            for imported in &library.imported_modules {
                if !known.contains(imported) {
                    return Err(ExtractionError::unresolved(imported.as_str(), known.iter().cloned()));
                }
            }

            let fragments: Vec<UnitFragment> = library
                .fragments
                .into_iter()
                .map(|proto| UnitFragment {
                    package_hint: None,
                    proto,
                })
                .collect();
            descriptors::convert_unit(&mut module, &metadata.module_name, &fragments)
                .map_err(|e| ExtractionError::metadata(&metadata.origin, e))?;
            info!(
                module = %metadata.module_name,
                abi_version = metadata.abi_version,
                fragments = fragments.len(),
                "read JS module metadata"
            );
        }
        Ok(module)
    }
}
