//! JS output carrying module metadata comment lines.

use apidump::metadata::wire::ProtoWriter;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use flate2::Compression;
use flate2::write::GzEncoder;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Base64 of the gzipped header and `Library` message.
pub fn encode_library(fragments: &[Vec<u8>], imported_modules: &[&str]) -> String {
    let mut library = ProtoWriter::new();
    for fragment in fragments {
        library = library.bytes(2, fragment);
    }
    for module in imported_modules {
        library = library.string(3, module);
    }
    let mut body = ProtoWriter::new().finish_delimited();
    body.extend(library.finish());

    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(&body).unwrap();
    STANDARD.encode(encoder.finish().unwrap())
}

/// `// Kotlin.kotlin_module_metadata(1, "<module>", "<payload>");`
pub fn metadata_line(module: &str, fragments: &[Vec<u8>], imported_modules: &[&str]) -> String {
    format!(
        "// Kotlin.kotlin_module_metadata(1, \"{module}\", \"{}\");",
        encode_library(fragments, imported_modules)
    )
}

/// Write `<dir>/<module>.meta.js` holding one metadata line after some
/// ordinary JS.
pub fn write_meta_js(
    dir: &Path,
    module: &str,
    fragments: &[Vec<u8>],
    imported_modules: &[&str],
) -> PathBuf {
    fs::create_dir_all(dir).unwrap();
    let path = dir.join(format!("{module}.meta.js"));
    let text = format!(
        "(function (root) {{ 'use strict'; }})(this);\n{}\n",
        metadata_line(module, fragments, imported_modules)
    );
    fs::write(&path, text).unwrap();
    path
}
