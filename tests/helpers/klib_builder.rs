//! Native libraries in the klib layout:
//!
//! ```text
//! default/manifest
//! default/linkdata/package_<fq name>/<n>_<name>.knm
//! ```

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

#[derive(Debug, Clone, Default)]
pub struct KlibBuilder {
    unique_name: String,
    depends: Vec<String>,
    native_targets: Vec<String>,
    fragments: Vec<(String, Vec<u8>)>,
}

impl KlibBuilder {
    pub fn new(unique_name: &str) -> Self {
        Self {
            unique_name: unique_name.to_string(),
            ..Default::default()
        }
    }

    pub fn depends_on(mut self, name: &str) -> Self {
        self.depends.push(name.to_string());
        self
    }

    pub fn target(mut self, target: &str) -> Self {
        self.native_targets.push(target.to_string());
        self
    }

    pub fn fragment(mut self, package: &str, bytes: Vec<u8>) -> Self {
        self.fragments.push((package.to_string(), bytes));
        self
    }

    /// Manifest text, with `:` escaped the way the compiler writes it.
    pub fn manifest(&self) -> String {
        let mut text = format!("unique_name={}\n", self.unique_name.replace(':', "\\:"));
        if !self.depends.is_empty() {
            text.push_str(&format!("depends={}\n", self.depends.join(" ")));
        }
        if !self.native_targets.is_empty() {
            text.push_str(&format!("native_targets={}\n", self.native_targets.join(" ")));
        }
        text
    }

    fn entries(&self) -> Vec<(String, Vec<u8>)> {
        let mut entries = vec![("default/manifest".to_string(), self.manifest().into_bytes())];
        for (i, (package, bytes)) in self.fragments.iter().enumerate() {
            let leaf = package.rsplit('.').next().unwrap_or_default();
            entries.push((
                format!("default/linkdata/package_{package}/{i}_{leaf}.knm"),
                bytes.clone(),
            ));
        }
        entries
    }

    /// Write as an unpacked directory `<root>/<dir_name>`.
    pub fn write_unpacked(&self, root: &Path, dir_name: &str) -> PathBuf {
        let dir = root.join(dir_name);
        for (name, bytes) in self.entries() {
            let path = dir.join(name);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, bytes).unwrap();
        }
        dir
    }

    /// Write as a zip archive `<root>/<file_name>`.
    pub fn write_packed(&self, root: &Path, file_name: &str) -> PathBuf {
        let path = root.join(file_name);
        let file = File::create(&path).unwrap();
        let mut zip = ZipWriter::new(file);
        let options = SimpleFileOptions::default();
        for (name, bytes) in self.entries() {
            zip.start_file(name, options).unwrap();
            zip.write_all(&bytes).unwrap();
        }
        zip.finish().unwrap();
        path
    }
}
