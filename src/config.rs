//! API check configuration (`apicheck.json`).
//!
//! ```json
//! {
//!   "api_dir": "api",
//!   "include_projects": ["core"],
//!   "targets": [
//!     { "name": "jvm", "platform": "jvm", "module_name": "core",
//!       "primary": ["build/classes/kotlin/jvm/main"] }
//!   ]
//! }
//! ```
//!
//! Directory layout derived from it:
//!
//! ```text
//! <project_dir>/<api_dir>/<target>               baseline
//! <build_root>/<api_dir>/<target>                generated
//! <root_build_dir>/<api_dir>/<project>/<target>  published
//! ```

use crate::base::constants::DEFAULT_API_DIR;
use crate::dispatch::ApiTarget;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error reading {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid configuration: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiCheckConfig {
    /// Name of the API directory under project and build directories.
    #[serde(default = "default_api_dir")]
    pub api_dir: String,

    /// Projects whose API is checked.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub include_projects: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub targets: Vec<ApiTarget>,
}

fn default_api_dir() -> String {
    DEFAULT_API_DIR.to_string()
}

impl Default for ApiCheckConfig {
    fn default() -> Self {
        Self {
            api_dir: default_api_dir(),
            include_projects: Vec::new(),
            targets: Vec::new(),
        }
    }
}

impl ApiCheckConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&text)
    }

    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Include projects for API checking.
    pub fn include(mut self, projects: &[&str]) -> Self {
        self.include_projects
            .extend(projects.iter().map(|p| p.to_string()));
        self
    }

    pub fn with_target(mut self, target: ApiTarget) -> Self {
        self.targets.push(target);
        self
    }

    pub fn includes(&self, project: &str) -> bool {
        self.include_projects.iter().any(|p| p == project)
    }

    /// Enabled targets only.
    pub fn enabled_targets(&self) -> impl Iterator<Item = &ApiTarget> {
        self.targets.iter().filter(|t| t.enabled)
    }

    /// Checked-in baseline: `<project_dir>/<api_dir>/<target>`.
    pub fn baseline_dir(&self, project_dir: &Path, target: &ApiTarget) -> PathBuf {
        project_dir
            .join(&self.api_dir)
            .join(target.directory_name())
    }

    /// Generated output: `<build_root>/<api_dir>/<target>`.
    pub fn build_dir(&self, build_root: &Path, target: &ApiTarget) -> PathBuf {
        build_root.join(&self.api_dir).join(target.directory_name())
    }

    /// Publication: `<root_build_dir>/<api_dir>/<project>/<target>`.
    pub fn publish_dir(&self, root_build_dir: &Path, project: &str, target: &ApiTarget) -> PathBuf {
        root_build_dir
            .join(&self.api_dir)
            .join(project)
            .join(target.directory_name())
    }
}
