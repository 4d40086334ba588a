use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A compilation platform whose artifacts can be introspected.
///
/// The set is closed: adding a platform means adding an extractor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    /// JVM bytecode (class directories and jars)
    Jvm,
    /// Kotlin/JS module metadata embedded in JS output
    Js,
    /// Kotlin/Native libraries (klib)
    Native,
}

impl Platform {
    /// All platforms, in tag order.
    pub const ALL: [Platform; 3] = [Platform::Jvm, Platform::Js, Platform::Native];

    /// Lowercase tag used for directory names and configuration.
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Jvm => "jvm",
            Self::Js => "js",
            Self::Native => "native",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for Platform {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "jvm" | "androidjvm" => Ok(Self::Jvm),
            "js" => Ok(Self::Js),
            "native" => Ok(Self::Native),
            other => Err(format!("Unknown platform: {other}")),
        }
    }
}
