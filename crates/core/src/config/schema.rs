//! Configuration schema definitions

use serde::{Deserialize, Serialize};

/// Root configuration schema
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ConfigSchema {
    #[serde(default)]
    pub convert: ConvertConfig,

    #[serde(default)]
    pub scan: ScanConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Conversion settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConvertConfig {
    /// Strip the EXIF segment from every written JPEG
    #[serde(default)]
    pub remove_exif: bool,

    /// Source formats to look for (`heif`, `png`, `webp`, `gif`).
    /// Unset means every format this build can decode, HEIF first.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sources: Option<Vec<String>>,

    /// Convert several files at once
    #[serde(default = "default_true")]
    pub parallel: bool,
}

impl Default for ConvertConfig {
    fn default() -> Self {
        Self {
            remove_exif: false,
            sources: None,
            parallel: true,
        }
    }
}

/// Directory traversal settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScanConfig {
    /// Skip dot-files and dot-directories
    #[serde(default)]
    pub skip_hidden: bool,
}

/// Logging settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter when `RUST_LOG` is unset
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Write log events as JSON lines
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}
