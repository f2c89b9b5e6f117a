//! Logging setup for heic-convert
//!
//! Structured logs go to stderr through `tracing-subscriber`, so stdout
//! stays free for results and `--json` output.

use serde::{Deserialize, Serialize};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Initialize logging with custom configuration
///
/// `RUST_LOG` takes precedence over `config.log_level`.
pub fn init_with_config(config: TelemetryConfig) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .map_err(|e| anyhow::anyhow!("Invalid log level `{}`: {}", config.log_level, e))?;

    let json_layer = config.json.then(|| {
        fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_target(config.show_target)
            .with_file(config.show_file)
            .with_line_number(config.show_line_number)
    });
    let text_layer = (!config.json).then(|| {
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_ansi(config.ansi)
            .with_target(config.show_target)
            .with_thread_ids(config.show_thread_ids)
            .with_file(config.show_file)
            .with_line_number(config.show_line_number)
            .compact()
    });

    let subscriber = tracing_subscriber::registry()
        .with(filter)
        .with(json_layer)
        .with(text_layer);

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| anyhow::anyhow!("Failed to set tracing subscriber: {}", e))?;

    tracing::debug!(version = env!("CARGO_PKG_VERSION"), "logging initialized");

    Ok(())
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TelemetryConfig {
    /// Filter directive used when `RUST_LOG` is unset
    pub log_level: String,
    /// Emit JSON lines instead of compact text
    pub json: bool,
    /// Colour the text output
    pub ansi: bool,
    /// Include the event target
    pub show_target: bool,
    /// Include thread ids
    pub show_thread_ids: bool,
    /// Include source file names
    pub show_file: bool,
    /// Include source line numbers
    pub show_line_number: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json: false,
            ansi: true,
            show_target: false,
            show_thread_ids: false,
            show_file: false,
            show_line_number: false,
        }
    }
}

impl TelemetryConfig {
    /// Config whose level follows `-v`/`--quiet` on top of a configured default.
    pub fn from_verbosity(configured: &str, verbose: u8, quiet: bool) -> Self {
        Self {
            log_level: level_for(configured, verbose, quiet),
            show_thread_ids: verbose >= 2,
            ..Self::default()
        }
    }

    /// Switch between JSON lines and compact text.
    pub fn with_json(mut self, json: bool) -> Self {
        self.json = json;
        self
    }
}

/// Resolve the effective level: `--quiet` wins, then `-v` counts, then the
/// configured level.
pub fn level_for(configured: &str, verbose: u8, quiet: bool) -> String {
    if quiet {
        return "error".to_string();
    }
    match verbose {
        0 => configured.to_string(),
        1 => "debug".to_string(),
        _ => "trace".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_for() {
        assert_eq!(level_for("warn", 0, false), "warn");
        assert_eq!(level_for("info", 1, false), "debug");
        assert_eq!(level_for("info", 3, false), "trace");
        assert_eq!(level_for("info", 2, true), "error");
    }

    #[test]
    fn test_from_verbosity() {
        let config = TelemetryConfig::from_verbosity("info", 2, false);
        assert_eq!(config.log_level, "trace");
        assert!(config.show_thread_ids);
        assert!(!config.json);

        let quiet = TelemetryConfig::from_verbosity("info", 0, true);
        assert_eq!(quiet.log_level, "error");
        assert!(!quiet.show_thread_ids);
    }

    #[test]
    fn test_default_config() {
        let config = TelemetryConfig::default();
        assert_eq!(config.log_level, "info");
        assert!(config.ansi);
        assert!(!config.json);
    }

    #[test]
    fn test_with_json() {
        let config = TelemetryConfig::from_verbosity("info", 1, false).with_json(true);
        assert!(config.json);
        assert_eq!(config.log_level, "debug");
    }
}
