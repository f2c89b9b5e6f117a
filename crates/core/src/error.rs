//! Structured errors with codes, context and recovery suggestions
//!
//! Every failure a conversion can report carries:
//! - An error code for programmatic handling (`E2001`, `E4002`, ...)
//! - The offending path or value as context
//! - An optional recovery suggestion
//! - A serializable report for `--json` output

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use thiserror::Error;

/// Error codes for programmatic error handling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // IO errors (2xxx)
    IoError = 2000,
    FileNotFound = 2001,
    PermissionDenied = 2002,
    OutputConflict = 2003,

    // Configuration errors (3xxx)
    ConfigError = 3000,
    ConfigNotFound = 3001,
    ConfigParseError = 3002,
    InvalidConfigValue = 3004,

    // Conversion errors (4xxx)
    UnsupportedFormat = 4001,
    DecodeFailed = 4002,
    EncodeFailed = 4003,

    // Metadata errors (5xxx)
    MetadataParse = 5001,
}

impl ErrorCode {
    /// Get the numeric code
    pub fn code(&self) -> u32 {
        *self as u32
    }

    /// Get a human-readable category
    pub fn category(&self) -> &'static str {
        match self.code() / 1000 {
            2 => "IO",
            3 => "Configuration",
            4 => "Conversion",
            5 => "Metadata",
            _ => "Unknown",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "E{:04}", self.code())
    }
}

/// Main error type with rich context
#[derive(Error, Debug)]
pub struct Error {
    /// Error code for programmatic handling
    pub code: ErrorCode,
    /// Human-readable message
    pub message: String,
    /// Additional context
    pub context: Option<String>,
    /// Recovery suggestion
    pub suggestion: Option<String>,
    /// Source error
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)?;
        if let Some(ctx) = &self.context {
            write!(f, "\n  Context: {}", ctx)?;
        }
        if let Some(suggestion) = &self.suggestion {
            write!(f, "\n  Suggestion: {}", suggestion)?;
        }
        Ok(())
    }
}

impl Error {
    /// Create a new error
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            context: None,
            suggestion: None,
            source: None,
        }
    }

    /// Add context to the error
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    /// Add a recovery suggestion
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// Add a source error
    pub fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Convert to a serializable report
    pub fn to_report(&self) -> ErrorReport {
        ErrorReport {
            code: self.code,
            code_str: self.code.to_string(),
            category: self.code.category().to_string(),
            message: self.message.clone(),
            context: self.context.clone(),
            suggestion: self.suggestion.clone(),
            source: self.source.as_ref().map(|e| e.to_string()),
        }
    }

    // Convenience constructors

    pub fn not_found(path: impl AsRef<Path>) -> Self {
        Self::new(
            ErrorCode::FileNotFound,
            format!("Path not found: {}", path.as_ref().display()),
        )
        .with_suggestion("Check that the path exists and you have read permissions")
    }

    pub fn unsupported_format(path: impl AsRef<Path>, expected: &[&str]) -> Self {
        Self::new(
            ErrorCode::UnsupportedFormat,
            format!("Not a supported source file: {}", path.as_ref().display()),
        )
        .with_suggestion(format!("Expected one of: {}", expected.join(", ")))
    }

    /// Two inputs of one batch would be written to the same output file.
    pub fn output_conflict(
        path: impl AsRef<Path>,
        output: impl AsRef<Path>,
        first: impl AsRef<Path>,
    ) -> Self {
        Self::new(
            ErrorCode::OutputConflict,
            format!("Output {} is already produced by another input", output.as_ref().display()),
        )
        .with_context(format!(
            "{} and {} map to the same output",
            first.as_ref().display(),
            path.as_ref().display()
        ))
        .with_suggestion("Rename one of the inputs or convert them separately")
    }

    pub fn decode(path: impl AsRef<Path>, reason: impl Into<String>) -> Self {
        Self::new(ErrorCode::DecodeFailed, reason)
            .with_context(format!("While decoding {}", path.as_ref().display()))
    }

    pub fn encode(path: impl AsRef<Path>, reason: impl Into<String>) -> Self {
        Self::new(ErrorCode::EncodeFailed, reason)
            .with_context(format!("While encoding {}", path.as_ref().display()))
    }

    pub fn metadata_parse(path: impl AsRef<Path>, reason: impl Into<String>) -> Self {
        Self::new(ErrorCode::MetadataParse, reason)
            .with_context(format!("While reading metadata of {}", path.as_ref().display()))
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ConfigError, message)
    }

    pub fn config_not_found(path: impl AsRef<Path>) -> Self {
        Self::new(
            ErrorCode::ConfigNotFound,
            format!("Configuration file not found: {}", path.as_ref().display()),
        )
        .with_suggestion("Create a .heic-convert.toml file or drop the --config flag")
    }

    pub fn invalid_config_value(key: &str, value: impl fmt::Display) -> Self {
        Self::new(
            ErrorCode::InvalidConfigValue,
            format!("Invalid value for `{}`: {}", key, value),
        )
    }

    /// Attach the path an IO error happened on.
    pub fn io_at(err: std::io::Error, path: impl AsRef<Path>) -> Self {
        Error::from(err).with_context(format!("Path: {}", path.as_ref().display()))
    }
}

/// Serializable error report for logging and `--json` output
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorReport {
    pub code: ErrorCode,
    pub code_str: String,
    pub category: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Exit codes for CLI commands
pub mod exit_codes {
    pub const SUCCESS: i32 = 0;
    pub const FAILURE: i32 = 1;
    pub const CONFIG_ERROR: i32 = 3;
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        let code = match err.kind() {
            std::io::ErrorKind::NotFound => ErrorCode::FileNotFound,
            std::io::ErrorKind::PermissionDenied => ErrorCode::PermissionDenied,
            _ => ErrorCode::IoError,
        };
        Error::new(code, err.to_string()).with_source(err)
    }
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Error::new(ErrorCode::ConfigParseError, format!("TOML parse error: {}", err))
            .with_source(err)
    }
}
