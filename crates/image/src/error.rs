//! Error types for the image crate.

use thiserror::Error;

/// Result type alias for image operations.
pub type Result<T> = std::result::Result<T, ImageError>;

/// Errors that can occur while decoding or encoding.
#[derive(Debug, Error)]
pub enum ImageError {
    /// Source bytes are not a valid image of the expected format
    #[error("Decode error: {0}")]
    Decode(String),

    /// Canonical raster could not be serialized
    #[error("Encode error: {0}")]
    Encode(String),

    /// Requested source format is not available in this build
    #[error("Unsupported source format: {0}")]
    UnsupportedSource(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
