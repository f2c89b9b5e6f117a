//! Error types for the metadata crate.

use thiserror::Error;

/// Result type alias for metadata operations.
pub type Result<T> = std::result::Result<T, MetadataError>;

/// Malformed container or EXIF structure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// Missing SOI marker
    #[error("Not a JPEG file (missing SOI marker)")]
    NotJpeg,

    /// A marker was expected but something else was found
    #[error("Expected a marker at offset {offset}, found 0x{byte:02X}")]
    UnexpectedByte {
        /// Byte offset in the container
        offset: usize,
        /// Byte found there
        byte: u8,
    },

    /// Segment length field is too small or runs past the end
    #[error("Invalid length {length} for marker 0x{marker:02X} at offset {offset}")]
    InvalidSegmentLength {
        /// Marker byte following 0xFF
        marker: u8,
        /// Byte offset of the marker
        offset: usize,
        /// Declared length
        length: usize,
    },

    /// Data ended in the middle of a segment
    #[error("Unexpected end of data at offset {offset}")]
    Truncated {
        /// Byte offset where more data was needed
        offset: usize,
    },

    /// No EOI marker after the scan data
    #[error("Missing EOI marker")]
    MissingEoi,

    /// EXIF payload is not a valid TIFF structure
    #[error("Invalid EXIF data: {0}")]
    InvalidExif(String),
}

/// Errors from the file-level metadata operations.
#[derive(Debug, Error)]
pub enum MetadataError {
    /// Malformed container or tag data
    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    /// Reading or writing the file failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
