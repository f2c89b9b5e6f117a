//! Conversion pipeline for heic-convert
//!
//! - **Convert**: decode, flatten onto white, encode JPEG, optionally strip EXIF
//! - **Batch**: input discovery and per-file conversion that survives failures
//! - **Inspect**: EXIF check on JPEGs and EXIF listing of sources

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod batch;
pub mod convert;
pub mod inspect;
pub mod options;

pub use batch::{collect_inputs, convert_batch, BatchReport, FileOutcome};
pub use convert::{convert_file, Conversion};
pub use inspect::{
    check_exif, check_one, collect_jpegs, read_source_exif, CheckEntry, CheckReport, CheckSummary,
    ExifListing, ExifStatus,
};
pub use options::{parse_sources, ConvertOptions};
