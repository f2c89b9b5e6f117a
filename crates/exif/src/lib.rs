//! JPEG metadata handling for heic-convert
//!
//! - **Segments**: lossless JPEG segment list parse and serialize
//! - **Tags**: EXIF (TIFF/IFD) tag parsing with well-known names
//! - **Editor**: EXIF removal and inspection

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod editor;
pub mod error;
pub mod segment;
pub mod tags;
pub mod tiff;

pub use editor::{
    check_file, extract_exif, has_metadata, read_tags, strip_metadata, strip_metadata_file,
};
pub use error::{MetadataError, ParseError, Result};
pub use segment::{Segment, SegmentList};
pub use tags::{tag_name, PRIORITY_TAGS};
pub use tiff::{find_tiff_header, parse_exif, ExifTag, Ifd, TagValue};
