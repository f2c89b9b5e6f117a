//! EXIF removal and inspection on encoded JPEG bytes.

use crate::error::{ParseError, Result};
use crate::segment::SegmentList;
use crate::tiff::{parse_exif, ExifTag};
use std::fs;
use std::path::Path;
use tracing::debug;

/// Remove the EXIF segment and re-serialize everything else in order.
///
/// A container without EXIF comes back unchanged.
pub fn strip_metadata(data: &[u8]) -> std::result::Result<Vec<u8>, ParseError> {
    let mut segments = SegmentList::parse(data)?;
    let removed = segments.drop_exif();
    debug!(removed, "dropped EXIF segments");
    Ok(segments.to_bytes())
}

/// Whether the container carries EXIF, and the names of its tags.
///
/// A missing EXIF segment is `(false, [])`. A segment whose tag structure
/// is malformed is an error.
pub fn has_metadata(data: &[u8]) -> std::result::Result<(bool, Vec<String>), ParseError> {
    match read_tags(data)? {
        Some(tags) => Ok((true, tags.into_iter().map(|t| t.name).collect())),
        None => Ok((false, Vec::new())),
    }
}

/// Parsed tags of the container's EXIF segment, if it has one.
pub fn read_tags(data: &[u8]) -> std::result::Result<Option<Vec<ExifTag>>, ParseError> {
    let segments = SegmentList::parse(data)?;
    match segments.exif() {
        Some((_, tiff)) => parse_exif(tiff).map(Some),
        None => Ok(None),
    }
}

/// TIFF data of the container's EXIF segment.
pub fn extract_exif(data: &[u8]) -> std::result::Result<Option<Vec<u8>>, ParseError> {
    let segments = SegmentList::parse(data)?;
    Ok(segments.exif().map(|(_, tiff)| tiff.to_vec()))
}

/// Strip EXIF from a JPEG file in place.
///
/// The file is only rewritten when something was removed, and the rewrite
/// goes through a temporary file. Returns the number of segments removed.
pub fn strip_metadata_file(path: &Path) -> Result<usize> {
    let data = fs::read(path)?;
    let mut segments = SegmentList::parse(&data)?;
    let removed = segments.drop_exif();
    if removed > 0 {
        heic_core::fs::write_atomic(path, &segments.to_bytes())?;
        debug!(path = %path.display(), removed, "rewrote file without EXIF");
    }
    Ok(removed)
}

/// [`has_metadata`] on a file.
pub fn check_file(path: &Path) -> Result<(bool, Vec<String>)> {
    let data = fs::read(path)?;
    Ok(has_metadata(&data)?)
}
