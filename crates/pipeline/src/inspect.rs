//! EXIF check and show drivers.

use heic_core::file_scanner::{has_extension, scan_jpeg_files};
use heic_core::error::ErrorReport;
use heic_core::{Error, Result};
use heic_exif::{parse_exif, ExifTag, MetadataError, PRIORITY_TAGS};
use heic_image::DecoderRegistry;
use serde::Serialize;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Extensions treated as JPEG by the check mode.
pub const JPEG_EXTENSIONS: &[&str] = &["jpg", "jpeg"];

/// Resolve a file or directory argument to JPEG files.
pub fn collect_jpegs(path: &Path, skip_hidden: bool) -> Result<Vec<PathBuf>> {
    if !path.exists() {
        return Err(Error::not_found(path));
    }
    if path.is_file() {
        if has_extension(path, JPEG_EXTENSIONS) {
            return Ok(vec![path.to_path_buf()]);
        }
        return Err(Error::unsupported_format(path, JPEG_EXTENSIONS));
    }
    scan_jpeg_files(path, skip_hidden)
}

/// EXIF state of one JPEG.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ExifStatus {
    /// EXIF segment found
    Present {
        /// Tag names in file order
        tags: Vec<String>,
    },
    /// No EXIF segment
    Absent,
    /// File could not be read or parsed
    Error {
        /// Structured error
        error: ErrorReport,
    },
}

/// Check result for one file.
#[derive(Debug, Clone, Serialize)]
pub struct CheckEntry {
    /// Checked file
    pub path: PathBuf,
    /// What was found
    #[serde(flatten)]
    pub status: ExifStatus,
}

/// Totals of a check run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CheckSummary {
    /// Files without EXIF
    pub clean: usize,
    /// Files still carrying EXIF
    pub with_metadata: usize,
    /// Files that could not be checked
    pub errors: usize,
}

/// Per-file results and totals of a check run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CheckReport {
    /// Per-file results, in input order
    pub entries: Vec<CheckEntry>,
    /// Totals
    pub summary: CheckSummary,
}

/// Classify one JPEG.
pub fn check_one(path: &Path) -> ExifStatus {
    match heic_exif::check_file(path) {
        Ok((true, tags)) => ExifStatus::Present { tags },
        Ok((false, _)) => ExifStatus::Absent,
        Err(e) => ExifStatus::Error {
            error: metadata_error(path, e).to_report(),
        },
    }
}

/// Check every file for a remaining EXIF segment.
pub fn check_exif(files: &[PathBuf]) -> CheckReport {
    let mut report = CheckReport::default();
    for path in files {
        let status = check_one(path);
        match &status {
            ExifStatus::Present { tags } => {
                debug!(path = %path.display(), tags = tags.len(), "EXIF present");
                report.summary.with_metadata += 1;
            }
            ExifStatus::Absent => report.summary.clean += 1,
            ExifStatus::Error { .. } => report.summary.errors += 1,
        }
        report.entries.push(CheckEntry {
            path: path.clone(),
            status,
        });
    }
    report
}

fn metadata_error(path: &Path, err: MetadataError) -> Error {
    match err {
        MetadataError::Io(e) => Error::io_at(e, path),
        MetadataError::Parse(e) => Error::metadata_parse(path, e.to_string()),
    }
}

/// EXIF tags of a source file, split for display.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExifListing {
    /// Well-known tags in their fixed display order
    pub priority: Vec<ExifTag>,
    /// Everything else, in file order
    pub others: Vec<ExifTag>,
}

impl ExifListing {
    /// Split tags into the well-known ones and the rest.
    ///
    /// When a name appears in several directories only the first is kept.
    pub fn from_tags(tags: Vec<ExifTag>) -> Self {
        let mut seen = HashSet::new();
        let unique: Vec<ExifTag> = tags
            .into_iter()
            .filter(|t| seen.insert(t.name.clone()))
            .collect();

        let priority = PRIORITY_TAGS
            .iter()
            .filter_map(|name| unique.iter().find(|t| t.name == *name).cloned())
            .collect();
        let others = unique
            .into_iter()
            .filter(|t| !PRIORITY_TAGS.contains(&t.name.as_str()))
            .collect();

        Self { priority, others }
    }

    /// Whether there is nothing to show.
    pub fn is_empty(&self) -> bool {
        self.priority.is_empty() && self.others.is_empty()
    }

    /// Number of tags.
    pub fn len(&self) -> usize {
        self.priority.len() + self.others.len()
    }
}

/// Read and parse the EXIF block embedded in a source file.
///
/// `Ok(None)` means the file carries no EXIF.
pub fn read_source_exif(path: &Path, registry: &DecoderRegistry) -> Result<Option<ExifListing>> {
    if !path.exists() {
        return Err(Error::not_found(path));
    }
    let decoder = registry
        .decoder_for(path)
        .ok_or_else(|| Error::unsupported_format(path, &registry.extensions()))?;
    let data = fs::read(path).map_err(|e| Error::io_at(e, path))?;

    let block = match decoder.exif(&data) {
        Ok(Some(block)) => block,
        Ok(None) => return Ok(None),
        Err(e) => return Err(Error::decode(path, e.to_string())),
    };

    let tags = parse_exif(&block).map_err(|e| Error::metadata_parse(path, e.to_string()))?;
    if tags.is_empty() {
        return Ok(None);
    }
    Ok(Some(ExifListing::from_tags(tags)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use heic_core::ErrorCode;
    use heic_exif::{Ifd, TagValue};

    fn tag(ifd: Ifd, name: &str) -> ExifTag {
        ExifTag {
            ifd,
            id: 0,
            name: name.to_string(),
            value: TagValue::Ascii(name.to_lowercase()),
        }
    }

    /// JPEG with an EXIF APP1 holding one ASCII Make tag, and a scan.
    fn jpeg_with_make(make: &[u8; 4]) -> Vec<u8> {
        let mut tiff = b"II*\0\x08\0\0\0".to_vec();
        tiff.extend_from_slice(&1u16.to_le_bytes());
        tiff.extend_from_slice(&0x010Fu16.to_le_bytes());
        tiff.extend_from_slice(&2u16.to_le_bytes());
        tiff.extend_from_slice(&4u32.to_le_bytes());
        tiff.extend_from_slice(make);
        tiff.extend_from_slice(&0u32.to_le_bytes());

        let mut app1 = b"Exif\0\0".to_vec();
        app1.extend_from_slice(&tiff);

        let mut out = vec![0xFF, 0xD8, 0xFF, 0xE1];
        out.extend_from_slice(&((app1.len() + 2) as u16).to_be_bytes());
        out.extend_from_slice(&app1);
        out.extend_from_slice(&[0xFF, 0xDA, 0x00, 0x02, 0x11, 0x22, 0xFF, 0xD9]);
        out
    }

    #[test]
    fn test_check_exif_classifies_files() {
        let dir = tempfile::tempdir().unwrap();
        let with = dir.path().join("a.jpg");
        let without = dir.path().join("b.JPEG");
        let broken = dir.path().join("c.jpg");
        fs::write(&with, jpeg_with_make(b"Sony")).unwrap();
        fs::write(&without, heic_exif::strip_metadata(&jpeg_with_make(b"Sony")).unwrap()).unwrap();
        fs::write(&broken, b"not a jpeg").unwrap();

        let files = collect_jpegs(dir.path(), false).unwrap();
        assert_eq!(files, vec![with.clone(), without.clone(), broken.clone()]);

        let report = check_exif(&files);
        assert_eq!(
            report.summary,
            CheckSummary {
                clean: 1,
                with_metadata: 1,
                errors: 1
            }
        );
        match &report.entries[0].status {
            ExifStatus::Present { tags } => assert_eq!(tags, &vec!["Make".to_string()]),
            other => panic!("unexpected {:?}", other),
        }
        match &report.entries[2].status {
            ExifStatus::Error { error } => assert_eq!(error.code, ErrorCode::MetadataParse),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_check_report_json_shape() {
        let dir = tempfile::tempdir().unwrap();
        let with = dir.path().join("a.jpg");
        fs::write(&with, jpeg_with_make(b"Leic")).unwrap();

        let json = serde_json::to_value(check_exif(&[with])).unwrap();
        assert_eq!(json["entries"][0]["status"], "present");
        assert_eq!(json["entries"][0]["tags"][0], "Make");
        assert_eq!(json["summary"]["with_metadata"], 1);
    }

    #[test]
    fn test_check_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        match check_one(&dir.path().join("gone.jpg")) {
            ExifStatus::Error { error } => assert_eq!(error.code, ErrorCode::FileNotFound),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_collect_jpegs_single_file() {
        let dir = tempfile::tempdir().unwrap();
        let png = dir.path().join("a.png");
        fs::write(&png, b"").unwrap();
        assert_eq!(collect_jpegs(&png, false).unwrap_err().code, ErrorCode::UnsupportedFormat);

        let jpg = dir.path().join("a.JPG");
        fs::write(&jpg, b"").unwrap();
        assert_eq!(collect_jpegs(&jpg, true).unwrap(), vec![jpg]);

        assert!(collect_jpegs(&dir.path().join("missing"), false).is_err());
    }

    #[test]
    fn test_collect_jpegs_skips_hidden() {
        let dir = tempfile::tempdir().unwrap();
        let hidden = dir.path().join(".trash");
        fs::create_dir_all(&hidden).unwrap();
        fs::write(dir.path().join("a.jpg"), b"").unwrap();
        fs::write(hidden.join("b.jpg"), b"").unwrap();
        fs::write(dir.path().join(".c.jpg"), b"").unwrap();

        assert_eq!(collect_jpegs(dir.path(), false).unwrap().len(), 3);
        assert_eq!(collect_jpegs(dir.path(), true).unwrap(), vec![dir.path().join("a.jpg")]);
    }

    #[test]
    fn test_listing_orders_priority_tags() {
        let tags = vec![
            tag(Ifd::Primary, "Software"),
            tag(Ifd::Primary, "Model"),
            tag(Ifd::Exif, "LensModel"),
            tag(Ifd::Primary, "Make"),
            tag(Ifd::Thumbnail, "Make"),
            tag(Ifd::Exif, "DateTimeOriginal"),
        ];
        let listing = ExifListing::from_tags(tags);

        let priority: Vec<_> = listing.priority.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(priority, vec!["DateTimeOriginal", "Make", "Model", "Software"]);
        assert_eq!(listing.priority[1].ifd, Ifd::Primary);

        let others: Vec<_> = listing.others.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(others, vec!["LensModel"]);
        assert_eq!(listing.len(), 5);
    }

    #[test]
    fn test_png_source_has_no_exif() {
        let dir = tempfile::tempdir().unwrap();
        let png = crate::testing::png_fixture(dir.path(), "a.png", [0, 0, 0, 255]);
        let registry = DecoderRegistry::for_formats(&[heic_image::SourceFormat::Png]).unwrap();

        assert_eq!(read_source_exif(&png, &registry).unwrap(), None);
        let err = read_source_exif(&dir.path().join("b.png"), &registry).unwrap_err();
        assert_eq!(err.code, ErrorCode::FileNotFound);
    }
}
