//! Output file helpers

use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Derive the output path by swapping the extension, keeping the directory.
///
/// `photos/IMG_0001.HEIC` with `jpg` becomes `photos/IMG_0001.jpg`.
pub fn output_path(input: &Path, extension: &str) -> PathBuf {
    input.with_extension(extension)
}

/// Write `bytes` to `path` through a temporary file in the same directory.
///
/// The destination is either left untouched or fully replaced; a failure
/// midway never leaves a truncated file behind.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}
