//! File scanning utilities
//!
//! Recursive discovery of source images by extension.

use crate::error::{Error, Result};
use std::path::{Path, PathBuf};
use tracing::warn;
use walkdir::WalkDir;

/// File scanner with configurable filters
pub struct FileScanner {
    root: PathBuf,
    extensions: Vec<String>,
    skip_hidden: bool,
}

impl FileScanner {
    /// Create a new file scanner rooted at the given path
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            extensions: Vec::new(),
            skip_hidden: false,
        }
    }

    /// Filter by file extensions, compared case-insensitively (e.g. "heic", "heif")
    pub fn with_extensions(mut self, extensions: &[&str]) -> Self {
        self.extensions = extensions.iter().map(|s| s.to_ascii_lowercase()).collect();
        self
    }

    /// Whether to skip dot-files and dot-directories
    pub fn skip_hidden(mut self, skip: bool) -> Self {
        self.skip_hidden = skip;
        self
    }

    /// Scan and return matching files, sorted by path.
    ///
    /// A missing root is an error. Unreadable entries below the root are
    /// logged and skipped.
    pub fn scan(&self) -> Result<Vec<PathBuf>> {
        if !self.root.exists() {
            return Err(Error::not_found(&self.root));
        }

        let mut files = Vec::new();

        let walker = WalkDir::new(&self.root)
            .into_iter()
            .filter_entry(|e| e.depth() == 0 || !(self.skip_hidden && is_hidden(e.path())));

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    warn!(error = %err, "skipping unreadable entry");
                    continue;
                }
            };

            if !entry.file_type().is_file() {
                continue;
            }

            let path = entry.path();
            if self.extensions.is_empty() || has_extension(path, &self.extensions) {
                files.push(path.to_path_buf());
            }
        }

        files.sort();
        Ok(files)
    }
}

/// Check whether `path` ends in one of `extensions` (lowercase, without dot).
pub fn has_extension<S: AsRef<str>>(path: &Path, extensions: &[S]) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|ext| {
            extensions
                .iter()
                .any(|candidate| ext.eq_ignore_ascii_case(candidate.as_ref()))
        })
        .unwrap_or(false)
}

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(|n| n.starts_with('.') && n != "." && n != "..")
        .unwrap_or(false)
}

/// Scan for JPEG files in a directory
pub fn scan_jpeg_files(root: &Path, skip_hidden: bool) -> Result<Vec<PathBuf>> {
    FileScanner::new(root)
        .with_extensions(&["jpg", "jpeg"])
        .skip_hidden(skip_hidden)
        .scan()
}
