//! Single-file conversion: decode, normalize, encode, strip, write.

use crate::options::ConvertOptions;
use heic_core::fs::{output_path, write_atomic};
use heic_core::{Error, Result};
use heic_exif::strip_metadata;
use heic_image::{normalize, DecoderRegistry, TargetEncoder};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, instrument, warn};

/// Result of one successful conversion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Conversion {
    /// Source file
    pub input: PathBuf,
    /// Written JPEG
    pub output: PathBuf,
    /// Size of the written file
    pub bytes_written: u64,
    /// Whether EXIF stripping ran successfully
    pub metadata_stripped: bool,
    /// Non-fatal problems, such as a failed EXIF strip
    pub warnings: Vec<String>,
}

/// Convert one source file next to itself.
///
/// Nothing is written unless decoding and encoding both succeed. A failed
/// EXIF strip is a warning and the unstripped JPEG is kept.
#[instrument(skip(registry, encoder, options), fields(path = %path.display()))]
pub fn convert_file(
    path: &Path,
    registry: &DecoderRegistry,
    encoder: &dyn TargetEncoder,
    options: &ConvertOptions,
) -> Result<Conversion> {
    if !path.exists() {
        return Err(Error::not_found(path));
    }

    let decoder = registry
        .decoder_for(path)
        .ok_or_else(|| Error::unsupported_format(path, &registry.extensions()))?;

    let data = fs::read(path).map_err(|e| Error::io_at(e, path))?;

    let raster = decoder
        .decode(&data)
        .map_err(|e| Error::decode(path, e.to_string()))?;
    debug!(kind = raster.kind(), bounds = %raster.bounds(), "decoded");

    let canonical = normalize(raster);

    let mut bytes = encoder
        .encode(&canonical, options.quality)
        .map_err(|e| Error::encode(path, e.to_string()))?;

    let mut warnings = Vec::new();
    let mut metadata_stripped = false;
    if options.remove_metadata {
        match strip_metadata(&bytes) {
            Ok(stripped) => {
                bytes = stripped;
                metadata_stripped = true;
            }
            Err(e) => {
                warn!(error = %e, "could not remove EXIF, keeping converted image");
                warnings.push(format!("EXIF removal failed: {}", e));
            }
        }
    }

    let output = output_path(path, encoder.extension());
    write_atomic(&output, &bytes).map_err(|e| Error::io_at(e, &output))?;
    debug!(output = %output.display(), bytes = bytes.len(), "written");

    Ok(Conversion {
        input: path.to_path_buf(),
        output,
        bytes_written: bytes.len() as u64,
        metadata_stripped,
        warnings,
    })
}
