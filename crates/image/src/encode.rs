//! Target encoders.

use crate::error::{ImageError, Result};
use crate::raster::CanonicalRaster;
use image::codecs::jpeg::JpegEncoder;
use image::ColorType;

/// Quality used for every JPEG written by the converter.
pub const JPEG_QUALITY: u8 = 95;

/// Serializes a canonical raster into an output container.
pub trait TargetEncoder: Send + Sync {
    /// File extension of the produced container, without the dot.
    fn extension(&self) -> &'static str;

    /// Encode `raster` at `quality` (0-100).
    fn encode(&self, raster: &CanonicalRaster, quality: u8) -> Result<Vec<u8>>;
}

/// Baseline JPEG via the `image` crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct JpegTargetEncoder;

impl TargetEncoder for JpegTargetEncoder {
    fn extension(&self) -> &'static str {
        "jpg"
    }

    fn encode(&self, raster: &CanonicalRaster, quality: u8) -> Result<Vec<u8>> {
        if quality > 100 {
            return Err(ImageError::Encode(format!("quality {} is outside 0-100", quality)));
        }
        let bounds = raster.bounds();
        if bounds.is_empty() {
            return Err(ImageError::Encode(format!(
                "cannot encode an empty {}x{} raster",
                bounds.width, bounds.height
            )));
        }

        let rgb = raster.to_rgb8();
        let mut buffer = Vec::new();
        // JPEG quality 0 is not meaningful; the encoder expects 1-100
        JpegEncoder::new_with_quality(&mut buffer, quality.max(1))
            .encode(&rgb, bounds.width, bounds.height, ColorType::Rgb8)
            .map_err(|e| ImageError::Encode(e.to_string()))?;

        Ok(buffer)
    }
}
