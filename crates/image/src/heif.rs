//! HEIC/HEIF decoding through libheif.

use crate::decode::{SourceDecoder, SourceFormat};
use crate::error::{ImageError, Result};
use crate::raster::{Bounds, ChromaSubsampling, Raster, RgbaRaster, YCbCrRaster};
use libheif_rs::{Chroma, ColorSpace, HeifContext, ImageHandle, LibHeif, Plane, RgbChroma};
use tracing::debug;

/// Decoder for the primary image of a HEIF container.
///
/// libheif is initialised per call, so one decoder can serve a parallel batch.
#[derive(Debug, Default, Clone, Copy)]
pub struct HeifDecoder;

impl HeifDecoder {
    /// New decoder.
    pub fn new() -> Self {
        Self
    }

    fn decode_rgba(&self, handle: &ImageHandle, bounds: Bounds) -> Result<RgbaRaster> {
        let lib = LibHeif::new();
        let image = lib
            .decode(handle, ColorSpace::Rgb(RgbChroma::Rgba), None)
            .map_err(decode_error)?;
        let planes = image.planes();
        let plane = planes
            .interleaved
            .ok_or_else(|| ImageError::Decode("libheif returned no interleaved plane".into()))?;

        RgbaRaster::from_strided(bounds, plane.data, plane.stride)
            .ok_or_else(|| ImageError::Decode("interleaved plane is smaller than the image".into()))
    }

    fn decode_ycbcr(&self, handle: &ImageHandle, bounds: Bounds) -> Result<YCbCrRaster> {
        let lib = LibHeif::new();
        let image = lib
            .decode(handle, ColorSpace::YCbCr(Chroma::C420), None)
            .map_err(decode_error)?;
        let planes = image.planes();
        let missing = || ImageError::Decode("libheif returned an incomplete YCbCr image".into());

        let y = packed(planes.y.ok_or_else(missing)?);
        let cb = packed(planes.cb.ok_or_else(missing)?);
        let cr = packed(planes.cr.ok_or_else(missing)?);

        YCbCrRaster::from_planes(bounds, ChromaSubsampling::Yuv420, y, cb, cr)
            .ok_or_else(|| ImageError::Decode("plane sizes do not match 4:2:0 layout".into()))
    }

    fn decode_rgb(&self, handle: &ImageHandle, bounds: Bounds) -> Result<RgbaRaster> {
        let lib = LibHeif::new();
        let image = lib
            .decode(handle, ColorSpace::Rgb(RgbChroma::Rgb), None)
            .map_err(decode_error)?;
        let planes = image.planes();
        let plane = planes
            .interleaved
            .ok_or_else(|| ImageError::Decode("libheif returned no interleaved plane".into()))?;

        let row_len = bounds.width as usize * 3;
        let mut pix = Vec::with_capacity(bounds.area() * 4);
        for row in plane.data.chunks(plane.stride).take(bounds.height as usize) {
            let row = row
                .get(..row_len)
                .ok_or_else(|| ImageError::Decode("interleaved row is truncated".into()))?;
            for px in row.chunks_exact(3) {
                pix.extend_from_slice(&[px[0], px[1], px[2], 255]);
            }
        }

        RgbaRaster::from_raw(bounds, pix)
            .ok_or_else(|| ImageError::Decode("interleaved plane is smaller than the image".into()))
    }
}

impl SourceDecoder for HeifDecoder {
    fn format(&self) -> SourceFormat {
        SourceFormat::Heif
    }

    fn decode(&self, data: &[u8]) -> Result<Raster> {
        let ctx = HeifContext::read_from_bytes(data).map_err(decode_error)?;
        let handle = ctx.primary_image_handle().map_err(decode_error)?;
        let bounds = Bounds::from_size(handle.width(), handle.height());

        let layout = Layout::for_image(
            handle.has_alpha_channel(),
            handle.is_premultiplied_alpha(),
            handle.luma_bits_per_pixel(),
        );
        let raster = match layout {
            Layout::Associated => Raster::Associated(self.decode_rgba(&handle, bounds)?),
            Layout::Straight => Raster::Straight(self.decode_rgba(&handle, bounds)?),
            Layout::YCbCr420 => Raster::YCbCr(self.decode_ycbcr(&handle, bounds)?),
            Layout::OpaqueRgb => Raster::Associated(self.decode_rgb(&handle, bounds)?),
        };

        debug!(kind = raster.kind(), %bounds, "decoded HEIF primary image");
        Ok(raster)
    }

    fn exif(&self, data: &[u8]) -> Result<Option<Vec<u8>>> {
        let ctx = HeifContext::read_from_bytes(data).map_err(decode_error)?;
        let handle = ctx.primary_image_handle().map_err(decode_error)?;

        let Some(&id) = handle.metadata_block_ids(b"Exif").first() else {
            return Ok(None);
        };
        let block = handle.metadata(id).map_err(decode_error)?;
        Ok((!block.is_empty()).then_some(block))
    }
}

/// How the primary image is pulled out of libheif.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Layout {
    /// RGBA with premultiplied color
    Associated,
    /// RGBA with unassociated color
    Straight,
    /// 8-bit luma/chroma planes, 4:2:0
    YCbCr420,
    /// Interleaved RGB, alpha filled in as opaque
    OpaqueRgb,
}

impl Layout {
    fn for_image(has_alpha: bool, premultiplied: bool, luma_bits: u8) -> Self {
        match (has_alpha, premultiplied) {
            (true, true) => Layout::Associated,
            (true, false) => Layout::Straight,
            (false, _) if luma_bits == 8 => Layout::YCbCr420,
            (false, _) => Layout::OpaqueRgb,
        }
    }
}

/// Copy a plane without its row padding.
fn packed(plane: Plane<&[u8]>) -> Vec<u8> {
    let width = plane.width as usize;
    let mut out = Vec::with_capacity(width * plane.height as usize);
    for row in plane.data.chunks(plane.stride).take(plane.height as usize) {
        out.extend_from_slice(&row[..width.min(row.len())]);
    }
    out
}

fn decode_error(err: libheif_rs::HeifError) -> ImageError {
    ImageError::Decode(err.to_string())
}
