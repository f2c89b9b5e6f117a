//! Raster handling for heic-convert.
//!
//! This crate provides:
//! - The decoded [`Raster`] model (associated/straight RGBA, YCbCr, generic)
//! - [`normalize`], which flattens any raster onto white as opaque RGBA
//! - Source decoders and a registry keyed by file extension
//! - The JPEG target encoder

#![warn(missing_docs)]

mod decode;
mod encode;
mod error;
mod normalize;
mod raster;

#[cfg(feature = "heif")]
mod heif;

pub use decode::{
    raster_from_dynamic, DecoderRegistry, DynamicSource, SourceDecoder, SourceFormat, StandardDecoder,
};
pub use encode::{JpegTargetEncoder, TargetEncoder, JPEG_QUALITY};
pub use error::{ImageError, Result};
pub use normalize::{composite_over_white, composite_straight, normalize, BACKGROUND};
pub use raster::{
    ycbcr_to_rgb16, Bounds, CanonicalRaster, ChromaSubsampling, PixelSource, Raster, RgbaRaster, YCbCrRaster,
};

#[cfg(feature = "heif")]
pub use heif::HeifDecoder;
