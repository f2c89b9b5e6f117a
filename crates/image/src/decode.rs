//! Source decoders and the registry that picks one per file.

use crate::error::{ImageError, Result};
use crate::raster::{Bounds, PixelSource, Raster, RgbaRaster};
use image::{DynamicImage, ImageBuffer, Rgba};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Source formats the converter can read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceFormat {
    /// HEIC/HEIF (needs the `heif` feature)
    Heif,
    /// PNG image
    Png,
    /// WebP image
    WebP,
    /// GIF image (first frame)
    Gif,
}

impl SourceFormat {
    /// Every known source format.
    pub const ALL: [SourceFormat; 4] = [
        SourceFormat::Heif,
        SourceFormat::Png,
        SourceFormat::WebP,
        SourceFormat::Gif,
    ];

    /// Config/CLI spelling.
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceFormat::Heif => "heif",
            SourceFormat::Png => "png",
            SourceFormat::WebP => "webp",
            SourceFormat::Gif => "gif",
        }
    }

    /// Whether this build can decode the format.
    pub fn is_supported(&self) -> bool {
        match self {
            SourceFormat::Heif => cfg!(feature = "heif"),
            _ => true,
        }
    }

    /// Formats looked for when none are configured.
    ///
    /// HEIF alone when it is compiled in, otherwise every format the
    /// `image` crate decodes.
    pub fn defaults() -> Vec<SourceFormat> {
        if SourceFormat::Heif.is_supported() {
            return vec![SourceFormat::Heif];
        }
        Self::ALL.into_iter().filter(|f| f.is_supported()).collect()
    }

    /// Common file extensions for this format.
    pub fn extensions(&self) -> &'static [&'static str] {
        match self {
            SourceFormat::Heif => &["heic", "heif"],
            SourceFormat::Png => &["png"],
            SourceFormat::WebP => &["webp"],
            SourceFormat::Gif => &["gif"],
        }
    }
}

impl fmt::Display for SourceFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SourceFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "heif" | "heic" => Ok(SourceFormat::Heif),
            "png" => Ok(SourceFormat::Png),
            "webp" => Ok(SourceFormat::WebP),
            "gif" => Ok(SourceFormat::Gif),
            other => Err(format!(
                "unknown source format `{}` (expected one of: heif, png, webp, gif)",
                other
            )),
        }
    }
}

/// Turns encoded source bytes into a [`Raster`].
pub trait SourceDecoder: Send + Sync {
    /// Format handled by this decoder.
    fn format(&self) -> SourceFormat;

    /// Lowercase extensions (without dot) this decoder claims.
    fn extensions(&self) -> &'static [&'static str] {
        self.format().extensions()
    }

    /// Decode a whole file.
    fn decode(&self, data: &[u8]) -> Result<Raster>;

    /// Raw EXIF block embedded in the source, if the format carries one.
    fn exif(&self, _data: &[u8]) -> Result<Option<Vec<u8>>> {
        Ok(None)
    }
}

/// PNG, WebP and GIF through the `image` crate.
#[derive(Debug, Clone, Copy)]
pub struct StandardDecoder {
    format: SourceFormat,
    image_format: image::ImageFormat,
}

impl StandardDecoder {
    /// Decoder for one of the formats the `image` crate reads.
    pub fn new(format: SourceFormat) -> Result<Self> {
        let image_format = match format {
            SourceFormat::Png => image::ImageFormat::Png,
            SourceFormat::WebP => image::ImageFormat::WebP,
            SourceFormat::Gif => image::ImageFormat::Gif,
            SourceFormat::Heif => {
                return Err(ImageError::UnsupportedSource(
                    "heif is not handled by the image crate".to_string(),
                ))
            }
        };
        Ok(Self { format, image_format })
    }
}

impl SourceDecoder for StandardDecoder {
    fn format(&self) -> SourceFormat {
        self.format
    }

    fn decode(&self, data: &[u8]) -> Result<Raster> {
        let img = image::load_from_memory_with_format(data, self.image_format)
            .map_err(|e| ImageError::Decode(e.to_string()))?;
        Ok(raster_from_dynamic(img))
    }
}

/// Map an `image` crate buffer onto the matching [`Raster`] variant.
///
/// RGBA8 is straight alpha, RGB8 is opaque and copied as-is, every other
/// layout goes through 16-bit per-pixel queries.
pub fn raster_from_dynamic(img: DynamicImage) -> Raster {
    let bounds = Bounds::from_size(img.width(), img.height());
    match img {
        DynamicImage::ImageRgba8(buf) => {
            Raster::Straight(RgbaRaster::from_parts(bounds, buf.into_raw()))
        }
        DynamicImage::ImageRgb8(buf) => {
            let mut pix = Vec::with_capacity(bounds.area() * 4);
            for px in buf.as_raw().chunks_exact(3) {
                pix.extend_from_slice(&[px[0], px[1], px[2], 255]);
            }
            Raster::Associated(RgbaRaster::from_parts(bounds, pix))
        }
        other => Raster::Other(Box::new(DynamicSource::new(other))),
    }
}

/// 16-bit straight RGBA view over any `image` crate buffer.
pub struct DynamicSource {
    buf: ImageBuffer<Rgba<u16>, Vec<u16>>,
}

impl DynamicSource {
    /// Widen `img` to 16-bit RGBA.
    pub fn new(img: DynamicImage) -> Self {
        Self { buf: img.to_rgba16() }
    }
}

impl PixelSource for DynamicSource {
    fn bounds(&self) -> Bounds {
        Bounds::from_size(self.buf.width(), self.buf.height())
    }

    fn rgba16(&self, x: i32, y: i32) -> [u16; 4] {
        self.buf.get_pixel(x as u32, y as u32).0
    }
}

/// Ordered set of decoders, looked up by file extension.
pub struct DecoderRegistry {
    decoders: Vec<Box<dyn SourceDecoder>>,
}

impl DecoderRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self { decoders: Vec::new() }
    }

    /// Registry with one decoder per requested format.
    ///
    /// Fails if a format cannot be decoded by this build.
    pub fn for_formats(formats: &[SourceFormat]) -> Result<Self> {
        let mut registry = Self::new();
        for &format in formats {
            if registry.decoders.iter().any(|d| d.format() == format) {
                continue;
            }
            registry.register(decoder_for_format(format)?);
        }
        Ok(registry)
    }

    /// Append a decoder; earlier decoders win on extension clashes.
    pub fn register(&mut self, decoder: Box<dyn SourceDecoder>) {
        self.decoders.push(decoder);
    }

    /// Decoder claiming the extension of `path` (case-insensitive).
    pub fn decoder_for(&self, path: &Path) -> Option<&dyn SourceDecoder> {
        let ext = path.extension()?.to_str()?;
        self.decoders
            .iter()
            .find(|d| d.extensions().iter().any(|e| ext.eq_ignore_ascii_case(e)))
            .map(|d| d.as_ref())
    }

    /// Every extension claimed by a registered decoder.
    pub fn extensions(&self) -> Vec<&'static str> {
        self.decoders
            .iter()
            .flat_map(|d| d.extensions().iter().copied())
            .collect()
    }

    /// Whether no decoder is registered.
    pub fn is_empty(&self) -> bool {
        self.decoders.is_empty()
    }
}

impl fmt::Debug for DecoderRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.decoders.iter().map(|d| d.format()))
            .finish()
    }
}

impl Default for DecoderRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn decoder_for_format(format: SourceFormat) -> Result<Box<dyn SourceDecoder>> {
    match format {
        #[cfg(feature = "heif")]
        SourceFormat::Heif => Ok(Box::new(crate::heif::HeifDecoder::new())),
        #[cfg(not(feature = "heif"))]
        SourceFormat::Heif => Err(ImageError::UnsupportedSource(
            "heif support was not compiled in (enable the `heif` feature)".to_string(),
        )),
        other => Ok(Box::new(StandardDecoder::new(other)?)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageOutputFormat, LumaA, RgbImage, RgbaImage};
    use std::io::Cursor;

    fn png_bytes(img: DynamicImage) -> Vec<u8> {
        let mut buf = Cursor::new(Vec::new());
        img.write_to(&mut buf, ImageOutputFormat::Png).unwrap();
        buf.into_inner()
    }

    #[test]
    fn test_source_format_parse() {
        assert_eq!("HEIC".parse::<SourceFormat>().unwrap(), SourceFormat::Heif);
        assert_eq!("webp".parse::<SourceFormat>().unwrap(), SourceFormat::WebP);
        assert!("tiff".parse::<SourceFormat>().is_err());
    }

    #[test]
    fn test_rgba8_maps_to_straight() {
        let img = RgbaImage::from_pixel(2, 3, Rgba([1, 2, 3, 4]));
        let raster = raster_from_dynamic(DynamicImage::ImageRgba8(img));
        assert!(matches!(raster, Raster::Straight(_)));
        assert_eq!(raster.bounds(), Bounds::from_size(2, 3));
    }

    #[test]
    fn test_rgb8_maps_to_opaque_associated() {
        let img = RgbImage::from_pixel(1, 1, image::Rgb([9, 8, 7]));
        match raster_from_dynamic(DynamicImage::ImageRgb8(img)) {
            Raster::Associated(r) => assert_eq!(r.pixel(0, 0), [9, 8, 7, 255]),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_other_layouts_map_to_generic() {
        let img = image::ImageBuffer::from_pixel(1, 1, LumaA([0x80u8, 0xFF]));
        let raster = raster_from_dynamic(DynamicImage::ImageLumaA8(img));
        match raster {
            Raster::Other(src) => assert_eq!(src.rgba16(0, 0), [0x8080, 0x8080, 0x8080, 0xFFFF]),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_standard_decoder_png() {
        let img = RgbaImage::from_pixel(4, 4, Rgba([255, 0, 0, 128]));
        let bytes = png_bytes(DynamicImage::ImageRgba8(img));

        let decoder = StandardDecoder::new(SourceFormat::Png).unwrap();
        let raster = decoder.decode(&bytes).unwrap();
        assert_eq!(raster.kind(), "straight-rgba8");
        assert_eq!(raster.bounds(), Bounds::from_size(4, 4));
    }

    #[test]
    fn test_standard_decoder_rejects_garbage() {
        let decoder = StandardDecoder::new(SourceFormat::Png).unwrap();
        let err = decoder.decode(b"definitely not a png").unwrap_err();
        assert!(matches!(err, ImageError::Decode(_)));
    }

    #[test]
    fn test_registry_lookup_case_insensitive() {
        let registry = DecoderRegistry::for_formats(&[SourceFormat::Png, SourceFormat::Gif]).unwrap();

        assert_eq!(registry.extensions(), vec!["png", "gif"]);
        assert!(registry.decoder_for(Path::new("a/b/IMG.PNG")).is_some());
        assert_eq!(
            registry.decoder_for(Path::new("x.Gif")).map(|d| d.format()),
            Some(SourceFormat::Gif)
        );
        assert!(registry.decoder_for(Path::new("x.webp")).is_none());
        assert!(registry.decoder_for(Path::new("no_extension")).is_none());
    }

    #[test]
    fn test_registry_deduplicates() {
        let registry = DecoderRegistry::for_formats(&[SourceFormat::Png, SourceFormat::Png]).unwrap();
        assert_eq!(registry.extensions(), vec!["png"]);
    }

    #[test]
    fn test_default_formats_are_supported() {
        let defaults = SourceFormat::defaults();
        assert!(!defaults.is_empty());
        assert!(defaults.iter().all(|f| f.is_supported()));
        assert!(DecoderRegistry::for_formats(&defaults).is_ok());
    }

    #[cfg(feature = "heif")]
    #[test]
    fn test_defaults_with_heif() {
        assert_eq!(SourceFormat::defaults(), vec![SourceFormat::Heif]);
    }

    #[cfg(not(feature = "heif"))]
    #[test]
    fn test_defaults_without_heif() {
        assert!(!SourceFormat::Heif.is_supported());
        assert_eq!(
            SourceFormat::defaults(),
            vec![SourceFormat::Png, SourceFormat::WebP, SourceFormat::Gif]
        );
    }

    #[test]
    fn test_registry_debug_lists_formats() {
        let registry = DecoderRegistry::for_formats(&[SourceFormat::Png, SourceFormat::Gif]).unwrap();
        assert_eq!(format!("{:?}", registry), "[Png, Gif]");
    }

    #[cfg(not(feature = "heif"))]
    #[test]
    fn test_registry_without_heif_support() {
        let err = DecoderRegistry::for_formats(&[SourceFormat::Heif]).err().unwrap();
        assert!(matches!(err, ImageError::UnsupportedSource(_)));
    }
}
