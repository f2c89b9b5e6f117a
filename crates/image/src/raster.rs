//! In-memory rasters as produced by source decoders.

use std::fmt;

/// Pixel rectangle: origin plus extent.
///
/// Rows run from `y` to `y + height` and columns from `x` to `x + width`,
/// inclusive-exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Bounds {
    /// Leftmost column
    pub x: i32,
    /// Topmost row
    pub y: i32,
    /// Number of columns
    pub width: u32,
    /// Number of rows
    pub height: u32,
}

impl Bounds {
    /// Bounds with an explicit origin.
    pub fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self { x, y, width, height }
    }

    /// Bounds anchored at (0, 0).
    pub fn from_size(width: u32, height: u32) -> Self {
        Self::new(0, 0, width, height)
    }

    /// One past the rightmost column.
    pub fn max_x(&self) -> i32 {
        self.x + self.width as i32
    }

    /// One past the bottom row.
    pub fn max_y(&self) -> i32 {
        self.y + self.height as i32
    }

    /// Whether either axis is zero.
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Pixel count.
    pub fn area(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Whether `(x, y)` lies inside.
    pub fn contains(&self, x: i32, y: i32) -> bool {
        x >= self.x && x < self.max_x() && y >= self.y && y < self.max_y()
    }
}

impl fmt::Display for Bounds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({},{})+{}x{}", self.x, self.y, self.width, self.height)
    }
}

/// Per-pixel color query at 16 bits per channel.
///
/// Channels are straight (not premultiplied): color is independent of alpha.
/// Implementations must be side-effect free so rows can be read in parallel.
pub trait PixelSource {
    /// Pixel rectangle covered by this source.
    fn bounds(&self) -> Bounds;

    /// `[r, g, b, a]` at `(x, y)`, each scaled to `0..=0xFFFF`.
    fn rgba16(&self, x: i32, y: i32) -> [u16; 4];
}

/// Interleaved 8-bit RGBA pixels.
///
/// Whether color is straight or alpha-associated is decided by the
/// [`Raster`] variant that carries it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RgbaRaster {
    bounds: Bounds,
    pix: Vec<u8>,
}

impl RgbaRaster {
    /// Bytes per pixel.
    pub const CHANNELS: usize = 4;

    /// Fully transparent black raster.
    pub fn new(bounds: Bounds) -> Self {
        Self {
            bounds,
            pix: vec![0; bounds.area() * Self::CHANNELS],
        }
    }

    /// Wrap an existing buffer; `None` if its length does not match `bounds`.
    pub fn from_raw(bounds: Bounds, pix: Vec<u8>) -> Option<Self> {
        (pix.len() == bounds.area() * Self::CHANNELS).then_some(Self { bounds, pix })
    }

    pub(crate) fn from_parts(bounds: Bounds, pix: Vec<u8>) -> Self {
        debug_assert_eq!(pix.len(), bounds.area() * Self::CHANNELS);
        Self { bounds, pix }
    }

    /// Build from a buffer whose rows are `stride` bytes apart.
    pub fn from_strided(bounds: Bounds, data: &[u8], stride: usize) -> Option<Self> {
        let row_len = bounds.width as usize * Self::CHANNELS;
        if bounds.is_empty() {
            return Some(Self::new(bounds));
        }
        if stride < row_len || data.len() < stride * (bounds.height as usize - 1) + row_len {
            return None;
        }

        let mut pix = Vec::with_capacity(bounds.area() * Self::CHANNELS);
        for row in data.chunks(stride).take(bounds.height as usize) {
            pix.extend_from_slice(&row[..row_len]);
        }
        Some(Self { bounds, pix })
    }

    /// Pixel rectangle.
    pub fn bounds(&self) -> Bounds {
        self.bounds
    }

    /// Bytes per row.
    pub fn stride(&self) -> usize {
        self.bounds.width as usize * Self::CHANNELS
    }

    /// Offset of `(x, y)` into the pixel buffer.
    pub fn pix_offset(&self, x: i32, y: i32) -> usize {
        (y - self.bounds.y) as usize * self.stride() + (x - self.bounds.x) as usize * Self::CHANNELS
    }

    /// `[r, g, b, a]` at `(x, y)`.
    ///
    /// # Panics
    /// If `(x, y)` is outside the bounds.
    pub fn pixel(&self, x: i32, y: i32) -> [u8; 4] {
        assert!(self.bounds.contains(x, y), "({x}, {y}) outside {}", self.bounds);
        let i = self.pix_offset(x, y);
        [self.pix[i], self.pix[i + 1], self.pix[i + 2], self.pix[i + 3]]
    }

    /// Overwrite the pixel at `(x, y)`.
    ///
    /// # Panics
    /// If `(x, y)` is outside the bounds.
    pub fn put_pixel(&mut self, x: i32, y: i32, rgba: [u8; 4]) {
        assert!(self.bounds.contains(x, y), "({x}, {y}) outside {}", self.bounds);
        let i = self.pix_offset(x, y);
        self.pix[i..i + Self::CHANNELS].copy_from_slice(&rgba);
    }

    /// Raw interleaved bytes.
    pub fn as_raw(&self) -> &[u8] {
        &self.pix
    }

    pub(crate) fn as_raw_mut(&mut self) -> &mut [u8] {
        &mut self.pix
    }

    /// Take the raw interleaved bytes.
    pub fn into_raw(self) -> Vec<u8> {
        self.pix
    }
}

/// Chroma plane resolution relative to luma.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChromaSubsampling {
    /// Full resolution chroma
    Yuv444,
    /// Half horizontal resolution
    Yuv422,
    /// Half horizontal and vertical resolution
    Yuv420,
    /// Half vertical resolution
    Yuv440,
}

impl ChromaSubsampling {
    fn shifts(self) -> (u32, u32) {
        match self {
            ChromaSubsampling::Yuv444 => (0, 0),
            ChromaSubsampling::Yuv422 => (1, 0),
            ChromaSubsampling::Yuv420 => (1, 1),
            ChromaSubsampling::Yuv440 => (0, 1),
        }
    }

    /// Chroma plane size for a luma plane of `width` x `height`.
    pub fn chroma_size(self, width: u32, height: u32) -> (u32, u32) {
        let (sx, sy) = self.shifts();
        (width.div_ceil(1 << sx), height.div_ceil(1 << sy))
    }
}

/// Planar luma/chroma pixels (full-range BT.601) with implicit full opacity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct YCbCrRaster {
    bounds: Bounds,
    subsampling: ChromaSubsampling,
    y: Vec<u8>,
    cb: Vec<u8>,
    cr: Vec<u8>,
    y_stride: usize,
    c_stride: usize,
}

impl YCbCrRaster {
    /// Build from tightly packed planes; `None` if any plane has the wrong size.
    pub fn from_planes(
        bounds: Bounds,
        subsampling: ChromaSubsampling,
        y: Vec<u8>,
        cb: Vec<u8>,
        cr: Vec<u8>,
    ) -> Option<Self> {
        let (cw, ch) = subsampling.chroma_size(bounds.width, bounds.height);
        let chroma_len = cw as usize * ch as usize;
        if y.len() != bounds.area() || cb.len() != chroma_len || cr.len() != chroma_len {
            return None;
        }

        Some(Self {
            bounds,
            subsampling,
            y,
            cb,
            cr,
            y_stride: bounds.width as usize,
            c_stride: cw as usize,
        })
    }

    /// Pixel rectangle.
    pub fn bounds(&self) -> Bounds {
        self.bounds
    }

    /// Chroma layout.
    pub fn subsampling(&self) -> ChromaSubsampling {
        self.subsampling
    }

    /// `(y, cb, cr)` samples at `(x, y)`.
    pub fn ycbcr(&self, x: i32, y: i32) -> (u8, u8, u8) {
        let (sx, sy) = self.subsampling.shifts();
        let lx = (x - self.bounds.x) as usize;
        let ly = (y - self.bounds.y) as usize;
        let yi = ly * self.y_stride + lx;
        let ci = (ly >> sy) * self.c_stride + (lx >> sx);
        (self.y[yi], self.cb[ci], self.cr[ci])
    }
}

impl PixelSource for YCbCrRaster {
    fn bounds(&self) -> Bounds {
        self.bounds
    }

    fn rgba16(&self, x: i32, y: i32) -> [u16; 4] {
        let (yy, cb, cr) = self.ycbcr(x, y);
        let [r, g, b] = ycbcr_to_rgb16(yy, cb, cr);
        [r, g, b, 0xFFFF]
    }
}

/// Full-range BT.601 luma/chroma to 16-bit RGB.
///
/// Fixed-point with 16 fractional bits; results are clamped to `0..=0xFFFF`.
pub fn ycbcr_to_rgb16(y: u8, cb: u8, cr: u8) -> [u16; 3] {
    // 1.402, 0.34414, 0.71414 and 1.772 scaled by 2^16
    let yy = i32::from(y) * 0x10101;
    let cb = i32::from(cb) - 128;
    let cr = i32::from(cr) - 128;

    let r = yy + 91881 * cr;
    let g = yy - 22554 * cb - 46802 * cr;
    let b = yy + 116130 * cb;

    [clamp16(r), clamp16(g), clamp16(b)]
}

fn clamp16(v: i32) -> u16 {
    (v >> 8).clamp(0, 0xFFFF) as u16
}

/// A decoded source image, tagged by pixel representation.
pub enum Raster {
    /// 8-bit RGBA whose color already reflects alpha; copied as-is.
    Associated(RgbaRaster),
    /// 8-bit RGBA with color independent of alpha.
    Straight(RgbaRaster),
    /// Planar luma/chroma, always opaque.
    YCbCr(YCbCrRaster),
    /// Anything else, read through per-pixel queries.
    Other(Box<dyn PixelSource + Send + Sync>),
}

impl Raster {
    /// Pixel rectangle of the underlying data.
    pub fn bounds(&self) -> Bounds {
        match self {
            Raster::Associated(r) | Raster::Straight(r) => r.bounds(),
            Raster::YCbCr(r) => r.bounds(),
            Raster::Other(src) => src.bounds(),
        }
    }

    /// Short variant name for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Raster::Associated(_) => "associated-rgba8",
            Raster::Straight(_) => "straight-rgba8",
            Raster::YCbCr(_) => "ycbcr",
            Raster::Other(_) => "generic",
        }
    }
}

impl fmt::Debug for Raster {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Raster")
            .field("kind", &self.kind())
            .field("bounds", &self.bounds())
            .finish()
    }
}

/// Fully opaque 8-bit RGBA raster ready for encoding.
///
/// Every pixel's alpha is 255.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalRaster(RgbaRaster);

impl CanonicalRaster {
    pub(crate) fn from_opaque(raster: RgbaRaster) -> Self {
        debug_assert!(raster.as_raw().chunks_exact(4).all(|p| p[3] == 255));
        Self(raster)
    }

    /// Pixel rectangle.
    pub fn bounds(&self) -> Bounds {
        self.0.bounds()
    }

    /// `[r, g, b, 255]` at `(x, y)`.
    pub fn pixel(&self, x: i32, y: i32) -> [u8; 4] {
        self.0.pixel(x, y)
    }

    /// Underlying RGBA data.
    pub fn as_rgba(&self) -> &RgbaRaster {
        &self.0
    }

    /// Packed RGB bytes, row-major.
    pub fn to_rgb8(&self) -> Vec<u8> {
        let mut rgb = Vec::with_capacity(self.bounds().area() * 3);
        for px in self.0.as_raw().chunks_exact(4) {
            rgb.extend_from_slice(&px[..3]);
        }
        rgb
    }

    /// Give back the RGBA data.
    pub fn into_inner(self) -> RgbaRaster {
        self.0
    }
}
