//! Raster normalization: any decoded raster to an opaque RGBA raster
//! composited over white.

use crate::raster::{Bounds, CanonicalRaster, PixelSource, Raster, RgbaRaster, YCbCrRaster};

/// Background every transparent pixel is composited onto.
pub const BACKGROUND: [u8; 3] = [255, 255, 255];

const OPAQUE: u8 = 255;

/// Produce an opaque raster with the same bounds as `raster`.
///
/// Pure and infallible: every variant has a defined per-pixel color.
///
/// # Example
/// ```
/// use heic_image::{normalize, Bounds, Raster, RgbaRaster};
///
/// let pixel = RgbaRaster::from_raw(Bounds::from_size(1, 1), vec![255, 0, 0, 128]).unwrap();
/// let canonical = normalize(Raster::Straight(pixel));
/// assert_eq!(canonical.pixel(0, 0), [255, 127, 127, 255]);
/// ```
pub fn normalize(raster: Raster) -> CanonicalRaster {
    match raster {
        Raster::Associated(rgba) => force_opaque(rgba),
        Raster::Straight(rgba) => composite_straight_raster(rgba),
        Raster::YCbCr(ycbcr) => convert_ycbcr(&ycbcr),
        Raster::Other(source) => convert_generic(source.as_ref()),
    }
}

/// Associated alpha: keep color bytes, set alpha to opaque.
fn force_opaque(mut rgba: RgbaRaster) -> CanonicalRaster {
    for px in rgba.as_raw_mut().chunks_exact_mut(4) {
        px[3] = OPAQUE;
    }
    CanonicalRaster::from_opaque(rgba)
}

/// Straight alpha: premultiply, then add the white-weighted complement.
fn composite_straight_raster(mut rgba: RgbaRaster) -> CanonicalRaster {
    let stride = rgba.stride();
    for_each_row(rgba.as_raw_mut(), stride, |_, row| {
        for px in row.chunks_exact_mut(4) {
            let a = px[3];
            px[0] = composite_straight(px[0], a);
            px[1] = composite_straight(px[1], a);
            px[2] = composite_straight(px[2], a);
            px[3] = OPAQUE;
        }
    });
    CanonicalRaster::from_opaque(rgba)
}

/// Luma/chroma: convert through 16-bit RGB, drop the implicit alpha.
fn convert_ycbcr(src: &YCbCrRaster) -> CanonicalRaster {
    fill_from(src.bounds(), |x, y| {
        let [r, g, b, _] = src.rgba16(x, y);
        [high_byte(r), high_byte(g), high_byte(b), OPAQUE]
    })
}

/// Generic sources: take the high byte of each channel, blend over white.
fn convert_generic(src: &(dyn PixelSource + Send + Sync)) -> CanonicalRaster {
    fill_from(src.bounds(), |x, y| {
        let [r, g, b, a] = src.rgba16(x, y);
        let a8 = high_byte(a);
        [
            composite_over_white(high_byte(r), a8),
            composite_over_white(high_byte(g), a8),
            composite_over_white(high_byte(b), a8),
            OPAQUE,
        ]
    })
}

/// Integer compositing of one straight-alpha channel onto white.
///
/// Premultiplies with truncating division, then adds `255 - a`. Opaque
/// pixels pass through untouched. The sum never exceeds 255 because
/// `c * a / 255 <= a`.
pub fn composite_straight(c: u8, a: u8) -> u8 {
    if a == OPAQUE {
        return c;
    }
    let premultiplied = u32::from(c) * u32::from(a) / 255;
    (premultiplied + u32::from(OPAQUE - a)) as u8
}

/// Floating-point linear blend of one channel onto white, rounded.
///
/// `a == 255` returns `c` exactly and `a == 0` returns 255 exactly.
pub fn composite_over_white(c: u8, a: u8) -> u8 {
    if a == OPAQUE {
        return c;
    }
    let alpha = f64::from(a) / 255.0;
    let white = f64::from(BACKGROUND[0]);
    (f64::from(c) * alpha + white * (1.0 - alpha)).round() as u8
}

fn high_byte(v: u16) -> u8 {
    (v >> 8) as u8
}

/// Build an opaque raster by evaluating `pixel` at every coordinate.
fn fill_from<F>(bounds: Bounds, pixel: F) -> CanonicalRaster
where
    F: Fn(i32, i32) -> [u8; 4] + Sync,
{
    let mut out = RgbaRaster::new(bounds);
    let stride = out.stride();
    for_each_row(out.as_raw_mut(), stride, |row_index, row| {
        let y = bounds.y + row_index as i32;
        for (col, px) in row.chunks_exact_mut(4).enumerate() {
            px.copy_from_slice(&pixel(bounds.x + col as i32, y));
        }
    });
    CanonicalRaster::from_opaque(out)
}

/// Run `f(row_index, row)` over every row; rows are disjoint so this
/// fans out across threads when the `parallel` feature is on.
fn for_each_row<F>(buf: &mut [u8], stride: usize, f: F)
where
    F: Fn(usize, &mut [u8]) + Sync,
{
    if stride == 0 {
        return;
    }

    #[cfg(feature = "parallel")]
    {
        use rayon::prelude::*;
        buf.par_chunks_mut(stride)
            .enumerate()
            .for_each(|(i, row)| f(i, row));
    }

    #[cfg(not(feature = "parallel"))]
    {
        buf.chunks_mut(stride)
            .enumerate()
            .for_each(|(i, row)| f(i, row));
    }
}
