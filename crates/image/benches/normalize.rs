//! Benchmarks for raster normalization.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use heic_image::{normalize, Bounds, ChromaSubsampling, Raster, RgbaRaster, YCbCrRaster};

const WIDTH: u32 = 1024;
const HEIGHT: u32 = 768;

fn straight_raster() -> RgbaRaster {
    let bounds = Bounds::from_size(WIDTH, HEIGHT);
    let pix = (0..bounds.area() * 4).map(|i| (i % 251) as u8).collect();
    RgbaRaster::from_raw(bounds, pix).unwrap()
}

fn ycbcr_raster() -> YCbCrRaster {
    let bounds = Bounds::from_size(WIDTH, HEIGHT);
    let (cw, ch) = ChromaSubsampling::Yuv420.chroma_size(WIDTH, HEIGHT);
    let chroma = (cw * ch) as usize;
    YCbCrRaster::from_planes(
        bounds,
        ChromaSubsampling::Yuv420,
        (0..bounds.area()).map(|i| (i % 256) as u8).collect(),
        vec![100; chroma],
        vec![160; chroma],
    )
    .unwrap()
}

fn bench_normalize(c: &mut Criterion) {
    let straight = straight_raster();
    let ycbcr = ycbcr_raster();

    c.bench_function("normalize_straight_1024x768", |b| {
        b.iter(|| normalize(black_box(Raster::Straight(straight.clone()))))
    });

    c.bench_function("normalize_ycbcr_1024x768", |b| {
        b.iter(|| normalize(black_box(Raster::YCbCr(ycbcr.clone()))))
    });
}

criterion_group!(benches, bench_normalize);
criterion_main!(benches);
