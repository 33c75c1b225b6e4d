//! Benchmarks for the Curator transform stage.
//!
//! Run with: cargo bench -p curator-core

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use curator_core::config::{Config, LimitsConfig};
use curator_core::naming::slug_for;
use curator_core::pipeline::{Hasher, ImageDecoder, Transformer};
use curator_core::Device;
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use std::io::Cursor;
use std::path::Path;

/// Synthetic 1920x1080 PNG so the benches need no fixture files.
fn source_png() -> Vec<u8> {
    let img = RgbImage::from_fn(1920, 1080, |x, y| {
        Rgb([(x % 256) as u8, (y % 256) as u8, ((x ^ y) % 256) as u8])
    });
    let mut bytes = Vec::new();
    DynamicImage::ImageRgb8(img)
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .unwrap();
    bytes
}

fn benchmark_content_hash(c: &mut Criterion) {
    let bytes = source_png();

    c.bench_function("content_hash_blake3", |b| {
        b.iter(|| Hasher::content_hash(black_box(&bytes)))
    });
}

fn benchmark_decode(c: &mut Criterion) {
    let bytes = source_png();
    let decoder = ImageDecoder::new(LimitsConfig::default());
    let path = Path::new("bench.png");

    c.bench_function("decode_1080p_png", |b| {
        b.iter(|| {
            let _ = decoder.decode(black_box(&bytes), path);
        })
    });
}

fn benchmark_transform(c: &mut Criterion) {
    let bytes = source_png();
    let transformer = Transformer::new(&Config::default());
    let path = Path::new("bench.png");

    let mut group = c.benchmark_group("transform_1080p");
    group.sample_size(10);
    for device in [Device::Desktop, Device::Mobile] {
        group.bench_function(device.as_str(), |b| {
            b.iter(|| {
                let _ = transformer.transform(black_box(&bytes), path, device);
            })
        });
    }
    group.finish();
}

fn benchmark_slug(c: &mut Criterion) {
    c.bench_function("slug_for", |b| {
        b.iter(|| {
            slug_for(
                black_box("Sunset Over The Sea (2024) final.JPG"),
                black_box("Beaches & Coasts"),
                Device::Desktop,
            )
        })
    });
}

criterion_group!(
    benches,
    benchmark_content_hash,
    benchmark_decode,
    benchmark_transform,
    benchmark_slug,
);
criterion_main!(benches);
