// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Criterion benchmarks for the terminscan-scan crate: the quality gate and the
// full multi-variant enhancement on a synthetic schedule page.

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use image::{DynamicImage, Rgba, RgbaImage};

use terminscan_scan::{ImageEnhancer, QualityAssessor};

/// A 320x240 page with dark text bars every few rows.
fn synthetic_page() -> RgbaImage {
    RgbaImage::from_fn(320, 240, |x, y| {
        let ink = (y % 12 < 4) && (x % 40 < 30);
        let v = if ink { 25 } else { 235 };
        Rgba([v, v, v, 255])
    })
}

fn bench_quality(c: &mut Criterion) {
    let page = synthetic_page();
    let assessor = QualityAssessor::default();
    c.bench_function("quality_assess (320x240)", |b| {
        b.iter(|| black_box(assessor.assess(black_box(&page))))
    });
}

fn bench_enhance(c: &mut Criterion) {
    let page = DynamicImage::ImageRgba8(synthetic_page());
    let enhancer = ImageEnhancer::default();
    c.bench_function("enhance_all_variants (320x240)", |b| {
        b.iter(|| black_box(enhancer.enhance(black_box(&page), 0.5, true)))
    });
}

criterion_group!(benches, bench_quality, bench_enhance);
criterion_main!(benches);
