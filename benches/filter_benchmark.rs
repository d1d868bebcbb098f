//! Benchmarks for docfilter moderation and container performance.
//!
//! Run with: cargo bench
//!
//! Classifiers are replaced by the neutral scorer so only the filtering
//! machinery itself is measured.

use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use docfilter::{ImageFilter, NeutralScorer, PdfAdapter, TextFilter};
use image::{DynamicImage, Rgb, RgbImage};

/// Creates synthetic text segments, some containing blocklisted words.
fn create_segments(count: usize) -> Vec<String> {
    (0..count)
        .map(|i| match i % 4 {
            0 => format!("Paragraph {} discusses the quarterly results in detail.", i),
            1 => "This remark is offensive and explicit.".to_string(),
            2 => String::new(),
            _ => "\u{1}\u{2}binary\u{3}".to_string(),
        })
        .collect()
}

/// Creates a gradient image of the given size.
fn create_image(width: u32, height: u32) -> DynamicImage {
    DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |x, y| {
        Rgb([(x % 256) as u8, (y % 256) as u8, 128])
    }))
}

/// Benchmark text filtering at various sizes.
fn bench_text_filtering(c: &mut Criterion) {
    let mut group = c.benchmark_group("text_filtering");
    let filter = TextFilter::new(Arc::new(NeutralScorer));

    for count in [10, 100, 1000].iter() {
        let segments = create_segments(*count);

        group.bench_function(format!("{}_segments", count), |b| {
            b.iter(|| filter.filter_with_stats(black_box(&segments)).unwrap());
        });
    }

    group.finish();
}

/// Benchmark image review, including downscaling of large images.
fn bench_image_filtering(c: &mut Criterion) {
    let mut group = c.benchmark_group("image_filtering");
    let filter = ImageFilter::new(Arc::new(NeutralScorer), Arc::new(NeutralScorer));

    for size in [256u32, 1600].iter() {
        let image = create_image(*size, *size);

        group.bench_function(format!("{}px", size), |b| {
            b.iter(|| filter.review(black_box(&image)));
        });
    }

    group.finish();
}

/// Benchmark PDF reconstruction followed by extraction.
fn bench_pdf_round_trip(c: &mut Criterion) {
    let adapter = PdfAdapter::new();
    let segments: Vec<String> = (0..50)
        .map(|i| format!("Segment {} of the benchmark document.\n", i))
        .collect();
    let images = vec![create_image(64, 64)];

    c.bench_function("pdf_round_trip", |b| {
        b.iter(|| {
            let data = adapter
                .build_document(black_box(&segments), black_box(&images))
                .unwrap();
            adapter.extract_bytes(&data).unwrap()
        });
    });
}

criterion_group!(
    benches,
    bench_text_filtering,
    bench_image_filtering,
    bench_pdf_round_trip,
);
criterion_main!(benches);
