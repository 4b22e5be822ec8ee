//! Benchmarks for the generation and extraction pipelines.
//!
//! Run with: cargo bench
//!
//! Inputs are synthetic documents built from JSON descriptions.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use serde_json::{json, Value};

/// A document with `sections` headings, each followed by a paragraph and a table.
fn create_test_document(sections: usize) -> Value {
    let mut body = Vec::new();
    for i in 0..sections {
        body.push(json!({"type": "text", "heading": 2, "text": format!("Section {}", i + 1)}));
        body.push(json!({
            "type": "text",
            "text": "Benchmark paragraph text that wraps across several lines of the page \
                     so that line breaking and pagination both get exercised. "
                .repeat(4)
        }));
        body.push(json!({
            "type": "table",
            "header_rows": 1,
            "rows": [["Item", "Qty", "Price"], ["Widget", "4", "2.50"], ["Gadget", "1", "9.99"]]
        }));
    }
    json!({"title": "Benchmark", "body": body})
}

/// Benchmark binding and layout without rendering.
fn bench_layout(c: &mut Criterion) {
    let mut group = c.benchmark_group("layout");

    for sections in [1, 10, 50].iter() {
        let doc = kurbypdf::to_model(&create_test_document(*sections)).unwrap();

        group.bench_function(format!("{}_sections", sections), |b| {
            b.iter(|| kurbypdf::layout_document(black_box(&doc)).unwrap());
        });
    }

    group.finish();
}

/// Benchmark the full JSON to PDF path.
fn bench_generate(c: &mut Criterion) {
    let mut group = c.benchmark_group("generate");

    for sections in [1, 10].iter() {
        let input = create_test_document(*sections);

        group.bench_function(format!("{}_sections", sections), |b| {
            b.iter(|| kurbypdf::generate_value(black_box(&input)).unwrap());
        });
    }

    group.finish();
}

/// Benchmark extraction of rendered documents.
fn bench_extract(c: &mut Criterion) {
    let mut group = c.benchmark_group("extract");

    for sections in [1, 10].iter() {
        let pdf = kurbypdf::generate_value(&create_test_document(*sections)).unwrap();

        group.bench_function(format!("{}_sections", sections), |b| {
            b.iter(|| kurbypdf::extract(black_box(&pdf)).unwrap());
        });
    }

    group.finish();
}

/// Benchmark PDF format detection.
fn bench_format_detection(c: &mut Criterion) {
    let pdf_data = kurbypdf::generate(r#"{"body": "x"}"#).unwrap();
    let non_pdf_data = b"Not a PDF file at all, just random text content";

    c.bench_function("detect_valid_pdf", |b| {
        b.iter(|| kurbypdf::detect_format_from_bytes(black_box(&pdf_data)).unwrap());
    });

    c.bench_function("detect_non_pdf", |b| {
        b.iter(|| kurbypdf::detect_format_from_bytes(black_box(non_pdf_data)).is_err());
    });
}

criterion_group!(
    benches,
    bench_layout,
    bench_generate,
    bench_extract,
    bench_format_detection,
);
criterion_main!(benches);
