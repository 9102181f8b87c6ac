//! Query parsing, compilation and matching benchmarks
//!
//! Run with: cargo bench

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use trq::query::{compile, parse, parse_and_compile, CompileOptions};

const QUERIES: &[(&str, &str)] = &[
    ("literal", "kernel"),
    ("wildcard", "ker*el"),
    ("phrase", "\"memory safety\""),
    ("boolean", "kernel AND panic AND driver -firmware"),
    ("or_chain", "alpha OR beta OR gamma OR delta"),
    ("near", "kernel NEAR/6 panic"),
    ("onear", "kernel ONEAR/6 panic"),
    ("sentence", "kernel /s panic"),
    ("regex", r"pan(ic|icked)\s+\w+"),
];

fn bench_parse(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse");
    for (name, query) in QUERIES {
        group.bench_with_input(BenchmarkId::from_parameter(name), query, |b, q| {
            b.iter(|| parse(black_box(q)))
        });
    }
    group.finish();
}

fn bench_compile(c: &mut Criterion) {
    let mut group = c.benchmark_group("compile");
    for (name, query) in QUERIES {
        let node = parse(query);
        group.bench_with_input(BenchmarkId::from_parameter(name), &node, |b, n| {
            b.iter(|| compile(black_box(n), true).unwrap())
        });
    }
    group.finish();
}

fn bench_evaluate(c: &mut Criterion) {
    // A transcript-sized record with scattered hits
    let mut text = String::new();
    for i in 0..400 {
        if i % 37 == 0 {
            text.push_str("the kernel logged a panic before recovering. ");
        } else {
            text.push_str("ordinary conversation filler with no hits at all. ");
        }
    }

    let mut group = c.benchmark_group("evaluate");
    for (name, query) in QUERIES {
        let matcher = parse_and_compile(query, CompileOptions { whole_words: true }).unwrap();
        group.bench_with_input(BenchmarkId::from_parameter(name), &matcher, |b, m| {
            b.iter(|| m.evaluate(black_box(&text), None))
        });
    }
    group.finish();
}

criterion_group!(benches, bench_parse, bench_compile, bench_evaluate);
criterion_main!(benches);
