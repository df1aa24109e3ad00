//! Benchmarks for rustplate components.

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use rustplate::config::{ConfigLoader, keys};
use rustplate::metrics::MetricsCollector;
use std::path::PathBuf;

fn benchmark_resolve(c: &mut Criterion) {
    let resolver = ConfigLoader::new()
        .search_paths(Vec::<PathBuf>::new())
        .env_vars([("CONFIGS_OUTPUTDIR", "/env/out")])
        .default_value(keys::METRICS_PATH, "/metrics")
        .flag(keys::INPUT_DIR, Some("/tmp/in".to_string()))
        .load();

    let mut group = c.benchmark_group("resolve");
    for key in [keys::INPUT_DIR, keys::OUTPUT_DIR, keys::METRICS_PATH] {
        group.bench_function(key, |b| b.iter(|| black_box(resolver.resolve(black_box(key)))));
    }
    group.finish();
}

fn benchmark_begin_request(c: &mut Criterion) {
    let collector = MetricsCollector::new();

    c.bench_function("begin_request_finish", |b| {
        b.iter(|| {
            collector
                .begin_request(black_box("GET"), black_box("/health"), "bench")
                .finish()
        })
    });
}

fn benchmark_encode(c: &mut Criterion) {
    let collector = MetricsCollector::new();
    for i in 0..100 {
        collector
            .begin_request("GET", &format!("/items/{i}"), "bench")
            .finish();
    }

    c.bench_function("encode_100_series", |b| {
        b.iter(|| black_box(collector.encode()))
    });
}

criterion_group!(
    benches,
    benchmark_resolve,
    benchmark_begin_request,
    benchmark_encode
);
criterion_main!(benches);
