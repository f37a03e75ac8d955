//! Criterion benchmarks for command resolution.
//!
//! Resolution runs on every remote button press, so it is measured for each
//! of the three lookup paths (token, enumerated name, display name) plus the
//! not-found fall-through that scans all of them.
//!
//! Run with:
//! ```bash
//! cargo bench --package lumagen-core --bench resolve_bench
//! ```

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use lumagen_core::CommandRegistry;

fn bench_resolve(c: &mut Criterion) {
    let registry = CommandRegistry::standard();
    let mut group = c.benchmark_group("resolve");

    for id in ["menu", "ASPECT_2_40", "1.85", "zone", "not_a_command"] {
        group.bench_with_input(BenchmarkId::from_parameter(id), id, |b, id| {
            b.iter(|| {
                let _ = black_box(registry.resolve(black_box(id)));
            })
        });
    }

    group.finish();
}

fn bench_build_registry(c: &mut Criterion) {
    c.bench_function("registry_standard", |b| {
        b.iter(|| black_box(CommandRegistry::standard()))
    });
}

fn bench_missing_from(c: &mut Criterion) {
    let registry = CommandRegistry::standard();
    let caps: Vec<String> = registry
        .operation_names()
        .filter(|n| !n.starts_with("source_aspect"))
        .map(str::to_string)
        .collect();
    c.bench_function("missing_from", |b| {
        b.iter(|| black_box(registry.missing_from(black_box(&caps))))
    });
}

criterion_group!(benches, bench_resolve, bench_build_registry, bench_missing_from);
criterion_main!(benches);
