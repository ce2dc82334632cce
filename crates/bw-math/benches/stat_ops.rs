//! Criterion benchmarks for `bw-math`.
//!
//! Focus on the kernels that run once per analysis over the full delta series.

use bw_math::{ks, percentiles};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

fn synthetic_deltas(n: usize) -> Vec<f64> {
    // Deterministic spread of values; shape does not matter for timing.
    (0..n)
        .map(|i| 300.0 + ((i * 7919) % 3600) as f64)
        .collect()
}

fn bench_stat_kernels(c: &mut Criterion) {
    let mut group = c.benchmark_group("stats");

    for n in [100usize, 1_000, 10_000] {
        let deltas = synthetic_deltas(n);
        let (historical, recent) = deltas.split_at(n * 3 / 4);

        group.bench_with_input(BenchmarkId::new("percentiles", n), &deltas, |b, d| {
            b.iter(|| black_box(percentiles(black_box(d), &[25.0, 50.0, 75.0, 95.0])));
        });

        group.bench_with_input(
            BenchmarkId::new("ks_two_sample", n),
            &(historical, recent),
            |b, (h, r)| {
                b.iter(|| black_box(ks::two_sample(black_box(h), black_box(r))));
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_stat_kernels);
criterion_main!(benches);
