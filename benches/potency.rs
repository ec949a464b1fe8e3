use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use screensol::potency::{ll4, Ll4Params};
use screensol::prelude::*;
use std::hint::black_box;

/// Eight half-log doses in triplicate, with slight variation per compound
fn build_library(n: usize) -> Vec<DoseResponseObservation> {
    let mut rows = Vec::with_capacity(n * 24);
    for i in 0..n {
        let truth = Ll4Params::new(1.0 + (i % 5) as f64 * 0.2, 5.0, 95.0, 0.5 + (i % 7) as f64);
        for step in 0..8 {
            let dose = 10f64.powf(-1.0 + 0.5 * step as f64);
            for rep in 0..3 {
                let wobble = 1.0 + (rep as f64 - 1.0) * 0.01;
                rows.push(DoseResponseObservation::new(
                    format!("cmpd_{}", i),
                    dose,
                    ll4(dose, &truth) * wobble,
                ));
            }
        }
    }
    rows
}

fn bench_single_fit(c: &mut Criterion) {
    let obs = build_library(1);
    let opts = FitOptions::default();

    c.bench_function("ll4_single_compound", |b| {
        b.iter(|| {
            let result = fit_dose_response(black_box(&obs), black_box(&opts));
            black_box(result);
        });
    });
}

fn bench_library_fit(c: &mut Criterion) {
    let mut group = c.benchmark_group("ll4_library");
    group.sample_size(10);

    for size in [10, 50, 200] {
        let obs = build_library(size);
        let opts = FitOptions::default();

        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| {
                let results = fit_dose_response(black_box(&obs), black_box(&opts));
                black_box(results);
            });
        });
    }

    group.finish();
}

fn bench_pruning(c: &mut Criterion) {
    let obs = build_library(200);
    let opts = PruneOptions::default();

    c.bench_function("prune_library", |b| {
        b.iter(|| black_box(prune_all(black_box(&obs), black_box(&opts))));
    });
}

criterion_group!(benches, bench_single_fit, bench_library_fit, bench_pruning);
criterion_main!(benches);
