//! Criterion benchmarks for bgm_core numerics.
//!
//! Covers lattice probabilities at realistic step counts, Brent root finding
//! and monotone interpolation lookups.

use bgm_core::math::combinatorics::BinomialLattice;
use bgm_core::math::interpolators::{Interpolator, MonotonicInterpolator};
use bgm_core::math::solvers::{BrentSolver, SolverConfig};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

fn bench_probabilities(c: &mut Criterion) {
    let mut group = c.benchmark_group("combinatorics");

    for steps in [50usize, 200, 500] {
        let lattice = BinomialLattice::symmetric(steps);

        group.bench_with_input(BenchmarkId::new("marginal_row", steps), &steps, |b, &n| {
            b.iter(|| (0..=n).map(|k| lattice.probability(black_box(n), k)).sum::<f64>());
        });

        group.bench_with_input(BenchmarkId::new("look_back_row", steps), &steps, |b, &n| {
            let half = n / 2;
            b.iter(|| {
                (0..=half)
                    .map(|k| lattice.conditional_probability(half, k, black_box(n), half))
                    .sum::<f64>()
            });
        });
    }

    group.finish();
}

fn bench_brent(c: &mut Criterion) {
    let solver = BrentSolver::new(SolverConfig::<f64>::high_precision());
    c.bench_function("brent_transcendental", |b| {
        b.iter(|| {
            solver
                .find_root(|x: f64| x.exp() - 3.0 * x - black_box(0.1), 0.0, 1.0)
                .unwrap()
        });
    });
}

fn bench_monotone_lookup(c: &mut Criterion) {
    let mut group = c.benchmark_group("monotone_interpolation");

    for size in [20usize, 200] {
        let xs: Vec<f64> = (0..size).map(|i| i as f64).collect();
        let ys: Vec<f64> = xs.iter().map(|x| x.sqrt()).collect();
        let interp = MonotonicInterpolator::new(&xs, &ys).unwrap();
        let top = (size - 1) as f64;

        group.bench_with_input(BenchmarkId::new("lookup_100", size), &interp, |b, interp| {
            b.iter(|| {
                (0..100)
                    .map(|i| interp.interpolate_flat(black_box(top * i as f64 / 99.0)))
                    .sum::<f64>()
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_probabilities, bench_brent, bench_monotone_lookup);
criterion_main!(benches);
