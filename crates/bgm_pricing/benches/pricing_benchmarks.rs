//! Criterion benchmarks for lattice evaluation and the pricing pipeline.
//!
//! The evaluator is measured on a prebuilt lattice across step counts, with
//! and without the forward call-probability pass. The pipeline benchmark
//! covers calibration, lattice construction and evaluation together.

use bgm_core::market_data::curves::FlatCurve;
use bgm_core::market_data::volatility::FlatVolatility;
use bgm_models::analytical::OptionType;
use bgm_models::lattice::{LatticeBuilder, LatticeConfig};
use bgm_models::schedules::TenorSchedule;
use bgm_models::volatility::VolatilityCurve;
use bgm_pricing::cashflow::{CashflowSchedule, ExerciseStyle};
use bgm_pricing::evaluator::{BermudanEvaluator, EvaluatorConfig};
use bgm_pricing::pipeline::{BermudanPricer, CalibrationMethod, PipelineConfig};
use bgm_pricing::swaption::{build_representations, SolverControls, UnderlyingSwap};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

/// Semi-annual 10-rate schedule on a flat 3% curve.
fn schedule() -> (FlatCurve<f64>, TenorSchedule) {
    let curve = FlatCurve::new(0.03);
    let times = (1..=11).map(|i| 0.5 * i as f64).collect();
    let schedule = TenorSchedule::from_curve(&curve, times).unwrap();
    (curve, schedule)
}

/// Benchmark backward induction against the step count.
fn bench_evaluator(c: &mut Criterion) {
    let mut group = c.benchmark_group("bermudan_evaluation");
    let (curve, s) = schedule();
    let n = s.rate_count();
    let vols: Vec<_> = (0..n)
        .map(|k| VolatilityCurve::flat(0.2, s.reset_time(k)).unwrap())
        .collect();
    let underlying = UnderlyingSwap::bullet(n, 1.0, 0.03);
    let rates: Vec<usize> = (0..n).collect();
    let records = build_representations(
        &s,
        &underlying,
        &rates,
        OptionType::Put,
        &curve,
        &FlatVolatility::lognormal(0.2),
        None,
        SolverControls::default(),
    )
    .unwrap();

    for steps in [50, 100, 200] {
        let lattice = LatticeBuilder::new(LatticeConfig::default().with_steps(steps))
            .build(&s, &vols, &[])
            .unwrap();
        let plain = BermudanEvaluator::default();
        group.bench_with_input(BenchmarkId::new("steps", steps), &lattice, |b, lattice| {
            b.iter(|| {
                plain
                    .evaluate(black_box(lattice), &underlying, &records, ExerciseStyle::Bermudan)
                    .unwrap()
            });
        });

        let tracked = BermudanEvaluator::new(EvaluatorConfig::default().with_call_probabilities(true));
        group.bench_with_input(
            BenchmarkId::new("steps_with_call_probabilities", steps),
            &lattice,
            |b, lattice| {
                b.iter(|| {
                    tracked
                        .evaluate(black_box(lattice), &underlying, &records, ExerciseStyle::Bermudan)
                        .unwrap()
                });
            },
        );
    }

    group.finish();
}

/// Benchmark the full pipeline on a five-year callable bond.
fn bench_pipeline(c: &mut Criterion) {
    let mut group = c.benchmark_group("pricing_pipeline");
    group.sample_size(10);
    let curve = FlatCurve::new(0.03);
    let vols = FlatVolatility::lognormal(0.2);
    let times: Vec<f64> = (0..=10).map(|i| 0.5 * i as f64).collect();
    let bond = CashflowSchedule::fixed_rate(&times, 100.0, 0.035)
        .unwrap()
        .callable_from(2);

    for (name, method) in [
        ("rebonato", CalibrationMethod::Rebonato),
        ("lattice", CalibrationMethod::Lattice),
    ] {
        let pricer = BermudanPricer::new(PipelineConfig {
            calibration: method,
            ..PipelineConfig::fast()
        });
        group.bench_function(name, |b| {
            b.iter(|| pricer.price(black_box(&bond), &curve, &vols, None).unwrap());
        });
    }

    group.finish();
}

criterion_group!(benches, bench_evaluator, bench_pipeline);
criterion_main!(benches);
