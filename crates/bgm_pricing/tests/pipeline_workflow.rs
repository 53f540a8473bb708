//! End-to-end pricing of callable schedules.
//!
//! Each test goes from a cashflow schedule and market data to a price:
//! representation, co-terminal calibration on the lattice, evaluation and,
//! for spreads, the outer root search.

use approx::assert_relative_eq;
use bgm_core::market_data::curves::{FlatCurve, PillarCurve, ShiftedCurve};
use bgm_core::market_data::volatility::FlatVolatility;
use bgm_core::types::{Date, DayCountConvention};
use bgm_pricing::cashflow::{CashflowPeriod, CashflowSchedule, ExerciseStyle};
use bgm_pricing::evaluator::EvaluatorConfig;
use bgm_pricing::pipeline::{BermudanPricer, CalibrationMethod, OasSolver, PipelineConfig};
use bgm_pricing::spread::{SpreadSolver, SpreadSolverConfig};

fn semiannual_bond(coupon: f64) -> CashflowSchedule {
    let valuation = Date::from_ymd(2026, 1, 15).unwrap();
    let dates: Vec<Date> = (0..=8)
        .map(|i| {
            let months = 6 * i;
            let year = 2026 + (months / 12) as i32;
            let month = 1 + (months % 12) as u32;
            Date::from_ymd(year, month, 15).unwrap()
        })
        .collect();
    CashflowSchedule::from_dates(valuation, &dates, DayCountConvention::Thirty360, 100.0, coupon)
        .unwrap()
        .callable_from(2)
}

// ============================================================================
// Lattice-calibrated pricing
// ============================================================================

#[test]
fn test_lattice_calibration_reprices_coterminals() {
    let curve = PillarCurve::from_zero_rates(&[0.5, 2.0, 5.0], &[0.025, 0.03, 0.035]).unwrap();
    let pricer = BermudanPricer::new(PipelineConfig {
        evaluator: EvaluatorConfig::default().with_call_probabilities(true),
        ..PipelineConfig::fast()
    });
    let report = pricer
        .price(&semiannual_bond(0.04), &curve, &FlatVolatility::lognormal(0.25), None)
        .unwrap();

    assert_eq!(report.exercise_times.len(), 6);
    assert!(report.calibration_rmse.unwrap() < 1e-5);
    assert!(report.option_value > 0.0);
    let best = report.european_values.iter().cloned().fold(0.0, f64::max);
    assert!(report.option_value >= best - 1e-10);

    let calls = report.call_probabilities.unwrap();
    let total: f64 = calls.iter().map(|c| c.probability).sum();
    assert!(total > 0.0 && total <= 1.0 + 1e-9);
}

#[test]
fn test_calibration_methods_agree() {
    let curve = FlatCurve::new(0.03);
    let bond = semiannual_bond(0.035);
    let vols = FlatVolatility::lognormal(0.2);
    let lattice = BermudanPricer::new(PipelineConfig::default())
        .price(&bond, &curve, &vols, None)
        .unwrap();
    let rebonato = BermudanPricer::new(PipelineConfig {
        calibration: CalibrationMethod::Rebonato,
        ..PipelineConfig::default()
    })
    .price(&bond, &curve, &vols, None)
    .unwrap();
    assert_relative_eq!(lattice.option_value, rebonato.option_value, max_relative = 0.05);
}

#[test]
fn test_normal_volatility_quotes() {
    let curve = FlatCurve::new(0.03);
    let pricer = BermudanPricer::new(PipelineConfig {
        calibration: CalibrationMethod::Rebonato,
        ..PipelineConfig::fast()
    });
    let report = pricer
        .price(&semiannual_bond(0.03), &curve, &FlatVolatility::normal(0.006), None)
        .unwrap();
    assert!(report.option_value > 0.0);
    assert!(report.total < report.cashflow_pv);
}

// ============================================================================
// Exercise styles
// ============================================================================

#[test]
fn test_european_below_bermudan_below_american() {
    let curve = FlatCurve::new(0.03);
    let vols = FlatVolatility::lognormal(0.2);
    let pricer = BermudanPricer::new(PipelineConfig {
        calibration: CalibrationMethod::Rebonato,
        ..PipelineConfig::fast()
    });
    let value = |style| {
        pricer
            .price(&semiannual_bond(0.03).with_style(style), &curve, &vols, None)
            .unwrap()
            .option_value
    };
    let european = value(ExerciseStyle::European);
    let bermudan = value(ExerciseStyle::Bermudan);
    let american = value(ExerciseStyle::American);
    assert!(european <= bermudan + 1e-5);
    assert!(bermudan <= american + 1e-6);
}

#[test]
fn test_amortising_schedule_prices() {
    let periods = vec![
        CashflowPeriod::new(0.0, 1.0, 100.0, 0.04),
        CashflowPeriod::new(1.0, 2.0, 100.0, 0.04).exercisable(),
        CashflowPeriod::new(2.0, 3.0, 75.0, 0.04).exercisable(),
        CashflowPeriod::new(3.0, 4.0, 50.0, 0.04).exercisable(),
    ];
    let schedule = CashflowSchedule::new(periods).unwrap();
    let curve = FlatCurve::new(0.03);
    let pricer = BermudanPricer::new(PipelineConfig {
        calibration: CalibrationMethod::Rebonato,
        ..PipelineConfig::fast()
    });
    let report = pricer
        .price(&schedule, &curve, &FlatVolatility::lognormal(0.2), None)
        .unwrap();
    assert_eq!(report.exercise_times, vec![1.0, 2.0, 3.0]);
    assert!(report.option_value > 0.0);
    assert!(report.option_value < report.cashflow_pv);
}

// ============================================================================
// Spreads
// ============================================================================

#[test]
fn test_oas_recovers_applied_spread() {
    let curve = PillarCurve::from_zero_rates(&[1.0, 4.0], &[0.02, 0.03]).unwrap();
    let vols = FlatVolatility::lognormal(0.2);
    let bond = semiannual_bond(0.04);
    let pricer = BermudanPricer::new(PipelineConfig {
        calibration: CalibrationMethod::Rebonato,
        ..PipelineConfig::fast()
    });
    let target = pricer
        .price(&bond, &ShiftedCurve::new(&curve, 0.0075), &vols, None)
        .unwrap()
        .total;

    let search = SpreadSolverConfig {
        grid_start: 0.04,
        grid_step: 0.005,
        grid_floor: -0.01,
        ..Default::default()
    };
    let solver = OasSolver::with_solver(pricer, SpreadSolver::new(search));
    let solution = solver
        .solve_discount(&bond, &curve, &vols, None, target)
        .unwrap();
    assert_relative_eq!(solution.spread, 0.0075, epsilon = 1e-7);
    assert!(solution.residual.abs() < 1e-6);
}
