//! Properties of lattice evaluation that must hold for any market.
//!
//! - European values agree with Black prices and satisfy put-call parity
//! - Bermudan values sit between the best and the sum of the Europeans
//! - Zero volatility collapses to the best deterministic exercise

use approx::assert_relative_eq;
use bgm_core::market_data::curves::{FlatCurve, PillarCurve, YieldCurve};
use bgm_core::market_data::volatility::FlatVolatility;
use bgm_models::analytical::{Black76, OptionType};
use bgm_models::lattice::{LatticeBuilder, LatticeConfig, RateLattice};
use bgm_models::schedules::TenorSchedule;
use bgm_models::volatility::VolatilityCurve;
use bgm_pricing::cashflow::ExerciseStyle;
use bgm_pricing::evaluator::{caplet_values, BermudanEvaluator, EvaluatorConfig};
use bgm_pricing::swaption::{
    build_representations, SolverControls, SwaptionRepresentation, UnderlyingSwap,
};
use proptest::prelude::*;

fn lattice_on<C: YieldCurve<f64>>(
    curve: &C,
    times: Vec<f64>,
    sigma: f64,
    steps: usize,
) -> RateLattice {
    let schedule = TenorSchedule::from_curve(curve, times).unwrap();
    let vols: Vec<_> = (0..schedule.rate_count())
        .map(|k| VolatilityCurve::flat(sigma, schedule.reset_time(k)).unwrap())
        .collect();
    LatticeBuilder::new(LatticeConfig::default().with_steps(steps))
        .build(&schedule, &vols, &[])
        .unwrap()
}

fn records<C: YieldCurve<f64>>(
    lattice: &RateLattice,
    curve: &C,
    underlying: &UnderlyingSwap,
    option_type: OptionType,
    sigma: f64,
) -> Vec<SwaptionRepresentation> {
    let n = lattice.schedule().rate_count();
    let rates: Vec<usize> = (0..n).collect();
    build_representations(
        lattice.schedule(),
        underlying,
        &rates,
        option_type,
        curve,
        &FlatVolatility::lognormal(sigma),
        None,
        SolverControls::default(),
    )
    .unwrap()
}

// ============================================================================
// European values
// ============================================================================

#[test]
fn test_caplets_match_black() {
    let curve = PillarCurve::from_zero_rates(&[1.0, 5.0], &[0.02, 0.035]).unwrap();
    let lattice = lattice_on(&curve, vec![1.0, 2.0, 3.0, 4.0], 0.25, 300);
    let schedule = lattice.schedule();
    let strike = 0.03;
    let caps = caplet_values(&lattice, strike, OptionType::Call).unwrap();

    for (k, cap) in caps.iter().enumerate() {
        let black = schedule.accrual(k)
            * schedule.zero_bond(k + 1)
            * Black76::new(schedule.forward(k), 0.25)
                .unwrap()
                .price_call(strike, schedule.reset_time(k));
        assert_relative_eq!(*cap, black, max_relative = 1e-2);
    }
}

#[test]
fn test_european_put_call_parity() {
    let curve = FlatCurve::new(0.035);
    let lattice = lattice_on(&curve, vec![1.0, 2.0, 3.0, 4.0, 5.0], 0.2, 100);
    let schedule = lattice.schedule();
    let underlying = UnderlyingSwap::bullet(4, 1.0, 0.03);
    let evaluator = BermudanEvaluator::default();

    let payer = records(&lattice, &curve, &underlying, OptionType::Call, 0.2);
    let receiver = records(&lattice, &curve, &underlying, OptionType::Put, 0.2);
    let payer = evaluator
        .evaluate(&lattice, &underlying, &payer, ExerciseStyle::European)
        .unwrap();
    let receiver = evaluator
        .evaluate(&lattice, &underlying, &receiver, ExerciseStyle::European)
        .unwrap();

    let forward_swap = (schedule.swap_rate(0, 4) - 0.03) * schedule.level(0, 4);
    assert_relative_eq!(payer.value - receiver.value, forward_swap, epsilon = 1e-10);
}

#[test]
fn test_value_scales_with_notional() {
    let curve = FlatCurve::new(0.03);
    let lattice = lattice_on(&curve, vec![1.0, 2.0, 3.0, 4.0], 0.2, 80);
    let unit = UnderlyingSwap::bullet(3, 1.0, 0.03);
    let scaled = UnderlyingSwap::bullet(3, 250.0, 0.03);
    let evaluator = BermudanEvaluator::default();

    let unit_value = evaluator
        .evaluate(
            &lattice,
            &unit,
            &records(&lattice, &curve, &unit, OptionType::Put, 0.2),
            ExerciseStyle::Bermudan,
        )
        .unwrap()
        .value;
    let scaled_value = evaluator
        .evaluate(
            &lattice,
            &scaled,
            &records(&lattice, &curve, &scaled, OptionType::Put, 0.2),
            ExerciseStyle::Bermudan,
        )
        .unwrap()
        .value;
    assert_relative_eq!(scaled_value, 250.0 * unit_value, max_relative = 1e-12);
}

// ============================================================================
// Bermudan bounds
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn prop_bermudan_between_best_and_sum_of_europeans(
        rate in 0.01f64..0.06,
        coupon in 0.01f64..0.06,
        sigma in 0.05f64..0.4,
        payer in any::<bool>(),
    ) {
        let curve = FlatCurve::new(rate);
        let lattice = lattice_on(&curve, vec![0.5, 1.0, 1.5, 2.0, 2.5], sigma, 40);
        let underlying = UnderlyingSwap::bullet(4, 1.0, coupon);
        let option_type = if payer { OptionType::Call } else { OptionType::Put };
        let recs = records(&lattice, &curve, &underlying, option_type, sigma);

        let result = BermudanEvaluator::new(EvaluatorConfig::default().with_call_probabilities(true))
            .evaluate(&lattice, &underlying, &recs, ExerciseStyle::Bermudan)
            .unwrap();
        let best = result.european_values.iter().cloned().fold(0.0, f64::max);
        let sum: f64 = result.european_values.iter().sum();

        prop_assert!(result.value >= best - 1e-10);
        prop_assert!(result.value <= sum + 1e-10);
        let exercised = result.exercise_probability().unwrap();
        prop_assert!((0.0..=1.0 + 1e-9).contains(&exercised));
    }
}

// ============================================================================
// Degenerate markets
// ============================================================================

#[test]
fn test_zero_volatility_takes_best_deterministic_date() {
    // Rising curve: later swaps carry higher rates.
    let curve = PillarCurve::from_zero_rates(&[0.5, 5.0], &[0.01, 0.06]).unwrap();
    let lattice = lattice_on(&curve, vec![1.0, 2.0, 3.0, 4.0, 5.0], 0.0, 100);
    let schedule = lattice.schedule();
    let underlying = UnderlyingSwap::bullet(4, 1.0, 0.035);
    let recs = records(&lattice, &curve, &underlying, OptionType::Call, 0.0);

    let result = BermudanEvaluator::default()
        .evaluate(&lattice, &underlying, &recs, ExerciseStyle::Bermudan)
        .unwrap();
    let best = (0..4)
        .map(|a| ((schedule.swap_rate(a, 4) - 0.035) * schedule.level(a, 4)).max(0.0))
        .fold(0.0, f64::max);
    assert_relative_eq!(result.value, best, max_relative = 1e-9);
}
