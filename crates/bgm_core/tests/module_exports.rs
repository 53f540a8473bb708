//! Integration tests for module exports.
//!
//! Every public module and type must be reachable through its absolute path.

use approx::assert_relative_eq;

#[test]
fn test_combinatorics_exports() {
    use bgm_core::math::combinatorics::{ln_binomial, ln_gamma, BinomialLattice};

    assert_relative_eq!(ln_gamma(5.0), 24.0_f64.ln(), epsilon = 1e-12);
    assert_relative_eq!(ln_binomial(6, 3), 20.0_f64.ln(), epsilon = 1e-12);

    let lattice = BinomialLattice::new(10, 0.4).unwrap();
    assert_relative_eq!(lattice.up_probability(), 0.4);
    assert_relative_eq!(lattice.conditional_probability(3, 1, 3, 1), 1.0);
}

#[test]
fn test_solver_exports() {
    use bgm_core::math::solvers::{
        BrentSolver, LMConfig, LeastSquaresSolver, LevenbergMarquardtSolver, ParameterBound,
        RootFinder, SolverConfig,
    };
    use bgm_core::types::PricingError;

    let brent = BrentSolver::new(SolverConfig::<f64>::default());
    let finder: &dyn RootFinder = &brent;
    let root = finder
        .find_root(&mut |x| Ok::<f64, PricingError>(x - 0.125), -1.0, 1.0)
        .unwrap();
    assert_relative_eq!(root, 0.125, epsilon = 1e-10);

    let lm = LevenbergMarquardtSolver::new(LMConfig::default());
    let oracle: &dyn LeastSquaresSolver = &lm;
    let fit = oracle
        .minimise(
            &|p: &[f64]| vec![p[0] - 1.0, p[1] + 2.0],
            vec![0.0, 0.0],
            &[ParameterBound::unbounded(), ParameterBound::unbounded()],
        )
        .unwrap();
    assert!(fit.converged);
    assert_relative_eq!(fit.params[1], -2.0, epsilon = 1e-6);
}

#[test]
fn test_interpolator_exports() {
    use bgm_core::math::interpolators::{
        BilinearInterpolator, Interpolator, LinearInterpolator, MonotonicInterpolator,
    };

    let xs = [0.0, 1.0, 2.0];
    let ys = [0.0, 1.0, 4.0];
    let linear = LinearInterpolator::new(&xs, &ys).unwrap();
    assert_relative_eq!(linear.interpolate(1.5).unwrap(), 2.5);

    let mono = MonotonicInterpolator::new(&xs, &ys).unwrap();
    let mid = mono.interpolate(1.5).unwrap();
    assert!(mid > 1.0 && mid < 4.0);

    let grid = BilinearInterpolator::new(&xs, &[0.0, 1.0], &[vec![0.0, 1.0], vec![1.0, 2.0], vec![2.0, 3.0]]).unwrap();
    assert_relative_eq!(grid.interpolate(0.5, 0.5).unwrap(), 1.0);
}

#[test]
fn test_view_exports() {
    use bgm_core::math::view::{Access, IndexedView, View, ViewMut};
    use std::cell::RefCell;

    let view = View::new(3, |i| i as f64 * 0.5);
    assert_eq!(view.to_vec(), vec![0.0, 0.5, 1.0]);

    let data = RefCell::new(vec![1.0, 2.0]);
    let mut view = ViewMut::new(2, |i| data.borrow()[i], |i, v: f64| data.borrow_mut()[i] = v);
    assert_eq!(view.access(), Access::ReadWrite);
    assert!(view.set(1, 5.0));
    assert_eq!(view.get(1), Some(5.0));
}

#[test]
fn test_curve_exports() {
    use bgm_core::market_data::curves::{
        loss_leg_pv, FlatCurve, FlatHazardCurve, PiecewiseHazardCurve, PillarCurve, ShiftedCurve,
        SurvivalCurve, YieldCurve,
    };

    let base = PillarCurve::from_zero_rates(&[1.0, 2.0], &[0.03, 0.03]).unwrap();
    let flat = FlatCurve::new(0.03_f64);
    assert_relative_eq!(
        base.discount_factor(1.5).unwrap(),
        flat.discount_factor(1.5).unwrap(),
        epsilon = 1e-14
    );
    let shifted = ShiftedCurve::new(&base, 0.01);
    assert_relative_eq!(shifted.zero_rate(1.0).unwrap(), 0.04, epsilon = 1e-14);

    let survival = PiecewiseHazardCurve::new(vec![5.0], vec![0.01], 0.4).unwrap();
    assert!(survival.bumped(-0.02).is_err());
    let flat_survival = FlatHazardCurve::new(0.01, 0.4).unwrap();
    let a = loss_leg_pv(&survival, &flat, &[1.0, 2.0], &[1.0], 1.0).unwrap();
    let b = loss_leg_pv(&flat_survival, &flat, &[1.0, 2.0], &[1.0], 1.0).unwrap();
    assert_relative_eq!(a, b, epsilon = 1e-14);
}

#[test]
fn test_volatility_exports() {
    use bgm_core::market_data::volatility::{
        FlatVolatility, TermStructureVolatility, VolatilityCube, VolatilityKind, VolatilityQuery,
        VolatilitySource,
    };

    let sources: Vec<Box<dyn VolatilitySource>> = vec![
        Box::new(FlatVolatility::lognormal(0.2)),
        Box::new(TermStructureVolatility::new(vec![1.0], vec![0.2], VolatilityKind::Lognormal).unwrap()),
        Box::new(
            VolatilityCube::new(vec![1.0], vec![1.0], vec![vec![0.2]], VolatilityKind::Lognormal).unwrap(),
        ),
    ];
    let query = VolatilityQuery::atm(1.0, 1.0, 0.03);
    for source in &sources {
        assert_relative_eq!(source.volatility(&query).unwrap(), 0.2);
    }
}

#[test]
fn test_type_exports() {
    use bgm_core::types::{Date, DayCountConvention, PricingError};

    let start = Date::from_ymd(2024, 1, 15).unwrap();
    let end = start.add_months(12).unwrap();
    assert_relative_eq!(DayCountConvention::Thirty360.year_fraction(start, end), 1.0);
    let err = PricingError::InvalidInput("x".to_string());
    assert!(!err.is_infeasible());
}
