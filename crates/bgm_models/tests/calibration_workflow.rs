//! End-to-end calibration from a swaption matrix.

use approx::assert_relative_eq;
use bgm_core::market_data::curves::FlatCurve;
use bgm_core::market_data::volatility::VolatilityKind;
use bgm_models::calibration::{
    CascadeCalibrator, CascadeConfig, CascadeLayout, PiecewiseCalibrator, PiecewiseConfig,
    RebonatoSwaptionPricer, SwaptionModelPricer, SwaptionVolatilityMatrix,
};
use bgm_models::schedules::TenorSchedule;

fn schedule() -> TenorSchedule {
    TenorSchedule::from_curve(&FlatCurve::new(0.03), vec![1.0, 2.0, 3.0, 4.0]).unwrap()
}

fn flat_market(sigma: f64) -> SwaptionVolatilityMatrix {
    SwaptionVolatilityMatrix::new(
        vec![1.0, 2.0],
        vec![1.0, 2.0],
        vec![vec![sigma; 2]; 2],
        VolatilityKind::Lognormal,
    )
    .unwrap()
}

// ============================================================================
// Cascade
// ============================================================================

#[test]
fn test_cascade_recovers_flat_market() {
    let calibrator = CascadeCalibrator::new(RebonatoSwaptionPricer::perfect(), CascadeConfig::default());
    let result = calibrator.calibrate_matrix(&schedule(), &flat_market(0.2)).unwrap();

    assert!(result.converged);
    assert!(result.diagnostics().skipped_quotes.is_empty());
    for sigma in result.params().black_volatilities() {
        assert_relative_eq!(sigma, 0.2, epsilon = 1e-6);
    }
}

#[test]
fn test_calibrated_matrix_reprices_quotes() {
    let s = schedule();
    let market = SwaptionVolatilityMatrix::new(
        vec![1.0, 2.0],
        vec![1.0, 2.0],
        vec![vec![0.24, 0.22], vec![0.21, 0.19]],
        VolatilityKind::Lognormal,
    )
    .unwrap();
    let pricer = RebonatoSwaptionPricer::perfect();
    let calibrator = CascadeCalibrator::new(pricer.clone(), CascadeConfig::high_precision());
    let result = calibrator.calibrate_matrix(&s, &market).unwrap();

    for quote in market.quotes_for(&s).unwrap() {
        let model = pricer.price(&s, result.params().matrix(), &quote).unwrap();
        let target = quote.market_price(&s).unwrap();
        assert_relative_eq!(model, target, max_relative = 1e-6);
    }
}

#[test]
fn test_co_terminal_layout_uses_last_column() {
    let s = schedule();
    let config = CascadeConfig::default().with_layout(CascadeLayout::CoTerminal);
    let calibrator = CascadeCalibrator::new(RebonatoSwaptionPricer::perfect(), config);
    let quotes: Vec<_> = flat_market(0.2)
        .quotes_for(&s)
        .unwrap()
        .into_iter()
        .filter(|q| q.end == s.rate_count())
        .collect();

    let result = calibrator.calibrate(&s, &quotes).unwrap();
    assert!(result.converged);
    assert_eq!(result.params().curves().len(), 3);
}

// ============================================================================
// Piecewise constant
// ============================================================================

#[test]
fn test_piecewise_fits_flat_market() {
    let calibrator =
        PiecewiseCalibrator::new(RebonatoSwaptionPricer::perfect(), PiecewiseConfig::default());
    let result = calibrator.calibrate_matrix(&schedule(), &flat_market(0.2)).unwrap();

    assert!(result.converged);
    assert!(result.rmse() < 1e-4);
    let volatilities = result.params().to_volatilities().unwrap();
    for sigma in volatilities.black_volatilities() {
        assert_relative_eq!(sigma, 0.2, max_relative = 1e-3);
    }
}
