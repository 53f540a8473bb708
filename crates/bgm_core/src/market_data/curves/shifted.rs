//! Parallel spread overlay on a discount curve.

use super::YieldCurve;
use crate::market_data::error::MarketDataError;

/// A discount curve shifted by a constant continuously compounded spread.
///
/// `D_s(t) = D(t) · exp(−s·t)`. The base curve is borrowed or owned and never
/// mutated, so a spread search can evaluate many shifts from the same base.
///
/// # Example
///
/// ```
/// use bgm_core::market_data::curves::{FlatCurve, ShiftedCurve, YieldCurve};
///
/// let base = FlatCurve::new(0.03_f64);
/// let shifted = ShiftedCurve::new(&base, 0.01);
/// assert!((shifted.zero_rate(4.0).unwrap() - 0.04).abs() < 1e-14);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShiftedCurve<C> {
    base: C,
    shift: f64,
}

impl<C> ShiftedCurve<C> {
    /// Overlays `shift` on `base`.
    pub fn new(base: C, shift: f64) -> Self {
        Self { base, shift }
    }

    /// The applied spread.
    pub fn shift(&self) -> f64 {
        self.shift
    }

    /// The underlying curve.
    pub fn base(&self) -> &C {
        &self.base
    }
}

impl<C: YieldCurve<f64>> YieldCurve<f64> for ShiftedCurve<C> {
    fn discount_factor(&self, t: f64) -> Result<f64, MarketDataError> {
        Ok(self.base.discount_factor(t)? * (-self.shift * t).exp())
    }
}
