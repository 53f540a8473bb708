//! Pillar-based discount curve with log-linear interpolation.

use super::YieldCurve;
use crate::market_data::error::MarketDataError;
use crate::math::interpolators::{Interpolator, LinearInterpolator};

/// Discount curve defined by discount factors on pillar times.
///
/// `ln D(t)` is interpolated linearly between pillars (piecewise-flat
/// instantaneous forwards), anchored at `D(0) = 1`. Beyond the last pillar
/// the last forward rate is extended.
///
/// # Example
///
/// ```
/// use bgm_core::market_data::curves::{PillarCurve, YieldCurve};
///
/// let curve = PillarCurve::from_zero_rates(&[1.0, 2.0, 5.0], &[0.02, 0.025, 0.03]).unwrap();
/// assert!((curve.zero_rate(2.0).unwrap() - 0.025).abs() < 1e-14);
/// assert!(curve.discount_factor(10.0).unwrap() < curve.discount_factor(5.0).unwrap());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct PillarCurve {
    log_discounts: LinearInterpolator<f64>,
    tail_forward: f64,
}

impl PillarCurve {
    /// Builds the curve from positive pillar times and discount factors.
    ///
    /// # Errors
    ///
    /// Empty or mismatched inputs, non-increasing or non-positive times,
    /// non-positive discount factors.
    pub fn from_discount_factors(times: &[f64], discount_factors: &[f64]) -> Result<Self, MarketDataError> {
        if times.is_empty() {
            return Err(MarketDataError::InsufficientData { got: 0, need: 1 });
        }
        if times.len() != discount_factors.len() {
            return Err(MarketDataError::InsufficientData {
                got: discount_factors.len(),
                need: times.len(),
            });
        }
        if let Some(&t) = times.iter().find(|&&t| !(t > 0.0)) {
            return Err(MarketDataError::InvalidMaturity { t });
        }
        if let Some(&df) = discount_factors.iter().find(|&&df| !(df > 0.0)) {
            return Err(MarketDataError::InvalidParameter(format!(
                "discount factor must be positive, got {df}"
            )));
        }

        let mut xs = Vec::with_capacity(times.len() + 1);
        let mut ys = Vec::with_capacity(times.len() + 1);
        xs.push(0.0);
        ys.push(0.0);
        xs.extend_from_slice(times);
        ys.extend(discount_factors.iter().map(|df| df.ln()));

        let n = xs.len();
        let tail_forward = -(ys[n - 1] - ys[n - 2]) / (xs[n - 1] - xs[n - 2]);
        Ok(Self {
            log_discounts: LinearInterpolator::new(&xs, &ys)?,
            tail_forward,
        })
    }

    /// Builds the curve from continuously compounded zero rates.
    pub fn from_zero_rates(times: &[f64], zero_rates: &[f64]) -> Result<Self, MarketDataError> {
        let dfs: Vec<f64> = times
            .iter()
            .zip(zero_rates)
            .map(|(t, r)| (-r * t).exp())
            .collect();
        Self::from_discount_factors(times, &dfs)
    }

    /// Last pillar time.
    pub fn last_pillar(&self) -> f64 {
        self.log_discounts.domain().1
    }
}

impl YieldCurve<f64> for PillarCurve {
    fn discount_factor(&self, t: f64) -> Result<f64, MarketDataError> {
        if t < 0.0 || t.is_nan() {
            return Err(MarketDataError::InvalidMaturity { t });
        }
        let (_, t_max) = self.log_discounts.domain();
        if t > t_max {
            let at_max = self.log_discounts.interpolate(t_max)?;
            return Ok((at_max - self.tail_forward * (t - t_max)).exp());
        }
        Ok(self.log_discounts.interpolate(t)?.exp())
    }
}
