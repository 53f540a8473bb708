//! Flat yield curve implementation.

use super::YieldCurve;
use crate::market_data::error::MarketDataError;
use num_traits::Float;

/// Flat yield curve with a constant continuously compounded rate.
///
/// # Example
///
/// ```
/// use bgm_core::market_data::curves::{FlatCurve, YieldCurve};
///
/// let curve = FlatCurve::new(0.05_f64);
/// let df = curve.discount_factor(1.0).unwrap();
/// assert!((df - 0.951229).abs() < 1e-5);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FlatCurve<T: Float> {
    rate: T,
}

impl<T: Float> FlatCurve<T> {
    /// Flat curve at `rate`.
    #[inline]
    pub fn new(rate: T) -> Self {
        Self { rate }
    }

    /// The constant rate.
    #[inline]
    pub fn rate(&self) -> T {
        self.rate
    }
}

impl<T: Float> YieldCurve<T> for FlatCurve<T> {
    #[inline]
    fn discount_factor(&self, t: T) -> Result<T, MarketDataError> {
        if t < T::zero() {
            return Err(MarketDataError::InvalidMaturity {
                t: t.to_f64().unwrap_or(0.0),
            });
        }
        Ok((-self.rate * t).exp())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_discount_factor_at_zero() {
        let curve = FlatCurve::new(0.05_f64);
        assert_eq!(curve.discount_factor(0.0).unwrap(), 1.0);
    }

    #[test]
    fn test_negative_maturity_rejected() {
        let curve = FlatCurve::new(0.05_f64);
        assert!(curve.discount_factor(-0.1).is_err());
    }

    #[test]
    fn test_zero_rate_is_flat() {
        let curve = FlatCurve::new(0.031_f64);
        for t in [0.5, 1.0, 7.0, 30.0] {
            assert_relative_eq!(curve.zero_rate(t).unwrap(), 0.031, epsilon = 1e-14);
        }
    }
}
