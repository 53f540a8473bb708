//! Yield curve trait definition.

use crate::market_data::error::MarketDataError;
use num_traits::Float;

/// Discount curve contract consumed by the lattice and the spread solver.
///
/// Times are year fractions from the valuation date.
///
/// # Invariants
///
/// - D(0) = 1
/// - D(t) > 0 for all t >= 0
///
/// # Example
///
/// ```
/// use bgm_core::market_data::curves::{FlatCurve, YieldCurve};
///
/// let curve = FlatCurve::new(0.03_f64);
/// let df = curve.discount_factor_between(1.0, 2.0).unwrap();
/// assert!((df - (-0.03_f64).exp()).abs() < 1e-14);
///
/// // Simple-compounded forward used to seed lattice rates.
/// let fwd = curve.simple_forward_rate(1.0, 2.0, 1.0).unwrap();
/// assert!((fwd - (0.03_f64.exp() - 1.0)).abs() < 1e-14);
/// ```
pub trait YieldCurve<T: Float> {
    /// Discount factor D(t) for maturity `t`.
    ///
    /// # Errors
    ///
    /// [`MarketDataError::InvalidMaturity`] for negative `t`.
    fn discount_factor(&self, t: T) -> Result<T, MarketDataError>;

    /// Continuously compounded zero rate `-ln D(t) / t`.
    fn zero_rate(&self, t: T) -> Result<T, MarketDataError> {
        if t <= T::zero() {
            return Err(MarketDataError::InvalidMaturity {
                t: t.to_f64().unwrap_or(0.0),
            });
        }
        Ok(-self.discount_factor(t)?.ln() / t)
    }

    /// Forward discount factor `D(t2) / D(t1)`.
    fn discount_factor_between(&self, t1: T, t2: T) -> Result<T, MarketDataError> {
        Ok(self.discount_factor(t2)? / self.discount_factor(t1)?)
    }

    /// Continuously compounded forward rate between `t1` and `t2`.
    fn forward_rate(&self, t1: T, t2: T) -> Result<T, MarketDataError> {
        let dt = t2 - t1;
        if dt <= T::zero() {
            return Err(MarketDataError::InvalidMaturity {
                t: dt.to_f64().unwrap_or(0.0),
            });
        }
        Ok(-self.discount_factor_between(t1, t2)?.ln() / dt)
    }

    /// Simple-compounded forward rate over an accrual period of length `accrual`.
    ///
    /// `(D(t1) / D(t2) - 1) / accrual`
    fn simple_forward_rate(&self, t1: T, t2: T, accrual: T) -> Result<T, MarketDataError> {
        if accrual <= T::zero() || t2 <= t1 {
            return Err(MarketDataError::InvalidMaturity {
                t: (t2 - t1).to_f64().unwrap_or(0.0),
            });
        }
        Ok((T::one() / self.discount_factor_between(t1, t2)? - T::one()) / accrual)
    }
}

impl<T: Float, C: YieldCurve<T> + ?Sized> YieldCurve<T> for &C {
    fn discount_factor(&self, t: T) -> Result<T, MarketDataError> {
        (**self).discount_factor(t)
    }
}
