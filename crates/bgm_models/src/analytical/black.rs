//! Black-76 (lognormal) model on a forward.
//!
//! ## Mathematical Formulas
//!
//! **Call Price**: C = F·N(d1) − K·N(d2)
//! **Put Price**: P = K·N(−d2) − F·N(−d1)
//!
//! Where:
//! - d1 = (ln(F/K) + σ²T/2) / (σ√T)
//! - d2 = d1 − σ√T
//!
//! Prices are undiscounted; multiply by the annuity (swaptions) or
//! `Δ·P(0, T_pay)` (caplets).

use num_traits::Float;

use super::distributions::{constant, norm_cdf, norm_pdf};
use super::error::AnalyticalError;
use super::OptionType;

/// Black-76 model for a positive forward.
///
/// A zero volatility is allowed and prices the intrinsic value.
///
/// # Examples
/// ```
/// use bgm_models::analytical::Black76;
///
/// let model = Black76::new(0.03_f64, 0.2).unwrap();
/// let call = model.price_call(0.03, 1.0);
/// let put = model.price_put(0.03, 1.0);
///
/// // Put-call parity on the forward: C − P = F − K
/// assert!((call - put).abs() < 1e-15);
/// assert!(call > 0.0);
/// ```
#[derive(Debug, Clone, Copy)]
pub struct Black76<T: Float> {
    forward: T,
    volatility: T,
}

impl<T: Float> Black76<T> {
    /// Creates a new Black-76 model.
    ///
    /// # Errors
    /// - `AnalyticalError::InvalidForward` if forward <= 0
    /// - `AnalyticalError::InvalidVolatility` if volatility < 0 or not finite
    pub fn new(forward: T, volatility: T) -> Result<Self, AnalyticalError> {
        if !(forward > T::zero()) {
            return Err(AnalyticalError::InvalidForward {
                forward: forward.to_f64().unwrap_or(f64::NAN),
            });
        }
        if !(volatility >= T::zero()) || !volatility.is_finite() {
            return Err(AnalyticalError::InvalidVolatility {
                volatility: volatility.to_f64().unwrap_or(f64::NAN),
            });
        }
        Ok(Self {
            forward,
            volatility,
        })
    }

    /// Returns the forward.
    #[inline]
    pub fn forward(&self) -> T {
        self.forward
    }

    /// Returns the volatility.
    #[inline]
    pub fn volatility(&self) -> T {
        self.volatility
    }

    /// Total standard deviation `σ√T`, zero for non-positive expiries.
    #[inline]
    fn deviation(&self, expiry: T) -> T {
        if expiry > T::zero() {
            self.volatility * expiry.sqrt()
        } else {
            T::zero()
        }
    }

    #[inline]
    fn d1(&self, strike: T, deviation: T) -> T {
        let half: T = constant(0.5);
        ((self.forward / strike).ln() + half * deviation * deviation) / deviation
    }

    /// Undiscounted call value.
    pub fn price_call(&self, strike: T, expiry: T) -> T {
        let deviation = self.deviation(expiry);
        if strike <= T::zero() {
            return self.forward - strike;
        }
        if deviation <= T::zero() {
            return (self.forward - strike).max(T::zero());
        }
        let d1 = self.d1(strike, deviation);
        let d2 = d1 - deviation;
        self.forward * norm_cdf(d1) - strike * norm_cdf(d2)
    }

    /// Undiscounted put value.
    pub fn price_put(&self, strike: T, expiry: T) -> T {
        let deviation = self.deviation(expiry);
        if strike <= T::zero() {
            return T::zero();
        }
        if deviation <= T::zero() {
            return (strike - self.forward).max(T::zero());
        }
        let d1 = self.d1(strike, deviation);
        let d2 = d1 - deviation;
        strike * norm_cdf(-d2) - self.forward * norm_cdf(-d1)
    }

    /// Undiscounted value of `option_type`.
    #[inline]
    pub fn price(&self, option_type: OptionType, strike: T, expiry: T) -> T {
        match option_type {
            OptionType::Call => self.price_call(strike, expiry),
            OptionType::Put => self.price_put(strike, expiry),
        }
    }

    /// Sensitivity to the volatility, `F·φ(d1)·√T`.
    pub fn vega(&self, strike: T, expiry: T) -> T {
        let deviation = self.deviation(expiry);
        if deviation <= T::zero() || strike <= T::zero() {
            return T::zero();
        }
        self.forward * norm_pdf(self.d1(strike, deviation)) * expiry.sqrt()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::{assert_abs_diff_eq, assert_relative_eq};

    #[test]
    fn test_atm_closed_form() {
        // ATM: C = F·(2N(σ√T/2) − 1)
        let model = Black76::new(0.04_f64, 0.25).unwrap();
        let expected = 0.04 * (2.0 * norm_cdf(0.125) - 1.0);
        assert_relative_eq!(model.price_call(0.04, 1.0), expected, max_relative = 1e-14);
    }

    #[test]
    fn test_put_call_parity() {
        let model = Black76::new(0.03_f64, 0.3).unwrap();
        for strike in [0.01, 0.025, 0.03, 0.05] {
            let parity = model.price_call(strike, 2.0) - model.price_put(strike, 2.0);
            assert_abs_diff_eq!(parity, 0.03 - strike, epsilon = 1e-15);
        }
    }

    #[test]
    fn test_zero_volatility_is_intrinsic() {
        let model = Black76::new(0.03_f64, 0.0).unwrap();
        assert_eq!(model.price_call(0.02, 1.0), 0.03 - 0.02);
        assert_eq!(model.price_put(0.02, 1.0), 0.0);
        assert_eq!(model.vega(0.02, 1.0), 0.0);
    }

    #[test]
    fn test_non_positive_strike() {
        let model = Black76::new(0.03_f64, 0.2).unwrap();
        assert_eq!(model.price_call(-0.01, 1.0), 0.04);
        assert_eq!(model.price_put(0.0, 1.0), 0.0);
    }

    #[test]
    fn test_vega_matches_finite_difference() {
        let h = 1e-6;
        let up = Black76::new(0.03_f64, 0.2 + h).unwrap().price_call(0.035, 3.0);
        let down = Black76::new(0.03_f64, 0.2 - h).unwrap().price_call(0.035, 3.0);
        let vega = Black76::new(0.03_f64, 0.2).unwrap().vega(0.035, 3.0);
        assert_relative_eq!(vega, (up - down) / (2.0 * h), max_relative = 1e-6);
    }

    #[test]
    fn test_invalid_inputs() {
        assert!(matches!(
            Black76::new(0.0_f64, 0.2),
            Err(AnalyticalError::InvalidForward { .. })
        ));
        assert!(matches!(
            Black76::new(0.03_f64, -0.1),
            Err(AnalyticalError::InvalidVolatility { .. })
        ));
    }
}
