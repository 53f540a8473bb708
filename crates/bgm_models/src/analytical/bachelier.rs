//! Bachelier (normal) model on a forward.
//!
//! ## Mathematical Formulas
//!
//! **Call Price**: C = (F − K)·N(d) + σ√T·φ(d)
//! **Put Price**: P = (K − F)·N(−d) + σ√T·φ(d)
//!
//! Where d = (F − K) / (σ√T).

use num_traits::Float;

use super::distributions::{norm_cdf, norm_pdf};
use super::error::AnalyticalError;
use super::OptionType;

/// Bachelier model for forwards of any sign.
///
/// # Examples
/// ```
/// use bgm_models::analytical::Bachelier;
///
/// let model = Bachelier::new(-0.002_f64, 0.008).unwrap();
/// let call = model.price_call(0.0, 1.0);
/// let put = model.price_put(0.0, 1.0);
///
/// // C − P = F − K
/// assert!((call - put + 0.002).abs() < 1e-15);
/// ```
#[derive(Debug, Clone, Copy)]
pub struct Bachelier<T: Float> {
    forward: T,
    volatility: T,
}

impl<T: Float> Bachelier<T> {
    /// Creates a new Bachelier model. A zero volatility prices intrinsic value.
    ///
    /// # Errors
    /// - `AnalyticalError::InvalidVolatility` if volatility < 0 or not finite
    pub fn new(forward: T, volatility: T) -> Result<Self, AnalyticalError> {
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

    #[inline]
    fn deviation(&self, expiry: T) -> T {
        if expiry > T::zero() {
            self.volatility * expiry.sqrt()
        } else {
            T::zero()
        }
    }

    /// Undiscounted call value.
    pub fn price_call(&self, strike: T, expiry: T) -> T {
        let deviation = self.deviation(expiry);
        let moneyness = self.forward - strike;
        if deviation <= T::zero() {
            return moneyness.max(T::zero());
        }
        let d = moneyness / deviation;
        moneyness * norm_cdf(d) + deviation * norm_pdf(d)
    }

    /// Undiscounted put value.
    pub fn price_put(&self, strike: T, expiry: T) -> T {
        let deviation = self.deviation(expiry);
        let moneyness = self.forward - strike;
        if deviation <= T::zero() {
            return (-moneyness).max(T::zero());
        }
        let d = moneyness / deviation;
        -moneyness * norm_cdf(-d) + deviation * norm_pdf(d)
    }

    /// Undiscounted value of `option_type`.
    #[inline]
    pub fn price(&self, option_type: OptionType, strike: T, expiry: T) -> T {
        match option_type {
            OptionType::Call => self.price_call(strike, expiry),
            OptionType::Put => self.price_put(strike, expiry),
        }
    }

    /// Sensitivity to the volatility, `√T·φ(d)`.
    pub fn vega(&self, strike: T, expiry: T) -> T {
        let deviation = self.deviation(expiry);
        if deviation <= T::zero() {
            return T::zero();
        }
        expiry.sqrt() * norm_pdf((self.forward - strike) / deviation)
    }
}
