//! Hagan SABR lognormal volatility and a per-expiry SABR swaption surface.

use bgm_core::market_data::volatility::{VolatilityKind, VolatilityQuery, VolatilitySource};
use bgm_core::market_data::MarketDataError;

use super::conversion::lognormal_to_normal;
use super::error::AnalyticalError;

/// SABR parameters `(α, β, ρ, ν)`.
///
/// # Examples
/// ```
/// use bgm_models::analytical::SabrParameters;
///
/// let params = SabrParameters::new(0.2, 1.0, 0.0, 0.0).unwrap();
/// // β = 1 without vol-of-vol is plain Black.
/// assert!((params.lognormal_volatility(0.03, 0.05, 2.0).unwrap() - 0.2).abs() < 1e-15);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SabrParameters {
    /// Initial volatility level `α > 0`.
    pub alpha: f64,
    /// CEV exponent `β ∈ [0, 1]`.
    pub beta: f64,
    /// Spot/vol correlation `ρ ∈ (−1, 1)`.
    pub rho: f64,
    /// Vol-of-vol `ν >= 0`.
    pub nu: f64,
}

impl SabrParameters {
    /// Creates validated parameters.
    pub fn new(alpha: f64, beta: f64, rho: f64, nu: f64) -> Result<Self, AnalyticalError> {
        let params = Self {
            alpha,
            beta,
            rho,
            nu,
        };
        params.validate()?;
        Ok(params)
    }

    /// Checks parameter ranges.
    pub fn validate(&self) -> Result<(), AnalyticalError> {
        if !(self.alpha > 0.0) || !self.alpha.is_finite() {
            return Err(AnalyticalError::InvalidParameter {
                name: "alpha",
                value: self.alpha,
                constraint: "must be positive",
            });
        }
        if !(0.0..=1.0).contains(&self.beta) {
            return Err(AnalyticalError::InvalidParameter {
                name: "beta",
                value: self.beta,
                constraint: "must lie in [0, 1]",
            });
        }
        if !(self.rho > -1.0 && self.rho < 1.0) {
            return Err(AnalyticalError::InvalidParameter {
                name: "rho",
                value: self.rho,
                constraint: "must lie in (-1, 1)",
            });
        }
        if !(self.nu >= 0.0) || !self.nu.is_finite() {
            return Err(AnalyticalError::InvalidParameter {
                name: "nu",
                value: self.nu,
                constraint: "must be non-negative",
            });
        }
        Ok(())
    }

    /// Hagan's lognormal volatility expansion.
    pub fn lognormal_volatility(
        &self,
        forward: f64,
        strike: f64,
        expiry: f64,
    ) -> Result<f64, AnalyticalError> {
        if !(forward > 0.0) {
            return Err(AnalyticalError::InvalidForward { forward });
        }
        if !(strike > 0.0) {
            return Err(AnalyticalError::InvalidStrike { strike });
        }
        let Self {
            alpha,
            beta,
            rho,
            nu,
        } = *self;
        let one_minus_beta = 1.0 - beta;
        let log_fk = (forward / strike).ln();
        let fk = forward * strike;
        let fk_half = fk.powf(0.5 * one_minus_beta);

        let b2 = one_minus_beta * one_minus_beta;
        let log2 = log_fk * log_fk;
        let denominator = fk_half * (1.0 + b2 / 24.0 * log2 + b2 * b2 / 1920.0 * log2 * log2);

        let z = nu / alpha * fk_half * log_fk;
        let z_over_x = if z.abs() < 1e-8 {
            1.0 - 0.5 * rho * z
        } else {
            let x = (((1.0 - 2.0 * rho * z + z * z).sqrt() + z - rho) / (1.0 - rho)).ln();
            z / x
        };

        let correction = 1.0
            + (b2 / 24.0 * alpha * alpha / (fk_half * fk_half)
                + 0.25 * rho * beta * nu * alpha / fk_half
                + (2.0 - 3.0 * rho * rho) / 24.0 * nu * nu)
                * expiry.max(0.0);

        let vol = alpha / denominator * z_over_x * correction;
        if vol.is_finite() && vol >= 0.0 {
            Ok(vol)
        } else {
            Err(AnalyticalError::NumericalInstability {
                message: format!("SABR expansion produced {vol} at K = {strike}"),
            })
        }
    }

    /// Normal volatility with the same price as the Hagan lognormal one.
    pub fn normal_volatility(
        &self,
        forward: f64,
        strike: f64,
        expiry: f64,
    ) -> Result<f64, AnalyticalError> {
        let black = self.lognormal_volatility(forward, strike, expiry)?;
        lognormal_to_normal(forward, strike, expiry, black)
    }

    fn blend(&self, other: &Self, w: f64) -> Self {
        Self {
            alpha: self.alpha + w * (other.alpha - self.alpha),
            beta: self.beta + w * (other.beta - self.beta),
            rho: self.rho + w * (other.rho - self.rho),
            nu: self.nu + w * (other.nu - self.nu),
        }
    }
}

/// Swaption volatility surface from SABR parameters per expiry.
///
/// Parameters are interpolated linearly in expiry and held flat outside the
/// quoted range. The underlying tenor does not enter.
///
/// # Examples
/// ```
/// use bgm_core::market_data::volatility::{VolatilityQuery, VolatilitySource};
/// use bgm_models::analytical::{SabrParameters, SabrSwaptionSurface};
///
/// let surface = SabrSwaptionSurface::new(
///     vec![1.0, 5.0],
///     vec![
///         SabrParameters::new(0.25, 1.0, -0.3, 0.4).unwrap(),
///         SabrParameters::new(0.20, 1.0, -0.3, 0.4).unwrap(),
///     ],
/// )
/// .unwrap();
///
/// let low = surface.volatility(&VolatilityQuery { expiry: 2.0, tenor: 5.0, forward: 0.03, strike: 0.02 }).unwrap();
/// let high = surface.volatility(&VolatilityQuery { expiry: 2.0, tenor: 5.0, forward: 0.03, strike: 0.04 }).unwrap();
/// assert!(low > high);
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SabrSwaptionSurface {
    expiries: Vec<f64>,
    parameters: Vec<SabrParameters>,
}

impl SabrSwaptionSurface {
    /// Creates the surface; expiries must be strictly increasing.
    pub fn new(expiries: Vec<f64>, parameters: Vec<SabrParameters>) -> Result<Self, AnalyticalError> {
        if expiries.is_empty() || expiries.len() != parameters.len() {
            return Err(AnalyticalError::InvalidParameter {
                name: "expiries",
                value: expiries.len() as f64,
                constraint: "need one parameter set per expiry",
            });
        }
        if let Some(w) = expiries.windows(2).find(|w| !(w[1] > w[0])) {
            return Err(AnalyticalError::InvalidParameter {
                name: "expiry",
                value: w[1],
                constraint: "expiries must be strictly increasing",
            });
        }
        for p in &parameters {
            p.validate()?;
        }
        Ok(Self {
            expiries,
            parameters,
        })
    }

    /// Quoted expiries.
    pub fn expiries(&self) -> &[f64] {
        &self.expiries
    }

    /// Interpolated parameters at `expiry`.
    pub fn parameters_at(&self, expiry: f64) -> SabrParameters {
        let n = self.expiries.len();
        if expiry <= self.expiries[0] {
            return self.parameters[0];
        }
        if expiry >= self.expiries[n - 1] {
            return self.parameters[n - 1];
        }
        let i = self.expiries.partition_point(|&e| e <= expiry) - 1;
        let w = (expiry - self.expiries[i]) / (self.expiries[i + 1] - self.expiries[i]);
        self.parameters[i].blend(&self.parameters[i + 1], w)
    }
}

impl VolatilitySource for SabrSwaptionSurface {
    fn volatility(&self, query: &VolatilityQuery) -> Result<f64, MarketDataError> {
        if !(query.expiry >= 0.0) {
            return Err(MarketDataError::InvalidExpiry {
                expiry: query.expiry,
            });
        }
        self.parameters_at(query.expiry)
            .lognormal_volatility(query.forward, query.strike, query.expiry)
            .map_err(|e| MarketDataError::InvalidParameter(e.to_string()))
    }

    fn kind(&self) -> VolatilityKind {
        VolatilityKind::Lognormal
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_atm_lognormal_sabr() {
        let p = SabrParameters::new(0.2, 1.0, -0.25, 0.5).unwrap();
        let expected = 0.2 * (1.0 + (0.25 * -0.25 * 0.5 * 0.2 + (2.0 - 3.0 * 0.0625) / 24.0 * 0.25) * 2.0);
        assert_relative_eq!(p.lognormal_volatility(0.04, 0.04, 2.0).unwrap(), expected, max_relative = 1e-12);
    }

    #[test]
    fn test_continuous_through_the_money() {
        let p = SabrParameters::new(0.03, 0.5, 0.1, 0.3).unwrap();
        let atm = p.lognormal_volatility(0.03, 0.03, 1.0).unwrap();
        let near = p.lognormal_volatility(0.03, 0.03 * (1.0 + 1e-9), 1.0).unwrap();
        assert_relative_eq!(atm, near, max_relative = 1e-7);
    }

    #[test]
    fn test_parameter_validation() {
        assert!(SabrParameters::new(0.0, 0.5, 0.0, 0.3).is_err());
        assert!(SabrParameters::new(0.2, 1.5, 0.0, 0.3).is_err());
        assert!(SabrParameters::new(0.2, 0.5, 1.0, 0.3).is_err());
        assert!(SabrParameters::new(0.2, 0.5, 0.0, -0.3).is_err());
    }

    #[test]
    fn test_surface_interpolates_parameters() {
        let a = SabrParameters::new(0.2, 1.0, 0.0, 0.0).unwrap();
        let b = SabrParameters::new(0.3, 1.0, 0.0, 0.0).unwrap();
        let surface = SabrSwaptionSurface::new(vec![1.0, 3.0], vec![a, b]).unwrap();
        let q = VolatilityQuery::atm(2.0, 5.0, 0.03);
        assert_relative_eq!(surface.volatility(&q).unwrap(), 0.25, max_relative = 1e-14);
        assert_eq!(surface.parameters_at(10.0), b);
        assert!(surface.volatility(&VolatilityQuery::atm(-1.0, 5.0, 0.03)).is_err());
    }

    #[test]
    fn test_normal_volatility_positive() {
        let p = SabrParameters::new(0.2, 1.0, -0.2, 0.3).unwrap();
        let n = p.normal_volatility(0.03, 0.025, 2.0).unwrap();
        assert!(n > 0.0 && n < 0.02);
    }
}
