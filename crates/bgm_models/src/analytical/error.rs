//! Error types for analytical pricing operations.

use bgm_core::types::{PricingError, SolverError};
use thiserror::Error;

/// Analytical pricing errors.
///
/// # Examples
/// ```
/// use bgm_models::analytical::AnalyticalError;
///
/// let err = AnalyticalError::InvalidVolatility { volatility: -0.2 };
/// assert_eq!(format!("{}", err), "Invalid volatility: σ = -0.2");
/// ```
#[derive(Debug, Clone, Error, PartialEq)]
pub enum AnalyticalError {
    /// Negative or non-finite volatility.
    #[error("Invalid volatility: σ = {volatility}")]
    InvalidVolatility {
        /// The invalid volatility value
        volatility: f64,
    },

    /// Non-positive forward where lognormal dynamics need a positive one.
    #[error("Invalid forward: F = {forward}")]
    InvalidForward {
        /// The invalid forward value
        forward: f64,
    },

    /// Non-positive strike where a lognormal formula needs a positive one.
    #[error("Invalid strike: K = {strike}")]
    InvalidStrike {
        /// The invalid strike value
        strike: f64,
    },

    /// Invalid model parameter.
    #[error("Invalid parameter {name} = {value}: {constraint}")]
    InvalidParameter {
        /// Parameter name
        name: &'static str,
        /// Supplied value
        value: f64,
        /// Violated constraint
        constraint: &'static str,
    },

    /// Price outside the no-arbitrage band, so no implied volatility exists.
    #[error("Price {price} outside attainable range [{lower}, {upper})")]
    PriceOutOfBounds {
        /// Target price
        price: f64,
        /// Intrinsic lower bound
        lower: f64,
        /// Upper bound
        upper: f64,
    },

    /// Numerical failure during an inversion.
    #[error("Numerical instability: {message}")]
    NumericalInstability {
        /// Description of the numerical issue
        message: String,
    },
}

impl From<AnalyticalError> for PricingError {
    fn from(err: AnalyticalError) -> Self {
        match err {
            AnalyticalError::NumericalInstability { .. } => PricingError::NonConvergence {
                message: err.to_string(),
                best_estimate: f64::NAN,
                achieved_tolerance: f64::NAN,
            },
            _ => PricingError::InvalidInput(err.to_string()),
        }
    }
}

impl From<SolverError> for AnalyticalError {
    fn from(err: SolverError) -> Self {
        AnalyticalError::NumericalInstability {
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let err = AnalyticalError::InvalidForward { forward: -0.01 };
        assert_eq!(format!("{}", err), "Invalid forward: F = -0.01");
        let err = AnalyticalError::PriceOutOfBounds {
            price: 2.0,
            lower: 0.0,
            upper: 1.0,
        };
        assert!(format!("{}", err).contains("outside attainable range"));
    }

    #[test]
    fn test_to_pricing_error() {
        let err: PricingError = AnalyticalError::InvalidStrike { strike: 0.0 }.into();
        assert!(matches!(err, PricingError::InvalidInput(_)));
        let err: PricingError = AnalyticalError::NumericalInstability {
            message: "no bracket".to_string(),
        }
        .into();
        assert!(matches!(err, PricingError::NonConvergence { .. }));
    }
}
