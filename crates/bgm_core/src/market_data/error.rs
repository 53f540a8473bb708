//! Market data error types.

use crate::types::InterpolationError;
use thiserror::Error;

/// Market data operation errors.
///
/// # Examples
///
/// ```
/// use bgm_core::market_data::MarketDataError;
///
/// let err = MarketDataError::InvalidMaturity { t: -1.0 };
/// assert!(format!("{}", err).contains("-1"));
/// ```
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MarketDataError {
    /// Negative or otherwise unusable time.
    #[error("Invalid maturity: t = {t}")]
    InvalidMaturity {
        /// The invalid maturity value
        t: f64,
    },

    /// Non-positive option expiry.
    #[error("Invalid expiry: T = {expiry}")]
    InvalidExpiry {
        /// The invalid expiry value
        expiry: f64,
    },

    /// Query outside a curve or surface without extrapolation.
    #[error("Out of bounds: {x} not in [{min}, {max}]")]
    OutOfBounds {
        /// The query point
        x: f64,
        /// Minimum valid value
        min: f64,
        /// Maximum valid value
        max: f64,
    },

    /// Wrapped interpolation error.
    #[error("Interpolation error: {0}")]
    Interpolation(#[from] InterpolationError),

    /// Not enough points to build the object.
    #[error("Insufficient data: got {got}, need {need}")]
    InsufficientData {
        /// Number of points provided
        got: usize,
        /// Minimum number of points required
        need: usize,
    },

    /// A parameter outside its admissible range.
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// A curve bump that would make the curve invalid (e.g. negative hazard rates).
    #[error("Infeasible shift {shift}: minimum admissible shift is {minimum}")]
    InfeasibleShift {
        /// Requested shift
        shift: f64,
        /// Smallest admissible shift
        minimum: f64,
    },
}
