//! Calibration error types.

use bgm_core::types::PricingError;
use thiserror::Error;

use crate::analytical::AnalyticalError;
use crate::lattice::LatticeError;

/// Calibration error type.
///
/// Invalid input is raised before any solve starts. Non-convergence carries
/// the best parameters found so a caller can decide whether to retry with a
/// looser tolerance.
#[derive(Error, Debug, Clone)]
pub enum CalibrationError {
    /// Malformed quotes, configuration or schedule.
    #[error("Invalid calibration input: {0}")]
    InvalidInput(String),

    /// A model or distribution the calibrator cannot handle.
    #[error("Not supported: {0}")]
    NotSupported(String),

    /// Quote grid and volatility matrix disagree in shape.
    #[error("Dimension mismatch: expected {expected}, got {got} ({context})")]
    DimensionMismatch {
        /// Expected length
        expected: usize,
        /// Actual length
        got: usize,
        /// Which dimension
        context: &'static str,
    },

    /// A quoted swaption ends after the last tenor date.
    #[error("Insufficient tenor dates: swaption ending at {end:.4} beyond last tenor {last:.4}")]
    InsufficientTenors {
        /// Requested swap end time
        end: f64,
        /// Last tenor date of the schedule
        last: f64,
    },

    /// The solver stopped before reaching the requested tolerance.
    #[error("Calibration did not converge: {message} (achieved {achieved_tolerance:.3e})")]
    NonConvergence {
        /// What failed
        message: String,
        /// Best parameters reached
        best_parameters: Vec<f64>,
        /// Achieved residual measure
        achieved_tolerance: f64,
    },

    /// Lattice construction failed.
    #[error(transparent)]
    Lattice(#[from] LatticeError),

    /// Pricing, root-finding or market-data failure.
    #[error(transparent)]
    Pricing(#[from] PricingError),
}

impl CalibrationError {
    /// Check if this error is retryable with a looser tolerance.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::NonConvergence { .. })
    }
}

impl From<AnalyticalError> for CalibrationError {
    fn from(err: AnalyticalError) -> Self {
        CalibrationError::Pricing(err.into())
    }
}

impl From<CalibrationError> for PricingError {
    fn from(err: CalibrationError) -> Self {
        match err {
            CalibrationError::Pricing(inner) => inner,
            CalibrationError::Lattice(inner) => inner.into(),
            CalibrationError::NotSupported(message) => PricingError::NotSupported(message),
            CalibrationError::NonConvergence {
                message,
                best_parameters,
                achieved_tolerance,
            } => PricingError::NonConvergence {
                message,
                best_estimate: best_parameters.last().copied().unwrap_or(f64::NAN),
                achieved_tolerance,
            },
            other => PricingError::InvalidInput(other.to_string()),
        }
    }
}
