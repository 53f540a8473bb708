//! Evaluation and spread-solving errors.

use bgm_core::market_data::MarketDataError;
use bgm_core::types::PricingError;
use bgm_models::calibration::CalibrationError;
use bgm_models::lattice::LatticeError;
use thiserror::Error;

/// Errors raised by the evaluator, the spread solver and the pipeline.
///
/// Empty exercise schedules and defaulted instruments are not errors; they
/// value to zero.
///
/// # Examples
///
/// ```
/// use bgm_pricing::EvaluationError;
///
/// let err = EvaluationError::CannotFindFeasibleQuote { candidates: 12 };
/// assert!(err.is_infeasible());
/// assert!(err.to_string().contains("12"));
/// ```
#[derive(Error, Debug, Clone)]
pub enum EvaluationError {
    /// Malformed schedule, representation or configuration.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A cashflow schedule with no periods on a live instrument.
    #[error("Empty cashflow schedule on a non-defaulted instrument")]
    EmptyCashflow,

    /// Swaption representations that do not line up with the lattice.
    #[error("Schedule mismatch: {0}")]
    ScheduleMismatch(String),

    /// A curve bump that the curve cannot absorb.
    #[error("Infeasible quote: {0}")]
    InfeasibleQuote(String),

    /// Every candidate shift of the spread grid produced an infeasible curve.
    #[error("Cannot find a feasible quote among {candidates} candidate shifts")]
    CannotFindFeasibleQuote {
        /// Number of candidates tried
        candidates: usize,
    },

    /// The spread search stopped before matching the target price.
    #[error("Spread solve did not converge: {message} (best shift {best_estimate}, residual {achieved_tolerance:.3e})")]
    NonConvergence {
        /// What failed
        message: String,
        /// Best shift found
        best_estimate: f64,
        /// Absolute price error at the best shift
        achieved_tolerance: f64,
    },

    /// Lattice construction or access failure.
    #[error(transparent)]
    Lattice(#[from] LatticeError),

    /// Calibration failure inside the pipeline.
    #[error(transparent)]
    Calibration(#[from] CalibrationError),

    /// Root-finding or market-data failure.
    #[error(transparent)]
    Pricing(#[from] PricingError),
}

impl EvaluationError {
    /// `true` when the failure comes from an infeasible curve bump.
    pub fn is_infeasible(&self) -> bool {
        match self {
            Self::InfeasibleQuote(_) | Self::CannotFindFeasibleQuote { .. } => true,
            Self::Pricing(inner) => inner.is_infeasible(),
            Self::Calibration(CalibrationError::Pricing(inner)) => inner.is_infeasible(),
            _ => false,
        }
    }
}

impl From<MarketDataError> for EvaluationError {
    fn from(err: MarketDataError) -> Self {
        match err {
            MarketDataError::InfeasibleShift { .. } => Self::InfeasibleQuote(err.to_string()),
            other => Self::Pricing(PricingError::MarketData(other)),
        }
    }
}

impl From<EvaluationError> for PricingError {
    fn from(err: EvaluationError) -> Self {
        match err {
            EvaluationError::Pricing(inner) => inner,
            EvaluationError::Lattice(inner) => inner.into(),
            EvaluationError::Calibration(inner) => inner.into(),
            EvaluationError::InfeasibleQuote(message) => PricingError::InfeasibleQuote(message),
            EvaluationError::CannotFindFeasibleQuote { .. } => {
                PricingError::InfeasibleQuote(err.to_string())
            }
            EvaluationError::NonConvergence {
                message,
                best_estimate,
                achieved_tolerance,
            } => PricingError::NonConvergence {
                message,
                best_estimate,
                achieved_tolerance,
            },
            other => PricingError::InvalidInput(other.to_string()),
        }
    }
}
