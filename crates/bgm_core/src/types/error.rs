//! Error types for the BGM lattice pricer.
//!
//! This module provides:
//! - `PricingError`: The top-level error taxonomy (invalid input, not supported,
//!   non-convergence, infeasible quote)
//! - `DateError`: Errors from date construction and parsing
//! - `InterpolationError`: Errors from interpolation operations
//! - `SolverError`: Errors from root-finding and least-squares solvers

use thiserror::Error;

use crate::market_data::MarketDataError;

/// Categorised pricing errors.
///
/// Every fallible operation in the pricer surfaces one of these categories
/// to its immediate caller. Degenerate-but-valid situations (empty exercise
/// schedules, zero notionals) are not errors and resolve to zero values.
///
/// # Variants
/// - `InvalidInput`: Malformed schedules, dimension mismatches, bad parameters
/// - `NotSupported`: A requested mode the component does not implement
/// - `NonConvergence`: A solve that exhausted its budget, carrying the last estimate
/// - `InfeasibleQuote`: A curve bump that would produce an invalid curve
///
/// # Examples
/// ```
/// use bgm_core::types::PricingError;
///
/// let err = PricingError::InvalidInput("tenor out of order at index 3".to_string());
/// assert_eq!(format!("{}", err), "Invalid input: tenor out of order at index 3");
/// ```
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PricingError {
    /// Invalid input data or parameters
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Requested mode is not supported by the component
    #[error("Not supported: {0}")]
    NotSupported(String),

    /// Iterative procedure failed to reach its tolerance
    #[error("Non-convergence: {message} (best estimate {best_estimate}, achieved tolerance {achieved_tolerance:e})")]
    NonConvergence {
        /// Description of the failing procedure
        message: String,
        /// Last best estimate of the solved quantity
        best_estimate: f64,
        /// Residual achieved at the best estimate
        achieved_tolerance: f64,
    },

    /// A curve shift produced an invalid curve
    #[error("Infeasible quote: {0}")]
    InfeasibleQuote(String),

    /// Wrapped solver error
    #[error("Solver error: {0}")]
    Solver(#[from] SolverError),

    /// Wrapped market data error
    #[error("Market data error: {0}")]
    MarketData(#[from] MarketDataError),
}

impl PricingError {
    /// Returns `true` when the error signals an infeasible curve bump rather than a model failure.
    pub fn is_infeasible(&self) -> bool {
        matches!(
            self,
            PricingError::InfeasibleQuote(_)
                | PricingError::MarketData(MarketDataError::InfeasibleShift { .. })
        )
    }
}

/// Date-related errors.
///
/// # Examples
/// ```
/// use bgm_core::types::DateError;
///
/// let err = DateError::InvalidDate { year: 2024, month: 2, day: 30 };
/// assert_eq!(format!("{}", err), "Invalid date: 2024-2-30");
/// ```
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DateError {
    /// Invalid date components (e.g., February 30th).
    #[error("Invalid date: {year}-{month}-{day}")]
    InvalidDate {
        /// Year component
        year: i32,
        /// Month component (1-12)
        month: u32,
        /// Day component (1-31)
        day: u32,
    },

    /// Failed to parse date string.
    #[error("Failed to parse date: {0}")]
    ParseError(String),
}

/// Interpolation errors.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum InterpolationError {
    /// Query point outside the interpolation domain.
    #[error("Query point {x} outside valid domain [{min}, {max}]")]
    OutOfBounds {
        /// Query point
        x: f64,
        /// Lower domain bound
        min: f64,
        /// Upper domain bound
        max: f64,
    },

    /// Too few data points for the method.
    #[error("Insufficient data points: got {got}, need at least {need}")]
    InsufficientData {
        /// Points supplied
        got: usize,
        /// Points required
        need: usize,
    },

    /// Abscissae not strictly increasing.
    #[error("Data is not monotonic at index {index}")]
    NonMonotonicData {
        /// First offending index
        index: usize,
    },

    /// Any other malformed input.
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Root-finding and optimisation errors.
///
/// # Examples
/// ```
/// use bgm_core::types::SolverError;
///
/// let err = SolverError::NoBracket { a: 0.0, b: 1.0 };
/// assert_eq!(format!("{}", err), "No bracket: f(0) and f(1) have same sign");
/// ```
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SolverError {
    /// Iteration budget exhausted.
    #[error("Failed to converge after {iterations} iterations (last estimate {last})")]
    MaxIterationsExceeded {
        /// Iterations performed
        iterations: usize,
        /// Best estimate at termination
        last: f64,
    },

    /// Bracket endpoints do not straddle a root.
    #[error("No bracket: f({a}) and f({b}) have same sign")]
    NoBracket {
        /// Left endpoint
        a: f64,
        /// Right endpoint
        b: f64,
    },

    /// Numerical breakdown (NaN, singular system, empty problem).
    #[error("Numerical instability: {0}")]
    NumericalInstability(String),
}
