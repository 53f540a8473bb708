//! Lattice construction and access errors.

use bgm_core::market_data::MarketDataError;
use bgm_core::types::PricingError;
use thiserror::Error;

/// Errors raised while building or reading a [`RateLattice`](super::RateLattice).
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LatticeError {
    /// Malformed input that is never silently corrected.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Fewer than two tenor dates, so no rate is live.
    #[error("Insufficient tenor dates: got {got}, need at least 2")]
    InsufficientTenors {
        /// Number of tenor dates supplied
        got: usize,
    },

    /// Tenor dates not strictly increasing.
    #[error("Tenor out of order at index {index}")]
    TenorOutOfOrder {
        /// First offending index
        index: usize,
    },

    /// A date index past the last node date.
    #[error("Date index {date} out of range (date count {count})")]
    DateOutOfRange {
        /// Requested date index
        date: usize,
        /// Number of node dates
        count: usize,
    },

    /// A state index outside `[0, stateCount)` at the given date.
    #[error("State index {state} out of range at date {date} (state count {count})")]
    StateOutOfRange {
        /// Date index
        date: usize,
        /// Requested state index
        state: usize,
        /// Number of states at the date
        count: usize,
    },

    /// A rate that is not live at the given date.
    #[error("Rate {rate} is not live at date {date}")]
    RateNotLive {
        /// Date index
        date: usize,
        /// Absolute rate index
        rate: usize,
    },

    /// The drift fit could not reprice a zero bond with a positive rate level.
    #[error("Drift fit failed for rate {rate} at date {date}: {message}")]
    DriftFit {
        /// Date index
        date: usize,
        /// Absolute rate index
        rate: usize,
        /// What went wrong
        message: String,
    },

    /// Curve lookup failure while seeding forwards.
    #[error("Market data error: {0}")]
    MarketData(#[from] MarketDataError),
}

impl From<LatticeError> for PricingError {
    fn from(err: LatticeError) -> Self {
        match err {
            LatticeError::MarketData(inner) => PricingError::MarketData(inner),
            LatticeError::DriftFit { .. } => PricingError::NonConvergence {
                message: err.to_string(),
                best_estimate: f64::NAN,
                achieved_tolerance: f64::NAN,
            },
            other => PricingError::InvalidInput(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tenor_out_of_order_message() {
        let err = LatticeError::TenorOutOfOrder { index: 3 };
        assert_eq!(err.to_string(), "Tenor out of order at index 3");
    }

    #[test]
    fn test_conversion_to_pricing_error() {
        let err: PricingError = LatticeError::InsufficientTenors { got: 1 }.into();
        assert!(matches!(err, PricingError::InvalidInput(_)));

        let err: PricingError = LatticeError::MarketData(MarketDataError::InvalidMaturity { t: -1.0 }).into();
        assert!(matches!(err, PricingError::MarketData(_)));
    }
}
