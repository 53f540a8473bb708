//! Core error and time types.
//!
//! This module provides:
//! - `time`: [`Date`] and [`DayCountConvention`] for turning calendar schedules into year fractions
//! - `error`: The pricing error taxonomy plus solver, interpolation and date errors
//!
//! # Re-exports
//!
//! - [`Date`], [`DayCountConvention`] from `time`
//! - [`PricingError`], [`DateError`], [`InterpolationError`], [`SolverError`] from `error`

pub mod error;
pub mod time;

pub use error::{DateError, InterpolationError, PricingError, SolverError};
pub use time::{Date, DayCountConvention};
