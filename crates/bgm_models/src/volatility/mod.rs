//! Volatility and correlation structures of the forward rates.
//!
//! - [`VolatilityCurve`]: piecewise-flat `σ(t)` of one rate, zero after its reset
//! - [`ForwardVolatilityMatrix`]: lower-triangular `σ[i, j]` produced by calibration
//! - [`CorrelationStructure`]: explicit or [`ExponentialCorrelation`] matrix

mod correlation;
mod curve;
mod matrix;

pub use correlation::{CorrelationStructure, ExponentialCorrelation};
pub use curve::VolatilityCurve;
pub use matrix::ForwardVolatilityMatrix;
