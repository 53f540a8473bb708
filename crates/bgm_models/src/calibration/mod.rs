//! Volatility calibration.
//!
//! Three routes fit the forward-volatility matrix to swaption quotes:
//!
//! - [`CascadeCalibrator`]: cell-by-cell exact fit, solving one forward
//!   volatility per quote with a root finder
//! - [`PiecewiseCalibrator`]: least-squares fit of a piecewise-constant
//!   `ψ_i · φ_k` parametrisation, optionally with the correlation parameters
//! - [`CapletStripper`]: caplet term structures bootstrapped from flat cap vols
//!
//! Swaption model prices come through the [`SwaptionModelPricer`] seam, either
//! the lattice itself ([`LatticeSwaptionPricer`]) or Rebonato's frozen-weight
//! approximation ([`RebonatoSwaptionPricer`]).
//!
//! ```text
//!   SwaptionVolatilityMatrix ──quotes_for──▶ [SwaptionQuote]
//!                                                 │
//!                 SwaptionModelPricer ◀── Cascade / Piecewise
//!                                                 │
//!                                                 ▼
//!                       CalibrationResult<CalibratedVolatilities>
//! ```

mod caplet;
mod cascade;
mod error;
mod piecewise;
mod pricer;
mod quotes;
mod result;

pub use caplet::{CapVolatilityGrid, CapletStripper, CapletStripperConfig, CapletVolatilities};
pub use cascade::{CascadeCalibrator, CascadeConfig, CascadeLayout};
pub use error::CalibrationError;
pub use piecewise::{Homogeneity, PiecewiseCalibrator, PiecewiseConfig, PiecewiseConstantParameters};
pub use pricer::{LatticeSwaptionPricer, RebonatoSwaptionPricer, SwaptionModelPricer};
pub use quotes::{SwaptionQuote, SwaptionVolatilityMatrix};
pub use result::{CalibratedVolatilities, CalibrationDiagnostics, CalibrationResult};
