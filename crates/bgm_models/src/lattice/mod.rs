//! Recombining rate lattice.
//!
//! [`LatticeBuilder`] turns a [`TenorSchedule`](crate::schedules::TenorSchedule)
//! and one [`VolatilityCurve`](crate::volatility::VolatilityCurve) per rate into
//! an immutable [`RateLattice`]. Consumers walk it date by date through
//! [`DateNodes`] and combine states with the binomial conditional
//! probabilities exposed by [`RateLattice::conditional_probability`].

mod builder;
mod config;
mod error;
mod rate_lattice;

pub use builder::LatticeBuilder;
pub use config::{Distribution, LatticeConfig};
pub use error::LatticeError;
pub use rate_lattice::{DateNodes, RateLattice};
