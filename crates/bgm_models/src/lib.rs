//! # BGM Models (L2: Lattice and Calibration)
//!
//! Everything between market data and a priced instrument:
//!
//! - Tenor schedules and the node grid of the lattice
//! - Forward-volatility matrices, per-rate curves and correlation structures
//! - The recombining BGM/LMM rate lattice
//! - Black, Bachelier and SABR analytics with volatility conversions
//! - Calibration of the volatility matrix to swaption and cap quotes
//!
//! ## Design Principles
//!
//! - **Immutable lattices**: built once, shared read-only by evaluators
//! - **Trait seams** for swaption pricers and numerical solvers
//! - **Builder pattern** for ergonomic API with sensible defaults

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(rustdoc::private_intra_doc_links)]

pub mod analytical;
pub mod calibration;
pub mod lattice;
pub mod schedules;
pub mod volatility;
