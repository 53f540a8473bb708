//! # bgm_core: Numerical Foundation for the BGM Lattice Pricer
//!
//! ## Layer 1 (Foundation) Role
//!
//! bgm_core is the bottom layer of the workspace and provides:
//! - Binomial and hypergeometric lattice probabilities (`math::combinatorics`)
//! - Root finders and least-squares oracles (`math::solvers`)
//! - Linear, bilinear and monotone interpolation (`math::interpolators`)
//! - Lazy index views with explicit access capability (`math::view`)
//! - Discount, shifted and survival curves (`market_data::curves`)
//! - The volatility-source contract and its standard sources (`market_data::volatility`)
//! - `Date` and `DayCountConvention` (`types::time`)
//! - Error types: `PricingError`, `SolverError`, `InterpolationError` (`types::error`)
//!
//! ## Zero Dependency Principle
//!
//! Layer 1 has no dependencies on other bgm_* crates, with minimal external dependencies:
//! - num-traits: Traits for generic numerical computation
//! - chrono: Date arithmetic
//! - thiserror: Error derivation
//! - serde: Serialisation support (optional)
//!
//! ## Usage Examples
//!
//! ```rust
//! use bgm_core::math::combinatorics::BinomialLattice;
//! use bgm_core::market_data::curves::{FlatCurve, YieldCurve};
//!
//! let lattice = BinomialLattice::symmetric(100);
//! let total: f64 = (0..=100).map(|k| lattice.probability(100, k)).sum();
//! assert!((total - 1.0).abs() < 1e-12);
//!
//! let curve = FlatCurve::new(0.03_f64);
//! let df = curve.discount_factor(2.0).unwrap();
//! assert!((df - (-0.06_f64).exp()).abs() < 1e-14);
//! ```
//!
//! ## Feature Flags
//!
//! - `serde` (default): Enable serialisation for configuration and date types

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(rustdoc::private_intra_doc_links)]

pub mod market_data;
pub mod math;
pub mod types;
