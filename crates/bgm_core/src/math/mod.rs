//! Numerical building blocks.
//!
//! - [`combinatorics`]: Binomial and hypergeometric lattice probabilities
//! - [`interpolators`]: Linear, bilinear and monotone interpolation
//! - [`solvers`]: Brent root finding, Levenberg–Marquardt and the oracle traits
//! - [`view`]: Lazy read-only and read-write index views

pub mod combinatorics;
pub mod interpolators;
pub mod solvers;
pub mod view;
