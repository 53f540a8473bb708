//! Root-finding and least-squares solvers.
//!
//! ## Available Solvers
//!
//! - [`BrentSolver`]: Derivative-free bracketing root finder with function and variable tolerances
//! - [`LevenbergMarquardtSolver`]: Box-constrained nonlinear least squares for calibration
//!
//! ## Oracles
//!
//! Calibrators and the spread solver receive solvers through the [`RootFinder`]
//! and [`LeastSquaresSolver`] traits, so alternative numerical back ends can be
//! injected without touching the objective code.
//!
//! ## Examples
//!
//! ```
//! use bgm_core::math::solvers::{BrentSolver, SolverConfig};
//!
//! let solver = BrentSolver::new(SolverConfig::default());
//! let root = solver.find_root(|x: f64| x * x - 2.0, 0.0, 2.0).unwrap();
//! assert!((root - std::f64::consts::SQRT_2).abs() < 1e-10);
//! ```

mod brent;
mod config;
mod levenberg_marquardt;
mod oracle;

pub use brent::BrentSolver;
pub use config::SolverConfig;
pub use levenberg_marquardt::{LMConfig, LMResult, LevenbergMarquardtSolver, ParameterBound};
pub use oracle::{LeastSquaresSolver, RootFinder};
