//! Spread solving.
//!
//! [`SpreadSolver`] finds the parallel shift of a curve at which a pricing
//! function reproduces a target price. It knows nothing about curves: the
//! caller supplies the shift-to-price closure and reports infeasible shifts
//! through [`EvaluationError::is_infeasible`](crate::EvaluationError::is_infeasible).

mod config;
mod solver;

pub use config::SpreadSolverConfig;
pub use solver::{SpreadObjective, SpreadSolution, SpreadSolver};
