//! Injected numerical oracles.
//!
//! Calibration and spread solving only specify objectives and constraints;
//! the numerical search is delegated to an implementation of one of these
//! traits. The default implementations wrap [`BrentSolver`] and
//! [`LevenbergMarquardtSolver`].

use super::{BrentSolver, LMResult, LevenbergMarquardtSolver, ParameterBound};
use crate::types::{PricingError, SolverError};

/// One-dimensional bracketing root finder.
pub trait RootFinder {
    /// Finds `x` in `[lower, upper]` with `f(x) ≈ 0`.
    ///
    /// Errors from `f` are returned unchanged; solver failures are wrapped as
    /// [`PricingError::Solver`].
    fn find_root(
        &self,
        f: &mut dyn FnMut(f64) -> Result<f64, PricingError>,
        lower: f64,
        upper: f64,
    ) -> Result<f64, PricingError>;
}

impl RootFinder for BrentSolver<f64> {
    fn find_root(
        &self,
        f: &mut dyn FnMut(f64) -> Result<f64, PricingError>,
        lower: f64,
        upper: f64,
    ) -> Result<f64, PricingError> {
        self.try_find_root(f, lower, upper)
    }
}

/// Nonlinear least-squares minimiser with box constraints.
pub trait LeastSquaresSolver {
    /// Minimises `‖residuals(p)‖²` over the box `bounds` starting from `initial`.
    fn minimise(
        &self,
        residuals: &dyn Fn(&[f64]) -> Vec<f64>,
        initial: Vec<f64>,
        bounds: &[ParameterBound],
    ) -> Result<LMResult, SolverError>;
}

impl LeastSquaresSolver for LevenbergMarquardtSolver {
    fn minimise(
        &self,
        residuals: &dyn Fn(&[f64]) -> Vec<f64>,
        initial: Vec<f64>,
        bounds: &[ParameterBound],
    ) -> Result<LMResult, SolverError> {
        self.solve_bounded(residuals, initial, bounds)
    }
}
