//! Box-constrained Levenberg-Marquardt least-squares solver.
//!
//! Each iteration solves the Marquardt-scaled normal equations
//!
//! ```text
//! (JᵀJ + λ·diag(JᵀJ)) δ = −Jᵀr
//! ```
//!
//! with a forward-difference Jacobian, projects the trial point back into
//! the parameter box, and accepts it only when the residual sum of squares
//! decreases.

use crate::types::SolverError;

/// Configuration for [`LevenbergMarquardtSolver`].
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LMConfig {
    /// Stop when the residual norm falls below this value.
    pub tolerance: f64,
    /// Maximum number of outer iterations.
    pub max_iterations: usize,
    /// Initial damping factor.
    pub initial_lambda: f64,
    /// Multiplier applied to lambda after a rejected step.
    pub lambda_up: f64,
    /// Multiplier applied to lambda after an accepted step.
    pub lambda_down: f64,
    /// Upper limit for lambda; reaching it ends the search.
    pub max_lambda: f64,
    /// Stop when the relative parameter step falls below this value.
    pub param_tolerance: f64,
    /// Relative bump used for the finite-difference Jacobian.
    pub finite_difference_step: f64,
}

impl Default for LMConfig {
    fn default() -> Self {
        Self {
            tolerance: 1e-10,
            max_iterations: 100,
            initial_lambda: 1e-3,
            lambda_up: 10.0,
            lambda_down: 0.1,
            max_lambda: 1e12,
            param_tolerance: 1e-10,
            finite_difference_step: 1e-7,
        }
    }
}

impl LMConfig {
    /// Relaxed tolerances.
    pub fn fast() -> Self {
        Self {
            tolerance: 1e-6,
            max_iterations: 50,
            ..Default::default()
        }
    }

    /// Tight tolerances.
    pub fn high_precision() -> Self {
        Self {
            tolerance: 1e-14,
            max_iterations: 500,
            param_tolerance: 1e-14,
            ..Default::default()
        }
    }
}

/// Inclusive box bound on one parameter.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ParameterBound {
    /// Lower bound.
    pub lower: f64,
    /// Upper bound.
    pub upper: f64,
}

impl ParameterBound {
    /// Bound `[lower, upper]`.
    pub fn new(lower: f64, upper: f64) -> Self {
        Self { lower, upper }
    }

    /// The whole real line.
    pub fn unbounded() -> Self {
        Self {
            lower: f64::NEG_INFINITY,
            upper: f64::INFINITY,
        }
    }

    /// Clamps `x` into the bound.
    #[inline]
    pub fn project(&self, x: f64) -> f64 {
        x.max(self.lower).min(self.upper)
    }
}

/// Result of a least-squares solve.
#[derive(Debug, Clone, PartialEq)]
pub struct LMResult {
    /// Final parameters.
    pub params: Vec<f64>,
    /// Final residual sum of squares.
    pub residual_ss: f64,
    /// Iterations performed.
    pub iterations: usize,
    /// Whether a stopping tolerance was met.
    pub converged: bool,
}

impl LMResult {
    /// Root-mean-square residual over `n_observations` residuals.
    pub fn rmse(&self, n_observations: usize) -> f64 {
        if n_observations == 0 {
            return 0.0;
        }
        (self.residual_ss / n_observations as f64).sqrt()
    }
}

/// Levenberg-Marquardt nonlinear least-squares solver with box constraints.
///
/// # Example
///
/// ```
/// use bgm_core::math::solvers::{LevenbergMarquardtSolver, ParameterBound};
///
/// // Fit y = a * exp(-b x), with b constrained to [0, 0.5].
/// let xs = [0.0, 1.0, 2.0, 3.0];
/// let ys: Vec<f64> = xs.iter().map(|x: &f64| 2.0 * (-0.8 * x).exp()).collect();
/// let residuals = |p: &[f64]| -> Vec<f64> {
///     xs.iter().zip(&ys).map(|(x, y)| p[0] * (-p[1] * x).exp() - y).collect()
/// };
///
/// let bounds = [ParameterBound::unbounded(), ParameterBound::new(0.0, 0.5)];
/// let result = LevenbergMarquardtSolver::with_defaults()
///     .solve_bounded(&residuals, vec![1.0, 0.1], &bounds)
///     .unwrap();
/// assert!(result.params[1] <= 0.5);
/// ```
#[derive(Debug, Clone, Default)]
pub struct LevenbergMarquardtSolver {
    config: LMConfig,
}

impl LevenbergMarquardtSolver {
    /// Creates a solver.
    pub fn new(config: LMConfig) -> Self {
        Self { config }
    }

    /// Creates a solver with default configuration.
    pub fn with_defaults() -> Self {
        Self::default()
    }

    /// Solver configuration.
    pub fn config(&self) -> &LMConfig {
        &self.config
    }

    /// Unconstrained solve.
    pub fn solve<F>(&self, residuals: F, initial: Vec<f64>) -> Result<LMResult, SolverError>
    where
        F: Fn(&[f64]) -> Vec<f64>,
    {
        let bounds = vec![ParameterBound::unbounded(); initial.len()];
        self.solve_bounded(&residuals, initial, &bounds)
    }

    /// Solve subject to per-parameter box bounds.
    ///
    /// # Errors
    ///
    /// [`SolverError::NumericalInstability`] for empty problems, mismatched
    /// bounds, or residuals that are not finite at the starting point.
    /// Running out of iterations is not an error: the result reports
    /// `converged = false` and the caller decides.
    pub fn solve_bounded<F>(
        &self,
        residuals: &F,
        initial: Vec<f64>,
        bounds: &[ParameterBound],
    ) -> Result<LMResult, SolverError>
    where
        F: Fn(&[f64]) -> Vec<f64> + ?Sized,
    {
        let n = initial.len();
        if n == 0 {
            return Err(SolverError::NumericalInstability(
                "empty parameter vector".to_string(),
            ));
        }
        if bounds.len() != n {
            return Err(SolverError::NumericalInstability(format!(
                "{} bounds supplied for {} parameters",
                bounds.len(),
                n
            )));
        }

        let mut params: Vec<f64> = initial
            .iter()
            .zip(bounds)
            .map(|(&p, b)| b.project(p))
            .collect();
        let mut r = residuals(&params);
        if r.is_empty() {
            return Err(SolverError::NumericalInstability(
                "empty residual vector".to_string(),
            ));
        }
        let mut ss = sum_of_squares(&r);
        if !ss.is_finite() {
            return Err(SolverError::NumericalInstability(
                "non-finite residuals at starting point".to_string(),
            ));
        }

        let mut lambda = self.config.initial_lambda;
        for iteration in 0..self.config.max_iterations {
            if ss.sqrt() < self.config.tolerance {
                return Ok(self.finish(params, ss, iteration, true));
            }

            let jacobian = self.jacobian(residuals, &params, &r, bounds);
            let (jtj, jtr) = normal_equations(&jacobian, &r, n);

            let mut accepted = false;
            while lambda <= self.config.max_lambda {
                let mut system = jtj.clone();
                for i in 0..n {
                    system[i * n + i] += lambda * jtj[i * n + i].max(1e-12);
                }
                let Some(step) = solve_cholesky(&system, &jtr, n) else {
                    lambda *= self.config.lambda_up;
                    continue;
                };

                let trial: Vec<f64> = params
                    .iter()
                    .zip(&step)
                    .zip(bounds)
                    .map(|((p, d), b)| b.project(p + d))
                    .collect();
                let moved = trial
                    .iter()
                    .zip(&params)
                    .map(|(t, p)| (t - p) * (t - p))
                    .sum::<f64>()
                    .sqrt();
                let scale = params.iter().map(|p| p * p).sum::<f64>().sqrt().max(1.0);
                if moved / scale < self.config.param_tolerance {
                    return Ok(self.finish(params, ss, iteration, true));
                }

                let trial_r = residuals(&trial);
                let trial_ss = sum_of_squares(&trial_r);
                if trial_ss.is_finite() && trial_ss < ss {
                    params = trial;
                    r = trial_r;
                    ss = trial_ss;
                    lambda *= self.config.lambda_down;
                    accepted = true;
                    break;
                }
                lambda *= self.config.lambda_up;
            }

            if !accepted {
                // Damping saturated without improvement: a stationary point of the box problem.
                return Ok(self.finish(params, ss, iteration, true));
            }
        }

        Ok(self.finish(params, ss, self.config.max_iterations, false))
    }

    fn finish(&self, params: Vec<f64>, residual_ss: f64, iterations: usize, converged: bool) -> LMResult {
        LMResult {
            params,
            residual_ss,
            iterations,
            converged,
        }
    }

    /// Row-major `m × n` forward-difference Jacobian; bumps downward at an upper bound.
    fn jacobian<F>(&self, residuals: &F, params: &[f64], r0: &[f64], bounds: &[ParameterBound]) -> Vec<f64>
    where
        F: Fn(&[f64]) -> Vec<f64> + ?Sized,
    {
        let n = params.len();
        let m = r0.len();
        let mut jac = vec![0.0; m * n];
        let mut bumped = params.to_vec();
        for j in 0..n {
            let mut h = self.config.finite_difference_step * params[j].abs().max(1.0);
            if params[j] + h > bounds[j].upper {
                h = -h;
            }
            bumped[j] = params[j] + h;
            let r = residuals(&bumped);
            bumped[j] = params[j];
            for i in 0..m.min(r.len()) {
                jac[i * n + j] = (r[i] - r0[i]) / h;
            }
        }
        jac
    }
}

#[inline]
fn sum_of_squares(v: &[f64]) -> f64 {
    v.iter().map(|x| x * x).sum()
}

/// Returns `(JᵀJ, −Jᵀr)` with `JᵀJ` stored row-major.
fn normal_equations(jac: &[f64], r: &[f64], n: usize) -> (Vec<f64>, Vec<f64>) {
    let m = r.len();
    let mut jtj = vec![0.0; n * n];
    let mut jtr = vec![0.0; n];
    for k in 0..m {
        let row = &jac[k * n..(k + 1) * n];
        for i in 0..n {
            jtr[i] -= row[i] * r[k];
            for j in 0..=i {
                jtj[i * n + j] += row[i] * row[j];
            }
        }
    }
    for i in 0..n {
        for j in 0..i {
            jtj[j * n + i] = jtj[i * n + j];
        }
    }
    (jtj, jtr)
}

/// Solves `A x = b` for symmetric positive-definite row-major `A`.
fn solve_cholesky(a: &[f64], b: &[f64], n: usize) -> Option<Vec<f64>> {
    let mut l = vec![0.0; n * n];
    for i in 0..n {
        for j in 0..=i {
            let mut sum = a[i * n + j];
            for k in 0..j {
                sum -= l[i * n + k] * l[j * n + k];
            }
            if i == j {
                if sum <= 0.0 || !sum.is_finite() {
                    return None;
                }
                l[i * n + i] = sum.sqrt();
            } else {
                l[i * n + j] = sum / l[j * n + j];
            }
        }
    }
    let mut y = vec![0.0; n];
    for i in 0..n {
        let s: f64 = (0..i).map(|k| l[i * n + k] * y[k]).sum();
        y[i] = (b[i] - s) / l[i * n + i];
    }
    let mut x = vec![0.0; n];
    for i in (0..n).rev() {
        let s: f64 = ((i + 1)..n).map(|k| l[k * n + i] * x[k]).sum();
        x[i] = (y[i] - s) / l[i * n + i];
    }
    Some(x)
}
