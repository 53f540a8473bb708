//! Grid, interpolate, bracket, refine.

use bgm_core::math::interpolators::{Interpolator, MonotonicInterpolator};
use bgm_core::math::solvers::{BrentSolver, RootFinder};
use bgm_core::types::PricingError;
use tracing::{debug, info, warn};

use super::SpreadSolverConfig;
use crate::EvaluationError;

/// Price of the instrument as a function of a parallel shift.
pub type SpreadObjective<'a> = dyn FnMut(f64) -> Result<f64, EvaluationError> + 'a;

/// Outcome of a spread solve.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SpreadSolution {
    /// Shift reproducing the target price
    pub spread: f64,
    /// Model price at `spread`
    pub model_price: f64,
    /// Price that was matched
    pub target_price: f64,
    /// `model_price − target_price`
    pub residual: f64,
    /// Number of pricing calls made
    pub evaluations: usize,
    /// Interpolated starting point
    pub initial_guess: f64,
    /// Smallest shift the search was allowed to try
    pub lower_bound: Option<f64>,
}

/// Evaluation bookkeeping around the user objective.
struct Probe<'o, 'a> {
    objective: &'o mut SpreadObjective<'a>,
    target: f64,
    evaluations: usize,
    best: Option<(f64, f64)>,
}

impl Probe<'_, '_> {
    /// Signed price error at `shift`.
    fn residual(&mut self, shift: f64) -> Result<f64, EvaluationError> {
        self.evaluations += 1;
        let price = (self.objective)(shift)?;
        let residual = price - self.target;
        if self.best.map_or(true, |(_, r)| residual.abs() < r.abs()) {
            self.best = Some((shift, residual));
        }
        Ok(residual)
    }

    fn non_convergence(&self, message: String) -> EvaluationError {
        let (best_estimate, residual) = self.best.unwrap_or((f64::NAN, f64::INFINITY));
        EvaluationError::NonConvergence {
            message,
            best_estimate,
            achieved_tolerance: residual.abs(),
        }
    }
}

/// Finds the parallel shift at which a pricing function hits a target.
///
/// Prices are assumed monotone in the shift. Shifts whose pricing reports an
/// infeasible curve are skipped, and the first feasible-to-infeasible
/// transition along the grid is refined by bisection so the guess can sit
/// right at the feasibility boundary.
///
/// # Example
///
/// ```
/// use bgm_pricing::spread::SpreadSolver;
/// use bgm_pricing::EvaluationError;
///
/// let solver = SpreadSolver::default();
/// let mut price = |s: f64| Ok::<_, EvaluationError>(100.0 * (-5.0 * s).exp());
/// let solution = solver.solve(&mut price, 95.0, None).unwrap();
///
/// assert!((solution.spread - (100.0_f64 / 95.0).ln() / 5.0).abs() < 1e-9);
/// ```
#[derive(Debug, Clone)]
pub struct SpreadSolver<R = BrentSolver<f64>> {
    config: SpreadSolverConfig,
    root_finder: R,
}

impl Default for SpreadSolver {
    fn default() -> Self {
        Self::new(SpreadSolverConfig::default())
    }
}

impl SpreadSolver {
    /// Solver refining with Brent's method.
    pub fn new(config: SpreadSolverConfig) -> Self {
        Self {
            root_finder: BrentSolver::new(config.solver),
            config,
        }
    }
}

impl<R: RootFinder> SpreadSolver<R> {
    /// Solver with an injected refinement root finder.
    pub fn with_root_finder(config: SpreadSolverConfig, root_finder: R) -> Self {
        Self {
            config,
            root_finder,
        }
    }

    /// Search configuration.
    pub fn config(&self) -> &SpreadSolverConfig {
        &self.config
    }

    /// Shift `s ≥ lower_bound` with `objective(s) = target`.
    ///
    /// # Errors
    ///
    /// - [`EvaluationError::CannotFindFeasibleQuote`] when no grid shift prices
    /// - [`EvaluationError::NonConvergence`] when no bracket is found within
    ///   the allowed widenings, carrying the best shift seen
    /// - any non-infeasibility error raised by `objective`
    #[tracing::instrument(skip_all, fields(target_price = target))]
    pub fn solve(
        &self,
        objective: &mut SpreadObjective<'_>,
        target: f64,
        lower_bound: Option<f64>,
    ) -> Result<SpreadSolution, EvaluationError> {
        self.config.validate()?;
        if !target.is_finite() {
            return Err(EvaluationError::InvalidInput(format!(
                "target price must be finite, got {target}"
            )));
        }
        let mut probe = Probe {
            objective,
            target,
            evaluations: 0,
            best: None,
        };

        let candidates = self.config.candidates(lower_bound);
        let (points, feasible_floor) = self.scan(&mut probe, &candidates)?;
        if points.is_empty() {
            return Err(EvaluationError::CannotFindFeasibleQuote {
                candidates: candidates.len(),
            });
        }

        let guess = initial_guess(&points);
        let floor = match (lower_bound, feasible_floor) {
            (Some(b), Some(f)) => Some(b.max(f)),
            (b, f) => b.or(f),
        };
        let guess = floor.map_or(guess, |f| guess.max(f));
        debug!(guess, feasible = points.len(), "spread grid scanned");

        let (lo, hi) = self.bracket(&mut probe, guess, floor)?;
        let spread = if lo == hi {
            lo
        } else {
            let result = self.root_finder.find_root(
                &mut |s| probe.residual(s).map_err(PricingError::from),
                lo,
                hi,
            );
            result.map_err(EvaluationError::from)?
        };
        let residual = probe.residual(spread)?;

        info!(
            spread,
            residual,
            evaluations = probe.evaluations,
            "spread solved"
        );
        Ok(SpreadSolution {
            spread,
            model_price: target + residual,
            target_price: target,
            residual,
            evaluations: probe.evaluations,
            initial_guess: guess,
            lower_bound,
        })
    }

    /// Prices every candidate until the first infeasible shift below a
    /// feasible one, then bisects for the boundary.
    ///
    /// Returns the `(shift, residual)` points and the lowest feasible shift
    /// when a boundary was found.
    fn scan(
        &self,
        probe: &mut Probe<'_, '_>,
        candidates: &[f64],
    ) -> Result<(Vec<(f64, f64)>, Option<f64>), EvaluationError> {
        let mut points = Vec::with_capacity(candidates.len());
        for &shift in candidates {
            match probe.residual(shift) {
                Ok(r) => points.push((shift, r)),
                Err(e) if e.is_infeasible() => {
                    if let Some(&(feasible, _)) = points.last() {
                        let (boundary, residual) = self.boundary(probe, feasible, shift)?;
                        if boundary < feasible {
                            points.push((boundary, residual));
                        }
                        return Ok((points, Some(boundary)));
                    }
                    debug!(shift, "infeasible grid shift");
                }
                Err(e) => return Err(e),
            }
        }
        Ok((points, None))
    }

    /// Bisection between a feasible and an infeasible shift.
    fn boundary(
        &self,
        probe: &mut Probe<'_, '_>,
        mut feasible: f64,
        mut infeasible: f64,
    ) -> Result<(f64, f64), EvaluationError> {
        let mut residual = probe.residual(feasible)?;
        for _ in 0..self.config.feasibility_iterations {
            let mid = 0.5 * (feasible + infeasible);
            match probe.residual(mid) {
                Ok(r) => {
                    feasible = mid;
                    residual = r;
                }
                Err(e) if e.is_infeasible() => infeasible = mid,
                Err(e) => return Err(e),
            }
        }
        debug!(boundary = feasible, "feasibility boundary located");
        Ok((feasible, residual))
    }

    /// Bracket `[lo, hi]` around `guess` with a sign change in the residual.
    fn bracket(
        &self,
        probe: &mut Probe<'_, '_>,
        guess: f64,
        floor: Option<f64>,
    ) -> Result<(f64, f64), EvaluationError> {
        let at_guess = probe.residual(guess)?;
        if at_guess.abs() <= self.config.solver.tolerance {
            return Ok((guess, guess));
        }
        let mut window = self.config.window;
        for widening in 0..=self.config.max_widenings {
            let lo = floor.map_or(guess - window, |f| (guess - window).max(f));
            let hi = guess + window;
            let f_lo = probe.residual(lo)?;
            let f_hi = probe.residual(hi)?;
            if f_lo * at_guess <= 0.0 {
                return Ok((lo, guess));
            }
            if f_hi * at_guess <= 0.0 {
                return Ok((guess, hi));
            }
            debug!(widening, window, "widening spread bracket");
            window *= 2.0;
        }
        warn!(guess, "no sign change around the interpolated spread");
        Err(probe.non_convergence(format!(
            "no bracket within ±{} of the initial guess {guess}",
            window / 2.0
        )))
    }
}

/// Interpolates the shift matching a zero residual from the grid points.
fn initial_guess(points: &[(f64, f64)]) -> f64 {
    let mut sorted: Vec<(f64, f64)> = points.to_vec();
    sorted.sort_by(|a, b| a.1.total_cmp(&b.1));
    sorted.dedup_by(|b, a| b.1 <= a.1);
    let nearest = sorted
        .iter()
        .min_by(|a, b| a.1.abs().total_cmp(&b.1.abs()))
        .map_or(0.0, |p| p.0);
    if sorted.len() < 2 {
        return nearest;
    }
    let residuals: Vec<f64> = sorted.iter().map(|p| p.1).collect();
    let shifts: Vec<f64> = sorted.iter().map(|p| p.0).collect();
    match MonotonicInterpolator::new(&residuals, &shifts) {
        Ok(interp) => interp.interpolate_flat(0.0),
        Err(_) => nearest,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn bond(s: f64) -> f64 {
        (1..=5).map(|t| 5.0 * (-(0.03 + s) * t as f64).exp()).sum::<f64>()
            + 100.0 * (-(0.03 + s) * 5.0).exp()
    }

    // ========================================
    // Happy path
    // ========================================

    #[test]
    fn test_recovers_known_spread() {
        let solver = SpreadSolver::default();
        let target = bond(0.0123);
        let solution = solver.solve(&mut |s| Ok(bond(s)), target, None).unwrap();
        assert_relative_eq!(solution.spread, 0.0123, epsilon = 1e-9);
        assert!(solution.residual.abs() < 1e-8);
        assert_eq!(solution.target_price, target);
        assert!(solution.evaluations > 16);
    }

    #[test]
    fn test_guess_outside_grid_is_widened() {
        let solver = SpreadSolver::default();
        let target = bond(0.15);
        let solution = solver.solve(&mut |s| Ok(bond(s)), target, None).unwrap();
        assert_relative_eq!(solution.spread, 0.15, epsilon = 1e-9);
    }

    // ========================================
    // Feasibility
    // ========================================

    #[test]
    fn test_infeasible_region_is_skipped() {
        let solver = SpreadSolver::default();
        let mut priced = |s: f64| {
            if s < -0.02 {
                Err(EvaluationError::InfeasibleQuote(format!("shift {s}")))
            } else {
                Ok(bond(s))
            }
        };
        let target = bond(-0.015);
        let solution = solver.solve(&mut priced, target, None).unwrap();
        assert_relative_eq!(solution.spread, -0.015, epsilon = 1e-9);
    }

    #[test]
    fn test_target_beyond_boundary_fails_with_best_estimate() {
        let solver = SpreadSolver::default();
        let mut priced = |s: f64| {
            if s < -0.02 {
                Err(EvaluationError::InfeasibleQuote(format!("shift {s}")))
            } else {
                Ok(bond(s))
            }
        };
        let err = solver.solve(&mut priced, bond(-0.04), None).unwrap_err();
        match err {
            EvaluationError::NonConvergence { best_estimate, .. } => {
                assert!(best_estimate >= -0.02 - 1e-9);
                assert!(best_estimate < -0.019);
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_nothing_feasible() {
        let solver = SpreadSolver::default();
        let mut priced =
            |_: f64| -> Result<f64, EvaluationError> { Err(EvaluationError::InfeasibleQuote("all".into())) };
        let err = solver.solve(&mut priced, 100.0, None).unwrap_err();
        assert!(matches!(err, EvaluationError::CannotFindFeasibleQuote { candidates: 16 }));
    }

    #[test]
    fn test_other_errors_propagate() {
        let solver = SpreadSolver::default();
        let mut priced =
            |_: f64| -> Result<f64, EvaluationError> { Err(EvaluationError::EmptyCashflow) };
        let err = solver.solve(&mut priced, 100.0, None).unwrap_err();
        assert!(matches!(err, EvaluationError::EmptyCashflow));
    }

    #[test]
    fn test_lower_bound_is_respected() {
        let solver = SpreadSolver::default();
        let mut lowest = f64::INFINITY;
        let target = bond(0.001);
        let solution = solver
            .solve(
                &mut |s| {
                    lowest = lowest.min(s);
                    Ok(bond(s))
                },
                target,
                Some(-0.003),
            )
            .unwrap();
        assert_relative_eq!(solution.spread, 0.001, epsilon = 1e-9);
        assert!(lowest >= -0.003);
        assert_eq!(solution.lower_bound, Some(-0.003));
    }

    #[test]
    fn test_initial_guess_interpolates() {
        let points = [(0.02, -3.0), (0.01, -1.0), (0.0, 1.0)];
        let guess = initial_guess(&points);
        assert!(guess > 0.0 && guess < 0.01);
        assert_eq!(initial_guess(&[(0.04, 2.0)]), 0.04);
    }
}
