//! Spread search controls.

use bgm_core::math::solvers::SolverConfig;

use crate::EvaluationError;

/// Controls of [`SpreadSolver`](super::SpreadSolver).
///
/// The search scans a descending grid of shifts from `grid_start` to
/// `grid_floor`, builds an initial guess from the feasible grid prices, then
/// brackets the guess within `±window`, doubling the window up to
/// `max_widenings` times before refining.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SpreadSolverConfig {
    /// Highest candidate shift
    pub grid_start: f64,
    /// Distance between candidate shifts
    pub grid_step: f64,
    /// Lowest candidate shift
    pub grid_floor: f64,
    /// Initial half-width of the bracket around the guess
    pub window: f64,
    /// Bracket doublings before giving up
    pub max_widenings: usize,
    /// Bisection steps locating the feasibility boundary
    pub feasibility_iterations: usize,
    /// Refinement solver settings
    pub solver: SolverConfig<f64>,
}

impl Default for SpreadSolverConfig {
    fn default() -> Self {
        Self {
            grid_start: 0.10,
            grid_step: 0.01,
            grid_floor: -0.05,
            window: 0.0025,
            max_widenings: 6,
            feasibility_iterations: 40,
            solver: SolverConfig::default(),
        }
    }
}

impl SpreadSolverConfig {
    /// Checks grid geometry and window.
    pub fn validate(&self) -> Result<(), EvaluationError> {
        if !(self.grid_step > 0.0) {
            return Err(EvaluationError::InvalidInput(format!(
                "grid step must be positive, got {}",
                self.grid_step
            )));
        }
        if !(self.grid_start >= self.grid_floor) {
            return Err(EvaluationError::InvalidInput(format!(
                "grid start {} below grid floor {}",
                self.grid_start, self.grid_floor
            )));
        }
        if !(self.window > 0.0) {
            return Err(EvaluationError::InvalidInput(format!(
                "bracket window must be positive, got {}",
                self.window
            )));
        }
        Ok(())
    }

    /// Descending candidate shifts, never below `lower_bound`.
    pub(crate) fn candidates(&self, lower_bound: Option<f64>) -> Vec<f64> {
        let bound = lower_bound.unwrap_or(f64::NEG_INFINITY);
        let floor = self.grid_floor.max(bound);
        let start = self.grid_start.max(floor);
        let mut shifts = Vec::new();
        let mut k = 0;
        loop {
            let s = start - k as f64 * self.grid_step;
            if s < floor - 1e-12 {
                break;
            }
            shifts.push(s);
            k += 1;
        }
        if shifts.last().is_some_and(|&last| last - floor > 1e-12) {
            shifts.push(floor);
        }
        shifts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_default_grid() {
        let shifts = SpreadSolverConfig::default().candidates(None);
        assert_eq!(shifts.len(), 16);
        assert_relative_eq!(shifts[0], 0.10);
        assert_relative_eq!(shifts[15], -0.05, epsilon = 1e-12);
        assert!(shifts.windows(2).all(|w| w[1] < w[0]));
    }

    #[test]
    fn test_grid_respects_lower_bound() {
        let shifts = SpreadSolverConfig::default().candidates(Some(-0.013));
        assert_eq!(*shifts.last().unwrap(), -0.013);
        assert!(shifts.iter().all(|&s| s >= -0.013));

        let above = SpreadSolverConfig::default().candidates(Some(0.2));
        assert_eq!(above, vec![0.2]);
    }

    #[test]
    fn test_validation() {
        assert!(SpreadSolverConfig::default().validate().is_ok());
        let bad = SpreadSolverConfig {
            grid_step: 0.0,
            ..Default::default()
        };
        assert!(bad.validate().is_err());
    }
}
