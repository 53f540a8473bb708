//! Solver configuration types.

use num_traits::Float;

use crate::types::PricingError;

/// Stopping rules for one-dimensional bracketing root finders.
///
/// A solve stops as soon as either `|f(x)| <= tolerance` or the bracket
/// half-width falls below `x_tolerance`; it fails once `max_iterations`
/// function evaluations have been spent.
///
/// # Example
///
/// ```
/// use bgm_core::math::solvers::SolverConfig;
///
/// let config: SolverConfig<f64> = SolverConfig::default();
/// assert!(config.tolerance < 1e-8);
///
/// let custom = SolverConfig::new(1e-12, 1e-14, 200).unwrap();
/// assert_eq!(custom.max_iterations, 200);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SolverConfig<T: Float> {
    /// Function-value tolerance.
    pub tolerance: T,
    /// Variable (bracket width) tolerance.
    pub x_tolerance: T,
    /// Maximum iteration count.
    pub max_iterations: usize,
}

impl<T: Float> Default for SolverConfig<T> {
    /// `tolerance = 1e-10`, `x_tolerance = 1e-12`, `max_iterations = 100`.
    fn default() -> Self {
        Self {
            tolerance: T::from(1e-10).unwrap_or_else(T::epsilon),
            x_tolerance: T::from(1e-12).unwrap_or_else(T::epsilon),
            max_iterations: 100,
        }
    }
}

impl<T: Float> SolverConfig<T> {
    /// Creates a validated configuration.
    ///
    /// # Errors
    ///
    /// Returns [`PricingError::InvalidInput`] for non-positive tolerances or a zero iteration budget.
    pub fn new(tolerance: T, x_tolerance: T, max_iterations: usize) -> Result<Self, PricingError> {
        let config = Self {
            tolerance,
            x_tolerance,
            max_iterations,
        };
        config.validate()?;
        Ok(config)
    }

    /// Checks tolerances and budget.
    pub fn validate(&self) -> Result<(), PricingError> {
        if !(self.tolerance > T::zero()) || !(self.x_tolerance > T::zero()) {
            return Err(PricingError::InvalidInput(
                "solver tolerances must be positive".to_string(),
            ));
        }
        if self.max_iterations == 0 {
            return Err(PricingError::InvalidInput(
                "solver max_iterations must be > 0".to_string(),
            ));
        }
        Ok(())
    }

    /// Tight tolerances for calibration round-trips.
    pub fn high_precision() -> Self {
        Self {
            tolerance: T::from(1e-14).unwrap_or_else(T::epsilon),
            x_tolerance: T::from(1e-15).unwrap_or_else(T::epsilon),
            max_iterations: 500,
        }
    }

    /// Loose tolerances for coarse searches.
    pub fn fast() -> Self {
        Self {
            tolerance: T::from(1e-6).unwrap_or_else(T::epsilon),
            x_tolerance: T::from(1e-8).unwrap_or_else(T::epsilon),
            max_iterations: 50,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config: SolverConfig<f64> = SolverConfig::default();
        assert!((config.tolerance - 1e-10).abs() < 1e-15);
        assert!((config.x_tolerance - 1e-12).abs() < 1e-17);
        assert_eq!(config.max_iterations, 100);
    }

    #[test]
    fn test_new_rejects_bad_values() {
        assert!(SolverConfig::new(0.0_f64, 1e-12, 10).is_err());
        assert!(SolverConfig::new(1e-10_f64, -1.0, 10).is_err());
        assert!(SolverConfig::new(1e-10_f64, 1e-12, 0).is_err());
        assert!(SolverConfig::new(f64::NAN, 1e-12, 10).is_err());
    }

    #[test]
    fn test_presets_ordering() {
        let hp: SolverConfig<f64> = SolverConfig::high_precision();
        let fast: SolverConfig<f64> = SolverConfig::fast();
        assert!(hp.tolerance < fast.tolerance);
        assert!(hp.max_iterations > fast.max_iterations);
    }
}
