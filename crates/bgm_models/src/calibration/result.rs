//! Calibration result types.
//!
//! Calibrators return a [`CalibrationResult`] wrapping the calibrated
//! parameters together with [`CalibrationDiagnostics`].

use std::time::Duration;

use super::CalibrationError;
use crate::volatility::{CorrelationStructure, ForwardVolatilityMatrix, VolatilityCurve};

/// Calibration diagnostics.
///
/// Errors are model minus market prices, one per quote that took part in the
/// fit.
#[derive(Debug, Clone)]
pub struct CalibrationDiagnostics {
    /// Number of sweeps (cascade) or optimiser iterations (piecewise)
    pub iterations: usize,
    /// Sum of squared pricing errors
    pub final_residual: f64,
    /// Root mean squared error
    pub rmse: f64,
    /// Maximum absolute error
    pub max_error: f64,
    /// Calibration duration
    pub duration: Duration,
    /// Individual errors per quote (if available)
    pub instrument_errors: Option<Vec<f64>>,
    /// Indices of quotes excluded from the fit
    pub skipped_quotes: Vec<usize>,
}

impl Default for CalibrationDiagnostics {
    fn default() -> Self {
        Self {
            iterations: 0,
            final_residual: f64::MAX,
            rmse: f64::MAX,
            max_error: f64::MAX,
            duration: Duration::ZERO,
            instrument_errors: None,
            skipped_quotes: Vec::new(),
        }
    }
}

impl CalibrationDiagnostics {
    /// Create new diagnostics with basic information.
    pub fn new(iterations: usize, duration: Duration) -> Self {
        Self {
            iterations,
            duration,
            ..Self::default()
        }
    }

    /// Set individual instrument errors; derives residual, RMSE and max error.
    pub fn with_instrument_errors(mut self, errors: Vec<f64>) -> Self {
        let sum_sq: f64 = errors.iter().map(|e| e * e).sum();
        self.final_residual = sum_sq;
        if errors.is_empty() {
            self.rmse = 0.0;
            self.max_error = 0.0;
        } else {
            self.rmse = (sum_sq / errors.len() as f64).sqrt();
            self.max_error = errors.iter().map(|e| e.abs()).fold(0.0_f64, f64::max);
        }
        self.instrument_errors = Some(errors);
        self
    }

    /// Record the quotes that were left out of the fit.
    pub fn with_skipped_quotes(mut self, skipped: Vec<usize>) -> Self {
        self.skipped_quotes = skipped;
        self
    }

    /// Check if calibration quality is acceptable.
    ///
    /// # Arguments
    ///
    /// * `tolerance` - Maximum acceptable RMSE
    pub fn is_quality_acceptable(&self, tolerance: f64) -> bool {
        self.rmse <= tolerance
    }
}

/// Calibration result.
///
/// Generic over the parameter type `P`: the cascade produces
/// [`CalibratedVolatilities`] directly, the piecewise fit a compact parameter
/// table.
#[derive(Debug, Clone)]
pub struct CalibrationResult<P> {
    /// Calibrated parameters
    pub parameters: P,
    /// Whether calibration converged successfully
    pub converged: bool,
    /// Calibration diagnostics
    pub diagnostics: CalibrationDiagnostics,
}

impl<P> CalibrationResult<P> {
    /// Create a successful calibration result.
    pub fn success(parameters: P, diagnostics: CalibrationDiagnostics) -> Self {
        Self {
            parameters,
            converged: true,
            diagnostics,
        }
    }

    /// Get the calibrated parameters.
    pub fn params(&self) -> &P {
        &self.parameters
    }

    /// Get the calibration diagnostics.
    pub fn diagnostics(&self) -> &CalibrationDiagnostics {
        &self.diagnostics
    }

    /// Get the RMSE of the calibration.
    pub fn rmse(&self) -> f64 {
        self.diagnostics.rmse
    }

    /// Map the parameter type to a different type.
    pub fn map<Q, F>(self, f: F) -> CalibrationResult<Q>
    where
        F: FnOnce(P) -> Q,
    {
        CalibrationResult {
            parameters: f(self.parameters),
            converged: self.converged,
            diagnostics: self.diagnostics,
        }
    }
}

/// Output shared by both calibration modes.
///
/// Holds the forward-volatility matrix, one piecewise-flat curve per rate
/// (consecutive equal values collapsed) and the correlation structure.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct CalibratedVolatilities {
    matrix: ForwardVolatilityMatrix,
    curves: Vec<VolatilityCurve>,
    correlation: CorrelationStructure,
}

impl CalibratedVolatilities {
    /// Derives the per-rate curves from `matrix`.
    pub fn new(
        matrix: ForwardVolatilityMatrix,
        correlation: CorrelationStructure,
    ) -> Result<Self, CalibrationError> {
        if correlation.dimension() < matrix.rate_count() {
            return Err(CalibrationError::DimensionMismatch {
                expected: matrix.rate_count(),
                got: correlation.dimension(),
                context: "correlation dimension",
            });
        }
        let curves = matrix.to_curves()?;
        Ok(Self {
            matrix,
            curves,
            correlation,
        })
    }

    /// Forward-volatility matrix `σ[i, j]`.
    pub fn matrix(&self) -> &ForwardVolatilityMatrix {
        &self.matrix
    }

    /// Piecewise-flat volatility curve per rate, ready for the lattice builder.
    pub fn curves(&self) -> &[VolatilityCurve] {
        &self.curves
    }

    /// Calibrated correlation.
    pub fn correlation(&self) -> &CorrelationStructure {
        &self.correlation
    }

    /// Black volatility of each rate to its reset, for reporting.
    pub fn black_volatilities(&self) -> Vec<f64> {
        self.matrix.black_volatility_curve()
    }

    /// Consumes the result, returning the curves.
    pub fn into_curves(self) -> Vec<VolatilityCurve> {
        self.curves
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_diagnostics_default() {
        let diag = CalibrationDiagnostics::default();
        assert_eq!(diag.iterations, 0);
        assert_eq!(diag.final_residual, f64::MAX);
        assert!(diag.skipped_quotes.is_empty());
    }

    #[test]
    fn test_diagnostics_with_instrument_errors() {
        let diag = CalibrationDiagnostics::new(1, Duration::from_millis(5))
            .with_instrument_errors(vec![0.01, -0.02, 0.03]);

        assert_relative_eq!(diag.max_error, 0.03, epsilon = 1e-15);
        assert_relative_eq!(diag.final_residual, 0.0014, epsilon = 1e-15);
        assert_relative_eq!(diag.rmse, (0.0014_f64 / 3.0).sqrt(), epsilon = 1e-15);
        assert!(diag.is_quality_acceptable(0.03));
        assert!(!diag.is_quality_acceptable(0.01));
    }

    #[test]
    fn test_diagnostics_empty_errors() {
        let diag = CalibrationDiagnostics::default().with_instrument_errors(Vec::new());
        assert_eq!(diag.rmse, 0.0);
        assert_eq!(diag.max_error, 0.0);
    }

    #[test]
    fn test_result_map() {
        let result = CalibrationResult::success(2.0_f64, CalibrationDiagnostics::default());
        let mapped = result.map(|x| x * 2.0);
        assert_eq!(*mapped.params(), 4.0);
        assert!(mapped.converged);
    }

    #[test]
    fn test_calibrated_volatilities_collapse_rows() {
        let matrix = ForwardVolatilityMatrix::from_rows(
            vec![1.0, 2.0, 3.0],
            &[vec![0.2], vec![0.2, 0.2], vec![0.3, 0.2, 0.2]],
        )
        .unwrap();
        let out = CalibratedVolatilities::new(matrix, CorrelationStructure::perfect(3)).unwrap();

        assert_eq!(out.curves().len(), 3);
        assert_eq!(out.curves()[1].vols(), &[0.2]);
        assert_eq!(out.curves()[2].vols(), &[0.3, 0.2]);
        assert_relative_eq!(out.black_volatilities()[1], 0.2, epsilon = 1e-15);
    }

    #[test]
    fn test_calibrated_volatilities_reject_small_correlation() {
        let matrix = ForwardVolatilityMatrix::flat(vec![1.0, 2.0], 0.2).unwrap();
        let err = CalibratedVolatilities::new(matrix, CorrelationStructure::perfect(1)).unwrap_err();
        assert!(matches!(err, CalibrationError::DimensionMismatch { .. }));
    }
}
