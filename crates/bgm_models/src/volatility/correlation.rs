//! Instantaneous forward-rate correlation.

use bgm_core::types::PricingError;

/// Parametric correlation
/// `ρ(Ti, Tj) = ρ∞ + (1 − ρ∞)·exp(−β·|Ti − Tj|·exp(−α·min(Ti, Tj)))`.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ExponentialCorrelation {
    /// Long-term level `ρ∞`.
    pub long_term: f64,
    /// Decay speed `β`.
    pub beta: f64,
    /// Maturity damping `α`.
    pub alpha: f64,
}

impl ExponentialCorrelation {
    /// Creates a validated parameter set.
    pub fn new(long_term: f64, beta: f64, alpha: f64) -> Result<Self, PricingError> {
        let params = Self {
            long_term,
            beta,
            alpha,
        };
        params.validate()?;
        Ok(params)
    }

    /// `ρ∞ ∈ [0, 1]`, `β >= 0`, `α` finite.
    pub fn validate(&self) -> Result<(), PricingError> {
        if !(0.0..=1.0).contains(&self.long_term) {
            return Err(PricingError::InvalidInput(format!(
                "long-term correlation must lie in [0, 1], got {}",
                self.long_term
            )));
        }
        if !(self.beta >= 0.0) || !self.beta.is_finite() || !self.alpha.is_finite() {
            return Err(PricingError::InvalidInput(format!(
                "correlation decay parameters must be finite with beta >= 0, got beta={} alpha={}",
                self.beta, self.alpha
            )));
        }
        Ok(())
    }

    /// Correlation between rates resetting at `ti` and `tj`.
    #[inline]
    pub fn correlation(&self, ti: f64, tj: f64) -> f64 {
        let decay = self.beta * (ti - tj).abs() * (-self.alpha * ti.min(tj)).exp();
        self.long_term + (1.0 - self.long_term) * (-decay).exp()
    }
}

/// Correlation matrix across the live forward rates.
///
/// # Example
///
/// ```
/// use bgm_models::volatility::{CorrelationStructure, ExponentialCorrelation};
///
/// let params = ExponentialCorrelation::new(0.3, 0.1, 0.0).unwrap();
/// let corr = CorrelationStructure::exponential(params, &[1.0, 2.0, 3.0]).unwrap();
/// assert_eq!(corr.correlation(1, 1), 1.0);
/// assert!(corr.correlation(0, 2) < corr.correlation(0, 1));
///
/// let tail = corr.shrink_to(1);
/// assert_eq!(tail.dimension(), 2);
/// assert_eq!(tail.correlation(0, 1), corr.correlation(1, 2));
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CorrelationStructure {
    dimension: usize,
    values: Vec<f64>,
    generator: Option<ExponentialCorrelation>,
}

const SYMMETRY_TOLERANCE: f64 = 1e-12;
const PSD_TOLERANCE: f64 = 1e-10;

impl CorrelationStructure {
    /// All `n` rates perfectly correlated.
    pub fn perfect(n: usize) -> Self {
        Self {
            dimension: n,
            values: vec![1.0; n * n],
            generator: None,
        }
    }

    /// Matrix generated from `params` at the given reset times.
    pub fn exponential(params: ExponentialCorrelation, times: &[f64]) -> Result<Self, PricingError> {
        params.validate()?;
        let n = times.len();
        let mut values = Vec::with_capacity(n * n);
        for &ti in times {
            for &tj in times {
                values.push(params.correlation(ti, tj));
            }
        }
        Ok(Self {
            dimension: n,
            values,
            generator: Some(params),
        })
    }

    /// Explicit matrix; must be square, symmetric, unit-diagonal, bounded by one
    /// and positive semi-definite.
    pub fn from_rows(rows: &[Vec<f64>]) -> Result<Self, PricingError> {
        let n = rows.len();
        if rows.iter().any(|r| r.len() != n) {
            return Err(PricingError::InvalidInput(
                "correlation matrix must be square".to_string(),
            ));
        }
        let values: Vec<f64> = rows.iter().flatten().copied().collect();
        for i in 0..n {
            if (values[i * n + i] - 1.0).abs() > SYMMETRY_TOLERANCE {
                return Err(PricingError::InvalidInput(format!(
                    "correlation diagonal {i} must be 1, got {}",
                    values[i * n + i]
                )));
            }
            for j in 0..i {
                let (a, b) = (values[i * n + j], values[j * n + i]);
                if (a - b).abs() > SYMMETRY_TOLERANCE {
                    return Err(PricingError::InvalidInput(format!(
                        "correlation matrix not symmetric at ({i}, {j})"
                    )));
                }
                if !(a.abs() <= 1.0) {
                    return Err(PricingError::InvalidInput(format!(
                        "correlation ({i}, {j}) = {a} outside [-1, 1]"
                    )));
                }
            }
        }
        let structure = Self {
            dimension: n,
            values,
            generator: None,
        };
        if !structure.is_positive_semidefinite() {
            return Err(PricingError::InvalidInput(
                "correlation matrix is not positive semi-definite".to_string(),
            ));
        }
        Ok(structure)
    }

    /// Number of rates.
    #[inline]
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Generating parameters, when the matrix is parametric.
    pub fn generator(&self) -> Option<ExponentialCorrelation> {
        self.generator
    }

    /// `ρ[i, j]`.
    #[inline]
    pub fn correlation(&self, i: usize, j: usize) -> f64 {
        self.values[i * self.dimension + j]
    }

    /// Row-major copy.
    pub fn to_rows(&self) -> Vec<Vec<f64>> {
        self.values
            .chunks(self.dimension.max(1))
            .take(self.dimension)
            .map(<[f64]>::to_vec)
            .collect()
    }

    /// Sub-matrix of the rates `first..`, used once earlier rates have reset.
    pub fn shrink_to(&self, first: usize) -> Self {
        let n = self.dimension;
        let first = first.min(n);
        let m = n - first;
        let mut values = Vec::with_capacity(m * m);
        for i in first..n {
            values.extend_from_slice(&self.values[i * n + first..(i + 1) * n]);
        }
        Self {
            dimension: m,
            values,
            generator: self.generator,
        }
    }

    /// Cholesky test with a small tolerance on the pivots.
    pub fn is_positive_semidefinite(&self) -> bool {
        let n = self.dimension;
        let mut l = vec![0.0; n * n];
        for i in 0..n {
            for j in 0..=i {
                let mut sum = self.values[i * n + j];
                for k in 0..j {
                    sum -= l[i * n + k] * l[j * n + k];
                }
                if i == j {
                    if sum < -PSD_TOLERANCE {
                        return false;
                    }
                    l[i * n + i] = sum.max(0.0).sqrt();
                } else if l[j * n + j] > PSD_TOLERANCE {
                    l[i * n + j] = sum / l[j * n + j];
                } else if sum.abs() > PSD_TOLERANCE.sqrt() {
                    return false;
                }
            }
        }
        true
    }
}
