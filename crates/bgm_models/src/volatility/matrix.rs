//! Lower-triangular forward-volatility matrix.

use bgm_core::types::PricingError;

use super::VolatilityCurve;

/// `σ[i, j]`: volatility of rate `i` over period `j`, defined for `j <= i`.
///
/// Period `j` is `(T_{j-1}, T_j]` with `T_{-1} = 0`, where `T_j` are the reset
/// dates. Storage is a packed lower triangle.
///
/// # Example
///
/// ```
/// use bgm_models::volatility::ForwardVolatilityMatrix;
///
/// let mut m = ForwardVolatilityMatrix::flat(vec![1.0, 2.0], 0.2).unwrap();
/// m.set(1, 1, 0.1).unwrap();
/// assert_eq!(m.get(1, 0), Some(0.2));
/// assert_eq!(m.get(0, 1), None);
///
/// // sqrt((0.04 · 1 + 0.01 · 1) / 2)
/// assert!((m.black_volatility(1) - 0.025_f64.sqrt()).abs() < 1e-15);
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ForwardVolatilityMatrix {
    period_ends: Vec<f64>,
    values: Vec<f64>,
}

#[inline]
fn packed(i: usize, j: usize) -> usize {
    i * (i + 1) / 2 + j
}

impl ForwardVolatilityMatrix {
    /// Matrix over reset dates `period_ends` filled with `sigma`.
    pub fn flat(period_ends: Vec<f64>, sigma: f64) -> Result<Self, PricingError> {
        validate_ends(&period_ends)?;
        let n = period_ends.len();
        Ok(Self {
            period_ends,
            values: vec![sigma; n * (n + 1) / 2],
        })
    }

    /// Matrix from explicit rows; row `i` must have `i + 1` entries.
    pub fn from_rows(period_ends: Vec<f64>, rows: &[Vec<f64>]) -> Result<Self, PricingError> {
        validate_ends(&period_ends)?;
        if rows.len() != period_ends.len() {
            return Err(PricingError::InvalidInput(format!(
                "{} rows for {} rates",
                rows.len(),
                period_ends.len()
            )));
        }
        let mut values = Vec::with_capacity(rows.len() * (rows.len() + 1) / 2);
        for (i, row) in rows.iter().enumerate() {
            if row.len() != i + 1 {
                return Err(PricingError::InvalidInput(format!(
                    "row {} has {} entries, expected {}",
                    i,
                    row.len(),
                    i + 1
                )));
            }
            values.extend_from_slice(row);
        }
        Ok(Self {
            period_ends,
            values,
        })
    }

    /// Number of rates (and periods).
    #[inline]
    pub fn rate_count(&self) -> usize {
        self.period_ends.len()
    }

    /// Reset dates bounding the periods.
    #[inline]
    pub fn period_ends(&self) -> &[f64] {
        &self.period_ends
    }

    /// Length of period `j`.
    #[inline]
    pub fn period_length(&self, j: usize) -> f64 {
        let start = if j == 0 { 0.0 } else { self.period_ends[j - 1] };
        self.period_ends[j] - start
    }

    /// `σ[i, j]` or `None` above the diagonal or out of range.
    #[inline]
    pub fn get(&self, i: usize, j: usize) -> Option<f64> {
        (i < self.rate_count() && j <= i).then(|| self.values[packed(i, j)])
    }

    /// Writes `σ[i, j]`.
    pub fn set(&mut self, i: usize, j: usize, sigma: f64) -> Result<(), PricingError> {
        if i >= self.rate_count() || j > i {
            return Err(PricingError::InvalidInput(format!(
                "entry ({i}, {j}) outside the lower triangle of a {}-rate matrix",
                self.rate_count()
            )));
        }
        if !(sigma >= 0.0) || !sigma.is_finite() {
            return Err(PricingError::InvalidInput(format!(
                "volatility must be finite and non-negative, got {sigma}"
            )));
        }
        self.values[packed(i, j)] = sigma;
        Ok(())
    }

    /// Row `i`: periods `0..=i`.
    #[inline]
    pub fn row(&self, i: usize) -> &[f64] {
        &self.values[packed(i, 0)..packed(i, i) + 1]
    }

    /// `Σ_{j <= min(i, last_period)} σ[i, j]² Δ_j`.
    pub fn integrated_variance(&self, i: usize, last_period: usize) -> f64 {
        let top = i.min(last_period);
        (0..=top)
            .map(|j| {
                let s = self.values[packed(i, j)];
                s * s * self.period_length(j)
            })
            .sum()
    }

    /// Black volatility of rate `i`: `sqrt(Σ σ² Δt / T_i)`.
    pub fn black_volatility(&self, i: usize) -> f64 {
        let t = self.period_ends[i];
        if t <= 0.0 {
            return self.values[packed(i, i)];
        }
        (self.integrated_variance(i, i) / t).sqrt()
    }

    /// Black volatility of every rate.
    pub fn black_volatility_curve(&self) -> Vec<f64> {
        (0..self.rate_count()).map(|i| self.black_volatility(i)).collect()
    }

    /// One collapsed piecewise-flat curve per rate.
    pub fn to_curves(&self) -> Result<Vec<VolatilityCurve>, PricingError> {
        (0..self.rate_count())
            .map(|i| VolatilityCurve::from_row(&self.period_ends, self.row(i)))
            .collect()
    }

    /// Largest absolute entry difference against another matrix of the same shape.
    pub fn max_abs_difference(&self, other: &Self) -> f64 {
        self.values
            .iter()
            .zip(&other.values)
            .map(|(a, b)| (a - b).abs())
            .fold(0.0, f64::max)
    }
}

fn validate_ends(ends: &[f64]) -> Result<(), PricingError> {
    if ends.is_empty() {
        return Err(PricingError::InvalidInput(
            "forward-volatility matrix needs at least one rate".to_string(),
        ));
    }
    if !(ends[0] >= 0.0) {
        return Err(PricingError::InvalidInput(format!(
            "first reset must not precede valuation, got {}",
            ends[0]
        )));
    }
    if let Some(i) = ends.windows(2).position(|w| !(w[1] > w[0])) {
        return Err(PricingError::InvalidInput(format!(
            "tenor out of order at index {}",
            i + 1
        )));
    }
    Ok(())
}
