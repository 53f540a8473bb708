//! Piecewise-flat instantaneous volatility of a single forward rate.

use bgm_core::types::PricingError;

/// Instantaneous volatility `σ(t)` of one forward rate.
///
/// Segment `k` covers `(ends[k-1], ends[k]]` with `ends[-1] = 0`. Past the
/// last end (the rate's reset) the volatility is zero.
///
/// # Example
///
/// ```
/// use bgm_models::volatility::VolatilityCurve;
///
/// let curve = VolatilityCurve::new(vec![1.0, 2.0], vec![0.2, 0.1]).unwrap();
/// assert_eq!(curve.volatility(0.5), 0.2);
/// assert_eq!(curve.volatility(1.5), 0.1);
/// assert_eq!(curve.volatility(2.5), 0.0);
/// assert!((curve.integrated_variance(0.0, 2.0) - 0.05).abs() < 1e-15);
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct VolatilityCurve {
    ends: Vec<f64>,
    vols: Vec<f64>,
}

impl VolatilityCurve {
    /// Builds the curve from segment end times and volatilities.
    ///
    /// # Errors
    ///
    /// Mismatched lengths, non-increasing or negative ends, negative or
    /// non-finite volatilities.
    pub fn new(ends: Vec<f64>, vols: Vec<f64>) -> Result<Self, PricingError> {
        if ends.is_empty() || ends.len() != vols.len() {
            return Err(PricingError::InvalidInput(format!(
                "volatility curve needs matching non-empty ends and vols, got {} and {}",
                ends.len(),
                vols.len()
            )));
        }
        let mut prev = 0.0;
        for (k, &t) in ends.iter().enumerate() {
            let ok = if k == 0 { t >= prev } else { t > prev };
            if !ok || !t.is_finite() {
                return Err(PricingError::InvalidInput(format!(
                    "volatility segment end {k} out of order: {t}"
                )));
            }
            prev = t;
        }
        if let Some(&v) = vols.iter().find(|&&v| !(v >= 0.0) || !v.is_finite()) {
            return Err(PricingError::InvalidInput(format!(
                "volatility must be finite and non-negative, got {v}"
            )));
        }
        Ok(Self { ends, vols })
    }

    /// Constant `sigma` up to `reset`.
    pub fn flat(sigma: f64, reset: f64) -> Result<Self, PricingError> {
        Self::new(vec![reset], vec![sigma])
    }

    /// Walks a forward-volatility row left to right, merging consecutive
    /// equal values into one segment.
    pub fn from_row(period_ends: &[f64], row: &[f64]) -> Result<Self, PricingError> {
        if row.is_empty() || row.len() > period_ends.len() {
            return Err(PricingError::InvalidInput(format!(
                "row of length {} does not fit {} periods",
                row.len(),
                period_ends.len()
            )));
        }
        let mut ends: Vec<f64> = Vec::with_capacity(row.len());
        let mut vols: Vec<f64> = Vec::with_capacity(row.len());
        for (&end, &v) in period_ends.iter().zip(row) {
            match vols.last() {
                Some(&last) if last == v => {
                    if let Some(e) = ends.last_mut() {
                        *e = end;
                    }
                }
                _ => {
                    ends.push(end);
                    vols.push(v);
                }
            }
        }
        Self::new(ends, vols)
    }

    /// Segment ends.
    #[inline]
    pub fn ends(&self) -> &[f64] {
        &self.ends
    }

    /// Segment volatilities.
    #[inline]
    pub fn vols(&self) -> &[f64] {
        &self.vols
    }

    /// Time after which the volatility is zero.
    #[inline]
    pub fn reset_time(&self) -> f64 {
        self.ends[self.ends.len() - 1]
    }

    /// `σ(t)`.
    pub fn volatility(&self, t: f64) -> f64 {
        match self.ends.iter().position(|&e| t <= e) {
            Some(k) => self.vols[k],
            None => 0.0,
        }
    }

    /// `∫_{t1}^{t2} σ(u)² du`, zero past the reset.
    pub fn integrated_variance(&self, t1: f64, t2: f64) -> f64 {
        if t2 <= t1 {
            return 0.0;
        }
        let mut start: f64 = 0.0;
        let mut acc = 0.0;
        for (&end, &v) in self.ends.iter().zip(&self.vols) {
            let lo = start.max(t1);
            let hi = end.min(t2);
            if hi > lo {
                acc += v * v * (hi - lo);
            }
            if end >= t2 {
                break;
            }
            start = end;
        }
        acc
    }

    /// True when every segment is zero.
    pub fn is_zero(&self) -> bool {
        self.vols.iter().all(|&v| v == 0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_from_row_collapses_equal_values() {
        let curve = VolatilityCurve::from_row(&[1.0, 2.0, 3.0, 4.0], &[0.2, 0.2, 0.15, 0.15]).unwrap();
        assert_eq!(curve.ends(), &[2.0, 4.0]);
        assert_eq!(curve.vols(), &[0.2, 0.15]);
    }

    #[test]
    fn test_from_shorter_row() {
        let curve = VolatilityCurve::from_row(&[1.0, 2.0, 3.0], &[0.2, 0.1]).unwrap();
        assert_eq!(curve.reset_time(), 2.0);
    }

    #[test]
    fn test_integrated_variance_partial() {
        let curve = VolatilityCurve::new(vec![1.0, 3.0], vec![0.2, 0.1]).unwrap();
        assert_relative_eq!(curve.integrated_variance(0.5, 2.0), 0.04 * 0.5 + 0.01, epsilon = 1e-15);
        assert_relative_eq!(curve.integrated_variance(0.0, 10.0), 0.04 + 0.02, epsilon = 1e-15);
        assert_eq!(curve.integrated_variance(2.0, 1.0), 0.0);
    }

    #[test]
    fn test_zero_length_first_segment() {
        let curve = VolatilityCurve::new(vec![0.0, 1.0], vec![0.5, 0.2]).unwrap();
        assert_relative_eq!(curve.integrated_variance(0.0, 1.0), 0.04, epsilon = 1e-15);
    }

    #[test]
    fn test_invalid_curves() {
        assert!(VolatilityCurve::new(vec![], vec![]).is_err());
        assert!(VolatilityCurve::new(vec![2.0, 1.0], vec![0.1, 0.1]).is_err());
        assert!(VolatilityCurve::new(vec![1.0], vec![-0.1]).is_err());
        assert!(VolatilityCurve::flat(0.0, 1.0).unwrap().is_zero());
    }
}
