//! Interpolator trait shared by the one-dimensional methods.

use crate::types::InterpolationError;
use num_traits::Float;

/// One-dimensional interpolation over a fixed set of knots.
pub trait Interpolator<T: Float> {
    /// Value at `x`; errors outside [`domain`](Interpolator::domain).
    fn interpolate(&self, x: T) -> Result<T, InterpolationError>;

    /// Closed interval `[x_min, x_max]` covered by the knots.
    fn domain(&self) -> (T, T);

    /// Value at `x` clamped into the domain (flat extrapolation).
    fn interpolate_flat(&self, x: T) -> T {
        let (lo, hi) = self.domain();
        let clamped = x.max(lo).min(hi);
        // Clamped points are inside the domain by construction.
        self.interpolate(clamped).unwrap_or_else(|_| T::nan())
    }
}

/// Index `i` with `xs[i] <= x < xs[i + 1]`, clamped to `[0, len - 2]`.
#[inline]
pub(crate) fn segment_index<T: Float>(xs: &[T], x: T) -> usize {
    let pos = xs.partition_point(|&xi| xi <= x);
    pos.saturating_sub(1).min(xs.len().saturating_sub(2))
}

/// Checks lengths and strict monotonicity of interpolation knots.
pub(crate) fn validate_knots<T: Float>(xs: &[T], ys: &[T], need: usize) -> Result<(), InterpolationError> {
    if xs.len() != ys.len() {
        return Err(InterpolationError::InvalidInput(format!(
            "xs and ys must have same length: got {} and {}",
            xs.len(),
            ys.len()
        )));
    }
    if xs.len() < need {
        return Err(InterpolationError::InsufficientData {
            got: xs.len(),
            need,
        });
    }
    if let Some(index) = xs.windows(2).position(|w| !(w[1] > w[0])) {
        return Err(InterpolationError::NonMonotonicData { index: index + 1 });
    }
    Ok(())
}

#[inline]
pub(crate) fn out_of_bounds<T: Float>(x: T, min: T, max: T) -> InterpolationError {
    InterpolationError::OutOfBounds {
        x: x.to_f64().unwrap_or(f64::NAN),
        min: min.to_f64().unwrap_or(f64::NAN),
        max: max.to_f64().unwrap_or(f64::NAN),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_segment_index_clamps() {
        let xs = [0.0, 1.0, 2.0, 3.0];
        assert_eq!(segment_index(&xs, -1.0), 0);
        assert_eq!(segment_index(&xs, 0.0), 0);
        assert_eq!(segment_index(&xs, 1.5), 1);
        assert_eq!(segment_index(&xs, 3.0), 2);
        assert_eq!(segment_index(&xs, 9.0), 2);
    }

    #[test]
    fn test_validate_knots() {
        assert!(validate_knots(&[0.0, 1.0], &[1.0, 2.0], 2).is_ok());
        assert!(matches!(
            validate_knots(&[0.0, 0.0], &[1.0, 2.0], 2),
            Err(InterpolationError::NonMonotonicData { index: 1 })
        ));
        assert!(validate_knots(&[0.0], &[1.0], 2).is_err());
        assert!(validate_knots(&[0.0, 1.0], &[1.0], 2).is_err());
    }
}
