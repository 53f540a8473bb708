//! Piecewise linear interpolation.

use super::traits::{out_of_bounds, segment_index, validate_knots};
use super::Interpolator;
use crate::types::InterpolationError;
use num_traits::Float;

/// Piecewise linear interpolator over strictly increasing knots.
///
/// # Example
///
/// ```
/// use bgm_core::math::interpolators::{Interpolator, LinearInterpolator};
///
/// let interp: LinearInterpolator<f64> = LinearInterpolator::new(&[1.0, 2.0, 5.0], &[0.20, 0.22, 0.19]).unwrap();
/// assert!((interp.interpolate(1.5).unwrap() - 0.21).abs() < 1e-12);
/// assert_eq!(interp.interpolate_flat(10.0), 0.19);
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LinearInterpolator<T: Float> {
    xs: Vec<T>,
    ys: Vec<T>,
}

impl<T: Float> LinearInterpolator<T> {
    /// Builds the interpolator.
    ///
    /// # Errors
    ///
    /// Fewer than two knots, mismatched lengths, or non-increasing abscissae.
    pub fn new(xs: &[T], ys: &[T]) -> Result<Self, InterpolationError> {
        validate_knots(xs, ys, 2)?;
        Ok(Self {
            xs: xs.to_vec(),
            ys: ys.to_vec(),
        })
    }

    /// Knot abscissae.
    #[inline]
    pub fn xs(&self) -> &[T] {
        &self.xs
    }

    /// Knot values.
    #[inline]
    pub fn ys(&self) -> &[T] {
        &self.ys
    }
}

impl<T: Float> Interpolator<T> for LinearInterpolator<T> {
    fn interpolate(&self, x: T) -> Result<T, InterpolationError> {
        let (lo, hi) = self.domain();
        if x < lo || x > hi {
            return Err(out_of_bounds(x, lo, hi));
        }
        let i = segment_index(&self.xs, x);
        let w = (x - self.xs[i]) / (self.xs[i + 1] - self.xs[i]);
        Ok(self.ys[i] + w * (self.ys[i + 1] - self.ys[i]))
    }

    fn domain(&self) -> (T, T) {
        (self.xs[0], self.xs[self.xs.len() - 1])
    }
}
