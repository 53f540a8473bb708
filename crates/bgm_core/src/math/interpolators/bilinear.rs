//! Bilinear interpolation on a rectangular grid.

use super::traits::{out_of_bounds, segment_index, validate_knots};
use crate::types::InterpolationError;
use num_traits::Float;

/// Bilinear interpolator for grid data `zs[i][j] = z(xs[i], ys[j])`.
///
/// Used for swaption quote matrices (rows = expiries, columns = tenors).
///
/// # Example
///
/// ```
/// use bgm_core::math::interpolators::BilinearInterpolator;
///
/// let expiries = [1.0, 2.0];
/// let tenors = [1.0, 5.0];
/// let vols = vec![vec![0.20, 0.18], vec![0.22, 0.16]];
///
/// let grid: BilinearInterpolator<f64> = BilinearInterpolator::new(&expiries, &tenors, &vols).unwrap();
/// let z = grid.interpolate(1.5, 3.0).unwrap();
/// assert!((z - 0.19).abs() < 1e-12);
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BilinearInterpolator<T: Float> {
    xs: Vec<T>,
    ys: Vec<T>,
    zs: Vec<Vec<T>>,
}

impl<T: Float> BilinearInterpolator<T> {
    /// Builds the interpolator.
    ///
    /// Axes of length one are allowed and behave as constant along that axis.
    ///
    /// # Errors
    ///
    /// Empty or non-increasing axes, or a grid whose shape does not match the axes.
    pub fn new(xs: &[T], ys: &[T], zs: &[Vec<T>]) -> Result<Self, InterpolationError> {
        validate_knots(xs, xs, 1)?;
        validate_knots(ys, ys, 1)?;
        if zs.len() != xs.len() {
            return Err(InterpolationError::InvalidInput(format!(
                "grid has {} rows but x-axis has {} points",
                zs.len(),
                xs.len()
            )));
        }
        if let Some((i, row)) = zs.iter().enumerate().find(|(_, row)| row.len() != ys.len()) {
            return Err(InterpolationError::InvalidInput(format!(
                "grid row {} has {} columns but y-axis has {} points",
                i,
                row.len(),
                ys.len()
            )));
        }
        Ok(Self {
            xs: xs.to_vec(),
            ys: ys.to_vec(),
            zs: zs.to_vec(),
        })
    }

    /// Value at `(x, y)`; errors outside the grid.
    pub fn interpolate(&self, x: T, y: T) -> Result<T, InterpolationError> {
        let (x_lo, x_hi) = self.domain_x();
        let (y_lo, y_hi) = self.domain_y();
        if x < x_lo || x > x_hi {
            return Err(out_of_bounds(x, x_lo, x_hi));
        }
        if y < y_lo || y > y_hi {
            return Err(out_of_bounds(y, y_lo, y_hi));
        }
        Ok(self.blend(x, y))
    }

    /// Value at `(x, y)` with both coordinates clamped into the grid.
    pub fn interpolate_flat(&self, x: T, y: T) -> T {
        let (x_lo, x_hi) = self.domain_x();
        let (y_lo, y_hi) = self.domain_y();
        self.blend(x.max(x_lo).min(x_hi), y.max(y_lo).min(y_hi))
    }

    fn blend(&self, x: T, y: T) -> T {
        let (i0, i1, u) = axis_weight(&self.xs, x);
        let (j0, j1, v) = axis_weight(&self.ys, y);
        let one = T::one();
        (one - u) * (one - v) * self.zs[i0][j0]
            + u * (one - v) * self.zs[i1][j0]
            + (one - u) * v * self.zs[i0][j1]
            + u * v * self.zs[i1][j1]
    }

    /// X-axis range.
    #[inline]
    pub fn domain_x(&self) -> (T, T) {
        (self.xs[0], self.xs[self.xs.len() - 1])
    }

    /// Y-axis range.
    #[inline]
    pub fn domain_y(&self) -> (T, T) {
        (self.ys[0], self.ys[self.ys.len() - 1])
    }

    /// X-axis knots.
    #[inline]
    pub fn xs(&self) -> &[T] {
        &self.xs
    }

    /// Y-axis knots.
    #[inline]
    pub fn ys(&self) -> &[T] {
        &self.ys
    }

    /// Grid value at knot `(i, j)`.
    #[inline]
    pub fn node(&self, i: usize, j: usize) -> Option<T> {
        self.zs.get(i).and_then(|row| row.get(j)).copied()
    }
}

/// Bracketing knot indices and the weight of the upper one.
fn axis_weight<T: Float>(axis: &[T], x: T) -> (usize, usize, T) {
    if axis.len() == 1 {
        return (0, 0, T::zero());
    }
    let i = segment_index(axis, x);
    (i, i + 1, (x - axis[i]) / (axis[i + 1] - axis[i]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn grid() -> BilinearInterpolator<f64> {
        BilinearInterpolator::new(
            &[0.0, 1.0, 2.0],
            &[0.0, 1.0],
            &[vec![0.0, 1.0], vec![2.0, 3.0], vec![4.0, 5.0]],
        )
        .unwrap()
    }

    #[test]
    fn test_corners_reproduced() {
        let g = grid();
        assert_relative_eq!(g.interpolate(0.0, 0.0).unwrap(), 0.0);
        assert_relative_eq!(g.interpolate(2.0, 1.0).unwrap(), 5.0);
        assert_relative_eq!(g.interpolate(1.5, 0.5).unwrap(), 3.5);
    }

    #[test]
    fn test_shape_mismatch_rejected() {
        let err = BilinearInterpolator::new(&[0.0, 1.0], &[0.0, 1.0], &[vec![0.0, 1.0]]);
        assert!(err.is_err());
        let err = BilinearInterpolator::new(&[0.0, 1.0], &[0.0, 1.0], &[vec![0.0], vec![1.0, 2.0]]);
        assert!(err.is_err());
    }

    #[test]
    fn test_flat_extrapolation() {
        let g = grid();
        assert!(g.interpolate(3.0, 0.0).is_err());
        assert_relative_eq!(g.interpolate_flat(3.0, -1.0), 4.0);
    }

    #[test]
    fn test_single_column_axis() {
        let g = BilinearInterpolator::new(&[1.0, 3.0], &[5.0], &[vec![0.1], vec![0.3]]).unwrap();
        assert_relative_eq!(g.interpolate(2.0, 5.0).unwrap(), 0.2);
        assert_relative_eq!(g.interpolate_flat(2.0, 9.0), 0.2);
        assert_eq!(g.node(1, 0), Some(0.3));
    }
}
