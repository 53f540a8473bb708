//! Fritsch–Carlson monotone cubic Hermite interpolation.

use super::traits::{out_of_bounds, segment_index, validate_knots};
use super::Interpolator;
use crate::types::InterpolationError;
use num_traits::Float;

/// Shape-preserving cubic interpolator.
///
/// Tangents start from the average of adjacent secants and are limited so
/// that the interpolant is monotone wherever the data are. Local extrema in
/// the data get a zero tangent, so no overshoot occurs between knots.
///
/// # Example
///
/// ```
/// use bgm_core::math::interpolators::{Interpolator, MonotonicInterpolator};
///
/// // Price → shift map of a monotone pricing function.
/// let prices = [95.0, 98.0, 100.0, 104.0];
/// let shifts = [0.02, 0.01, 0.005, -0.01];
/// let interp = MonotonicInterpolator::new(&prices, &shifts).unwrap();
///
/// let guess = interp.interpolate(99.0).unwrap();
/// assert!(guess < 0.01 && guess > 0.005);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct MonotonicInterpolator<T: Float> {
    xs: Vec<T>,
    ys: Vec<T>,
    tangents: Vec<T>,
}

impl<T: Float> MonotonicInterpolator<T> {
    /// Builds the interpolator from strictly increasing `xs`.
    pub fn new(xs: &[T], ys: &[T]) -> Result<Self, InterpolationError> {
        validate_knots(xs, ys, 2)?;
        let n = xs.len();
        let secants: Vec<T> = (0..n - 1)
            .map(|k| (ys[k + 1] - ys[k]) / (xs[k + 1] - xs[k]))
            .collect();

        let two = T::one() + T::one();
        let three = two + T::one();
        let mut tangents = vec![T::zero(); n];
        tangents[0] = secants[0];
        tangents[n - 1] = secants[n - 2];
        for k in 1..n - 1 {
            tangents[k] = if secants[k - 1] * secants[k] <= T::zero() {
                T::zero()
            } else {
                (secants[k - 1] + secants[k]) / two
            };
        }

        for k in 0..n - 1 {
            if secants[k] == T::zero() {
                tangents[k] = T::zero();
                tangents[k + 1] = T::zero();
                continue;
            }
            let alpha = tangents[k] / secants[k];
            let beta = tangents[k + 1] / secants[k];
            let radius = (alpha * alpha + beta * beta).sqrt();
            if radius > three {
                let tau = three / radius;
                tangents[k] = tau * alpha * secants[k];
                tangents[k + 1] = tau * beta * secants[k];
            }
        }

        Ok(Self {
            xs: xs.to_vec(),
            ys: ys.to_vec(),
            tangents,
        })
    }
}

impl<T: Float> Interpolator<T> for MonotonicInterpolator<T> {
    fn interpolate(&self, x: T) -> Result<T, InterpolationError> {
        let (lo, hi) = self.domain();
        if x < lo || x > hi {
            return Err(out_of_bounds(x, lo, hi));
        }
        let k = segment_index(&self.xs, x);
        let h = self.xs[k + 1] - self.xs[k];
        let t = (x - self.xs[k]) / h;
        let one = T::one();
        let two = one + one;
        let three = two + one;
        let t2 = t * t;
        let t3 = t2 * t;
        let h00 = two * t3 - three * t2 + one;
        let h10 = t3 - two * t2 + t;
        let h01 = three * t2 - two * t3;
        let h11 = t3 - t2;
        Ok(h00 * self.ys[k]
            + h10 * h * self.tangents[k]
            + h01 * self.ys[k + 1]
            + h11 * h * self.tangents[k + 1])
    }

    fn domain(&self) -> (T, T) {
        (self.xs[0], self.xs[self.xs.len() - 1])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use proptest::prelude::*;

    #[test]
    fn test_reproduces_knots() {
        let interp = MonotonicInterpolator::new(&[0.0, 1.0, 2.0, 4.0], &[0.0, 1.0, 1.5, 1.6]).unwrap();
        assert_relative_eq!(interp.interpolate(2.0).unwrap(), 1.5, epsilon = 1e-14);
        assert_relative_eq!(interp.interpolate(4.0).unwrap(), 1.6, epsilon = 1e-14);
    }

    #[test]
    fn test_flat_segment_stays_flat() {
        let interp = MonotonicInterpolator::new(&[0.0, 1.0, 2.0, 3.0], &[0.0, 1.0, 1.0, 2.0]).unwrap();
        for i in 0..=10 {
            let x = 1.0 + i as f64 / 10.0;
            assert_relative_eq!(interp.interpolate(x).unwrap(), 1.0, epsilon = 1e-14);
        }
    }

    #[test]
    fn test_linear_data_is_exact() {
        let interp = MonotonicInterpolator::new(&[0.0, 1.0, 3.0], &[1.0, 3.0, 7.0]).unwrap();
        assert_relative_eq!(interp.interpolate(2.0).unwrap(), 5.0, epsilon = 1e-12);
    }

    proptest! {
        #[test]
        fn prop_monotone_data_gives_monotone_curve(
            steps in proptest::collection::vec(0.0f64..5.0, 3..12),
            gaps in proptest::collection::vec(0.1f64..2.0, 12),
        ) {
            let mut xs = vec![0.0];
            let mut ys = vec![0.0];
            for (k, dy) in steps.iter().enumerate() {
                xs.push(xs[k] + gaps[k]);
                ys.push(ys[k] + dy);
            }
            let interp = MonotonicInterpolator::new(&xs, &ys).unwrap();
            let (lo, hi) = interp.domain();
            let mut prev = interp.interpolate(lo).unwrap();
            for i in 1..=200 {
                let x = lo + (hi - lo) * i as f64 / 200.0;
                let y = interp.interpolate(x).unwrap();
                prop_assert!(y >= prev - 1e-12);
                prev = y;
            }
        }
    }
}
