//! Brent's method root-finding solver.

use super::SolverConfig;
use crate::types::SolverError;
use num_traits::Float;

/// Brent's method root finder.
///
/// Combines bisection, secant and inverse quadratic interpolation. Every
/// iterate stays inside the current bracket, so a continuous function with a
/// sign change is always solved within the iteration budget or the bracket
/// collapses to `x_tolerance`.
///
/// # Example
///
/// ```
/// use bgm_core::math::solvers::{BrentSolver, SolverConfig};
///
/// let solver = BrentSolver::new(SolverConfig::default());
/// let f = |x: f64| x * x * x - x - 2.0;
///
/// let root = solver.find_root(f, 1.0, 2.0).unwrap();
/// assert!(f(root).abs() < 1e-10);
/// ```
#[derive(Debug, Clone)]
pub struct BrentSolver<T: Float> {
    config: SolverConfig<T>,
}

impl<T: Float> BrentSolver<T> {
    /// Create a new Brent solver with the given configuration.
    pub fn new(config: SolverConfig<T>) -> Self {
        Self { config }
    }

    /// Create a solver with default configuration.
    pub fn with_defaults() -> Self {
        Self {
            config: SolverConfig::default(),
        }
    }

    /// Solver configuration.
    pub fn config(&self) -> &SolverConfig<T> {
        &self.config
    }

    /// Find a root of an infallible `f` in the bracket `[a, b]`.
    ///
    /// # Errors
    ///
    /// * [`SolverError::NoBracket`] if `f(a)` and `f(b)` share a sign
    /// * [`SolverError::MaxIterationsExceeded`] if the budget runs out
    pub fn find_root<F>(&self, mut f: F, a: T, b: T) -> Result<T, SolverError>
    where
        F: FnMut(T) -> T,
    {
        self.try_find_root(|x| Ok::<T, SolverError>(f(x)), a, b)
    }

    /// Find a root of a fallible `f` in the bracket `[a, b]`.
    ///
    /// Errors returned by `f` abort the search and are passed through unchanged.
    ///
    /// ```
    /// use bgm_core::math::solvers::BrentSolver;
    /// use bgm_core::types::SolverError;
    ///
    /// let solver = BrentSolver::<f64>::with_defaults();
    /// let root = solver
    ///     .try_find_root(|x| Ok::<_, SolverError>(x * x - 2.0), 0.0, 2.0)
    ///     .unwrap();
    /// assert!((root - std::f64::consts::SQRT_2).abs() < 1e-10);
    /// ```
    pub fn try_find_root<F, E>(&self, mut f: F, a: T, b: T) -> Result<T, E>
    where
        F: FnMut(T) -> Result<T, E>,
        E: From<SolverError>,
    {
        let two = T::one() + T::one();
        let three = two + T::one();
        let half = T::one() / two;

        let mut a = a;
        let mut b = b;
        let mut fa = f(a)?;
        let mut fb = f(b)?;

        if fa == T::zero() {
            return Ok(a);
        }
        if fb == T::zero() {
            return Ok(b);
        }
        if fa * fb > T::zero() || fa.is_nan() || fb.is_nan() {
            return Err(SolverError::NoBracket {
                a: a.to_f64().unwrap_or(f64::NAN),
                b: b.to_f64().unwrap_or(f64::NAN),
            }
            .into());
        }

        let mut c = a;
        let mut fc = fa;
        let mut d = b - a;
        let mut e = d;

        for _ in 0..self.config.max_iterations {
            if fb * fc > T::zero() {
                c = a;
                fc = fa;
                d = b - a;
                e = d;
            }
            if fc.abs() < fb.abs() {
                a = b;
                b = c;
                c = a;
                fa = fb;
                fb = fc;
                fc = fa;
            }

            let tol = two * T::epsilon() * b.abs() + half * self.config.x_tolerance;
            let xm = half * (c - b);
            if xm.abs() <= tol || fb.abs() <= self.config.tolerance {
                return Ok(b);
            }

            if e.abs() >= tol && fa.abs() > fb.abs() {
                let s = fb / fa;
                let (mut p, mut q) = if a == c {
                    (two * xm * s, T::one() - s)
                } else {
                    let q = fa / fc;
                    let r = fb / fc;
                    (
                        s * (two * xm * q * (q - r) - (b - a) * (r - T::one())),
                        (q - T::one()) * (r - T::one()) * (s - T::one()),
                    )
                };
                if p > T::zero() {
                    q = -q;
                }
                p = p.abs();
                let bound = (three * xm * q - (tol * q).abs()).min((e * q).abs());
                if two * p < bound {
                    e = d;
                    d = p / q;
                } else {
                    d = xm;
                    e = d;
                }
            } else {
                d = xm;
                e = d;
            }

            a = b;
            fa = fb;
            b = if d.abs() > tol {
                b + d
            } else if xm > T::zero() {
                b + tol
            } else {
                b - tol
            };
            fb = f(b)?;
        }

        Err(SolverError::MaxIterationsExceeded {
            iterations: self.config.max_iterations,
            last: b.to_f64().unwrap_or(f64::NAN),
        }
        .into())
    }
}
