//! Interpolation methods.
//!
//! ## Available Interpolators
//!
//! - [`LinearInterpolator`]: Piecewise linear interpolation between knots
//! - [`MonotonicInterpolator`]: Fritsch–Carlson shape-preserving cubic
//! - [`BilinearInterpolator`]: Grid interpolation for quote matrices and cubes
//!
//! All 1D interpolators implement [`Interpolator`], which adds flat
//! extrapolation on top of the bounds-checked `interpolate`.

mod bilinear;
mod linear;
mod monotonic;
mod traits;

pub use bilinear::BilinearInterpolator;
pub use linear::LinearInterpolator;
pub use monotonic::MonotonicInterpolator;
pub use traits::Interpolator;
