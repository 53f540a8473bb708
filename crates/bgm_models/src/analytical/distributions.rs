//! Standard normal distribution functions.
//!
//! Generic over `T: Float`. The CDF uses the Hart double-precision
//! rational approximation in West's arrangement, accurate to machine
//! precision in the body and to about 1e-8 relative in the far tail.

use num_traits::Float;

/// 1 / sqrt(2π)
const FRAC_1_SQRT_2PI: f64 = 0.398_942_280_401_432_7;

const NUMERATOR: [f64; 7] = [
    3.526_249_659_989_11e-2,
    0.700_383_064_443_688,
    6.373_962_203_531_65,
    33.912_866_078_383,
    112.079_291_497_871,
    221.213_596_169_931,
    220.206_867_912_376,
];

const DENOMINATOR: [f64; 8] = [
    8.838_834_764_831_84e-2,
    1.755_667_163_182_64,
    16.064_177_579_207,
    86.780_732_202_946_1,
    296.564_248_779_674,
    637.333_633_378_831,
    793.826_512_519_948,
    440.413_735_824_752,
];

/// Switch from the rational form to the continued fraction.
const RATIONAL_LIMIT: f64 = 7.071_067_811_865_47;

/// Beyond this the tail underflows.
const TAIL_LIMIT: f64 = 37.0;

#[inline]
pub(crate) fn constant<T: Float>(x: f64) -> T {
    T::from(x).unwrap_or_else(T::nan)
}

#[inline]
fn horner<T: Float>(coefficients: &[f64], z: T) -> T {
    coefficients
        .iter()
        .fold(T::zero(), |acc, &c| acc * z + constant(c))
}

/// Standard normal cumulative distribution function `Φ(x)`.
///
/// # Examples
/// ```
/// use bgm_models::analytical::distributions::norm_cdf;
///
/// assert_eq!(norm_cdf(0.0_f64), 0.5);
/// assert!((norm_cdf(1.0_f64) - 0.841_344_746_068_542_9).abs() < 1e-15);
/// assert!(norm_cdf(-40.0_f64) == 0.0);
/// ```
pub fn norm_cdf<T: Float>(x: T) -> T {
    let z = x.abs();
    let tail = if z > constant(TAIL_LIMIT) {
        T::zero()
    } else {
        let half: T = constant(0.5);
        let e = (-half * z * z).exp();
        if z < constant(RATIONAL_LIMIT) {
            e * horner(&NUMERATOR, z) / horner(&DENOMINATOR, z)
        } else {
            let f = z
                + T::one()
                    / (z + constant::<T>(2.0)
                        / (z + constant::<T>(3.0)
                            / (z + constant::<T>(4.0) / (z + constant::<T>(0.65)))));
            e / (f * constant(2.506_628_274_631))
        }
    };
    if x > T::zero() {
        T::one() - tail
    } else {
        tail
    }
}

/// Standard normal density `φ(x)`.
///
/// # Examples
/// ```
/// use bgm_models::analytical::distributions::norm_pdf;
///
/// assert!((norm_pdf(0.0_f64) - 0.398_942_280_4).abs() < 1e-10);
/// ```
#[inline]
pub fn norm_pdf<T: Float>(x: T) -> T {
    let half: T = constant(0.5);
    constant::<T>(FRAC_1_SQRT_2PI) * (-half * x * x).exp()
}
