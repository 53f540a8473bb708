//! Implied volatilities and price-equivalent normal ↔ lognormal conversion.

use bgm_core::math::solvers::{BrentSolver, SolverConfig};

use super::error::AnalyticalError;
use super::{Bachelier, Black76, OptionType};

/// Doublings allowed while searching for an upper volatility bracket.
const MAX_BRACKET_DOUBLINGS: usize = 60;

fn check_expiry(expiry: f64) -> Result<(), AnalyticalError> {
    if !(expiry > 0.0) || !expiry.is_finite() {
        return Err(AnalyticalError::InvalidParameter {
            name: "expiry",
            value: expiry,
            constraint: "must be positive",
        });
    }
    Ok(())
}

/// Out-of-the-money side for `strike` against `forward`.
#[inline]
fn out_of_the_money(forward: f64, strike: f64) -> OptionType {
    if strike >= forward {
        OptionType::Call
    } else {
        OptionType::Put
    }
}

/// Solves `price(σ) = target` for an increasing `price` with `price(0)` the
/// intrinsic value, doubling the upper bracket from `initial`.
fn invert<F>(target: f64, intrinsic: f64, initial: f64, price: F) -> Result<f64, AnalyticalError>
where
    F: Fn(f64) -> Result<f64, AnalyticalError>,
{
    let floor = 1e-14 * target.abs().max(1e-300);
    if target - intrinsic <= floor {
        return Ok(0.0);
    }
    let mut upper = initial;
    let mut doublings = 0;
    while price(upper)? < target {
        upper *= 2.0;
        doublings += 1;
        if doublings > MAX_BRACKET_DOUBLINGS {
            return Err(AnalyticalError::NumericalInstability {
                message: format!("no volatility bracket for price {target}"),
            });
        }
    }
    let solver = BrentSolver::new(SolverConfig::high_precision());
    solver.try_find_root(|sigma| Ok::<f64, AnalyticalError>(price(sigma)? - target), 0.0, upper)
}

/// Black volatility reproducing an undiscounted option `price`.
///
/// # Errors
/// Non-positive forward, strike or expiry, or a price outside
/// `[intrinsic, upper)` where the upper bound is `F` for calls and `K` for puts.
///
/// # Examples
/// ```
/// use bgm_models::analytical::{implied_black_volatility, Black76, OptionType};
///
/// let price = Black76::new(0.03_f64, 0.2).unwrap().price_call(0.035, 2.0);
/// let vol = implied_black_volatility(price, 0.03, 0.035, 2.0, OptionType::Call).unwrap();
/// assert!((vol - 0.2).abs() < 1e-10);
/// ```
pub fn implied_black_volatility(
    price: f64,
    forward: f64,
    strike: f64,
    expiry: f64,
    option_type: OptionType,
) -> Result<f64, AnalyticalError> {
    check_expiry(expiry)?;
    if !(strike > 0.0) {
        return Err(AnalyticalError::InvalidStrike { strike });
    }
    let intrinsic = Black76::new(forward, 0.0)?.price(option_type, strike, expiry);
    let upper = match option_type {
        OptionType::Call => forward,
        OptionType::Put => strike,
    };
    if !(price >= intrinsic - 1e-15) || !(price < upper) {
        return Err(AnalyticalError::PriceOutOfBounds {
            price,
            lower: intrinsic,
            upper,
        });
    }
    invert(price, intrinsic, 0.5, |sigma| {
        Ok(Black76::new(forward, sigma)?.price(option_type, strike, expiry))
    })
}

/// Normal volatility reproducing an undiscounted option `price`.
///
/// # Examples
/// ```
/// use bgm_models::analytical::{implied_normal_volatility, Bachelier, OptionType};
///
/// let price = Bachelier::new(0.01_f64, 0.006).unwrap().price_put(0.0, 1.0);
/// let vol = implied_normal_volatility(price, 0.01, 0.0, 1.0, OptionType::Put).unwrap();
/// assert!((vol - 0.006).abs() < 1e-12);
/// ```
pub fn implied_normal_volatility(
    price: f64,
    forward: f64,
    strike: f64,
    expiry: f64,
    option_type: OptionType,
) -> Result<f64, AnalyticalError> {
    check_expiry(expiry)?;
    let intrinsic = Bachelier::new(forward, 0.0)?.price(option_type, strike, expiry);
    if !(price >= intrinsic - 1e-15) || !price.is_finite() {
        return Err(AnalyticalError::PriceOutOfBounds {
            price,
            lower: intrinsic,
            upper: f64::INFINITY,
        });
    }
    invert(price, intrinsic, 0.01, |sigma| {
        Ok(Bachelier::new(forward, sigma)?.price(option_type, strike, expiry))
    })
}

/// Normal volatility giving the same out-of-the-money price as `black_vol`.
///
/// # Examples
/// ```
/// use bgm_models::analytical::{lognormal_to_normal, normal_to_lognormal};
///
/// let normal = lognormal_to_normal(0.03, 0.03, 5.0, 0.2).unwrap();
/// // Roughly F·σ near the money.
/// assert!((normal - 0.006).abs() < 2e-4);
/// let back = normal_to_lognormal(0.03, 0.03, 5.0, normal).unwrap();
/// assert!((back - 0.2).abs() < 1e-9);
/// ```
pub fn lognormal_to_normal(
    forward: f64,
    strike: f64,
    expiry: f64,
    black_vol: f64,
) -> Result<f64, AnalyticalError> {
    check_expiry(expiry)?;
    if !(strike > 0.0) {
        return Err(AnalyticalError::InvalidStrike { strike });
    }
    let option_type = out_of_the_money(forward, strike);
    let price = Black76::new(forward, black_vol)?.price(option_type, strike, expiry);
    implied_normal_volatility(price, forward, strike, expiry, option_type)
}

/// Black volatility giving the same out-of-the-money price as `normal_vol`.
pub fn normal_to_lognormal(
    forward: f64,
    strike: f64,
    expiry: f64,
    normal_vol: f64,
) -> Result<f64, AnalyticalError> {
    check_expiry(expiry)?;
    if !(forward > 0.0) {
        return Err(AnalyticalError::InvalidForward { forward });
    }
    if !(strike > 0.0) {
        return Err(AnalyticalError::InvalidStrike { strike });
    }
    let option_type = out_of_the_money(forward, strike);
    let price = Bachelier::new(forward, normal_vol)?.price(option_type, strike, expiry);
    implied_black_volatility(price, forward, strike, expiry, option_type)
}
