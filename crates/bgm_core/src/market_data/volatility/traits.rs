//! Volatility source contract.

use crate::market_data::error::MarketDataError;

/// Quoting convention of a volatility number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum VolatilityKind {
    /// Black (lognormal) volatility.
    #[default]
    Lognormal,
    /// Bachelier (normal) volatility in absolute rate units.
    Normal,
}

/// A single volatility lookup.
///
/// `expiry` and `tenor` are year fractions from valuation; `forward` is the
/// underlying swap (or forward) rate and `strike` the option strike.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VolatilityQuery {
    /// Option expiry.
    pub expiry: f64,
    /// Length of the underlying swap.
    pub tenor: f64,
    /// Forward rate of the underlying.
    pub forward: f64,
    /// Option strike.
    pub strike: f64,
}

impl VolatilityQuery {
    /// At-the-money query.
    pub fn atm(expiry: f64, tenor: f64, forward: f64) -> Self {
        Self {
            expiry,
            tenor,
            forward,
            strike: forward,
        }
    }

    /// Strike offset `strike - forward`.
    #[inline]
    pub fn moneyness(&self) -> f64 {
        self.strike - self.forward
    }
}

/// Anything that can produce a single volatility number for an option.
///
/// Flat scalars, term structures, parametric swaption surfaces and cubes all
/// satisfy this one contract.
///
/// # Example
///
/// ```
/// use bgm_core::market_data::volatility::{FlatVolatility, VolatilityQuery, VolatilitySource};
///
/// let source = FlatVolatility::lognormal(0.2);
/// let vol = source.volatility(&VolatilityQuery::atm(1.0, 5.0, 0.03)).unwrap();
/// assert_eq!(vol, 0.2);
/// ```
pub trait VolatilitySource {
    /// Volatility for `query`.
    ///
    /// # Errors
    ///
    /// [`MarketDataError::InvalidExpiry`] for a negative expiry, plus any
    /// source-specific lookup failure.
    fn volatility(&self, query: &VolatilityQuery) -> Result<f64, MarketDataError>;

    /// Convention of the returned numbers.
    fn kind(&self) -> VolatilityKind {
        VolatilityKind::Lognormal
    }
}

impl<V: VolatilitySource + ?Sized> VolatilitySource for &V {
    fn volatility(&self, query: &VolatilityQuery) -> Result<f64, MarketDataError> {
        (**self).volatility(query)
    }

    fn kind(&self) -> VolatilityKind {
        (**self).kind()
    }
}

impl<V: VolatilitySource + ?Sized> VolatilitySource for Box<V> {
    fn volatility(&self, query: &VolatilityQuery) -> Result<f64, MarketDataError> {
        (**self).volatility(query)
    }

    fn kind(&self) -> VolatilityKind {
        (**self).kind()
    }
}

pub(crate) fn check_expiry(expiry: f64) -> Result<(), MarketDataError> {
    if expiry < 0.0 || expiry.is_nan() {
        return Err(MarketDataError::InvalidExpiry { expiry });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Linear;

    impl VolatilitySource for Linear {
        fn volatility(&self, query: &VolatilityQuery) -> Result<f64, MarketDataError> {
            check_expiry(query.expiry)?;
            Ok(0.1 + 0.01 * query.expiry)
        }
    }

    #[test]
    fn test_query_moneyness() {
        let q = VolatilityQuery {
            expiry: 1.0,
            tenor: 2.0,
            forward: 0.03,
            strike: 0.035,
        };
        assert!((q.moneyness() - 0.005).abs() < 1e-15);
        assert_eq!(VolatilityQuery::atm(1.0, 2.0, 0.03).moneyness(), 0.0);
    }

    #[test]
    fn test_default_kind_and_forwarding() {
        let boxed: Box<dyn VolatilitySource> = Box::new(Linear);
        assert_eq!(boxed.kind(), VolatilityKind::Lognormal);
        let v = boxed.volatility(&VolatilityQuery::atm(2.0, 1.0, 0.02)).unwrap();
        assert!((v - 0.12).abs() < 1e-15);
        assert!(boxed.volatility(&VolatilityQuery::atm(-1.0, 1.0, 0.02)).is_err());
    }
}
