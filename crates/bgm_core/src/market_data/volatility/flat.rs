//! Flat scalar volatility.

use super::traits::check_expiry;
use super::{VolatilityKind, VolatilityQuery, VolatilitySource};
use crate::market_data::error::MarketDataError;

/// The same volatility for every expiry, tenor and strike.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FlatVolatility {
    sigma: f64,
    kind: VolatilityKind,
}

impl FlatVolatility {
    /// Flat volatility quoted under `kind`.
    pub fn new(sigma: f64, kind: VolatilityKind) -> Self {
        Self { sigma, kind }
    }

    /// Flat Black volatility.
    pub fn lognormal(sigma: f64) -> Self {
        Self::new(sigma, VolatilityKind::Lognormal)
    }

    /// Flat Bachelier volatility.
    pub fn normal(sigma: f64) -> Self {
        Self::new(sigma, VolatilityKind::Normal)
    }

    /// The constant.
    pub fn sigma(&self) -> f64 {
        self.sigma
    }
}

impl VolatilitySource for FlatVolatility {
    fn volatility(&self, query: &VolatilityQuery) -> Result<f64, MarketDataError> {
        check_expiry(query.expiry)?;
        Ok(self.sigma)
    }

    fn kind(&self) -> VolatilityKind {
        self.kind
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flat_is_constant() {
        let v = FlatVolatility::normal(0.008);
        assert_eq!(v.kind(), VolatilityKind::Normal);
        for (e, k) in [(0.5, 0.01), (5.0, 0.05)] {
            let q = VolatilityQuery {
                expiry: e,
                tenor: 1.0,
                forward: 0.03,
                strike: k,
            };
            assert_eq!(v.volatility(&q).unwrap(), 0.008);
        }
    }
}
