//! Swaption volatility cube: ATM matrix plus a strike skew.

use super::traits::check_expiry;
use super::{VolatilityKind, VolatilityQuery, VolatilitySource};
use crate::market_data::error::MarketDataError;
use crate::math::interpolators::{BilinearInterpolator, Interpolator, LinearInterpolator};

/// ATM swaption matrix with an additive skew in strike offset.
///
/// The ATM level is interpolated bilinearly over (expiry, tenor) and held
/// flat outside the grid. The skew maps `strike - forward` to a volatility
/// spread added to the ATM level.
///
/// # Example
///
/// ```
/// use bgm_core::market_data::volatility::{
///     VolatilityCube, VolatilityKind, VolatilityQuery, VolatilitySource,
/// };
///
/// let cube = VolatilityCube::new(
///     vec![1.0, 2.0],
///     vec![1.0, 5.0],
///     vec![vec![0.20, 0.18], vec![0.19, 0.17]],
///     VolatilityKind::Lognormal,
/// )
/// .unwrap()
/// .with_skew(vec![-0.01, 0.0, 0.01], vec![0.02, 0.0, -0.01])
/// .unwrap();
///
/// let atm = cube.volatility(&VolatilityQuery::atm(1.0, 1.0, 0.03)).unwrap();
/// assert!((atm - 0.20).abs() < 1e-14);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct VolatilityCube {
    atm: BilinearInterpolator<f64>,
    skew: Option<LinearInterpolator<f64>>,
    kind: VolatilityKind,
}

impl VolatilityCube {
    /// ATM-only cube. `vols[i][j]` is the quote for `expiries[i]`, `tenors[j]`.
    pub fn new(
        expiries: Vec<f64>,
        tenors: Vec<f64>,
        vols: Vec<Vec<f64>>,
        kind: VolatilityKind,
    ) -> Result<Self, MarketDataError> {
        Ok(Self {
            atm: BilinearInterpolator::new(&expiries, &tenors, &vols)?,
            skew: None,
            kind,
        })
    }

    /// Attaches a skew slice: volatility spreads at strike offsets.
    pub fn with_skew(mut self, offsets: Vec<f64>, spreads: Vec<f64>) -> Result<Self, MarketDataError> {
        self.skew = Some(LinearInterpolator::new(&offsets, &spreads)?);
        Ok(self)
    }

    /// ATM volatility for an (expiry, tenor) pair.
    pub fn atm_volatility(&self, expiry: f64, tenor: f64) -> f64 {
        self.atm.interpolate_flat(expiry, tenor)
    }
}

impl VolatilitySource for VolatilityCube {
    fn volatility(&self, query: &VolatilityQuery) -> Result<f64, MarketDataError> {
        check_expiry(query.expiry)?;
        let atm = self.atm_volatility(query.expiry, query.tenor);
        let spread = self
            .skew
            .as_ref()
            .map_or(0.0, |skew| skew.interpolate_flat(query.moneyness()));
        Ok((atm + spread).max(0.0))
    }

    fn kind(&self) -> VolatilityKind {
        self.kind
    }
}
