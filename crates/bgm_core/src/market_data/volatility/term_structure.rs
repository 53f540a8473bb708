//! Expiry-dependent volatility term structure.

use super::traits::check_expiry;
use super::{VolatilityKind, VolatilityQuery, VolatilitySource};
use crate::market_data::error::MarketDataError;
use crate::math::interpolators::{Interpolator, LinearInterpolator};

/// Volatility as a function of expiry only.
///
/// Linear between pillars, flat outside. A single pillar gives a flat curve.
#[derive(Debug, Clone, PartialEq)]
pub struct TermStructureVolatility {
    expiries: Vec<f64>,
    vols: Vec<f64>,
    curve: Option<LinearInterpolator<f64>>,
    kind: VolatilityKind,
}

impl TermStructureVolatility {
    /// Builds the term structure from increasing expiries.
    pub fn new(expiries: Vec<f64>, vols: Vec<f64>, kind: VolatilityKind) -> Result<Self, MarketDataError> {
        if expiries.is_empty() || expiries.len() != vols.len() {
            return Err(MarketDataError::InsufficientData {
                got: vols.len(),
                need: expiries.len().max(1),
            });
        }
        let curve = if expiries.len() > 1 {
            Some(LinearInterpolator::new(&expiries, &vols)?)
        } else {
            None
        };
        Ok(Self {
            expiries,
            vols,
            curve,
            kind,
        })
    }

    /// Pillar expiries.
    pub fn expiries(&self) -> &[f64] {
        &self.expiries
    }

    /// Pillar volatilities.
    pub fn vols(&self) -> &[f64] {
        &self.vols
    }
}

impl VolatilitySource for TermStructureVolatility {
    fn volatility(&self, query: &VolatilityQuery) -> Result<f64, MarketDataError> {
        check_expiry(query.expiry)?;
        Ok(match &self.curve {
            Some(curve) => curve.interpolate_flat(query.expiry),
            None => self.vols[0],
        })
    }

    fn kind(&self) -> VolatilityKind {
        self.kind
    }
}
