//! Caplet volatility stripping from flat cap volatilities.
//!
//! Each strike is an independent bootstrap, so strikes are farmed out to the
//! rayon pool. Tasks read one immutable tenor schedule and keep their
//! stripped volatilities local.

use bgm_core::market_data::curves::YieldCurve;
use bgm_core::market_data::volatility::{TermStructureVolatility, VolatilityKind};
use bgm_core::math::solvers::{BrentSolver, SolverConfig};
use bgm_core::types::PricingError;
use rayon::prelude::*;
use tracing::debug;

use super::CalibrationError;
use crate::analytical::{Bachelier, Black76};
use crate::schedules::TenorSchedule;

/// Flat cap volatilities by strike and maturity.
///
/// A cap maturing at tenor index `m` holds the caplets on rates
/// `first..m`, where `first` is the first rate resetting after valuation.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CapVolatilityGrid {
    /// Cap strikes
    pub strikes: Vec<f64>,
    /// Cap maturities as tenor indices, strictly increasing
    pub maturities: Vec<usize>,
    /// `vols[s][m]`: flat volatility of the cap with strike `s`, maturity `m`
    pub vols: Vec<Vec<f64>>,
    /// Quoting convention
    pub kind: VolatilityKind,
}

impl CapVolatilityGrid {
    fn validate(&self, rate_count: usize) -> Result<(), CalibrationError> {
        if self.vols.len() != self.strikes.len() {
            return Err(CalibrationError::DimensionMismatch {
                expected: self.strikes.len(),
                got: self.vols.len(),
                context: "strike rows",
            });
        }
        if let Some(row) = self.vols.iter().find(|row| row.len() != self.maturities.len()) {
            return Err(CalibrationError::DimensionMismatch {
                expected: self.maturities.len(),
                got: row.len(),
                context: "maturity columns",
            });
        }
        if self.maturities.windows(2).any(|w| w[1] <= w[0]) {
            return Err(CalibrationError::InvalidInput(
                "cap maturities must be strictly increasing".to_string(),
            ));
        }
        if let Some(&m) = self.maturities.last() {
            if m > rate_count {
                return Err(CalibrationError::InvalidInput(format!(
                    "cap maturity {m} beyond the {rate_count} rates of the schedule"
                )));
            }
        }
        Ok(())
    }
}

/// Stripped caplet volatilities per strike.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CapletVolatilities {
    /// Strikes, in grid order
    pub strikes: Vec<f64>,
    /// Caplet expiries `T_k`
    pub expiries: Vec<f64>,
    /// `vols[s][k]`: caplet volatility for strike `s`, expiry `k`
    pub vols: Vec<Vec<f64>>,
    /// Quoting convention
    pub kind: VolatilityKind,
}

impl CapletVolatilities {
    /// Caplet volatilities of one strike as a term structure.
    pub fn term_structure(&self, strike: usize) -> Result<TermStructureVolatility, CalibrationError> {
        let vols = self.vols.get(strike).ok_or_else(|| {
            CalibrationError::InvalidInput(format!(
                "strike index {strike} out of range ({} strikes)",
                self.strikes.len()
            ))
        })?;
        Ok(TermStructureVolatility::new(self.expiries.clone(), vols.clone(), self.kind)
            .map_err(PricingError::from)?)
    }
}

/// Caplet stripper configuration.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CapletStripperConfig {
    /// Root finder controls
    pub solver: SolverConfig<f64>,
    /// Lower end of the volatility bracket
    pub min_volatility: f64,
    /// Upper end of the volatility bracket
    pub max_volatility: f64,
    /// Strikes below this count are stripped sequentially
    pub parallel_threshold: usize,
}

impl Default for CapletStripperConfig {
    fn default() -> Self {
        Self {
            solver: SolverConfig::default(),
            min_volatility: 1e-6,
            max_volatility: 5.0,
            parallel_threshold: 2,
        }
    }
}

/// Bootstraps caplet volatilities strike by strike.
///
/// For each cap maturity the caplets added since the previous maturity share
/// one volatility, solved so that the stripped caplets sum to the flat-vol
/// cap price.
///
/// # Example
///
/// ```
/// use bgm_core::market_data::curves::FlatCurve;
/// use bgm_core::market_data::volatility::VolatilityKind;
/// use bgm_models::calibration::{CapVolatilityGrid, CapletStripper};
///
/// let grid = CapVolatilityGrid {
///     strikes: vec![0.03],
///     maturities: vec![2, 3],
///     vols: vec![vec![0.2, 0.2]],
///     kind: VolatilityKind::Lognormal,
/// };
/// let stripped = CapletStripper::default()
///     .strip(&FlatCurve::new(0.03), &[0.5, 1.0, 1.5, 2.0], &grid)
///     .unwrap();
///
/// assert!(stripped.vols[0].iter().all(|v| (v - 0.2).abs() < 1e-6));
/// ```
#[derive(Debug, Clone, Default)]
pub struct CapletStripper {
    config: CapletStripperConfig,
}

impl CapletStripper {
    /// Stripper with `config`.
    pub fn new(config: CapletStripperConfig) -> Self {
        Self { config }
    }

    /// Strips every strike of `grid` on the tenor dates `times`.
    ///
    /// # Errors
    ///
    /// Shape mismatches, a bad schedule, or a cap price that no caplet
    /// volatility inside the bracket can reach.
    #[tracing::instrument(skip_all, fields(strikes = grid.strikes.len()))]
    pub fn strip<C>(
        &self,
        curve: &C,
        times: &[f64],
        grid: &CapVolatilityGrid,
    ) -> Result<CapletVolatilities, CalibrationError>
    where
        C: YieldCurve<f64> + ?Sized,
    {
        let reference = TenorSchedule::from_curve(curve, times.to_vec())?;
        grid.validate(reference.rate_count())?;
        let first = (0..reference.rate_count())
            .find(|&k| reference.reset_time(k) > 0.0)
            .unwrap_or(reference.rate_count());
        let last = grid.maturities.last().copied().unwrap_or(first);
        if grid.maturities.first().is_some_and(|&m| m <= first) {
            return Err(CalibrationError::InvalidInput(format!(
                "the first cap must hold at least one caplet after rate {first}"
            )));
        }

        let task = |(strike, vols): (&f64, &Vec<f64>)| -> Result<Vec<f64>, CalibrationError> {
            self.strip_strike(&reference, first, *strike, vols, grid)
        };
        let rows = grid.strikes.iter().zip(&grid.vols);
        let vols = if grid.strikes.len() < self.config.parallel_threshold {
            rows.map(task).collect::<Result<Vec<_>, _>>()?
        } else {
            grid.strikes
                .par_iter()
                .zip(grid.vols.par_iter())
                .map(task)
                .collect::<Result<Vec<_>, _>>()?
        };

        Ok(CapletVolatilities {
            strikes: grid.strikes.clone(),
            expiries: (first..last).map(|k| reference.reset_time(k)).collect(),
            vols,
            kind: grid.kind,
        })
    }

    fn strip_strike(
        &self,
        schedule: &TenorSchedule,
        first: usize,
        strike: f64,
        cap_vols: &[f64],
        grid: &CapVolatilityGrid,
    ) -> Result<Vec<f64>, CalibrationError> {
        let solver = BrentSolver::new(self.config.solver);
        let mut stripped: Vec<f64> = Vec::new();
        let mut start = first;
        for (&maturity, &flat) in grid.maturities.iter().zip(cap_vols) {
            let target: f64 = (first..maturity)
                .map(|k| caplet_price(schedule, k, strike, flat, grid.kind))
                .sum::<Result<f64, _>>()?;
            let known: f64 = stripped
                .iter()
                .enumerate()
                .map(|(i, &v)| caplet_price(schedule, first + i, strike, v, grid.kind))
                .sum::<Result<f64, _>>()?;
            let objective = |sigma: f64| -> Result<f64, PricingError> {
                let fresh: f64 = (start..maturity)
                    .map(|k| caplet_price(schedule, k, strike, sigma, grid.kind))
                    .sum::<Result<f64, _>>()?;
                Ok(known + fresh - target)
            };
            let (lo, hi) = (self.config.min_volatility, self.config.max_volatility);
            let sigma = match solver.try_find_root(&objective, lo, hi) {
                Ok(sigma) => sigma,
                Err(PricingError::Solver(inner)) => {
                    let low = objective(lo)?;
                    let high = objective(hi)?;
                    let (best, residual) = if low.abs() <= high.abs() {
                        (lo, low.abs())
                    } else {
                        (hi, high.abs())
                    };
                    let mut best_parameters = stripped.clone();
                    best_parameters.extend(std::iter::repeat(best).take(maturity - start));
                    return Err(CalibrationError::NonConvergence {
                        message: format!(
                            "caplets {start}..{maturity} at strike {strike} unattainable in [{lo}, {hi}]: {inner}"
                        ),
                        best_parameters,
                        achieved_tolerance: residual,
                    });
                }
                Err(other) => return Err(other.into()),
            };
            debug!(strike, maturity, sigma, "stripped caplet volatility");
            stripped.extend(std::iter::repeat(sigma).take(maturity - start));
            start = maturity;
        }
        Ok(stripped)
    }
}

/// Present value of the caplet on rate `k`.
fn caplet_price(
    schedule: &TenorSchedule,
    k: usize,
    strike: f64,
    sigma: f64,
    kind: VolatilityKind,
) -> Result<f64, PricingError> {
    let forward = schedule.forward(k);
    let expiry = schedule.reset_time(k);
    let unit = match kind {
        VolatilityKind::Lognormal => Black76::new(forward, sigma)?.price_call(strike, expiry),
        VolatilityKind::Normal => Bachelier::new(forward, sigma)?.price_call(strike, expiry),
    };
    Ok(schedule.accrual(k) * schedule.zero_bond(k + 1) * unit)
}
