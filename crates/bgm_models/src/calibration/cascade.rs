//! Cascading bootstrap of the forward-volatility matrix.

use std::time::Instant;

use bgm_core::math::solvers::{BrentSolver, RootFinder, SolverConfig};
use bgm_core::types::PricingError;
use tracing::{debug, info, warn};

use super::{
    CalibratedVolatilities, CalibrationDiagnostics, CalibrationError, CalibrationResult,
    SwaptionModelPricer, SwaptionQuote, SwaptionVolatilityMatrix,
};
use crate::lattice::Distribution;
use crate::schedules::TenorSchedule;
use crate::volatility::ForwardVolatilityMatrix;

/// Which swaptions feed the bootstrap and which matrix cells they determine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum CascadeLayout {
    /// Swaption `start..end` fixes `σ[end − 1, start]`: the full lower
    /// triangle, processed in increasing order of expiry plus tenor.
    #[default]
    Triangular,
    /// Co-terminal swaptions `start..n` fix one volatility per period,
    /// shared by every rate still live in it.
    CoTerminal,
}

/// Cascade calibration configuration.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct CascadeConfig {
    /// Cell layout
    pub layout: CascadeLayout,
    /// Lower end of the volatility bracket
    pub min_volatility: f64,
    /// Upper end of the volatility bracket
    pub max_volatility: f64,
    /// Value for cells with nothing to fill from
    pub seed_volatility: f64,
    /// Largest accepted absolute price error after a sweep
    pub price_tolerance: f64,
    /// Maximum number of Gauss–Seidel sweeps
    pub max_sweeps: usize,
}

impl Default for CascadeConfig {
    fn default() -> Self {
        Self {
            layout: CascadeLayout::Triangular,
            min_volatility: 1e-4,
            max_volatility: 2.0,
            seed_volatility: 0.2,
            price_tolerance: 1e-8,
            max_sweeps: 5,
        }
    }
}

impl CascadeConfig {
    /// Fewer sweeps and a looser price tolerance.
    pub fn fast() -> Self {
        Self {
            price_tolerance: 1e-6,
            max_sweeps: 2,
            ..Self::default()
        }
    }

    /// Tight price tolerance.
    pub fn high_precision() -> Self {
        Self {
            price_tolerance: 1e-10,
            max_sweeps: 10,
            ..Self::default()
        }
    }

    /// Same configuration with a different layout.
    pub fn with_layout(mut self, layout: CascadeLayout) -> Self {
        self.layout = layout;
        self
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), CalibrationError> {
        if !(self.min_volatility > 0.0) || !(self.max_volatility > self.min_volatility) {
            return Err(CalibrationError::InvalidInput(format!(
                "volatility bracket [{}, {}] must be positive and non-empty",
                self.min_volatility, self.max_volatility
            )));
        }
        if !(self.seed_volatility >= 0.0) {
            return Err(CalibrationError::InvalidInput(format!(
                "seed volatility must be non-negative, got {}",
                self.seed_volatility
            )));
        }
        if !(self.price_tolerance > 0.0) {
            return Err(CalibrationError::InvalidInput(format!(
                "price tolerance must be positive, got {}",
                self.price_tolerance
            )));
        }
        if self.max_sweeps == 0 {
            return Err(CalibrationError::InvalidInput(
                "at least one sweep is required".to_string(),
            ));
        }
        Ok(())
    }
}

/// One unknown of the bootstrap.
#[derive(Debug, Clone, Copy)]
struct Cell {
    row: usize,
    period: usize,
    quote: Option<usize>,
}

/// Bootstraps forward volatilities one swaption at a time.
///
/// Each quote determines a single new cell of the forward-volatility matrix
/// given every cell solved before it; the solve is delegated to a
/// [`RootFinder`]. Quotes with a non-positive volatility, missing quotes,
/// and quotes expiring at valuation are skipped and their cell is filled
/// from its left neighbour in the same row (or the row above for the first
/// period). Sweeps repeat until every solved quote reprices within
/// `price_tolerance`.
///
/// Only lognormal dynamics are supported.
///
/// # Example
///
/// ```
/// use bgm_core::market_data::volatility::VolatilityKind;
/// use bgm_models::calibration::{
///     CascadeCalibrator, CascadeConfig, RebonatoSwaptionPricer, SwaptionQuote,
/// };
/// use bgm_models::schedules::TenorSchedule;
///
/// let schedule = TenorSchedule::new(vec![1.0, 2.0, 3.0], vec![0.03, 0.03]).unwrap();
/// let quotes = vec![
///     SwaptionQuote::atm(&schedule, 0, 1, 0.20, VolatilityKind::Lognormal).unwrap(),
///     SwaptionQuote::atm(&schedule, 0, 2, 0.19, VolatilityKind::Lognormal).unwrap(),
///     SwaptionQuote::atm(&schedule, 1, 2, 0.18, VolatilityKind::Lognormal).unwrap(),
/// ];
/// let calibrator = CascadeCalibrator::new(RebonatoSwaptionPricer::perfect(), CascadeConfig::default());
/// let result = calibrator.calibrate(&schedule, &quotes).unwrap();
///
/// assert!((result.parameters.matrix().get(0, 0).unwrap() - 0.20).abs() < 1e-8);
/// assert!(result.diagnostics.max_error < 1e-8);
/// ```
#[derive(Debug, Clone)]
pub struct CascadeCalibrator<P, R = BrentSolver<f64>> {
    pricer: P,
    root_finder: R,
    config: CascadeConfig,
}

impl<P: SwaptionModelPricer> CascadeCalibrator<P> {
    /// Calibrator using Brent's method.
    pub fn new(pricer: P, config: CascadeConfig) -> Self {
        Self {
            pricer,
            root_finder: BrentSolver::new(SolverConfig::default()),
            config,
        }
    }
}

impl<P: SwaptionModelPricer, R: RootFinder> CascadeCalibrator<P, R> {
    /// Calibrator with an injected root finder.
    pub fn with_root_finder(pricer: P, root_finder: R, config: CascadeConfig) -> Self {
        Self {
            pricer,
            root_finder,
            config,
        }
    }

    /// Configuration.
    pub fn config(&self) -> &CascadeConfig {
        &self.config
    }

    /// Model pricer.
    pub fn pricer(&self) -> &P {
        &self.pricer
    }

    /// Calibrates to the swaptions a market matrix quotes on `schedule`.
    pub fn calibrate_matrix(
        &self,
        schedule: &TenorSchedule,
        market: &SwaptionVolatilityMatrix,
    ) -> Result<CalibrationResult<CalibratedVolatilities>, CalibrationError> {
        let quotes = market.quotes_for(schedule)?;
        self.calibrate(schedule, &quotes)
    }

    /// Calibrates to `quotes`.
    ///
    /// # Errors
    ///
    /// - [`CalibrationError::NotSupported`] for non-lognormal pricers
    /// - [`CalibrationError::InvalidInput`] for bad quotes, duplicate quotes
    ///   for one cell, or quotes outside the layout
    /// - [`CalibrationError::NonConvergence`] when a quote is unattainable
    ///   inside the volatility bracket or the sweeps run out
    #[tracing::instrument(skip_all, fields(rates = schedule.rate_count(), quotes = quotes.len()))]
    pub fn calibrate(
        &self,
        schedule: &TenorSchedule,
        quotes: &[SwaptionQuote],
    ) -> Result<CalibrationResult<CalibratedVolatilities>, CalibrationError> {
        let started = Instant::now();
        self.config.validate()?;
        if self.pricer.distribution() != Distribution::Lognormal {
            return Err(CalibrationError::NotSupported(format!(
                "cascade calibration supports lognormal dynamics only, got {:?}",
                self.pricer.distribution()
            )));
        }
        for quote in quotes {
            quote.validate(schedule)?;
        }

        let n = schedule.rate_count();
        let cells = self.layout_cells(n, quotes)?;
        let targets = quotes
            .iter()
            .map(|q| q.market_price(schedule))
            .collect::<Result<Vec<_>, _>>()?;
        let mut matrix =
            ForwardVolatilityMatrix::flat(schedule.times()[..n].to_vec(), self.config.seed_volatility)?;

        let period_lengths: Vec<f64> = (0..n).map(|j| matrix.period_length(j)).collect();
        let solvable = |cell: &Cell| {
            cell.quote
                .filter(|&q| quotes[q].is_quoted() && period_lengths[cell.period] > 0.0)
        };
        let skipped: Vec<usize> = (0..quotes.len())
            .filter(|&q| !cells.iter().any(|c| c.quote == Some(q) && solvable(c).is_some()))
            .collect();
        for &q in &skipped {
            warn!(
                start = quotes[q].start,
                end = quotes[q].end,
                volatility = quotes[q].volatility,
                "skipping swaption quote"
            );
        }

        let mut errors = Vec::new();
        let mut sweeps = 0;
        let mut converged = false;
        while sweeps < self.config.max_sweeps {
            sweeps += 1;
            for cell in &cells {
                let value = match solvable(cell) {
                    Some(q) => self.solve_cell(schedule, &matrix, cell, &quotes[q], targets[q])?,
                    None => self.neighbour(&matrix, cell),
                };
                assign(&mut matrix, self.config.layout, cell, value)?;
            }

            errors.clear();
            for cell in &cells {
                if let Some(q) = solvable(cell) {
                    errors.push(self.pricer.price(schedule, &matrix, &quotes[q])? - targets[q]);
                }
            }
            let worst = errors.iter().fold(0.0_f64, |m, e| m.max(e.abs()));
            debug!(sweep = sweeps, max_error = worst, "cascade sweep");
            if worst <= self.config.price_tolerance {
                converged = true;
                break;
            }
        }

        let diagnostics = CalibrationDiagnostics::new(sweeps, started.elapsed())
            .with_instrument_errors(errors)
            .with_skipped_quotes(skipped);
        if !converged {
            return Err(CalibrationError::NonConvergence {
                message: format!("cascade did not settle after {sweeps} sweeps"),
                best_parameters: matrix.black_volatility_curve(),
                achieved_tolerance: diagnostics.max_error,
            });
        }
        info!(
            sweeps,
            rmse = diagnostics.rmse,
            skipped = diagnostics.skipped_quotes.len(),
            "cascade calibration finished"
        );
        let correlation = self.pricer.correlation(schedule);
        Ok(CalibrationResult::success(
            CalibratedVolatilities::new(matrix, correlation)?,
            diagnostics,
        ))
    }

    /// Cells in processing order, each tied to at most one quote.
    fn layout_cells(&self, n: usize, quotes: &[SwaptionQuote]) -> Result<Vec<Cell>, CalibrationError> {
        let mut cells: Vec<Cell> = match self.config.layout {
            CascadeLayout::Triangular => (0..n)
                .flat_map(|row| (0..=row).map(move |period| Cell { row, period, quote: None }))
                .collect(),
            CascadeLayout::CoTerminal => (0..n)
                .map(|period| Cell {
                    row: n - 1,
                    period,
                    quote: None,
                })
                .collect(),
        };

        for (q, quote) in quotes.iter().enumerate() {
            let position = match self.config.layout {
                CascadeLayout::Triangular => {
                    let row = quote.end - 1;
                    row * (row + 1) / 2 + quote.start
                }
                CascadeLayout::CoTerminal => {
                    if quote.end != n {
                        return Err(CalibrationError::InvalidInput(format!(
                            "swaption {}x{} is not co-terminal with rate {}",
                            quote.start, quote.end, n
                        )));
                    }
                    quote.start
                }
            };
            let cell = &mut cells[position];
            if cell.quote.is_some() {
                return Err(CalibrationError::InvalidInput(format!(
                    "two quotes determine volatility ({}, {})",
                    cell.row, cell.period
                )));
            }
            cell.quote = Some(q);
        }
        Ok(cells)
    }

    fn neighbour(&self, matrix: &ForwardVolatilityMatrix, cell: &Cell) -> f64 {
        let left = cell.period.checked_sub(1).and_then(|p| matrix.get(cell.row, p));
        let above = if self.config.layout == CascadeLayout::Triangular && cell.period == 0 {
            cell.row.checked_sub(1).and_then(|r| matrix.get(r, 0))
        } else {
            None
        };
        left.or(above).unwrap_or(self.config.seed_volatility)
    }

    fn solve_cell(
        &self,
        schedule: &TenorSchedule,
        matrix: &ForwardVolatilityMatrix,
        cell: &Cell,
        quote: &SwaptionQuote,
        target: f64,
    ) -> Result<f64, CalibrationError> {
        let layout = self.config.layout;
        let mut trial = matrix.clone();
        let mut objective = |sigma: f64| -> Result<f64, PricingError> {
            assign(&mut trial, layout, cell, sigma)?;
            Ok(self.pricer.price(schedule, &trial, quote)? - target)
        };

        let (lo, hi) = (self.config.min_volatility, self.config.max_volatility);
        match self.root_finder.find_root(&mut objective, lo, hi) {
            Ok(sigma) => {
                debug!(
                    row = cell.row,
                    period = cell.period,
                    sigma,
                    "solved swaption {}x{}",
                    quote.start,
                    quote.end
                );
                Ok(sigma)
            }
            Err(PricingError::Solver(err)) => {
                let low = objective(lo)?;
                let high = objective(hi)?;
                let (best, residual) = if low.abs() <= high.abs() {
                    (lo, low.abs())
                } else {
                    (hi, high.abs())
                };
                let mut best_parameters = matrix.row(cell.row).to_vec();
                best_parameters[cell.period] = best;
                Err(CalibrationError::NonConvergence {
                    message: format!(
                        "swaption {}x{} unattainable in [{lo}, {hi}]: {err}",
                        quote.start, quote.end
                    ),
                    best_parameters,
                    achieved_tolerance: residual,
                })
            }
            Err(other) => Err(other.into()),
        }
    }
}

fn assign(
    matrix: &mut ForwardVolatilityMatrix,
    layout: CascadeLayout,
    cell: &Cell,
    sigma: f64,
) -> Result<(), PricingError> {
    match layout {
        CascadeLayout::Triangular => matrix.set(cell.row, cell.period, sigma),
        CascadeLayout::CoTerminal => {
            for row in cell.period..matrix.rate_count() {
                matrix.set(row, cell.period, sigma)?;
            }
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use bgm_core::market_data::volatility::VolatilityKind;

    use crate::calibration::{LatticeSwaptionPricer, RebonatoSwaptionPricer};
    use crate::lattice::LatticeConfig;

    fn schedule() -> TenorSchedule {
        TenorSchedule::new(vec![1.0, 2.0, 3.0, 4.0], vec![0.03, 0.032, 0.034]).unwrap()
    }

    fn triangular_quotes(s: &TenorSchedule, vol: impl Fn(usize, usize) -> f64) -> Vec<SwaptionQuote> {
        let mut quotes = Vec::new();
        for start in 0..s.rate_count() {
            for end in start + 1..=s.rate_count() {
                quotes.push(SwaptionQuote::atm(s, start, end, vol(start, end), VolatilityKind::Lognormal).unwrap());
            }
        }
        quotes
    }

    // ========================================
    // Rebonato cascade
    // ========================================

    #[test]
    fn test_flat_quotes_recover_flat_matrix() {
        let s = schedule();
        let quotes = triangular_quotes(&s, |_, _| 0.2);
        let calibrator = CascadeCalibrator::new(RebonatoSwaptionPricer::perfect(), CascadeConfig::default());
        let result = calibrator.calibrate(&s, &quotes).unwrap();

        let flat = ForwardVolatilityMatrix::flat(s.times()[..3].to_vec(), 0.2).unwrap();
        assert!(result.parameters.matrix().max_abs_difference(&flat) < 1e-7);
        assert!(result.converged);
        assert_eq!(result.diagnostics.iterations, 1);
        assert!(result.diagnostics.skipped_quotes.is_empty());
    }

    #[test]
    fn test_caplet_cells_match_black_vol() {
        let s = schedule();
        let quotes = triangular_quotes(&s, |start, end| 0.25 - 0.01 * start as f64 - 0.005 * end as f64);
        let calibrator = CascadeCalibrator::new(RebonatoSwaptionPricer::perfect(), CascadeConfig::default());
        let result = calibrator.calibrate(&s, &quotes).unwrap();

        // Diagonal quotes are caplets: the row's Black vol equals the quote.
        let black = result.parameters.black_volatilities();
        for (i, &b) in black.iter().enumerate() {
            assert_relative_eq!(b, 0.25 - 0.01 * i as f64 - 0.005 * (i + 1) as f64, epsilon = 1e-7);
        }
        assert!(result.diagnostics.max_error < 1e-8);
    }

    #[test]
    fn test_non_positive_quote_is_skipped_and_filled() {
        let s = schedule();
        let quotes = triangular_quotes(&s, |start, end| if (start, end) == (1, 3) { 0.0 } else { 0.2 });
        let calibrator = CascadeCalibrator::new(RebonatoSwaptionPricer::perfect(), CascadeConfig::default());
        let result = calibrator.calibrate(&s, &quotes).unwrap();

        let skipped = &result.diagnostics.skipped_quotes;
        assert_eq!(skipped.len(), 1);
        assert_eq!((quotes[skipped[0]].start, quotes[skipped[0]].end), (1, 3));
        let m = result.parameters.matrix();
        assert_eq!(m.get(2, 1), m.get(2, 0));
    }

    #[test]
    fn test_co_terminal_layout() {
        let s = schedule();
        let quotes: Vec<SwaptionQuote> = (0..3)
            .map(|start| SwaptionQuote::atm(&s, start, 3, 0.2, VolatilityKind::Lognormal).unwrap())
            .collect();
        let config = CascadeConfig::default().with_layout(CascadeLayout::CoTerminal);
        let result = CascadeCalibrator::new(RebonatoSwaptionPricer::perfect(), config)
            .calibrate(&s, &quotes)
            .unwrap();
        let m = result.parameters.matrix();
        for j in 0..3 {
            assert_relative_eq!(m.get(2, j).unwrap(), 0.2, epsilon = 1e-7);
            assert_eq!(m.get(1, j.min(1)), m.get(2, j.min(1)));
        }
    }

    #[test]
    fn test_co_terminal_rejects_other_quotes() {
        let s = schedule();
        let quotes = vec![SwaptionQuote::atm(&s, 0, 1, 0.2, VolatilityKind::Lognormal).unwrap()];
        let config = CascadeConfig::default().with_layout(CascadeLayout::CoTerminal);
        let err = CascadeCalibrator::new(RebonatoSwaptionPricer::perfect(), config)
            .calibrate(&s, &quotes)
            .unwrap_err();
        assert!(matches!(err, CalibrationError::InvalidInput(_)));
    }

    // ========================================
    // Failures
    // ========================================

    #[test]
    fn test_normal_dynamics_not_supported() {
        let s = schedule();
        let pricer = LatticeSwaptionPricer::new(
            LatticeConfig::fast().with_distribution(Distribution::Normal),
        );
        let err = CascadeCalibrator::new(pricer, CascadeConfig::default())
            .calibrate(&s, &triangular_quotes(&s, |_, _| 0.2))
            .unwrap_err();
        assert!(matches!(err, CalibrationError::NotSupported(_)));
    }

    #[test]
    fn test_duplicate_quotes_rejected() {
        let s = schedule();
        let q = SwaptionQuote::atm(&s, 0, 1, 0.2, VolatilityKind::Lognormal).unwrap();
        let err = CascadeCalibrator::new(RebonatoSwaptionPricer::perfect(), CascadeConfig::default())
            .calibrate(&s, &[q, q])
            .unwrap_err();
        assert!(matches!(err, CalibrationError::InvalidInput(_)));
    }

    #[test]
    fn test_unattainable_quote_reports_best_estimate() {
        let s = schedule();
        let quotes = vec![SwaptionQuote::atm(&s, 0, 1, 5.0, VolatilityKind::Lognormal).unwrap()];
        let err = CascadeCalibrator::new(RebonatoSwaptionPricer::perfect(), CascadeConfig::default())
            .calibrate(&s, &quotes)
            .unwrap_err();
        match err {
            CalibrationError::NonConvergence {
                best_parameters,
                achieved_tolerance,
                ..
            } => {
                assert_eq!(best_parameters, vec![2.0]);
                assert!(achieved_tolerance > 0.0);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    // ========================================
    // Lattice round trip
    // ========================================

    #[test]
    fn test_lattice_cascade_round_trip() {
        let s = schedule();
        let quotes = triangular_quotes(&s, |start, _| 0.22 - 0.02 * start as f64);
        let pricer = LatticeSwaptionPricer::new(LatticeConfig::fast());
        let calibrator = CascadeCalibrator::new(pricer.clone(), CascadeConfig::default());
        let result = calibrator.calibrate(&s, &quotes).unwrap();

        let m = result.parameters.matrix();
        for quote in &quotes {
            let model = pricer.price(&s, m, quote).unwrap();
            assert_relative_eq!(model, quote.market_price(&s).unwrap(), epsilon = 1e-6);
        }
    }
}
