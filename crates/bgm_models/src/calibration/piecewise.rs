//! Global piecewise-constant parametric volatility fit.

use std::time::Instant;

use bgm_core::market_data::volatility::VolatilityKind;
use bgm_core::math::solvers::{LMConfig, LeastSquaresSolver, LevenbergMarquardtSolver, ParameterBound};
use bgm_core::types::PricingError;
use tracing::{debug, info};

use super::{
    CalibratedVolatilities, CalibrationDiagnostics, CalibrationError, CalibrationResult,
    SwaptionModelPricer, SwaptionQuote, SwaptionVolatilityMatrix,
};
use crate::lattice::Distribution;
use crate::schedules::TenorSchedule;
use crate::volatility::{CorrelationStructure, ExponentialCorrelation, ForwardVolatilityMatrix};

/// Residual reported for every quote when a trial point cannot be priced.
const FAILED_RESIDUAL: f64 = 1.0;

/// How the period factor is indexed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Homogeneity {
    /// `σ[i, j] = Ψ_i · Φ_j`: the factor depends on calendar period.
    #[default]
    Time,
    /// `σ[i, j] = Ψ_i · Φ_{i − j}`: the factor depends on time to reset.
    Length,
}

/// Piecewise-constant fit configuration.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PiecewiseConfig {
    /// Factorisation of the volatility matrix
    pub homogeneity: Homogeneity,
    /// Also fit the three exponential correlation parameters
    pub fit_correlation: bool,
    /// Largest accepted RMSE of the annuity-normalised price errors
    pub tolerance: f64,
    /// Weight of the second-difference penalty on `Φ`
    pub smoothness: f64,
    /// Box on every `Ψ_i`
    pub psi_bounds: ParameterBound,
    /// Box on every `Φ_k`, `k >= 1`
    pub phi_bounds: ParameterBound,
    /// Boxes on `(ρ∞, β, α)`
    pub correlation_bounds: [ParameterBound; 3],
    /// Starting correlation when it is fitted
    pub initial_correlation: ExponentialCorrelation,
    /// Optimiser controls
    pub solver: LMConfig,
}

impl Default for PiecewiseConfig {
    fn default() -> Self {
        Self {
            homogeneity: Homogeneity::Time,
            fit_correlation: false,
            tolerance: 1e-4,
            smoothness: 0.0,
            psi_bounds: ParameterBound::new(1e-4, 3.0),
            phi_bounds: ParameterBound::new(0.05, 5.0),
            correlation_bounds: [
                ParameterBound::new(0.0, 1.0),
                ParameterBound::new(0.0, 5.0),
                ParameterBound::new(0.0, 2.0),
            ],
            initial_correlation: ExponentialCorrelation {
                long_term: 0.5,
                beta: 0.1,
                alpha: 0.0,
            },
            solver: LMConfig::default(),
        }
    }
}

impl PiecewiseConfig {
    /// Relaxed optimiser and tolerance.
    pub fn fast() -> Self {
        Self {
            tolerance: 1e-3,
            solver: LMConfig::fast(),
            ..Self::default()
        }
    }

    /// Tight optimiser and tolerance.
    pub fn high_precision() -> Self {
        Self {
            tolerance: 1e-6,
            solver: LMConfig::high_precision(),
            ..Self::default()
        }
    }

    /// Same configuration with a different homogeneity.
    pub fn with_homogeneity(mut self, homogeneity: Homogeneity) -> Self {
        self.homogeneity = homogeneity;
        self
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), CalibrationError> {
        if !(self.tolerance > 0.0) {
            return Err(CalibrationError::InvalidInput(format!(
                "tolerance must be positive, got {}",
                self.tolerance
            )));
        }
        if !(self.smoothness >= 0.0) {
            return Err(CalibrationError::InvalidInput(format!(
                "smoothness weight must be non-negative, got {}",
                self.smoothness
            )));
        }
        let boxes = [self.psi_bounds, self.phi_bounds];
        if boxes.iter().any(|b| !(b.lower >= 0.0) || !(b.upper > b.lower)) {
            return Err(CalibrationError::InvalidInput(
                "volatility factor bounds must be non-negative and non-empty".to_string(),
            ));
        }
        if self.correlation_bounds.iter().any(|b| !(b.upper >= b.lower)) {
            return Err(CalibrationError::InvalidInput(
                "correlation bounds must be non-empty".to_string(),
            ));
        }
        self.initial_correlation.validate()?;
        Ok(())
    }
}

/// Compact result of the piecewise fit.
///
/// `phi[0]` is pinned to one; the full matrix is only materialised by
/// [`expand`](Self::expand).
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PiecewiseConstantParameters {
    /// Factorisation used
    pub homogeneity: Homogeneity,
    /// Reset dates `T_0..T_{n-1}`
    pub period_ends: Vec<f64>,
    /// Rate factors `Ψ_i`
    pub psi: Vec<f64>,
    /// Period factors `Φ_k`
    pub phi: Vec<f64>,
    /// Fitted correlation parameters, when fitted
    pub correlation_parameters: Option<ExponentialCorrelation>,
    /// Correlation structure over the rates
    pub correlation: CorrelationStructure,
}

impl PiecewiseConstantParameters {
    /// `σ[i, j]` for every `j <= i`.
    pub fn expand(&self) -> Result<ForwardVolatilityMatrix, CalibrationError> {
        let n = self.period_ends.len();
        if self.psi.len() != n || self.phi.len() != n {
            return Err(CalibrationError::DimensionMismatch {
                expected: n,
                got: self.psi.len().min(self.phi.len()),
                context: "piecewise factors",
            });
        }
        let rows: Vec<Vec<f64>> = (0..n)
            .map(|i| {
                (0..=i)
                    .map(|j| {
                        let k = match self.homogeneity {
                            Homogeneity::Time => j,
                            Homogeneity::Length => i - j,
                        };
                        self.psi[i] * self.phi[k]
                    })
                    .collect()
            })
            .collect();
        Ok(ForwardVolatilityMatrix::from_rows(self.period_ends.clone(), &rows)?)
    }

    /// Matrix, curves and correlation in the shared output form.
    pub fn to_volatilities(&self) -> Result<CalibratedVolatilities, CalibrationError> {
        CalibratedVolatilities::new(self.expand()?, self.correlation.clone())
    }
}

/// Packing of `(Ψ, Φ_1.., ρ∞, β, α)` into the optimiser's vector.
#[derive(Debug, Clone, Copy)]
struct ParameterLayout {
    rates: usize,
    fit_correlation: bool,
}

impl ParameterLayout {
    fn len(&self) -> usize {
        2 * self.rates - 1 + if self.fit_correlation { 3 } else { 0 }
    }

    fn phi(&self, params: &[f64]) -> Vec<f64> {
        std::iter::once(1.0)
            .chain(params[self.rates..2 * self.rates - 1].iter().copied())
            .collect()
    }

    fn initial(&self, seed: f64, config: &PiecewiseConfig) -> Vec<f64> {
        let mut params = vec![config.psi_bounds.project(seed); self.rates];
        params.extend(std::iter::repeat(config.phi_bounds.project(1.0)).take(self.rates - 1));
        if self.fit_correlation {
            let c = config.initial_correlation;
            params.extend([c.long_term, c.beta, c.alpha]);
        }
        params
    }

    fn bounds(&self, config: &PiecewiseConfig) -> Vec<ParameterBound> {
        let mut bounds = vec![config.psi_bounds; self.rates];
        bounds.extend(std::iter::repeat(config.phi_bounds).take(self.rates - 1));
        if self.fit_correlation {
            bounds.extend(config.correlation_bounds);
        }
        bounds
    }

    fn table(
        &self,
        homogeneity: Homogeneity,
        period_ends: &[f64],
        params: &[f64],
        fixed: &CorrelationStructure,
    ) -> Result<PiecewiseConstantParameters, PricingError> {
        if params.len() != self.len() {
            return Err(PricingError::InvalidInput(format!(
                "{} parameters for a layout of {}",
                params.len(),
                self.len()
            )));
        }
        let (correlation_parameters, correlation) = if self.fit_correlation {
            let c = &params[2 * self.rates - 1..];
            let generator = ExponentialCorrelation::new(c[0], c[1], c[2])?;
            (
                Some(generator),
                CorrelationStructure::exponential(generator, period_ends)?,
            )
        } else {
            (None, fixed.clone())
        };
        Ok(PiecewiseConstantParameters {
            homogeneity,
            period_ends: period_ends.to_vec(),
            psi: params[..self.rates].to_vec(),
            phi: self.phi(params),
            correlation_parameters,
            correlation,
        })
    }
}

/// Fits `Ψ`, `Φ` (and optionally the correlation) to swaption prices.
///
/// The objective is the vector of model-minus-market prices divided by each
/// swap's level, plus `sqrt(smoothness)` times the second differences of
/// `Φ`. The minimisation is delegated to a [`LeastSquaresSolver`]; the fit
/// is accepted when the RMSE of the price residuals is within `tolerance`.
#[derive(Debug, Clone)]
pub struct PiecewiseCalibrator<P, L = LevenbergMarquardtSolver> {
    pricer: P,
    solver: L,
    config: PiecewiseConfig,
}

impl<P: SwaptionModelPricer> PiecewiseCalibrator<P> {
    /// Calibrator using Levenberg–Marquardt with `config.solver`.
    pub fn new(pricer: P, config: PiecewiseConfig) -> Self {
        Self {
            pricer,
            solver: LevenbergMarquardtSolver::new(config.solver),
            config,
        }
    }
}

impl<P: SwaptionModelPricer, L: LeastSquaresSolver> PiecewiseCalibrator<P, L> {
    /// Calibrator with an injected least-squares solver.
    pub fn with_solver(pricer: P, solver: L, config: PiecewiseConfig) -> Self {
        Self {
            pricer,
            solver,
            config,
        }
    }

    /// Configuration.
    pub fn config(&self) -> &PiecewiseConfig {
        &self.config
    }

    /// Fits the swaptions a market matrix quotes on `schedule`.
    pub fn calibrate_matrix(
        &self,
        schedule: &TenorSchedule,
        market: &SwaptionVolatilityMatrix,
    ) -> Result<CalibrationResult<PiecewiseConstantParameters>, CalibrationError> {
        let quotes = market.quotes_for(schedule)?;
        self.calibrate(schedule, &quotes)
    }

    /// Fits `quotes`.
    ///
    /// # Errors
    ///
    /// - [`CalibrationError::NotSupported`] for non-lognormal pricers
    /// - [`CalibrationError::InvalidInput`] for bad configuration or when no
    ///   quote carries a positive volatility
    /// - [`CalibrationError::NonConvergence`] when the RMSE stays above
    ///   `tolerance`, carrying the optimiser's final vector
    #[tracing::instrument(skip_all, fields(rates = schedule.rate_count(), quotes = quotes.len()))]
    pub fn calibrate(
        &self,
        schedule: &TenorSchedule,
        quotes: &[SwaptionQuote],
    ) -> Result<CalibrationResult<PiecewiseConstantParameters>, CalibrationError> {
        let started = Instant::now();
        self.config.validate()?;
        if self.pricer.distribution() != Distribution::Lognormal {
            return Err(CalibrationError::NotSupported(format!(
                "piecewise calibration supports lognormal dynamics only, got {:?}",
                self.pricer.distribution()
            )));
        }
        for quote in quotes {
            quote.validate(schedule)?;
        }
        let (active, skipped): (Vec<usize>, Vec<usize>) = (0..quotes.len())
            .partition(|&q| quotes[q].is_quoted() && quotes[q].expiry(schedule) > 0.0);
        if active.is_empty() {
            return Err(CalibrationError::InvalidInput(
                "no swaption quote with a positive volatility".to_string(),
            ));
        }
        let targets = active
            .iter()
            .map(|&q| quotes[q].market_price(schedule))
            .collect::<Result<Vec<_>, _>>()?;

        let n = schedule.rate_count();
        let period_ends = schedule.times()[..n].to_vec();
        let layout = ParameterLayout {
            rates: n,
            fit_correlation: self.config.fit_correlation,
        };
        let fixed = self.pricer.correlation(schedule);
        let homogeneity = self.config.homogeneity;

        let pricing_errors = |params: &[f64]| -> Result<Vec<f64>, CalibrationError> {
            let table = layout.table(homogeneity, &period_ends, params, &fixed)?;
            let matrix = table.expand()?;
            active
                .iter()
                .zip(&targets)
                .map(|(&q, &target)| -> Result<f64, CalibrationError> {
                    let quote = &quotes[q];
                    let level = schedule.level(quote.start, quote.end);
                    let model = self
                        .pricer
                        .price_with_correlation(schedule, &matrix, &table.correlation, quote)?;
                    Ok((model - target) / level)
                })
                .collect()
        };
        let weight = self.config.smoothness.sqrt();
        let residuals = |params: &[f64]| -> Vec<f64> {
            let mut r = pricing_errors(params).unwrap_or_else(|_| vec![FAILED_RESIDUAL; active.len()]);
            if weight > 0.0 {
                let phi = layout.phi(params);
                r.extend(phi.windows(3).map(|w| weight * (w[2] - 2.0 * w[1] + w[0])));
            }
            r
        };

        let seed = seed_volatility(schedule, quotes, &active);
        let fit = self
            .solver
            .minimise(&residuals, layout.initial(seed, &self.config), &layout.bounds(&self.config))
            .map_err(PricingError::from)?;
        debug!(
            iterations = fit.iterations,
            residual_ss = fit.residual_ss,
            converged = fit.converged,
            "least-squares fit finished"
        );

        let errors = pricing_errors(&fit.params)?;
        let diagnostics = CalibrationDiagnostics::new(fit.iterations, started.elapsed())
            .with_instrument_errors(errors)
            .with_skipped_quotes(skipped);
        if diagnostics.rmse > self.config.tolerance {
            return Err(CalibrationError::NonConvergence {
                message: format!(
                    "piecewise fit RMSE {:.3e} above tolerance {:.3e}",
                    diagnostics.rmse, self.config.tolerance
                ),
                best_parameters: fit.params,
                achieved_tolerance: diagnostics.rmse,
            });
        }
        info!(
            iterations = fit.iterations,
            rmse = diagnostics.rmse,
            "piecewise calibration finished"
        );
        let table = layout.table(homogeneity, &period_ends, &fit.params, &fixed)?;
        Ok(CalibrationResult::success(table, diagnostics))
    }
}

/// Mean lognormal-equivalent quote volatility.
fn seed_volatility(schedule: &TenorSchedule, quotes: &[SwaptionQuote], active: &[usize]) -> f64 {
    let vols: Vec<f64> = active
        .iter()
        .filter_map(|&q| {
            let quote = &quotes[q];
            match quote.kind {
                VolatilityKind::Lognormal => Some(quote.volatility),
                VolatilityKind::Normal => {
                    let forward = schedule.swap_rate(quote.start, quote.end);
                    (forward > 0.0).then(|| quote.volatility / forward)
                }
            }
        })
        .collect();
    if vols.is_empty() {
        return 0.2;
    }
    vols.iter().sum::<f64>() / vols.len() as f64
}
