//! Cashflows in, price out.

use bgm_core::market_data::curves::{SurvivalCurve, YieldCurve};
use bgm_core::market_data::volatility::VolatilitySource;
use bgm_models::calibration::{
    CalibratedVolatilities, CalibrationResult, CascadeCalibrator, CascadeConfig, CascadeLayout,
    LatticeSwaptionPricer, RebonatoSwaptionPricer, SwaptionQuote,
};
use bgm_models::lattice::{LatticeBuilder, LatticeConfig};
use bgm_models::schedules::TenorSchedule;
use tracing::{debug, info};

use crate::cashflow::{CashflowSchedule, ExerciseStyle};
use crate::evaluator::{BermudanEvaluator, CallProbability, EvaluatorConfig};
use crate::swaption::{
    build_representations, SolverControls, SwaptionRepresentation, UnderlyingSwap,
};
use crate::EvaluationError;

/// Model price used by the co-terminal calibration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum CalibrationMethod {
    /// Reprice each swaption on the lattice itself
    #[default]
    Lattice,
    /// Rebonato's frozen-weights approximation with perfect correlation
    Rebonato,
}

/// End-to-end pricing controls.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct PipelineConfig {
    /// Lattice used for calibration and evaluation
    pub lattice: LatticeConfig,
    /// Co-terminal cascade controls
    pub cascade: CascadeConfig,
    /// Model price inside the cascade
    pub calibration: CalibrationMethod,
    /// Evaluator controls
    pub evaluator: EvaluatorConfig,
    /// Extra node dates per accrual period for American exercise
    pub american_substeps: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            lattice: LatticeConfig::default(),
            cascade: CascadeConfig::default().with_layout(CascadeLayout::CoTerminal),
            calibration: CalibrationMethod::Lattice,
            evaluator: EvaluatorConfig::default(),
            american_substeps: 4,
        }
    }
}

impl PipelineConfig {
    /// Coarse lattice and loose calibration.
    pub fn fast() -> Self {
        Self {
            lattice: LatticeConfig::fast(),
            cascade: CascadeConfig::fast().with_layout(CascadeLayout::CoTerminal),
            ..Self::default()
        }
    }

    fn controls(&self) -> SolverControls {
        SolverControls {
            accuracy: self.cascade.price_tolerance,
            steps: self.lattice.steps,
        }
    }
}

/// Price of a cashflow schedule with its embedded option.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PricingReport {
    /// Present value of coupons and principal
    pub cashflow_pv: f64,
    /// Value of the embedded option to its owner
    pub option_value: f64,
    /// `cashflow_pv` plus the option value signed by the holder
    pub total: f64,
    /// Exercise times considered
    pub exercise_times: Vec<f64>,
    /// European value of each exercise opportunity
    pub european_values: Vec<f64>,
    /// Per-date exercise probabilities, when tracked
    pub call_probabilities: Option<Vec<CallProbability>>,
    /// Root mean square price error of the calibration
    pub calibration_rmse: Option<f64>,
    /// Exercise date that triggered the unconditional-call override
    pub unconditional_call: Option<usize>,
}

impl PricingReport {
    fn bullet(cashflow_pv: f64) -> Self {
        Self {
            cashflow_pv,
            option_value: 0.0,
            total: cashflow_pv,
            exercise_times: Vec::new(),
            european_values: Vec::new(),
            call_probabilities: None,
            calibration_rmse: None,
            unconditional_call: None,
        }
    }
}

/// Outcome of calibrating a schedule's co-terminal swaptions.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CalibrationReport {
    /// Reset times of the calibrated rates
    pub reset_times: Vec<f64>,
    /// Exercise times whose swaptions were quoted
    pub exercise_times: Vec<f64>,
    /// Black volatility of each rate to its reset
    pub black_volatilities: Vec<f64>,
    /// Root mean square price error
    pub rmse: f64,
    /// Largest absolute price error
    pub max_error: f64,
    /// Whether every sweep met its tolerance
    pub converged: bool,
    /// Quotes excluded from the fit
    pub skipped_quotes: Vec<usize>,
}

struct Prepared {
    schedule: TenorSchedule,
    underlying: UnderlyingSwap,
    records: Vec<SwaptionRepresentation>,
    calibration: CalibrationResult<CalibratedVolatilities>,
}

/// Prices callable and puttable fixed-rate schedules on the BGM lattice.
///
/// The pricer builds one co-terminal swaption per exercise date, calibrates
/// the forward volatilities to them, builds the lattice and runs the
/// backward induction.
///
/// # Example
///
/// ```
/// use bgm_core::market_data::curves::FlatCurve;
/// use bgm_core::market_data::volatility::FlatVolatility;
/// use bgm_pricing::cashflow::CashflowSchedule;
/// use bgm_pricing::pipeline::{BermudanPricer, PipelineConfig};
///
/// let bond = CashflowSchedule::fixed_rate(&[0.0, 1.0, 2.0, 3.0, 4.0], 100.0, 0.04)
///     .unwrap()
///     .callable_from(1);
/// let pricer = BermudanPricer::new(PipelineConfig::fast());
/// let report = pricer
///     .price(&bond, &FlatCurve::new(0.03), &FlatVolatility::lognormal(0.2), None)
///     .unwrap();
///
/// assert!(report.option_value > 0.0);
/// assert!(report.total < report.cashflow_pv);
/// ```
#[derive(Debug, Clone, Default)]
pub struct BermudanPricer {
    config: PipelineConfig,
}

impl BermudanPricer {
    /// Pricer with `config`.
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    /// Pipeline configuration.
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Prices `cashflows` with discounting on `curve`, option volatilities
    /// from `vols` and, optionally, default risk from `survival`.
    ///
    /// Defaulted instruments value to zero and schedules without future
    /// exercise dates to their cashflow value.
    ///
    /// # Errors
    ///
    /// - [`EvaluationError::EmptyCashflow`] for a live schedule with no periods
    /// - calibration, lattice and market-data failures
    #[tracing::instrument(skip_all, fields(periods = cashflows.periods().len(), style = ?cashflows.style()))]
    pub fn price<C, V>(
        &self,
        cashflows: &CashflowSchedule,
        curve: &C,
        vols: &V,
        survival: Option<&dyn SurvivalCurve>,
    ) -> Result<PricingReport, EvaluationError>
    where
        C: YieldCurve<f64> + ?Sized,
        V: VolatilitySource + ?Sized,
    {
        if cashflows.is_defaulted() {
            debug!("defaulted instrument");
            return Ok(PricingReport::bullet(0.0));
        }
        if cashflows.is_empty() {
            return Err(EvaluationError::EmptyCashflow);
        }
        self.config.lattice.validate()?;
        self.config.cascade.validate()?;

        let cashflow_pv = cashflows.present_value(curve)?;
        let exercise = cashflows.exercise_periods();
        let Some(&first) = exercise.first() else {
            debug!(cashflow_pv, "no future exercise dates");
            return Ok(PricingReport::bullet(cashflow_pv));
        };

        let Prepared {
            schedule,
            underlying,
            records,
            calibration,
        } = self.prepare(cashflows, first, curve, vols, survival)?;
        let rmse = calibration.rmse();

        let extra_times = match cashflows.style() {
            ExerciseStyle::American => american_times(&schedule, self.config.american_substeps),
            _ => Vec::new(),
        };
        let lattice = LatticeBuilder::new(self.config.lattice).build(
            &schedule,
            calibration.parameters.curves(),
            &extra_times,
        )?;
        let result = BermudanEvaluator::new(self.config.evaluator).evaluate(
            &lattice,
            &underlying,
            &records,
            cashflows.style(),
        )?;

        let total = cashflow_pv + cashflows.holder().sign() * result.value;
        info!(
            cashflow_pv,
            option_value = result.value,
            total,
            calibration_rmse = rmse,
            "priced schedule"
        );
        Ok(PricingReport {
            cashflow_pv,
            option_value: result.value,
            total,
            exercise_times: records.iter().map(|r| r.exercise_time).collect(),
            european_values: result.european_values,
            call_probabilities: result.call_probabilities,
            calibration_rmse: Some(rmse),
            unconditional_call: result.unconditional_call,
        })
    }

    /// Calibrates the co-terminal volatilities of `cashflows` without
    /// evaluating the option.
    ///
    /// Returns `Ok(None)` when the schedule has no future exercise date.
    pub fn calibrate<C, V>(
        &self,
        cashflows: &CashflowSchedule,
        curve: &C,
        vols: &V,
        survival: Option<&dyn SurvivalCurve>,
    ) -> Result<Option<CalibrationReport>, EvaluationError>
    where
        C: YieldCurve<f64> + ?Sized,
        V: VolatilitySource + ?Sized,
    {
        if cashflows.is_empty() {
            return Err(EvaluationError::EmptyCashflow);
        }
        self.config.lattice.validate()?;
        self.config.cascade.validate()?;
        let Some(&first) = cashflows.exercise_periods().first() else {
            return Ok(None);
        };
        let prepared = self.prepare(cashflows, first, curve, vols, survival)?;
        let diagnostics = prepared.calibration.diagnostics();
        Ok(Some(CalibrationReport {
            reset_times: prepared.schedule.times()[..prepared.schedule.rate_count()].to_vec(),
            exercise_times: prepared.records.iter().map(|r| r.exercise_time).collect(),
            black_volatilities: prepared.calibration.parameters.black_volatilities(),
            rmse: diagnostics.rmse,
            max_error: diagnostics.max_error,
            converged: prepared.calibration.converged,
            skipped_quotes: diagnostics.skipped_quotes.clone(),
        }))
    }

    /// Schedule, swaption records and calibrated volatilities from the
    /// exercise period `first` onwards.
    fn prepare<C, V>(
        &self,
        cashflows: &CashflowSchedule,
        first: usize,
        curve: &C,
        vols: &V,
        survival: Option<&dyn SurvivalCurve>,
    ) -> Result<Prepared, EvaluationError>
    where
        C: YieldCurve<f64> + ?Sized,
        V: VolatilitySource + ?Sized,
    {
        let accruals: Vec<f64> = cashflows.periods()[first..]
            .iter()
            .map(|p| p.accrual)
            .collect();
        let schedule =
            TenorSchedule::from_curve_with_accruals(curve, cashflows.boundaries_from(first), accruals)?;
        let n = schedule.rate_count();
        let underlying = UnderlyingSwap::from_cashflows(cashflows, first);
        let exercise_rates: Vec<usize> = cashflows
            .exercise_periods()
            .iter()
            .map(|&i| i - first)
            .collect();
        let records = build_representations(
            &schedule,
            &underlying,
            &exercise_rates,
            cashflows.option_type(),
            curve,
            vols,
            survival,
            self.config.controls(),
        )?;

        let quotes: Vec<SwaptionQuote> = records.iter().map(|r| r.quote(n)).collect();
        let calibration = self.run_cascade(&schedule, &quotes)?;
        debug!(
            rates = n,
            exercise_dates = records.len(),
            rmse = calibration.rmse(),
            "calibrated co-terminal volatilities"
        );
        Ok(Prepared {
            schedule,
            underlying,
            records,
            calibration,
        })
    }

    fn run_cascade(
        &self,
        schedule: &TenorSchedule,
        quotes: &[SwaptionQuote],
    ) -> Result<CalibrationResult<CalibratedVolatilities>, EvaluationError> {
        let cascade = self.config.cascade.with_layout(CascadeLayout::CoTerminal);
        let result = match self.config.calibration {
            CalibrationMethod::Lattice => {
                CascadeCalibrator::new(LatticeSwaptionPricer::new(self.config.lattice), cascade)
                    .calibrate(schedule, quotes)?
            }
            CalibrationMethod::Rebonato => {
                CascadeCalibrator::new(RebonatoSwaptionPricer::perfect(), cascade)
                    .calibrate(schedule, quotes)?
            }
        };
        Ok(result)
    }
}

/// Evenly spaced node times strictly inside each accrual period up to the
/// last reset.
fn american_times(schedule: &TenorSchedule, substeps: usize) -> Vec<f64> {
    let times = schedule.times();
    let n = schedule.rate_count();
    let mut extra = Vec::with_capacity(substeps * n.saturating_sub(1));
    for w in times[..n].windows(2) {
        let width = (w[1] - w[0]) / (substeps + 1) as f64;
        extra.extend((1..=substeps).map(|i| w[0] + i as f64 * width));
    }
    extra
}
