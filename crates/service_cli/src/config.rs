//! Deal file loading
//!
//! A deal file is a TOML document describing one instrument, its market and
//! the pricing controls:
//!
//! ```toml
//! [instrument]
//! notional = 100.0
//! coupon = 0.04
//! times = [0.0, 1.0, 2.0, 3.0]
//! first_exercise = 1
//!
//! [curve]
//! type = "flat"
//! rate = 0.03
//!
//! [volatility]
//! type = "flat"
//! sigma = 0.2
//! ```
//!
//! `[pipeline]` and `[spread]` are optional and default to the library
//! settings. `BGM_STEPS` and `BGM_TAIL_CUTOFF` override the lattice settings
//! read from the file; the result is validated before use.

use std::path::Path;
use std::str::FromStr;

use bgm_core::market_data::curves::{
    FlatCurve, FlatHazardCurve, PillarCurve, SurvivalCurve, YieldCurve,
};
use bgm_core::market_data::volatility::{
    FlatVolatility, TermStructureVolatility, VolatilityKind, VolatilitySource,
};
use bgm_core::market_data::MarketDataError;
use bgm_core::types::{Date, DayCountConvention};
use bgm_models::analytical::OptionType;
use bgm_pricing::cashflow::{CashflowSchedule, ExerciseStyle, OptionHolder};
use bgm_pricing::pipeline::PipelineConfig;
use bgm_pricing::spread::SpreadSolverConfig;
use bgm_pricing::EvaluationError;
use serde::Deserialize;
use thiserror::Error;

/// Overrides the lattice step count.
pub const ENV_STEPS: &str = "BGM_STEPS";
/// Overrides the lattice probability cutoff.
pub const ENV_TAIL_CUTOFF: &str = "BGM_TAIL_CUTOFF";
/// Log filter used when `--log-level` is absent.
pub const ENV_LOG: &str = "BGM_LOG";

/// Configuration error types
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration file error: {0}")]
    FileError(String),

    #[error("Failed to parse deal file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Environment variable {name} has invalid value {value:?}")]
    EnvError { name: &'static str, value: String },

    #[error("Invalid log level: {0}. Must be one of: trace, debug, info, warn, error")]
    InvalidLogLevel(String),

    #[error("Invalid deal: {0}")]
    Invalid(String),
}

/// Log levels accepted by `--log-level` and `BGM_LOG`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl FromStr for LogLevel {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "trace" => Ok(LogLevel::Trace),
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            _ => Err(ConfigError::InvalidLogLevel(s.to_string())),
        }
    }
}

impl LogLevel {
    /// Convert log level to tracing filter string
    pub fn as_filter_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_filter_str())
    }
}

/// Fixed-rate instrument with its embedded option.
///
/// Period boundaries come either from `dates` (with `valuation_date` and
/// `day_count`) or directly from `times` in years. Without
/// `first_exercise` the instrument is not callable.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InstrumentConfig {
    pub notional: f64,
    pub coupon: f64,
    #[serde(default)]
    pub times: Vec<f64>,
    pub valuation_date: Option<Date>,
    #[serde(default)]
    pub dates: Vec<Date>,
    #[serde(default)]
    pub day_count: DayCountConvention,
    pub first_exercise: Option<usize>,
    #[serde(default)]
    pub style: ExerciseStyle,
    #[serde(default)]
    pub holder: OptionHolder,
    pub option_type: Option<OptionType>,
    #[serde(default)]
    pub defaulted: bool,
}

impl InstrumentConfig {
    /// Cashflow schedule described by this section.
    pub fn cashflows(&self) -> Result<CashflowSchedule, EvaluationError> {
        let mut schedule = if !self.dates.is_empty() {
            let valuation = self.valuation_date.unwrap_or(self.dates[0]);
            CashflowSchedule::from_dates(
                valuation,
                &self.dates,
                self.day_count,
                self.notional,
                self.coupon,
            )?
        } else {
            CashflowSchedule::fixed_rate(&self.times, self.notional, self.coupon)?
        };
        if let Some(first) = self.first_exercise {
            schedule = schedule.callable_from(first);
        }
        schedule = schedule.with_style(self.style).with_holder(self.holder);
        if let Some(option_type) = self.option_type {
            schedule = schedule.with_option_type(option_type);
        }
        if self.defaulted {
            schedule = schedule.defaulted();
        }
        Ok(schedule)
    }
}

/// Discount curve section.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CurveConfig {
    Flat { rate: f64 },
    ZeroRates { times: Vec<f64>, rates: Vec<f64> },
    DiscountFactors { times: Vec<f64>, discount_factors: Vec<f64> },
}

impl CurveConfig {
    fn build(&self) -> Result<Box<dyn YieldCurve<f64>>, MarketDataError> {
        Ok(match self {
            CurveConfig::Flat { rate } => Box::new(FlatCurve::new(*rate)),
            CurveConfig::ZeroRates { times, rates } => {
                Box::new(PillarCurve::from_zero_rates(times, rates)?)
            }
            CurveConfig::DiscountFactors {
                times,
                discount_factors,
            } => Box::new(PillarCurve::from_discount_factors(times, discount_factors)?),
        })
    }
}

/// Swaption volatility section.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum VolatilityConfig {
    Flat {
        sigma: f64,
        #[serde(default)]
        kind: VolatilityKind,
    },
    TermStructure {
        expiries: Vec<f64>,
        vols: Vec<f64>,
        #[serde(default)]
        kind: VolatilityKind,
    },
}

impl VolatilityConfig {
    fn build(&self) -> Result<Box<dyn VolatilitySource>, MarketDataError> {
        Ok(match self {
            VolatilityConfig::Flat { sigma, kind } => Box::new(FlatVolatility::new(*sigma, *kind)),
            VolatilityConfig::TermStructure {
                expiries,
                vols,
                kind,
            } => Box::new(TermStructureVolatility::new(
                expiries.clone(),
                vols.clone(),
                *kind,
            )?),
        })
    }
}

fn default_recovery() -> f64 {
    0.4
}

/// Issuer credit section: a flat hazard rate and recovery.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreditConfig {
    pub hazard_rate: f64,
    #[serde(default = "default_recovery")]
    pub recovery: f64,
}

/// Market objects built from a deal file.
pub struct Market {
    curve: Box<dyn YieldCurve<f64>>,
    vols: Box<dyn VolatilitySource>,
    survival: Option<FlatHazardCurve>,
}

impl Market {
    pub fn curve(&self) -> &dyn YieldCurve<f64> {
        self.curve.as_ref()
    }

    pub fn vols(&self) -> &dyn VolatilitySource {
        self.vols.as_ref()
    }

    pub fn hazard(&self) -> Option<&FlatHazardCurve> {
        self.survival.as_ref()
    }

    pub fn survival(&self) -> Option<&dyn SurvivalCurve> {
        self.survival.as_ref().map(|s| s as &dyn SurvivalCurve)
    }
}

/// A complete deal file.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DealConfig {
    pub instrument: InstrumentConfig,
    pub curve: CurveConfig,
    pub volatility: VolatilityConfig,
    pub credit: Option<CreditConfig>,
    #[serde(default)]
    pub pipeline: PipelineConfig,
    #[serde(default)]
    pub spread: SpreadSolverConfig,
    /// Market price matched by `solve-spread` when `--target` is absent
    pub target_price: Option<f64>,
}

impl DealConfig {
    /// Load, apply environment overrides and validate.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::FileError(format!("Failed to read deal file: {}", e)))?;
        let mut config = Self::from_toml_str(&content)?;
        config.apply_overrides(|name| std::env::var(name).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Parse without overrides or validation.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Apply `BGM_*` overrides read through `lookup`.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup(ENV_STEPS) {
            self.pipeline.lattice.steps = value.trim().parse().map_err(|_| ConfigError::EnvError {
                name: ENV_STEPS,
                value,
            })?;
        }
        if let Some(value) = lookup(ENV_TAIL_CUTOFF) {
            self.pipeline.lattice.tail_cutoff =
                value.trim().parse().map_err(|_| ConfigError::EnvError {
                    name: ENV_TAIL_CUTOFF,
                    value,
                })?;
        }
        Ok(())
    }

    /// Validate the deal and every control section.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let instrument = &self.instrument;
        if !(instrument.notional >= 0.0) || !instrument.coupon.is_finite() {
            return Err(ConfigError::Invalid(format!(
                "notional {} and coupon {} must be finite with a non-negative notional",
                instrument.notional, instrument.coupon
            )));
        }
        if instrument.dates.is_empty() && instrument.times.len() < 2 {
            return Err(ConfigError::Invalid(
                "instrument needs at least two `dates` or `times`".to_string(),
            ));
        }
        if !instrument.dates.is_empty() && !instrument.times.is_empty() {
            return Err(ConfigError::Invalid(
                "instrument takes either `dates` or `times`, not both".to_string(),
            ));
        }
        if let Some(credit) = &self.credit {
            FlatHazardCurve::new(credit.hazard_rate, credit.recovery)
                .map_err(|e| ConfigError::Invalid(format!("credit: {e}")))?;
        }
        if let Some(target) = self.target_price {
            if !target.is_finite() {
                return Err(ConfigError::Invalid(format!("target price {target}")));
            }
        }
        self.pipeline
            .lattice
            .validate()
            .map_err(|e| ConfigError::Invalid(format!("pipeline.lattice: {e}")))?;
        self.pipeline
            .cascade
            .validate()
            .map_err(|e| ConfigError::Invalid(format!("pipeline.cascade: {e}")))?;
        self.spread
            .validate()
            .map_err(|e| ConfigError::Invalid(format!("spread: {e}")))?;
        Ok(())
    }

    /// Discount curve, volatilities and optional survival curve.
    pub fn market(&self) -> Result<Market, MarketDataError> {
        let survival = self
            .credit
            .as_ref()
            .map(|c| FlatHazardCurve::new(c.hazard_rate, c.recovery))
            .transpose()?;
        Ok(Market {
            curve: self.curve.build()?,
            vols: self.volatility.build()?,
            survival,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use bgm_pricing::pipeline::CalibrationMethod;
    use std::collections::HashMap;

    const SAMPLE: &str = include_str!("../deals/callable_bond.toml");

    const MINIMAL: &str = r#"
        [instrument]
        notional = 100.0
        coupon = 0.04
        times = [0.0, 1.0, 2.0, 3.0]
        first_exercise = 1

        [curve]
        type = "flat"
        rate = 0.03

        [volatility]
        type = "flat"
        sigma = 0.2
    "#;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    // ========================================
    // Parsing
    // ========================================

    #[test]
    fn test_sample_deal_parses() {
        let deal = DealConfig::from_toml_str(SAMPLE).unwrap();
        deal.validate().unwrap();
        assert_eq!(deal.instrument.dates.len(), 9);
        assert_eq!(deal.instrument.day_count, DayCountConvention::Thirty360);
        assert_eq!(deal.instrument.first_exercise, Some(2));
        assert_eq!(deal.pipeline.calibration, CalibrationMethod::Rebonato);
        assert_eq!(deal.pipeline.lattice.steps, 60);
        assert_eq!(deal.target_price, Some(101.5));

        let cashflows = deal.instrument.cashflows().unwrap();
        assert_eq!(cashflows.periods().len(), 8);
        assert_eq!(cashflows.exercise_periods().len(), 6);
        assert_relative_eq!(cashflows.periods()[0].accrual, 0.5, epsilon = 1e-12);
    }

    #[test]
    fn test_minimal_deal_uses_defaults() {
        let deal = DealConfig::from_toml_str(MINIMAL).unwrap();
        deal.validate().unwrap();
        assert_eq!(deal.pipeline, PipelineConfig::default());
        assert_eq!(deal.spread, SpreadSolverConfig::default());
        assert!(deal.credit.is_none());
        assert_eq!(deal.instrument.style, ExerciseStyle::Bermudan);

        let market = deal.market().unwrap();
        assert!(market.survival().is_none());
        assert_relative_eq!(
            market.curve().discount_factor(1.0).unwrap(),
            (-0.03_f64).exp(),
            epsilon = 1e-14
        );
    }

    #[test]
    fn test_unknown_field_rejected() {
        let content = MINIMAL.replace("coupon = 0.04", "coupon = 0.04\nfrequency = 2");
        assert!(matches!(
            DealConfig::from_toml_str(&content),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_non_callable_without_first_exercise() {
        let content = MINIMAL.replace("first_exercise = 1", "");
        let deal = DealConfig::from_toml_str(&content).unwrap();
        let cashflows = deal.instrument.cashflows().unwrap();
        assert!(cashflows.exercise_periods().is_empty());
    }

    // ========================================
    // Environment overrides
    // ========================================

    #[test]
    fn test_env_overrides_lattice() {
        let mut deal = DealConfig::from_toml_str(SAMPLE).unwrap();
        deal.apply_overrides(env(&[(ENV_STEPS, "250"), (ENV_TAIL_CUTOFF, "1e-10")]))
            .unwrap();
        assert_eq!(deal.pipeline.lattice.steps, 250);
        assert_eq!(deal.pipeline.lattice.tail_cutoff, 1e-10);
    }

    #[test]
    fn test_env_override_rejects_garbage() {
        let mut deal = DealConfig::from_toml_str(MINIMAL).unwrap();
        let err = deal
            .apply_overrides(env(&[(ENV_STEPS, "many")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::EnvError { name: ENV_STEPS, .. }));
    }

    #[test]
    fn test_missing_env_leaves_file_values() {
        let mut deal = DealConfig::from_toml_str(SAMPLE).unwrap();
        deal.apply_overrides(env(&[])).unwrap();
        assert_eq!(deal.pipeline.lattice.steps, 60);
    }

    // ========================================
    // Validation
    // ========================================

    #[test]
    fn test_validation_failures() {
        let mut deal = DealConfig::from_toml_str(MINIMAL).unwrap();
        deal.pipeline.lattice.tail_cutoff = 0.7;
        assert!(matches!(deal.validate(), Err(ConfigError::Invalid(_))));

        let mut deal = DealConfig::from_toml_str(MINIMAL).unwrap();
        deal.instrument.times = vec![0.0];
        assert!(deal.validate().is_err());

        let mut deal = DealConfig::from_toml_str(MINIMAL).unwrap();
        deal.credit = Some(CreditConfig {
            hazard_rate: -0.01,
            recovery: 0.4,
        });
        assert!(deal.validate().is_err());
    }

    #[test]
    fn test_log_level_parsing() {
        assert_eq!(LogLevel::from_str("trace").unwrap(), LogLevel::Trace);
        assert_eq!(LogLevel::from_str("DEBUG").unwrap(), LogLevel::Debug);
        assert_eq!(LogLevel::from_str("Warn").unwrap(), LogLevel::Warn);
        assert!(LogLevel::from_str("loud").is_err());
    }
}
