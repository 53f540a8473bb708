//! Check command implementation
//!
//! Validates the default library settings and, when given, a deal file:
//! the instrument schedule, its market objects and all control sections.

use bgm_pricing::pipeline::PipelineConfig;
use bgm_pricing::spread::SpreadSolverConfig;
use tracing::info;

use crate::config::DealConfig;
use crate::{CliError, Result};

/// Run the check command
pub fn run(deal: Option<&str>) -> Result<()> {
    info!("checking configuration");
    check_defaults()?;
    println!("bgm {}: library defaults OK", env!("CARGO_PKG_VERSION"));

    if let Some(path) = deal {
        let config = super::load_deal(path)?;
        let summary = check_deal(&config)?;
        println!("{path}: {summary}");
    }
    Ok(())
}

fn check_defaults() -> Result<()> {
    let pipeline = PipelineConfig::default();
    pipeline
        .lattice
        .validate()
        .map_err(|e| CliError::InvalidArgument(e.to_string()))?;
    pipeline
        .cascade
        .validate()
        .map_err(|e| CliError::InvalidArgument(e.to_string()))?;
    SpreadSolverConfig::default().validate()?;
    Ok(())
}

/// Builds everything a deal needs and summarises it.
pub fn check_deal(config: &DealConfig) -> Result<String> {
    let cashflows = config.instrument.cashflows()?;
    let market = config.market()?;
    let pv = cashflows.present_value(market.curve())?;
    Ok(format!(
        "{} period(s), {} exercise date(s), cashflow PV {:.6}{}",
        cashflows.periods().len(),
        cashflows.exercise_periods().len(),
        pv,
        if market.survival().is_some() { ", with credit" } else { "" }
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_pass() {
        assert!(check_defaults().is_ok());
    }

    #[test]
    fn test_sample_deal_summary() {
        let config =
            DealConfig::from_toml_str(include_str!("../../deals/callable_bond.toml")).unwrap();
        let summary = check_deal(&config).unwrap();
        assert!(summary.starts_with("8 period(s), 6 exercise date(s)"));
        assert!(summary.ends_with("with credit"));
    }
}
