//! Solve-spread command implementation
//!
//! Finds the parallel spread over the discount or survival curve at which
//! the model price of the deal matches a target price.

use bgm_pricing::pipeline::{BermudanPricer, OasSolver};
use bgm_pricing::spread::{SpreadSolution, SpreadSolver};
use clap::ValueEnum;
use tracing::info;

use super::OutputFormat;
use crate::config::DealConfig;
use crate::{CliError, Result};

/// Curve receiving the parallel spread
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum SpreadCurve {
    /// Discount factors scaled by `exp(-s t)`
    #[default]
    Discount,
    /// Hazard rate shifted by `s`
    Survival,
}

/// Run the solve-spread command
pub fn run(
    deal: &str,
    format: OutputFormat,
    target: Option<f64>,
    curve: SpreadCurve,
) -> Result<()> {
    info!(deal, ?curve, "starting spread solve");
    let config = super::load_deal(deal)?;
    let solution = solve_deal(&config, target, curve)?;

    match format {
        OutputFormat::Json => super::print_json(&solution)?,
        OutputFormat::Text => {
            println!("\nSpread        {:>12.6} ({:.2} bp)", solution.spread, solution.spread * 1e4);
            println!("Model price   {:>12.6}", solution.model_price);
            println!("Target price  {:>12.6}", solution.target_price);
            println!("Residual      {:>12.3e}", solution.residual);
            println!("Evaluations   {:>12}", solution.evaluations);
        }
    }
    info!(spread = solution.spread, "spread solve complete");
    Ok(())
}

/// Solves the spread of a loaded deal against `target`, falling back to the
/// deal's `target_price`.
pub fn solve_deal(
    config: &DealConfig,
    target: Option<f64>,
    curve: SpreadCurve,
) -> Result<SpreadSolution> {
    let target = target.or(config.target_price).ok_or_else(|| {
        CliError::InvalidArgument("no target price: pass --target or set target_price".to_string())
    })?;
    let cashflows = config.instrument.cashflows()?;
    let market = config.market()?;
    let solver = OasSolver::with_solver(
        BermudanPricer::new(config.pipeline),
        SpreadSolver::new(config.spread),
    );

    let solution = match curve {
        SpreadCurve::Discount => solver.solve_discount(
            &cashflows,
            &market.curve(),
            market.vols(),
            market.survival(),
            target,
        )?,
        SpreadCurve::Survival => {
            let hazard = market.hazard().ok_or_else(|| {
                CliError::InvalidArgument(
                    "a survival spread needs a [credit] section in the deal".to_string(),
                )
            })?;
            solver.solve_survival(&cashflows, market.curve(), market.vols(), hazard, target)?
        }
    };
    Ok(solution)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::price::price_deal;
    use approx::assert_relative_eq;

    const DEAL: &str = include_str!("../../deals/callable_bond.toml");

    #[test]
    fn test_model_price_gives_zero_spread() {
        let config = DealConfig::from_toml_str(DEAL).unwrap();
        let model = price_deal(&config, false).unwrap().total;
        let solution = solve_deal(&config, Some(model), SpreadCurve::Discount).unwrap();
        assert_relative_eq!(solution.spread, 0.0, epsilon = 1e-7);
    }

    #[test]
    fn test_missing_target_is_rejected() {
        let content = DEAL.replace("target_price = 101.5", "");
        let config = DealConfig::from_toml_str(&content).unwrap();
        assert!(matches!(
            solve_deal(&config, None, SpreadCurve::Discount),
            Err(CliError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_survival_spread_needs_credit() {
        let start = DEAL.find("[credit]").unwrap();
        let end = DEAL.find("[pipeline]").unwrap();
        let content = format!("{}{}", &DEAL[..start], &DEAL[end..]);
        let config = DealConfig::from_toml_str(&content).unwrap();
        assert!(matches!(
            solve_deal(&config, Some(100.0), SpreadCurve::Survival),
            Err(CliError::InvalidArgument(_))
        ));
    }
}
