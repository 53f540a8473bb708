//! Price command implementation
//!
//! Prices the deal's instrument with its embedded option through the full
//! calibration and lattice pipeline.

use bgm_pricing::pipeline::{BermudanPricer, PricingReport};
use tracing::info;

use super::OutputFormat;
use crate::config::DealConfig;
use crate::Result;

/// Run the price command
pub fn run(deal: &str, format: OutputFormat, call_probabilities: bool) -> Result<()> {
    info!(deal, "starting pricing");
    let config = super::load_deal(deal)?;
    let report = price_deal(&config, call_probabilities)?;

    match format {
        OutputFormat::Json => super::print_json(&report)?,
        OutputFormat::Text => print_table(&report),
    }
    info!("pricing complete");
    Ok(())
}

/// Prices a loaded deal.
pub fn price_deal(config: &DealConfig, call_probabilities: bool) -> Result<PricingReport> {
    let mut pipeline = config.pipeline;
    if call_probabilities {
        pipeline.evaluator = pipeline.evaluator.with_call_probabilities(true);
    }
    let cashflows = config.instrument.cashflows()?;
    let market = config.market()?;
    let report = BermudanPricer::new(pipeline).price(
        &cashflows,
        market.curve(),
        market.vols(),
        market.survival(),
    )?;
    Ok(report)
}

fn print_table(report: &PricingReport) {
    println!("\n┌──────────────────┬──────────────────┐");
    println!("│ Cashflow PV      │ {:>16.6} │", report.cashflow_pv);
    println!("│ Option value     │ {:>16.6} │", report.option_value);
    println!("│ Total            │ {:>16.6} │", report.total);
    if let Some(rmse) = report.calibration_rmse {
        println!("│ Calibration RMSE │ {:>16.3e} │", rmse);
    }
    println!("└──────────────────┴──────────────────┘");

    if report.exercise_times.is_empty() {
        return;
    }
    println!("\n┌────────────┬──────────────────┐");
    println!("│ Exercise   │ European value   │");
    println!("├────────────┼──────────────────┤");
    for (t, v) in report.exercise_times.iter().zip(&report.european_values) {
        println!("│ {:>10.4} │ {:>16.6} │", t, v);
    }
    println!("└────────────┴──────────────────┘");

    if let Some(calls) = &report.call_probabilities {
        println!("\n┌────────────┬──────────────┐");
        println!("│ Time       │ Probability  │");
        println!("├────────────┼──────────────┤");
        for c in calls {
            println!("│ {:>10.4} │ {:>12.6} │", c.time, c.probability);
        }
        println!("└────────────┴──────────────┘");
    }
    if let Some(date) = report.unconditional_call {
        println!("\nUnconditional call at exercise date {date}");
    }
}
