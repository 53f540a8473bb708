//! Calibrate command implementation
//!
//! Fits the co-terminal forward volatilities of the deal's exercise
//! schedule and reports the fit without evaluating the option.

use bgm_pricing::pipeline::{BermudanPricer, CalibrationReport};
use tracing::{info, warn};

use super::OutputFormat;
use crate::config::DealConfig;
use crate::Result;

/// Run the calibrate command
pub fn run(deal: &str, format: OutputFormat, output: Option<&str>) -> Result<()> {
    info!(deal, "starting calibration");
    let config = super::load_deal(deal)?;
    let Some(report) = calibrate_deal(&config)? else {
        warn!("instrument has no future exercise dates; nothing to calibrate");
        return Ok(());
    };

    match format {
        OutputFormat::Json => super::print_json(&report)?,
        OutputFormat::Text => print_table(&report),
    }
    if let Some(path) = output {
        info!(path, "writing calibrated volatilities");
        std::fs::write(path, serde_json::to_string_pretty(&report)?)?;
    }
    info!("calibration complete");
    Ok(())
}

/// Calibrates a loaded deal.
pub fn calibrate_deal(config: &DealConfig) -> Result<Option<CalibrationReport>> {
    let cashflows = config.instrument.cashflows()?;
    let market = config.market()?;
    let report = BermudanPricer::new(config.pipeline).calibrate(
        &cashflows,
        market.curve(),
        market.vols(),
        market.survival(),
    )?;
    Ok(report)
}

fn print_table(report: &CalibrationReport) {
    println!("\n┌────────────┬──────────────┐");
    println!("│ Reset      │ Black vol    │");
    println!("├────────────┼──────────────┤");
    for (t, v) in report.reset_times.iter().zip(&report.black_volatilities) {
        println!("│ {:>10.4} │ {:>12.6} │", t, v);
    }
    println!("└────────────┴──────────────┘");
    println!(
        "RMSE {:.3e}, max error {:.3e}, {} quote(s) skipped",
        report.rmse,
        report.max_error,
        report.skipped_quotes.len()
    );
}
