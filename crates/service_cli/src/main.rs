//! BGM CLI - Command Line Operations for the BGM Lattice Pricer
//!
//! This is the operational entry point for pricing callable fixed-rate
//! instruments on the recombining BGM lattice.
//!
//! # Commands
//!
//! - `bgm price --deal <file>` - Price an instrument and its embedded option
//! - `bgm calibrate --deal <file>` - Fit co-terminal forward volatilities
//! - `bgm solve-spread --deal <file>` - Implied discount or survival spread
//! - `bgm check [--deal <file>]` - Validate defaults and a deal file
//!
//! # Logging
//!
//! Events go to stderr. The filter is `--log-level`, else `BGM_LOG`, else
//! `RUST_LOG`, else `info`.

use std::str::FromStr;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod commands;
mod config;
mod error;

use commands::solve_spread::SpreadCurve;
use commands::OutputFormat;
use config::{LogLevel, ENV_LOG};
pub use error::{CliError, Result};

/// BGM lattice pricer CLI
#[derive(Parser)]
#[command(name = "bgm")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable debug output (ignored when --log-level is given)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, value_parser = LogLevel::from_str)]
    log_level: Option<LogLevel>,

    /// Output format
    #[arg(short, long, global = true, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Price an instrument with its embedded option
    Price {
        /// Path to the TOML deal file
        #[arg(short, long)]
        deal: String,

        /// Report per-date exercise probabilities
        #[arg(long)]
        call_probabilities: bool,
    },

    /// Calibrate co-terminal forward volatilities
    Calibrate {
        /// Path to the TOML deal file
        #[arg(short, long)]
        deal: String,

        /// Output file for the calibration report (JSON)
        #[arg(short, long)]
        output: Option<String>,
    },

    /// Solve the parallel spread matching a target price
    SolveSpread {
        /// Path to the TOML deal file
        #[arg(short, long)]
        deal: String,

        /// Target price (defaults to the deal's target_price)
        #[arg(short, long)]
        target: Option<f64>,

        /// Curve receiving the spread
        #[arg(long, value_enum, default_value_t = SpreadCurve::Discount)]
        curve: SpreadCurve,
    },

    /// Check library defaults and, optionally, a deal file
    Check {
        /// Path to the TOML deal file
        #[arg(short, long)]
        deal: Option<String>,
    },
}

fn log_filter(cli_level: Option<LogLevel>, verbose: bool) -> EnvFilter {
    if let Some(level) = cli_level {
        return EnvFilter::new(level.as_filter_str());
    }
    if verbose {
        return EnvFilter::new(LogLevel::Debug.as_filter_str());
    }
    if let Ok(filter) = std::env::var(ENV_LOG) {
        if let Ok(filter) = EnvFilter::try_new(filter) {
            return filter;
        }
    }
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialise tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(log_filter(cli.log_level, cli.verbose))
        .init();
    debug!(format = ?cli.format, "bgm started");

    match cli.command {
        Commands::Price {
            deal,
            call_probabilities,
        } => commands::price::run(&deal, cli.format, call_probabilities)
            .with_context(|| format!("pricing {deal}")),
        Commands::Calibrate { deal, output } => {
            commands::calibrate::run(&deal, cli.format, output.as_deref())
                .with_context(|| format!("calibrating {deal}"))
        }
        Commands::SolveSpread {
            deal,
            target,
            curve,
        } => commands::solve_spread::run(&deal, cli.format, target, curve)
            .with_context(|| format!("solving spread for {deal}")),
        Commands::Check { deal } => {
            commands::check::run(deal.as_deref()).context("configuration check failed")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_solve_spread() {
        let cli = Cli::try_parse_from([
            "bgm",
            "--format",
            "json",
            "solve-spread",
            "--deal",
            "deal.toml",
            "--target",
            "99.5",
            "--curve",
            "survival",
        ])
        .unwrap();
        assert_eq!(cli.format, OutputFormat::Json);
        match cli.command {
            Commands::SolveSpread {
                target, curve, ..
            } => {
                assert_eq!(target, Some(99.5));
                assert_eq!(curve, SpreadCurve::Survival);
            }
            _ => panic!("expected solve-spread"),
        }
    }

    #[test]
    fn test_log_level_flag() {
        let cli = Cli::try_parse_from(["bgm", "--log-level", "warn", "check"]).unwrap();
        assert_eq!(cli.log_level, Some(LogLevel::Warn));
        assert!(Cli::try_parse_from(["bgm", "--log-level", "loud", "check"]).is_err());
    }
}
