//! CLI command implementations
//!
//! Each submodule implements a specific CLI command. Commands split into a
//! computation returning a serialisable result and the rendering of that
//! result as text or JSON.

use std::path::Path;

use clap::ValueEnum;
use serde::Serialize;

use crate::config::DealConfig;
use crate::{CliError, Result};

pub mod calibrate;
pub mod check;
pub mod price;
pub mod solve_spread;

/// How results are written to stdout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Loads and validates a deal file.
pub(crate) fn load_deal(path: &str) -> Result<DealConfig> {
    let path = Path::new(path);
    if !path.exists() {
        return Err(CliError::FileNotFound(path.display().to_string()));
    }
    Ok(DealConfig::from_file(path)?)
}

/// Prints `value` as pretty JSON.
pub(crate) fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
