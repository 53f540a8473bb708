//! CLI error types.

use bgm_core::market_data::MarketDataError;
use bgm_pricing::EvaluationError;
use thiserror::Error;

use crate::config::ConfigError;

/// Errors surfaced by the `bgm` binary.
#[derive(Debug, Error)]
pub enum CliError {
    /// Deal file could not be found.
    #[error("file not found: {0}")]
    FileNotFound(String),

    /// Command-line argument out of range or unknown.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Deal file failed to load or validate.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Market objects could not be built from the deal file.
    #[error("market data: {0}")]
    MarketData(#[from] MarketDataError),

    /// Pricing, calibration or spread solving failed.
    #[error("evaluation failed: {0}")]
    Evaluation(#[from] EvaluationError),

    /// Result serialisation failed.
    #[error("output: {0}")]
    Json(#[from] serde_json::Error),

    /// Filesystem failure.
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

/// Result alias for CLI operations.
pub type Result<T> = std::result::Result<T, CliError>;
