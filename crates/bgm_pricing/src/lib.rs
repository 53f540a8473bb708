//! # BGM Pricing (L3: Evaluation and Spreads)
//!
//! Turns cashflow schedules with embedded options into prices:
//!
//! - [`cashflow`]: fixed-rate periods, exercise flags and option terms
//! - [`swaption`]: one co-terminal European swaption record per exercise date
//! - [`evaluator`]: backward induction over the rate lattice, Bermudan,
//!   European and American styles
//! - [`pipeline`]: calibration, lattice construction and evaluation end to
//!   end, plus option-adjusted spreads
//! - [`spread`]: the one-dimensional spread search behind the OAS
//!
//! ## Quick Start
//!
//! ```
//! use bgm_core::market_data::curves::FlatCurve;
//! use bgm_core::market_data::volatility::FlatVolatility;
//! use bgm_pricing::cashflow::CashflowSchedule;
//! use bgm_pricing::pipeline::{BermudanPricer, CalibrationMethod, PipelineConfig};
//!
//! let bond = CashflowSchedule::fixed_rate(&[0.0, 1.0, 2.0, 3.0], 100.0, 0.05)
//!     .unwrap()
//!     .callable_from(1);
//! let pricer = BermudanPricer::new(PipelineConfig {
//!     calibration: CalibrationMethod::Rebonato,
//!     ..PipelineConfig::fast()
//! });
//! let report = pricer
//!     .price(&bond, &FlatCurve::new(0.03), &FlatVolatility::lognormal(0.15), None)
//!     .unwrap();
//! assert!(report.total < report.cashflow_pv);
//! ```

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(rustdoc::private_intra_doc_links)]

pub mod cashflow;
mod error;
pub mod evaluator;
pub mod pipeline;
pub mod spread;
pub mod swaption;

pub use error::EvaluationError;
