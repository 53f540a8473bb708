//! End-to-end pricing.
//!
//! ```text
//! CashflowSchedule ─► swaption records ─► co-terminal cascade ─► RateLattice
//!                                                                   │
//!           OasSolver ◄── SpreadSolver ◄── PricingReport ◄── BermudanEvaluator
//! ```

mod oas;
mod pricer;

pub use oas::OasSolver;
pub use pricer::{
    BermudanPricer, CalibrationMethod, CalibrationReport, PipelineConfig, PricingReport,
};
