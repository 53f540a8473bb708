//! Market data consumed by the lattice, calibrators and spread solver.
//!
//! # Components
//!
//! - [`curves`]: discount curves (flat, pillar, shifted) and survival curves
//! - [`volatility`]: the single volatility-source contract and its standard sources
//! - [`error`]: market data error types ([`MarketDataError`])
//!
//! # Example
//!
//! ```
//! use bgm_core::market_data::curves::{FlatCurve, ShiftedCurve, YieldCurve};
//! use bgm_core::market_data::volatility::{FlatVolatility, VolatilityQuery, VolatilitySource};
//!
//! let curve = FlatCurve::new(0.05_f64);
//! let df = curve.discount_factor(1.0).unwrap();
//! assert!((df - 0.951229).abs() < 1e-5);
//!
//! // A spread search evaluates shifted views without touching the base curve.
//! let shifted = ShiftedCurve::new(&curve, 0.01);
//! assert!(shifted.discount_factor(1.0).unwrap() < df);
//!
//! let vols = FlatVolatility::lognormal(0.20);
//! let sigma = vols.volatility(&VolatilityQuery::atm(1.0, 5.0, 0.03)).unwrap();
//! assert_eq!(sigma, 0.20);
//! ```

pub mod curves;
pub mod error;
pub mod volatility;

pub use curves::{
    loss_leg_pv, FlatCurve, FlatHazardCurve, PiecewiseHazardCurve, PillarCurve, ShiftedCurve,
    SurvivalCurve, YieldCurve,
};
pub use error::MarketDataError;
pub use volatility::{
    FlatVolatility, TermStructureVolatility, VolatilityCube, VolatilityKind, VolatilityQuery,
    VolatilitySource,
};
