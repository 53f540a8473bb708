//! Closed-form option analytics on forward rates.
//!
//! - [`Black76`] and [`Bachelier`] undiscounted prices and vegas
//! - Implied volatility inversion and price-equivalent normal ↔ lognormal
//!   conversion ([`conversion`])
//! - Hagan SABR and a per-expiry [`SabrSwaptionSurface`]
//!
//! All prices are per unit annuity; callers scale by the level of the
//! underlying swap or by `Δ·P(0, T_pay)` for caplets.

pub mod bachelier;
pub mod black;
pub mod conversion;
pub mod distributions;
pub mod error;
mod option_type;
pub mod sabr;

pub use bachelier::Bachelier;
pub use black::Black76;
pub use conversion::{
    implied_black_volatility, implied_normal_volatility, lognormal_to_normal, normal_to_lognormal,
};
pub use distributions::{norm_cdf, norm_pdf};
pub use error::AnalyticalError;
pub use option_type::OptionType;
pub use sabr::{SabrParameters, SabrSwaptionSurface};
