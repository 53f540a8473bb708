//! Volatility sources.
//!
//! Every source answers [`VolatilitySource::volatility`] for a
//! [`VolatilityQuery`]; the calibrators never care which concrete source
//! produced the number.

mod cube;
mod flat;
mod term_structure;
mod traits;

pub use cube::VolatilityCube;
pub use flat::FlatVolatility;
pub use term_structure::TermStructureVolatility;
pub use traits::{VolatilityKind, VolatilityQuery, VolatilitySource};
