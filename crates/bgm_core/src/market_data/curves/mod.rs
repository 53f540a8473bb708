//! Discount and survival curves.
//!
//! - [`YieldCurve`]: discount factor contract used to seed lattice forwards and annuities
//! - [`FlatCurve`], [`PillarCurve`]: concrete discount curves
//! - [`ShiftedCurve`]: immutable parallel spread overlay for spread searches
//! - [`SurvivalCurve`]: survival probabilities, hazard bumps and the loss leg

mod flat;
mod pillar;
mod shifted;
mod survival;
mod traits;

pub use flat::FlatCurve;
pub use pillar::PillarCurve;
pub use shifted::ShiftedCurve;
pub use survival::{loss_leg_pv, FlatHazardCurve, PiecewiseHazardCurve, SurvivalCurve};
pub use traits::YieldCurve;
