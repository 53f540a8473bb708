//! Early-exercise evaluation on the rate lattice.
//!
//! [`BermudanEvaluator`] runs backward induction over the exercise dates of
//! a set of [`SwaptionRepresentation`](crate::swaption::SwaptionRepresentation)
//! records and, on request, a forward pass that reports the probability of
//! exercise at each date.

mod bermudan;
mod caplets;
mod config;

pub use bermudan::{BermudanEvaluator, CallProbability, EvaluationResult};
pub use caplets::caplet_values;
pub use config::EvaluatorConfig;
