//! Swaption representations.
//!
//! One immutable [`SwaptionRepresentation`] per exercise date, ordered by
//! date, each describing the European swaption into the remaining
//! co-terminal swap. They feed both the co-terminal calibration and the
//! exercise decisions of the evaluator.

mod representation;

pub use representation::{
    build_representations, SolverControls, SwaptionRepresentation, UnderlyingSwap,
};
