//! Cashflow and exercise schedules.
//!
//! Day-count and roll conventions are resolved upstream; a schedule holds
//! year fractions, notionals, coupons and exercise flags only.

mod schedule;

pub use schedule::{CashflowPeriod, CashflowSchedule, ExerciseStyle, OptionHolder};
