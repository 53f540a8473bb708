//! Tenor schedules and lattice node grids.
//!
//! - [`TenorSchedule`]: reset dates, accruals and initial forwards
//! - [`NodeDateGrid`]: lattice node dates with step indices and active rates
//! - [`ScheduleBuilder`]: rolls calendar dates into a tenor schedule
//! - [`Frequency`]: roll frequency

mod builder;
mod frequency;
mod node_grid;
mod tenor;

pub use builder::ScheduleBuilder;
pub use frequency::Frequency;
pub use node_grid::NodeDateGrid;
pub use tenor::TenorSchedule;
