//! Calendar-driven construction of tenor schedules.

use bgm_core::market_data::curves::YieldCurve;
use bgm_core::types::{Date, DayCountConvention};

use super::{Frequency, TenorSchedule};
use crate::lattice::LatticeError;

/// Builder that rolls reset dates from a start date to an end date.
///
/// The final period is a short stub when the end date is not on the roll.
///
/// # Example
///
/// ```
/// use bgm_core::market_data::curves::FlatCurve;
/// use bgm_core::types::{Date, DayCountConvention};
/// use bgm_models::schedules::{Frequency, ScheduleBuilder};
///
/// let curve = FlatCurve::new(0.03_f64);
/// let schedule = ScheduleBuilder::new()
///     .valuation(Date::from_ymd(2025, 1, 15).unwrap())
///     .start(Date::from_ymd(2026, 1, 15).unwrap())
///     .end(Date::from_ymd(2028, 1, 15).unwrap())
///     .frequency(Frequency::SemiAnnual)
///     .day_count(DayCountConvention::Thirty360)
///     .build(&curve)
///     .unwrap();
///
/// assert_eq!(schedule.rate_count(), 4);
/// ```
#[derive(Debug, Clone, Default)]
pub struct ScheduleBuilder {
    valuation: Option<Date>,
    start: Option<Date>,
    end: Option<Date>,
    frequency: Frequency,
    day_count: DayCountConvention,
}

impl ScheduleBuilder {
    /// Builder with annual frequency and ACT/365F accruals.
    pub fn new() -> Self {
        Self::default()
    }

    /// Valuation date (time zero).
    pub fn valuation(mut self, date: Date) -> Self {
        self.valuation = Some(date);
        self
    }

    /// First reset date.
    pub fn start(mut self, date: Date) -> Self {
        self.start = Some(date);
        self
    }

    /// Final payment date.
    pub fn end(mut self, date: Date) -> Self {
        self.end = Some(date);
        self
    }

    /// Roll frequency.
    pub fn frequency(mut self, frequency: Frequency) -> Self {
        self.frequency = frequency;
        self
    }

    /// Accrual day count.
    pub fn day_count(mut self, day_count: DayCountConvention) -> Self {
        self.day_count = day_count;
        self
    }

    /// Tenor dates from start to end inclusive.
    pub fn dates(&self) -> Result<Vec<Date>, LatticeError> {
        let start = self.start.ok_or_else(|| missing("start"))?;
        let end = self.end.ok_or_else(|| missing("end"))?;
        if start >= end {
            return Err(LatticeError::InvalidInput(format!(
                "start date {start} must precede end date {end}"
            )));
        }

        let step = self.frequency.months();
        let mut dates = vec![start];
        let mut rolls = 1;
        loop {
            let next = start
                .add_months(step * rolls)
                .map_err(|e| LatticeError::InvalidInput(e.to_string()))?;
            if next >= end {
                dates.push(end);
                break;
            }
            dates.push(next);
            rolls += 1;
        }
        Ok(dates)
    }

    /// Builds the schedule, seeding forwards from `curve`.
    pub fn build<C>(&self, curve: &C) -> Result<TenorSchedule, LatticeError>
    where
        C: YieldCurve<f64> + ?Sized,
    {
        let valuation = self.valuation.ok_or_else(|| missing("valuation"))?;
        let dates = self.dates()?;
        if dates[0] < valuation {
            return Err(LatticeError::InvalidInput(format!(
                "first reset {} precedes valuation {}",
                dates[0], valuation
            )));
        }
        TenorSchedule::from_dates(curve, valuation, &dates, self.day_count)
    }
}

fn missing(field: &str) -> LatticeError {
    LatticeError::InvalidInput(format!("schedule builder is missing `{field}`"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use bgm_core::market_data::curves::FlatCurve;

    #[test]
    fn test_dates_with_stub() {
        let dates = ScheduleBuilder::new()
            .start(Date::from_ymd(2025, 1, 15).unwrap())
            .end(Date::from_ymd(2026, 4, 15).unwrap())
            .frequency(Frequency::SemiAnnual)
            .dates()
            .unwrap();
        assert_eq!(dates.len(), 4);
        assert_eq!(dates[3], Date::from_ymd(2026, 4, 15).unwrap());
    }

    #[test]
    fn test_missing_fields() {
        let curve = FlatCurve::new(0.03_f64);
        assert!(ScheduleBuilder::new().build(&curve).is_err());
        let err = ScheduleBuilder::new()
            .valuation(Date::from_ymd(2025, 1, 1).unwrap())
            .end(Date::from_ymd(2026, 1, 1).unwrap())
            .build(&curve)
            .unwrap_err();
        assert!(err.to_string().contains("start"));
    }

    #[test]
    fn test_reversed_dates_rejected() {
        let result = ScheduleBuilder::new()
            .start(Date::from_ymd(2026, 1, 1).unwrap())
            .end(Date::from_ymd(2025, 1, 1).unwrap())
            .dates();
        assert!(result.is_err());
    }
}
