//! Calendar dates and day-count conventions.
//!
//! The lattice works on year fractions measured from the valuation date;
//! these types convert calendar schedules into that representation upstream.
//!
//! # Examples
//!
//! ```
//! use bgm_core::types::time::{Date, DayCountConvention};
//!
//! let start = Date::from_ymd(2025, 1, 15).unwrap();
//! let end = start.add_months(6).unwrap();
//! let yf = DayCountConvention::Act360.year_fraction(start, end);
//! assert!((yf - 181.0 / 360.0).abs() < 1e-12);
//! ```

use chrono::{Datelike, Months, NaiveDate};
use std::fmt;
use std::ops::Sub;
use std::str::FromStr;

use super::error::DateError;

/// Calendar date wrapper around `chrono::NaiveDate`, serialised as ISO 8601.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct Date(NaiveDate);

impl Date {
    /// Creates a date from year, month and day components.
    ///
    /// # Errors
    ///
    /// Returns [`DateError::InvalidDate`] for impossible dates such as February 30th.
    pub fn from_ymd(year: i32, month: u32, day: u32) -> Result<Self, DateError> {
        NaiveDate::from_ymd_opt(year, month, day)
            .map(Date)
            .ok_or(DateError::InvalidDate { year, month, day })
    }

    /// Parses an ISO 8601 (`YYYY-MM-DD`) string.
    pub fn parse(s: &str) -> Result<Self, DateError> {
        NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .map(Date)
            .map_err(|e| DateError::ParseError(format!("{s}: {e}")))
    }

    /// Adds calendar months, clamping the day to the end of the target month.
    pub fn add_months(self, months: u32) -> Result<Self, DateError> {
        self.0
            .checked_add_months(Months::new(months))
            .map(Date)
            .ok_or_else(|| DateError::ParseError(format!("{self} + {months}M overflows")))
    }

    /// Returns the underlying `NaiveDate`.
    pub fn into_inner(self) -> NaiveDate {
        self.0
    }

    /// Year component.
    pub fn year(&self) -> i32 {
        self.0.year()
    }

    /// Month component (1-12).
    pub fn month(&self) -> u32 {
        self.0.month()
    }

    /// Day-of-month component.
    pub fn day(&self) -> u32 {
        self.0.day()
    }
}

impl Sub for Date {
    type Output = i64;

    /// Signed number of calendar days from `other` to `self`.
    fn sub(self, other: Self) -> i64 {
        (self.0 - other.0).num_days()
    }
}

impl FromStr for Date {
    type Err = DateError;

    fn from_str(s: &str) -> Result<Self, DateError> {
        Date::parse(s)
    }
}

impl fmt::Display for Date {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%Y-%m-%d"))
    }
}

/// Day-count convention used to turn date pairs into accrual fractions.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DayCountConvention {
    /// Actual/365 Fixed.
    #[default]
    Act365Fixed,
    /// Actual/360, the usual LIBOR-style accrual basis.
    Act360,
    /// 30/360 US bond basis.
    Thirty360,
}

impl DayCountConvention {
    /// Standard convention name.
    pub fn name(&self) -> &'static str {
        match self {
            DayCountConvention::Act365Fixed => "ACT/365F",
            DayCountConvention::Act360 => "ACT/360",
            DayCountConvention::Thirty360 => "30/360",
        }
    }

    /// Signed year fraction between two dates; negative when `end < start`.
    pub fn year_fraction(&self, start: Date, end: Date) -> f64 {
        match self {
            DayCountConvention::Act365Fixed => (end - start) as f64 / 365.0,
            DayCountConvention::Act360 => (end - start) as f64 / 360.0,
            DayCountConvention::Thirty360 => {
                let (lo, hi, sign) = if start <= end {
                    (start, end, 1.0)
                } else {
                    (end, start, -1.0)
                };
                let d1 = if lo.day() == 31 { 30 } else { lo.day() };
                let d2 = if hi.day() == 31 && d1 == 30 { 30 } else { hi.day() };
                let days = 360 * (hi.year() - lo.year())
                    + 30 * (hi.month() as i32 - lo.month() as i32)
                    + (d2 as i32 - d1 as i32);
                sign * days as f64 / 360.0
            }
        }
    }
}

impl FromStr for DayCountConvention {
    type Err = String;

    /// Case-insensitive parse accepting the usual aliases (`ACT/360`, `A365`, `30/360`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().replace(['/', ' '], "").as_str() {
            "ACT365" | "ACT365F" | "ACTUAL365" | "A365" => Ok(DayCountConvention::Act365Fixed),
            "ACT360" | "ACTUAL360" | "A360" => Ok(DayCountConvention::Act360),
            "30360" | "THIRTY360" => Ok(DayCountConvention::Thirty360),
            _ => Err(format!("Unknown day count convention: {s}")),
        }
    }
}

impl fmt::Display for DayCountConvention {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[cfg(feature = "serde")]
mod serde_impl {
    use super::DayCountConvention;
    use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
    use std::str::FromStr;

    impl Serialize for DayCountConvention {
        fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
            serializer.serialize_str(self.name())
        }
    }

    impl<'de> Deserialize<'de> for DayCountConvention {
        fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
            let s = String::deserialize(deserializer)?;
            DayCountConvention::from_str(&s).map_err(de::Error::custom)
        }
    }
}
