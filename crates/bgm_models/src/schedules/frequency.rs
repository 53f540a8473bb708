//! Reset frequency of a tenor schedule.

use std::fmt;
use std::str::FromStr;

/// Spacing between consecutive tenor dates.
///
/// # Examples
///
/// ```
/// use bgm_models::schedules::Frequency;
///
/// let freq: Frequency = "6M".parse().unwrap();
/// assert_eq!(freq, Frequency::SemiAnnual);
/// assert_eq!(freq.months(), 6);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Frequency {
    /// Every twelve months.
    #[default]
    Annual,
    /// Every six months.
    SemiAnnual,
    /// Every three months.
    Quarterly,
    /// Every month.
    Monthly,
}

impl Frequency {
    /// Number of periods per year.
    #[inline]
    pub fn periods_per_year(&self) -> u32 {
        12 / self.months()
    }

    /// Months between tenor dates.
    #[inline]
    pub fn months(&self) -> u32 {
        match self {
            Frequency::Annual => 12,
            Frequency::SemiAnnual => 6,
            Frequency::Quarterly => 3,
            Frequency::Monthly => 1,
        }
    }

    /// Nominal year fraction of one period.
    #[inline]
    pub fn year_fraction(&self) -> f64 {
        self.months() as f64 / 12.0
    }

    /// Display name.
    pub fn name(&self) -> &'static str {
        match self {
            Frequency::Annual => "Annual",
            Frequency::SemiAnnual => "Semi-Annual",
            Frequency::Quarterly => "Quarterly",
            Frequency::Monthly => "Monthly",
        }
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for Frequency {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace(['-', '_', ' '], "").as_str() {
            "annual" | "1y" | "12m" | "yearly" => Ok(Frequency::Annual),
            "semiannual" | "6m" => Ok(Frequency::SemiAnnual),
            "quarterly" | "3m" => Ok(Frequency::Quarterly),
            "monthly" | "1m" => Ok(Frequency::Monthly),
            _ => Err(format!("Unknown frequency: {}", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_periods_per_year() {
        assert_eq!(Frequency::Annual.periods_per_year(), 1);
        assert_eq!(Frequency::SemiAnnual.periods_per_year(), 2);
        assert_eq!(Frequency::Quarterly.periods_per_year(), 4);
        assert_eq!(Frequency::Monthly.periods_per_year(), 12);
    }

    #[test]
    fn test_year_fraction() {
        assert_eq!(Frequency::Quarterly.year_fraction(), 0.25);
    }

    #[test]
    fn test_parse() {
        assert_eq!("annual".parse::<Frequency>().unwrap(), Frequency::Annual);
        assert_eq!("Semi-Annual".parse::<Frequency>().unwrap(), Frequency::SemiAnnual);
        assert_eq!("3M".parse::<Frequency>().unwrap(), Frequency::Quarterly);
        assert!("weekly".parse::<Frequency>().is_err());
        assert_eq!(format!("{}", Frequency::Monthly), "Monthly");
    }
}
