//! Fixed-rate cashflow schedule with embedded exercise dates.

use bgm_core::market_data::curves::YieldCurve;
use bgm_core::types::{Date, DayCountConvention};
use bgm_models::analytical::OptionType;

use crate::EvaluationError;

/// Two period boundaries closer than this are the same date.
const TIME_EPSILON: f64 = 1e-10;

/// Exercise style of the embedded option.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum ExerciseStyle {
    /// Only the first flagged date.
    European,
    /// Every flagged date.
    #[default]
    Bermudan,
    /// Every lattice date from the first flagged date onwards.
    American,
}

/// Party holding the embedded option.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum OptionHolder {
    /// Issuer call: the option value is deducted from the cashflow value.
    #[default]
    Issuer,
    /// Investor put: the option value is added to the cashflow value.
    Investor,
}

impl OptionHolder {
    /// Sign applied to the option value in the instrument total.
    #[inline]
    pub fn sign(self) -> f64 {
        match self {
            OptionHolder::Issuer => -1.0,
            OptionHolder::Investor => 1.0,
        }
    }
}

/// One accrual period.
///
/// The period pays `notional · coupon · accrual` at `end`, together with any
/// principal amortised between this period and the next. An exercisable
/// period can be called at its `start` into the remaining periods.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CashflowPeriod {
    /// Accrual start (year fraction from valuation)
    pub start: f64,
    /// Accrual end and payment time
    pub end: f64,
    /// Day-count fraction
    pub accrual: f64,
    /// Outstanding notional over the period
    pub notional: f64,
    /// Fixed coupon rate
    pub coupon: f64,
    /// Whether the option can be exercised at `start`
    pub exercisable: bool,
}

impl CashflowPeriod {
    /// Period with accrual `end - start`.
    pub fn new(start: f64, end: f64, notional: f64, coupon: f64) -> Self {
        Self {
            start,
            end,
            accrual: end - start,
            notional,
            coupon,
            exercisable: false,
        }
    }

    /// Same period, exercisable at its start.
    pub fn exercisable(mut self) -> Self {
        self.exercisable = true;
        self
    }
}

/// Ordered, contiguous cashflow periods plus the embedded option terms.
///
/// # Example
///
/// ```
/// use bgm_models::analytical::OptionType;
/// use bgm_pricing::cashflow::{CashflowSchedule, ExerciseStyle};
///
/// let schedule = CashflowSchedule::fixed_rate(&[1.0, 2.0, 3.0, 4.0], 100.0, 0.03)
///     .unwrap()
///     .callable_from(1)
///     .with_option_type(OptionType::Put);
///
/// assert_eq!(schedule.exercise_periods(), vec![1, 2]);
/// assert_eq!(
///     schedule.clone().with_style(ExerciseStyle::European).exercise_periods(),
///     vec![1]
/// );
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CashflowSchedule {
    periods: Vec<CashflowPeriod>,
    style: ExerciseStyle,
    option_type: OptionType,
    holder: OptionHolder,
    defaulted: bool,
}

impl CashflowSchedule {
    /// Validates and wraps `periods`. An empty list is accepted here; pricing
    /// decides whether it is degenerate or invalid.
    ///
    /// # Errors
    ///
    /// [`EvaluationError::InvalidInput`] for a period ending before it
    /// starts, a non-positive accrual, a negative notional or a gap between
    /// consecutive periods.
    pub fn new(periods: Vec<CashflowPeriod>) -> Result<Self, EvaluationError> {
        for (i, p) in periods.iter().enumerate() {
            if !(p.end > p.start) || !(p.accrual > 0.0) {
                return Err(EvaluationError::InvalidInput(format!(
                    "period {i} [{}, {}] with accrual {} is empty",
                    p.start, p.end, p.accrual
                )));
            }
            if !(p.notional >= 0.0) || !p.coupon.is_finite() {
                return Err(EvaluationError::InvalidInput(format!(
                    "period {i} has notional {} and coupon {}",
                    p.notional, p.coupon
                )));
            }
        }
        if let Some(i) = periods
            .windows(2)
            .position(|w| (w[1].start - w[0].end).abs() > TIME_EPSILON)
        {
            return Err(EvaluationError::InvalidInput(format!(
                "period {} does not start where period {} ends",
                i + 1,
                i
            )));
        }
        Ok(Self {
            periods,
            style: ExerciseStyle::default(),
            option_type: OptionType::Put,
            holder: OptionHolder::default(),
            defaulted: false,
        })
    }

    /// Bullet fixed-rate schedule over the boundaries `times`.
    pub fn fixed_rate(times: &[f64], notional: f64, coupon: f64) -> Result<Self, EvaluationError> {
        let periods = times
            .windows(2)
            .map(|w| CashflowPeriod::new(w[0], w[1], notional, coupon))
            .collect();
        Self::new(periods)
    }

    /// Bullet fixed-rate schedule on calendar dates.
    ///
    /// Times are ACT/365F year fractions from `valuation`; accruals use
    /// `day_count`.
    pub fn from_dates(
        valuation: Date,
        dates: &[Date],
        day_count: DayCountConvention,
        notional: f64,
        coupon: f64,
    ) -> Result<Self, EvaluationError> {
        let time = |d: Date| DayCountConvention::Act365Fixed.year_fraction(valuation, d);
        let periods = dates
            .windows(2)
            .map(|w| CashflowPeriod {
                accrual: day_count.year_fraction(w[0], w[1]),
                ..CashflowPeriod::new(time(w[0]), time(w[1]), notional, coupon)
            })
            .collect();
        Self::new(periods)
    }

    /// Flags every period from `first` onwards as exercisable.
    pub fn callable_from(mut self, first: usize) -> Self {
        for p in self.periods.iter_mut().skip(first) {
            p.exercisable = true;
        }
        self
    }

    /// Same schedule with another exercise style.
    pub fn with_style(mut self, style: ExerciseStyle) -> Self {
        self.style = style;
        self
    }

    /// Same schedule with another option direction on the swap rate.
    pub fn with_option_type(mut self, option_type: OptionType) -> Self {
        self.option_type = option_type;
        self
    }

    /// Same schedule with another option holder.
    pub fn with_holder(mut self, holder: OptionHolder) -> Self {
        self.holder = holder;
        self
    }

    /// Marks the instrument as defaulted.
    pub fn defaulted(mut self) -> Self {
        self.defaulted = true;
        self
    }

    /// All periods.
    pub fn periods(&self) -> &[CashflowPeriod] {
        &self.periods
    }

    /// `true` if there are no periods.
    pub fn is_empty(&self) -> bool {
        self.periods.is_empty()
    }

    /// Exercise style.
    pub fn style(&self) -> ExerciseStyle {
        self.style
    }

    /// Direction of the option on the swap rate. Defaults to a receiver
    /// (put), the issuer call on a fixed-rate bond.
    pub fn option_type(&self) -> OptionType {
        self.option_type
    }

    /// Option holder.
    pub fn holder(&self) -> OptionHolder {
        self.holder
    }

    /// `true` for a defaulted instrument.
    pub fn is_defaulted(&self) -> bool {
        self.defaulted
    }

    /// Indices of the periods whose start dates are exercise dates, after
    /// dropping any that are not in the future.
    pub fn exercise_periods(&self) -> Vec<usize> {
        let flagged = self
            .periods
            .iter()
            .enumerate()
            .filter(|(_, p)| p.exercisable && p.start > 0.0)
            .map(|(i, _)| i);
        match self.style {
            ExerciseStyle::European => flagged.take(1).collect(),
            ExerciseStyle::Bermudan | ExerciseStyle::American => flagged.collect(),
        }
    }

    /// Period boundaries from period `first` to maturity.
    pub fn boundaries_from(&self, first: usize) -> Vec<f64> {
        let mut times: Vec<f64> = self.periods[first..].iter().map(|p| p.start).collect();
        if let Some(last) = self.periods.last() {
            times.push(last.end);
        }
        times
    }

    /// Present value of coupons and principal on `curve`.
    ///
    /// Principal is repaid as the notional steps down and in full at maturity.
    /// Periods paid on or before valuation contribute nothing.
    pub fn present_value<C>(&self, curve: &C) -> Result<f64, EvaluationError>
    where
        C: YieldCurve<f64> + ?Sized,
    {
        let mut pv = 0.0;
        for (i, p) in self.periods.iter().enumerate() {
            if p.end <= 0.0 {
                continue;
            }
            let next = self.periods.get(i + 1).map_or(0.0, |q| q.notional);
            let amount = p.notional * p.coupon * p.accrual + (p.notional - next);
            pv += amount * curve.discount_factor(p.end)?;
        }
        Ok(pv)
    }
}
