//! Tenor schedule: reset dates, accruals and initial forwards.

use bgm_core::market_data::curves::YieldCurve;
use bgm_core::types::{Date, DayCountConvention};

use crate::lattice::LatticeError;

/// Ordered reset dates `T0 < T1 < ... < Tn` with one forward rate per period.
///
/// Rate `i` accrues over `[T_i, T_{i+1}]` with day-count fraction `Δ_i` and
/// pays at `T_{i+1}`. Times are year fractions from valuation (`T_{-1} = 0`).
///
/// # Example
///
/// ```
/// use bgm_models::schedules::TenorSchedule;
///
/// let schedule = TenorSchedule::new(vec![1.0, 2.0, 3.0], vec![0.03, 0.03]).unwrap();
/// assert_eq!(schedule.rate_count(), 2);
/// assert_eq!(schedule.payment_time(1), 3.0);
/// assert!(schedule.zero_bond(2) < schedule.zero_bond(1));
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TenorSchedule {
    times: Vec<f64>,
    accruals: Vec<f64>,
    forwards: Vec<f64>,
    front_discount: f64,
}

impl TenorSchedule {
    /// Schedule with accruals equal to the time differences.
    ///
    /// The stub discount to `T0` compounds the first forward simply over
    /// `[0, T0]`.
    ///
    /// # Errors
    ///
    /// Fewer than two dates, non-increasing dates, a negative first date, or
    /// a forward count different from the number of periods.
    pub fn new(times: Vec<f64>, forwards: Vec<f64>) -> Result<Self, LatticeError> {
        validate_times(&times)?;
        let accruals: Vec<f64> = times.windows(2).map(|w| w[1] - w[0]).collect();
        let front_discount = match forwards.first() {
            Some(&l0) => 1.0 / (1.0 + l0 * times[0]),
            None => 1.0,
        };
        Self::with_accruals(times, accruals, forwards, front_discount)
    }

    /// Fully specified schedule.
    pub fn with_accruals(
        times: Vec<f64>,
        accruals: Vec<f64>,
        forwards: Vec<f64>,
        front_discount: f64,
    ) -> Result<Self, LatticeError> {
        validate_times(&times)?;
        let periods = times.len() - 1;
        if accruals.len() != periods || forwards.len() != periods {
            return Err(LatticeError::InvalidInput(format!(
                "{} periods need {} accruals and forwards, got {} and {}",
                periods,
                periods,
                accruals.len(),
                forwards.len()
            )));
        }
        if let Some(i) = accruals.iter().position(|&d| !(d > 0.0)) {
            return Err(LatticeError::InvalidInput(format!(
                "accrual {} must be positive, got {}",
                i, accruals[i]
            )));
        }
        if !(front_discount > 0.0) {
            return Err(LatticeError::InvalidInput(format!(
                "front discount must be positive, got {front_discount}"
            )));
        }
        Ok(Self {
            times,
            accruals,
            forwards,
            front_discount,
        })
    }

    /// Seeds forwards from a discount curve: `L_i = (D(T_i)/D(T_{i+1}) - 1)/Δ_i`.
    pub fn from_curve<C>(curve: &C, times: Vec<f64>) -> Result<Self, LatticeError>
    where
        C: YieldCurve<f64> + ?Sized,
    {
        validate_times(&times)?;
        let accruals: Vec<f64> = times.windows(2).map(|w| w[1] - w[0]).collect();
        Self::from_curve_with_accruals(curve, times, accruals)
    }

    /// As [`from_curve`](Self::from_curve) with explicit day-count fractions.
    pub fn from_curve_with_accruals<C>(
        curve: &C,
        times: Vec<f64>,
        accruals: Vec<f64>,
    ) -> Result<Self, LatticeError>
    where
        C: YieldCurve<f64> + ?Sized,
    {
        validate_times(&times)?;
        if accruals.len() + 1 != times.len() {
            return Err(LatticeError::InvalidInput(format!(
                "{} tenor dates need {} accruals, got {}",
                times.len(),
                times.len() - 1,
                accruals.len()
            )));
        }
        let mut forwards = Vec::with_capacity(accruals.len());
        for (w, &delta) in times.windows(2).zip(&accruals) {
            forwards.push(curve.simple_forward_rate(w[0], w[1], delta)?);
        }
        let front_discount = curve.discount_factor(times[0])?;
        Self::with_accruals(times, accruals, forwards, front_discount)
    }

    /// Builds the schedule from calendar dates.
    pub fn from_dates<C>(
        curve: &C,
        valuation: Date,
        dates: &[Date],
        day_count: DayCountConvention,
    ) -> Result<Self, LatticeError>
    where
        C: YieldCurve<f64> + ?Sized,
    {
        let times: Vec<f64> = dates
            .iter()
            .map(|&d| DayCountConvention::Act365Fixed.year_fraction(valuation, d))
            .collect();
        validate_times(&times)?;
        let accruals = dates
            .windows(2)
            .map(|w| day_count.year_fraction(w[0], w[1]))
            .collect();
        Self::from_curve_with_accruals(curve, times, accruals)
    }

    /// Number of forward rates `n`.
    #[inline]
    pub fn rate_count(&self) -> usize {
        self.forwards.len()
    }

    /// All tenor dates `T0..Tn`.
    #[inline]
    pub fn times(&self) -> &[f64] {
        &self.times
    }

    /// Reset time `T_i` of rate `i`.
    #[inline]
    pub fn reset_time(&self, i: usize) -> f64 {
        self.times[i]
    }

    /// Payment time `T_{i+1}` of rate `i`.
    #[inline]
    pub fn payment_time(&self, i: usize) -> f64 {
        self.times[i + 1]
    }

    /// Day-count fraction `Δ_i`.
    #[inline]
    pub fn accrual(&self, i: usize) -> f64 {
        self.accruals[i]
    }

    /// All accruals.
    #[inline]
    pub fn accruals(&self) -> &[f64] {
        &self.accruals
    }

    /// Initial forward `L_i(0)`.
    #[inline]
    pub fn forward(&self, i: usize) -> f64 {
        self.forwards[i]
    }

    /// All initial forwards.
    #[inline]
    pub fn forwards(&self) -> &[f64] {
        &self.forwards
    }

    /// Discount factor to the first tenor date.
    #[inline]
    pub fn front_discount(&self) -> f64 {
        self.front_discount
    }

    /// Zero bond `P(0, T_j)` implied by the front discount and the forwards.
    pub fn zero_bond(&self, j: usize) -> f64 {
        self.forwards[..j]
            .iter()
            .zip(&self.accruals)
            .fold(self.front_discount, |p, (l, d)| p / (1.0 + d * l))
    }

    /// Level `Σ_{k=start}^{end-1} Δ_k P(0, T_{k+1})`.
    pub fn level(&self, start: usize, end: usize) -> f64 {
        (start..end)
            .map(|k| self.accruals[k] * self.zero_bond(k + 1))
            .sum()
    }

    /// Forward swap rate over rates `start..end`.
    pub fn swap_rate(&self, start: usize, end: usize) -> f64 {
        let level = self.level(start, end);
        if level <= 0.0 {
            return 0.0;
        }
        (self.zero_bond(start) - self.zero_bond(end)) / level
    }

    /// Schedule restricted to the first `rates` forward rates.
    pub fn truncated(&self, rates: usize) -> Result<Self, LatticeError> {
        if rates == 0 || rates > self.rate_count() {
            return Err(LatticeError::InvalidInput(format!(
                "cannot keep {} of {} rates",
                rates,
                self.rate_count()
            )));
        }
        Self::with_accruals(
            self.times[..=rates].to_vec(),
            self.accruals[..rates].to_vec(),
            self.forwards[..rates].to_vec(),
            self.front_discount,
        )
    }

    /// Copy of the schedule with forwards replaced.
    pub fn with_forwards(&self, forwards: Vec<f64>) -> Result<Self, LatticeError> {
        Self::with_accruals(
            self.times.clone(),
            self.accruals.clone(),
            forwards,
            self.front_discount,
        )
    }
}

fn validate_times(times: &[f64]) -> Result<(), LatticeError> {
    if times.len() < 2 {
        return Err(LatticeError::InsufficientTenors { got: times.len() });
    }
    if !(times[0] >= 0.0) {
        return Err(LatticeError::InvalidInput(format!(
            "first tenor date must not precede valuation, got {}",
            times[0]
        )));
    }
    if let Some(index) = times.windows(2).position(|w| !(w[1] > w[0])) {
        return Err(LatticeError::TenorOutOfOrder { index: index + 1 });
    }
    Ok(())
}
