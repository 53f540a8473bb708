//! Rate lattice storage and read access.

use std::ops::Range;

use bgm_core::math::combinatorics::BinomialLattice;
use bgm_core::math::view::View;

use super::{LatticeConfig, LatticeError};
use crate::schedules::{NodeDateGrid, TenorSchedule};

/// Per-date placement of states and live rates inside the arena.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct DateLayout {
    pub(crate) state_offset: usize,
    pub(crate) value_offset: usize,
    pub(crate) first_level: usize,
    pub(crate) state_count: usize,
    pub(crate) first_live: usize,
    pub(crate) live_count: usize,
}

/// Recombining lattice of forward-rate states.
///
/// State `s` at date `d` is the binomial level `first_level(d) + s` after
/// `step(d)` steps. Every state stores the live forward rates, the deflated
/// zero claims paying at each rate's end date ("annuities"), the deflated
/// value of one unit of cash paid at the node date, and the marginal
/// probability of reaching it. All values live in flat owned arrays indexed by
/// `(date, state, rate)`.
///
/// The lattice is immutable once built. Consumers read through [`date`]
/// slices or the bounds-checked accessors below.
///
/// [`date`]: RateLattice::date
#[derive(Debug, Clone)]
pub struct RateLattice {
    pub(crate) config: LatticeConfig,
    pub(crate) schedule: TenorSchedule,
    pub(crate) grid: NodeDateGrid,
    pub(crate) binomial: BinomialLattice,
    pub(crate) layouts: Vec<DateLayout>,
    pub(crate) probabilities: Vec<f64>,
    pub(crate) cash: Vec<f64>,
    pub(crate) rates: Vec<f64>,
    pub(crate) annuities: Vec<f64>,
}

impl RateLattice {
    /// Number of node dates.
    #[inline]
    pub fn date_count(&self) -> usize {
        self.layouts.len()
    }

    /// Configuration the lattice was built with.
    #[inline]
    pub fn config(&self) -> &LatticeConfig {
        &self.config
    }

    /// Tenor schedule the lattice was built on.
    #[inline]
    pub fn schedule(&self) -> &TenorSchedule {
        &self.schedule
    }

    /// Node dates and step indices.
    #[inline]
    pub fn grid(&self) -> &NodeDateGrid {
        &self.grid
    }

    /// Binomial probability tables covering every step of the lattice.
    #[inline]
    pub fn binomial(&self) -> &BinomialLattice {
        &self.binomial
    }

    /// Read view of node date `d`.
    pub fn date(&self, d: usize) -> Result<DateNodes<'_>, LatticeError> {
        let layout = self.layouts.get(d).ok_or(LatticeError::DateOutOfRange {
            date: d,
            count: self.layouts.len(),
        })?;
        Ok(DateNodes {
            lattice: self,
            date: d,
            layout,
        })
    }

    /// Number of retained states at date `d`.
    pub fn state_count(&self, d: usize) -> Result<usize, LatticeError> {
        Ok(self.date(d)?.state_count())
    }

    /// Forward rate `j` at `(d, s)`.
    pub fn rate(&self, d: usize, s: usize, j: usize) -> Result<f64, LatticeError> {
        self.date(d)?.rate(s, j)
    }

    /// Deflated zero claim paying at `T_{j+1}`, at `(d, s)`.
    pub fn annuity(&self, d: usize, s: usize, j: usize) -> Result<f64, LatticeError> {
        self.date(d)?.annuity(s, j)
    }

    /// Deflated value of one unit paid at the date of node `d`, state `s`.
    pub fn numeraire_cash(&self, d: usize, s: usize) -> Result<f64, LatticeError> {
        self.date(d)?.cash(s)
    }

    /// Marginal probability of `(d, s)`.
    pub fn probability(&self, d: usize, s: usize) -> Result<f64, LatticeError> {
        self.date(d)?.probability(s)
    }

    /// Retained probability mass at date `d`; `1 - probability_mass` was pruned.
    pub fn probability_mass(&self, d: usize) -> Result<f64, LatticeError> {
        Ok(self.date(d)?.probability_mass())
    }

    /// Probability of `(d2, s2)` conditional on `(d1, s1)`.
    ///
    /// Forward transitions for `d2 > d1`, look-back for `d2 < d1`, and the
    /// indicator `s1 == s2` for `d1 == d2`. Computed from steps and levels
    /// only.
    pub fn conditional_probability(
        &self,
        d2: usize,
        s2: usize,
        d1: usize,
        s1: usize,
    ) -> Result<f64, LatticeError> {
        let to = self.date(d2)?;
        let from = self.date(d1)?;
        let level2 = to.level(s2)?;
        let level1 = from.level(s1)?;
        Ok(self
            .binomial
            .conditional_probability(to.step(), level2, from.step(), level1))
    }

    /// Lazy view over the states of date `d` yielding rate `j`.
    pub fn rate_view(
        &self,
        d: usize,
        j: usize,
    ) -> Result<View<impl Fn(usize) -> f64 + '_>, LatticeError> {
        self.date(d)?.rate_view(j)
    }
}

/// Borrowed view of one node date.
///
/// # Example
///
/// ```
/// use bgm_models::lattice::{LatticeBuilder, LatticeConfig};
/// use bgm_models::schedules::TenorSchedule;
/// use bgm_models::volatility::VolatilityCurve;
///
/// let schedule = TenorSchedule::new(vec![1.0, 2.0, 3.0], vec![0.03, 0.03]).unwrap();
/// let vols = vec![
///     VolatilityCurve::flat(0.2, 1.0).unwrap(),
///     VolatilityCurve::flat(0.2, 2.0).unwrap(),
/// ];
/// let lattice = LatticeBuilder::new(LatticeConfig::fast())
///     .build(&schedule, &vols, &[])
///     .unwrap();
///
/// let last = lattice.date(lattice.date_count() - 1).unwrap();
/// assert_eq!(last.live_rates(), 1..2);
/// assert!((last.probability_mass() - 1.0).abs() < 1e-6);
/// ```
#[derive(Debug, Clone, Copy)]
pub struct DateNodes<'a> {
    lattice: &'a RateLattice,
    date: usize,
    layout: &'a DateLayout,
}

impl<'a> DateNodes<'a> {
    /// Date index.
    #[inline]
    pub fn index(&self) -> usize {
        self.date
    }

    /// Year fraction of the node date.
    #[inline]
    pub fn time(&self) -> f64 {
        self.lattice.grid.time(self.date)
    }

    /// Binomial steps taken since valuation.
    #[inline]
    pub fn step(&self) -> usize {
        self.lattice.grid.step(self.date)
    }

    /// Number of retained states.
    #[inline]
    pub fn state_count(&self) -> usize {
        self.layout.state_count
    }

    /// Binomial level of the first retained state.
    #[inline]
    pub fn first_level(&self) -> usize {
        self.layout.first_level
    }

    /// Binomial level of state `s`.
    pub fn level(&self, s: usize) -> Result<usize, LatticeError> {
        self.check_state(s)?;
        Ok(self.layout.first_level + s)
    }

    /// Rates stored at this date. The first one may have reset already.
    #[inline]
    pub fn live_rates(&self) -> Range<usize> {
        self.layout.first_live..self.layout.first_live + self.layout.live_count
    }

    /// Probability of every retained state.
    #[inline]
    pub fn probabilities(&self) -> &'a [f64] {
        let start = self.layout.state_offset;
        &self.lattice.probabilities[start..start + self.layout.state_count]
    }

    /// Deflated unit cash of every retained state.
    #[inline]
    pub fn cash_values(&self) -> &'a [f64] {
        let start = self.layout.state_offset;
        &self.lattice.cash[start..start + self.layout.state_count]
    }

    /// Sum of retained probabilities.
    pub fn probability_mass(&self) -> f64 {
        self.probabilities().iter().sum()
    }

    /// Marginal probability of state `s`.
    pub fn probability(&self, s: usize) -> Result<f64, LatticeError> {
        self.check_state(s)?;
        Ok(self.probabilities()[s])
    }

    /// Deflated value of one unit paid at this date in state `s`.
    pub fn cash(&self, s: usize) -> Result<f64, LatticeError> {
        self.check_state(s)?;
        Ok(self.cash_values()[s])
    }

    /// Live rates of state `s`, indexed from `live_rates().start`.
    pub fn rates(&self, s: usize) -> Result<&'a [f64], LatticeError> {
        self.check_state(s)?;
        let start = self.value_start(s);
        Ok(&self.lattice.rates[start..start + self.layout.live_count])
    }

    /// Annuities of state `s`, aligned with [`rates`](Self::rates).
    pub fn annuities(&self, s: usize) -> Result<&'a [f64], LatticeError> {
        self.check_state(s)?;
        let start = self.value_start(s);
        Ok(&self.lattice.annuities[start..start + self.layout.live_count])
    }

    /// Rate `j` in state `s`.
    pub fn rate(&self, s: usize, j: usize) -> Result<f64, LatticeError> {
        let offset = self.rate_offset(j)?;
        Ok(self.rates(s)?[offset])
    }

    /// Annuity `j` in state `s`.
    pub fn annuity(&self, s: usize, j: usize) -> Result<f64, LatticeError> {
        let offset = self.rate_offset(j)?;
        Ok(self.annuities(s)?[offset])
    }

    /// Lazy view over states yielding rate `j`.
    pub fn rate_view(&self, j: usize) -> Result<View<impl Fn(usize) -> f64 + 'a>, LatticeError> {
        let offset = self.rate_offset(j)?;
        let base = self.layout.value_offset + offset;
        let stride = self.layout.live_count;
        let rates = &self.lattice.rates;
        Ok(View::new(self.layout.state_count, move |s| {
            rates[base + s * stride]
        }))
    }

    #[inline]
    fn value_start(&self, s: usize) -> usize {
        self.layout.value_offset + s * self.layout.live_count
    }

    fn check_state(&self, s: usize) -> Result<(), LatticeError> {
        if s < self.layout.state_count {
            Ok(())
        } else {
            Err(LatticeError::StateOutOfRange {
                date: self.date,
                state: s,
                count: self.layout.state_count,
            })
        }
    }

    fn rate_offset(&self, j: usize) -> Result<usize, LatticeError> {
        if self.live_rates().contains(&j) {
            Ok(j - self.layout.first_live)
        } else {
            Err(LatticeError::RateNotLive {
                date: self.date,
                rate: j,
            })
        }
    }
}
