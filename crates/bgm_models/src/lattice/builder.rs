//! Lattice construction.

use bgm_core::math::combinatorics::BinomialLattice;

use super::rate_lattice::DateLayout;
use super::{Distribution, LatticeConfig, LatticeError, RateLattice};
use crate::schedules::{NodeDateGrid, TenorSchedule};
use crate::volatility::VolatilityCurve;

/// Builds [`RateLattice`]s from a tenor schedule and per-rate volatility curves.
///
/// Each node date keeps the contiguous band of binomial levels whose
/// marginal probability is at least `tail_cutoff`; levels outside the band
/// are pruned together with everything reachable only through them.
///
/// Rate `j` at level `k` after `m` steps is shocked by
/// `x = V_j · (k − m·p) / sqrt(m·p·(1 − p))` where
/// `V_j² = ∫₀^{min(t, T_j)} σ_j(u)² du`, so a rate stops diffusing at its
/// reset. A per-date drift `c_j` is solved in closed form so that the
/// deflated zero claims reprice the initial curve exactly on the retained
/// states. Dates strictly between `T_a` and `T_{a+1}` carry rate `a` frozen
/// at the look-back expectation of its reset value.
///
/// # Example
///
/// ```
/// use bgm_models::lattice::{LatticeBuilder, LatticeConfig};
/// use bgm_models::schedules::TenorSchedule;
/// use bgm_models::volatility::VolatilityCurve;
///
/// let schedule = TenorSchedule::new(vec![1.0, 2.0], vec![0.03]).unwrap();
/// let vols = vec![VolatilityCurve::flat(0.2, 1.0).unwrap()];
/// let lattice = LatticeBuilder::new(LatticeConfig::default())
///     .build(&schedule, &vols, &[])
///     .unwrap();
///
/// assert_eq!(lattice.date_count(), 2);
/// assert!(lattice.state_count(1).unwrap() > 1);
/// ```
#[derive(Debug, Clone, Default)]
pub struct LatticeBuilder {
    config: LatticeConfig,
}

impl LatticeBuilder {
    /// Creates a builder with the given configuration.
    pub fn new(config: LatticeConfig) -> Self {
        Self { config }
    }

    /// Builder configuration.
    pub fn config(&self) -> &LatticeConfig {
        &self.config
    }

    /// Builds the lattice. `extra_times` add node dates (exercise or
    /// observation dates) that do not retire a rate.
    ///
    /// When every volatility curve is zero the lattice takes no steps and
    /// holds a single state per date.
    ///
    /// # Errors
    ///
    /// - [`LatticeError::InvalidInput`] for a bad configuration, a volatility
    ///   count different from the rate count, non-positive forwards under
    ///   lognormal dynamics, or extra times outside `[0, T_{n-1}]`
    /// - [`LatticeError::DriftFit`] when a zero bond cannot be repriced
    #[tracing::instrument(skip_all, fields(rates = schedule.rate_count(), steps = self.config.steps))]
    pub fn build(
        &self,
        schedule: &TenorSchedule,
        volatilities: &[VolatilityCurve],
        extra_times: &[f64],
    ) -> Result<RateLattice, LatticeError> {
        self.config.validate()?;
        let n = schedule.rate_count();
        if volatilities.len() != n {
            return Err(LatticeError::InvalidInput(format!(
                "{} volatility curves for {} rates",
                volatilities.len(),
                n
            )));
        }
        if self.config.distribution == Distribution::Lognormal {
            if let Some(i) = schedule.forwards().iter().position(|&l| !(l > 0.0)) {
                return Err(LatticeError::InvalidInput(format!(
                    "lognormal dynamics need positive forwards, rate {} is {}",
                    i,
                    schedule.forward(i)
                )));
            }
        }

        let deterministic = volatilities.iter().all(VolatilityCurve::is_zero);
        let total_steps = if deterministic { 0 } else { self.config.steps };
        let grid = NodeDateGrid::build(schedule, extra_times, total_steps)?;
        let binomial = BinomialLattice::new(grid.total_steps(), self.config.up_probability)
            .map_err(|e| LatticeError::InvalidInput(e.to_string()))?;

        let mut lattice = RateLattice {
            config: self.config,
            schedule: schedule.clone(),
            grid,
            binomial,
            layouts: Vec::new(),
            probabilities: Vec::new(),
            cash: Vec::new(),
            rates: Vec::new(),
            annuities: Vec::new(),
        };

        for d in 0..lattice.grid.len() {
            let layout = self.build_date(&mut lattice, volatilities, d)?;
            lattice.layouts.push(layout);
        }

        let widest = lattice
            .layouts
            .iter()
            .map(|l| l.state_count)
            .max()
            .unwrap_or(0);
        tracing::debug!(
            dates = lattice.layouts.len(),
            total_steps = lattice.grid.total_steps(),
            widest,
            "lattice built"
        );
        Ok(lattice)
    }

    fn build_date(
        &self,
        lattice: &mut RateLattice,
        volatilities: &[VolatilityCurve],
        d: usize,
    ) -> Result<DateLayout, LatticeError> {
        let schedule = &lattice.schedule;
        let grid = &lattice.grid;
        let n = schedule.rate_count();
        let t = grid.time(d);
        let step = grid.step(d);
        let p = self.config.up_probability;

        let (first_level, state_count) =
            retained_levels(&lattice.binomial, step, self.config.tail_cutoff);
        let first_live = grid.active_rate(d).unwrap_or(0);
        let live_count = n - first_live;
        let frozen = grid.active_rate(d).filter(|&a| grid.tenor_node(a) != d);

        let probabilities: Vec<f64> = (0..state_count)
            .map(|s| lattice.binomial.probability(step, first_level + s))
            .collect();
        let mass: f64 = probabilities.iter().sum();
        let scores: Vec<f64> = (0..state_count)
            .map(|s| standard_score(step, first_level + s, p))
            .collect();

        let mut rates = vec![0.0; state_count * live_count];
        let mut annuities = vec![0.0; state_count * live_count];
        let mut carry = vec![schedule.zero_bond(n); state_count];
        let mut column = vec![0.0; state_count];
        let mut shocks = vec![0.0; state_count];

        for j in (first_live..n).rev() {
            let k = j - first_live;
            if frozen == Some(j) {
                look_back_rate(lattice, d, first_level, step, j, &mut column)?;
            } else {
                let horizon = t.min(schedule.reset_time(j));
                let v = volatilities[j].integrated_variance(0.0, horizon).sqrt();
                for (x, z) in shocks.iter_mut().zip(&scores) {
                    *x = v * z;
                }
                let target = mass * schedule.zero_bond(j);
                let drift = fit_drift(
                    self.config.distribution,
                    schedule.forward(j),
                    schedule.accrual(j),
                    target,
                    &probabilities,
                    &carry,
                    &shocks,
                )
                .map_err(|message| LatticeError::DriftFit {
                    date: d,
                    rate: j,
                    message,
                })?;
                for (l, x) in column.iter_mut().zip(&shocks) {
                    *l = evolve(self.config.distribution, schedule.forward(j), drift, *x);
                }
            }

            let delta = schedule.accrual(j);
            for s in 0..state_count {
                rates[s * live_count + k] = column[s];
                annuities[s * live_count + k] = carry[s];
                carry[s] *= 1.0 + delta * column[s];
            }
        }

        // `carry` now holds the deflated bond paying at T_{first_live}.
        let cash: Vec<f64> = match grid.active_rate(d) {
            None => {
                let t0 = schedule.reset_time(0);
                let stub = schedule.front_discount().powf((t - t0) / t0);
                carry.iter().map(|b| b * stub).collect()
            }
            Some(a) => {
                let start = schedule.reset_time(a);
                let end = schedule.payment_time(a);
                let remaining = (end - t) / (end - start) * schedule.accrual(a);
                (0..state_count)
                    .map(|s| annuities[s * live_count] * (1.0 + remaining * rates[s * live_count]))
                    .collect()
            }
        };

        tracing::trace!(
            date = d,
            time = t,
            step,
            states = state_count,
            pruned_mass = 1.0 - mass,
            "lattice date"
        );

        let layout = DateLayout {
            state_offset: lattice.probabilities.len(),
            value_offset: lattice.rates.len(),
            first_level,
            state_count,
            first_live,
            live_count,
        };
        lattice.probabilities.extend(probabilities);
        lattice.cash.extend(cash);
        lattice.rates.extend(rates);
        lattice.annuities.extend(annuities);
        Ok(layout)
    }
}

/// Contiguous level band `[lo, lo + count)` with probability at least
/// `cutoff`, always containing the mode.
fn retained_levels(binomial: &BinomialLattice, step: usize, cutoff: f64) -> (usize, usize) {
    let p = binomial.up_probability();
    let mode = (((step + 1) as f64 * p).floor() as usize).min(step);
    let mut lo = mode;
    while lo > 0 && binomial.probability(step, lo - 1) >= cutoff {
        lo -= 1;
    }
    let mut hi = mode;
    while hi < step && binomial.probability(step, hi + 1) >= cutoff {
        hi += 1;
    }
    (lo, hi - lo + 1)
}

#[inline]
fn standard_score(step: usize, level: usize, p: f64) -> f64 {
    if step == 0 {
        return 0.0;
    }
    let m = step as f64;
    (level as f64 - m * p) / (m * p * (1.0 - p)).sqrt()
}

#[inline]
fn evolve(distribution: Distribution, forward: f64, drift: f64, shock: f64) -> f64 {
    match distribution {
        Distribution::Lognormal => forward * (drift + shock).exp(),
        Distribution::Normal => forward + drift + shock,
    }
}

/// Solves `Σ p·A·(1 + δ·L(c)) = target` for the drift `c`, where `A` is the
/// deflated claim paying at the rate's end date.
fn fit_drift(
    distribution: Distribution,
    forward: f64,
    accrual: f64,
    target: f64,
    probabilities: &[f64],
    annuities: &[f64],
    shocks: &[f64],
) -> Result<f64, String> {
    let weighted: f64 = probabilities.iter().zip(annuities).map(|(p, a)| p * a).sum();
    let drift = match distribution {
        Distribution::Lognormal => {
            let exposure: f64 = probabilities
                .iter()
                .zip(annuities)
                .zip(shocks)
                .map(|((p, a), x)| p * a * x.exp())
                .sum();
            let numerator = target - weighted;
            let denominator = accrual * forward * exposure;
            if !(numerator > 0.0 && denominator > 0.0) {
                return Err(format!(
                    "no positive rate level reprices the bond (target {target:e}, annuity mass {weighted:e})"
                ));
            }
            (numerator / denominator).ln()
        }
        Distribution::Normal => {
            if !(weighted > 0.0) {
                return Err(format!("annuity mass {weighted:e} is not positive"));
            }
            let exposure: f64 = probabilities
                .iter()
                .zip(annuities)
                .zip(shocks)
                .map(|((p, a), x)| p * a * (forward + x))
                .sum();
            (target - weighted - accrual * exposure) / (accrual * weighted)
        }
    };
    if drift.is_finite() {
        Ok(drift)
    } else {
        Err(format!("drift {drift} is not finite"))
    }
}

/// Expectation of rate `a` at its reset node, conditional on each state of
/// the current date.
fn look_back_rate(
    lattice: &RateLattice,
    d: usize,
    first_level: usize,
    step: usize,
    a: usize,
    out: &mut [f64],
) -> Result<(), LatticeError> {
    let reset = lattice.grid.tenor_node(a);
    let layout = lattice
        .layouts
        .get(reset)
        .copied()
        .ok_or(LatticeError::DateOutOfRange {
            date: reset,
            count: lattice.layouts.len(),
        })?;
    let reset_step = lattice.grid.step(reset);
    let offset = a - layout.first_live;
    let rate_at = |s: usize| lattice.rates[layout.value_offset + s * layout.live_count + offset];
    let prob_at = |s: usize| lattice.probabilities[layout.state_offset + s];

    for (s, value) in out.iter_mut().enumerate() {
        let level = first_level + s;
        let mut weight = 0.0;
        let mut acc = 0.0;
        for r in 0..layout.state_count {
            let w = lattice.binomial.conditional_probability(
                reset_step,
                layout.first_level + r,
                step,
                level,
            );
            weight += w;
            acc += w * rate_at(r);
        }
        if weight > 0.0 {
            *value = acc / weight;
        } else {
            // Every compatible reset state was pruned; use the unconditional mean.
            let mass: f64 = (0..layout.state_count).map(prob_at).sum();
            *value = (0..layout.state_count).map(|r| prob_at(r) * rate_at(r)).sum::<f64>() / mass;
            tracing::debug!(date = d, rate = a, state = s, "look-back fell back to the marginal mean");
        }
    }
    Ok(())
}
