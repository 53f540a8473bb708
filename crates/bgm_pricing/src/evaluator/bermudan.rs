//! Backward induction over the rate lattice.

use bgm_models::lattice::{DateNodes, RateLattice};
use bgm_models::schedules::TenorSchedule;
use tracing::{debug, warn};

use super::EvaluatorConfig;
use crate::cashflow::ExerciseStyle;
use crate::swaption::{SwaptionRepresentation, UnderlyingSwap};
use crate::EvaluationError;

/// Largest gap between a record's exercise time and its lattice reset.
const EXERCISE_TIME_TOLERANCE: f64 = 1e-8;

/// Exercise statistics of one node date, from the forward pass.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CallProbability {
    /// Node date time
    pub time: f64,
    /// Node date index
    pub node: usize,
    /// Record whose swap is entered at this date
    pub record: usize,
    /// Probability of first exercise at this date
    pub probability: f64,
    /// Expected deflated level received in the exercised states
    pub called_annuity: f64,
    /// Value today of one unit paid at this date
    pub zero_bond: f64,
}

/// Output of [`BermudanEvaluator::evaluate`].
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EvaluationResult {
    /// Option value per unit of the price convention of the records
    pub value: f64,
    /// European value of each record at its own exercise date
    pub european_values: Vec<f64>,
    /// Per-date exercise probabilities, when tracked
    pub call_probabilities: Option<Vec<CallProbability>>,
    /// Record that triggered the unconditional-call override, if any
    pub unconditional_call: Option<usize>,
}

impl EvaluationResult {
    fn zero() -> Self {
        Self {
            value: 0.0,
            european_values: Vec::new(),
            call_probabilities: None,
            unconditional_call: None,
        }
    }

    /// Total probability of exercising at some date.
    pub fn exercise_probability(&self) -> Option<f64> {
        self.call_probabilities
            .as_ref()
            .map(|calls| calls.iter().map(|c| c.probability).sum())
    }
}

/// Values early-exercise swaptions on a [`RateLattice`].
///
/// Each exercise opportunity is a [`SwaptionRepresentation`]. At its node
/// date the holder compares the intrinsic value of entering the remaining
/// swap with the continuation value, computed as the expectation of the
/// next exercise date's values under the binomial transition probabilities,
/// renormalised over the retained states.
///
/// # Example
///
/// ```
/// use bgm_models::analytical::OptionType;
/// use bgm_models::lattice::{LatticeBuilder, LatticeConfig};
/// use bgm_models::schedules::TenorSchedule;
/// use bgm_models::volatility::VolatilityCurve;
/// use bgm_core::market_data::volatility::FlatVolatility;
/// use bgm_core::market_data::curves::FlatCurve;
/// use bgm_pricing::cashflow::ExerciseStyle;
/// use bgm_pricing::evaluator::BermudanEvaluator;
/// use bgm_pricing::swaption::{build_representations, SolverControls, UnderlyingSwap};
///
/// let curve = FlatCurve::new(0.03);
/// let schedule = TenorSchedule::from_curve(&curve, vec![1.0, 2.0, 3.0]).unwrap();
/// let vols: Vec<_> = (0..2)
///     .map(|k| VolatilityCurve::flat(0.2, schedule.reset_time(k)).unwrap())
///     .collect();
/// let lattice = LatticeBuilder::new(LatticeConfig::fast())
///     .build(&schedule, &vols, &[])
///     .unwrap();
///
/// let underlying = UnderlyingSwap::bullet(2, 1.0, 0.03);
/// let records = build_representations(
///     &schedule, &underlying, &[0, 1], OptionType::Call, &curve,
///     &FlatVolatility::lognormal(0.2), None, SolverControls::default(),
/// ).unwrap();
///
/// let result = BermudanEvaluator::default()
///     .evaluate(&lattice, &underlying, &records, ExerciseStyle::Bermudan)
///     .unwrap();
/// assert!(result.value >= result.european_values[0] - 1e-10);
/// ```
#[derive(Debug, Clone, Default)]
pub struct BermudanEvaluator {
    config: EvaluatorConfig,
}

impl BermudanEvaluator {
    /// Evaluator with `config`.
    pub fn new(config: EvaluatorConfig) -> Self {
        Self { config }
    }

    /// Evaluator configuration.
    pub fn config(&self) -> &EvaluatorConfig {
        &self.config
    }

    /// Values the option described by `records` on `lattice`.
    ///
    /// European style uses the first record only. American style exercises
    /// at every node date from the first record's reset onwards, into the
    /// swap of the latest record reset by then.
    ///
    /// The exercise decision and payoff use `(S - K)·level`, with `S` the
    /// state's swap rate and `K` the record's single time-0 strike. When
    /// coupons or notionals vary by period, that strike is a level-weighted
    /// average, and the value can drift a few percent from discounting the
    /// fixed leg coupon by coupon in each state. Constant-coupon schedules
    /// are unaffected.
    ///
    /// # Errors
    ///
    /// [`EvaluationError::ScheduleMismatch`] when the underlying or the
    /// records do not line up with the lattice schedule.
    #[tracing::instrument(skip_all, fields(records = records.len(), style = ?style))]
    pub fn evaluate(
        &self,
        lattice: &RateLattice,
        underlying: &UnderlyingSwap,
        records: &[SwaptionRepresentation],
        style: ExerciseStyle,
    ) -> Result<EvaluationResult, EvaluationError> {
        let schedule = lattice.schedule();
        validate(schedule, underlying, records)?;
        if records.is_empty() {
            return Ok(EvaluationResult::zero());
        }
        let records = match style {
            ExerciseStyle::European => &records[..1],
            _ => records,
        };

        let european_values = records
            .iter()
            .map(|record| {
                let node = lattice.grid().tenor_node(record.rate_index);
                european_value(&lattice.date(node)?, schedule, underlying, record)
            })
            .collect::<Result<Vec<_>, EvaluationError>>()?;

        if self.config.guard_unconditional_call {
            if let Some(r) = records.iter().position(|r| r.is_unconditional_call()) {
                warn!(
                    record = r,
                    exercise_time = records[r].exercise_time,
                    "unconditional call, valuing as exercised at a single date"
                );
                let call_probabilities = if self.config.track_call_probabilities {
                    let nodes = lattice.date(lattice.grid().tenor_node(records[r].rate_index))?;
                    Some(vec![single_call(&nodes, schedule, underlying, &records[r], r)?])
                } else {
                    None
                };
                return Ok(EvaluationResult {
                    value: european_values[r],
                    european_values,
                    call_probabilities,
                    unconditional_call: Some(r),
                });
            }
        }

        let plan = exercise_plan(lattice, records, style);
        let track = self.config.track_call_probabilities;
        let mut decisions: Vec<Vec<bool>> = Vec::with_capacity(if track { plan.len() } else { 0 });
        let mut next: Option<(usize, Vec<f64>)> = None;

        for &(d, r) in plan.iter().rev() {
            let nodes = lattice.date(d)?;
            let exercise = self.exercise_values(&nodes, schedule, underlying, &records[r])?;
            let continuation = match &next {
                Some((d_next, values)) => continuation_values(lattice, &nodes, *d_next, values)?,
                None => vec![0.0; nodes.state_count()],
            };
            if track {
                decisions.push(
                    exercise
                        .iter()
                        .zip(&continuation)
                        .map(|(&e, &c)| e > c && e > 0.0)
                        .collect(),
                );
            }
            let values = exercise
                .iter()
                .zip(&continuation)
                .map(|(&e, &c)| e.max(c))
                .collect();
            next = Some((d, values));
        }

        let value = match &next {
            Some((d_first, values)) => {
                let root = lattice.date(0)?;
                continuation_values(lattice, &root, *d_first, values)?[0]
            }
            None => 0.0,
        };
        debug!(value, dates = plan.len(), "lattice evaluation complete");

        let call_probabilities = if track {
            decisions.reverse();
            Some(call_probabilities(
                lattice, schedule, underlying, records, &plan, &decisions,
            )?)
        } else {
            None
        };

        Ok(EvaluationResult {
            value,
            european_values,
            call_probabilities,
            unconditional_call: None,
        })
    }

    /// Intrinsic value of entering `record`'s swap in every state of `nodes`.
    ///
    /// The decision value is `sign·(S − K)·level` with `S` the state's swap
    /// rate. Debug builds also compute `sign·(float − fixed)` leg by leg and
    /// report any disagreement.
    fn exercise_values(
        &self,
        nodes: &DateNodes<'_>,
        schedule: &TenorSchedule,
        underlying: &UnderlyingSwap,
        record: &SwaptionRepresentation,
    ) -> Result<Vec<f64>, EvaluationError> {
        let mut values = Vec::with_capacity(nodes.state_count());
        let mut worst = 0.0_f64;
        for s in 0..nodes.state_count() {
            let legs = swap_legs(nodes, s, schedule, underlying, record)?;
            let value = legs.decision_value(record);
            if cfg!(debug_assertions) {
                let gap = (value - legs.leg_value(record)).abs();
                if gap > self.config.consistency_tolerance * (1.0 + value.abs()) {
                    worst = worst.max(gap);
                }
            }
            values.push(value);
        }
        if worst > 0.0 {
            warn!(
                date = nodes.index(),
                discrepancy = worst,
                "intrinsic value disagrees between swap-rate and leg forms"
            );
        }
        Ok(values)
    }
}

/// Deflated legs of the remaining swap in one state.
#[derive(Debug, Clone, Copy, Default)]
struct SwapLegs {
    level: f64,
    floating: f64,
    fixed: f64,
}

impl SwapLegs {
    fn decision_value(&self, record: &SwaptionRepresentation) -> f64 {
        if self.level <= 0.0 {
            return 0.0;
        }
        let swap_rate = self.floating / self.level;
        record.option_type.sign() * (swap_rate - record.strike) * self.level
    }

    fn leg_value(&self, record: &SwaptionRepresentation) -> f64 {
        record.option_type.sign() * (self.floating - self.fixed)
    }
}

fn swap_legs(
    nodes: &DateNodes<'_>,
    s: usize,
    schedule: &TenorSchedule,
    underlying: &UnderlyingSwap,
    record: &SwaptionRepresentation,
) -> Result<SwapLegs, EvaluationError> {
    let live = nodes.live_rates();
    let rates = nodes.rates(s)?;
    let annuities = nodes.annuities(s)?;
    let mut legs = SwapLegs::default();
    for k in record.rate_index.max(live.start)..live.end {
        let offset = k - live.start;
        let weighted = underlying.notionals[k] * schedule.accrual(k) * annuities[offset];
        legs.level += weighted;
        legs.floating += weighted * rates[offset];
        legs.fixed += weighted * (underlying.coupons[k] + record.strike_adjustment);
    }
    Ok(legs)
}

fn european_value(
    nodes: &DateNodes<'_>,
    schedule: &TenorSchedule,
    underlying: &UnderlyingSwap,
    record: &SwaptionRepresentation,
) -> Result<f64, EvaluationError> {
    let mass = nodes.probability_mass();
    if mass <= 0.0 {
        return Ok(0.0);
    }
    let mut value = 0.0;
    for (s, p) in nodes.probabilities().iter().enumerate() {
        let legs = swap_legs(nodes, s, schedule, underlying, record)?;
        value += p * legs.decision_value(record).max(0.0);
    }
    Ok(value / mass)
}

fn single_call(
    nodes: &DateNodes<'_>,
    schedule: &TenorSchedule,
    underlying: &UnderlyingSwap,
    record: &SwaptionRepresentation,
    r: usize,
) -> Result<CallProbability, EvaluationError> {
    let mass = nodes.probability_mass();
    let mut called_annuity = 0.0;
    for (s, p) in nodes.probabilities().iter().enumerate() {
        called_annuity += p * swap_legs(nodes, s, schedule, underlying, record)?.level;
    }
    Ok(CallProbability {
        time: nodes.time(),
        node: nodes.index(),
        record: r,
        probability: 1.0,
        called_annuity: if mass > 0.0 { called_annuity / mass } else { 0.0 },
        zero_bond: zero_bond(nodes),
    })
}

fn zero_bond(nodes: &DateNodes<'_>) -> f64 {
    let mass = nodes.probability_mass();
    if mass <= 0.0 {
        return 0.0;
    }
    nodes
        .probabilities()
        .iter()
        .zip(nodes.cash_values())
        .map(|(p, c)| p * c)
        .sum::<f64>()
        / mass
}

/// `(node date, record)` pairs in date order.
fn exercise_plan(
    lattice: &RateLattice,
    records: &[SwaptionRepresentation],
    style: ExerciseStyle,
) -> Vec<(usize, usize)> {
    let grid = lattice.grid();
    let nodes: Vec<usize> = records
        .iter()
        .map(|r| grid.tenor_node(r.rate_index))
        .collect();
    match style {
        ExerciseStyle::European => vec![(nodes[0], 0)],
        ExerciseStyle::Bermudan => nodes.into_iter().enumerate().map(|(r, d)| (d, r)).collect(),
        ExerciseStyle::American => (nodes[0]..lattice.date_count())
            .map(|d| {
                let r = nodes.iter().rposition(|&node| node <= d).unwrap_or(0);
                (d, r)
            })
            .collect(),
    }
}

/// Expected value of `values` at `d_next`, conditional on each state of `nodes`.
///
/// Transition weights are renormalised over the retained states of `d_next`.
/// A state whose successors were all pruned takes the marginal mean.
fn continuation_values(
    lattice: &RateLattice,
    nodes: &DateNodes<'_>,
    d_next: usize,
    values: &[f64],
) -> Result<Vec<f64>, EvaluationError> {
    let next = lattice.date(d_next)?;
    let binomial = lattice.binomial();
    let probabilities = next.probabilities();
    let mass = next.probability_mass();
    let marginal_mean = if mass > 0.0 {
        probabilities.iter().zip(values).map(|(p, v)| p * v).sum::<f64>() / mass
    } else {
        0.0
    };

    let mut continuation = Vec::with_capacity(nodes.state_count());
    for s in 0..nodes.state_count() {
        let level = nodes.first_level() + s;
        let mut weight = 0.0;
        let mut expectation = 0.0;
        for (s2, v) in values.iter().enumerate() {
            let q = binomial.conditional_probability(
                next.step(),
                next.first_level() + s2,
                nodes.step(),
                level,
            );
            weight += q;
            expectation += q * v;
        }
        continuation.push(if weight > 0.0 {
            expectation / weight
        } else {
            marginal_mean
        });
    }
    Ok(continuation)
}

/// Forward pass propagating the probability of not having exercised yet.
fn call_probabilities(
    lattice: &RateLattice,
    schedule: &TenorSchedule,
    underlying: &UnderlyingSwap,
    records: &[SwaptionRepresentation],
    plan: &[(usize, usize)],
    decisions: &[Vec<bool>],
) -> Result<Vec<CallProbability>, EvaluationError> {
    let binomial = lattice.binomial();
    let mut calls = Vec::with_capacity(plan.len());
    let mut reach: Vec<f64> = Vec::new();

    for (i, &(d, r)) in plan.iter().enumerate() {
        let nodes = lattice.date(d)?;
        if i == 0 {
            let mass = nodes.probability_mass();
            reach = nodes
                .probabilities()
                .iter()
                .map(|p| if mass > 0.0 { p / mass } else { 0.0 })
                .collect();
        }

        let mut probability = 0.0;
        let mut called_annuity = 0.0;
        for (s, &called) in decisions[i].iter().enumerate() {
            if called {
                probability += reach[s];
                called_annuity +=
                    reach[s] * swap_legs(&nodes, s, schedule, underlying, &records[r])?.level;
            }
        }
        calls.push(CallProbability {
            time: nodes.time(),
            node: d,
            record: r,
            probability,
            called_annuity,
            zero_bond: zero_bond(&nodes),
        });

        if let Some(&(d_next, _)) = plan.get(i + 1) {
            let next = lattice.date(d_next)?;
            let mut propagated = vec![0.0; next.state_count()];
            for (s, &called) in decisions[i].iter().enumerate() {
                if called || reach[s] == 0.0 {
                    continue;
                }
                let level = nodes.first_level() + s;
                let weights: Vec<f64> = (0..next.state_count())
                    .map(|s2| {
                        binomial.conditional_probability(
                            next.step(),
                            next.first_level() + s2,
                            nodes.step(),
                            level,
                        )
                    })
                    .collect();
                let total: f64 = weights.iter().sum();
                if total <= 0.0 {
                    continue;
                }
                for (slot, w) in propagated.iter_mut().zip(&weights) {
                    *slot += reach[s] * w / total;
                }
            }
            reach = propagated;
        }
    }
    Ok(calls)
}

fn validate(
    schedule: &TenorSchedule,
    underlying: &UnderlyingSwap,
    records: &[SwaptionRepresentation],
) -> Result<(), EvaluationError> {
    let n = schedule.rate_count();
    if underlying.len() != n || underlying.coupons.len() != n {
        return Err(EvaluationError::ScheduleMismatch(format!(
            "underlying has {} periods for {} lattice rates",
            underlying.len(),
            n
        )));
    }
    for (i, record) in records.iter().enumerate() {
        if record.rate_index >= n {
            return Err(EvaluationError::ScheduleMismatch(format!(
                "record {i} enters at rate {} of {n}",
                record.rate_index
            )));
        }
        let reset = schedule.reset_time(record.rate_index);
        if (record.exercise_time - reset).abs() > EXERCISE_TIME_TOLERANCE {
            return Err(EvaluationError::ScheduleMismatch(format!(
                "record {i} exercises at {} but rate {} resets at {reset}",
                record.exercise_time, record.rate_index
            )));
        }
        if i > 0 && record.rate_index <= records[i - 1].rate_index {
            return Err(EvaluationError::ScheduleMismatch(
                "records must be in increasing exercise order".to_string(),
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::swaption::{build_representations, SolverControls};
    use approx::{assert_abs_diff_eq, assert_relative_eq};
    use bgm_core::market_data::curves::FlatCurve;
    use bgm_core::market_data::volatility::FlatVolatility;
    use bgm_models::analytical::OptionType;
    use bgm_models::lattice::{LatticeBuilder, LatticeConfig};
    use bgm_models::volatility::VolatilityCurve;

    fn setup(
        sigma: f64,
        coupon: f64,
        option_type: OptionType,
        extra: &[f64],
    ) -> (RateLattice, UnderlyingSwap, Vec<SwaptionRepresentation>) {
        let curve = FlatCurve::new(0.03);
        let schedule = TenorSchedule::from_curve(&curve, vec![1.0, 2.0, 3.0, 4.0, 5.0]).unwrap();
        let vols: Vec<_> = (0..4)
            .map(|k| VolatilityCurve::flat(sigma, schedule.reset_time(k)).unwrap())
            .collect();
        let lattice = LatticeBuilder::new(LatticeConfig::default().with_steps(80))
            .build(&schedule, &vols, extra)
            .unwrap();
        let underlying = UnderlyingSwap::bullet(4, 1.0, coupon);
        let records = build_representations(
            &schedule,
            &underlying,
            &[0, 1, 2, 3],
            option_type,
            &curve,
            &FlatVolatility::lognormal(sigma),
            None,
            SolverControls::default(),
        )
        .unwrap();
        (lattice, underlying, records)
    }

    // ========================================
    // Exercise styles
    // ========================================

    #[test]
    fn test_bermudan_dominates_every_european() {
        let (lattice, underlying, records) = setup(0.2, 0.03, OptionType::Put, &[]);
        let result = BermudanEvaluator::default()
            .evaluate(&lattice, &underlying, &records, ExerciseStyle::Bermudan)
            .unwrap();
        assert_eq!(result.european_values.len(), 4);
        for e in &result.european_values {
            assert!(result.value >= e - 1e-10);
        }
        let sum: f64 = result.european_values.iter().sum();
        assert!(result.value <= sum + 1e-10);
    }

    #[test]
    fn test_european_style_uses_first_record() {
        let (lattice, underlying, records) = setup(0.2, 0.03, OptionType::Call, &[]);
        let result = BermudanEvaluator::default()
            .evaluate(&lattice, &underlying, &records, ExerciseStyle::European)
            .unwrap();
        assert_eq!(result.european_values.len(), 1);
        assert_relative_eq!(result.value, result.european_values[0], max_relative = 1e-10);
    }

    #[test]
    fn test_american_dominates_bermudan() {
        let (lattice, underlying, records) =
            setup(0.2, 0.03, OptionType::Put, &[1.5, 2.5, 3.5]);
        let evaluator = BermudanEvaluator::default();
        let bermudan = evaluator
            .evaluate(&lattice, &underlying, &records, ExerciseStyle::Bermudan)
            .unwrap();
        let american = evaluator
            .evaluate(&lattice, &underlying, &records, ExerciseStyle::American)
            .unwrap();
        assert!(american.value >= bermudan.value - 1e-10);
    }

    #[test]
    fn test_zero_volatility_is_intrinsic() {
        let (lattice, underlying, records) = setup(0.0, 0.02, OptionType::Call, &[]);
        let result = BermudanEvaluator::default()
            .evaluate(&lattice, &underlying, &records, ExerciseStyle::Bermudan)
            .unwrap();
        // Deterministic rates: the best date is the first, entering the longest swap.
        let schedule = lattice.schedule();
        let intrinsic = (schedule.swap_rate(0, 4) - 0.02) * schedule.level(0, 4);
        assert_relative_eq!(result.value, intrinsic, max_relative = 1e-9);
    }

    #[test]
    fn test_empty_records_value_zero() {
        let (lattice, underlying, _) = setup(0.2, 0.03, OptionType::Call, &[]);
        let result = BermudanEvaluator::default()
            .evaluate(&lattice, &underlying, &[], ExerciseStyle::Bermudan)
            .unwrap();
        assert_eq!(result.value, 0.0);
        assert!(result.european_values.is_empty());
    }

    #[test]
    fn test_single_strike_decision_value() {
        let (lattice, flat, records) = setup(0.3, 0.03, OptionType::Put, &[]);
        let schedule = lattice.schedule();
        let nodes = lattice.date(lattice.grid().tenor_node(0)).unwrap();
        assert!(nodes.state_count() > 1);
        for s in 0..nodes.state_count() {
            let legs = swap_legs(&nodes, s, schedule, &flat, &records[0]).unwrap();
            assert_relative_eq!(
                legs.decision_value(&records[0]),
                legs.leg_value(&records[0]),
                epsilon = 1e-12
            );
        }

        // A back-loaded coupon averages into one strike at time 0, which only
        // matches the coupon-by-coupon fixed leg on the forward curve.
        let stepped = UnderlyingSwap {
            notionals: vec![1.0; 4],
            coupons: vec![0.0, 0.0, 0.0, 0.08],
        };
        let stepped_records = build_representations(
            schedule,
            &stepped,
            &[0],
            OptionType::Put,
            &FlatCurve::new(0.03),
            &FlatVolatility::lognormal(0.3),
            None,
            SolverControls::default(),
        )
        .unwrap();
        let record = &stepped_records[0];
        let mut widest = 0.0_f64;
        for s in 0..nodes.state_count() {
            let legs = swap_legs(&nodes, s, schedule, &stepped, record).unwrap();
            let single_strike = record.option_type.sign()
                * (legs.floating / legs.level - record.strike)
                * legs.level;
            assert_relative_eq!(legs.decision_value(record), single_strike, epsilon = 1e-12);
            widest = widest.max((legs.decision_value(record) - legs.leg_value(record)).abs());
        }
        assert!(widest > 1e-6);
    }

    // ========================================
    // Call probabilities
    // ========================================

    #[test]
    fn test_call_probabilities_bounded() {
        let (lattice, underlying, records) = setup(0.2, 0.03, OptionType::Put, &[]);
        let evaluator =
            BermudanEvaluator::new(EvaluatorConfig::default().with_call_probabilities(true));
        let result = evaluator
            .evaluate(&lattice, &underlying, &records, ExerciseStyle::Bermudan)
            .unwrap();
        let calls = result.call_probabilities.as_ref().unwrap();
        assert_eq!(calls.len(), 4);
        for c in calls {
            assert!(c.probability >= 0.0);
            assert!(c.zero_bond > 0.0 && c.zero_bond < 1.0);
        }
        let total = result.exercise_probability().unwrap();
        assert!(total > 0.0 && total <= 1.0 + 1e-9);
    }

    #[test]
    fn test_deep_in_the_money_exercises_first_date() {
        let (lattice, underlying, records) = setup(0.1, 0.0, OptionType::Call, &[]);
        let evaluator =
            BermudanEvaluator::new(EvaluatorConfig::default().with_call_probabilities(true));
        let result = evaluator
            .evaluate(&lattice, &underlying, &records, ExerciseStyle::Bermudan)
            .unwrap();
        let calls = result.call_probabilities.unwrap();
        assert_abs_diff_eq!(calls[0].probability, 1.0, epsilon = 1e-6);
        assert!(calls[1..].iter().all(|c| c.probability.abs() < 1e-6));
    }

    // ========================================
    // Guards and validation
    // ========================================

    #[test]
    fn test_unconditional_call_override() {
        let (lattice, underlying, mut records) = setup(0.2, 0.03, OptionType::Call, &[]);
        records[1].swap_rate = 0.6;
        records[1].level = 2.0;
        let result = BermudanEvaluator::default()
            .evaluate(&lattice, &underlying, &records, ExerciseStyle::Bermudan)
            .unwrap();
        assert_eq!(result.unconditional_call, Some(1));
        assert_eq!(result.value, result.european_values[1]);
    }

    #[test]
    fn test_rejects_misaligned_records() {
        let (lattice, underlying, mut records) = setup(0.2, 0.03, OptionType::Call, &[]);
        records[2].exercise_time += 0.1;
        let err = BermudanEvaluator::default()
            .evaluate(&lattice, &underlying, &records, ExerciseStyle::Bermudan)
            .unwrap_err();
        assert!(matches!(err, EvaluationError::ScheduleMismatch(_)));

        let err = BermudanEvaluator::default()
            .evaluate(
                &lattice,
                &UnderlyingSwap::bullet(3, 1.0, 0.03),
                &records[..1],
                ExerciseStyle::Bermudan,
            )
            .unwrap_err();
        assert!(matches!(err, EvaluationError::ScheduleMismatch(_)));
    }
}
