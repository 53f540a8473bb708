//! Co-terminal European swaption records derived from a cashflow schedule.

use bgm_core::market_data::curves::{loss_leg_pv, SurvivalCurve, YieldCurve};
use bgm_core::market_data::volatility::{VolatilityKind, VolatilityQuery, VolatilitySource};
use bgm_models::analytical::OptionType;
use bgm_models::calibration::SwaptionQuote;
use bgm_models::schedules::TenorSchedule;

use crate::cashflow::CashflowSchedule;
use crate::EvaluationError;

/// Numerical controls carried with each record.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SolverControls {
    /// Price accuracy requested from calibration
    pub accuracy: f64,
    /// Binomial steps of the lattice
    pub steps: usize,
}

impl Default for SolverControls {
    fn default() -> Self {
        Self {
            accuracy: 1e-8,
            steps: 100,
        }
    }
}

/// Fixed leg of the underlying swap, one entry per lattice rate.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct UnderlyingSwap {
    /// Outstanding notional of each rate's period
    pub notionals: Vec<f64>,
    /// Fixed coupon of each rate's period
    pub coupons: Vec<f64>,
}

impl UnderlyingSwap {
    /// Flat notional and coupon over `rates` periods.
    pub fn bullet(rates: usize, notional: f64, coupon: f64) -> Self {
        Self {
            notionals: vec![notional; rates],
            coupons: vec![coupon; rates],
        }
    }

    /// Periods `first..` of `cashflows`.
    pub fn from_cashflows(cashflows: &CashflowSchedule, first: usize) -> Self {
        let periods = &cashflows.periods()[first..];
        Self {
            notionals: periods.iter().map(|p| p.notional).collect(),
            coupons: periods.iter().map(|p| p.coupon).collect(),
        }
    }

    /// Number of periods.
    pub fn len(&self) -> usize {
        self.notionals.len()
    }

    /// `true` with no periods.
    pub fn is_empty(&self) -> bool {
        self.notionals.is_empty()
    }
}

/// One exercise opportunity: the European swaption into the remaining
/// co-terminal swap.
///
/// `level` is `Σ N_k·δ_k·P(0, T_{k+1})` over the remaining periods and
/// `swap_rate` the matching forward swap rate. `strike` already includes
/// `strike_adjustment`. With a survival curve attached the adjustment is
/// minus the protection value per unit of risky level: a coupon from a
/// risky issuer is worth less than the same coupon on the swap curve.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SwaptionRepresentation {
    /// Exercise time (reset time of the first underlying rate)
    pub exercise_time: f64,
    /// First underlying rate on the lattice schedule
    pub rate_index: usize,
    /// Notional outstanding at exercise
    pub notional: f64,
    /// Forward swap rate
    pub swap_rate: f64,
    /// Notional-weighted annuity
    pub level: f64,
    /// Effective strike
    pub strike: f64,
    /// Credit adjustment included in `strike`, zero or negative
    pub strike_adjustment: f64,
    /// Market volatility of the swaption
    pub volatility: f64,
    /// Convention of `volatility`
    pub volatility_kind: VolatilityKind,
    /// Payer (call) or receiver (put)
    pub option_type: OptionType,
    /// Numerical controls
    pub controls: SolverControls,
}

impl SwaptionRepresentation {
    /// Undiscounted value per unit of `rate · level` exceeds one, so no
    /// state-dependent decision can beat exercising at this date.
    pub fn is_unconditional_call(&self) -> bool {
        self.notional > 0.0 && self.swap_rate * self.level / self.notional > 1.0
    }

    /// Co-terminal calibration quote for this record, ending at `end`.
    pub fn quote(&self, end: usize) -> SwaptionQuote {
        SwaptionQuote::new(
            self.rate_index,
            end,
            self.strike,
            self.volatility,
            self.volatility_kind,
        )
        .with_option_type(self.option_type)
    }
}

/// Builds one record per entry of `exercise_rates`, in order.
///
/// Volatilities come from `vols` at `(T_a, T_n − T_a)` with the record's
/// forward and strike. With a survival curve, each strike is lowered by the
/// loss leg value conditional on survival to exercise, divided by the risky
/// level.
///
/// # Errors
///
/// Mismatched underlying length, unordered exercise rates, or lookup failures.
#[allow(clippy::too_many_arguments)]
pub fn build_representations<C, V>(
    schedule: &TenorSchedule,
    underlying: &UnderlyingSwap,
    exercise_rates: &[usize],
    option_type: OptionType,
    curve: &C,
    vols: &V,
    survival: Option<&dyn SurvivalCurve>,
    controls: SolverControls,
) -> Result<Vec<SwaptionRepresentation>, EvaluationError>
where
    C: YieldCurve<f64> + ?Sized,
    V: VolatilitySource + ?Sized,
{
    let n = schedule.rate_count();
    if underlying.len() != n || underlying.coupons.len() != n {
        return Err(EvaluationError::ScheduleMismatch(format!(
            "underlying has {} periods for {} lattice rates",
            underlying.len(),
            n
        )));
    }
    if exercise_rates.windows(2).any(|w| w[1] <= w[0]) {
        return Err(EvaluationError::InvalidInput(
            "exercise rates must be strictly increasing".to_string(),
        ));
    }
    if let Some(&a) = exercise_rates.iter().find(|&&a| a >= n) {
        return Err(EvaluationError::ScheduleMismatch(format!(
            "exercise rate {a} beyond the {n} lattice rates"
        )));
    }

    let maturity = schedule.times()[n];
    let mut records = Vec::with_capacity(exercise_rates.len());
    for &a in exercise_rates {
        let weight = |k: usize| underlying.notionals[k] * schedule.accrual(k);
        let level: f64 = (a..n).map(|k| weight(k) * schedule.zero_bond(k + 1)).sum();
        let (swap_rate, coupon) = if level > 0.0 {
            let float: f64 = (a..n)
                .map(|k| weight(k) * schedule.forward(k) * schedule.zero_bond(k + 1))
                .sum();
            let fixed: f64 = (a..n)
                .map(|k| weight(k) * underlying.coupons[k] * schedule.zero_bond(k + 1))
                .sum();
            (float / level, fixed / level)
        } else {
            (schedule.swap_rate(a, n), underlying.coupons[a])
        };

        let expiry = schedule.reset_time(a);
        let strike_adjustment = match survival {
            Some(curve_q) => credit_adjustment(schedule, underlying, a, curve, curve_q)?,
            None => 0.0,
        };
        let strike = coupon + strike_adjustment;
        let volatility = vols.volatility(&VolatilityQuery {
            expiry,
            tenor: maturity - expiry,
            forward: swap_rate,
            strike,
        })?;

        records.push(SwaptionRepresentation {
            exercise_time: expiry,
            rate_index: a,
            notional: underlying.notionals[a],
            swap_rate,
            level,
            strike,
            strike_adjustment,
            volatility,
            volatility_kind: vols.kind(),
            option_type,
            controls,
        });
    }
    Ok(records)
}

/// Minus the loss leg value per unit of risky level, conditional on survival
/// to `T_a`.
fn credit_adjustment<C>(
    schedule: &TenorSchedule,
    underlying: &UnderlyingSwap,
    a: usize,
    curve: &C,
    survival: &dyn SurvivalCurve,
) -> Result<f64, EvaluationError>
where
    C: YieldCurve<f64> + ?Sized,
{
    let n = schedule.rate_count();
    let times = &schedule.times()[a..];
    let expiry = times[0];
    let loss = loss_leg_pv(survival, curve, times, &underlying.notionals[a..], expiry)?;
    let q0 = survival.survival_probability(expiry)?;
    if loss == 0.0 || q0 <= 0.0 {
        return Ok(0.0);
    }
    let mut risky_level = 0.0;
    for k in a..n {
        let end = schedule.times()[k + 1];
        risky_level += underlying.notionals[k]
            * schedule.accrual(k)
            * curve.discount_factor(end)?
            * survival.survival_probability(end)?
            / q0;
    }
    if risky_level <= 0.0 {
        return Ok(0.0);
    }
    Ok(-loss / risky_level)
}
