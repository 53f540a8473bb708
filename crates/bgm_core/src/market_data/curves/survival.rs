//! Survival (credit) curves used to adjust exercise economics.

use super::YieldCurve;
use crate::market_data::error::MarketDataError;

/// Survival probability contract.
///
/// `Q(0) = 1` and `Q` is non-increasing as long as every hazard rate is
/// non-negative. Curves can be shifted by a parallel hazard spread; a shift
/// that would drive any hazard below zero is infeasible.
pub trait SurvivalCurve {
    /// Probability of no default before `t`.
    fn survival_probability(&self, t: f64) -> Result<f64, MarketDataError>;

    /// Recovery fraction applied to the defaulted notional.
    fn recovery_rate(&self) -> f64;

    /// Smallest parallel hazard shift that keeps the curve feasible.
    fn minimum_shift(&self) -> f64;

    /// Curve with every hazard rate moved by `shift`.
    ///
    /// # Errors
    ///
    /// [`MarketDataError::InfeasibleShift`] if `shift < minimum_shift()`.
    fn bumped(&self, shift: f64) -> Result<Self, MarketDataError>
    where
        Self: Sized;

    /// Probability of default in `(t1, t2]` conditional on survival to `t1`.
    fn conditional_default_probability(&self, t1: f64, t2: f64) -> Result<f64, MarketDataError> {
        let q1 = self.survival_probability(t1)?;
        if q1 <= 0.0 {
            return Ok(1.0);
        }
        Ok(1.0 - self.survival_probability(t2)? / q1)
    }
}

fn check_shift(shift: f64, minimum: f64) -> Result<(), MarketDataError> {
    if shift < minimum {
        return Err(MarketDataError::InfeasibleShift { shift, minimum });
    }
    Ok(())
}

fn check_recovery(recovery: f64) -> Result<(), MarketDataError> {
    if !(0.0..=1.0).contains(&recovery) {
        return Err(MarketDataError::InvalidParameter(format!(
            "recovery rate must lie in [0, 1], got {recovery}"
        )));
    }
    Ok(())
}

/// Constant hazard rate curve, `Q(t) = exp(-h·t)`.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FlatHazardCurve {
    hazard: f64,
    recovery: f64,
}

impl FlatHazardCurve {
    /// Flat curve with a non-negative hazard rate.
    pub fn new(hazard: f64, recovery: f64) -> Result<Self, MarketDataError> {
        if !(hazard >= 0.0) {
            return Err(MarketDataError::InvalidParameter(format!(
                "hazard rate must be non-negative, got {hazard}"
            )));
        }
        check_recovery(recovery)?;
        Ok(Self { hazard, recovery })
    }

    /// The hazard rate.
    pub fn hazard(&self) -> f64 {
        self.hazard
    }
}

impl SurvivalCurve for FlatHazardCurve {
    fn survival_probability(&self, t: f64) -> Result<f64, MarketDataError> {
        if t < 0.0 || t.is_nan() {
            return Err(MarketDataError::InvalidMaturity { t });
        }
        Ok((-self.hazard * t).exp())
    }

    fn recovery_rate(&self) -> f64 {
        self.recovery
    }

    fn minimum_shift(&self) -> f64 {
        -self.hazard
    }

    fn bumped(&self, shift: f64) -> Result<Self, MarketDataError> {
        check_shift(shift, self.minimum_shift())?;
        Ok(Self {
            hazard: self.hazard + shift,
            recovery: self.recovery,
        })
    }
}

/// Piecewise-constant hazard curve.
///
/// `hazards[k]` applies on `(end_times[k-1], end_times[k]]`; the last hazard
/// is extended beyond the final end time.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PiecewiseHazardCurve {
    end_times: Vec<f64>,
    hazards: Vec<f64>,
    recovery: f64,
}

impl PiecewiseHazardCurve {
    /// Builds the curve from segment end times and hazard rates.
    pub fn new(end_times: Vec<f64>, hazards: Vec<f64>, recovery: f64) -> Result<Self, MarketDataError> {
        if end_times.is_empty() || end_times.len() != hazards.len() {
            return Err(MarketDataError::InsufficientData {
                got: hazards.len(),
                need: end_times.len().max(1),
            });
        }
        let mut prev = 0.0;
        for &t in &end_times {
            if !(t > prev) {
                return Err(MarketDataError::InvalidMaturity { t });
            }
            prev = t;
        }
        if let Some(&h) = hazards.iter().find(|&&h| !(h >= 0.0)) {
            return Err(MarketDataError::InvalidParameter(format!(
                "hazard rate must be non-negative, got {h}"
            )));
        }
        check_recovery(recovery)?;
        Ok(Self {
            end_times,
            hazards,
            recovery,
        })
    }

    /// Segment hazard rates.
    pub fn hazards(&self) -> &[f64] {
        &self.hazards
    }

    fn integrated_hazard(&self, t: f64) -> f64 {
        let mut acc = 0.0;
        let mut start = 0.0;
        for (&end, &h) in self.end_times.iter().zip(&self.hazards) {
            if t <= end {
                return acc + h * (t - start);
            }
            acc += h * (end - start);
            start = end;
        }
        let last = self.hazards[self.hazards.len() - 1];
        acc + last * (t - start)
    }
}

impl SurvivalCurve for PiecewiseHazardCurve {
    fn survival_probability(&self, t: f64) -> Result<f64, MarketDataError> {
        if t < 0.0 || t.is_nan() {
            return Err(MarketDataError::InvalidMaturity { t });
        }
        Ok((-self.integrated_hazard(t)).exp())
    }

    fn recovery_rate(&self) -> f64 {
        self.recovery
    }

    fn minimum_shift(&self) -> f64 {
        -self.hazards.iter().copied().fold(f64::INFINITY, f64::min)
    }

    fn bumped(&self, shift: f64) -> Result<Self, MarketDataError> {
        check_shift(shift, self.minimum_shift())?;
        Ok(Self {
            end_times: self.end_times.clone(),
            hazards: self.hazards.iter().map(|h| (h + shift).max(0.0)).collect(),
            recovery: self.recovery,
        })
    }
}

/// Present value of the protection (loss) leg over a schedule, conditional
/// on survival to `conditioning_time`.
///
/// `(1 - R) · Σ_j N_j · D(t_{j+1}) · (Q(t_j) - Q(t_{j+1})) / Q(conditioning_time)`
///
/// `schedule` holds the period boundaries `t_0 < ... < t_n` and `notionals`
/// the `n` period notionals. A curve that has already defaulted by the
/// conditioning time carries no further loss.
pub fn loss_leg_pv<S, C>(
    survival: &S,
    discount: &C,
    schedule: &[f64],
    notionals: &[f64],
    conditioning_time: f64,
) -> Result<f64, MarketDataError>
where
    S: SurvivalCurve + ?Sized,
    C: YieldCurve<f64> + ?Sized,
{
    if schedule.len() != notionals.len() + 1 {
        return Err(MarketDataError::InsufficientData {
            got: notionals.len(),
            need: schedule.len().saturating_sub(1),
        });
    }
    let q0 = survival.survival_probability(conditioning_time)?;
    if q0 <= 0.0 {
        return Ok(0.0);
    }
    let mut pv = 0.0;
    for (window, notional) in schedule.windows(2).zip(notionals) {
        let q_start = survival.survival_probability(window[0])?;
        let q_end = survival.survival_probability(window[1])?;
        pv += notional * discount.discount_factor(window[1])? * (q_start - q_end);
    }
    Ok((1.0 - survival.recovery_rate()) * pv / q0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market_data::curves::FlatCurve;
    use approx::assert_relative_eq;

    #[test]
    fn test_flat_survival() {
        let curve = FlatHazardCurve::new(0.02, 0.4).unwrap();
        assert_eq!(curve.survival_probability(0.0).unwrap(), 1.0);
        assert_relative_eq!(curve.survival_probability(2.0).unwrap(), (-0.04_f64).exp(), epsilon = 1e-15);
        assert_relative_eq!(
            curve.conditional_default_probability(1.0, 2.0).unwrap(),
            1.0 - (-0.02_f64).exp(),
            epsilon = 1e-14
        );
    }

    #[test]
    fn test_piecewise_matches_flat_when_constant() {
        let flat = FlatHazardCurve::new(0.03, 0.4).unwrap();
        let pw = PiecewiseHazardCurve::new(vec![1.0, 3.0], vec![0.03, 0.03], 0.4).unwrap();
        for t in [0.5, 1.0, 2.0, 5.0] {
            assert_relative_eq!(
                pw.survival_probability(t).unwrap(),
                flat.survival_probability(t).unwrap(),
                epsilon = 1e-14
            );
        }
    }

    #[test]
    fn test_piecewise_integration() {
        let pw = PiecewiseHazardCurve::new(vec![1.0, 2.0], vec![0.01, 0.05], 0.0).unwrap();
        assert_relative_eq!(pw.survival_probability(1.5).unwrap(), (-(0.01 + 0.025_f64)).exp(), epsilon = 1e-14);
        assert_relative_eq!(pw.survival_probability(3.0).unwrap(), (-(0.01 + 0.05 + 0.05_f64)).exp(), epsilon = 1e-14);
    }

    #[test]
    fn test_bump_feasibility() {
        let pw = PiecewiseHazardCurve::new(vec![1.0, 2.0], vec![0.01, 0.05], 0.4).unwrap();
        assert_relative_eq!(pw.minimum_shift(), -0.01);
        let bumped = pw.bumped(-0.005).unwrap();
        assert_relative_eq!(bumped.hazards()[0], 0.005, epsilon = 1e-15);
        let err = pw.bumped(-0.02).unwrap_err();
        assert!(matches!(err, MarketDataError::InfeasibleShift { .. }));

        let flat = FlatHazardCurve::new(0.02, 0.4).unwrap();
        assert!(flat.bumped(-0.021).is_err());
        assert!(flat.bumped(0.01).is_ok());
    }

    #[test]
    fn test_invalid_construction() {
        assert!(FlatHazardCurve::new(-0.01, 0.4).is_err());
        assert!(FlatHazardCurve::new(0.01, 1.4).is_err());
        assert!(PiecewiseHazardCurve::new(vec![], vec![], 0.4).is_err());
        assert!(PiecewiseHazardCurve::new(vec![2.0, 1.0], vec![0.01, 0.01], 0.4).is_err());
    }

    #[test]
    fn test_loss_leg_single_period() {
        let survival = FlatHazardCurve::new(0.02, 0.4).unwrap();
        let discount = FlatCurve::new(0.03_f64);
        let pv = loss_leg_pv(&survival, &discount, &[1.0, 2.0], &[100.0], 1.0).unwrap();
        let expected = 0.6 * 100.0 * (-0.06_f64).exp() * (1.0 - (-0.02_f64).exp());
        assert_relative_eq!(pv, expected, epsilon = 1e-12);
    }

    #[test]
    fn test_loss_leg_zero_hazard_is_zero() {
        let survival = FlatHazardCurve::new(0.0, 0.4).unwrap();
        let discount = FlatCurve::new(0.03_f64);
        let pv = loss_leg_pv(&survival, &discount, &[1.0, 2.0, 3.0], &[1.0, 1.0], 1.0).unwrap();
        assert_eq!(pv, 0.0);
        assert!(loss_leg_pv(&survival, &discount, &[1.0, 2.0], &[1.0, 1.0], 1.0).is_err());
    }
}
