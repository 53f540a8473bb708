//! Caplet and floorlet values read straight off the lattice.

use bgm_models::analytical::OptionType;
use bgm_models::lattice::RateLattice;

use crate::EvaluationError;

/// Value of the option on each lattice rate, struck at `strike`.
///
/// Entry `k` pays `δ_k·max(±(L_k − K), 0)` at `T_{k+1}`, observed at the
/// reset node of rate `k`. Useful as a check of the lattice against Black
/// caplet prices.
pub fn caplet_values(
    lattice: &RateLattice,
    strike: f64,
    option_type: OptionType,
) -> Result<Vec<f64>, EvaluationError> {
    let schedule = lattice.schedule();
    let sign = option_type.sign();
    (0..schedule.rate_count())
        .map(|k| {
            let nodes = lattice.date(lattice.grid().tenor_node(k))?;
            let mass = nodes.probability_mass();
            if mass <= 0.0 {
                return Ok(0.0);
            }
            let mut value = 0.0;
            for (s, p) in nodes.probabilities().iter().enumerate() {
                let payoff = (sign * (nodes.rate(s, k)? - strike)).max(0.0);
                value += p * schedule.accrual(k) * nodes.annuity(s, k)? * payoff;
            }
            Ok(value / mass)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use bgm_models::lattice::{LatticeBuilder, LatticeConfig};
    use bgm_models::schedules::TenorSchedule;
    use bgm_models::volatility::VolatilityCurve;

    #[test]
    fn test_cap_minus_floor_is_forward_value() {
        let schedule = TenorSchedule::new(vec![0.5, 1.0, 1.5, 2.0], vec![0.04, 0.045, 0.05])
            .unwrap();
        let vols: Vec<_> = (0..3)
            .map(|k| VolatilityCurve::flat(0.3, schedule.reset_time(k)).unwrap())
            .collect();
        let lattice = LatticeBuilder::new(LatticeConfig::default())
            .build(&schedule, &vols, &[])
            .unwrap();

        let strike = 0.045;
        let caps = caplet_values(&lattice, strike, OptionType::Call).unwrap();
        let floors = caplet_values(&lattice, strike, OptionType::Put).unwrap();
        for k in 0..3 {
            let forward = schedule.accrual(k)
                * schedule.zero_bond(k + 1)
                * (schedule.forward(k) - strike);
            assert_relative_eq!(caps[k] - floors[k], forward, epsilon = 1e-8);
        }
    }
}
