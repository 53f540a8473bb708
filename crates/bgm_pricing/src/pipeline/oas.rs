//! Option-adjusted spreads over the discount and survival curves.

use bgm_core::market_data::curves::{ShiftedCurve, SurvivalCurve, YieldCurve};
use bgm_core::market_data::volatility::VolatilitySource;
use bgm_models::lattice::Distribution;

use super::BermudanPricer;
use crate::cashflow::CashflowSchedule;
use crate::spread::{SpreadSolution, SpreadSolver};
use crate::EvaluationError;

/// Margin kept above the shift that would zero the lowest forward.
const FORWARD_MARGIN: f64 = 1e-6;

/// Implied parallel spread of a priced instrument.
///
/// Wraps a [`BermudanPricer`] in a [`SpreadSolver`]: the discount spread is
/// applied as `D(t)·exp(−s·t)`, the survival spread as a parallel hazard
/// shift.
///
/// # Example
///
/// ```
/// use bgm_core::market_data::curves::FlatCurve;
/// use bgm_core::market_data::volatility::FlatVolatility;
/// use bgm_pricing::cashflow::CashflowSchedule;
/// use bgm_pricing::pipeline::{BermudanPricer, CalibrationMethod, OasSolver, PipelineConfig};
/// use bgm_pricing::spread::{SpreadSolver, SpreadSolverConfig};
///
/// let bond = CashflowSchedule::fixed_rate(&[0.0, 1.0, 2.0, 3.0], 100.0, 0.04)
///     .unwrap()
///     .callable_from(1);
/// let curve = FlatCurve::new(0.03);
/// let vols = FlatVolatility::lognormal(0.2);
///
/// let pricer = BermudanPricer::new(PipelineConfig {
///     calibration: CalibrationMethod::Rebonato,
///     ..PipelineConfig::fast()
/// });
/// let search = SpreadSolverConfig {
///     grid_start: 0.02,
///     grid_floor: -0.01,
///     grid_step: 0.005,
///     ..Default::default()
/// };
/// let solver = OasSolver::with_solver(pricer, SpreadSolver::new(search));
/// let price = solver.pricer().price(&bond, &curve, &vols, None).unwrap().total;
/// let oas = solver.solve_discount(&bond, &curve, &vols, None, price).unwrap();
/// assert!(oas.spread.abs() < 1e-6);
/// ```
#[derive(Debug, Clone, Default)]
pub struct OasSolver {
    pricer: BermudanPricer,
    solver: SpreadSolver,
}

impl OasSolver {
    /// Solver with default search controls.
    pub fn new(pricer: BermudanPricer) -> Self {
        Self {
            pricer,
            solver: SpreadSolver::default(),
        }
    }

    /// Solver with explicit search controls.
    pub fn with_solver(pricer: BermudanPricer, solver: SpreadSolver) -> Self {
        Self { pricer, solver }
    }

    /// Underlying pricer.
    pub fn pricer(&self) -> &BermudanPricer {
        &self.pricer
    }

    /// Discount spread reproducing `target`.
    ///
    /// Under lognormal dynamics the search stays above the shift at which
    /// the lowest continuously compounded forward of the cashflow schedule
    /// would reach zero.
    pub fn solve_discount<C, V>(
        &self,
        cashflows: &CashflowSchedule,
        curve: &C,
        vols: &V,
        survival: Option<&dyn SurvivalCurve>,
        target: f64,
    ) -> Result<SpreadSolution, EvaluationError>
    where
        C: YieldCurve<f64>,
        V: VolatilitySource + ?Sized,
    {
        let lower_bound = match self.pricer.config().lattice.distribution {
            Distribution::Lognormal => Some(minimum_discount_shift(cashflows, curve)?),
            Distribution::Normal => None,
        };
        let mut objective = |s: f64| -> Result<f64, EvaluationError> {
            let shifted = ShiftedCurve::new(curve, s);
            Ok(self.pricer.price(cashflows, &shifted, vols, survival)?.total)
        };
        self.solver.solve(&mut objective, target, lower_bound)
    }

    /// Hazard spread over `survival` reproducing `target`.
    pub fn solve_survival<C, V, S>(
        &self,
        cashflows: &CashflowSchedule,
        curve: &C,
        vols: &V,
        survival: &S,
        target: f64,
    ) -> Result<SpreadSolution, EvaluationError>
    where
        C: YieldCurve<f64> + ?Sized,
        V: VolatilitySource + ?Sized,
        S: SurvivalCurve,
    {
        let mut objective = |s: f64| -> Result<f64, EvaluationError> {
            let bumped = survival.bumped(s)?;
            Ok(self.pricer.price(cashflows, curve, vols, Some(&bumped))?.total)
        };
        self.solver
            .solve(&mut objective, target, Some(survival.minimum_shift()))
    }
}

/// Smallest discount shift keeping the forward of every unpaid period positive.
fn minimum_discount_shift<C>(cashflows: &CashflowSchedule, curve: &C) -> Result<f64, EvaluationError>
where
    C: YieldCurve<f64>,
{
    let mut lowest = f64::INFINITY;
    for p in cashflows.periods().iter().filter(|p| p.end > 0.0) {
        let start = p.start.max(0.0);
        let forward = (curve.discount_factor(start)? / curve.discount_factor(p.end)?).ln()
            / (p.end - start);
        lowest = lowest.min(forward);
    }
    if lowest.is_finite() {
        Ok(-lowest + FORWARD_MARGIN)
    } else {
        Ok(f64::NEG_INFINITY)
    }
}
