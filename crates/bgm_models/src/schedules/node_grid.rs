//! Node dates used for lattice stepping.

use super::TenorSchedule;
use crate::lattice::LatticeError;

/// Two node times closer than this are the same date.
const TIME_EPSILON: f64 = 1e-10;

/// Ordered lattice node dates from valuation to the last reset.
///
/// Node 0 is the valuation date (`t = 0`, step 0). Every reset date
/// `T0..T_{n-1}` is a node; extra exercise or observation dates add nodes
/// without retiring a rate. Each node carries the cumulative number of
/// binomial steps taken since valuation and the index of the last rate that
/// reset at or before it.
///
/// # Example
///
/// ```
/// use bgm_models::schedules::{NodeDateGrid, TenorSchedule};
///
/// let schedule = TenorSchedule::new(vec![1.0, 2.0, 3.0], vec![0.03, 0.03]).unwrap();
/// let grid = NodeDateGrid::build(&schedule, &[1.5], 40).unwrap();
///
/// assert_eq!(grid.times(), &[0.0, 1.0, 1.5, 2.0]);
/// assert_eq!(grid.step(3), 40);
/// assert_eq!(grid.active_rate(2), Some(0));
/// assert_eq!(grid.tenor_node(1), 3);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct NodeDateGrid {
    times: Vec<f64>,
    steps: Vec<usize>,
    active: Vec<Option<usize>>,
    tenor_nodes: Vec<usize>,
}

impl NodeDateGrid {
    /// Merges valuation, reset dates and `extra_times`, then spreads
    /// `total_steps` over the grid proportionally to time.
    ///
    /// Every node after valuation advances at least one step, unless
    /// `total_steps` is zero, in which case every node sits at step 0 (the
    /// deterministic lattice).
    ///
    /// # Errors
    ///
    /// Negative or non-finite extra times, or extra times past the last reset.
    pub fn build(
        schedule: &TenorSchedule,
        extra_times: &[f64],
        total_steps: usize,
    ) -> Result<Self, LatticeError> {
        let resets = &schedule.times()[..schedule.rate_count()];
        let last_reset = resets[resets.len() - 1];

        if let Some(&t) = extra_times
            .iter()
            .find(|&&t| !t.is_finite() || t < 0.0 || t > last_reset + TIME_EPSILON)
        {
            return Err(LatticeError::InvalidInput(format!(
                "node time {t} outside [0, {last_reset}]"
            )));
        }

        let mut times: Vec<f64> = std::iter::once(0.0)
            .chain(resets.iter().copied())
            .chain(extra_times.iter().copied())
            .collect();
        times.sort_by(f64::total_cmp);
        times.dedup_by(|a, b| (*a - *b).abs() < TIME_EPSILON);

        let tenor_nodes = resets
            .iter()
            .map(|&t| {
                times
                    .iter()
                    .position(|&x| (x - t).abs() < TIME_EPSILON)
                    .unwrap_or(0)
            })
            .collect();

        let active = times
            .iter()
            .map(|&t| resets.iter().rposition(|&r| r <= t + TIME_EPSILON))
            .collect();

        let steps = assign_steps(&times, total_steps);

        Ok(Self {
            times,
            steps,
            active,
            tenor_nodes,
        })
    }

    /// Number of node dates.
    #[inline]
    pub fn len(&self) -> usize {
        self.times.len()
    }

    /// Always false: the valuation node is always present.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    /// Node times.
    #[inline]
    pub fn times(&self) -> &[f64] {
        &self.times
    }

    /// Time of node `d`.
    #[inline]
    pub fn time(&self, d: usize) -> f64 {
        self.times[d]
    }

    /// Cumulative binomial steps at node `d`.
    #[inline]
    pub fn step(&self, d: usize) -> usize {
        self.steps[d]
    }

    /// Step count of the final node.
    #[inline]
    pub fn total_steps(&self) -> usize {
        self.steps[self.steps.len() - 1]
    }

    /// Last rate reset at or before node `d`; `None` before `T0`.
    #[inline]
    pub fn active_rate(&self, d: usize) -> Option<usize> {
        self.active[d]
    }

    /// Node index of reset date `T_i`.
    #[inline]
    pub fn tenor_node(&self, i: usize) -> usize {
        self.tenor_nodes[i]
    }

    /// Rate resetting exactly at node `d`, if any.
    pub fn resetting_rate(&self, d: usize) -> Option<usize> {
        self.tenor_nodes.iter().rposition(|&n| n == d)
    }

    /// Node at time `t`, if one exists.
    pub fn node_at(&self, t: f64) -> Option<usize> {
        self.times.iter().position(|&x| (x - t).abs() < TIME_EPSILON)
    }
}

fn assign_steps(times: &[f64], total_steps: usize) -> Vec<usize> {
    let last = times[times.len() - 1];
    if total_steps == 0 || last <= 0.0 {
        return vec![0; times.len()];
    }
    let mut steps = Vec::with_capacity(times.len());
    steps.push(0);
    for &t in &times[1..] {
        let target = (t / last * total_steps as f64).round() as usize;
        let prev = steps[steps.len() - 1];
        steps.push(target.max(prev + 1));
    }
    steps
}
