//! Binomial and hypergeometric probabilities on a recombining binary lattice.
//!
//! A lattice node is identified by its step count `n` (binomial steps since
//! valuation) and its level `k` (number of up-moves taken). With a fixed
//! up-probability `p`:
//!
//! ```text
//! P(n, k)                  = C(n, k) p^k (1-p)^(n-k)
//! P(n2, k2 | n1, k1)       = C(n2-n1, k2-k1) p^(k2-k1) (1-p)^(n2-n1-k2+k1)      n2 > n1
//! P(n2, k2 | n1, k1)       = C(n2, k2) C(n1-n2, k1-k2) / C(n1, k1)              n2 < n1
//! ```
//!
//! The look-back form is hypergeometric and does not depend on `p`: given
//! the number of ups after `n1` steps, every ordering of those ups is equally
//! likely. All binomial coefficients go through log-factorials so step counts
//! of several hundred stay finite.

use crate::types::PricingError;

const LANCZOS_R: f64 = 10.900511;

const LANCZOS_DK: [f64; 11] = [
    2.485_740_891_387_535_7e-5,
    1.051_423_785_817_219_7,
    -3.456_870_972_220_162,
    4.512_277_094_668_948,
    -2.982_852_253_235_766_5,
    1.056_397_115_771_267,
    -1.954_287_731_916_458_7e-1,
    1.709_705_434_044_412_2e-2,
    -5.719_261_174_043_057e-4,
    4.633_994_733_599_056e-6,
    -2.719_949_084_886_077e-9,
];

/// ln(2·sqrt(e/π))
const LN_TWO_SQRT_E_OVER_PI: f64 = 0.620_782_237_635_245_2;

/// Natural logarithm of the gamma function for `x > 0` (Lanczos, Pugh coefficients).
///
/// # Examples
///
/// ```
/// use bgm_core::math::combinatorics::ln_gamma;
///
/// assert!((ln_gamma(5.0) - 24.0_f64.ln()).abs() < 1e-13);
/// ```
pub fn ln_gamma(x: f64) -> f64 {
    debug_assert!(x > 0.0, "ln_gamma requires a positive argument");
    let s = LANCZOS_DK
        .iter()
        .enumerate()
        .skip(1)
        .fold(LANCZOS_DK[0], |acc, (i, &dk)| acc + dk / (x + i as f64 - 1.0));
    s.ln() + LN_TWO_SQRT_E_OVER_PI + (x - 0.5) * ((x - 0.5 + LANCZOS_R).ln() - 1.0)
}

/// `ln C(n, k)`; `-inf` when `k > n`.
pub fn ln_binomial(n: usize, k: usize) -> f64 {
    if k > n {
        return f64::NEG_INFINITY;
    }
    if k == 0 || k == n {
        return 0.0;
    }
    ln_gamma(n as f64 + 1.0) - ln_gamma(k as f64 + 1.0) - ln_gamma((n - k) as f64 + 1.0)
}

/// Probability tables for a recombining binary lattice with fixed up-probability.
///
/// Log-factorials are tabulated exactly up to `max_steps` (by accumulation)
/// and fall back to [`ln_gamma`] beyond the table.
///
/// # Examples
///
/// ```
/// use bgm_core::math::combinatorics::BinomialLattice;
///
/// let lattice = BinomialLattice::symmetric(10);
/// assert!((lattice.probability(2, 1) - 0.5).abs() < 1e-15);
///
/// // Transition from level 1 at step 2 to level 3 at step 4: two ups in two steps.
/// assert!((lattice.conditional_probability(4, 3, 2, 1) - 0.25).abs() < 1e-15);
///
/// // Look-back: at step 2 with one up, step 1 was level 0 or 1 with equal odds.
/// assert!((lattice.conditional_probability(1, 0, 2, 1) - 0.5).abs() < 1e-15);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct BinomialLattice {
    up_probability: f64,
    ln_up: f64,
    ln_down: f64,
    ln_factorials: Vec<f64>,
}

impl BinomialLattice {
    /// Creates tables for an asymmetric lattice.
    ///
    /// # Errors
    ///
    /// Returns [`PricingError::InvalidInput`] unless `0 < up_probability < 1`.
    pub fn new(max_steps: usize, up_probability: f64) -> Result<Self, PricingError> {
        if !(up_probability > 0.0 && up_probability < 1.0) {
            return Err(PricingError::InvalidInput(format!(
                "up probability must lie in (0, 1), got {up_probability}"
            )));
        }
        let mut ln_factorials = Vec::with_capacity(max_steps + 1);
        let mut acc = 0.0;
        ln_factorials.push(acc);
        for i in 1..=max_steps {
            acc += (i as f64).ln();
            ln_factorials.push(acc);
        }
        Ok(Self {
            up_probability,
            ln_up: up_probability.ln(),
            ln_down: (1.0 - up_probability).ln(),
            ln_factorials,
        })
    }

    /// Creates tables for the symmetric `p = 0.5` lattice.
    pub fn symmetric(max_steps: usize) -> Self {
        let ln_half = 0.5_f64.ln();
        let mut ln_factorials = Vec::with_capacity(max_steps + 1);
        let mut acc = 0.0;
        ln_factorials.push(acc);
        for i in 1..=max_steps {
            acc += (i as f64).ln();
            ln_factorials.push(acc);
        }
        Self {
            up_probability: 0.5,
            ln_up: ln_half,
            ln_down: ln_half,
            ln_factorials,
        }
    }

    /// Up-move probability.
    #[inline]
    pub fn up_probability(&self) -> f64 {
        self.up_probability
    }

    #[inline]
    fn ln_factorial(&self, n: usize) -> f64 {
        match self.ln_factorials.get(n) {
            Some(&v) => v,
            None => ln_gamma(n as f64 + 1.0),
        }
    }

    #[inline]
    fn ln_choose(&self, n: usize, k: usize) -> f64 {
        self.ln_factorial(n) - self.ln_factorial(k) - self.ln_factorial(n - k)
    }

    /// Probability of being at `level` after `step` steps; 0 for `level > step`.
    pub fn probability(&self, step: usize, level: usize) -> f64 {
        if level > step {
            return 0.0;
        }
        let ups = level as f64;
        let downs = (step - level) as f64;
        (self.ln_choose(step, level) + ups * self.ln_up + downs * self.ln_down).exp()
    }

    /// Forward transition probability from `(step1, level1)` to `(step2, level2)`, `step2 >= step1`.
    pub fn transition_probability(
        &self,
        step2: usize,
        level2: usize,
        step1: usize,
        level1: usize,
    ) -> f64 {
        if step2 < step1 || level1 > step1 || level2 > step2 || level2 < level1 {
            return 0.0;
        }
        self.probability(step2 - step1, level2 - level1)
    }

    /// Probability that the walk sat at `level2` after `step2` steps, given it is at
    /// `level1` after `step1 > step2` steps.
    pub fn look_back_probability(
        &self,
        step2: usize,
        level2: usize,
        step1: usize,
        level1: usize,
    ) -> f64 {
        if step2 > step1 || level1 > step1 || level2 > step2 || level2 > level1 {
            return 0.0;
        }
        let later_ups = level1 - level2;
        let later_steps = step1 - step2;
        if later_ups > later_steps {
            return 0.0;
        }
        (self.ln_choose(step2, level2) + self.ln_choose(later_steps, later_ups)
            - self.ln_choose(step1, level1))
        .exp()
    }

    /// Conditional probability of `(step2, level2)` given `(step1, level1)`.
    ///
    /// Dispatches to the forward transition when `step2 > step1`, to the
    /// hypergeometric look-back when `step2 < step1`, and to the indicator
    /// `level1 == level2` when the steps coincide. Out-of-range levels give 0.
    pub fn conditional_probability(
        &self,
        step2: usize,
        level2: usize,
        step1: usize,
        level1: usize,
    ) -> f64 {
        use std::cmp::Ordering;
        match step2.cmp(&step1) {
            Ordering::Greater => self.transition_probability(step2, level2, step1, level1),
            Ordering::Less => self.look_back_probability(step2, level2, step1, level1),
            Ordering::Equal => {
                if level1 == level2 && level1 <= step1 {
                    1.0
                } else {
                    0.0
                }
            }
        }
    }
}
