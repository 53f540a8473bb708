//! Lattice construction controls.

use super::LatticeError;

/// Rate dynamics on the lattice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Distribution {
    /// `L = L0 · exp(c + x)`; forwards must be positive.
    #[default]
    Lognormal,
    /// `L = L0 + c + x`.
    Normal,
}

/// Controls for [`LatticeBuilder`](super::LatticeBuilder).
///
/// # Example
///
/// ```
/// use bgm_models::lattice::{Distribution, LatticeConfig};
///
/// let config = LatticeConfig::default();
/// assert_eq!(config.steps, 100);
/// assert_eq!(config.distribution, Distribution::Lognormal);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct LatticeConfig {
    /// Binomial steps between valuation and the last reset.
    pub steps: usize,
    /// States whose marginal probability falls below this are pruned.
    pub tail_cutoff: f64,
    /// Up-move probability of each step.
    pub up_probability: f64,
    /// Rate dynamics.
    pub distribution: Distribution,
}

impl Default for LatticeConfig {
    fn default() -> Self {
        Self {
            steps: 100,
            tail_cutoff: 1e-12,
            up_probability: 0.5,
            distribution: Distribution::Lognormal,
        }
    }
}

impl LatticeConfig {
    /// Coarse lattice for calibration inner loops.
    pub fn fast() -> Self {
        Self {
            steps: 40,
            tail_cutoff: 1e-9,
            ..Self::default()
        }
    }

    /// Fine lattice for reporting prices.
    pub fn high_precision() -> Self {
        Self {
            steps: 400,
            tail_cutoff: 1e-14,
            ..Self::default()
        }
    }

    /// Same configuration with another step count.
    pub fn with_steps(self, steps: usize) -> Self {
        Self { steps, ..self }
    }

    /// Same configuration with other dynamics.
    pub fn with_distribution(self, distribution: Distribution) -> Self {
        Self {
            distribution,
            ..self
        }
    }

    /// Checks ranges.
    pub fn validate(&self) -> Result<(), LatticeError> {
        if !(0.0..0.5).contains(&self.tail_cutoff) {
            return Err(LatticeError::InvalidInput(format!(
                "tail cutoff must lie in [0, 0.5), got {}",
                self.tail_cutoff
            )));
        }
        if !(self.up_probability > 0.0 && self.up_probability < 1.0) {
            return Err(LatticeError::InvalidInput(format!(
                "up probability must lie in (0, 1), got {}",
                self.up_probability
            )));
        }
        Ok(())
    }
}
