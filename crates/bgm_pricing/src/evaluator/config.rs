//! Evaluator controls.

/// Controls for [`BermudanEvaluator`](super::BermudanEvaluator).
///
/// # Example
///
/// ```
/// use bgm_pricing::evaluator::EvaluatorConfig;
///
/// let config = EvaluatorConfig::default().with_call_probabilities(true);
/// assert!(config.track_call_probabilities);
/// assert!(config.guard_unconditional_call);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct EvaluatorConfig {
    /// Run the forward pass that reports per-date call probabilities.
    pub track_call_probabilities: bool,
    /// Collapse to a single date when its `rate · level` exceeds one.
    pub guard_unconditional_call: bool,
    /// Tolerance of the debug-build intrinsic consistency diagnostic.
    pub consistency_tolerance: f64,
}

impl Default for EvaluatorConfig {
    fn default() -> Self {
        Self {
            track_call_probabilities: false,
            guard_unconditional_call: true,
            consistency_tolerance: 1e-12,
        }
    }
}

impl EvaluatorConfig {
    /// Same configuration with call-probability tracking switched.
    pub fn with_call_probabilities(mut self, track: bool) -> Self {
        self.track_call_probabilities = track;
        self
    }
}
