//! Model pricers used inside the calibration objectives.
//!
//! A calibrator only states which swaption prices to match; the model price
//! of a quote under a trial volatility matrix comes from a
//! [`SwaptionModelPricer`]. Two implementations ship:
//!
//! - [`LatticeSwaptionPricer`]: builds a rate lattice and takes the
//!   expectation of the exercise value, so a calibrated matrix round-trips
//!   exactly through the lattice
//! - [`RebonatoSwaptionPricer`]: the frozen-weights swap volatility
//!   approximation, which uses the correlation structure

use crate::analytical::Black76;
use crate::lattice::{Distribution, LatticeBuilder, LatticeConfig, LatticeError, RateLattice};
use crate::schedules::TenorSchedule;
use crate::volatility::{CorrelationStructure, ForwardVolatilityMatrix};

use super::{CalibrationError, SwaptionQuote};

/// Prices a market swaption under a trial forward-volatility matrix.
pub trait SwaptionModelPricer {
    /// Dynamics the prices are computed under.
    fn distribution(&self) -> Distribution {
        Distribution::Lognormal
    }

    /// Model present value of `quote`.
    fn price(
        &self,
        schedule: &TenorSchedule,
        volatilities: &ForwardVolatilityMatrix,
        quote: &SwaptionQuote,
    ) -> Result<f64, CalibrationError>;

    /// Model present value under an explicit correlation. Pricers that
    /// assume perfect correlation ignore it.
    fn price_with_correlation(
        &self,
        schedule: &TenorSchedule,
        volatilities: &ForwardVolatilityMatrix,
        _correlation: &CorrelationStructure,
        quote: &SwaptionQuote,
    ) -> Result<f64, CalibrationError> {
        self.price(schedule, volatilities, quote)
    }

    /// Correlation the pricer holds fixed.
    fn correlation(&self, schedule: &TenorSchedule) -> CorrelationStructure {
        CorrelationStructure::perfect(schedule.rate_count())
    }
}

impl<P: SwaptionModelPricer + ?Sized> SwaptionModelPricer for &P {
    fn distribution(&self) -> Distribution {
        (**self).distribution()
    }

    fn price(
        &self,
        schedule: &TenorSchedule,
        volatilities: &ForwardVolatilityMatrix,
        quote: &SwaptionQuote,
    ) -> Result<f64, CalibrationError> {
        (**self).price(schedule, volatilities, quote)
    }

    fn price_with_correlation(
        &self,
        schedule: &TenorSchedule,
        volatilities: &ForwardVolatilityMatrix,
        correlation: &CorrelationStructure,
        quote: &SwaptionQuote,
    ) -> Result<f64, CalibrationError> {
        (**self).price_with_correlation(schedule, volatilities, correlation, quote)
    }

    fn correlation(&self, schedule: &TenorSchedule) -> CorrelationStructure {
        (**self).correlation(schedule)
    }
}

fn check_shape(
    schedule: &TenorSchedule,
    volatilities: &ForwardVolatilityMatrix,
) -> Result<(), CalibrationError> {
    if volatilities.rate_count() != schedule.rate_count() {
        return Err(CalibrationError::DimensionMismatch {
            expected: schedule.rate_count(),
            got: volatilities.rate_count(),
            context: "volatility matrix rows",
        });
    }
    Ok(())
}

/// Prices swaptions on a freshly built [`RateLattice`].
///
/// The lattice is built on the schedule truncated after the quote's last
/// rate, and the swaption is valued as the probability-weighted exercise
/// value at its expiry node, normalised by the retained probability mass.
#[derive(Debug, Clone, Default)]
pub struct LatticeSwaptionPricer {
    builder: LatticeBuilder,
}

impl LatticeSwaptionPricer {
    /// Pricer building lattices with `config`.
    pub fn new(config: LatticeConfig) -> Self {
        Self {
            builder: LatticeBuilder::new(config),
        }
    }

    /// Lattice configuration.
    pub fn config(&self) -> &LatticeConfig {
        self.builder.config()
    }
}

impl SwaptionModelPricer for LatticeSwaptionPricer {
    fn distribution(&self) -> Distribution {
        self.builder.config().distribution
    }

    fn price(
        &self,
        schedule: &TenorSchedule,
        volatilities: &ForwardVolatilityMatrix,
        quote: &SwaptionQuote,
    ) -> Result<f64, CalibrationError> {
        check_shape(schedule, volatilities)?;
        quote.validate(schedule)?;
        let sub = schedule.truncated(quote.end)?;
        let mut curves = volatilities.to_curves()?;
        curves.truncate(quote.end);
        let lattice = self.builder.build(&sub, &curves, &[])?;
        Ok(exercise_value(&lattice, quote)?)
    }
}

fn exercise_value(lattice: &RateLattice, quote: &SwaptionQuote) -> Result<f64, LatticeError> {
    let schedule = lattice.schedule();
    let nodes = lattice.date(lattice.grid().tenor_node(quote.start))?;
    let mass = nodes.probability_mass();
    if mass <= 0.0 {
        return Ok(0.0);
    }
    let sign = quote.option_type.sign();
    let mut value = 0.0;
    for s in 0..nodes.state_count() {
        let mut swap = 0.0;
        for k in quote.start..quote.end {
            swap += schedule.accrual(k) * nodes.annuity(s, k)? * (nodes.rate(s, k)? - quote.strike);
        }
        value += nodes.probability(s)? * (sign * swap).max(0.0);
    }
    Ok(value / mass)
}

/// Rebonato's frozen-weights approximation.
///
/// The swap rate is a weighted sum of forwards with weights
/// `w_k = Δ_k P(0, T_{k+1}) / level`, frozen at time zero, giving the Black
/// variance
///
/// ```text
/// σ_S² T = Σ_{k,l} w_k w_l L_k L_l ρ_kl ∫₀^T σ_k σ_l dt / S²
/// ```
#[derive(Debug, Clone, Default)]
pub struct RebonatoSwaptionPricer {
    correlation: Option<CorrelationStructure>,
}

impl RebonatoSwaptionPricer {
    /// Pricer with a fixed correlation structure.
    pub fn new(correlation: CorrelationStructure) -> Self {
        Self {
            correlation: Some(correlation),
        }
    }

    /// Pricer assuming perfect correlation.
    pub fn perfect() -> Self {
        Self::default()
    }

    /// Black volatility of the swap underlying `quote`.
    pub fn swap_volatility(
        &self,
        schedule: &TenorSchedule,
        volatilities: &ForwardVolatilityMatrix,
        correlation: &CorrelationStructure,
        quote: &SwaptionQuote,
    ) -> Result<f64, CalibrationError> {
        check_shape(schedule, volatilities)?;
        quote.validate(schedule)?;
        if correlation.dimension() < quote.end {
            return Err(CalibrationError::DimensionMismatch {
                expected: quote.end,
                got: correlation.dimension(),
                context: "correlation dimension",
            });
        }
        let (start, end) = (quote.start, quote.end);
        let expiry = schedule.reset_time(start);
        let level = schedule.level(start, end);
        let swap = schedule.swap_rate(start, end);
        if expiry <= 0.0 || !(swap > 0.0) || !(level > 0.0) {
            return Ok(0.0);
        }

        let weighted: Vec<f64> = (start..end)
            .map(|k| schedule.accrual(k) * schedule.zero_bond(k + 1) / level * schedule.forward(k))
            .collect();
        let mut variance = 0.0;
        for (a, k) in (start..end).enumerate() {
            for (b, l) in (start..end).enumerate() {
                let covariance: f64 = (0..=start)
                    .map(|j| {
                        volatilities.get(k, j).unwrap_or(0.0)
                            * volatilities.get(l, j).unwrap_or(0.0)
                            * volatilities.period_length(j)
                    })
                    .sum();
                variance += weighted[a] * weighted[b] * correlation.correlation(k, l) * covariance;
            }
        }
        Ok(variance.max(0.0).sqrt() / swap / expiry.sqrt())
    }
}

impl SwaptionModelPricer for RebonatoSwaptionPricer {
    fn price(
        &self,
        schedule: &TenorSchedule,
        volatilities: &ForwardVolatilityMatrix,
        quote: &SwaptionQuote,
    ) -> Result<f64, CalibrationError> {
        let correlation = self.correlation(schedule);
        self.price_with_correlation(schedule, volatilities, &correlation, quote)
    }

    fn price_with_correlation(
        &self,
        schedule: &TenorSchedule,
        volatilities: &ForwardVolatilityMatrix,
        correlation: &CorrelationStructure,
        quote: &SwaptionQuote,
    ) -> Result<f64, CalibrationError> {
        let sigma = self.swap_volatility(schedule, volatilities, correlation, quote)?;
        let (start, end) = (quote.start, quote.end);
        let swap = schedule.swap_rate(start, end);
        if !(swap > 0.0) {
            return Err(CalibrationError::NotSupported(format!(
                "lognormal swap volatility needs a positive swap rate, got {swap}"
            )));
        }
        let unit = Black76::new(swap, sigma)?.price(quote.option_type, quote.strike, schedule.reset_time(start));
        Ok(schedule.level(start, end) * unit)
    }

    fn correlation(&self, schedule: &TenorSchedule) -> CorrelationStructure {
        self.correlation
            .clone()
            .unwrap_or_else(|| CorrelationStructure::perfect(schedule.rate_count()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use bgm_core::market_data::volatility::VolatilityKind;

    use crate::analytical::OptionType;
    use crate::volatility::ExponentialCorrelation;

    fn schedule() -> TenorSchedule {
        TenorSchedule::new(vec![1.0, 2.0, 3.0, 4.0], vec![0.03, 0.032, 0.034]).unwrap()
    }

    // ========================================
    // Lattice pricer
    // ========================================

    #[test]
    fn test_lattice_caplet_close_to_black() {
        let s = schedule();
        let vols = ForwardVolatilityMatrix::flat(s.times()[..3].to_vec(), 0.2).unwrap();
        let quote = SwaptionQuote::atm(&s, 0, 1, 0.2, VolatilityKind::Lognormal).unwrap();
        let pricer = LatticeSwaptionPricer::new(LatticeConfig::default().with_steps(200));

        let model = pricer.price(&s, &vols, &quote).unwrap();
        let market = quote.market_price(&s).unwrap();
        assert_relative_eq!(model, market, max_relative = 1e-2);
    }

    #[test]
    fn test_lattice_zero_vol_is_intrinsic() {
        let s = schedule();
        let vols = ForwardVolatilityMatrix::flat(s.times()[..3].to_vec(), 0.0).unwrap();
        let strike = 0.025;
        let quote = SwaptionQuote::new(1, 3, strike, 0.2, VolatilityKind::Lognormal);
        let model = LatticeSwaptionPricer::default().price(&s, &vols, &quote).unwrap();
        let intrinsic = s.level(1, 3) * (s.swap_rate(1, 3) - strike);
        assert_relative_eq!(model, intrinsic, max_relative = 1e-10);

        let receiver = quote.with_option_type(OptionType::Put);
        let model = LatticeSwaptionPricer::default().price(&s, &vols, &receiver).unwrap();
        assert!(model.abs() < 1e-14);
    }

    #[test]
    fn test_lattice_price_increases_with_volatility() {
        let s = schedule();
        let quote = SwaptionQuote::atm(&s, 1, 3, 0.2, VolatilityKind::Lognormal).unwrap();
        let pricer = LatticeSwaptionPricer::new(LatticeConfig::fast());
        let low = ForwardVolatilityMatrix::flat(s.times()[..3].to_vec(), 0.1).unwrap();
        let high = ForwardVolatilityMatrix::flat(s.times()[..3].to_vec(), 0.3).unwrap();
        assert!(pricer.price(&s, &high, &quote).unwrap() > pricer.price(&s, &low, &quote).unwrap());
    }

    #[test]
    fn test_shape_mismatch() {
        let s = schedule();
        let vols = ForwardVolatilityMatrix::flat(vec![1.0, 2.0], 0.2).unwrap();
        let quote = SwaptionQuote::atm(&s, 0, 1, 0.2, VolatilityKind::Lognormal).unwrap();
        let err = LatticeSwaptionPricer::default().price(&s, &vols, &quote).unwrap_err();
        assert!(matches!(err, CalibrationError::DimensionMismatch { .. }));
    }

    // ========================================
    // Rebonato pricer
    // ========================================

    #[test]
    fn test_rebonato_single_rate_is_black() {
        let s = schedule();
        let vols = ForwardVolatilityMatrix::flat(s.times()[..3].to_vec(), 0.2).unwrap();
        let quote = SwaptionQuote::atm(&s, 1, 2, 0.2, VolatilityKind::Lognormal).unwrap();
        let pricer = RebonatoSwaptionPricer::perfect();
        let corr = pricer.correlation(&s);
        let sigma = pricer.swap_volatility(&s, &vols, &corr, &quote).unwrap();
        assert_relative_eq!(sigma, 0.2, max_relative = 1e-12);
        assert_relative_eq!(
            pricer.price(&s, &vols, &quote).unwrap(),
            quote.market_price(&s).unwrap(),
            max_relative = 1e-12
        );
    }

    #[test]
    fn test_rebonato_decorrelation_lowers_swap_vol() {
        let s = schedule();
        let vols = ForwardVolatilityMatrix::flat(s.times()[..3].to_vec(), 0.2).unwrap();
        let quote = SwaptionQuote::atm(&s, 1, 3, 0.2, VolatilityKind::Lognormal).unwrap();
        let params = ExponentialCorrelation::new(0.3, 0.5, 0.0).unwrap();
        let corr = CorrelationStructure::exponential(params, &s.times()[..3]).unwrap();
        let pricer = RebonatoSwaptionPricer::new(corr.clone());

        let perfect = RebonatoSwaptionPricer::perfect();
        let sigma_perfect = perfect
            .swap_volatility(&s, &vols, &perfect.correlation(&s), &quote)
            .unwrap();
        let sigma = pricer.swap_volatility(&s, &vols, &corr, &quote).unwrap();
        assert!(sigma < sigma_perfect);
        assert!(sigma_perfect < 0.2 + 1e-12);
    }
}
