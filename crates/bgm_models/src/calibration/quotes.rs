//! Swaption quotes and the market volatility matrix.

use bgm_core::market_data::volatility::{VolatilityKind, VolatilityQuery, VolatilitySource};
use bgm_core::market_data::MarketDataError;
use bgm_core::math::interpolators::BilinearInterpolator;

use super::CalibrationError;
use crate::analytical::{Bachelier, Black76, OptionType};
use crate::schedules::TenorSchedule;

/// Relative distance under which a query lands on a grid node.
const NODE_TOLERANCE: f64 = 1e-8;

/// A market swaption on the tenor schedule.
///
/// The option expires at `T_start` on a swap made of rates `start..end`,
/// i.e. paying at `T_{start+1}..T_end`. A non-positive volatility marks the
/// quote as missing.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SwaptionQuote {
    /// First rate of the underlying; the option expires at its reset
    pub start: usize,
    /// One past the last rate of the underlying
    pub end: usize,
    /// Fixed rate of the underlying swap
    pub strike: f64,
    /// Quoted volatility
    pub volatility: f64,
    /// Quoting convention of `volatility`
    pub kind: VolatilityKind,
    /// Payer (call) or receiver (put)
    pub option_type: OptionType,
}

impl SwaptionQuote {
    /// Payer swaption quote.
    pub fn new(start: usize, end: usize, strike: f64, volatility: f64, kind: VolatilityKind) -> Self {
        Self {
            start,
            end,
            strike,
            volatility,
            kind,
            option_type: OptionType::Call,
        }
    }

    /// At-the-money payer quote struck at the schedule's forward swap rate.
    pub fn atm(
        schedule: &TenorSchedule,
        start: usize,
        end: usize,
        volatility: f64,
        kind: VolatilityKind,
    ) -> Result<Self, CalibrationError> {
        check_indices(schedule, start, end)?;
        Ok(Self::new(start, end, schedule.swap_rate(start, end), volatility, kind))
    }

    /// Same quote with a different option type.
    pub fn with_option_type(mut self, option_type: OptionType) -> Self {
        self.option_type = option_type;
        self
    }

    /// True when the quote carries a usable (positive) volatility.
    #[inline]
    pub fn is_quoted(&self) -> bool {
        self.volatility > 0.0
    }

    /// Option expiry `T_start`.
    pub fn expiry(&self, schedule: &TenorSchedule) -> f64 {
        schedule.reset_time(self.start)
    }

    /// Underlying swap length `T_end - T_start`.
    pub fn tenor(&self, schedule: &TenorSchedule) -> f64 {
        schedule.times()[self.end] - schedule.reset_time(self.start)
    }

    /// Checks the indices against `schedule`.
    pub fn validate(&self, schedule: &TenorSchedule) -> Result<(), CalibrationError> {
        check_indices(schedule, self.start, self.end)?;
        if !self.strike.is_finite() || !self.volatility.is_finite() {
            return Err(CalibrationError::InvalidInput(format!(
                "swaption {}x{} has non-finite strike or volatility",
                self.start, self.end
            )));
        }
        Ok(())
    }

    /// Market present value: level times the Black or Bachelier price on the
    /// forward swap rate.
    pub fn market_price(&self, schedule: &TenorSchedule) -> Result<f64, CalibrationError> {
        self.validate(schedule)?;
        let expiry = self.expiry(schedule);
        let level = schedule.level(self.start, self.end);
        let forward = schedule.swap_rate(self.start, self.end);
        let sigma = self.volatility.max(0.0);
        let unit = match self.kind {
            VolatilityKind::Lognormal => {
                Black76::new(forward, sigma)?.price(self.option_type, self.strike, expiry)
            }
            VolatilityKind::Normal => {
                Bachelier::new(forward, sigma)?.price(self.option_type, self.strike, expiry)
            }
        };
        Ok(level * unit)
    }
}

fn check_indices(schedule: &TenorSchedule, start: usize, end: usize) -> Result<(), CalibrationError> {
    let n = schedule.rate_count();
    if start >= end {
        return Err(CalibrationError::InvalidInput(format!(
            "swaption start {start} must precede end {end}"
        )));
    }
    if end > n {
        return Err(CalibrationError::InvalidInput(format!(
            "swaption ends at rate {end} but the schedule has {n} rates"
        )));
    }
    Ok(())
}

/// Market swaption volatility matrix: rows are expiries, columns swap tenors.
///
/// Lookups hit a node exactly when both coordinates match to within a small
/// relative tolerance, interpolate bilinearly inside the grid, and report the
/// point as missing outside it. Non-positive entries are missing quotes.
///
/// # Example
///
/// ```
/// use bgm_core::market_data::volatility::VolatilityKind;
/// use bgm_models::calibration::SwaptionVolatilityMatrix;
///
/// let matrix = SwaptionVolatilityMatrix::new(
///     vec![1.0, 2.0],
///     vec![1.0, 2.0],
///     vec![vec![0.20, 0.18], vec![0.19, 0.17]],
///     VolatilityKind::Lognormal,
/// )
/// .unwrap();
///
/// assert_eq!(matrix.volatility_at(1.0, 2.0), Some(0.18));
/// assert!((matrix.volatility_at(1.5, 1.0).unwrap() - 0.195).abs() < 1e-12);
/// assert_eq!(matrix.volatility_at(3.0, 1.0), None);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct SwaptionVolatilityMatrix {
    surface: BilinearInterpolator<f64>,
    kind: VolatilityKind,
}

impl SwaptionVolatilityMatrix {
    /// Builds the matrix; `vols[i][j]` is the quote for `expiries[i]`, `tenors[j]`.
    ///
    /// # Errors
    ///
    /// [`CalibrationError::DimensionMismatch`] when the grid shape disagrees
    /// with the axes, [`CalibrationError::InvalidInput`] for unordered axes.
    pub fn new(
        expiries: Vec<f64>,
        tenors: Vec<f64>,
        vols: Vec<Vec<f64>>,
        kind: VolatilityKind,
    ) -> Result<Self, CalibrationError> {
        if vols.len() != expiries.len() {
            return Err(CalibrationError::DimensionMismatch {
                expected: expiries.len(),
                got: vols.len(),
                context: "expiry rows",
            });
        }
        if let Some(row) = vols.iter().find(|row| row.len() != tenors.len()) {
            return Err(CalibrationError::DimensionMismatch {
                expected: tenors.len(),
                got: row.len(),
                context: "tenor columns",
            });
        }
        let surface = BilinearInterpolator::new(&expiries, &tenors, &vols)
            .map_err(|e| CalibrationError::InvalidInput(e.to_string()))?;
        Ok(Self { surface, kind })
    }

    /// Expiry axis.
    pub fn expiries(&self) -> &[f64] {
        self.surface.xs()
    }

    /// Tenor axis.
    pub fn tenors(&self) -> &[f64] {
        self.surface.ys()
    }

    /// Quoting convention.
    pub fn volatility_kind(&self) -> VolatilityKind {
        self.kind
    }

    /// Volatility at `(expiry, tenor)`, or `None` outside the grid.
    pub fn volatility_at(&self, expiry: f64, tenor: f64) -> Option<f64> {
        let i = nearest_node(self.expiries(), expiry);
        let j = nearest_node(self.tenors(), tenor);
        if let (Some(i), Some(j)) = (i, j) {
            return self.surface.node(i, j);
        }
        self.surface.interpolate(expiry, tenor).ok()
    }

    /// Swaption quotes on `schedule`, one per `(start, end)` pair whose
    /// expiry and tenor fall inside the grid. Pairs expiring at valuation
    /// carry no optionality and are left out.
    ///
    /// # Errors
    ///
    /// [`CalibrationError::InsufficientTenors`] when a positive quote
    /// reaches past the schedule's last tenor date.
    pub fn quotes_for(&self, schedule: &TenorSchedule) -> Result<Vec<SwaptionQuote>, CalibrationError> {
        let times = schedule.times();
        let last = times[times.len() - 1];
        for (i, &expiry) in self.expiries().iter().enumerate() {
            for (j, &tenor) in self.tenors().iter().enumerate() {
                let quoted = self.surface.node(i, j).is_some_and(|v| v > 0.0);
                let end = expiry + tenor;
                if quoted && end > last * (1.0 + NODE_TOLERANCE) + NODE_TOLERANCE {
                    return Err(CalibrationError::InsufficientTenors { end, last });
                }
            }
        }

        let n = schedule.rate_count();
        let mut quotes = Vec::new();
        for start in 0..n {
            let expiry = schedule.reset_time(start);
            if expiry <= 0.0 {
                continue;
            }
            for end in start + 1..=n {
                let tenor = times[end] - expiry;
                if let Some(volatility) = self.volatility_at(expiry, tenor) {
                    quotes.push(SwaptionQuote::atm(schedule, start, end, volatility, self.kind)?);
                }
            }
        }
        Ok(quotes)
    }
}

fn nearest_node(knots: &[f64], x: f64) -> Option<usize> {
    knots
        .iter()
        .position(|&k| (k - x).abs() <= NODE_TOLERANCE * k.abs().max(1.0))
}

impl VolatilitySource for SwaptionVolatilityMatrix {
    fn volatility(&self, query: &VolatilityQuery) -> Result<f64, MarketDataError> {
        if query.expiry < 0.0 {
            return Err(MarketDataError::InvalidExpiry { expiry: query.expiry });
        }
        self.volatility_at(query.expiry, query.tenor).ok_or_else(|| {
            let (lo, hi) = self.surface.domain_x();
            if query.expiry < lo || query.expiry > hi {
                MarketDataError::OutOfBounds {
                    x: query.expiry,
                    min: lo,
                    max: hi,
                }
            } else {
                let (lo, hi) = self.surface.domain_y();
                MarketDataError::OutOfBounds {
                    x: query.tenor,
                    min: lo,
                    max: hi,
                }
            }
        })
    }

    fn kind(&self) -> VolatilityKind {
        self.kind
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn schedule() -> TenorSchedule {
        TenorSchedule::new(vec![1.0, 2.0, 3.0], vec![0.03, 0.03]).unwrap()
    }

    fn matrix() -> SwaptionVolatilityMatrix {
        SwaptionVolatilityMatrix::new(
            vec![1.0, 2.0],
            vec![1.0, 2.0],
            vec![vec![0.20, 0.18], vec![-1.0, -1.0]],
            VolatilityKind::Lognormal,
        )
        .unwrap()
    }

    // ========================================
    // Quotes
    // ========================================

    #[test]
    fn test_market_price_black() {
        let s = schedule();
        let quote = SwaptionQuote::atm(&s, 0, 1, 0.2, VolatilityKind::Lognormal).unwrap();
        let forward = s.forward(0);
        let black = Black76::new(forward, 0.2).unwrap().price_call(forward, 1.0);
        assert_relative_eq!(
            quote.market_price(&s).unwrap(),
            s.zero_bond(1) * black,
            max_relative = 1e-14
        );
    }

    #[test]
    fn test_market_price_normal_put() {
        let s = schedule();
        let quote = SwaptionQuote::new(1, 2, 0.035, 0.008, VolatilityKind::Normal)
            .with_option_type(OptionType::Put);
        let price = quote.market_price(&s).unwrap();
        let unit = Bachelier::new(s.swap_rate(1, 2), 0.008)
            .unwrap()
            .price_put(0.035, 2.0);
        assert_relative_eq!(price, s.level(1, 2) * unit, max_relative = 1e-14);
        assert_eq!(quote.expiry(&s), 2.0);
        assert_eq!(quote.tenor(&s), 1.0);
    }

    #[test]
    fn test_quote_index_validation() {
        let s = schedule();
        assert!(SwaptionQuote::atm(&s, 1, 1, 0.2, VolatilityKind::Lognormal).is_err());
        assert!(SwaptionQuote::atm(&s, 0, 3, 0.2, VolatilityKind::Lognormal).is_err());
        let bad = SwaptionQuote::new(0, 1, f64::NAN, 0.2, VolatilityKind::Lognormal);
        assert!(bad.validate(&s).is_err());
    }

    // ========================================
    // Matrix
    // ========================================

    #[test]
    fn test_matrix_dimension_mismatch() {
        let err = SwaptionVolatilityMatrix::new(
            vec![1.0, 2.0],
            vec![1.0, 2.0],
            vec![vec![0.2, 0.2]],
            VolatilityKind::Lognormal,
        )
        .unwrap_err();
        assert!(matches!(err, CalibrationError::DimensionMismatch { expected: 2, got: 1, .. }));

        let err = SwaptionVolatilityMatrix::new(
            vec![1.0],
            vec![1.0, 2.0],
            vec![vec![0.2]],
            VolatilityKind::Lognormal,
        )
        .unwrap_err();
        assert!(matches!(err, CalibrationError::DimensionMismatch { context: "tenor columns", .. }));
    }

    #[test]
    fn test_matrix_lookup() {
        let m = matrix();
        assert_eq!(m.volatility_at(2.0, 2.0), Some(-1.0));
        assert_eq!(m.volatility_at(1.0 + 1e-12, 1.0), Some(0.20));
        assert_eq!(m.volatility_at(0.5, 1.0), None);
    }

    #[test]
    fn test_quotes_for_schedule() {
        let quotes = matrix().quotes_for(&schedule()).unwrap();
        // (0,1), (0,2), (1,2); the last maps onto the missing node.
        assert_eq!(quotes.len(), 3);
        assert_eq!((quotes[1].start, quotes[1].end), (0, 2));
        assert_eq!(quotes[1].volatility, 0.18);
        assert!(!quotes[2].is_quoted());
        assert_relative_eq!(quotes[0].strike, schedule().forward(0), epsilon = 1e-15);
    }

    #[test]
    fn test_quotes_for_short_schedule() {
        let short = TenorSchedule::new(vec![1.0, 2.0], vec![0.03]).unwrap();
        let err = matrix().quotes_for(&short).unwrap_err();
        assert!(matches!(err, CalibrationError::InsufficientTenors { .. }));
    }

    #[test]
    fn test_matrix_as_volatility_source() {
        let m = matrix();
        let vol = m.volatility(&VolatilityQuery::atm(1.0, 1.0, 0.03)).unwrap();
        assert_eq!(vol, 0.20);
        assert!(matches!(
            m.volatility(&VolatilityQuery::atm(5.0, 1.0, 0.03)),
            Err(MarketDataError::OutOfBounds { .. })
        ));
        assert!(matches!(
            m.volatility(&VolatilityQuery::atm(-1.0, 1.0, 0.03)),
            Err(MarketDataError::InvalidExpiry { .. })
        ));
    }
}
