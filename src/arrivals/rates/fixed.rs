//! Deterministic per-period rates.
use crate::{
    arrivals::{
        core::periods::PeriodOracle,
        errors::{ArrivalError, ArrivalResult},
        rates::{RateModel, verify_rate},
    },
    random::RandomStream,
};

/// Fixed base rates over every period, preliminary and wrap-up included.
#[derive(Debug, Clone, PartialEq)]
pub struct FixedRates {
    rates: Vec<f64>,
}

impl FixedRates {
    /// Rates given per unit of time, one per period (`P + 2` values).
    ///
    /// # Errors
    /// - [`ArrivalError::InvalidRate`] for negative or non-finite rates.
    pub fn new(rates: Vec<f64>) -> ArrivalResult<Self> {
        if rates.len() < 3 {
            return Err(ArrivalError::LengthMismatch {
                what: "fixed rates (preliminary, main and wrap-up periods)",
                expected: 3,
                found: rates.len(),
            });
        }
        for (p, &r) in rates.iter().enumerate() {
            verify_rate(p, r)?;
        }
        Ok(Self { rates })
    }

    /// Rates given as expected arrivals per period, divided by each
    /// period's duration.
    ///
    /// # Errors
    /// - [`ArrivalError::LengthMismatch`] if the vector does not cover
    ///   every period of `periods`.
    /// - [`ArrivalError::InvalidRate`] for a non-zero count over an empty
    ///   or unbounded period.
    pub fn normalized(counts: Vec<f64>, periods: &dyn PeriodOracle) -> ArrivalResult<Self> {
        if counts.len() != periods.period_count() {
            return Err(ArrivalError::LengthMismatch {
                what: "fixed rates",
                expected: periods.period_count(),
                found: counts.len(),
            });
        }
        let mut rates = Vec::with_capacity(counts.len());
        for (p, &c) in counts.iter().enumerate() {
            verify_rate(p, c)?;
            if c == 0.0 {
                rates.push(0.0);
                continue;
            }
            let d = periods.period_duration(p);
            if !(d.is_finite() && d > 0.0) {
                return Err(ArrivalError::InvalidRate {
                    period: p,
                    value: c,
                    reason: "Cannot normalize a non-zero count over an empty or unbounded period.",
                });
            }
            rates.push(c / d);
        }
        Self::new(rates)
    }

    pub fn rates(&self) -> &[f64] {
        &self.rates
    }
}

impl RateModel for FixedRates {
    fn name(&self) -> &'static str {
        "fixed rates"
    }

    fn period_count(&self) -> usize {
        self.rates.len()
    }

    fn draw(&mut self, _stream: &mut RandomStream) -> ArrivalResult<Vec<f64>> {
        Ok(self.rates.clone())
    }

    fn expected_rate(&self, p: usize) -> f64 {
        self.rates.get(p).copied().unwrap_or(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arrivals::core::periods::PeriodSchedule;
    use approx::assert_relative_eq;

    #[test]
    // Purpose
    // -------
    // Normalization divides per-period counts by the period duration and
    // refuses a non-zero count in the unbounded wrap-up period.
    fn normalization_divides_by_duration() {
        // Arrange
        let periods = PeriodSchedule::new(vec![0.0, 10.0, 30.0]).unwrap();

        // Act
        let r = FixedRates::normalized(vec![0.0, 50.0, 40.0, 0.0], &periods).unwrap();

        // Assert
        assert_relative_eq!(r.rates()[1], 5.0);
        assert_relative_eq!(r.rates()[2], 2.0);
        assert_eq!(r.rates()[3], 0.0);
        assert!(FixedRates::normalized(vec![0.0, 1.0, 1.0, 1.0], &periods).is_err());
        assert!(FixedRates::normalized(vec![1.0, 1.0, 1.0, 0.0], &periods).is_err());
    }

    #[test]
    // Purpose
    // -------
    // Fixed rates draw themselves and reject invalid entries.
    fn fixed_rates_are_deterministic() {
        let mut r = FixedRates::new(vec![0.0, 2.0, 3.0, 0.0]).unwrap();
        let mut s = RandomStream::new(1);
        assert_eq!(r.draw(&mut s).unwrap(), vec![0.0, 2.0, 3.0, 0.0]);
        assert_eq!(r.expected_rate(2), 3.0);
        assert!(FixedRates::new(vec![0.0, -1.0, 0.0]).is_err());
        assert!(FixedRates::new(vec![1.0]).is_err());
    }
}
