//! Busyness: multiplicative day and period randomization of arrival rates.
//!
//! A [`BusynessState`] is the realized value for one replication: a day
//! factor `B` and optional per-period factors `B_p`. It is produced by a
//! [`BusynessModel`] at `init()` and handed explicitly to the arrival
//! model, which never stores busyness of its own.
//!
//! Invariant: `effective(p) = B · B_p`, with `B_p = 1` when no period
//! factors are present.
use crate::{
    arrivals::errors::{ArrivalError, ArrivalResult},
    random::{RandomStream, variates::gamma_unit_mean},
};

/// Realized busyness for one replication.
#[derive(Debug, Clone, PartialEq)]
pub struct BusynessState {
    day: f64,
    period: Option<Vec<f64>>,
}

impl Default for BusynessState {
    fn default() -> Self {
        Self::unit()
    }
}

impl BusynessState {
    /// `B = 1`, no period factors.
    pub fn unit() -> Self {
        Self { day: 1.0, period: None }
    }

    /// Day factor only.
    ///
    /// # Errors
    /// - [`ArrivalError::InvalidParameter`] for a negative or non-finite factor.
    pub fn day(day: f64) -> ArrivalResult<Self> {
        verify_factor("day busyness", day)?;
        Ok(Self { day, period: None })
    }

    /// Day factor plus one factor per period (indexed like the periods).
    pub fn with_periods(day: f64, period: Vec<f64>) -> ArrivalResult<Self> {
        verify_factor("day busyness", day)?;
        for &b in &period {
            verify_factor("period busyness", b)?;
        }
        Ok(Self { day, period: Some(period) })
    }

    pub fn day_factor(&self) -> f64 {
        self.day
    }

    /// `B_p`, or 1 when absent.
    pub fn period_factor(&self, p: usize) -> f64 {
        self.period.as_ref().and_then(|v| v.get(p).copied()).unwrap_or(1.0)
    }

    /// `B · B_p`.
    pub fn effective(&self, p: usize) -> f64 {
        self.day * self.period_factor(p)
    }
}

/// Distribution of the day factor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DayBusyness {
    /// Deterministic factor.
    Fixed(f64),
    /// `mean · Gamma(shape, 1/shape)`.
    Gamma { shape: f64, mean: f64 },
}

/// Generator of [`BusynessState`] values.
///
/// Period factors, when configured, are independent unit-mean gammas with
/// one shape per period; a shape of `+∞` fixes that period's factor at 1.
#[derive(Debug, Clone, PartialEq)]
pub struct BusynessModel {
    day: DayBusyness,
    period_shapes: Option<Vec<f64>>,
}

impl Default for BusynessModel {
    fn default() -> Self {
        Self { day: DayBusyness::Fixed(1.0), period_shapes: None }
    }
}

impl BusynessModel {
    /// Deterministic day factor, no period factors.
    pub fn fixed(day: f64) -> ArrivalResult<Self> {
        verify_factor("day busyness", day)?;
        Ok(Self { day: DayBusyness::Fixed(day), period_shapes: None })
    }

    /// Unit-mean `Gamma(Q, 1/Q)` day factor.
    pub fn gamma(shape: f64) -> ArrivalResult<Self> {
        Self::gamma_with_mean(shape, 1.0)
    }

    /// `mean · Gamma(Q, 1/Q)` day factor.
    ///
    /// # Errors
    /// - [`ArrivalError::InvalidShape`] for a non-positive or NaN shape.
    /// - [`ArrivalError::InvalidParameter`] for an invalid mean.
    pub fn gamma_with_mean(shape: f64, mean: f64) -> ArrivalResult<Self> {
        verify_shape(0, shape)?;
        verify_factor("busyness mean", mean)?;
        Ok(Self { day: DayBusyness::Gamma { shape, mean }, period_shapes: None })
    }

    /// Add independent unit-mean gamma period factors.
    pub fn with_period_shapes(mut self, shapes: Vec<f64>) -> ArrivalResult<Self> {
        for (index, &s) in shapes.iter().enumerate() {
            verify_shape(index, s)?;
        }
        self.period_shapes = Some(shapes);
        Ok(self)
    }

    pub fn day_distribution(&self) -> DayBusyness {
        self.day
    }

    /// `E[B]`.
    pub fn expected_day(&self) -> f64 {
        match self.day {
            DayBusyness::Fixed(b) => b,
            DayBusyness::Gamma { mean, .. } => mean,
        }
    }

    /// `E[B_p]`; period factors are unit-mean.
    pub fn expected_period(&self, _p: usize) -> f64 {
        1.0
    }

    /// `E[B · B_p] = E[B] · E[B_p]` by independence.
    pub fn expected_effective(&self, p: usize) -> f64 {
        self.expected_day() * self.expected_period(p)
    }

    /// Draw a new state.
    pub fn draw(&self, stream: &mut RandomStream) -> ArrivalResult<BusynessState> {
        let day = match self.day {
            DayBusyness::Fixed(b) => b,
            DayBusyness::Gamma { shape, mean } => mean * gamma_unit_mean(stream, shape)?,
        };
        let period = match &self.period_shapes {
            Some(shapes) => Some(
                shapes
                    .iter()
                    .map(|&s| gamma_unit_mean(stream, s))
                    .collect::<Result<Vec<_>, _>>()?,
            ),
            None => None,
        };
        Ok(BusynessState { day, period })
    }
}

fn verify_factor(name: &'static str, value: f64) -> ArrivalResult<()> {
    if !value.is_finite() || value < 0.0 {
        return Err(ArrivalError::InvalidParameter {
            name,
            value,
            reason: "Busyness factors must be finite and non-negative.",
        });
    }
    Ok(())
}

fn verify_shape(index: usize, shape: f64) -> ArrivalResult<()> {
    if shape.is_nan() || shape <= 0.0 {
        return Err(ArrivalError::InvalidShape {
            index,
            value: shape,
            reason: "Gamma shapes must be strictly positive (+inf allowed).",
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // The effective-factor invariant, expectation bookkeeping and the
    // sample mean of gamma-distributed busyness.
    // -------------------------------------------------------------------------

    #[test]
    // Purpose
    // -------
    // effective(p) = B · B_p, with B_p = 1 for missing entries.
    fn effective_factor_is_product() {
        let s = BusynessState::with_periods(1.5, vec![1.0, 0.5, 2.0]).unwrap();
        assert_relative_eq!(s.effective(1), 0.75);
        assert_relative_eq!(s.effective(2), 3.0);
        assert_relative_eq!(s.effective(10), 1.5);
        assert!(BusynessState::day(-1.0).is_err());
        assert!(BusynessState::with_periods(1.0, vec![f64::NAN]).is_err());
    }

    #[test]
    // Purpose
    // -------
    // Gamma day busyness has the configured mean, and period factors
    // with infinite shape stay at exactly 1.
    //
    // Given
    // -----
    // - Q = 4, mean 2, period shapes [inf, 3].
    fn gamma_busyness_has_configured_mean() {
        // Arrange
        let model = BusynessModel::gamma_with_mean(4.0, 2.0)
            .unwrap()
            .with_period_shapes(vec![f64::INFINITY, 3.0])
            .unwrap();
        let mut s = RandomStream::new(17);

        // Act
        let draws: Vec<BusynessState> = (0..20_000).map(|_| model.draw(&mut s).unwrap()).collect();
        let mean_day = draws.iter().map(|d| d.day_factor()).sum::<f64>() / draws.len() as f64;
        let mean_p1 = draws.iter().map(|d| d.period_factor(1)).sum::<f64>() / draws.len() as f64;

        // Assert
        assert_relative_eq!(mean_day, 2.0, max_relative = 0.03);
        assert_relative_eq!(mean_p1, 1.0, max_relative = 0.03);
        assert!(draws.iter().all(|d| d.period_factor(0) == 1.0));
        assert_eq!(model.expected_effective(1), 2.0);
    }

    #[test]
    // Purpose
    // -------
    // Invalid shapes are rejected at construction.
    fn invalid_shapes_are_rejected() {
        assert!(BusynessModel::gamma(0.0).is_err());
        assert!(BusynessModel::gamma(f64::NAN).is_err());
        assert!(BusynessModel::default().with_period_shapes(vec![1.0, -2.0]).is_err());
    }
}
