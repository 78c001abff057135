//! Non-homogeneous Poisson arrivals by thinning.
use tracing::warn;

use crate::{
    arrivals::{
        core::{
            busyness::{BusynessModel, BusynessState},
            periods::PeriodOracle,
        },
        errors::{ArrivalError, ArrivalResult},
        models::{ArrivalModel, ModelContext, verify_period},
    },
    random::variates::exponential,
};

/// Default cap on consecutive rejected candidates per `next_time` call.
pub const DEFAULT_MAX_REJECTIONS: usize = 1_000_000;

/// Instantaneous arrival rate `λ(t)`.
pub trait RateFunction {
    fn rate(&self, t: f64) -> f64;

    /// Mean of `λ` over `[start, end)`, when it is known in closed form.
    /// `end` may be `+∞` (the wrap-up period); the mean is then the limit
    /// as the interval grows.
    fn average_rate(&self, _start: f64, _end: f64) -> Option<f64> {
        None
    }
}

/// Thinning of a homogeneous candidate stream at rate `λ̄ · B`.
///
/// A candidate at `t` is accepted with probability `λ(t)/λ̄`, so accepted
/// arrivals have intensity `λ(t) · B`. Candidates beyond the ceiling `T`
/// end generation for the replication.
#[derive(Debug, Clone, PartialEq)]
pub struct ThinningArrivals<F: RateFunction> {
    rate_fn: F,
    bound: f64,
    horizon: f64,
    max_rejections: usize,
}

impl<F: RateFunction> ThinningArrivals<F> {
    /// # Errors
    /// - [`ArrivalError::InvalidParameter`] for a non-positive or
    ///   non-finite bound `λ̄`, or a non-positive horizon.
    pub fn new(rate_fn: F, bound: f64, horizon: f64) -> ArrivalResult<Self> {
        if !(bound.is_finite() && bound > 0.0) {
            return Err(ArrivalError::InvalidParameter {
                name: "thinning bound",
                value: bound,
                reason: "The dominating rate must be finite and strictly positive.",
            });
        }
        if horizon.is_nan() || horizon <= 0.0 {
            return Err(ArrivalError::InvalidParameter {
                name: "thinning horizon",
                value: horizon,
                reason: "The ceiling time must be strictly positive (+inf allowed).",
            });
        }
        Ok(Self { rate_fn, bound, horizon, max_rejections: DEFAULT_MAX_REJECTIONS })
    }

    /// Change the cap on consecutive rejections; reaching it suspends the
    /// process for the replication.
    pub fn with_max_rejections(mut self, max_rejections: usize) -> Self {
        self.max_rejections = max_rejections.max(1);
        self
    }

    pub fn bound(&self) -> f64 {
        self.bound
    }

    pub fn horizon(&self) -> f64 {
        self.horizon
    }

    fn average_over(&self, periods: &dyn PeriodOracle, p: usize) -> ArrivalResult<f64> {
        verify_period(periods, p)?;
        let (start, end) = (periods.period_start(p), periods.period_end(p).min(self.horizon));
        if end <= start {
            return Ok(0.0);
        }
        self.rate_fn.average_rate(start, end).ok_or_else(|| {
            ArrivalError::unsupported("thinning arrivals", "The rate function has no closed-form average rate.")
        })
    }
}

impl<F: RateFunction> ArrivalModel for ThinningArrivals<F> {
    fn name(&self) -> &'static str {
        "thinning arrivals"
    }

    fn init(&mut self, _ctx: &mut ModelContext<'_>) -> ArrivalResult<()> {
        Ok(())
    }

    fn next_time(&mut self, ctx: &mut ModelContext<'_>) -> ArrivalResult<f64> {
        let candidate_rate = self.bound * ctx.busyness.day_factor();
        if candidate_rate <= 0.0 {
            return Ok(f64::INFINITY);
        }
        let mut t = ctx.now;
        for _ in 0..self.max_rejections {
            t += exponential(ctx.stream, candidate_rate)?;
            if t > self.horizon {
                return Ok(f64::INFINITY);
            }
            let rate = self.rate_fn.rate(t);
            if !(0.0..=self.bound).contains(&rate) {
                return Err(ArrivalError::RateExceedsBound { time: t, rate, bound: self.bound });
            }
            if ctx.stream.uniform() * self.bound <= rate {
                return Ok(t - ctx.now);
            }
        }
        warn!(now = ctx.now, rejections = self.max_rejections, "thinning gave up; suspending");
        Ok(f64::INFINITY)
    }

    fn arrival_rate(&self, periods: &dyn PeriodOracle, busyness: &BusynessState, p: usize) -> ArrivalResult<f64> {
        Ok(self.average_over(periods, p)? * busyness.day_factor())
    }

    fn expected_arrival_rate(&self, periods: &dyn PeriodOracle, busyness: &BusynessModel, p: usize) -> ArrivalResult<f64> {
        Ok(self.average_over(periods, p)? * busyness.expected_day())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        arrivals::{core::periods::PeriodSchedule, models::IntervalRates},
        random::RandomStream,
    };
    use approx::assert_relative_eq;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - The guard against λ(t) > λ̄.
    // - The ceiling T and the mean number of accepted arrivals.
    // - Unsupported rate queries for rate functions without averages,
    //   including an unbounded wrap-up period.
    // -------------------------------------------------------------------------

    struct Linear {
        slope: f64,
    }

    impl RateFunction for Linear {
        fn rate(&self, t: f64) -> f64 {
            self.slope * t
        }
    }

    #[test]
    // Purpose
    // -------
    // A rate above the dominating bound is an error, not a clamped
    // probability.
    //
    // Given
    // -----
    // - λ(t) = 10 t with λ̄ = 1, starting at t = 5.
    fn rate_above_bound_is_rejected() {
        let periods = PeriodSchedule::uniform(0.0, 1.0, 1).unwrap();
        let busy = BusynessState::unit();
        let mut stream = RandomStream::new(2);
        let mut m = ThinningArrivals::new(Linear { slope: 10.0 }, 1.0, f64::INFINITY).unwrap();
        let mut ctx = ModelContext { now: 5.0, periods: &periods, busyness: &busy, stream: &mut stream };
        assert!(matches!(m.next_time(&mut ctx), Err(ArrivalError::RateExceedsBound { .. })));
        assert!(matches!(m.arrival_rate(&periods, &busy, 1), Err(ArrivalError::Unsupported { .. })));
    }

    #[test]
    // Purpose
    // -------
    // Accepted arrivals over [0, T] average ∫λ · B, and nothing is
    // generated past T.
    //
    // Given
    // -----
    // - λ = 2 on [0, 5), 6 on [5, 10), λ̄ = 6, T = 10, B = 1.5.
    //
    // Expect
    // ------
    // - Mean count (10 + 30) · 1.5 = 60 over 2 000 replications.
    fn accepted_arrivals_match_integrated_rate() {
        // Arrange
        let periods = PeriodSchedule::uniform(0.0, 5.0, 2).unwrap();
        let busy = BusynessState::day(1.5).unwrap();
        let mut stream = RandomStream::new(8);
        let rates = IntervalRates::new(vec![0.0, 5.0, 10.0], vec![2.0, 6.0]).unwrap();
        let mut m = ThinningArrivals::new(rates, 6.0, 10.0).unwrap();
        let reps = 2_000;

        // Act
        let mut total = 0usize;
        for _ in 0..reps {
            let mut ctx = ModelContext { now: 0.0, periods: &periods, busyness: &busy, stream: &mut stream };
            loop {
                let d = m.next_time(&mut ctx).unwrap();
                if d.is_infinite() {
                    break;
                }
                ctx.now += d;
                assert!(ctx.now <= 10.0);
                total += 1;
            }
        }

        // Assert
        assert_relative_eq!(total as f64 / reps as f64, 60.0, max_relative = 0.02);
        assert_relative_eq!(m.arrival_rate(&periods, &busy, 2).unwrap(), 9.0);
        assert_eq!(m.arrival_rate(&periods, &busy, 3).unwrap(), 0.0);
    }

    struct Constant {
        level: f64,
        with_average: bool,
    }

    impl RateFunction for Constant {
        fn rate(&self, _t: f64) -> f64 {
            self.level
        }

        fn average_rate(&self, _start: f64, _end: f64) -> Option<f64> {
            self.with_average.then_some(self.level)
        }
    }

    #[test]
    // Purpose
    // -------
    // A constant rate on an unbounded wrap-up period is reported from the
    // rate function's own average, never as a silent zero.
    //
    // Given
    // -----
    // - λ(t) = 3, λ̄ = 4, no ceiling, B = 2; period 2 is the wrap-up
    //   [1, +∞).
    //
    // Expect
    // ------
    // - Rate 6 when the average is supplied, `Unsupported` otherwise.
    fn unbounded_wrapup_uses_rate_function_average() {
        let periods = PeriodSchedule::uniform(0.0, 1.0, 1).unwrap();
        let busy = BusynessState::day(2.0).unwrap();
        let model = BusynessModel::fixed(2.0).unwrap();

        let m = ThinningArrivals::new(Constant { level: 3.0, with_average: true }, 4.0, f64::INFINITY).unwrap();
        assert_relative_eq!(m.arrival_rate(&periods, &busy, 2).unwrap(), 6.0);
        assert_relative_eq!(m.expected_arrival_rate(&periods, &model, 2).unwrap(), 6.0);

        let m = ThinningArrivals::new(Constant { level: 3.0, with_average: false }, 4.0, f64::INFINITY).unwrap();
        assert!(matches!(m.arrival_rate(&periods, &busy, 2), Err(ArrivalError::Unsupported { .. })));
        assert!(matches!(m.expected_arrival_rate(&periods, &model, 2), Err(ArrivalError::Unsupported { .. })));
    }

    #[test]
    // Purpose
    // -------
    // Invalid bounds and horizons are rejected.
    fn invalid_configuration_is_rejected() {
        assert!(ThinningArrivals::new(Linear { slope: 1.0 }, 0.0, 1.0).is_err());
        assert!(ThinningArrivals::new(Linear { slope: 1.0 }, f64::INFINITY, 1.0).is_err());
        assert!(ThinningArrivals::new(Linear { slope: 1.0 }, 1.0, 0.0).is_err());
    }
}
