//! Non-homogeneous Poisson arrivals by inversion of the cumulative rate.
use argmin::{
    core::{CostFunction, Error, Executor, State},
    solver::brent::BrentRoot,
};
use tracing::debug;

use crate::{
    arrivals::{
        core::{
            busyness::{BusynessModel, BusynessState},
            periods::PeriodOracle,
        },
        errors::{ArrivalError, ArrivalResult},
        models::{ArrivalModel, ModelContext, verify_period},
    },
    optimization::errors::OptError,
    random::variates::exponential,
};

const MAX_BRACKET_DOUBLINGS: usize = 200;
const MAX_ROOT_ITERS: u64 = 200;

/// Cumulative rate `Λ(t) = ∫₀ᵗ λ(s) ds`, non-decreasing.
pub trait CumulativeRate {
    fn cumulative(&self, t: f64) -> f64;

    /// `lim Λ(t)/t` as `t → ∞`, when known. Needed for the average rate of
    /// an unbounded period.
    fn long_run_rate(&self) -> Option<f64> {
        None
    }

    /// Smallest `t` with `Λ(t) = y`, when known in closed form. `None`
    /// falls back to numerical root finding.
    fn inverse(&self, _y: f64) -> Option<f64> {
        None
    }
}

/// Arrival times `Λ⁻¹(Λ(now) + E/B)` with `E ~ Exp(1)`.
#[derive(Debug, Clone, PartialEq)]
pub struct InversionArrivals<F: CumulativeRate> {
    cumulative: F,
    horizon: f64,
    tol: f64,
}

impl<F: CumulativeRate> InversionArrivals<F> {
    /// # Errors
    /// - [`ArrivalError::InvalidParameter`] for a non-positive horizon or
    ///   root tolerance.
    pub fn new(cumulative: F, horizon: f64, tol: f64) -> ArrivalResult<Self> {
        if horizon.is_nan() || horizon <= 0.0 {
            return Err(ArrivalError::InvalidParameter {
                name: "inversion horizon",
                value: horizon,
                reason: "The ceiling time must be strictly positive (+inf allowed).",
            });
        }
        if !(tol.is_finite() && tol > 0.0) {
            return Err(ArrivalError::InvalidParameter {
                name: "inversion tolerance",
                value: tol,
                reason: "The root tolerance must be finite and strictly positive.",
            });
        }
        Ok(Self { cumulative, horizon, tol })
    }

    pub fn horizon(&self) -> f64 {
        self.horizon
    }

    /// Smallest `t ≥ from` with `Λ(t) ≥ target`, or `None` past the ceiling.
    fn solve(&self, from: f64, target: f64) -> ArrivalResult<Option<f64>> {
        if target > self.cumulative.cumulative(self.horizon) {
            return Ok(None);
        }
        if let Some(t) = self.cumulative.inverse(target) {
            return Ok((t <= self.horizon).then_some(t.max(from)));
        }
        let Some(hi) = self.bracket(from, target) else {
            return Ok(None);
        };
        let problem = CumulativeGap { cumulative: &self.cumulative, target };
        let solver = BrentRoot::new(from, hi, self.tol);
        let result = Executor::new(problem, solver)
            .configure(|state| state.param(hi).max_iters(MAX_ROOT_ITERS))
            .run()
            .map_err(OptError::from)?;
        let state = result.state();
        let t = state.get_param().copied().ok_or(OptError::MissingThetaHat)?;
        debug!(target, t, iterations = state.get_iter(), "cumulative rate inverted numerically");
        Ok(Some(t.clamp(from, hi)))
    }

    /// Upper end of a sign-changing bracket `[from, hi]`.
    fn bracket(&self, from: f64, target: f64) -> Option<f64> {
        if self.horizon.is_finite() {
            return Some(self.horizon);
        }
        let mut step = 1.0_f64.max(from.abs());
        for _ in 0..MAX_BRACKET_DOUBLINGS {
            let hi = from + step;
            if self.cumulative.cumulative(hi) >= target {
                return Some(hi);
            }
            step *= 2.0;
        }
        None
    }

    fn average_over(&self, periods: &dyn PeriodOracle, p: usize) -> ArrivalResult<f64> {
        verify_period(periods, p)?;
        let (start, end) = (periods.period_start(p), periods.period_end(p).min(self.horizon));
        if end <= start {
            return Ok(0.0);
        }
        if !end.is_finite() {
            return self.cumulative.long_run_rate().ok_or_else(|| {
                ArrivalError::unsupported("inversion arrivals", "The cumulative rate has no long-run rate for an unbounded period.")
            });
        }
        Ok((self.cumulative.cumulative(end) - self.cumulative.cumulative(start)) / (end - start))
    }
}

struct CumulativeGap<'a, F> {
    cumulative: &'a F,
    target: f64,
}

impl<F: CumulativeRate> CostFunction for CumulativeGap<'_, F> {
    type Param = f64;
    type Output = f64;

    fn cost(&self, t: &f64) -> Result<f64, Error> {
        Ok(self.cumulative.cumulative(*t) - self.target)
    }
}

impl<F: CumulativeRate> ArrivalModel for InversionArrivals<F> {
    fn name(&self) -> &'static str {
        "inversion arrivals"
    }

    fn init(&mut self, _ctx: &mut ModelContext<'_>) -> ArrivalResult<()> {
        Ok(())
    }

    fn next_time(&mut self, ctx: &mut ModelContext<'_>) -> ArrivalResult<f64> {
        let b = ctx.busyness.day_factor();
        if b <= 0.0 || ctx.now >= self.horizon {
            return Ok(f64::INFINITY);
        }
        let target = self.cumulative.cumulative(ctx.now) + exponential(ctx.stream, 1.0)? / b;
        Ok(match self.solve(ctx.now, target)? {
            Some(t) => t - ctx.now,
            None => f64::INFINITY,
        })
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
    // - Numerical inversion through Brent's method against a closed form.
    // - The ceiling T and mean counts over a replication.
    // - Expected rates as period averages of Λ, and the long-run rate on an
    //   unbounded wrap-up period.
    // -------------------------------------------------------------------------

    /// `λ(t) = t`, no closed-form inverse supplied.
    struct Ramp;

    impl CumulativeRate for Ramp {
        fn cumulative(&self, t: f64) -> f64 {
            0.5 * t.max(0.0).powi(2)
        }
    }

    #[test]
    // Purpose
    // -------
    // Root finding recovers Λ⁻¹(y) = sqrt(2y) with and without a finite
    // ceiling.
    fn numerical_inverse_matches_closed_form() {
        let unbounded = InversionArrivals::new(Ramp, f64::INFINITY, 1e-12).unwrap();
        let bounded = InversionArrivals::new(Ramp, 10.0, 1e-12).unwrap();
        for y in [0.5, 2.0, 18.0] {
            let t = unbounded.solve(0.0, y).unwrap().unwrap();
            assert_relative_eq!(t, (2.0 * y).sqrt(), epsilon = 1e-8);
            let t = bounded.solve(0.0, y).unwrap().unwrap();
            assert_relative_eq!(t, (2.0 * y).sqrt(), epsilon = 1e-8);
        }
        assert!(bounded.solve(0.0, 60.0).unwrap().is_none());
    }

    #[test]
    // Purpose
    // -------
    // Arrivals over [0, T] average Λ(T) · B and stop at the ceiling.
    //
    // Given
    // -----
    // - λ = 3 on [0, 4), 1 on [4, 8), T = 6, B = 2.
    //
    // Expect
    // ------
    // - Mean count (12 + 2) · 2 = 28.
    fn mean_count_matches_cumulative_rate() {
        // Arrange
        let periods = PeriodSchedule::uniform(0.0, 4.0, 2).unwrap();
        let busy = BusynessState::day(2.0).unwrap();
        let mut stream = RandomStream::new(17);
        let rates = IntervalRates::new(vec![0.0, 4.0, 8.0], vec![3.0, 1.0]).unwrap();
        let mut m = InversionArrivals::new(rates, 6.0, 1e-10).unwrap();
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
                assert!(ctx.now <= 6.0);
                total += 1;
            }
        }

        // Assert
        assert_relative_eq!(total as f64 / reps as f64, 28.0, max_relative = 0.03);
        let model = BusynessModel::gamma_with_mean(4.0, 2.0).unwrap();
        assert_relative_eq!(m.expected_arrival_rate(&periods, &model, 1).unwrap(), 6.0);
        // Period 2 is cut at T = 6.
        assert_relative_eq!(m.arrival_rate(&periods, &busy, 2).unwrap(), 2.0);
    }

    /// `Λ(t) = level · t`.
    struct Linear {
        level: f64,
        with_limit: bool,
    }

    impl CumulativeRate for Linear {
        fn cumulative(&self, t: f64) -> f64 {
            self.level * t.max(0.0)
        }

        fn long_run_rate(&self) -> Option<f64> {
            self.with_limit.then_some(self.level)
        }
    }

    #[test]
    // Purpose
    // -------
    // A constant rate on an unbounded wrap-up period reports its long-run
    // rate, or `Unsupported` when the cumulative rate supplies none.
    //
    // Given
    // -----
    // - Λ(t) = 3t, no ceiling, B = 2; period 2 is the wrap-up [1, +∞).
    fn unbounded_wrapup_uses_long_run_rate() {
        let periods = PeriodSchedule::uniform(0.0, 1.0, 1).unwrap();
        let busy = BusynessState::day(2.0).unwrap();

        let m = InversionArrivals::new(Linear { level: 3.0, with_limit: true }, f64::INFINITY, 1e-10).unwrap();
        assert_relative_eq!(m.arrival_rate(&periods, &busy, 2).unwrap(), 6.0);
        assert_relative_eq!(m.arrival_rate(&periods, &busy, 1).unwrap(), 6.0);

        let m = InversionArrivals::new(Linear { level: 3.0, with_limit: false }, f64::INFINITY, 1e-10).unwrap();
        assert!(matches!(m.arrival_rate(&periods, &busy, 2), Err(ArrivalError::Unsupported { .. })));
    }
}
