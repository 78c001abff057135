//! Piecewise-constant rates over arbitrary breakpoints.
use crate::arrivals::{
    errors::{ArrivalError, ArrivalResult},
    models::{inversion::CumulativeRate, thinning::RateFunction},
};

/// `λ(t) = r_i` on `[b_i, b_{i+1})`, 0 before `b_0` and from `b_k` on.
///
/// Breakpoints need not coincide with the periods of the process, which
/// makes this the usual input for [`ThinningArrivals`](super::ThinningArrivals)
/// and [`InversionArrivals`](super::InversionArrivals).
#[derive(Debug, Clone, PartialEq)]
pub struct IntervalRates {
    breakpoints: Vec<f64>,
    rates: Vec<f64>,
    // Λ at each breakpoint.
    cumulative: Vec<f64>,
}

impl IntervalRates {
    /// # Errors
    /// - [`ArrivalError::LengthMismatch`] unless there is one more
    ///   breakpoint than rates.
    /// - [`ArrivalError::InvalidPeriods`] for non-finite or non-increasing
    ///   breakpoints.
    /// - [`ArrivalError::InvalidRate`] for negative or non-finite rates.
    pub fn new(breakpoints: Vec<f64>, rates: Vec<f64>) -> ArrivalResult<Self> {
        if breakpoints.len() != rates.len() + 1 || rates.is_empty() {
            return Err(ArrivalError::LengthMismatch {
                what: "breakpoints vs. rates + 1",
                expected: rates.len().max(1) + 1,
                found: breakpoints.len(),
            });
        }
        for (index, w) in breakpoints.windows(2).enumerate() {
            if !(w[0].is_finite() && w[1].is_finite()) || w[1] <= w[0] {
                return Err(ArrivalError::InvalidPeriods {
                    index,
                    reason: "Breakpoints must be finite and strictly increasing.",
                });
            }
        }
        for (period, &value) in rates.iter().enumerate() {
            if !value.is_finite() || value < 0.0 {
                return Err(ArrivalError::InvalidRate { period, value, reason: "Rates must be finite and non-negative." });
            }
        }
        let mut cumulative = Vec::with_capacity(breakpoints.len());
        cumulative.push(0.0);
        for (i, r) in rates.iter().enumerate() {
            let last = cumulative[i];
            cumulative.push(last + r * (breakpoints[i + 1] - breakpoints[i]));
        }
        Ok(Self { breakpoints, rates, cumulative })
    }

    pub fn breakpoints(&self) -> &[f64] {
        &self.breakpoints
    }

    pub fn rates(&self) -> &[f64] {
        &self.rates
    }

    /// Largest rate; a valid thinning bound.
    pub fn max_rate(&self) -> f64 {
        self.rates.iter().copied().fold(0.0, f64::max)
    }

    /// `Λ(+∞)`.
    pub fn total(&self) -> f64 {
        self.cumulative[self.cumulative.len() - 1]
    }
}

impl RateFunction for IntervalRates {
    fn rate(&self, t: f64) -> f64 {
        let i = self.breakpoints.partition_point(|&b| b <= t);
        if i == 0 || i == self.breakpoints.len() {
            return 0.0;
        }
        self.rates[i - 1]
    }

    fn average_rate(&self, start: f64, end: f64) -> Option<f64> {
        if end <= start {
            return None;
        }
        if !end.is_finite() {
            return self.long_run_rate();
        }
        Some((self.cumulative(end) - self.cumulative(start)) / (end - start))
    }
}

impl CumulativeRate for IntervalRates {
    fn cumulative(&self, t: f64) -> f64 {
        let i = self.breakpoints.partition_point(|&b| b <= t);
        if i == 0 {
            return 0.0;
        }
        if i == self.breakpoints.len() {
            return self.total();
        }
        self.cumulative[i - 1] + self.rates[i - 1] * (t - self.breakpoints[i - 1])
    }

    /// `λ` vanishes from the last breakpoint on.
    fn long_run_rate(&self) -> Option<f64> {
        Some(0.0)
    }

    fn inverse(&self, y: f64) -> Option<f64> {
        if y <= 0.0 {
            return Some(self.breakpoints[0]);
        }
        if y > self.total() {
            return None;
        }
        // First j with Λ(b_j) >= y; segment j - 1 has a positive rate.
        let j = self.cumulative.partition_point(|&c| c < y);
        let i = j - 1;
        Some(self.breakpoints[i] + (y - self.cumulative[i]) / self.rates[i])
    }
}
