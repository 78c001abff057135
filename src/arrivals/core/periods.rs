//! Period structure: preliminary, main and wrap-up periods.
//!
//! With `P` main periods and boundaries `t₀ < t₁ < … < t_P`:
//!
//! | index     | interval          |
//! |-----------|-------------------|
//! | `0`       | `[0, t₀)`         |
//! | `1..=P`   | `[t_{p−1}, t_p)`  |
//! | `P + 1`   | `[t_P, +∞)`       |
//!
//! The oracle may be *locked* to one period, in which case every time maps
//! to that period; stationary starts require a locked oracle.
use std::cell::Cell;

use crate::arrivals::errors::{ArrivalError, ArrivalResult};

/// Read-only period queries used by arrival models.
pub trait PeriodOracle {
    /// Total number of periods, preliminary and wrap-up included (`P + 2`).
    fn period_count(&self) -> usize;

    /// Index of the period containing `time` (or the locked period).
    fn period_of(&self, time: f64) -> usize;

    /// Start time of period `p`.
    fn period_start(&self, p: usize) -> f64;

    /// End time of period `p`; `+∞` for the wrap-up period.
    fn period_end(&self, p: usize) -> f64;

    /// Period every time maps to, if the oracle is locked.
    fn locked_period(&self) -> Option<usize>;

    /// Number of main periods `P`.
    fn main_period_count(&self) -> usize {
        self.period_count().saturating_sub(2)
    }

    fn is_wrapup(&self, p: usize) -> bool {
        p + 1 == self.period_count()
    }

    fn is_locked(&self) -> bool {
        self.locked_period().is_some()
    }

    fn period_duration(&self, p: usize) -> f64 {
        self.period_end(p) - self.period_start(p)
    }
}

/// Concrete period table with optional locking.
#[derive(Debug, Clone, PartialEq)]
pub struct PeriodSchedule {
    boundaries: Vec<f64>,
    locked: Cell<Option<usize>>,
}

impl PeriodSchedule {
    /// Build from the `P + 1` boundaries `t₀ < … < t_P`, with `t₀ ≥ 0`.
    ///
    /// # Errors
    /// - [`ArrivalError::InvalidPeriods`] for fewer than two boundaries,
    ///   negative/non-finite entries or a non-increasing sequence.
    pub fn new(boundaries: Vec<f64>) -> ArrivalResult<Self> {
        if boundaries.len() < 2 {
            return Err(ArrivalError::InvalidPeriods {
                index: boundaries.len(),
                reason: "At least one main period (two boundaries) is required.",
            });
        }
        for (index, &t) in boundaries.iter().enumerate() {
            if !t.is_finite() || t < 0.0 {
                return Err(ArrivalError::InvalidPeriods {
                    index,
                    reason: "Boundaries must be finite and non-negative.",
                });
            }
            if index > 0 && t <= boundaries[index - 1] {
                return Err(ArrivalError::InvalidPeriods {
                    index,
                    reason: "Boundaries must be strictly increasing.",
                });
            }
        }
        Ok(Self { boundaries, locked: Cell::new(None) })
    }

    /// `count` main periods of equal `duration` starting at `start`.
    pub fn uniform(start: f64, duration: f64, count: usize) -> ArrivalResult<Self> {
        Self::new((0..=count).map(|i| start + duration * i as f64).collect())
    }

    /// Lock the oracle to period `p`.
    ///
    /// # Errors
    /// - [`ArrivalError::InvalidPeriods`] if `p` is out of range.
    pub fn lock(&self, p: usize) -> ArrivalResult<()> {
        if p >= self.period_count() {
            return Err(ArrivalError::InvalidPeriods {
                index: p,
                reason: "Locked period index out of range.",
            });
        }
        self.locked.set(Some(p));
        Ok(())
    }

    pub fn unlock(&self) {
        self.locked.set(None);
    }

    pub fn boundaries(&self) -> &[f64] {
        &self.boundaries
    }
}

impl PeriodOracle for PeriodSchedule {
    fn period_count(&self) -> usize {
        self.boundaries.len() + 1
    }

    fn period_of(&self, time: f64) -> usize {
        if let Some(p) = self.locked.get() {
            return p;
        }
        // Number of boundaries <= time.
        self.boundaries.partition_point(|&b| b <= time)
    }

    fn period_start(&self, p: usize) -> f64 {
        match p {
            0 => 0.0,
            _ => self.boundaries[(p - 1).min(self.boundaries.len() - 1)],
        }
    }

    fn period_end(&self, p: usize) -> f64 {
        self.boundaries.get(p).copied().unwrap_or(f64::INFINITY)
    }

    fn locked_period(&self) -> Option<usize> {
        self.locked.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // Index/boundary bookkeeping of `PeriodSchedule`, including the
    // preliminary and wrap-up periods, locking and validation.
    // -------------------------------------------------------------------------

    #[test]
    // Purpose
    // -------
    // Times map to the documented period indices and boundaries round-trip.
    //
    // Given
    // -----
    // - Boundaries [10, 20, 30]: two main periods.
    fn period_lookup_and_boundaries() {
        let s = PeriodSchedule::new(vec![10.0, 20.0, 30.0]).unwrap();
        assert_eq!(s.period_count(), 4);
        assert_eq!(s.main_period_count(), 2);
        assert_eq!(s.period_of(0.0), 0);
        assert_eq!(s.period_of(10.0), 1);
        assert_eq!(s.period_of(25.0), 2);
        assert_eq!(s.period_of(30.0), 3);
        assert!(s.is_wrapup(3));
        assert_eq!(s.period_start(0), 0.0);
        assert_eq!(s.period_start(2), 20.0);
        assert_eq!(s.period_end(2), 30.0);
        assert_eq!(s.period_end(3), f64::INFINITY);
        assert_eq!(s.period_duration(1), 10.0);
    }

    #[test]
    // Purpose
    // -------
    // Locking pins every lookup to one period until unlocked.
    fn locking_pins_period_lookup() {
        let s = PeriodSchedule::uniform(0.0, 5.0, 3).unwrap();
        assert!(!s.is_locked());
        s.lock(2).unwrap();
        assert_eq!(s.period_of(0.1), 2);
        assert_eq!(s.period_of(1e9), 2);
        assert!(s.lock(9).is_err());
        s.unlock();
        assert_eq!(s.period_of(0.1), 1);
    }

    #[test]
    // Purpose
    // -------
    // Invalid boundary sequences are rejected.
    fn invalid_boundaries_are_rejected() {
        assert!(PeriodSchedule::new(vec![1.0]).is_err());
        assert!(PeriodSchedule::new(vec![1.0, 1.0]).is_err());
        assert!(PeriodSchedule::new(vec![-1.0, 1.0]).is_err());
        assert!(PeriodSchedule::new(vec![0.0, f64::NAN]).is_err());
    }
}
