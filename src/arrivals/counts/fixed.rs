//! Deterministic per-period counts.
use crate::{
    arrivals::{
        core::busyness::{BusynessModel, BusynessState},
        counts::{CountModel, verify_wrapup_empty},
        errors::{ArrivalError, ArrivalResult},
    },
    random::RandomStream,
};

/// The same counts in every replication; busyness is ignored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixedCounts {
    counts: Vec<u64>,
}

impl FixedCounts {
    /// Counts for all `P + 2` periods.
    ///
    /// # Errors
    /// - [`ArrivalError::LengthMismatch`] for fewer than three periods.
    /// - [`ArrivalError::IllegalState`] for a non-zero wrap-up count.
    pub fn new(counts: Vec<u64>) -> ArrivalResult<Self> {
        if counts.len() < 3 {
            return Err(ArrivalError::LengthMismatch {
                what: "fixed counts (preliminary, main and wrap-up periods)",
                expected: 3,
                found: counts.len(),
            });
        }
        verify_wrapup_empty(&counts)?;
        Ok(Self { counts })
    }

    pub fn counts(&self) -> &[u64] {
        &self.counts
    }
}

impl CountModel for FixedCounts {
    fn name(&self) -> &'static str {
        "fixed counts"
    }

    fn period_count(&self) -> usize {
        self.counts.len()
    }

    fn draw_counts(&mut self, _busyness: &BusynessState, _stream: &mut RandomStream) -> ArrivalResult<Vec<u64>> {
        Ok(self.counts.clone())
    }

    fn expected_count(&self, _busyness: &BusynessModel, p: usize) -> f64 {
        self.counts.get(p).map_or(0.0, |&c| c as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    // Purpose
    // -------
    // A non-zero wrap-up count is an illegal configuration.
    fn wrapup_count_must_be_zero() {
        assert!(matches!(FixedCounts::new(vec![0, 3, 2]), Err(ArrivalError::IllegalState { .. })));
        let mut f = FixedCounts::new(vec![1, 3, 0]).unwrap();
        let counts = f.draw_counts(&BusynessState::day(5.0).unwrap(), &mut RandomStream::new(0)).unwrap();
        assert_eq!(counts, vec![1, 3, 0]);
        assert_eq!(f.expected_count(&BusynessModel::default(), 1), 3.0);
    }
}
