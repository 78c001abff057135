//! Seedable uniform random stream with substream resets.
//!
//! A [`RandomStream`] wraps a `StdRng` and remembers its base seed and the
//! index of the substream it is currently positioned on. Substream `k` is
//! seeded from a SplitMix64 mix of `(seed, k)`, so resetting to the start of
//! a substream replays exactly the same uniforms. This is what makes common
//! random numbers possible across two simulated scenarios.
use std::{cell::RefCell, rc::Rc};

use rand::{Rng, RngCore, SeedableRng, rngs::StdRng};

/// Stream shared between several cooperating consumers (arrival processes,
/// busyness models) within one single-threaded simulation.
pub type SharedStream = Rc<RefCell<RandomStream>>;

/// Reproducible pseudorandom stream.
///
/// Implements [`RngCore`], so every `rand`/`rand_distr` distribution can be
/// sampled from it directly.
#[derive(Debug, Clone)]
pub struct RandomStream {
    seed: u64,
    substream: u64,
    rng: StdRng,
}

impl RandomStream {
    /// Create a stream positioned at the start of substream 0.
    pub fn new(seed: u64) -> Self {
        Self { seed, substream: 0, rng: StdRng::seed_from_u64(substream_seed(seed, 0)) }
    }

    /// Wrap the stream for sharing between processes.
    pub fn into_shared(self) -> SharedStream {
        Rc::new(RefCell::new(self))
    }

    /// Base seed the stream was created with.
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Index of the current substream.
    pub fn substream(&self) -> u64 {
        self.substream
    }

    /// Rewind to the beginning of substream 0.
    pub fn reset_start_stream(&mut self) {
        self.substream = 0;
        self.reseed();
    }

    /// Rewind to the beginning of the current substream.
    pub fn reset_start_substream(&mut self) {
        self.reseed();
    }

    /// Jump to the beginning of the next substream.
    pub fn reset_next_substream(&mut self) {
        self.substream = self.substream.wrapping_add(1);
        self.reseed();
    }

    /// Uniform draw on the open interval `(0, 1)`.
    pub fn uniform(&mut self) -> f64 {
        loop {
            let u: f64 = self.rng.random();
            if u > 0.0 {
                return u;
            }
        }
    }

    /// Uniform draw on `[a, b)`; returns `a` when the interval is empty.
    pub fn uniform_in(&mut self, a: f64, b: f64) -> f64 {
        if b <= a {
            return a;
        }
        a + (b - a) * self.rng.random::<f64>()
    }

    fn reseed(&mut self) {
        self.rng = StdRng::seed_from_u64(substream_seed(self.seed, self.substream));
    }
}

impl RngCore for RandomStream {
    fn next_u32(&mut self) -> u32 {
        self.rng.next_u32()
    }

    fn next_u64(&mut self) -> u64 {
        self.rng.next_u64()
    }

    fn fill_bytes(&mut self, dst: &mut [u8]) {
        self.rng.fill_bytes(dst)
    }
}

fn substream_seed(seed: u64, substream: u64) -> u64 {
    splitmix64(seed ^ splitmix64(substream.wrapping_add(0x5851_F42D_4C95_7F2D)))
}

fn splitmix64(x: u64) -> u64 {
    let mut z = x.wrapping_add(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

#[cfg(test)]
mod tests {
    use super::*;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - Reproducibility of a stream from its seed.
    // - Substream rewinds (`reset_start_substream`, `reset_start_stream`).
    // - Distinct sequences across substreams and across seeds.
    // - The open-interval contract of `uniform`.
    // -------------------------------------------------------------------------

    fn draws(stream: &mut RandomStream, n: usize) -> Vec<f64> {
        (0..n).map(|_| stream.uniform()).collect()
    }

    #[test]
    // Purpose
    // -------
    // Two streams built from the same seed produce identical uniforms.
    //
    // Expect
    // ------
    // - Element-wise equal sequences.
    fn same_seed_produces_same_sequence() {
        // Arrange
        let mut a = RandomStream::new(42);
        let mut b = RandomStream::new(42);

        // Act / Assert
        assert_eq!(draws(&mut a, 32), draws(&mut b, 32));
    }

    #[test]
    // Purpose
    // -------
    // Rewinding the current substream replays the exact same draws, while
    // advancing to the next substream yields a different sequence.
    //
    // Given
    // -----
    // - A stream that has already consumed draws from substream 0.
    //
    // Expect
    // ------
    // - `reset_start_substream` replays substream 0.
    // - `reset_next_substream` moves to substream 1 with fresh draws.
    // - `reset_start_stream` returns to substream 0.
    fn substream_resets_replay_and_advance() {
        // Arrange
        let mut s = RandomStream::new(7);
        let first = draws(&mut s, 16);

        // Act
        s.reset_start_substream();
        let replay = draws(&mut s, 16);
        s.reset_next_substream();
        let next = draws(&mut s, 16);
        s.reset_start_stream();
        let back = draws(&mut s, 16);

        // Assert
        assert_eq!(first, replay);
        assert_ne!(first, next);
        assert_eq!(s.substream(), 0);
        assert_eq!(first, back);
    }

    #[test]
    // Purpose
    // -------
    // `uniform` stays strictly inside (0, 1) and `uniform_in` honors its
    // bounds, including the empty interval.
    fn uniform_draws_respect_bounds() {
        // Arrange
        let mut s = RandomStream::new(1);

        // Act / Assert
        for _ in 0..10_000 {
            let u = s.uniform();
            assert!(u > 0.0 && u < 1.0);
            let v = s.uniform_in(2.0, 3.0);
            assert!((2.0..3.0).contains(&v));
        }
        assert_eq!(s.uniform_in(5.0, 5.0), 5.0);
    }

    #[test]
    // Purpose
    // -------
    // Different seeds give different streams.
    fn different_seeds_diverge() {
        let mut a = RandomStream::new(1);
        let mut b = RandomStream::new(2);
        assert_ne!(draws(&mut a, 8), draws(&mut b, 8));
    }
}
