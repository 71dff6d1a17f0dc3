//! Seeded RNG for the autopilot.

use descent_core::rng::DeterministicRng;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// `DeterministicRng` backed by a seeded `StdRng`; the same seed replays the
/// same playthrough decisions.
#[derive(Debug)]
pub struct SeededRng {
    inner: StdRng,
}

impl SeededRng {
    /// Creates an RNG from `seed`.
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self {
            inner: StdRng::seed_from_u64(seed),
        }
    }
}

impl DeterministicRng for SeededRng {
    fn next_u32_range(&mut self, min: u32, max: u32) -> u32 {
        if min >= max {
            return min;
        }
        self.inner.random_range(min..=max)
    }

    fn next_f64(&mut self) -> f64 {
        self.inner.random::<f64>()
    }
}
