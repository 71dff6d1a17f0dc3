//! Test RNG — deterministic `DeterministicRng` implementations for tests.

use descent_core::rng::DeterministicRng;

/// A no-op RNG that always returns `min` for `next_u32_range` and `0.0` for
/// `next_f64`, so every `chance` roll succeeds.
#[derive(Debug)]
pub struct MockRng;

impl DeterministicRng for MockRng {
    fn next_u32_range(&mut self, min: u32, _max: u32) -> u32 {
        min
    }

    fn next_f64(&mut self) -> f64 {
        0.0
    }
}

/// An RNG that replays predetermined sequences. Panics if a sequence is
/// exhausted. Used by autopilot tests that need a specific run of
/// minigame successes and failures.
#[derive(Debug, Default)]
pub struct SequenceRng {
    integers: Vec<u32>,
    fractions: Vec<f64>,
    integer_index: usize,
    fraction_index: usize,
}

impl SequenceRng {
    /// Create a new `SequenceRng` replaying the given integer values.
    #[must_use]
    pub fn new(values: Vec<u32>) -> Self {
        Self {
            integers: values,
            ..Self::default()
        }
    }

    /// Adds a sequence of values returned by `next_f64`.
    #[must_use]
    pub fn with_fractions(mut self, fractions: Vec<f64>) -> Self {
        self.fractions = fractions;
        self
    }
}

impl DeterministicRng for SequenceRng {
    fn next_u32_range(&mut self, _min: u32, _max: u32) -> u32 {
        let val = self.integers[self.integer_index];
        self.integer_index += 1;
        val
    }

    fn next_f64(&mut self) -> f64 {
        let val = self.fractions[self.fraction_index];
        self.fraction_index += 1;
        val
    }
}
