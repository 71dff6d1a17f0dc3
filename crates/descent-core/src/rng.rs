//! Random number generator abstraction for determinism.
//!
//! The orchestrator itself never draws random numbers; the headless runner's
//! autopilot does. In production this wraps a seeded RNG, in tests a
//! recorded sequence is injected.

/// Abstraction over random number generation.
pub trait DeterministicRng: Send + Sync {
    /// Generate a random `u32` in the range `[min, max]` inclusive.
    fn next_u32_range(&mut self, min: u32, max: u32) -> u32;

    /// Generate a random `f64` in `[0.0, 1.0)`.
    fn next_f64(&mut self) -> f64;

    /// Returns `true` with the given probability.
    fn chance(&mut self, probability: f64) -> bool {
        self.next_f64() < probability
    }
}
