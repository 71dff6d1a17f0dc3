//! Shared test doubles and utilities for the Descent mission engine.

mod clock;
mod rng;
mod sink;

pub use clock::{FixedClock, ManualClock, t0};
pub use rng::{MockRng, SequenceRng};
pub use sink::RecordingEventSink;
