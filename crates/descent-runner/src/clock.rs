//! Scaled mission clock.

use chrono::{DateTime, Duration, Utc};
use descent_core::clock::Clock;
use tokio::time::Instant;

/// A clock whose mission time runs `1 / time_scale` times faster than the
/// wall clock. With a scale of `0.05` one mission second passes in 50 ms.
///
/// Reads tokio's clock, so paused test runtimes drive it too.
#[derive(Debug)]
pub struct ScaledClock {
    origin: DateTime<Utc>,
    started: Instant,
    time_scale: f64,
}

impl ScaledClock {
    /// Creates a clock reading `origin` now.
    #[must_use]
    pub fn new(origin: DateTime<Utc>, time_scale: f64) -> Self {
        Self {
            origin,
            started: Instant::now(),
            time_scale,
        }
    }

    /// Wall time until mission time reaches `deadline`; zero if it already has.
    #[must_use]
    pub fn wall_until(&self, deadline: DateTime<Utc>) -> std::time::Duration {
        let remaining = deadline - self.now();
        let micros = remaining.num_microseconds().unwrap_or(i64::MAX);
        self.wall_micros(micros)
    }

    /// Wall time of `mission_ms` mission milliseconds.
    #[must_use]
    pub fn wall_delay(&self, mission_ms: u64) -> std::time::Duration {
        let micros = i64::try_from(mission_ms.saturating_mul(1_000)).unwrap_or(i64::MAX);
        self.wall_micros(micros)
    }

    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_precision_loss,
        clippy::cast_sign_loss
    )]
    fn wall_micros(&self, mission_micros: i64) -> std::time::Duration {
        if mission_micros <= 0 {
            return std::time::Duration::ZERO;
        }
        // At least one tick, so a pending deadline always moves the clock.
        let wall = (mission_micros as f64 * self.time_scale).round().max(1.0);
        std::time::Duration::from_micros(wall as u64)
    }
}

impl Clock for ScaledClock {
    #[allow(clippy::cast_possible_truncation)]
    fn now(&self) -> DateTime<Utc> {
        let wall = self.started.elapsed().as_secs_f64();
        let mission_micros = (wall * 1_000_000.0 / self.time_scale).round() as i64;
        self.origin + Duration::microseconds(mission_micros)
    }
}
