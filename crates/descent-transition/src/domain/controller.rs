//! Stage transition controller.
//!
//! The descent phase always lasts the same wall-clock time no matter how many
//! floors are crossed; only the speed at which intermediate floors are
//! highlighted changes.

use chrono::{DateTime, Duration, Utc};
use descent_core::floor::FloorIndex;
use descent_core::timer::{RunId, TimerQueue, elapsed_ms, millis};
use serde::{Deserialize, Serialize};

fn default_descent_ms() -> u64 {
    3_000
}

fn default_arrival_ms() -> u64 {
    1_200
}

fn default_doors_ms() -> u64 {
    1_500
}

/// Duration budget of each phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionTiming {
    /// Progress bar fill time.
    #[serde(default = "default_descent_ms")]
    pub descent_ms: u64,
    /// Arrival confirmation display time.
    #[serde(default = "default_arrival_ms")]
    pub arrival_ms: u64,
    /// Door unveil time.
    #[serde(default = "default_doors_ms")]
    pub doors_ms: u64,
}

impl Default for TransitionTiming {
    fn default() -> Self {
        Self {
            descent_ms: default_descent_ms(),
            arrival_ms: default_arrival_ms(),
            doors_ms: default_doors_ms(),
        }
    }
}

impl TransitionTiming {
    /// Total time from start to completion when not skipped.
    #[must_use]
    pub fn total(&self) -> Duration {
        millis(self.descent_ms) + millis(self.arrival_ms) + millis(self.doors_ms)
    }

    fn budget(&self, phase: TransitionPhase) -> Duration {
        match phase {
            TransitionPhase::Descent => millis(self.descent_ms),
            TransitionPhase::Arrival => millis(self.arrival_ms),
            TransitionPhase::Doors => millis(self.doors_ms),
        }
    }
}

/// Phases of a transition, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionPhase {
    /// Progress indicator fills from 0 to 100%.
    Descent,
    /// Brief confirmation of the destination.
    Arrival,
    /// Fixed-duration unveil before control returns.
    Doors,
}

impl TransitionPhase {
    fn next(self) -> Option<Self> {
        match self {
            Self::Descent => Some(Self::Arrival),
            Self::Arrival => Some(Self::Doors),
            Self::Doors => None,
        }
    }
}

/// Outward signal produced by the controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransitionSignal {
    /// A phase began.
    PhaseEntered {
        /// Transition the phase belongs to.
        run_id: RunId,
        /// The phase.
        phase: TransitionPhase,
    },
    /// Doors finished, or the transition was skipped.
    Completed {
        /// Transition that completed.
        run_id: RunId,
        /// Floor the transition started from.
        from: FloorIndex,
        /// Destination floor.
        to: FloorIndex,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PhaseEnded {
    run_id: RunId,
    phase: TransitionPhase,
}

#[derive(Debug)]
struct TransitionRun {
    run_id: RunId,
    from: FloorIndex,
    to: FloorIndex,
    started_at: DateTime<Utc>,
    phase: TransitionPhase,
    high_water: u8,
}

/// Runs one transition at a time.
#[derive(Debug, Default)]
pub struct TransitionController {
    timing: TransitionTiming,
    run: Option<TransitionRun>,
    timers: TimerQueue<PhaseEnded>,
}

impl TransitionController {
    /// Creates an idle controller.
    #[must_use]
    pub fn new(timing: TransitionTiming) -> Self {
        Self {
            timing,
            run: None,
            timers: TimerQueue::new(),
        }
    }

    /// Starts a transition from `from` to `to`, replacing any in progress.
    pub fn start(
        &mut self,
        from: FloorIndex,
        to: FloorIndex,
        now: DateTime<Utc>,
    ) -> (RunId, Vec<TransitionSignal>) {
        self.cancel();
        let run_id = RunId::new();
        self.run = Some(TransitionRun {
            run_id,
            from,
            to,
            started_at: now,
            phase: TransitionPhase::Descent,
            high_water: 0,
        });
        (run_id, self.enter(run_id, TransitionPhase::Descent, now))
    }

    /// Completes the transition immediately.
    pub fn skip(&mut self) -> Vec<TransitionSignal> {
        self.finish()
    }

    /// Fires the earliest due timer, if any, and returns what it produced.
    pub fn poll_due(&mut self, now: DateTime<Utc>) -> Vec<TransitionSignal> {
        let Some(timer) = self.timers.pop_due(now) else {
            return Vec::new();
        };
        let PhaseEnded { run_id, phase } = timer.key;
        let current = self
            .run
            .as_ref()
            .is_some_and(|run| run.run_id == run_id && run.phase == phase);
        if !current {
            return Vec::new();
        }
        match phase.next() {
            Some(next) => self.enter(run_id, next, timer.deadline),
            None => self.finish(),
        }
    }

    /// Stops the transition without reporting completion. Returns its token.
    pub fn cancel(&mut self) -> Option<RunId> {
        self.timers.clear();
        self.run.take().map(|run| run.run_id)
    }

    /// Postpones the transition by `by`.
    pub fn shift(&mut self, by: Duration) {
        self.timers.shift(by);
        if let Some(run) = self.run.as_mut() {
            run.started_at += by;
        }
    }

    /// Deadline of the earliest pending timer.
    #[must_use]
    pub fn next_deadline(&self) -> Option<DateTime<Utc>> {
        self.timers.next_deadline()
    }

    /// Token of the transition in progress.
    #[must_use]
    pub fn active_run(&self) -> Option<RunId> {
        self.run.as_ref().map(|run| run.run_id)
    }

    /// Current phase.
    #[must_use]
    pub fn phase(&self) -> Option<TransitionPhase> {
        self.run.as_ref().map(|run| run.phase)
    }

    /// Descent progress in percent.
    ///
    /// Never exceeds 100 and never decreases during one transition, even if
    /// the clock is observed going backwards.
    pub fn progress_percent(&mut self, now: DateTime<Utc>) -> u8 {
        let descent_ms = self.timing.descent_ms;
        let Some(run) = self.run.as_mut() else {
            return 0;
        };
        let raw = if run.phase != TransitionPhase::Descent || descent_ms == 0 {
            100
        } else {
            let elapsed = elapsed_ms(run.started_at, now).min(descent_ms);
            u8::try_from(elapsed * 100 / descent_ms).unwrap_or(100)
        };
        run.high_water = run.high_water.max(raw.min(100));
        run.high_water
    }

    /// Floor highlighted on the descent indicator at `now`.
    ///
    /// Each crossed floor gets an equal share of the descent budget.
    #[must_use]
    pub fn highlighted_floor(&self, now: DateTime<Utc>) -> Option<FloorIndex> {
        let run = self.run.as_ref()?;
        let distance = run.from.distance_to(run.to);
        if run.phase != TransitionPhase::Descent || distance == 0 {
            return Some(run.to);
        }
        let segment_ms = (self.timing.descent_ms / u64::from(distance)).max(1);
        let passed = (elapsed_ms(run.started_at, now) / segment_ms).min(u64::from(distance));
        let passed = u8::try_from(passed).unwrap_or(distance);
        Some(FloorIndex(run.from.get() - passed))
    }

    fn enter(
        &mut self,
        run_id: RunId,
        phase: TransitionPhase,
        at: DateTime<Utc>,
    ) -> Vec<TransitionSignal> {
        if let Some(run) = self.run.as_mut() {
            run.phase = phase;
            if phase != TransitionPhase::Descent {
                run.high_water = 100;
            }
        }
        self.timers
            .schedule_after(at, self.timing.budget(phase), PhaseEnded { run_id, phase });
        vec![TransitionSignal::PhaseEntered { run_id, phase }]
    }

    fn finish(&mut self) -> Vec<TransitionSignal> {
        self.timers.clear();
        self.run
            .take()
            .map(|run| {
                vec![TransitionSignal::Completed {
                    run_id: run.run_id,
                    from: run.from,
                    to: run.to,
                }]
            })
            .unwrap_or_default()
    }
}
