//! Cancellable timers for cooperative, single-threaded scheduling.
//!
//! Nothing in the engine sleeps. Components schedule deadlines in a
//! [`TimerQueue`] they own and a driver pops due timers and feeds them back
//! into the owner. Clearing the queue when the owner is torn down is what
//! cancels its pending timers.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Converts a millisecond count into a `Duration`, saturating on overflow.
#[must_use]
pub fn millis(ms: u64) -> Duration {
    i64::try_from(ms)
        .ok()
        .and_then(Duration::try_milliseconds)
        .unwrap_or(Duration::MAX)
}

/// Milliseconds elapsed from `since` to `now`; zero if `now` is earlier.
#[must_use]
pub fn elapsed_ms(since: DateTime<Utc>, now: DateTime<Utc>) -> u64 {
    u64::try_from((now - since).num_milliseconds()).unwrap_or(0)
}

/// Correlation token identifying one run of a component (a queue run, an
/// interlude, a transition). Signals carry it so that late deliveries from a
/// superseded run can be recognized and discarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(Uuid);

impl RunId {
    /// Generates a fresh run token.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// Identifier of a scheduled timer, unique within its queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(u64);

/// A pending timer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduledTimer<K> {
    /// Handle of this timer.
    pub id: TimerId,
    /// When the timer fires.
    pub deadline: DateTime<Utc>,
    /// Owner-defined payload.
    pub key: K,
}

/// Deadline-ordered set of pending timers. Timers with equal deadlines fire
/// in the order they were scheduled.
#[derive(Debug, Clone)]
pub struct TimerQueue<K> {
    next_id: u64,
    entries: Vec<ScheduledTimer<K>>,
}

impl<K> Default for TimerQueue<K> {
    fn default() -> Self {
        Self {
            next_id: 0,
            entries: Vec::new(),
        }
    }
}

impl<K> TimerQueue<K> {
    /// Creates an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedules `key` to fire at `deadline`.
    pub fn schedule(&mut self, deadline: DateTime<Utc>, key: K) -> TimerId {
        let id = TimerId(self.next_id);
        self.next_id += 1;
        let position = self.entries.partition_point(|entry| entry.deadline <= deadline);
        self.entries.insert(position, ScheduledTimer { id, deadline, key });
        id
    }

    /// Schedules `key` to fire `delay` after `now`.
    pub fn schedule_after(&mut self, now: DateTime<Utc>, delay: Duration, key: K) -> TimerId {
        self.schedule(now + delay, key)
    }

    /// Cancels every pending timer.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Deadline of the earliest pending timer.
    #[must_use]
    pub fn next_deadline(&self) -> Option<DateTime<Utc>> {
        self.entries.first().map(|entry| entry.deadline)
    }

    /// Removes and returns the earliest timer if it is due at `now`.
    pub fn pop_due(&mut self, now: DateTime<Utc>) -> Option<ScheduledTimer<K>> {
        if self.entries.first()?.deadline <= now {
            Some(self.entries.remove(0))
        } else {
            None
        }
    }

    /// Postpones every pending timer by `by`. Used when resuming from pause.
    pub fn shift(&mut self, by: Duration) {
        for entry in &mut self.entries {
            entry.deadline += by;
        }
    }

    /// Number of pending timers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no timer is pending.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
