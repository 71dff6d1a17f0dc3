//! Narrative message queue.
//!
//! Delivers an ordered list of beats strictly one at a time. Each beat is
//! revealed letter by letter, then dismissed either automatically or by an
//! explicit advance. When the last beat is dismissed the run reports
//! [`QueueSignal::Drained`] exactly once.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use descent_core::timer::{RunId, TimerQueue, elapsed_ms, millis};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::beat::{AdvanceMode, BeatList, DisplayMode, MessageBeat};

fn default_char_interval_ms() -> u64 {
    30
}

/// Letter-by-letter reveal speed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevealTiming {
    /// Delay between two revealed characters.
    #[serde(default = "default_char_interval_ms")]
    pub char_interval_ms: u64,
}

impl Default for RevealTiming {
    fn default() -> Self {
        Self {
            char_interval_ms: default_char_interval_ms(),
        }
    }
}

impl RevealTiming {
    /// Time needed to reveal `text` completely.
    #[must_use]
    pub fn reveal_duration(&self, text: &str) -> Duration {
        let chars = u64::try_from(text.chars().count()).unwrap_or(u64::MAX);
        millis(chars.saturating_mul(self.char_interval_ms))
    }
}

/// Where the current beat is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BeatStage {
    /// Text is still being revealed; explicit advance is rejected.
    Typing,
    /// Text is fully revealed.
    Revealed,
}

/// Outward signal produced by the queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueueSignal {
    /// A beat started revealing.
    BeatShown {
        /// Run the beat belongs to.
        run_id: RunId,
        /// Position of the beat in its list.
        index: usize,
        /// The beat.
        beat: MessageBeat,
    },
    /// The last beat of the run was dismissed.
    Drained {
        /// Run that drained.
        run_id: RunId,
    },
}

/// Result of an explicit advance request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdvanceOutcome {
    /// The current beat was dismissed.
    Dismissed,
    /// The current beat is still typing; nothing happened.
    RejectedWhileTyping,
    /// No run is active.
    Idle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum QueueTimer {
    RevealFinished { run_id: RunId, cursor: usize },
    AutoDismiss { run_id: RunId, cursor: usize },
}

#[derive(Debug)]
struct QueueRun {
    run_id: RunId,
    beats: BeatList,
    cursor: usize,
    shown_at: DateTime<Utc>,
    stage: BeatStage,
}

/// Single-slot queue presenting one beat list at a time.
#[derive(Debug, Default)]
pub struct MessageQueue {
    timing: RevealTiming,
    run: Option<QueueRun>,
    timers: TimerQueue<QueueTimer>,
}

impl MessageQueue {
    /// Creates an idle queue.
    #[must_use]
    pub fn new(timing: RevealTiming) -> Self {
        Self {
            timing,
            run: None,
            timers: TimerQueue::new(),
        }
    }

    /// Presents `beats`.
    ///
    /// If `beats` is the list already being presented (same allocation), the
    /// current run keeps its progress and no signal is produced. Any other
    /// list tears down the current run without draining it and starts a new
    /// run at the first beat. An empty list drains immediately.
    pub fn present(
        &mut self,
        beats: &BeatList,
        now: DateTime<Utc>,
    ) -> (RunId, Vec<QueueSignal>) {
        if let Some(run) = &self.run
            && Arc::ptr_eq(&run.beats, beats)
        {
            return (run.run_id, Vec::new());
        }

        if let Some(superseded) = self.cancel() {
            debug!(%superseded, "message run superseded");
        }

        let run_id = RunId::new();
        self.run = Some(QueueRun {
            run_id,
            beats: Arc::clone(beats),
            cursor: 0,
            shown_at: now,
            stage: BeatStage::Typing,
        });
        (run_id, self.show_current(now))
    }

    /// Dismisses the current beat if it is fully revealed.
    pub fn advance(&mut self, now: DateTime<Utc>) -> (AdvanceOutcome, Vec<QueueSignal>) {
        let Some(run) = &self.run else {
            return (AdvanceOutcome::Idle, Vec::new());
        };
        if self.cursor_out_of_bounds() {
            return (AdvanceOutcome::Dismissed, self.finish());
        }
        if run.stage == BeatStage::Typing {
            return (AdvanceOutcome::RejectedWhileTyping, Vec::new());
        }
        (AdvanceOutcome::Dismissed, self.dismiss_current(now))
    }

    /// Fires the earliest due timer, if any, and returns what it produced.
    pub fn poll_due(&mut self, now: DateTime<Utc>) -> Vec<QueueSignal> {
        if self.cursor_out_of_bounds() {
            return self.finish();
        }
        let Some(timer) = self.timers.pop_due(now) else {
            return Vec::new();
        };
        let at = timer.deadline;
        match timer.key {
            QueueTimer::RevealFinished { run_id, cursor } => {
                let timing_after_reveal = match self.run.as_mut() {
                    Some(run) if run.run_id == run_id && run.cursor == cursor => {
                        run.stage = BeatStage::Revealed;
                        run.beats
                            .get(cursor)
                            .map(|beat| (beat.advance_mode, beat.reveal_duration_ms))
                    }
                    _ => return Vec::new(),
                };
                match timing_after_reveal {
                    Some((AdvanceMode::AutoAfterDuration, hold_ms)) => {
                        self.timers.schedule_after(
                            at,
                            millis(hold_ms),
                            QueueTimer::AutoDismiss { run_id, cursor },
                        );
                        Vec::new()
                    }
                    Some((AdvanceMode::RequireExplicitAdvance, _)) => Vec::new(),
                    None => self.finish(),
                }
            }
            QueueTimer::AutoDismiss { run_id, cursor } => {
                if self.is_current(run_id, cursor) {
                    self.dismiss_current(at)
                } else {
                    Vec::new()
                }
            }
        }
    }

    /// Tears the active run down without draining it. Returns its token.
    pub fn cancel(&mut self) -> Option<RunId> {
        self.timers.clear();
        self.run.take().map(|run| run.run_id)
    }

    /// Postpones pending timers and the current reveal by `by`.
    pub fn shift(&mut self, by: Duration) {
        self.timers.shift(by);
        if let Some(run) = self.run.as_mut() {
            run.shown_at += by;
        }
    }

    /// Deadline of the earliest pending timer.
    #[must_use]
    pub fn next_deadline(&self) -> Option<DateTime<Utc>> {
        self.timers.next_deadline()
    }

    /// Token of the active run.
    #[must_use]
    pub fn active_run(&self) -> Option<RunId> {
        self.run.as_ref().map(|run| run.run_id)
    }

    /// The beat currently on screen.
    #[must_use]
    pub fn current_beat(&self) -> Option<&MessageBeat> {
        self.run.as_ref().and_then(|run| run.beats.get(run.cursor))
    }

    #[cfg(test)]
    pub(crate) fn cursor(&self) -> Option<usize> {
        self.run.as_ref().map(|run| run.cursor)
    }

    /// Lifecycle stage of the current beat.
    #[must_use]
    pub fn stage(&self) -> Option<BeatStage> {
        self.run.as_ref().map(|run| run.stage)
    }

    /// Whether the current beat is modal.
    #[must_use]
    pub fn is_modal(&self) -> bool {
        self.current_beat()
            .is_some_and(|beat| beat.display_mode == DisplayMode::Cinematic)
    }

    /// The part of the current beat's text visible at `now`.
    #[must_use]
    pub fn revealed_text(&self, now: DateTime<Utc>) -> Option<&str> {
        let run = self.run.as_ref()?;
        let beat = run.beats.get(run.cursor)?;
        if run.stage == BeatStage::Revealed {
            return Some(&beat.text);
        }
        let interval = self.timing.char_interval_ms.max(1);
        let visible =
            usize::try_from(elapsed_ms(run.shown_at, now) / interval).unwrap_or(usize::MAX);
        let end = beat
            .text
            .char_indices()
            .nth(visible)
            .map_or(beat.text.len(), |(offset, _)| offset);
        Some(&beat.text[..end])
    }

    fn cursor_out_of_bounds(&self) -> bool {
        self.run
            .as_ref()
            .is_some_and(|run| run.cursor >= run.beats.len())
    }

    fn is_current(&self, run_id: RunId, cursor: usize) -> bool {
        self.run
            .as_ref()
            .is_some_and(|run| {
                run.run_id == run_id && run.cursor == cursor && cursor < run.beats.len()
            })
    }

    fn dismiss_current(&mut self, now: DateTime<Utc>) -> Vec<QueueSignal> {
        self.timers.clear();
        if let Some(run) = self.run.as_mut() {
            run.cursor += 1;
        }
        self.show_current(now)
    }

    fn show_current(&mut self, now: DateTime<Utc>) -> Vec<QueueSignal> {
        let Some(run) = self.run.as_mut() else {
            return Vec::new();
        };
        let Some(beat) = run.beats.get(run.cursor).cloned() else {
            // Past the end: the run is already drained.
            return self.finish();
        };

        run.shown_at = now;
        run.stage = BeatStage::Typing;
        let run_id = run.run_id;
        let index = run.cursor;
        self.timers.schedule_after(
            now,
            self.timing.reveal_duration(&beat.text),
            QueueTimer::RevealFinished {
                run_id,
                cursor: index,
            },
        );
        vec![QueueSignal::BeatShown {
            run_id,
            index,
            beat,
        }]
    }

    fn finish(&mut self) -> Vec<QueueSignal> {
        self.timers.clear();
        self.run
            .take()
            .map(|run| vec![QueueSignal::Drained { run_id: run.run_id }])
            .unwrap_or_default()
    }

    #[cfg(test)]
    pub(crate) fn force_cursor(&mut self, cursor: usize) {
        if let Some(run) = self.run.as_mut() {
            run.cursor = cursor;
        }
    }
}
