//! Scripted interlude player.
//!
//! Plays a linear cutscene as one atomic unit: line `i` becomes visible at
//! `i × stagger`, and the interlude completes after the last line plus a
//! trailing delay, or immediately when skipped. There is no per-line gate.

use std::fmt;

use chrono::{DateTime, Duration, Utc};
use descent_core::timer::{RunId, TimerQueue, millis};
use serde::{Deserialize, Serialize};

/// Visual theme tag handed to the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ThemeTag(String);

impl ThemeTag {
    /// Creates a theme tag.
    pub fn new(tag: impl Into<String>) -> Self {
        Self(tag.into())
    }

    /// Returns the tag as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ThemeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A scripted cutscene: ordered plain lines under one theme.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interlude {
    /// Visual theme.
    pub theme: ThemeTag,
    /// Lines in reveal order.
    pub lines: Vec<String>,
}

fn default_stagger_ms() -> u64 {
    1_800
}

fn default_trailing_ms() -> u64 {
    2_500
}

/// Reveal pacing of an interlude.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterludeTiming {
    /// Delay between two consecutive lines.
    #[serde(default = "default_stagger_ms")]
    pub stagger_ms: u64,
    /// Delay after the last line before completion.
    #[serde(default = "default_trailing_ms")]
    pub trailing_ms: u64,
}

impl Default for InterludeTiming {
    fn default() -> Self {
        Self {
            stagger_ms: default_stagger_ms(),
            trailing_ms: default_trailing_ms(),
        }
    }
}

impl InterludeTiming {
    fn line_offset(&self, index: usize) -> Duration {
        let index = u64::try_from(index).unwrap_or(u64::MAX);
        millis(index.saturating_mul(self.stagger_ms))
    }
}

/// Outward signal produced by the player.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InterludeSignal {
    /// A line became visible.
    LineRevealed {
        /// Run the line belongs to.
        run_id: RunId,
        /// Position of the line.
        index: usize,
    },
    /// The interlude finished or was skipped.
    Completed {
        /// Run that completed.
        run_id: RunId,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum InterludeTimer {
    Reveal { run_id: RunId, index: usize },
    Finish { run_id: RunId },
}

#[derive(Debug)]
struct InterludeRun {
    run_id: RunId,
    interlude: Interlude,
    revealed: usize,
}

/// Plays one interlude at a time.
#[derive(Debug, Default)]
pub struct InterludePlayer {
    timing: InterludeTiming,
    run: Option<InterludeRun>,
    timers: TimerQueue<InterludeTimer>,
}

impl InterludePlayer {
    /// Creates an idle player.
    #[must_use]
    pub fn new(timing: InterludeTiming) -> Self {
        Self {
            timing,
            run: None,
            timers: TimerQueue::new(),
        }
    }

    /// Starts playing `interlude`, replacing any interlude in progress.
    ///
    /// The first line is revealed immediately and every later line and the
    /// completion are scheduled up front. An interlude without lines
    /// completes immediately.
    pub fn play(
        &mut self,
        interlude: &Interlude,
        now: DateTime<Utc>,
    ) -> (RunId, Vec<InterludeSignal>) {
        self.cancel();
        let run_id = RunId::new();
        let line_count = interlude.lines.len();
        if line_count == 0 {
            return (run_id, vec![InterludeSignal::Completed { run_id }]);
        }

        for index in 1..line_count {
            self.timers.schedule_after(
                now,
                self.timing.line_offset(index),
                InterludeTimer::Reveal { run_id, index },
            );
        }
        self.timers.schedule_after(
            now,
            self.timing.line_offset(line_count - 1) + millis(self.timing.trailing_ms),
            InterludeTimer::Finish { run_id },
        );
        self.run = Some(InterludeRun {
            run_id,
            interlude: interlude.clone(),
            revealed: 1,
        });

        (
            run_id,
            vec![InterludeSignal::LineRevealed { run_id, index: 0 }],
        )
    }

    /// Completes the interlude immediately, regardless of reveal progress.
    /// Does nothing when no interlude is playing.
    pub fn skip(&mut self) -> Vec<InterludeSignal> {
        self.finish()
    }

    /// Fires the earliest due timer, if any, and returns what it produced.
    pub fn poll_due(&mut self, now: DateTime<Utc>) -> Vec<InterludeSignal> {
        let Some(timer) = self.timers.pop_due(now) else {
            return Vec::new();
        };
        match timer.key {
            InterludeTimer::Reveal { run_id, index } => match self.run.as_mut() {
                Some(run) if run.run_id == run_id => {
                    run.revealed = run.revealed.max(index + 1);
                    vec![InterludeSignal::LineRevealed { run_id, index }]
                }
                _ => Vec::new(),
            },
            InterludeTimer::Finish { run_id } => {
                if self.active_run() == Some(run_id) {
                    self.finish()
                } else {
                    Vec::new()
                }
            }
        }
    }

    /// Stops the interlude without reporting completion. Returns its token.
    pub fn cancel(&mut self) -> Option<RunId> {
        self.timers.clear();
        self.run.take().map(|run| run.run_id)
    }

    /// Postpones every pending reveal by `by`.
    pub fn shift(&mut self, by: Duration) {
        self.timers.shift(by);
    }

    /// Deadline of the earliest pending timer.
    #[must_use]
    pub fn next_deadline(&self) -> Option<DateTime<Utc>> {
        self.timers.next_deadline()
    }

    /// Token of the interlude in progress.
    #[must_use]
    pub fn active_run(&self) -> Option<RunId> {
        self.run.as_ref().map(|run| run.run_id)
    }

    /// Whether an interlude is playing.
    #[must_use]
    pub fn is_playing(&self) -> bool {
        self.run.is_some()
    }

    /// Theme of the interlude in progress.
    #[must_use]
    pub fn theme(&self) -> Option<&ThemeTag> {
        self.run.as_ref().map(|run| &run.interlude.theme)
    }

    /// Lines revealed so far.
    #[must_use]
    pub fn visible_lines(&self) -> &[String] {
        self.run
            .as_ref()
            .map_or(&[][..], |run| &run.interlude.lines[..run.revealed])
    }

    fn finish(&mut self) -> Vec<InterludeSignal> {
        self.timers.clear();
        self.run
            .take()
            .map(|run| vec![InterludeSignal::Completed { run_id: run.run_id }])
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use descent_test_support::t0;

    use super::*;

    fn interlude(lines: &[&str]) -> Interlude {
        Interlude {
            theme: ThemeTag::new("static"),
            lines: lines.iter().map(|line| (*line).to_owned()).collect(),
        }
    }

    fn player() -> InterludePlayer {
        InterludePlayer::new(InterludeTiming {
            stagger_ms: 100,
            trailing_ms: 500,
        })
    }

    fn run_until(player: &mut InterludePlayer, until: DateTime<Utc>) -> Vec<InterludeSignal> {
        let mut signals = Vec::new();
        while player.next_deadline().is_some_and(|deadline| deadline <= until) {
            signals.extend(player.poll_due(until));
        }
        signals
    }

    #[test]
    fn test_play_reveals_first_line_immediately() {
        // Arrange
        let mut player = player();

        // Act
        let (run_id, signals) = player.play(&interlude(&["one", "two", "three"]), t0());

        // Assert
        assert_eq!(
            signals,
            vec![InterludeSignal::LineRevealed { run_id, index: 0 }]
        );
        assert_eq!(player.visible_lines(), ["one".to_owned()]);
        assert_eq!(player.theme().map(ThemeTag::as_str), Some("static"));
    }

    #[test]
    fn test_lines_reveal_on_stagger_then_complete_after_trailing_delay() {
        // Arrange
        let mut player = player();
        let (run_id, _) = player.play(&interlude(&["one", "two", "three"]), t0());

        // Act
        let at_150 = run_until(&mut player, t0() + millis(150));
        let at_699 = run_until(&mut player, t0() + millis(699));
        let at_700 = run_until(&mut player, t0() + millis(700));

        // Assert
        assert_eq!(
            at_150,
            vec![InterludeSignal::LineRevealed { run_id, index: 1 }]
        );
        assert_eq!(
            at_699,
            vec![InterludeSignal::LineRevealed { run_id, index: 2 }]
        );
        assert_eq!(at_700, vec![InterludeSignal::Completed { run_id }]);
        assert!(!player.is_playing());
    }

    #[test]
    fn test_skip_completes_immediately_and_only_once() {
        // Arrange
        let mut player = player();
        let (run_id, _) = player.play(&interlude(&["one", "two"]), t0());

        // Act
        let skipped = player.skip();
        let skipped_again = player.skip();
        let later = run_until(&mut player, t0() + millis(10_000));

        // Assert
        assert_eq!(skipped, vec![InterludeSignal::Completed { run_id }]);
        assert!(skipped_again.is_empty());
        assert!(later.is_empty());
    }

    #[test]
    fn test_empty_interlude_completes_immediately() {
        let mut player = player();
        let (run_id, signals) = player.play(&interlude(&[]), t0());
        assert_eq!(signals, vec![InterludeSignal::Completed { run_id }]);
        assert!(!player.is_playing());
    }

    #[test]
    fn test_replaying_discards_previous_run_timers() {
        let mut player = player();
        player.play(&interlude(&["old", "older"]), t0());
        let (second, _) = player.play(&interlude(&["new"]), t0() + millis(50));

        let signals = run_until(&mut player, t0() + millis(10_000));

        assert_eq!(signals, vec![InterludeSignal::Completed { run_id: second }]);
    }

    #[test]
    fn test_cancel_suppresses_completion() {
        let mut player = player();
        let (run_id, _) = player.play(&interlude(&["one"]), t0());

        assert_eq!(player.cancel(), Some(run_id));
        assert!(run_until(&mut player, t0() + millis(10_000)).is_empty());
    }
}
