//! Lifecycle enums of a mission and the outcome of applying a command.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Stage of the current floor. Exactly one is active at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageState {
    /// Floor title card.
    FloorIntro,
    /// The floor's minigame is playable.
    Gameplay,
    /// Completion beats are being presented.
    CompletionMessages,
    /// An interlude is playing on the way to the next floor.
    Cutscene,
    /// The transition to the next floor is running.
    Transitioning,
    /// The failure overlay is shown.
    FloorFailure,
}

impl fmt::Display for StageState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::FloorIntro => "floor_intro",
            Self::Gameplay => "gameplay",
            Self::CompletionMessages => "completion_messages",
            Self::Cutscene => "cutscene",
            Self::Transitioning => "transitioning",
            Self::FloorFailure => "floor_failure",
        };
        f.write_str(name)
    }
}

/// Lifecycle of the mission as a whole.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissionStatus {
    /// Created but not started.
    NotStarted,
    /// In progress.
    Running,
    /// The terminal floor was completed.
    Completed,
    /// Left before completion.
    Exited,
}

/// Why a mission was exited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitReason {
    /// Health reached zero.
    HealthDepleted,
    /// The player or the parent application aborted.
    Aborted,
}

/// Semantic flow a message run belongs to. Captured when the run starts and
/// used to route its drained signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageFlow {
    /// Beats shown before the first floor.
    MissionIntro,
    /// Beats shown once per floor visit shortly after gameplay starts.
    Entry,
    /// Beats shown after a floor's minigame is completed.
    Completion,
    /// One-shot low-health warning.
    Warning,
}

impl MessageFlow {
    /// Whether mission progression waits for this flow to drain. Such a flow
    /// always claims the message slot.
    #[must_use]
    pub fn gates_progression(self) -> bool {
        matches!(self, Self::MissionIntro | Self::Completion)
    }
}

/// Which side of the pause bridge changed the pause flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PauseSource {
    /// The mission's own pause toggle.
    Player,
    /// The external pause overlay.
    External,
    /// The external value applied when the tutorial was dismissed.
    TutorialDismissed,
}

/// Why a command or signal had no effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IgnoreReason {
    /// The mission is completed or exited.
    NotRunning,
    /// The mission is paused.
    Paused,
    /// A game over is already scheduled.
    GameOverPending,
    /// The signal belongs to a floor the mission has left.
    StaleFloor,
    /// The current stage does not accept the signal.
    WrongStage,
    /// A cinematic beat holds the screen.
    BlockedByCinematic,
    /// The item is not collectible on this floor.
    UnknownItem,
    /// The item was collected before.
    AlreadyCollected,
    /// The current beat is still being revealed.
    BeatStillTyping,
    /// No beat is on screen.
    NoActiveMessage,
    /// The pause flag already has the requested value.
    Unchanged,
    /// External pause sync is suppressed by the tutorial.
    SuppressedByTutorial,
    /// No tutorial is shown.
    NoTutorial,
    /// No timer was due.
    NothingDue,
}

/// Result of applying a command to a mission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandOutcome {
    /// The command changed the mission.
    Applied,
    /// The command was recognized but had no effect.
    Ignored(IgnoreReason),
}
