//! Domain events for the Mission Progression context.

use descent_achievements::domain::evaluator::{AchievementId, Trigger};
use descent_content::domain::script::FailurePolicy;
use descent_core::event::{DomainEvent, EventMetadata};
use descent_core::floor::FloorIndex;
use descent_core::resources::{ItemId, StatsSnapshot};
use descent_core::timer::RunId;
use descent_narrative::domain::beat::MessageBeat;
use descent_narrative::domain::interlude::ThemeTag;
use descent_transition::domain::controller::TransitionPhase;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::stage::{ExitReason, MessageFlow, PauseSource, StageState};

/// Emitted when a mission is started.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MissionStarted {
    /// The mission identifier.
    pub mission_id: Uuid,
    /// Floor the mission starts on.
    pub first_floor: FloorIndex,
    /// Number of floors in the script.
    pub floor_count: usize,
    /// Number of collectible logs in the script.
    pub total_items: usize,
    /// Fingerprint of the script source.
    pub script_digest: String,
}

/// Emitted on every stage change.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageChanged {
    /// Floor the stage belongs to.
    pub floor: FloorIndex,
    /// Previous stage.
    pub from: StageState,
    /// New stage.
    pub to: StageState,
}

/// Emitted whenever a meter or the current floor changes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatsUpdated {
    /// Snapshot for the heads-up display.
    pub stats: StatsSnapshot,
}

/// Emitted when a beat starts revealing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BeatShown {
    /// Message run the beat belongs to.
    pub run_id: RunId,
    /// Flow of the run.
    pub flow: MessageFlow,
    /// Position of the beat in its list.
    pub index: usize,
    /// The beat.
    pub beat: MessageBeat,
}

/// Emitted when the last beat of a message run is dismissed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessagesDrained {
    /// The drained run.
    pub run_id: RunId,
    /// Flow of the run.
    pub flow: MessageFlow,
}

/// Emitted when a floor's minigame is completed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MinigameCompleted {
    /// The floor.
    pub floor: FloorIndex,
    /// Time since gameplay started on this floor.
    pub elapsed_ms: Option<u64>,
}

/// Emitted when a floor's minigame is failed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MinigameFailed {
    /// The floor.
    pub floor: FloorIndex,
    /// How the failure is handled.
    pub policy: FailurePolicy,
    /// Health lost to this failure.
    pub health_lost: u8,
}

/// Emitted when a log is collected for the first time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogCollected {
    /// Floor the log was found on.
    pub floor: FloorIndex,
    /// The log.
    pub item_id: ItemId,
}

/// Emitted once, when health first drops to the warning threshold.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LowHealthWarning {
    /// Health after the failure.
    pub health: u8,
}

/// Emitted when an interlude starts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterludeStarted {
    /// The interlude run.
    pub run_id: RunId,
    /// Floor the interlude leads into.
    pub destination: FloorIndex,
    /// Visual theme.
    pub theme: ThemeTag,
    /// Number of lines.
    pub line_count: usize,
}

/// Emitted when an interlude line becomes visible.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterludeLineRevealed {
    /// The interlude run.
    pub run_id: RunId,
    /// Position of the line.
    pub index: usize,
    /// The line.
    pub line: String,
}

/// Emitted when an interlude finishes or is skipped.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterludeCompleted {
    /// The interlude run.
    pub run_id: RunId,
    /// Whether the player skipped it.
    pub skipped: bool,
}

/// Emitted when a transition starts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransitionStarted {
    /// The transition run.
    pub run_id: RunId,
    /// Origin floor.
    pub from: FloorIndex,
    /// Destination floor.
    pub to: FloorIndex,
}

/// Emitted when a transition enters a phase.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransitionPhaseEntered {
    /// The transition run.
    pub run_id: RunId,
    /// The phase.
    pub phase: TransitionPhase,
}

/// Emitted when a transition finishes or is skipped.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransitionCompleted {
    /// The transition run.
    pub run_id: RunId,
    /// Whether the player skipped it.
    pub skipped: bool,
}

/// Emitted when the mission arrives on a new floor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FloorEntered {
    /// The floor.
    pub floor: FloorIndex,
    /// Display name of the floor.
    pub name: String,
}

/// Emitted when an achievement is unlocked.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AchievementUnlocked {
    /// The achievement.
    pub achievement_id: AchievementId,
    /// Display title.
    pub title: String,
    /// Evaluation point that unlocked it.
    pub trigger: Trigger,
}

/// Emitted when the pause flag changes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PauseChanged {
    /// New value of the flag.
    pub paused: bool,
    /// Which side changed it.
    pub source: PauseSource,
}

/// Emitted when health is depleted and the exit is scheduled.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameOverScheduled {
    /// Floor the health ran out on.
    pub floor: FloorIndex,
    /// Delay before the exit.
    pub delay_ms: u64,
}

/// Emitted once, when the terminal floor is completed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MissionCompleted {
    /// Every unlocked achievement, in unlock order.
    pub unlocked_achievements: Vec<AchievementId>,
    /// Final meters.
    pub stats: StatsSnapshot,
}

/// Emitted once, when the mission is left before completion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MissionExited {
    /// Why the mission ended.
    pub reason: ExitReason,
    /// Final meters.
    pub stats: StatsSnapshot,
}

/// Event type identifier for [`MissionStarted`].
pub const MISSION_STARTED_EVENT_TYPE: &str = "mission.started";
/// Event type identifier for [`StageChanged`].
pub const STAGE_CHANGED_EVENT_TYPE: &str = "mission.stage_changed";
/// Event type identifier for [`StatsUpdated`].
pub const STATS_UPDATED_EVENT_TYPE: &str = "mission.stats_updated";
/// Event type identifier for [`BeatShown`].
pub const BEAT_SHOWN_EVENT_TYPE: &str = "mission.beat_shown";
/// Event type identifier for [`MessagesDrained`].
pub const MESSAGES_DRAINED_EVENT_TYPE: &str = "mission.messages_drained";
/// Event type identifier for [`MinigameCompleted`].
pub const MINIGAME_COMPLETED_EVENT_TYPE: &str = "mission.minigame_completed";
/// Event type identifier for [`MinigameFailed`].
pub const MINIGAME_FAILED_EVENT_TYPE: &str = "mission.minigame_failed";
/// Event type identifier for [`LogCollected`].
pub const LOG_COLLECTED_EVENT_TYPE: &str = "mission.log_collected";
/// Event type identifier for [`LowHealthWarning`].
pub const LOW_HEALTH_WARNING_EVENT_TYPE: &str = "mission.low_health_warning";
/// Event type identifier for [`InterludeStarted`].
pub const INTERLUDE_STARTED_EVENT_TYPE: &str = "mission.interlude_started";
/// Event type identifier for [`InterludeLineRevealed`].
pub const INTERLUDE_LINE_REVEALED_EVENT_TYPE: &str = "mission.interlude_line_revealed";
/// Event type identifier for [`InterludeCompleted`].
pub const INTERLUDE_COMPLETED_EVENT_TYPE: &str = "mission.interlude_completed";
/// Event type identifier for [`TransitionStarted`].
pub const TRANSITION_STARTED_EVENT_TYPE: &str = "mission.transition_started";
/// Event type identifier for [`TransitionPhaseEntered`].
pub const TRANSITION_PHASE_ENTERED_EVENT_TYPE: &str = "mission.transition_phase_entered";
/// Event type identifier for [`TransitionCompleted`].
pub const TRANSITION_COMPLETED_EVENT_TYPE: &str = "mission.transition_completed";
/// Event type identifier for [`FloorEntered`].
pub const FLOOR_ENTERED_EVENT_TYPE: &str = "mission.floor_entered";
/// Event type identifier for [`AchievementUnlocked`].
pub const ACHIEVEMENT_UNLOCKED_EVENT_TYPE: &str = "mission.achievement_unlocked";
/// Event type identifier for [`PauseChanged`].
pub const PAUSE_CHANGED_EVENT_TYPE: &str = "mission.pause_changed";
/// Event type identifier for [`GameOverScheduled`].
pub const GAME_OVER_SCHEDULED_EVENT_TYPE: &str = "mission.game_over_scheduled";
/// Event type identifier for [`MissionCompleted`].
pub const MISSION_COMPLETED_EVENT_TYPE: &str = "mission.completed";
/// Event type identifier for [`MissionExited`].
pub const MISSION_EXITED_EVENT_TYPE: &str = "mission.exited";

/// Event payload variants for the Mission Progression context.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum MissionEventKind {
    /// The mission has started.
    MissionStarted(MissionStarted),
    /// The stage changed.
    StageChanged(StageChanged),
    /// A meter or the floor changed.
    StatsUpdated(StatsUpdated),
    /// A beat started revealing.
    BeatShown(BeatShown),
    /// A message run drained.
    MessagesDrained(MessagesDrained),
    /// A minigame was completed.
    MinigameCompleted(MinigameCompleted),
    /// A minigame was failed.
    MinigameFailed(MinigameFailed),
    /// A log was collected.
    LogCollected(LogCollected),
    /// Health dropped to the warning threshold.
    LowHealthWarning(LowHealthWarning),
    /// An interlude started.
    InterludeStarted(InterludeStarted),
    /// An interlude line became visible.
    InterludeLineRevealed(InterludeLineRevealed),
    /// An interlude ended.
    InterludeCompleted(InterludeCompleted),
    /// A transition started.
    TransitionStarted(TransitionStarted),
    /// A transition entered a phase.
    TransitionPhaseEntered(TransitionPhaseEntered),
    /// A transition ended.
    TransitionCompleted(TransitionCompleted),
    /// The mission arrived on a new floor.
    FloorEntered(FloorEntered),
    /// An achievement was unlocked.
    AchievementUnlocked(AchievementUnlocked),
    /// The pause flag changed.
    PauseChanged(PauseChanged),
    /// The game-over exit was scheduled.
    GameOverScheduled(GameOverScheduled),
    /// The mission was completed.
    MissionCompleted(MissionCompleted),
    /// The mission was exited.
    MissionExited(MissionExited),
}

impl MissionEventKind {
    /// Event type identifier of this payload.
    #[must_use]
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::MissionStarted(_) => MISSION_STARTED_EVENT_TYPE,
            Self::StageChanged(_) => STAGE_CHANGED_EVENT_TYPE,
            Self::StatsUpdated(_) => STATS_UPDATED_EVENT_TYPE,
            Self::BeatShown(_) => BEAT_SHOWN_EVENT_TYPE,
            Self::MessagesDrained(_) => MESSAGES_DRAINED_EVENT_TYPE,
            Self::MinigameCompleted(_) => MINIGAME_COMPLETED_EVENT_TYPE,
            Self::MinigameFailed(_) => MINIGAME_FAILED_EVENT_TYPE,
            Self::LogCollected(_) => LOG_COLLECTED_EVENT_TYPE,
            Self::LowHealthWarning(_) => LOW_HEALTH_WARNING_EVENT_TYPE,
            Self::InterludeStarted(_) => INTERLUDE_STARTED_EVENT_TYPE,
            Self::InterludeLineRevealed(_) => INTERLUDE_LINE_REVEALED_EVENT_TYPE,
            Self::InterludeCompleted(_) => INTERLUDE_COMPLETED_EVENT_TYPE,
            Self::TransitionStarted(_) => TRANSITION_STARTED_EVENT_TYPE,
            Self::TransitionPhaseEntered(_) => TRANSITION_PHASE_ENTERED_EVENT_TYPE,
            Self::TransitionCompleted(_) => TRANSITION_COMPLETED_EVENT_TYPE,
            Self::FloorEntered(_) => FLOOR_ENTERED_EVENT_TYPE,
            Self::AchievementUnlocked(_) => ACHIEVEMENT_UNLOCKED_EVENT_TYPE,
            Self::PauseChanged(_) => PAUSE_CHANGED_EVENT_TYPE,
            Self::GameOverScheduled(_) => GAME_OVER_SCHEDULED_EVENT_TYPE,
            Self::MissionCompleted(_) => MISSION_COMPLETED_EVENT_TYPE,
            Self::MissionExited(_) => MISSION_EXITED_EVENT_TYPE,
        }
    }
}

/// Domain event envelope for the Mission Progression context.
#[derive(Debug, Clone)]
pub struct MissionEvent {
    /// Event metadata.
    pub metadata: EventMetadata,
    /// Event-specific payload.
    pub kind: MissionEventKind,
}

impl DomainEvent for MissionEvent {
    fn event_type(&self) -> &'static str {
        self.kind.event_type()
    }

    fn to_payload(&self) -> serde_json::Value {
        // Serialization of derived Serialize types to Value is infallible.
        serde_json::to_value(&self.kind).expect("MissionEventKind serialization is infallible")
    }

    fn metadata(&self) -> &EventMetadata {
        &self.metadata
    }
}
