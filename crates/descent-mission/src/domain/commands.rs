//! Commands for the Mission Progression context.

use descent_core::command::Command;
use descent_core::floor::FloorIndex;
use descent_core::resources::ItemId;
use uuid::Uuid;

/// Command to start a mission.
#[derive(Debug, Clone)]
pub struct StartMission {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// Whether the first-run tutorial overlay is shown.
    pub show_tutorial: bool,
}

impl Command for StartMission {
    fn command_type(&self) -> &'static str {
        "mission.start"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }
}

/// Command reporting that a floor's minigame was completed.
#[derive(Debug, Clone)]
pub struct CompleteMinigame {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// Floor the minigame belongs to.
    pub floor: FloorIndex,
}

impl Command for CompleteMinigame {
    fn command_type(&self) -> &'static str {
        "mission.complete_minigame"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }
}

/// Command reporting that a floor's minigame was failed.
#[derive(Debug, Clone)]
pub struct FailMinigame {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// Floor the minigame belongs to.
    pub floor: FloorIndex,
}

impl Command for FailMinigame {
    fn command_type(&self) -> &'static str {
        "mission.fail_minigame"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }
}

/// Command reporting that a minigame collected a log.
#[derive(Debug, Clone)]
pub struct CollectLog {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// Floor the minigame belongs to.
    pub floor: FloorIndex,
    /// The collected log.
    pub item_id: ItemId,
}

impl Command for CollectLog {
    fn command_type(&self) -> &'static str {
        "mission.collect_log"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }
}

/// Command to dismiss the revealed beat.
#[derive(Debug, Clone)]
pub struct AdvanceMessage {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
}

impl Command for AdvanceMessage {
    fn command_type(&self) -> &'static str {
        "mission.advance_message"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }
}

/// Command to skip the playing interlude.
#[derive(Debug, Clone)]
pub struct SkipInterlude {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
}

impl Command for SkipInterlude {
    fn command_type(&self) -> &'static str {
        "mission.skip_interlude"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }
}

/// Command to skip the running transition.
#[derive(Debug, Clone)]
pub struct SkipTransition {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
}

impl Command for SkipTransition {
    fn command_type(&self) -> &'static str {
        "mission.skip_transition"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }
}

/// Command to toggle the mission's own pause flag.
#[derive(Debug, Clone)]
pub struct TogglePause {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
}

impl Command for TogglePause {
    fn command_type(&self) -> &'static str {
        "mission.toggle_pause"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }
}

/// Command carrying the external pause overlay's state.
#[derive(Debug, Clone)]
pub struct SetExternalPause {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// Whether the external overlay is paused.
    pub paused: bool,
}

impl Command for SetExternalPause {
    fn command_type(&self) -> &'static str {
        "mission.set_external_pause"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }
}

/// Command to dismiss the first-run tutorial overlay.
#[derive(Debug, Clone)]
pub struct DismissTutorial {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
}

impl Command for DismissTutorial {
    fn command_type(&self) -> &'static str {
        "mission.dismiss_tutorial"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }
}

/// Command to leave the mission immediately.
#[derive(Debug, Clone)]
pub struct AbortMission {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
}

impl Command for AbortMission {
    fn command_type(&self) -> &'static str {
        "mission.abort"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }
}

/// Command to fire every timer due at the current time.
#[derive(Debug, Clone)]
pub struct Tick {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
}

impl Command for Tick {
    fn command_type(&self) -> &'static str {
        "mission.tick"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }
}
