//! Query handlers for the Mission Progression context.
//!
//! Views are read-only snapshots for the heads-up display and the parent
//! application.

use descent_achievements::domain::evaluator::AchievementId;
use descent_core::clock::Clock;
use descent_core::floor::FloorIndex;
use descent_core::resources::StatsSnapshot;
use descent_narrative::domain::message_queue::BeatStage;
use serde::Serialize;
use uuid::Uuid;

use crate::domain::aggregates::Mission;
use crate::domain::stage::{ExitReason, MessageFlow, MissionStatus, StageState};

/// The beat on screen.
#[derive(Debug, Serialize)]
pub struct MessageView {
    /// Flow the beat belongs to.
    pub flow: Option<MessageFlow>,
    /// Who speaks.
    pub speaker: String,
    /// Text revealed so far.
    pub revealed_text: String,
    /// Whether the text is fully revealed.
    pub fully_revealed: bool,
}

/// Read-only view of a mission.
#[derive(Debug, Serialize)]
pub struct MissionView {
    /// The mission identifier.
    pub mission_id: Uuid,
    /// Lifecycle status.
    pub status: MissionStatus,
    /// Why the mission was exited, if it was.
    pub exit_reason: Option<ExitReason>,
    /// Current stage.
    pub stage: StageState,
    /// Meters and current floor.
    pub stats: StatsSnapshot,
    /// Whether the pause flag is set.
    pub paused: bool,
    /// Whether the first-run tutorial is shown.
    pub tutorial_active: bool,
    /// Whether a cinematic beat or an interlude holds the screen.
    pub modal: bool,
    /// The beat on screen.
    pub message: Option<MessageView>,
    /// Interlude lines revealed so far.
    pub interlude_lines: Vec<String>,
    /// Floor highlighted on the descent indicator.
    pub highlighted_floor: Option<FloorIndex>,
    /// Achievements unlocked so far.
    pub unlocked_achievements: Vec<AchievementId>,
}

/// Builds the view of `mission` at the clock's time.
pub fn get_mission_view(mission: &Mission, clock: &dyn Clock) -> MissionView {
    let now = clock.now();
    let message = mission.current_beat().map(|beat| MessageView {
        flow: mission.active_flow(),
        speaker: beat.speaker.clone(),
        revealed_text: mission.revealed_text(now).unwrap_or_default().to_owned(),
        fully_revealed: mission.message_stage() == Some(BeatStage::Revealed),
    });

    MissionView {
        mission_id: mission.id,
        status: mission.status(),
        exit_reason: mission.exit_reason(),
        stage: mission.stage(),
        stats: mission.stats(),
        paused: mission.is_paused(),
        tutorial_active: mission.is_tutorial_active(),
        modal: mission.is_modal(),
        message,
        interlude_lines: mission.interlude_lines().to_vec(),
        highlighted_floor: mission.highlighted_floor(now),
        unlocked_achievements: mission.unlocked_achievements().to_vec(),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use descent_content::domain::script::MissionScript;
    use descent_test_support::{FixedClock, ManualClock, t0};
    use uuid::Uuid;

    use super::*;

    fn started_mission(clock: &dyn Clock) -> Mission {
        let script = MissionScript::builtin().unwrap();
        let mut mission = Mission::new(Uuid::new_v4(), Arc::new(script));
        mission.start(true, Uuid::new_v4(), clock).unwrap();
        mission
    }

    #[test]
    fn test_get_mission_view_before_start() {
        // Arrange
        let clock = FixedClock(t0());
        let mission = Mission::new(Uuid::new_v4(), Arc::new(MissionScript::builtin().unwrap()));

        // Act
        let view = get_mission_view(&mission, &clock);

        // Assert
        assert_eq!(view.status, MissionStatus::NotStarted);
        assert_eq!(view.stats.health, 100);
        assert_eq!(view.stats.corruption, 0);
        assert_eq!(view.stats.current_floor, FloorIndex(7));
        assert!(view.message.is_none());
    }

    #[test]
    fn test_get_mission_view_shows_partially_revealed_intro_beat() {
        // Arrange
        let clock = ManualClock::starting_at_t0();
        let mission = started_mission(&clock);
        clock.advance_ms(90);

        // Act
        let view = get_mission_view(&mission, &clock);

        // Assert
        let message = view.message.unwrap();
        assert_eq!(message.flow, Some(MessageFlow::MissionIntro));
        assert_eq!(message.speaker, "Handler");
        assert!(!message.fully_revealed);
        let full = mission.current_beat().unwrap().text.clone();
        assert!(full.starts_with(&message.revealed_text));
        assert!(message.revealed_text.len() < full.len());
        assert!(view.modal);
        assert!(view.tutorial_active);
    }

    #[test]
    fn test_get_mission_view_serializes_snake_case_enums() {
        let clock = FixedClock(t0());
        let mission = started_mission(&clock);

        let json = serde_json::to_value(get_mission_view(&mission, &clock)).unwrap();

        assert_eq!(json["status"], "running");
        assert_eq!(json["stage"], "floor_intro");
        assert_eq!(json["stats"]["health"], 100);
    }
}
