//! Shared helpers for mission scenario tests.
#![allow(dead_code)]

use std::sync::Arc;

use descent_content::domain::script::MissionScript;
use descent_core::clock::Clock;
use descent_core::floor::FloorIndex;
use descent_core::resources::ItemId;
use descent_mission::application::command_handlers::{
    MissionCommandResult, handle_advance_message, handle_collect_log, handle_complete_minigame,
    handle_dismiss_tutorial, handle_fail_minigame, handle_set_external_pause,
    handle_skip_interlude, handle_skip_transition, handle_start_mission, handle_tick,
    handle_toggle_pause,
};
use descent_mission::domain::aggregates::Mission;
use descent_mission::domain::commands::{
    AdvanceMessage, CollectLog, CompleteMinigame, DismissTutorial, FailMinigame,
    SetExternalPause, SkipInterlude, SkipTransition, StartMission, Tick, TogglePause,
};
use descent_mission::domain::stage::{CommandOutcome, MissionStatus, StageState};
use descent_narrative::domain::beat::AdvanceMode;
use descent_narrative::domain::message_queue::BeatStage;
use descent_test_support::{ManualClock, RecordingEventSink};
use uuid::Uuid;

/// Upper bound on driver steps before a scenario is considered stuck.
const MAX_STEPS: usize = 10_000;

/// A mission driven by a manual clock, publishing into a recording sink.
pub struct Harness {
    pub mission: Mission,
    pub clock: ManualClock,
    pub sink: RecordingEventSink,
}

impl Harness {
    /// Harness over the built-in eight-floor script.
    pub fn builtin() -> Self {
        Self::with_script(MissionScript::builtin().unwrap())
    }

    /// Harness over a script parsed from YAML.
    pub fn from_yaml(source: &str) -> Self {
        Self::with_script(MissionScript::from_yaml(source).unwrap())
    }

    fn with_script(script: MissionScript) -> Self {
        Self {
            mission: Mission::new(Uuid::new_v4(), Arc::new(script)),
            clock: ManualClock::starting_at_t0(),
            sink: RecordingEventSink::new(),
        }
    }

    pub fn start(&mut self) -> MissionCommandResult {
        self.start_with_tutorial(false)
    }

    pub fn start_with_tutorial(&mut self, show_tutorial: bool) -> MissionCommandResult {
        let command = StartMission {
            correlation_id: Uuid::new_v4(),
            show_tutorial,
        };
        handle_start_mission(&command, &self.clock, &mut self.mission, &self.sink).unwrap()
    }

    pub fn tick(&mut self) -> CommandOutcome {
        let command = Tick {
            correlation_id: Uuid::new_v4(),
        };
        handle_tick(&command, &self.clock, &mut self.mission, &self.sink)
            .unwrap()
            .outcome
    }

    /// Moves the clock forward by `ms` and fires whatever became due.
    pub fn advance_ms(&mut self, ms: i64) -> CommandOutcome {
        self.clock.advance_ms(ms);
        self.tick()
    }

    /// Makes one unit of progress: dismisses a revealed beat that waits for
    /// the player, otherwise jumps to the next deadline. Returns `false` when
    /// nothing is pending.
    pub fn step(&mut self) -> bool {
        let waiting_for_player = self.mission.message_stage() == Some(BeatStage::Revealed)
            && self
                .mission
                .current_beat()
                .is_some_and(|beat| beat.advance_mode == AdvanceMode::RequireExplicitAdvance);
        if waiting_for_player {
            self.advance_message();
            return true;
        }
        let Some(deadline) = self.mission.next_deadline() else {
            return false;
        };
        if deadline > self.clock.now() {
            self.clock.set(deadline);
        }
        self.tick();
        true
    }

    /// Steps until `predicate` holds. Returns whether it did.
    pub fn run_until(&mut self, predicate: impl Fn(&Mission) -> bool) -> bool {
        for _ in 0..MAX_STEPS {
            if predicate(&self.mission) {
                return true;
            }
            if !self.step() {
                break;
            }
        }
        predicate(&self.mission)
    }

    /// Steps until the minigame of the current floor accepts signals.
    pub fn until_playable(&mut self) {
        assert!(
            self.run_until(|m| m.stage() == StageState::Gameplay && !m.is_modal()),
            "mission never became playable"
        );
    }

    /// Completes the current floor and steps until the next floor is
    /// playable or the mission ends.
    pub fn clear_floor(&mut self) -> CommandOutcome {
        self.until_playable();
        let floor = self.mission.floor();
        let outcome = self.complete(floor);
        assert!(self.run_until(|m| {
            m.status() != MissionStatus::Running
                || (m.floor() != floor && m.stage() == StageState::Gameplay && !m.is_modal())
        }));
        outcome
    }

    /// Clears every remaining floor, collecting all logs of each floor first
    /// when `collect` is set.
    pub fn play_to_end(&mut self, collect: bool) {
        while self.mission.status() == MissionStatus::Running {
            self.until_playable();
            if collect {
                self.collect_all_on_floor();
            }
            self.clear_floor();
        }
    }

    pub fn collect_all_on_floor(&mut self) {
        let floor = self.mission.floor();
        let items = self
            .mission
            .script()
            .floor(floor)
            .map(|f| f.items.clone())
            .unwrap_or_default();
        for item in items {
            assert_eq!(self.collect(floor, item.as_str()), CommandOutcome::Applied);
        }
    }

    pub fn complete(&mut self, floor: FloorIndex) -> CommandOutcome {
        let command = CompleteMinigame {
            correlation_id: Uuid::new_v4(),
            floor,
        };
        handle_complete_minigame(&command, &self.clock, &mut self.mission, &self.sink)
            .unwrap()
            .outcome
    }

    pub fn fail(&mut self, floor: FloorIndex) -> CommandOutcome {
        let command = FailMinigame {
            correlation_id: Uuid::new_v4(),
            floor,
        };
        handle_fail_minigame(&command, &self.clock, &mut self.mission, &self.sink)
            .unwrap()
            .outcome
    }

    pub fn collect(&mut self, floor: FloorIndex, item: &str) -> CommandOutcome {
        let command = CollectLog {
            correlation_id: Uuid::new_v4(),
            floor,
            item_id: ItemId::new(item),
        };
        handle_collect_log(&command, &self.clock, &mut self.mission, &self.sink)
            .unwrap()
            .outcome
    }

    pub fn advance_message(&mut self) -> CommandOutcome {
        let command = AdvanceMessage {
            correlation_id: Uuid::new_v4(),
        };
        handle_advance_message(&command, &self.clock, &mut self.mission, &self.sink)
            .unwrap()
            .outcome
    }

    pub fn skip_interlude(&mut self) -> CommandOutcome {
        let command = SkipInterlude {
            correlation_id: Uuid::new_v4(),
        };
        handle_skip_interlude(&command, &self.clock, &mut self.mission, &self.sink)
            .unwrap()
            .outcome
    }

    pub fn skip_transition(&mut self) -> CommandOutcome {
        let command = SkipTransition {
            correlation_id: Uuid::new_v4(),
        };
        handle_skip_transition(&command, &self.clock, &mut self.mission, &self.sink)
            .unwrap()
            .outcome
    }

    pub fn toggle_pause(&mut self) -> CommandOutcome {
        let command = TogglePause {
            correlation_id: Uuid::new_v4(),
        };
        handle_toggle_pause(&command, &self.clock, &mut self.mission, &self.sink)
            .unwrap()
            .outcome
    }

    pub fn set_external_pause(&mut self, paused: bool) -> CommandOutcome {
        let command = SetExternalPause {
            correlation_id: Uuid::new_v4(),
            paused,
        };
        handle_set_external_pause(&command, &self.clock, &mut self.mission, &self.sink)
            .unwrap()
            .outcome
    }

    pub fn dismiss_tutorial(&mut self) -> CommandOutcome {
        let command = DismissTutorial {
            correlation_id: Uuid::new_v4(),
        };
        handle_dismiss_tutorial(&command, &self.clock, &mut self.mission, &self.sink)
            .unwrap()
            .outcome
    }

    /// Payloads of `event_type`, unwrapped from their variant tag.
    pub fn payloads(&self, event_type: &str, variant: &str) -> Vec<serde_json::Value> {
        self.sink
            .payloads_of(event_type)
            .into_iter()
            .map(|payload| payload[variant].clone())
            .collect()
    }

    /// Every published corruption value, in order.
    pub fn corruption_history(&self) -> Vec<u64> {
        self.payloads("mission.stats_updated", "StatsUpdated")
            .iter()
            .map(|payload| payload["stats"]["corruption"].as_u64().unwrap())
            .collect()
    }

    /// Flows of every drained message run, in order.
    pub fn drained_flows(&self) -> Vec<String> {
        self.payloads("mission.messages_drained", "MessagesDrained")
            .iter()
            .map(|payload| payload["flow"].as_str().unwrap().to_owned())
            .collect()
    }

    /// Achievement ids listed in the completion payload.
    pub fn completed_achievements(&self) -> Vec<String> {
        let completed = self.payloads("mission.completed", "MissionCompleted");
        assert_eq!(completed.len(), 1, "mission completed exactly once");
        completed[0]["unlocked_achievements"]
            .as_array()
            .unwrap()
            .iter()
            .map(|id| id.as_str().unwrap().to_owned())
            .collect()
    }
}
