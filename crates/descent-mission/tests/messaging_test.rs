//! Scenario tests for message flows sharing the single message slot.

mod common;

use common::Harness;
use descent_core::floor::FloorIndex;
use descent_mission::domain::stage::{CommandOutcome, IgnoreReason, MessageFlow, StageState};

const TWO_FLOORS: &str = r"
tuning:
  floor_intro_ms: 1000
  entry_beat_delay_ms: 500
  reveal:
    char_interval_ms: 10
floors:
  - index: 1
    name: Upper
    theme: dust
    entry_beats:
      - id: upper_entry
        speaker: Handler
        text: Look around before you touch anything.
        reveal_duration_ms: 1000
    completion_beats:
      - id: upper_done
        speaker: Handler
        text: Down you go.
        reveal_duration_ms: 1000
  - index: 0
    name: Lower
    theme: void
";

fn entry_beats_shown(harness: &Harness) -> usize {
    harness
        .payloads("mission.beat_shown", "BeatShown")
        .into_iter()
        .filter(|payload| payload["flow"] == "entry")
        .count()
}

#[test]
fn test_entry_beats_show_once_per_floor_visit() {
    // Arrange
    let mut harness = Harness::builtin();
    harness.start();
    harness.until_playable();
    harness.advance_ms(800);
    let shown_first_time = entry_beats_shown(&harness);

    // Act
    harness.fail(FloorIndex(7));
    harness.until_playable();
    harness.advance_ms(10_000);

    // Assert
    assert_eq!(shown_first_time, 1);
    assert_eq!(entry_beats_shown(&harness), 1);
}

#[test]
fn test_entry_beats_wait_for_the_delay_after_gameplay_starts() {
    let mut harness = Harness::from_yaml(TWO_FLOORS);
    harness.start();
    harness.until_playable();

    harness.advance_ms(499);
    let before_delay = entry_beats_shown(&harness);
    harness.advance_ms(1);

    assert_eq!(before_delay, 0);
    assert_eq!(entry_beats_shown(&harness), 1);
    assert_eq!(harness.mission.active_flow(), Some(MessageFlow::Entry));
}

#[test]
fn test_completion_supersedes_a_running_entry_flow_and_drains_once() {
    // Arrange
    let mut harness = Harness::from_yaml(TWO_FLOORS);
    harness.start();
    harness.until_playable();
    harness.advance_ms(500);
    assert_eq!(harness.mission.active_flow(), Some(MessageFlow::Entry));

    // Act
    harness.complete(FloorIndex(1));
    assert_eq!(harness.mission.active_flow(), Some(MessageFlow::Completion));
    assert!(harness.run_until(|m| m.floor() == FloorIndex(0)));

    // Assert
    // The empty mission intro drains at start; the entry run never drains.
    assert_eq!(harness.drained_flows(), vec!["mission_intro", "completion"]);
    assert_eq!(harness.sink.count_of("mission.transition_started"), 1);
    assert_eq!(harness.sink.count_of("mission.floor_entered"), 1);
}

#[test]
fn test_empty_mission_intro_arms_the_floor_intro_at_start() {
    let mut harness = Harness::from_yaml(TWO_FLOORS);
    harness.start();

    harness.advance_ms(1_000);

    assert_eq!(harness.mission.stage(), StageState::Gameplay);
    assert_eq!(harness.drained_flows(), vec!["mission_intro"]);
}

#[test]
fn test_advance_is_rejected_while_the_beat_is_typing() {
    // Arrange
    let mut harness = Harness::builtin();
    harness.start();

    // Act
    let while_typing = harness.advance_message();
    harness.step();
    let once_revealed = harness.advance_message();

    // Assert
    assert_eq!(
        while_typing,
        CommandOutcome::Ignored(IgnoreReason::BeatStillTyping)
    );
    assert_eq!(once_revealed, CommandOutcome::Applied);
    let shown = harness.payloads("mission.beat_shown", "BeatShown");
    assert_eq!(shown.len(), 2);
    assert_eq!(shown[1]["beat"]["id"], "intro_orders");
}

#[test]
fn test_cinematic_beat_blocks_minigame_signals() {
    // Arrange
    let mut harness = Harness::builtin();
    harness.start();
    while harness.mission.floor() != FloorIndex(0) {
        harness.clear_floor();
    }
    harness.until_playable();
    harness.advance_ms(800);
    assert!(harness.mission.is_modal());

    // Act
    let blocked = harness.complete(FloorIndex(0));

    // Assert
    assert_eq!(
        blocked,
        CommandOutcome::Ignored(IgnoreReason::BlockedByCinematic)
    );
    assert!(harness.run_until(|m| !m.is_modal()));
    assert_eq!(harness.complete(FloorIndex(0)), CommandOutcome::Applied);
}
