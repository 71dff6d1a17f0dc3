//! Scenario tests for collectible logs and achievements.

mod common;

use common::Harness;
use descent_core::floor::FloorIndex;
use descent_mission::domain::stage::{CommandOutcome, IgnoreReason};

#[test]
fn test_collecting_every_log_unlocks_archivist_exactly_once() {
    // Arrange
    let mut harness = Harness::builtin();
    harness.start();

    // Act
    harness.play_to_end(true);

    // Assert
    assert_eq!(harness.mission.resources().collected_count(), 9);
    let achievements = harness.completed_achievements();
    let archivist = achievements
        .iter()
        .filter(|id| id.as_str() == "archivist")
        .count();
    assert_eq!(archivist, 1);
    let unlocked_events = harness
        .payloads("mission.achievement_unlocked", "AchievementUnlocked")
        .into_iter()
        .filter(|payload| payload["achievement_id"] == "archivist")
        .collect::<Vec<_>>();
    assert_eq!(unlocked_events.len(), 1);
    assert_eq!(unlocked_events[0]["trigger"], "floor_complete");
}

#[test]
fn test_collection_counts_distinct_logs_of_the_current_floor() {
    // Arrange
    let mut harness = Harness::builtin();
    harness.start();
    harness.until_playable();

    // Act
    let first = harness.collect(FloorIndex(7), "log_lobby_register");
    let duplicate = harness.collect(FloorIndex(7), "log_lobby_register");
    let elsewhere = harness.collect(FloorIndex(7), "log_menu_card");
    let unknown = harness.collect(FloorIndex(7), "log_nonexistent");
    let stale = harness.collect(FloorIndex(6), "log_menu_card");

    // Assert
    assert_eq!(first, CommandOutcome::Applied);
    assert_eq!(
        duplicate,
        CommandOutcome::Ignored(IgnoreReason::AlreadyCollected)
    );
    assert_eq!(elsewhere, CommandOutcome::Ignored(IgnoreReason::UnknownItem));
    assert_eq!(unknown, CommandOutcome::Ignored(IgnoreReason::UnknownItem));
    assert_eq!(stale, CommandOutcome::Ignored(IgnoreReason::StaleFloor));
    assert_eq!(harness.mission.stats().logs_collected, 1);
    assert_eq!(harness.sink.count_of("mission.log_collected"), 1);
}

#[test]
fn test_collection_outside_gameplay_is_ignored() {
    let mut harness = Harness::builtin();
    harness.start();

    let outcome = harness.collect(FloorIndex(7), "log_lobby_register");

    assert_eq!(outcome, CommandOutcome::Ignored(IgnoreReason::WrongStage));
    assert_eq!(harness.mission.resources().collected_count(), 0);
}

#[test]
fn test_speed_demon_unlocks_when_a_floor_is_cleared_in_eight_seconds() {
    // Arrange
    let mut harness = Harness::builtin();
    harness.start();
    harness.until_playable();

    // Act
    harness.advance_ms(8_000);
    harness.complete(FloorIndex(7));

    // Assert
    let completed = harness.payloads("mission.minigame_completed", "MinigameCompleted");
    assert_eq!(completed[0]["elapsed_ms"], 8_000);
    let unlocked = harness.payloads("mission.achievement_unlocked", "AchievementUnlocked");
    assert_eq!(unlocked.len(), 1);
    assert_eq!(unlocked[0]["achievement_id"], "speed_demon");
    assert_eq!(unlocked[0]["title"], "Speed Demon");
    assert_eq!(unlocked[0]["trigger"], "floor_complete");
}

#[test]
fn test_speed_demon_is_not_unlocked_after_twelve_seconds() {
    let mut harness = Harness::builtin();
    harness.start();
    harness.until_playable();

    harness.advance_ms(12_000);
    harness.complete(FloorIndex(7));

    assert_eq!(harness.sink.count_of("mission.achievement_unlocked"), 0);
    assert!(harness.mission.unlocked_achievements().is_empty());
}

#[test]
fn test_floor_timer_survives_a_retry() {
    // Arrange
    let mut harness = Harness::builtin();
    harness.start();
    harness.until_playable();
    harness.advance_ms(4_000);
    harness.fail(FloorIndex(7));
    harness.until_playable();

    // Act
    harness.advance_ms(5_000);
    harness.complete(FloorIndex(7));

    // Assert: 4 s before the failure, 2 s of overlay, 5 s after the retry.
    let completed = harness.payloads("mission.minigame_completed", "MinigameCompleted");
    assert_eq!(completed[0]["elapsed_ms"], 11_000);
    assert_eq!(harness.sink.count_of("mission.achievement_unlocked"), 0);
}
