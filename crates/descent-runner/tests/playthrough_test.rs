//! End-to-end playthroughs driven by the autopilot on paused tokio time.

mod common;

use std::sync::Arc;

use descent_content::domain::script::MissionScript;
use descent_mission::domain::stage::{ExitReason, MissionStatus};
use descent_runner::rng::SeededRng;
use descent_runner::runtime::run_mission;
use descent_test_support::MockRng;

#[tokio::test(start_paused = true)]
async fn test_flawless_autopilot_completes_the_descent() {
    // Arrange
    let config = common::fast_config(0.0);

    // Act
    let summary = common::play_builtin(&config, Box::new(MockRng)).await;

    // Assert
    assert_eq!(summary.mission.status, MissionStatus::Completed);
    assert_eq!(summary.mission.stats.current_floor.0, 0);
    assert_eq!(summary.mission.stats.corruption, 96);
    assert_eq!(summary.mission.stats.health, 100);
    assert_eq!(summary.mission.stats.logs_collected, 9);
    let unlocked: Vec<&str> = summary
        .mission
        .unlocked_achievements
        .iter()
        .map(|id| id.as_str())
        .collect();
    assert!(unlocked.contains(&"speed_demon"));
    assert!(unlocked.contains(&"archivist"));
    assert!(unlocked.contains(&"flawless_run"));
    assert!(unlocked.contains(&"finisher"));
}

#[tokio::test(start_paused = true)]
async fn test_autopilot_that_always_fails_runs_out_of_health() {
    let config = common::fast_config(1.0);

    let summary = common::play_builtin(&config, Box::new(MockRng)).await;

    assert_eq!(summary.mission.status, MissionStatus::Exited);
    assert_eq!(summary.mission.exit_reason, Some(ExitReason::HealthDepleted));
    assert_eq!(summary.mission.stats.health, 0);
    assert!(summary.mission.unlocked_achievements.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_aborts_the_mission() {
    // Arrange
    let config = common::fast_config(0.0);
    let script = Arc::new(MissionScript::builtin().unwrap());

    // Act
    let summary = run_mission(&config, script, Box::new(MockRng), std::future::ready(()))
        .await
        .unwrap();

    // Assert
    assert_eq!(summary.mission.status, MissionStatus::Exited);
    assert_eq!(summary.mission.exit_reason, Some(ExitReason::Aborted));
    assert_eq!(summary.mission.stats.current_floor.0, 7);
}

#[tokio::test(start_paused = true)]
async fn test_summary_names_the_seed_and_script() {
    // Arrange
    let config = common::fast_config(0.2);
    let rng = Box::new(SeededRng::new(config.seed));

    // Act
    let summary = common::play_builtin(&config, rng).await;
    let json = serde_json::to_value(&summary).unwrap();

    // Assert
    assert_ne!(summary.mission.status, MissionStatus::Running);
    assert_eq!(json["seed"], 7);
    assert_eq!(
        json["script_digest"],
        MissionScript::builtin().unwrap().digest()
    );
    assert!(summary.events_published > 0);
}
