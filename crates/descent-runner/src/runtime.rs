//! Headless mission loop.
//!
//! One task owns the [`Mission`] and serializes every mutation: player
//! inputs from the autopilot, ticks when the next deadline passes, and the
//! abort issued on shutdown. Events fan out to the HUD and back to the
//! autopilot through an [`EventBus`].

use std::future::Future;
use std::sync::Arc;

use descent_content::domain::script::MissionScript;
use descent_core::clock::{Clock, SystemClock};
use descent_core::error::DomainError;
use descent_core::rng::DeterministicRng;
use descent_core::sink::{EventBus, EventSink};
use descent_mission::application::command_handlers::{
    MissionCommandResult, handle_abort_mission, handle_advance_message, handle_collect_log,
    handle_complete_minigame, handle_fail_minigame, handle_start_mission, handle_tick,
};
use descent_mission::application::query_handlers::{MissionView, get_mission_view};
use descent_mission::domain::aggregates::Mission;
use descent_mission::domain::commands::{
    AbortMission, AdvanceMessage, CollectLog, CompleteMinigame, FailMinigame, StartMission, Tick,
};
use descent_mission::domain::stage::{CommandOutcome, MissionStatus};
use serde::Serialize;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::autopilot::{Autopilot, Observation, ObservationSink, PlayerInput};
use crate::clock::ScaledClock;
use crate::config::RunnerConfig;
use crate::error::AppError;
use crate::hud::HudSink;

/// Result of one playthrough, printed when the runner exits.
#[derive(Debug, Serialize)]
pub struct RunSummary {
    /// Seed of the autopilot's RNG.
    pub seed: u64,
    /// Fingerprint of the script that was played.
    pub script_digest: String,
    /// Number of events published during the run.
    pub events_published: usize,
    /// Final state of the mission.
    pub mission: MissionView,
}

/// Loads the configured script, or the built-in one.
///
/// # Errors
///
/// Returns `AppError::ScriptRead` if the file cannot be read and
/// `AppError::Domain` if it is not a valid script.
pub fn load_script(config: &RunnerConfig) -> Result<MissionScript, AppError> {
    let script = match &config.script_path {
        Some(path) => {
            let source = std::fs::read_to_string(path).map_err(|source| AppError::ScriptRead {
                path: path.display().to_string(),
                source,
            })?;
            MissionScript::from_yaml(&source)?
        }
        None => MissionScript::builtin()?,
    };
    info!(
        digest = %script.digest(),
        floors = script.floor_count(),
        items = script.total_items(),
        "script loaded"
    );
    Ok(script)
}

/// Routes a player input to its command handler.
///
/// # Errors
///
/// Returns `DomainError::Validation` if the mission was never started.
pub fn apply_input(
    input: &PlayerInput,
    clock: &dyn Clock,
    mission: &mut Mission,
    sink: &dyn EventSink,
) -> Result<MissionCommandResult, DomainError> {
    let correlation_id = Uuid::new_v4();
    match input {
        PlayerInput::CompleteMinigame(floor) => handle_complete_minigame(
            &CompleteMinigame {
                correlation_id,
                floor: *floor,
            },
            clock,
            mission,
            sink,
        ),
        PlayerInput::FailMinigame(floor) => handle_fail_minigame(
            &FailMinigame {
                correlation_id,
                floor: *floor,
            },
            clock,
            mission,
            sink,
        ),
        PlayerInput::CollectLog(floor, item_id) => handle_collect_log(
            &CollectLog {
                correlation_id,
                floor: *floor,
                item_id: item_id.clone(),
            },
            clock,
            mission,
            sink,
        ),
        PlayerInput::AdvanceMessage => {
            handle_advance_message(&AdvanceMessage { correlation_id }, clock, mission, sink)
        }
        PlayerInput::Abort => {
            handle_abort_mission(&AbortMission { correlation_id }, clock, mission, sink)
        }
    }
}

async fn sleep_until_due(wait: Option<std::time::Duration>) {
    match wait {
        Some(wait) => tokio::time::sleep(wait).await,
        None => std::future::pending().await,
    }
}

/// Serializes inputs, ticks and shutdown onto `mission` until it stops
/// running. Returns the number of events published. A closed input channel
/// aborts the mission.
async fn drive_mission(
    mission: &mut Mission,
    clock: &ScaledClock,
    bus: &EventBus,
    inputs_rx: &mut mpsc::UnboundedReceiver<PlayerInput>,
    observations_tx: &mpsc::UnboundedSender<Observation>,
    shutdown: impl Future<Output = ()>,
) -> Result<usize, AppError> {
    let mut events_published = 0;
    tokio::pin!(shutdown);
    while mission.status() == MissionStatus::Running {
        let wait = mission.next_deadline().map(|deadline| clock.wall_until(deadline));
        tokio::select! {
            input = inputs_rx.recv() => {
                let Some(input) = input else {
                    warn!("autopilot stopped sending inputs, aborting mission");
                    let result = apply_input(&PlayerInput::Abort, clock, mission, bus)?;
                    events_published += result.published.len();
                    break;
                };
                let result = apply_input(&input, clock, mission, bus)?;
                events_published += result.published.len();
                if let CommandOutcome::Ignored(reason) = result.outcome
                    && observations_tx.send(Observation::Ignored { input, reason }).is_err()
                {
                    debug!("autopilot no longer observing");
                }
            }
            () = sleep_until_due(wait) => {
                let result = handle_tick(
                    &Tick { correlation_id: Uuid::new_v4() },
                    clock,
                    mission,
                    bus,
                )?;
                events_published += result.published.len();
                if let Some(progress) = mission.transition_progress(clock.now()) {
                    debug!(progress, floor = %mission.floor(), "descending");
                }
            }
            () = &mut shutdown => {
                warn!("shutdown requested, aborting mission");
                let result = apply_input(&PlayerInput::Abort, clock, mission, bus)?;
                events_published += result.published.len();
            }
        }
    }
    Ok(events_published)
}

/// Plays `script` to the end with the autopilot, or until `shutdown`
/// resolves, in which case the mission is aborted.
///
/// # Errors
///
/// Returns `AppError::Domain` if a command is rejected.
pub async fn run_mission(
    config: &RunnerConfig,
    script: Arc<MissionScript>,
    rng: Box<dyn DeterministicRng>,
    shutdown: impl Future<Output = ()>,
) -> Result<RunSummary, AppError> {
    let clock = Arc::new(ScaledClock::new(SystemClock.now(), config.time_scale));
    let (observations_tx, observations_rx) = mpsc::unbounded_channel();
    let (inputs_tx, mut inputs_rx) = mpsc::unbounded_channel();

    let mut bus = EventBus::new();
    bus.subscribe(Arc::new(HudSink));
    bus.subscribe(Arc::new(ObservationSink::new(observations_tx.clone())));

    let autopilot = Autopilot::new(Arc::clone(&script), rng, config.fail_rate);
    let pilot = tokio::spawn(autopilot.run(observations_rx, inputs_tx, Arc::clone(&clock)));

    let mut mission = Mission::new(Uuid::now_v7(), Arc::clone(&script));
    info!(mission_id = %mission.id, seed = config.seed, "mission starting");
    let started = handle_start_mission(
        &StartMission {
            correlation_id: Uuid::new_v4(),
            show_tutorial: false,
        },
        clock.as_ref(),
        &mut mission,
        &bus,
    )?;
    let mut events_published = started.published.len();

    events_published += drive_mission(
        &mut mission,
        clock.as_ref(),
        &bus,
        &mut inputs_rx,
        &observations_tx,
        shutdown,
    )
    .await?;

    drop(bus);
    drop(observations_tx);
    if let Err(e) = pilot.await {
        warn!(error = %e, "autopilot task failed");
    }

    let view = get_mission_view(&mission, clock.as_ref());
    info!(
        status = ?view.status,
        events = events_published,
        achievements = view.unlocked_achievements.len(),
        "mission finished"
    );
    Ok(RunSummary {
        seed: config.seed,
        script_digest: mission.script().digest().to_owned(),
        events_published,
        mission: view,
    })
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use descent_core::floor::FloorIndex;
    use descent_test_support::{FixedClock, RecordingEventSink, t0};

    use super::*;

    #[test]
    fn test_load_script_defaults_to_the_builtin_script() {
        let script = load_script(&RunnerConfig::default()).unwrap();

        assert_eq!(script.floor_count(), 8);
        assert_eq!(script.digest(), MissionScript::builtin().unwrap().digest());
    }

    #[test]
    fn test_load_script_reports_missing_files() {
        let config = RunnerConfig {
            script_path: Some("/nonexistent/descent.yaml".into()),
            ..RunnerConfig::default()
        };

        let result = load_script(&config);

        assert!(matches!(result, Err(AppError::ScriptRead { path, .. }) if path.contains("nonexistent")));
    }

    #[test]
    fn test_load_script_rejects_invalid_yaml() {
        // Arrange
        let path = std::env::temp_dir().join(format!("descent-{}.yaml", Uuid::new_v4()));
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(b"floors: []\n").unwrap();
        let config = RunnerConfig {
            script_path: Some(path.clone()),
            ..RunnerConfig::default()
        };

        // Act
        let result = load_script(&config);
        std::fs::remove_file(&path).unwrap();

        // Assert
        assert!(matches!(result, Err(AppError::Domain(DomainError::InvalidScript(_)))));
    }

    #[test]
    fn test_apply_input_before_start_is_rejected() {
        let script = Arc::new(MissionScript::builtin().unwrap());
        let mut mission = Mission::new(Uuid::new_v4(), script);
        let sink = RecordingEventSink::new();

        let result = apply_input(
            &PlayerInput::CompleteMinigame(FloorIndex(7)),
            &FixedClock(t0()),
            &mut mission,
            &sink,
        );

        assert!(matches!(result, Err(DomainError::Validation(_))));
        assert!(sink.published().is_empty());
    }

    #[test]
    fn test_apply_input_routes_abort() {
        // Arrange
        let script = Arc::new(MissionScript::builtin().unwrap());
        let mut mission = Mission::new(Uuid::new_v4(), script);
        let sink = RecordingEventSink::new();
        let clock = FixedClock(t0());
        handle_start_mission(
            &StartMission {
                correlation_id: Uuid::new_v4(),
                show_tutorial: false,
            },
            &clock,
            &mut mission,
            &sink,
        )
        .unwrap();

        // Act
        let result = apply_input(&PlayerInput::Abort, &clock, &mut mission, &sink).unwrap();

        // Assert
        assert_eq!(result.outcome, CommandOutcome::Applied);
        assert_eq!(mission.status(), MissionStatus::Exited);
        assert_eq!(sink.count_of("mission.exited"), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_closed_input_channel_aborts_the_mission() {
        // Arrange
        let script = Arc::new(MissionScript::builtin().unwrap());
        let clock = ScaledClock::new(t0(), 0.05);
        let bus = EventBus::new();
        let mut mission = Mission::new(Uuid::new_v4(), script);
        handle_start_mission(
            &StartMission {
                correlation_id: Uuid::new_v4(),
                show_tutorial: false,
            },
            &clock,
            &mut mission,
            &bus,
        )
        .unwrap();
        let (inputs_tx, mut inputs_rx) = mpsc::unbounded_channel::<PlayerInput>();
        let (observations_tx, _observations_rx) = mpsc::unbounded_channel();
        drop(inputs_tx);

        // Act
        let published = drive_mission(
            &mut mission,
            &clock,
            &bus,
            &mut inputs_rx,
            &observations_tx,
            std::future::pending::<()>(),
        )
        .await
        .unwrap();

        // Assert
        assert_eq!(mission.status(), MissionStatus::Exited);
        assert!(published >= 1);
    }
}
