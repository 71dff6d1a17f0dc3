//! Command handlers for the Mission Progression context.
//!
//! Each handler applies one command to the mission, then drains the events it
//! recorded and publishes them, in order, to the event sink.

use descent_core::aggregate::AggregateRoot;
use descent_core::clock::Clock;
use descent_core::error::DomainError;
use descent_core::event::EventEnvelope;
use descent_core::sink::EventSink;
use tracing::{debug, info, instrument};
use uuid::Uuid;

use crate::domain::aggregates::Mission;
use crate::domain::commands::{
    AbortMission, AdvanceMessage, CollectLog, CompleteMinigame, DismissTutorial, FailMinigame,
    SetExternalPause, SkipInterlude, SkipTransition, StartMission, Tick, TogglePause,
};
use crate::domain::stage::CommandOutcome;

/// What handling a command did.
#[derive(Debug, Clone)]
pub struct MissionCommandResult {
    /// The mission the command was applied to.
    pub aggregate_id: Uuid,
    /// Whether the command had an effect.
    pub outcome: CommandOutcome,
    /// Events published while handling the command, in order.
    pub published: Vec<EventEnvelope>,
}

fn publish_uncommitted(
    mission: &mut Mission,
    outcome: CommandOutcome,
    sink: &dyn EventSink,
) -> MissionCommandResult {
    let published: Vec<EventEnvelope> = mission
        .uncommitted_events()
        .iter()
        .map(EventEnvelope::from_event)
        .collect();
    for envelope in &published {
        sink.publish(envelope);
    }
    mission.clear_uncommitted_events();

    if let CommandOutcome::Ignored(reason) = outcome {
        debug!(?reason, "command ignored");
    }
    MissionCommandResult {
        aggregate_id: mission.id,
        outcome,
        published,
    }
}

/// Handles the `StartMission` command.
///
/// # Errors
///
/// Returns `DomainError::Validation` if the mission was already started.
#[instrument(skip(command, clock, mission, sink), fields(mission_id = %mission.id))]
pub fn handle_start_mission(
    command: &StartMission,
    clock: &dyn Clock,
    mission: &mut Mission,
    sink: &dyn EventSink,
) -> Result<MissionCommandResult, DomainError> {
    info!(correlation_id = %command.correlation_id, "handling start_mission command");
    let outcome = mission.start(command.show_tutorial, command.correlation_id, clock)?;
    Ok(publish_uncommitted(mission, outcome, sink))
}

/// Handles the `CompleteMinigame` command.
///
/// # Errors
///
/// Returns `DomainError::Validation` if the mission was never started.
#[instrument(skip(command, clock, mission, sink), fields(mission_id = %mission.id, floor = %command.floor))]
pub fn handle_complete_minigame(
    command: &CompleteMinigame,
    clock: &dyn Clock,
    mission: &mut Mission,
    sink: &dyn EventSink,
) -> Result<MissionCommandResult, DomainError> {
    info!(correlation_id = %command.correlation_id, "handling complete_minigame command");
    let outcome = mission.complete_minigame(command.floor, command.correlation_id, clock)?;
    Ok(publish_uncommitted(mission, outcome, sink))
}

/// Handles the `FailMinigame` command.
///
/// # Errors
///
/// Returns `DomainError::Validation` if the mission was never started.
#[instrument(skip(command, clock, mission, sink), fields(mission_id = %mission.id, floor = %command.floor))]
pub fn handle_fail_minigame(
    command: &FailMinigame,
    clock: &dyn Clock,
    mission: &mut Mission,
    sink: &dyn EventSink,
) -> Result<MissionCommandResult, DomainError> {
    info!(correlation_id = %command.correlation_id, "handling fail_minigame command");
    let outcome = mission.fail_minigame(command.floor, command.correlation_id, clock)?;
    Ok(publish_uncommitted(mission, outcome, sink))
}

/// Handles the `CollectLog` command.
///
/// # Errors
///
/// Returns `DomainError::Validation` if the mission was never started.
#[instrument(skip(command, clock, mission, sink), fields(mission_id = %mission.id, item_id = %command.item_id))]
pub fn handle_collect_log(
    command: &CollectLog,
    clock: &dyn Clock,
    mission: &mut Mission,
    sink: &dyn EventSink,
) -> Result<MissionCommandResult, DomainError> {
    info!(correlation_id = %command.correlation_id, "handling collect_log command");
    let outcome = mission.collect_log(
        command.floor,
        command.item_id.clone(),
        command.correlation_id,
        clock,
    )?;
    Ok(publish_uncommitted(mission, outcome, sink))
}

/// Handles the `AdvanceMessage` command.
///
/// # Errors
///
/// Returns `DomainError::Validation` if the mission was never started.
#[instrument(skip(command, clock, mission, sink), fields(mission_id = %mission.id))]
pub fn handle_advance_message(
    command: &AdvanceMessage,
    clock: &dyn Clock,
    mission: &mut Mission,
    sink: &dyn EventSink,
) -> Result<MissionCommandResult, DomainError> {
    info!(correlation_id = %command.correlation_id, "handling advance_message command");
    let outcome = mission.advance_message(command.correlation_id, clock)?;
    Ok(publish_uncommitted(mission, outcome, sink))
}

/// Handles the `SkipInterlude` command.
///
/// # Errors
///
/// Returns `DomainError::Validation` if the mission was never started.
#[instrument(skip(command, clock, mission, sink), fields(mission_id = %mission.id))]
pub fn handle_skip_interlude(
    command: &SkipInterlude,
    clock: &dyn Clock,
    mission: &mut Mission,
    sink: &dyn EventSink,
) -> Result<MissionCommandResult, DomainError> {
    info!(correlation_id = %command.correlation_id, "handling skip_interlude command");
    let outcome = mission.skip_interlude(command.correlation_id, clock)?;
    Ok(publish_uncommitted(mission, outcome, sink))
}

/// Handles the `SkipTransition` command.
///
/// # Errors
///
/// Returns `DomainError::Validation` if the mission was never started.
#[instrument(skip(command, clock, mission, sink), fields(mission_id = %mission.id))]
pub fn handle_skip_transition(
    command: &SkipTransition,
    clock: &dyn Clock,
    mission: &mut Mission,
    sink: &dyn EventSink,
) -> Result<MissionCommandResult, DomainError> {
    info!(correlation_id = %command.correlation_id, "handling skip_transition command");
    let outcome = mission.skip_transition(command.correlation_id, clock)?;
    Ok(publish_uncommitted(mission, outcome, sink))
}

/// Handles the `TogglePause` command.
///
/// # Errors
///
/// Returns `DomainError::Validation` if the mission was never started.
#[instrument(skip(command, clock, mission, sink), fields(mission_id = %mission.id))]
pub fn handle_toggle_pause(
    command: &TogglePause,
    clock: &dyn Clock,
    mission: &mut Mission,
    sink: &dyn EventSink,
) -> Result<MissionCommandResult, DomainError> {
    info!(correlation_id = %command.correlation_id, "handling toggle_pause command");
    let outcome = mission.toggle_pause(command.correlation_id, clock)?;
    Ok(publish_uncommitted(mission, outcome, sink))
}

/// Handles the `SetExternalPause` command.
///
/// # Errors
///
/// Returns `DomainError::Validation` if the mission was never started.
#[instrument(skip(command, clock, mission, sink), fields(mission_id = %mission.id, paused = command.paused))]
pub fn handle_set_external_pause(
    command: &SetExternalPause,
    clock: &dyn Clock,
    mission: &mut Mission,
    sink: &dyn EventSink,
) -> Result<MissionCommandResult, DomainError> {
    info!(correlation_id = %command.correlation_id, "handling set_external_pause command");
    let outcome = mission.set_external_pause(command.paused, command.correlation_id, clock)?;
    Ok(publish_uncommitted(mission, outcome, sink))
}

/// Handles the `DismissTutorial` command.
///
/// # Errors
///
/// Returns `DomainError::Validation` if the mission was never started.
#[instrument(skip(command, clock, mission, sink), fields(mission_id = %mission.id))]
pub fn handle_dismiss_tutorial(
    command: &DismissTutorial,
    clock: &dyn Clock,
    mission: &mut Mission,
    sink: &dyn EventSink,
) -> Result<MissionCommandResult, DomainError> {
    info!(correlation_id = %command.correlation_id, "handling dismiss_tutorial command");
    let outcome = mission.dismiss_tutorial(command.correlation_id, clock)?;
    Ok(publish_uncommitted(mission, outcome, sink))
}

/// Handles the `AbortMission` command.
///
/// # Errors
///
/// Returns `DomainError::Validation` if the mission was never started.
#[instrument(skip(command, clock, mission, sink), fields(mission_id = %mission.id))]
pub fn handle_abort_mission(
    command: &AbortMission,
    clock: &dyn Clock,
    mission: &mut Mission,
    sink: &dyn EventSink,
) -> Result<MissionCommandResult, DomainError> {
    info!(correlation_id = %command.correlation_id, "handling abort_mission command");
    let outcome = mission.abort(command.correlation_id, clock)?;
    Ok(publish_uncommitted(mission, outcome, sink))
}

/// Handles the `Tick` command: fires every timer due at the clock's time.
///
/// Ticks are frequent, so they log at debug level.
///
/// # Errors
///
/// Returns `DomainError::Validation` if the mission was never started.
#[instrument(level = "debug", skip(command, clock, mission, sink), fields(mission_id = %mission.id))]
pub fn handle_tick(
    command: &Tick,
    clock: &dyn Clock,
    mission: &mut Mission,
    sink: &dyn EventSink,
) -> Result<MissionCommandResult, DomainError> {
    debug!(correlation_id = %command.correlation_id, "handling tick command");
    let outcome = mission.tick(command.correlation_id, clock)?;
    Ok(publish_uncommitted(mission, outcome, sink))
}
