//! Aggregate roots for the Mission Progression context.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use descent_achievements::domain::evaluator::{
    AchievementEvaluator, AchievementId, AchievementRules, Trigger,
};
use descent_content::domain::script::{FailurePolicy, MissionScript};
use descent_core::aggregate::AggregateRoot;
use descent_core::clock::Clock;
use descent_core::error::DomainError;
use descent_core::event::EventMetadata;
use descent_core::floor::FloorIndex;
use descent_core::resources::{ItemId, ResourceState, StatsSnapshot};
use descent_core::timer::{RunId, TimerQueue, elapsed_ms, millis};
use descent_narrative::domain::beat::{BeatList, MessageBeat, PriorityTier, flow_tier};
use descent_narrative::domain::interlude::{InterludePlayer, InterludeSignal};
use descent_narrative::domain::message_queue::{
    AdvanceOutcome, BeatStage, MessageQueue, QueueSignal,
};
use descent_transition::domain::controller::{TransitionController, TransitionSignal};
use tracing::debug;
use uuid::Uuid;

use super::events::{
    AchievementUnlocked, BeatShown, FloorEntered, GameOverScheduled, InterludeCompleted,
    InterludeLineRevealed, InterludeStarted, LogCollected, LowHealthWarning, MessagesDrained,
    MinigameCompleted, MinigameFailed, MissionCompleted, MissionEvent, MissionEventKind,
    MissionExited, MissionStarted, PauseChanged, StageChanged, StatsUpdated, TransitionCompleted,
    TransitionPhaseEntered, TransitionStarted,
};
use super::stage::{
    CommandOutcome, ExitReason, IgnoreReason, MessageFlow, MissionStatus, PauseSource, StageState,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MissionTimerKind {
    FloorIntroElapsed,
    ShowEntryBeats,
    FailureOverlayElapsed { restart: bool },
    GameOver,
}

/// Mission timers are scoped to the stage that scheduled them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct MissionTimer {
    stage_token: RunId,
    kind: MissionTimerKind,
}

#[derive(Debug, Clone, Copy)]
struct ActiveFlow {
    run_id: RunId,
    flow: MessageFlow,
    tier: PriorityTier,
}

#[derive(Debug, Clone, Copy)]
enum TimerSource {
    Mission,
    Messages,
    Interlude,
    Transition,
}

/// Own pause flag and the external overlay's flag, kept in sync.
#[derive(Debug, Default)]
struct PauseBridge {
    paused: bool,
    paused_at: Option<DateTime<Utc>>,
    tutorial_active: bool,
    external_paused: bool,
}

/// The aggregate root for one playthrough.
#[derive(Debug)]
pub struct Mission {
    /// Aggregate identifier.
    pub id: Uuid,
    /// Current version (published event count).
    pub(crate) version: i64,
    script: Arc<MissionScript>,
    status: MissionStatus,
    exit_reason: Option<ExitReason>,
    floor: FloorIndex,
    stage: StageState,
    stage_token: RunId,
    resources: ResourceState,
    floor_started_at: Option<DateTime<Utc>>,
    entry_shown_for: Option<FloorIndex>,
    destination: Option<FloorIndex>,
    low_health_warned: bool,
    game_over_pending: bool,
    active_flow: Option<ActiveFlow>,
    interlude_run: Option<RunId>,
    transition_run: Option<RunId>,
    pause: PauseBridge,
    timers: TimerQueue<MissionTimer>,
    messages: MessageQueue,
    interludes: InterludePlayer,
    transitions: TransitionController,
    achievements: AchievementEvaluator,
    correlation_id: Uuid,
    /// Uncommitted events pending publication.
    uncommitted_events: Vec<MissionEvent>,
}

impl Mission {
    /// Creates a mission that has not started yet.
    #[must_use]
    pub fn new(id: Uuid, script: Arc<MissionScript>) -> Self {
        let tuning = *script.tuning();
        let floor = script
            .first_floor()
            .map_or(FloorIndex(0), |first| first.index);
        let rules = AchievementRules {
            speed_threshold_ms: tuning.speed_threshold_ms,
            initial_health: tuning.initial_health,
            total_items: script.total_items(),
        };
        Self {
            id,
            version: 0,
            status: MissionStatus::NotStarted,
            exit_reason: None,
            floor,
            stage: StageState::FloorIntro,
            stage_token: RunId::new(),
            resources: ResourceState::new(tuning.initial_health),
            floor_started_at: None,
            entry_shown_for: None,
            destination: None,
            low_health_warned: false,
            game_over_pending: false,
            active_flow: None,
            interlude_run: None,
            transition_run: None,
            pause: PauseBridge::default(),
            timers: TimerQueue::new(),
            messages: MessageQueue::new(tuning.reveal),
            interludes: InterludePlayer::new(tuning.interlude),
            transitions: TransitionController::new(tuning.transition),
            achievements: AchievementEvaluator::new(rules),
            correlation_id: Uuid::nil(),
            uncommitted_events: Vec::new(),
            script,
        }
    }

    /// Returns the next sequence number for a new event.
    #[allow(clippy::cast_possible_wrap)]
    fn next_sequence_number(&self) -> i64 {
        self.version + self.uncommitted_events.len() as i64 + 1
    }

    fn record(&mut self, kind: MissionEventKind, at: DateTime<Utc>) {
        let event = MissionEvent {
            metadata: EventMetadata {
                event_id: Uuid::new_v4(),
                event_type: kind.event_type().to_owned(),
                aggregate_id: self.id,
                sequence_number: self.next_sequence_number(),
                correlation_id: self.correlation_id,
                causation_id: self.correlation_id,
                occurred_at: at,
            },
            kind,
        };
        self.uncommitted_events.push(event);
    }

    fn ensure_started(&self) -> Result<(), DomainError> {
        if self.status == MissionStatus::NotStarted {
            return Err(DomainError::Validation(format!(
                "mission {} has not been started",
                self.id
            )));
        }
        Ok(())
    }

    // ── Commands ────────────────────────────────────────────────────────

    /// Starts the mission on its first floor.
    ///
    /// The mission intro beats are presented first; the floor intro timer is
    /// armed once they drain.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` if the mission was already started.
    pub fn start(
        &mut self,
        show_tutorial: bool,
        correlation_id: Uuid,
        clock: &dyn Clock,
    ) -> Result<CommandOutcome, DomainError> {
        if self.status != MissionStatus::NotStarted {
            return Err(DomainError::Validation(format!(
                "mission {} has already been started",
                self.id
            )));
        }
        let now = clock.now();
        self.correlation_id = correlation_id;
        self.status = MissionStatus::Running;
        self.pause.tutorial_active = show_tutorial;

        self.record(
            MissionEventKind::MissionStarted(MissionStarted {
                mission_id: self.id,
                first_floor: self.floor,
                floor_count: self.script.floor_count(),
                total_items: self.script.total_items(),
                script_digest: self.script.digest().to_owned(),
            }),
            now,
        );
        self.record_stats(now);

        let intro = Arc::clone(self.script.mission_intro());
        self.present_flow(MessageFlow::MissionIntro, &intro, now);
        Ok(CommandOutcome::Applied)
    }

    /// Handles the minigame's completion signal for `floor`.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` if the mission was never started.
    pub fn complete_minigame(
        &mut self,
        floor: FloorIndex,
        correlation_id: Uuid,
        clock: &dyn Clock,
    ) -> Result<CommandOutcome, DomainError> {
        self.ensure_started()?;
        let now = clock.now();
        self.correlation_id = correlation_id;
        if let Err(reason) = self.accept_minigame_signal(floor) {
            debug!(%floor, ?reason, "minigame completion ignored");
            return Ok(CommandOutcome::Ignored(reason));
        }

        let script = Arc::clone(&self.script);
        let elapsed = self.floor_started_at.map(|started| elapsed_ms(started, now));
        self.record(
            MissionEventKind::MinigameCompleted(MinigameCompleted {
                floor,
                elapsed_ms: elapsed,
            }),
            now,
        );

        let heal = script.floor(floor).map_or(0, |f| f.recovery_heal);
        if heal > 0 {
            let before = self.resources.health();
            if self.resources.heal(heal) != before {
                self.record_stats(now);
            }
        }
        self.evaluate_achievements(Trigger::FloorComplete, elapsed, now);

        if script.is_terminal(floor) {
            self.bump_corruption(now);
            self.finish_mission(now);
            return Ok(CommandOutcome::Applied);
        }

        self.enter_stage(StageState::CompletionMessages, now);
        if let Some(completion) = script.floor(floor).map(|f| &f.completion_beats) {
            self.present_flow(MessageFlow::Completion, completion, now);
        } else {
            self.leave_floor(now);
        }
        Ok(CommandOutcome::Applied)
    }

    /// Handles the minigame's failure signal for `floor`.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` if the mission was never started.
    pub fn fail_minigame(
        &mut self,
        floor: FloorIndex,
        correlation_id: Uuid,
        clock: &dyn Clock,
    ) -> Result<CommandOutcome, DomainError> {
        self.ensure_started()?;
        let now = clock.now();
        self.correlation_id = correlation_id;
        if let Err(reason) = self.accept_minigame_signal(floor) {
            debug!(%floor, ?reason, "minigame failure ignored");
            return Ok(CommandOutcome::Ignored(reason));
        }

        let tuning = *self.script.tuning();
        let policy = self
            .script
            .floor(floor)
            .map_or(FailurePolicy::Penalize, |f| f.failure_policy);

        if policy == FailurePolicy::Restart {
            self.record(
                MissionEventKind::MinigameFailed(MinigameFailed {
                    floor,
                    policy,
                    health_lost: 0,
                }),
                now,
            );
            self.enter_stage(StageState::FloorFailure, now);
            self.schedule(
                MissionTimerKind::FailureOverlayElapsed { restart: true },
                tuning.failure_overlay_ms,
                now,
            );
            return Ok(CommandOutcome::Applied);
        }

        let before = self.resources.health();
        let after = self.resources.damage(tuning.failure_penalty);
        self.record(
            MissionEventKind::MinigameFailed(MinigameFailed {
                floor,
                policy,
                health_lost: before - after,
            }),
            now,
        );
        self.record_stats(now);
        self.enter_stage(StageState::FloorFailure, now);

        if self.resources.is_depleted() {
            self.game_over_pending = true;
            self.schedule(MissionTimerKind::GameOver, tuning.game_over_delay_ms, now);
            self.record(
                MissionEventKind::GameOverScheduled(GameOverScheduled {
                    floor,
                    delay_ms: tuning.game_over_delay_ms,
                }),
                now,
            );
            return Ok(CommandOutcome::Applied);
        }

        self.schedule(
            MissionTimerKind::FailureOverlayElapsed { restart: false },
            tuning.failure_overlay_ms,
            now,
        );
        if after <= tuning.low_health_threshold && !self.low_health_warned {
            self.low_health_warned = true;
            self.record(
                MissionEventKind::LowHealthWarning(LowHealthWarning { health: after }),
                now,
            );
            let warning = Arc::clone(self.script.low_health_warning());
            self.present_flow(MessageFlow::Warning, &warning, now);
        }
        Ok(CommandOutcome::Applied)
    }

    /// Records a collected log. Collecting the same log twice is a no-op.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` if the mission was never started.
    pub fn collect_log(
        &mut self,
        floor: FloorIndex,
        item_id: ItemId,
        correlation_id: Uuid,
        clock: &dyn Clock,
    ) -> Result<CommandOutcome, DomainError> {
        self.ensure_started()?;
        let now = clock.now();
        self.correlation_id = correlation_id;

        let ignored = if self.status != MissionStatus::Running {
            Some(IgnoreReason::NotRunning)
        } else if self.pause.paused {
            Some(IgnoreReason::Paused)
        } else if floor != self.floor {
            Some(IgnoreReason::StaleFloor)
        } else if self.stage != StageState::Gameplay {
            Some(IgnoreReason::WrongStage)
        } else if !self
            .script
            .floor(floor)
            .is_some_and(|f| f.items.contains(&item_id))
        {
            Some(IgnoreReason::UnknownItem)
        } else {
            None
        };
        if let Some(reason) = ignored {
            debug!(%floor, %item_id, ?reason, "log collection ignored");
            return Ok(CommandOutcome::Ignored(reason));
        }

        if !self.resources.collect(item_id.clone()) {
            return Ok(CommandOutcome::Ignored(IgnoreReason::AlreadyCollected));
        }
        self.record(
            MissionEventKind::LogCollected(LogCollected { floor, item_id }),
            now,
        );
        self.record_stats(now);
        Ok(CommandOutcome::Applied)
    }

    /// Dismisses the beat on screen once it is fully revealed.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` if the mission was never started.
    pub fn advance_message(
        &mut self,
        correlation_id: Uuid,
        clock: &dyn Clock,
    ) -> Result<CommandOutcome, DomainError> {
        self.ensure_started()?;
        let now = clock.now();
        self.correlation_id = correlation_id;
        if let Some(reason) = self.interaction_blocked() {
            return Ok(CommandOutcome::Ignored(reason));
        }

        let (outcome, signals) = self.messages.advance(now);
        self.handle_queue_signals(signals, now);
        Ok(match outcome {
            AdvanceOutcome::Dismissed => CommandOutcome::Applied,
            AdvanceOutcome::RejectedWhileTyping => {
                CommandOutcome::Ignored(IgnoreReason::BeatStillTyping)
            }
            AdvanceOutcome::Idle => CommandOutcome::Ignored(IgnoreReason::NoActiveMessage),
        })
    }

    /// Skips the playing interlude.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` if the mission was never started.
    pub fn skip_interlude(
        &mut self,
        correlation_id: Uuid,
        clock: &dyn Clock,
    ) -> Result<CommandOutcome, DomainError> {
        self.ensure_started()?;
        let now = clock.now();
        self.correlation_id = correlation_id;
        if let Some(reason) = self.interaction_blocked() {
            return Ok(CommandOutcome::Ignored(reason));
        }
        if self.stage != StageState::Cutscene {
            return Ok(CommandOutcome::Ignored(IgnoreReason::WrongStage));
        }

        let signals = self.interludes.skip();
        self.handle_interlude_signals(signals, now, true);
        Ok(CommandOutcome::Applied)
    }

    /// Skips the running transition.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` if the mission was never started.
    pub fn skip_transition(
        &mut self,
        correlation_id: Uuid,
        clock: &dyn Clock,
    ) -> Result<CommandOutcome, DomainError> {
        self.ensure_started()?;
        let now = clock.now();
        self.correlation_id = correlation_id;
        if let Some(reason) = self.interaction_blocked() {
            return Ok(CommandOutcome::Ignored(reason));
        }
        if self.stage != StageState::Transitioning {
            return Ok(CommandOutcome::Ignored(IgnoreReason::WrongStage));
        }

        let signals = self.transitions.skip();
        self.handle_transition_signals(signals, now, true);
        Ok(CommandOutcome::Applied)
    }

    /// Toggles the mission's own pause flag.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` if the mission was never started.
    pub fn toggle_pause(
        &mut self,
        correlation_id: Uuid,
        clock: &dyn Clock,
    ) -> Result<CommandOutcome, DomainError> {
        self.ensure_started()?;
        let now = clock.now();
        self.correlation_id = correlation_id;
        if self.status != MissionStatus::Running {
            return Ok(CommandOutcome::Ignored(IgnoreReason::NotRunning));
        }
        Ok(self.set_paused(!self.pause.paused, PauseSource::Player, now))
    }

    /// Mirrors the external pause overlay into the pause flag, unless the
    /// first-run tutorial is shown. The value is remembered either way.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` if the mission was never started.
    pub fn set_external_pause(
        &mut self,
        paused: bool,
        correlation_id: Uuid,
        clock: &dyn Clock,
    ) -> Result<CommandOutcome, DomainError> {
        self.ensure_started()?;
        let now = clock.now();
        self.correlation_id = correlation_id;
        self.pause.external_paused = paused;
        if self.status != MissionStatus::Running {
            return Ok(CommandOutcome::Ignored(IgnoreReason::NotRunning));
        }
        if self.pause.tutorial_active {
            return Ok(CommandOutcome::Ignored(IgnoreReason::SuppressedByTutorial));
        }
        Ok(self.set_paused(paused, PauseSource::External, now))
    }

    /// Dismisses the first-run tutorial and applies the last external pause
    /// value.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` if the mission was never started.
    pub fn dismiss_tutorial(
        &mut self,
        correlation_id: Uuid,
        clock: &dyn Clock,
    ) -> Result<CommandOutcome, DomainError> {
        self.ensure_started()?;
        let now = clock.now();
        self.correlation_id = correlation_id;
        if self.status != MissionStatus::Running {
            return Ok(CommandOutcome::Ignored(IgnoreReason::NotRunning));
        }
        if !self.pause.tutorial_active {
            return Ok(CommandOutcome::Ignored(IgnoreReason::NoTutorial));
        }
        self.pause.tutorial_active = false;
        let external = self.pause.external_paused;
        self.set_paused(external, PauseSource::TutorialDismissed, now);
        Ok(CommandOutcome::Applied)
    }

    /// Leaves the mission immediately.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` if the mission was never started.
    pub fn abort(
        &mut self,
        correlation_id: Uuid,
        clock: &dyn Clock,
    ) -> Result<CommandOutcome, DomainError> {
        self.ensure_started()?;
        let now = clock.now();
        self.correlation_id = correlation_id;
        if self.status != MissionStatus::Running {
            return Ok(CommandOutcome::Ignored(IgnoreReason::NotRunning));
        }
        self.exit(ExitReason::Aborted, now);
        Ok(CommandOutcome::Applied)
    }

    /// Fires every timer due at the current time, earliest first, across the
    /// mission and its components. Each timer is handled at its own deadline.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` if the mission was never started.
    pub fn tick(
        &mut self,
        correlation_id: Uuid,
        clock: &dyn Clock,
    ) -> Result<CommandOutcome, DomainError> {
        self.ensure_started()?;
        let now = clock.now();
        self.correlation_id = correlation_id;
        if self.status != MissionStatus::Running {
            return Ok(CommandOutcome::Ignored(IgnoreReason::NotRunning));
        }
        if self.pause.paused {
            return Ok(CommandOutcome::Ignored(IgnoreReason::Paused));
        }

        let mut fired = 0_usize;
        while self.status == MissionStatus::Running {
            let Some((source, deadline)) = self.earliest_timer() else {
                break;
            };
            if deadline > now {
                break;
            }
            fired += 1;
            self.fire(source, deadline);
        }

        Ok(if fired == 0 {
            CommandOutcome::Ignored(IgnoreReason::NothingDue)
        } else {
            CommandOutcome::Applied
        })
    }

    // ── Queries ─────────────────────────────────────────────────────────

    /// Lifecycle status.
    #[must_use]
    pub fn status(&self) -> MissionStatus {
        self.status
    }

    /// Why the mission was exited, if it was.
    #[must_use]
    pub fn exit_reason(&self) -> Option<ExitReason> {
        self.exit_reason
    }

    /// Current floor.
    #[must_use]
    pub fn floor(&self) -> FloorIndex {
        self.floor
    }

    /// Current stage.
    #[must_use]
    pub fn stage(&self) -> StageState {
        self.stage
    }

    /// The script being played.
    #[must_use]
    pub fn script(&self) -> &MissionScript {
        &self.script
    }

    /// Resource meters.
    #[must_use]
    pub fn resources(&self) -> &ResourceState {
        &self.resources
    }

    /// Meter snapshot for the heads-up display.
    #[must_use]
    pub fn stats(&self) -> StatsSnapshot {
        self.resources.snapshot(self.floor)
    }

    /// When gameplay first started on the current floor during this visit.
    #[must_use]
    pub fn floor_started_at(&self) -> Option<DateTime<Utc>> {
        self.floor_started_at
    }

    /// Achievements unlocked so far, in unlock order.
    #[must_use]
    pub fn unlocked_achievements(&self) -> &[AchievementId] {
        self.achievements.unlocked()
    }

    /// Whether the pause flag is set.
    #[must_use]
    pub fn is_paused(&self) -> bool {
        self.pause.paused
    }

    /// Whether the first-run tutorial is shown.
    #[must_use]
    pub fn is_tutorial_active(&self) -> bool {
        self.pause.tutorial_active
    }

    /// Whether a game-over exit is scheduled.
    #[must_use]
    pub fn is_game_over_pending(&self) -> bool {
        self.game_over_pending
    }

    /// Whether a cinematic beat or an interlude holds the screen.
    #[must_use]
    pub fn is_modal(&self) -> bool {
        self.messages.is_modal() || self.interludes.is_playing()
    }

    /// Flow of the message run on screen.
    #[must_use]
    pub fn active_flow(&self) -> Option<MessageFlow> {
        self.active_flow.map(|active| active.flow)
    }

    /// The beat on screen.
    #[must_use]
    pub fn current_beat(&self) -> Option<&MessageBeat> {
        self.messages.current_beat()
    }

    /// Lifecycle stage of the beat on screen.
    #[must_use]
    pub fn message_stage(&self) -> Option<BeatStage> {
        self.messages.stage()
    }

    /// Visible part of the beat on screen at `now`.
    #[must_use]
    pub fn revealed_text(&self, now: DateTime<Utc>) -> Option<&str> {
        self.messages.revealed_text(now)
    }

    /// Interlude lines revealed so far.
    #[must_use]
    pub fn interlude_lines(&self) -> &[String] {
        self.interludes.visible_lines()
    }

    /// Floor highlighted on the descent indicator at `now`.
    #[must_use]
    pub fn highlighted_floor(&self, now: DateTime<Utc>) -> Option<FloorIndex> {
        self.transitions.highlighted_floor(now)
    }

    /// Descent progress of the running transition, never decreasing.
    pub fn transition_progress(&mut self, now: DateTime<Utc>) -> Option<u8> {
        self.transitions
            .active_run()
            .is_some()
            .then(|| self.transitions.progress_percent(now))
    }

    /// Earliest pending deadline. `None` while paused or not running, since
    /// nothing can fire then.
    #[must_use]
    pub fn next_deadline(&self) -> Option<DateTime<Utc>> {
        if self.status != MissionStatus::Running || self.pause.paused {
            return None;
        }
        self.earliest_timer().map(|(_, deadline)| deadline)
    }

    // ── Stage machine ───────────────────────────────────────────────────

    fn accept_minigame_signal(&self, floor: FloorIndex) -> Result<(), IgnoreReason> {
        if self.status != MissionStatus::Running {
            return Err(IgnoreReason::NotRunning);
        }
        if self.pause.paused {
            return Err(IgnoreReason::Paused);
        }
        if self.game_over_pending {
            return Err(IgnoreReason::GameOverPending);
        }
        if floor != self.floor {
            return Err(IgnoreReason::StaleFloor);
        }
        if self.stage != StageState::Gameplay {
            return Err(IgnoreReason::WrongStage);
        }
        if self.is_modal() {
            return Err(IgnoreReason::BlockedByCinematic);
        }
        Ok(())
    }

    fn interaction_blocked(&self) -> Option<IgnoreReason> {
        if self.status != MissionStatus::Running {
            Some(IgnoreReason::NotRunning)
        } else if self.pause.paused {
            Some(IgnoreReason::Paused)
        } else {
            None
        }
    }

    /// Switches stage. Pending mission timers belong to the old stage and are
    /// dropped; leaving gameplay also supersedes an entry flow in progress.
    fn enter_stage(&mut self, to: StageState, now: DateTime<Utc>) {
        let from = self.stage;
        if from == StageState::Gameplay && to != StageState::Gameplay {
            self.supersede_entry_flow();
        }
        self.stage = to;
        self.stage_token = RunId::new();
        self.timers.clear();
        self.record(
            MissionEventKind::StageChanged(StageChanged {
                floor: self.floor,
                from,
                to,
            }),
            now,
        );
    }

    fn enter_gameplay(&mut self, now: DateTime<Utc>) {
        self.enter_stage(StageState::Gameplay, now);
        if self.floor_started_at.is_none() {
            self.floor_started_at = Some(now);
        }
        if self.entry_shown_for != Some(self.floor) {
            let delay = self.script.tuning().entry_beat_delay_ms;
            self.schedule(MissionTimerKind::ShowEntryBeats, delay, now);
        }
    }

    fn schedule(&mut self, kind: MissionTimerKind, delay_ms: u64, now: DateTime<Utc>) {
        let timer = MissionTimer {
            stage_token: self.stage_token,
            kind,
        };
        self.timers.schedule_after(now, millis(delay_ms), timer);
    }

    /// Completion beats drained: corruption first, then the cutscene or the
    /// transition towards the next floor.
    fn leave_floor(&mut self, now: DateTime<Utc>) {
        self.bump_corruption(now);

        let script = Arc::clone(&self.script);
        let Some(next) = script.next_floor(self.floor) else {
            self.finish_mission(now);
            return;
        };
        self.destination = Some(next.index);

        match &next.interlude {
            Some(interlude) => {
                self.enter_stage(StageState::Cutscene, now);
                let (run_id, signals) = self.interludes.play(interlude, now);
                self.interlude_run = Some(run_id);
                self.record(
                    MissionEventKind::InterludeStarted(InterludeStarted {
                        run_id,
                        destination: next.index,
                        theme: interlude.theme.clone(),
                        line_count: interlude.lines.len(),
                    }),
                    now,
                );
                self.handle_interlude_signals(signals, now, false);
            }
            None => self.start_transition(next.index, now),
        }
    }

    fn start_transition(&mut self, to: FloorIndex, now: DateTime<Utc>) {
        self.enter_stage(StageState::Transitioning, now);
        let from = self.floor;
        let (run_id, signals) = self.transitions.start(from, to, now);
        self.transition_run = Some(run_id);
        self.record(
            MissionEventKind::TransitionStarted(TransitionStarted { run_id, from, to }),
            now,
        );
        self.handle_transition_signals(signals, now, false);
    }

    /// Arrival on a new floor. The entry marker and the floor start time
    /// belong to the previous floor and are cleared here.
    fn arrive(&mut self, to: FloorIndex, now: DateTime<Utc>) {
        self.floor = to;
        self.destination = None;
        self.entry_shown_for = None;
        self.floor_started_at = None;

        let name = self
            .script
            .floor(to)
            .map(|f| f.name.clone())
            .unwrap_or_default();
        self.record(
            MissionEventKind::FloorEntered(FloorEntered { floor: to, name }),
            now,
        );
        self.record_stats(now);

        self.enter_stage(StageState::FloorIntro, now);
        let delay = self.script.tuning().floor_intro_ms;
        self.schedule(MissionTimerKind::FloorIntroElapsed, delay, now);
    }

    fn finish_mission(&mut self, now: DateTime<Utc>) {
        self.evaluate_achievements(Trigger::MissionComplete, None, now);
        self.teardown();
        self.status = MissionStatus::Completed;
        self.record(
            MissionEventKind::MissionCompleted(MissionCompleted {
                unlocked_achievements: self.achievements.unlocked().to_vec(),
                stats: self.stats(),
            }),
            now,
        );
    }

    fn exit(&mut self, reason: ExitReason, now: DateTime<Utc>) {
        self.teardown();
        self.status = MissionStatus::Exited;
        self.exit_reason = Some(reason);
        self.record(
            MissionEventKind::MissionExited(MissionExited {
                reason,
                stats: self.stats(),
            }),
            now,
        );
    }

    fn teardown(&mut self) {
        self.timers.clear();
        self.messages.cancel();
        self.interludes.cancel();
        self.transitions.cancel();
        self.active_flow = None;
        self.interlude_run = None;
        self.transition_run = None;
        self.destination = None;
    }

    // ── Resources and achievements ──────────────────────────────────────

    fn record_stats(&mut self, now: DateTime<Utc>) {
        let stats = self.stats();
        self.record(MissionEventKind::StatsUpdated(StatsUpdated { stats }), now);
    }

    fn bump_corruption(&mut self, now: DateTime<Utc>) {
        let increment = self.script.corruption_increment();
        let before = self.resources.corruption();
        if self.resources.corrupt(increment) != before {
            self.record_stats(now);
        }
    }

    fn evaluate_achievements(
        &mut self,
        trigger: Trigger,
        floor_elapsed_ms: Option<u64>,
        now: DateTime<Utc>,
    ) {
        let unlocked = self
            .achievements
            .evaluate(trigger, &self.resources, floor_elapsed_ms);
        for achievement_id in unlocked {
            let title = self
                .achievements
                .definition(achievement_id.as_str())
                .map_or_else(|| achievement_id.to_string(), |d| d.title.to_owned());
            self.record(
                MissionEventKind::AchievementUnlocked(AchievementUnlocked {
                    achievement_id,
                    title,
                    trigger,
                }),
                now,
            );
        }
    }

    // ── Message slot ────────────────────────────────────────────────────

    /// Presents `beats` as `flow` in the single message slot. A flow that
    /// gates progression always takes the slot; any other flow takes it only
    /// if its tier is at least the tier of the flow on screen.
    fn present_flow(&mut self, flow: MessageFlow, beats: &BeatList, now: DateTime<Utc>) {
        let tier = if flow.gates_progression() {
            PriorityTier::Critical
        } else {
            flow_tier(beats)
        };
        if let Some(active) = self.active_flow
            && tier < active.tier
        {
            debug!(?flow, active = ?active.flow, "message flow dropped for lower priority");
            return;
        }

        let (run_id, signals) = self.messages.present(beats, now);
        self.active_flow = Some(ActiveFlow { run_id, flow, tier });
        self.handle_queue_signals(signals, now);
    }

    fn supersede_entry_flow(&mut self) {
        if self
            .active_flow
            .is_some_and(|active| active.flow == MessageFlow::Entry)
        {
            self.messages.cancel();
            self.active_flow = None;
        }
    }

    fn handle_queue_signals(&mut self, signals: Vec<QueueSignal>, now: DateTime<Utc>) {
        for signal in signals {
            match signal {
                QueueSignal::BeatShown {
                    run_id,
                    index,
                    beat,
                } => {
                    let Some(active) = self.active_flow.filter(|a| a.run_id == run_id) else {
                        continue;
                    };
                    self.record(
                        MissionEventKind::BeatShown(BeatShown {
                            run_id,
                            flow: active.flow,
                            index,
                            beat,
                        }),
                        now,
                    );
                }
                QueueSignal::Drained { run_id } => {
                    // Capture the flow before the slot is cleared.
                    let Some(active) = self.active_flow.filter(|a| a.run_id == run_id) else {
                        debug!(%run_id, "drained signal from a superseded run discarded");
                        continue;
                    };
                    self.active_flow = None;
                    self.record(
                        MissionEventKind::MessagesDrained(MessagesDrained {
                            run_id,
                            flow: active.flow,
                        }),
                        now,
                    );
                    self.on_flow_drained(active.flow, now);
                }
            }
        }
    }

    fn on_flow_drained(&mut self, flow: MessageFlow, now: DateTime<Utc>) {
        match flow {
            MessageFlow::MissionIntro => {
                if self.stage == StageState::FloorIntro {
                    let delay = self.script.tuning().floor_intro_ms;
                    self.schedule(MissionTimerKind::FloorIntroElapsed, delay, now);
                }
            }
            MessageFlow::Completion => {
                if self.stage == StageState::CompletionMessages {
                    self.leave_floor(now);
                }
            }
            MessageFlow::Entry | MessageFlow::Warning => {}
        }
    }

    // ── Component signals ───────────────────────────────────────────────

    fn handle_interlude_signals(
        &mut self,
        signals: Vec<InterludeSignal>,
        now: DateTime<Utc>,
        skipped: bool,
    ) {
        for signal in signals {
            match signal {
                InterludeSignal::LineRevealed { run_id, index } => {
                    if self.interlude_run != Some(run_id) {
                        continue;
                    }
                    let line = self
                        .interludes
                        .visible_lines()
                        .get(index)
                        .cloned()
                        .unwrap_or_default();
                    self.record(
                        MissionEventKind::InterludeLineRevealed(InterludeLineRevealed {
                            run_id,
                            index,
                            line,
                        }),
                        now,
                    );
                }
                InterludeSignal::Completed { run_id } => {
                    if self.interlude_run != Some(run_id) {
                        continue;
                    }
                    self.interlude_run = None;
                    self.record(
                        MissionEventKind::InterludeCompleted(InterludeCompleted {
                            run_id,
                            skipped,
                        }),
                        now,
                    );
                    if self.stage == StageState::Cutscene
                        && let Some(to) = self.destination
                    {
                        self.start_transition(to, now);
                    }
                }
            }
        }
    }

    fn handle_transition_signals(
        &mut self,
        signals: Vec<TransitionSignal>,
        now: DateTime<Utc>,
        skipped: bool,
    ) {
        for signal in signals {
            match signal {
                TransitionSignal::PhaseEntered { run_id, phase } => {
                    if self.transition_run != Some(run_id) {
                        continue;
                    }
                    self.record(
                        MissionEventKind::TransitionPhaseEntered(TransitionPhaseEntered {
                            run_id,
                            phase,
                        }),
                        now,
                    );
                }
                TransitionSignal::Completed { run_id, to, .. } => {
                    if self.transition_run != Some(run_id) {
                        continue;
                    }
                    self.transition_run = None;
                    self.record(
                        MissionEventKind::TransitionCompleted(TransitionCompleted {
                            run_id,
                            skipped,
                        }),
                        now,
                    );
                    if self.stage == StageState::Transitioning {
                        self.arrive(to, now);
                    }
                }
            }
        }
    }

    // ── Timers ──────────────────────────────────────────────────────────

    fn earliest_timer(&self) -> Option<(TimerSource, DateTime<Utc>)> {
        [
            (TimerSource::Mission, self.timers.next_deadline()),
            (TimerSource::Messages, self.messages.next_deadline()),
            (TimerSource::Interlude, self.interludes.next_deadline()),
            (TimerSource::Transition, self.transitions.next_deadline()),
        ]
        .into_iter()
        .filter_map(|(source, deadline)| deadline.map(|deadline| (source, deadline)))
        .min_by_key(|(_, deadline)| *deadline)
    }

    fn fire(&mut self, source: TimerSource, at: DateTime<Utc>) {
        match source {
            TimerSource::Mission => {
                if let Some(timer) = self.timers.pop_due(at) {
                    self.fire_mission_timer(timer.key, at);
                }
            }
            TimerSource::Messages => {
                let signals = self.messages.poll_due(at);
                self.handle_queue_signals(signals, at);
            }
            TimerSource::Interlude => {
                let signals = self.interludes.poll_due(at);
                self.handle_interlude_signals(signals, at, false);
            }
            TimerSource::Transition => {
                let signals = self.transitions.poll_due(at);
                self.handle_transition_signals(signals, at, false);
            }
        }
    }

    fn fire_mission_timer(&mut self, timer: MissionTimer, at: DateTime<Utc>) {
        if timer.stage_token != self.stage_token {
            debug!(kind = ?timer.kind, "stale mission timer discarded");
            return;
        }
        debug!(kind = ?timer.kind, stage = %self.stage, "mission timer fired");
        match timer.kind {
            MissionTimerKind::FloorIntroElapsed => {
                if self.stage == StageState::FloorIntro {
                    self.enter_gameplay(at);
                }
            }
            MissionTimerKind::ShowEntryBeats => {
                if self.stage == StageState::Gameplay && self.entry_shown_for != Some(self.floor)
                {
                    self.entry_shown_for = Some(self.floor);
                    let entry = self
                        .script
                        .floor(self.floor)
                        .map(|f| Arc::clone(&f.entry_beats));
                    if let Some(entry) = entry.filter(|beats| !beats.is_empty()) {
                        self.present_flow(MessageFlow::Entry, &entry, at);
                    }
                }
            }
            MissionTimerKind::FailureOverlayElapsed { restart } => {
                if self.stage != StageState::FloorFailure {
                    return;
                }
                if restart {
                    self.enter_stage(StageState::FloorIntro, at);
                    let delay = self.script.tuning().floor_intro_ms;
                    self.schedule(MissionTimerKind::FloorIntroElapsed, delay, at);
                } else {
                    self.enter_gameplay(at);
                }
            }
            MissionTimerKind::GameOver => self.exit(ExitReason::HealthDepleted, at),
        }
    }

    // ── Pause ───────────────────────────────────────────────────────────

    /// Sets the pause flag. Resuming postpones every pending deadline and the
    /// floor start time by the paused duration.
    fn set_paused(
        &mut self,
        paused: bool,
        source: PauseSource,
        now: DateTime<Utc>,
    ) -> CommandOutcome {
        if self.pause.paused == paused {
            return CommandOutcome::Ignored(IgnoreReason::Unchanged);
        }
        if paused {
            self.pause.paused_at = Some(now);
        } else if let Some(since) = self.pause.paused_at.take() {
            let paused_for = now - since;
            if paused_for > Duration::zero() {
                self.shift_all(paused_for);
            }
        }
        self.pause.paused = paused;
        self.record(
            MissionEventKind::PauseChanged(PauseChanged { paused, source }),
            now,
        );
        CommandOutcome::Applied
    }

    fn shift_all(&mut self, by: Duration) {
        self.timers.shift(by);
        self.messages.shift(by);
        self.interludes.shift(by);
        self.transitions.shift(by);
        if let Some(started) = self.floor_started_at.as_mut() {
            *started += by;
        }
    }
}

impl AggregateRoot for Mission {
    type Event = MissionEvent;

    fn aggregate_id(&self) -> Uuid {
        self.id
    }

    fn version(&self) -> i64 {
        self.version
    }

    fn uncommitted_events(&self) -> &[Self::Event] {
        &self.uncommitted_events
    }

    #[allow(clippy::cast_possible_wrap)]
    fn clear_uncommitted_events(&mut self) {
        self.version += self.uncommitted_events.len() as i64;
        self.uncommitted_events.clear();
    }
}

#[cfg(test)]
mod tests {
    use descent_core::event::DomainEvent;
    use descent_test_support::{ManualClock, t0};

    use super::*;

    const SCRIPT: &str = r"
tuning:
  floor_intro_ms: 1000
  entry_beat_delay_ms: 100
  failure_overlay_ms: 500
  game_over_delay_ms: 1000
  speed_threshold_ms: 5000
  reveal:
    char_interval_ms: 10
  interlude:
    stagger_ms: 100
    trailing_ms: 200
  transition:
    descent_ms: 300
    arrival_ms: 100
    doors_ms: 100
mission_intro:
  - id: intro
    speaker: Handler
    text: Go.
    reveal_duration_ms: 100
items:
  - id: log_a
    title: A
floors:
  - index: 2
    name: Top
    theme: dust
    items: [log_a]
    entry_beats:
      - id: top_entry
        speaker: Handler
        text: Hi.
        reveal_duration_ms: 100
    completion_beats:
      - id: top_done
        speaker: Handler
        text: Bye.
        reveal_duration_ms: 100
  - index: 0
    name: Bottom
    theme: void
";

    fn mission() -> Mission {
        let script = MissionScript::from_yaml(SCRIPT).unwrap();
        Mission::new(Uuid::new_v4(), Arc::new(script))
    }

    fn tick_at(mission: &mut Mission, clock: &ManualClock, ms: i64) -> CommandOutcome {
        clock.set(t0() + Duration::milliseconds(ms));
        mission.tick(Uuid::new_v4(), clock).unwrap()
    }

    fn event_types(mission: &Mission) -> Vec<&'static str> {
        mission
            .uncommitted_events()
            .iter()
            .map(DomainEvent::event_type)
            .collect()
    }

    fn entry_beats_shown(mission: &Mission) -> usize {
        mission
            .uncommitted_events()
            .iter()
            .filter(|event| {
                matches!(
                    &event.kind,
                    MissionEventKind::BeatShown(shown) if shown.flow == MessageFlow::Entry
                )
            })
            .count()
    }

    #[test]
    fn test_start_records_started_stats_and_first_intro_beat() {
        // Arrange
        let clock = ManualClock::starting_at_t0();
        let mut mission = mission();
        let correlation_id = Uuid::new_v4();

        // Act
        let outcome = mission.start(false, correlation_id, &clock).unwrap();

        // Assert
        assert_eq!(outcome, CommandOutcome::Applied);
        assert_eq!(
            event_types(&mission),
            vec!["mission.started", "mission.stats_updated", "mission.beat_shown"]
        );
        let first = &mission.uncommitted_events()[0];
        assert_eq!(first.metadata.correlation_id, correlation_id);
        assert_eq!(first.metadata.sequence_number, 1);
        assert_eq!(first.metadata.occurred_at, t0());
        assert_eq!(mission.status(), MissionStatus::Running);
        assert_eq!(mission.floor(), FloorIndex(2));
        assert_eq!(mission.active_flow(), Some(MessageFlow::MissionIntro));
    }

    #[test]
    fn test_start_twice_is_rejected() {
        let clock = ManualClock::starting_at_t0();
        let mut mission = mission();
        mission.start(false, Uuid::new_v4(), &clock).unwrap();

        let result = mission.start(false, Uuid::new_v4(), &clock);

        assert!(matches!(result, Err(DomainError::Validation(_))));
    }

    #[test]
    fn test_commands_before_start_are_rejected() {
        let clock = ManualClock::starting_at_t0();
        let mut mission = mission();

        let result = mission.complete_minigame(FloorIndex(2), Uuid::new_v4(), &clock);

        assert!(matches!(result, Err(DomainError::Validation(_))));
        assert!(mission.uncommitted_events().is_empty());
    }

    #[test]
    fn test_floor_intro_timer_is_armed_when_mission_intro_drains() {
        // Arrange
        let clock = ManualClock::starting_at_t0();
        let mut mission = mission();
        mission.start(false, Uuid::new_v4(), &clock).unwrap();

        // Act: "Go." reveals by 30 ms and auto-dismisses at 130 ms.
        tick_at(&mut mission, &clock, 1_000);
        let stage_at_1000 = mission.stage();
        tick_at(&mut mission, &clock, 1_130);

        // Assert
        assert_eq!(stage_at_1000, StageState::FloorIntro);
        assert_eq!(mission.stage(), StageState::Gameplay);
        assert_eq!(
            mission.floor_started_at(),
            Some(t0() + Duration::milliseconds(1_130))
        );
    }

    #[test]
    fn test_minigame_signal_is_ignored_outside_gameplay_and_for_other_floors() {
        // Arrange
        let clock = ManualClock::starting_at_t0();
        let mut mission = mission();
        mission.start(false, Uuid::new_v4(), &clock).unwrap();

        // Act
        let during_intro = mission
            .fail_minigame(FloorIndex(2), Uuid::new_v4(), &clock)
            .unwrap();
        tick_at(&mut mission, &clock, 1_130);
        let other_floor = mission
            .fail_minigame(FloorIndex(0), Uuid::new_v4(), &clock)
            .unwrap();

        // Assert
        assert_eq!(
            during_intro,
            CommandOutcome::Ignored(IgnoreReason::WrongStage)
        );
        assert_eq!(
            other_floor,
            CommandOutcome::Ignored(IgnoreReason::StaleFloor)
        );
        assert_eq!(mission.resources().health(), 100);
    }

    #[test]
    fn test_entry_beats_show_once_per_floor_visit() {
        // Arrange
        let clock = ManualClock::starting_at_t0();
        let mut mission = mission();
        mission.start(false, Uuid::new_v4(), &clock).unwrap();
        tick_at(&mut mission, &clock, 1_130);

        // Act: fail before the deferred entry beat, retry, let it show, fail again.
        clock.set(t0() + Duration::milliseconds(1_150));
        mission
            .fail_minigame(FloorIndex(2), Uuid::new_v4(), &clock)
            .unwrap();
        tick_at(&mut mission, &clock, 1_300);
        let shown_before_retry = entry_beats_shown(&mission);
        tick_at(&mut mission, &clock, 1_650);
        tick_at(&mut mission, &clock, 1_750);
        let shown_after_retry = entry_beats_shown(&mission);
        clock.set(t0() + Duration::milliseconds(2_000));
        mission
            .fail_minigame(FloorIndex(2), Uuid::new_v4(), &clock)
            .unwrap();
        tick_at(&mut mission, &clock, 3_000);

        // Assert
        assert_eq!(shown_before_retry, 0);
        assert_eq!(shown_after_retry, 1);
        assert_eq!(entry_beats_shown(&mission), 1);
        assert_eq!(mission.stage(), StageState::Gameplay);
        assert_eq!(mission.resources().health(), 60);
    }

    #[test]
    fn test_pause_freezes_timers_and_resume_shifts_them() {
        // Arrange
        let clock = ManualClock::starting_at_t0();
        let mut mission = mission();
        mission.start(false, Uuid::new_v4(), &clock).unwrap();
        tick_at(&mut mission, &clock, 500);
        mission.toggle_pause(Uuid::new_v4(), &clock).unwrap();

        // Act
        let while_paused = tick_at(&mut mission, &clock, 5_000);
        mission.toggle_pause(Uuid::new_v4(), &clock).unwrap();
        tick_at(&mut mission, &clock, 5_629);
        let stage_before_deadline = mission.stage();
        tick_at(&mut mission, &clock, 5_630);

        // Assert
        assert_eq!(while_paused, CommandOutcome::Ignored(IgnoreReason::Paused));
        assert_eq!(stage_before_deadline, StageState::FloorIntro);
        assert_eq!(mission.stage(), StageState::Gameplay);
        let pause_changes = event_types(&mission)
            .into_iter()
            .filter(|event_type| *event_type == "mission.pause_changed")
            .count();
        assert_eq!(pause_changes, 2);
    }

    #[test]
    fn test_next_deadline_is_hidden_while_paused() {
        let clock = ManualClock::starting_at_t0();
        let mut mission = mission();
        mission.start(false, Uuid::new_v4(), &clock).unwrap();
        assert!(mission.next_deadline().is_some());

        mission.toggle_pause(Uuid::new_v4(), &clock).unwrap();

        assert!(mission.next_deadline().is_none());
    }

    #[test]
    fn test_clear_uncommitted_events_advances_version() {
        let clock = ManualClock::starting_at_t0();
        let mut mission = mission();
        mission.start(false, Uuid::new_v4(), &clock).unwrap();
        let recorded = mission.uncommitted_events().len();

        mission.clear_uncommitted_events();
        mission.toggle_pause(Uuid::new_v4(), &clock).unwrap();

        assert_eq!(mission.version(), i64::try_from(recorded).unwrap());
        assert_eq!(
            mission.uncommitted_events()[0].metadata.sequence_number,
            mission.version() + 1
        );
    }
}
