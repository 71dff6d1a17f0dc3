//! Autopilot player for headless runs.
//!
//! The autopilot reacts to published events the way a player would: it
//! collects the logs of every floor it reaches, plays the floor's minigame
//! for a random while and then wins or loses it, and dismisses beats that
//! wait for input. Decisions are pure ([`Autopilot::observe`]); the async
//! task only delays and forwards them.

use std::collections::BTreeSet;
use std::sync::Arc;

use descent_content::domain::script::MissionScript;
use descent_core::event::EventEnvelope;
use descent_core::floor::FloorIndex;
use descent_core::resources::ItemId;
use descent_core::rng::DeterministicRng;
use descent_core::sink::EventSink;
use descent_mission::domain::events::MissionEventKind;
use descent_mission::domain::stage::{IgnoreReason, StageState};
use descent_narrative::domain::beat::{AdvanceMode, MessageBeat};
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};
use tracing::{debug, warn};

use crate::clock::ScaledClock;

/// Input the runner applies to the mission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlayerInput {
    /// Win the minigame of a floor.
    CompleteMinigame(FloorIndex),
    /// Lose the minigame of a floor.
    FailMinigame(FloorIndex),
    /// Pick up a log.
    CollectLog(FloorIndex, ItemId),
    /// Dismiss the beat on screen.
    AdvanceMessage,
    /// Leave the mission.
    Abort,
}

/// What the autopilot learns about the mission.
#[derive(Debug, Clone)]
pub enum Observation {
    /// An event was published.
    Published(EventEnvelope),
    /// An input had no effect.
    Ignored {
        /// The input.
        input: PlayerInput,
        /// Why it had no effect.
        reason: IgnoreReason,
    },
}

/// An input to send after `delay_ms` mission milliseconds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedInput {
    /// Delay in mission time.
    pub delay_ms: u64,
    /// The input.
    pub input: PlayerInput,
}

/// Forwards every published event to the autopilot.
#[derive(Debug)]
pub struct ObservationSink {
    observations: UnboundedSender<Observation>,
}

impl ObservationSink {
    /// Creates a sink sending into `observations`.
    #[must_use]
    pub fn new(observations: UnboundedSender<Observation>) -> Self {
        Self { observations }
    }
}

impl EventSink for ObservationSink {
    fn publish(&self, envelope: &EventEnvelope) {
        if self
            .observations
            .send(Observation::Published(envelope.clone()))
            .is_err()
        {
            debug!(event_type = %envelope.event_type, "autopilot no longer observing");
        }
    }
}

/// Decides player inputs from observations.
pub struct Autopilot {
    script: Arc<MissionScript>,
    rng: Box<dyn DeterministicRng>,
    fail_rate: f64,
    collected_on: BTreeSet<FloorIndex>,
    finished: bool,
}

impl std::fmt::Debug for Autopilot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Autopilot")
            .field("fail_rate", &self.fail_rate)
            .field("collected_on", &self.collected_on)
            .field("finished", &self.finished)
            .finish_non_exhaustive()
    }
}

impl Autopilot {
    /// Shortest minigame attempt.
    pub const MIN_PLAY_MS: u32 = 2_000;
    /// Longest minigame attempt.
    pub const MAX_PLAY_MS: u32 = 12_000;
    /// Extra wait after a beat's text is revealed before dismissing it.
    pub const READ_MARGIN_MS: u64 = 400;
    /// Wait before repeating an input that was blocked.
    pub const RETRY_MS: u64 = 500;

    /// Creates an autopilot for `script` that loses each minigame with
    /// probability `fail_rate`.
    #[must_use]
    pub fn new(script: Arc<MissionScript>, rng: Box<dyn DeterministicRng>, fail_rate: f64) -> Self {
        Self {
            script,
            rng,
            fail_rate,
            collected_on: BTreeSet::new(),
            finished: false,
        }
    }

    /// Whether the mission has ended.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Reacts to one observation.
    pub fn observe(&mut self, observation: &Observation) -> Vec<PlannedInput> {
        match observation {
            Observation::Published(envelope) => {
                match serde_json::from_value::<MissionEventKind>(envelope.payload.clone()) {
                    Ok(kind) => self.on_event(kind),
                    Err(e) => {
                        warn!(event_type = %envelope.event_type, error = %e, "unreadable event payload");
                        Vec::new()
                    }
                }
            }
            Observation::Ignored { input, reason } => self.on_ignored(input, *reason),
        }
    }

    fn on_event(&mut self, kind: MissionEventKind) -> Vec<PlannedInput> {
        match kind {
            MissionEventKind::StageChanged(change) if change.to == StageState::Gameplay => {
                self.play_floor(change.floor)
            }
            MissionEventKind::BeatShown(shown) => self.read_beat(&shown.beat),
            MissionEventKind::MissionCompleted(_) | MissionEventKind::MissionExited(_) => {
                self.finished = true;
                Vec::new()
            }
            _ => Vec::new(),
        }
    }

    fn play_floor(&mut self, floor: FloorIndex) -> Vec<PlannedInput> {
        let mut planned = Vec::new();
        if self.collected_on.insert(floor) {
            let items = self
                .script
                .floor(floor)
                .map(|f| f.items.clone())
                .unwrap_or_default();
            planned.extend(items.into_iter().map(|item| PlannedInput {
                delay_ms: 0,
                input: PlayerInput::CollectLog(floor, item),
            }));
        }

        let play_ms = self
            .rng
            .next_u32_range(Self::MIN_PLAY_MS, Self::MAX_PLAY_MS);
        let input = if self.rng.chance(self.fail_rate) {
            PlayerInput::FailMinigame(floor)
        } else {
            PlayerInput::CompleteMinigame(floor)
        };
        debug!(%floor, play_ms, ?input, "minigame attempt planned");
        planned.push(PlannedInput {
            delay_ms: u64::from(play_ms),
            input,
        });
        planned
    }

    fn read_beat(&self, beat: &MessageBeat) -> Vec<PlannedInput> {
        if beat.advance_mode != AdvanceMode::RequireExplicitAdvance {
            return Vec::new();
        }
        let reveal = self.script.tuning().reveal.reveal_duration(&beat.text);
        let reveal_ms = u64::try_from(reveal.num_milliseconds()).unwrap_or(0);
        vec![PlannedInput {
            delay_ms: reveal_ms + Self::READ_MARGIN_MS,
            input: PlayerInput::AdvanceMessage,
        }]
    }

    fn on_ignored(&self, input: &PlayerInput, reason: IgnoreReason) -> Vec<PlannedInput> {
        let retry = matches!(
            (input, reason),
            (PlayerInput::AdvanceMessage, IgnoreReason::BeatStillTyping)
                | (
                    PlayerInput::CompleteMinigame(_) | PlayerInput::FailMinigame(_),
                    IgnoreReason::BlockedByCinematic | IgnoreReason::Paused
                )
        );
        if !retry || self.finished {
            return Vec::new();
        }
        vec![PlannedInput {
            delay_ms: Self::RETRY_MS,
            input: input.clone(),
        }]
    }

    /// Runs until the mission ends or the observation channel closes,
    /// sending each planned input after its delay.
    pub async fn run(
        mut self,
        mut observations: UnboundedReceiver<Observation>,
        inputs: UnboundedSender<PlayerInput>,
        clock: Arc<ScaledClock>,
    ) {
        while let Some(observation) = observations.recv().await {
            for planned in self.observe(&observation) {
                let wait = clock.wall_delay(planned.delay_ms);
                let inputs = inputs.clone();
                tokio::spawn(async move {
                    tokio::time::sleep(wait).await;
                    if inputs.send(planned.input).is_err() {
                        debug!("runner stopped before a planned input was sent");
                    }
                });
            }
            if self.is_finished() {
                break;
            }
        }
    }
}
