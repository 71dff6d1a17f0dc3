//! Scripted dialogue beats.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Identifier of a beat within a script.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BeatId(String);

impl BeatId {
    /// Creates a beat identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BeatId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// How a beat is presented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisplayMode {
    /// Modal, full-attention presentation that blocks other interaction.
    Cinematic,
    /// Non-modal presentation in a corner of the gameplay surface.
    #[default]
    Corner,
}

/// How a revealed beat is dismissed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdvanceMode {
    /// Dismissed automatically once `reveal_duration_ms` has passed after the
    /// text is fully revealed.
    #[default]
    AutoAfterDuration,
    /// Dismissed only by an explicit advance signal.
    RequireExplicitAdvance,
}

/// Urgency of a beat. Decides which flow keeps the single message slot when
/// two flows compete for it.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum PriorityTier {
    /// Flavor text that may be dropped.
    Ambient,
    /// Regular story beats.
    #[default]
    Story,
    /// Warnings the player must see.
    Critical,
}

fn default_reveal_duration_ms() -> u64 {
    3_000
}

/// A single scripted line of dialogue. Immutable once enqueued.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageBeat {
    /// Beat identifier.
    pub id: BeatId,
    /// Who speaks the line.
    pub speaker: String,
    /// The line itself.
    pub text: String,
    /// Slot arbitration tier.
    #[serde(default)]
    pub priority_tier: PriorityTier,
    /// Modal or corner presentation.
    #[serde(default)]
    pub display_mode: DisplayMode,
    /// How long a revealed beat stays up before auto-dismissal.
    #[serde(default = "default_reveal_duration_ms")]
    pub reveal_duration_ms: u64,
    /// Auto or explicit dismissal.
    #[serde(default)]
    pub advance_mode: AdvanceMode,
}

/// Shared, immutable list of beats. Two lists are the same list only if they
/// are the same allocation (`Arc::ptr_eq`); equal content is not enough.
pub type BeatList = Arc<[MessageBeat]>;

/// Freezes beats into a [`BeatList`].
#[must_use]
pub fn beat_list(beats: Vec<MessageBeat>) -> BeatList {
    beats.into()
}

/// Tier a flow competes with: the tier of its first beat.
#[must_use]
pub fn flow_tier(beats: &BeatList) -> PriorityTier {
    beats
        .first()
        .map_or(PriorityTier::Ambient, |beat| beat.priority_tier)
}
