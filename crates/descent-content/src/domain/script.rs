//! Mission scripts: floors, beats, interludes and collectible logs.
//!
//! A script is authored as YAML, parsed into a [`ScriptDocument`], validated,
//! and compiled into a [`MissionScript`] whose beat lists are shared
//! allocations. Presenting the same compiled list twice is therefore the same
//! list to the message queue.

use std::collections::BTreeSet;

use descent_core::error::DomainError;
use descent_core::floor::FloorIndex;
use descent_core::resources::{ItemId, METER_MAX};
use descent_narrative::domain::beat::{
    AdvanceMode, BeatId, BeatList, DisplayMode, MessageBeat, PriorityTier, beat_list,
};
use descent_narrative::domain::interlude::{Interlude, ThemeTag};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::debug;

use super::tuning::Tuning;

/// The built-in mission script.
pub const DEFAULT_SCRIPT: &str = include_str!("../../scripts/descent.yaml");

/// Upper bound on floors; keeps the per-floor corruption increment non-zero.
pub const MAX_FLOORS: usize = 100;

/// What a failed minigame costs on a floor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Lose health, then retry the floor.
    #[default]
    Penalize,
    /// Restart the floor from its intro without losing health.
    Restart,
}

/// A collectible log in the mission catalogue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    /// Item identifier.
    pub id: ItemId,
    /// Display title.
    pub title: String,
}

/// One floor as authored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FloorDefinition {
    /// Floor number.
    pub index: FloorIndex,
    /// Display name.
    pub name: String,
    /// Visual theme of the floor.
    pub theme: ThemeTag,
    /// Failure handling.
    #[serde(default)]
    pub failure_policy: FailurePolicy,
    /// Health restored when the floor is completed.
    #[serde(default)]
    pub recovery_heal: u8,
    /// Beats shown shortly after gameplay starts, once per visit.
    #[serde(default)]
    pub entry_beats: Vec<MessageBeat>,
    /// Beats shown after the minigame is completed.
    #[serde(default)]
    pub completion_beats: Vec<MessageBeat>,
    /// Cutscene played on the way into this floor.
    #[serde(default)]
    pub interlude: Option<Interlude>,
    /// Logs that can be collected on this floor.
    #[serde(default)]
    pub items: Vec<ItemId>,
}

/// A mission script as authored, before validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptDocument {
    /// Pacing and balance constants.
    #[serde(default)]
    pub tuning: Tuning,
    /// Beats shown before the first floor intro.
    #[serde(default)]
    pub mission_intro: Vec<MessageBeat>,
    /// Beats shown once when health first drops to the warning threshold.
    #[serde(default = "ScriptDocument::default_low_health_warning")]
    pub low_health_warning: Vec<MessageBeat>,
    /// Catalogue of every collectible log.
    #[serde(default)]
    pub items: Vec<LogEntry>,
    /// Floors in play order.
    pub floors: Vec<FloorDefinition>,
}

impl ScriptDocument {
    fn default_low_health_warning() -> Vec<MessageBeat> {
        vec![MessageBeat {
            id: BeatId::new("low_health_warning"),
            speaker: "Suit".to_owned(),
            text: "Vital signs critical.".to_owned(),
            priority_tier: PriorityTier::Critical,
            display_mode: DisplayMode::Corner,
            reveal_duration_ms: 2_500,
            advance_mode: AdvanceMode::AutoAfterDuration,
        }]
    }

    /// Parses YAML source.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidScript` if the YAML is malformed.
    pub fn parse(source: &str) -> Result<Self, DomainError> {
        serde_yaml::from_str(source)
            .map_err(|e| DomainError::InvalidScript(format!("script parse failed: {e}")))
    }

    /// Checks the structural rules a playable script must satisfy.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidScript` describing the first violation.
    pub fn validate(&self) -> Result<(), DomainError> {
        self.tuning.validate()?;

        if self.floors.is_empty() {
            return Err(invalid("script must define at least one floor"));
        }
        if self.floors.len() > MAX_FLOORS {
            return Err(invalid(format!(
                "script defines {} floors, at most {MAX_FLOORS} are supported",
                self.floors.len()
            )));
        }
        for pair in self.floors.windows(2) {
            if pair[1].index >= pair[0].index {
                return Err(invalid(format!(
                    "floor {} follows floor {}; floor indices must strictly decrease",
                    pair[1].index, pair[0].index
                )));
            }
        }

        let mut catalogue = BTreeSet::new();
        for entry in &self.items {
            if !catalogue.insert(&entry.id) {
                return Err(invalid(format!("duplicate item id {}", entry.id)));
            }
        }
        let mut placed = BTreeSet::new();
        for floor in &self.floors {
            for item in &floor.items {
                if !catalogue.contains(item) {
                    return Err(invalid(format!(
                        "floor {} references unknown item {item}",
                        floor.index
                    )));
                }
                if !placed.insert(item) {
                    return Err(invalid(format!("item {item} is placed on more than one floor")));
                }
            }
        }
        if let Some(unplaced) = catalogue.difference(&placed).next() {
            return Err(invalid(format!("item {unplaced} is not placed on any floor")));
        }

        validate_beats("mission_intro", &self.mission_intro)?;
        validate_beats("low_health_warning", &self.low_health_warning)?;
        for floor in &self.floors {
            validate_beats(&format!("floor {} entry_beats", floor.index), &floor.entry_beats)?;
            validate_beats(
                &format!("floor {} completion_beats", floor.index),
                &floor.completion_beats,
            )?;
        }
        Ok(())
    }
}

fn invalid(message: impl Into<String>) -> DomainError {
    DomainError::InvalidScript(message.into())
}

fn validate_beats(context: &str, beats: &[MessageBeat]) -> Result<(), DomainError> {
    for beat in beats {
        if beat.text.trim().is_empty() {
            return Err(invalid(format!("{context}: beat {} has empty text", beat.id)));
        }
        if beat.reveal_duration_ms == 0 {
            return Err(invalid(format!(
                "{context}: beat {} has a zero reveal duration",
                beat.id
            )));
        }
    }
    Ok(())
}

/// A compiled floor.
#[derive(Debug, Clone)]
pub struct FloorScript {
    /// Floor number.
    pub index: FloorIndex,
    /// Display name.
    pub name: String,
    /// Visual theme.
    pub theme: ThemeTag,
    /// Failure handling.
    pub failure_policy: FailurePolicy,
    /// Health restored on completion.
    pub recovery_heal: u8,
    /// Entry beats, shared.
    pub entry_beats: BeatList,
    /// Completion beats, shared.
    pub completion_beats: BeatList,
    /// Cutscene played on the way into this floor.
    pub interlude: Option<Interlude>,
    /// Logs collectible on this floor.
    pub items: Vec<ItemId>,
}

impl From<FloorDefinition> for FloorScript {
    fn from(definition: FloorDefinition) -> Self {
        Self {
            index: definition.index,
            name: definition.name,
            theme: definition.theme,
            failure_policy: definition.failure_policy,
            recovery_heal: definition.recovery_heal,
            entry_beats: beat_list(definition.entry_beats),
            completion_beats: beat_list(definition.completion_beats),
            interlude: definition.interlude,
            items: definition.items,
        }
    }
}

/// A validated, compiled mission script.
#[derive(Debug, Clone)]
pub struct MissionScript {
    tuning: Tuning,
    mission_intro: BeatList,
    low_health_warning: BeatList,
    items: Vec<LogEntry>,
    floors: Vec<FloorScript>,
    digest: String,
}

impl MissionScript {
    /// Parses, validates and compiles YAML source.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidScript` if parsing or validation fails.
    pub fn from_yaml(source: &str) -> Result<Self, DomainError> {
        let document = ScriptDocument::parse(source)?;
        let digest = digest_source(source);
        let script = Self::compile(document, digest)?;
        debug!(
            digest = %script.digest,
            floors = script.floors.len(),
            items = script.items.len(),
            "mission script compiled"
        );
        Ok(script)
    }

    /// Compiles the embedded default script.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidScript` if the embedded script is broken.
    pub fn builtin() -> Result<Self, DomainError> {
        Self::from_yaml(DEFAULT_SCRIPT)
    }

    /// Validates and compiles an already parsed document. `digest` identifies
    /// the source it came from.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidScript` if validation fails.
    pub fn compile(document: ScriptDocument, digest: String) -> Result<Self, DomainError> {
        document.validate()?;
        Ok(Self {
            tuning: document.tuning,
            mission_intro: beat_list(document.mission_intro),
            low_health_warning: beat_list(document.low_health_warning),
            items: document.items,
            floors: document.floors.into_iter().map(FloorScript::from).collect(),
            digest,
        })
    }

    /// Pacing and balance constants.
    #[must_use]
    pub fn tuning(&self) -> &Tuning {
        &self.tuning
    }

    /// Beats shown before the first floor.
    #[must_use]
    pub fn mission_intro(&self) -> &BeatList {
        &self.mission_intro
    }

    /// Beats shown on the first drop to the warning threshold.
    #[must_use]
    pub fn low_health_warning(&self) -> &BeatList {
        &self.low_health_warning
    }

    /// Collectible log catalogue.
    #[must_use]
    pub fn items(&self) -> &[LogEntry] {
        &self.items
    }

    /// Number of collectible logs.
    #[must_use]
    pub fn total_items(&self) -> usize {
        self.items.len()
    }

    /// Floors in play order.
    #[must_use]
    pub fn floors(&self) -> &[FloorScript] {
        &self.floors
    }

    /// Number of floors.
    #[must_use]
    pub fn floor_count(&self) -> usize {
        self.floors.len()
    }

    /// The floor the mission starts on.
    #[must_use]
    pub fn first_floor(&self) -> Option<&FloorScript> {
        self.floors.first()
    }

    /// Looks up a floor by index.
    #[must_use]
    pub fn floor(&self, index: FloorIndex) -> Option<&FloorScript> {
        self.floors.iter().find(|floor| floor.index == index)
    }

    /// The floor played after `index`, or `None` if `index` is terminal.
    #[must_use]
    pub fn next_floor(&self, index: FloorIndex) -> Option<&FloorScript> {
        let position = self.floors.iter().position(|floor| floor.index == index)?;
        self.floors.get(position + 1)
    }

    /// Whether completing `index` completes the mission.
    #[must_use]
    pub fn is_terminal(&self, index: FloorIndex) -> bool {
        self.floors.last().is_some_and(|floor| floor.index == index)
    }

    /// Corruption added per completed floor: `100 / floor_count`, rounded down.
    #[must_use]
    pub fn corruption_increment(&self) -> u8 {
        let count = self.floors.len().max(1);
        u8::try_from(usize::from(METER_MAX) / count).unwrap_or(METER_MAX)
    }

    /// SHA-256 of the source text, hex encoded.
    #[must_use]
    pub fn digest(&self) -> &str {
        &self.digest
    }
}

/// Hex encoded SHA-256 of `source`.
#[must_use]
pub fn digest_source(source: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(source.as_bytes());
    format!("{:x}", hasher.finalize())
}
