//! Achievement evaluator.

use std::fmt;

use descent_core::resources::ResourceState;
use serde::{Deserialize, Serialize};
use tracing::info;

/// Floor completed under the speed threshold.
pub const SPEED_DEMON: &str = "speed_demon";
/// Mission finished with untouched health.
pub const FLAWLESS_RUN: &str = "flawless_run";
/// Every collectible log gathered.
pub const ARCHIVIST: &str = "archivist";
/// Mission finished at all.
pub const FINISHER: &str = "finisher";

/// Identifier of an achievement.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AchievementId(String);

impl AchievementId {
    /// Creates an achievement identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AchievementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Points at which achievements are evaluated. There is no polling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Trigger {
    /// A floor's minigame was completed.
    FloorComplete,
    /// The terminal floor was completed.
    MissionComplete,
}

/// Parameters the predicates compare against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AchievementRules {
    /// A floor finished in strictly less time than this unlocks `speed_demon`.
    pub speed_threshold_ms: u64,
    /// Health at mission start.
    pub initial_health: u8,
    /// Number of collectible logs in the mission.
    pub total_items: usize,
}

type Predicate = fn(&AchievementRules, &ResourceState, Option<u64>) -> bool;

/// One entry of the achievement bank.
#[derive(Debug, Clone, Copy)]
pub struct AchievementDefinition {
    /// Identifier.
    pub id: &'static str,
    /// Display title.
    pub title: &'static str,
    /// When the predicate is evaluated.
    pub triggers: &'static [Trigger],
    predicate: Predicate,
}

impl AchievementDefinition {
    /// Whether the definition is evaluated at `trigger`.
    #[must_use]
    pub fn evaluated_at(&self, trigger: Trigger) -> bool {
        self.triggers.contains(&trigger)
    }
}

fn completed_quickly(
    rules: &AchievementRules,
    _: &ResourceState,
    floor_elapsed_ms: Option<u64>,
) -> bool {
    floor_elapsed_ms.is_some_and(|elapsed| elapsed < rules.speed_threshold_ms)
}

fn untouched_health(rules: &AchievementRules, resources: &ResourceState, _: Option<u64>) -> bool {
    resources.health() == rules.initial_health
}

fn everything_collected(
    rules: &AchievementRules,
    resources: &ResourceState,
    _: Option<u64>,
) -> bool {
    resources.collected_count() == rules.total_items
}

fn participated(_: &AchievementRules, _: &ResourceState, _: Option<u64>) -> bool {
    true
}

/// The achievements of a playthrough.
#[must_use]
pub fn standard_bank() -> Vec<AchievementDefinition> {
    vec![
        AchievementDefinition {
            id: SPEED_DEMON,
            title: "Speed Demon",
            triggers: &[Trigger::FloorComplete],
            predicate: completed_quickly,
        },
        AchievementDefinition {
            id: FLAWLESS_RUN,
            title: "Flawless Run",
            triggers: &[Trigger::MissionComplete],
            predicate: untouched_health,
        },
        AchievementDefinition {
            id: ARCHIVIST,
            title: "Archivist",
            triggers: &[Trigger::FloorComplete, Trigger::MissionComplete],
            predicate: everything_collected,
        },
        AchievementDefinition {
            id: FINISHER,
            title: "Finisher",
            triggers: &[Trigger::MissionComplete],
            predicate: participated,
        },
    ]
}

/// Evaluates the bank and owns the unlocked set, in unlock order.
#[derive(Debug, Clone)]
pub struct AchievementEvaluator {
    rules: AchievementRules,
    bank: Vec<AchievementDefinition>,
    unlocked: Vec<AchievementId>,
}

impl AchievementEvaluator {
    /// Creates an evaluator over the standard bank with nothing unlocked.
    #[must_use]
    pub fn new(rules: AchievementRules) -> Self {
        Self {
            rules,
            bank: standard_bank(),
            unlocked: Vec::new(),
        }
    }

    /// Evaluates every definition registered for `trigger` and unlocks the
    /// ones whose predicate holds. Returns only the newly unlocked ids;
    /// evaluating again with the same inputs returns nothing.
    pub fn evaluate(
        &mut self,
        trigger: Trigger,
        resources: &ResourceState,
        floor_elapsed_ms: Option<u64>,
    ) -> Vec<AchievementId> {
        let mut newly_unlocked = Vec::new();
        for definition in self.bank.iter().filter(|d| d.evaluated_at(trigger)) {
            if !(definition.predicate)(&self.rules, resources, floor_elapsed_ms) {
                continue;
            }
            if self.is_unlocked(definition.id) {
                continue;
            }
            info!(achievement = definition.id, ?trigger, "achievement unlocked");
            let id = AchievementId::new(definition.id);
            self.unlocked.push(id.clone());
            newly_unlocked.push(id);
        }
        newly_unlocked
    }

    /// Ids unlocked so far, in unlock order, each exactly once.
    #[must_use]
    pub fn unlocked(&self) -> &[AchievementId] {
        &self.unlocked
    }

    /// Whether `id` has been unlocked.
    #[must_use]
    pub fn is_unlocked(&self, id: &str) -> bool {
        self.unlocked.iter().any(|unlocked| unlocked.as_str() == id)
    }

    /// Looks up a definition by id.
    #[must_use]
    pub fn definition(&self, id: &str) -> Option<&AchievementDefinition> {
        self.bank.iter().find(|definition| definition.id == id)
    }
}
