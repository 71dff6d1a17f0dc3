//! Resource meters owned by the mission orchestrator.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::floor::FloorIndex;

/// Upper bound of the health and corruption meters.
pub const METER_MAX: u8 = 100;

/// Identifier of a collectible log.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(String);

impl ItemId {
    /// Creates an item identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ItemId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Health, corruption and collected logs for one playthrough.
///
/// Both meters stay within `[0, METER_MAX]`. Corruption only grows and the
/// collected set only grows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResourceState {
    health: u8,
    corruption: u8,
    collected_items: BTreeSet<ItemId>,
}

impl ResourceState {
    /// Creates the starting state with the given health and no corruption.
    #[must_use]
    pub fn new(initial_health: u8) -> Self {
        Self {
            health: initial_health.min(METER_MAX),
            corruption: 0,
            collected_items: BTreeSet::new(),
        }
    }

    /// Current health.
    #[must_use]
    pub fn health(&self) -> u8 {
        self.health
    }

    /// Current corruption.
    #[must_use]
    pub fn corruption(&self) -> u8 {
        self.corruption
    }

    /// Logs collected so far.
    #[must_use]
    pub fn collected_items(&self) -> &BTreeSet<ItemId> {
        &self.collected_items
    }

    /// Number of distinct logs collected.
    #[must_use]
    pub fn collected_count(&self) -> usize {
        self.collected_items.len()
    }

    /// Whether health has reached zero.
    #[must_use]
    pub fn is_depleted(&self) -> bool {
        self.health == 0
    }

    /// Lowers health by `amount`, stopping at zero. Returns the new health.
    pub fn damage(&mut self, amount: u8) -> u8 {
        self.health = self.health.saturating_sub(amount);
        self.health
    }

    /// Raises health by `amount`, stopping at [`METER_MAX`]. Returns the new health.
    pub fn heal(&mut self, amount: u8) -> u8 {
        self.health = self.health.saturating_add(amount).min(METER_MAX);
        self.health
    }

    /// Raises corruption by `amount`, stopping at [`METER_MAX`]. Returns the new value.
    pub fn corrupt(&mut self, amount: u8) -> u8 {
        self.corruption = self.corruption.saturating_add(amount).min(METER_MAX);
        self.corruption
    }

    /// Adds a log to the collection. Returns `false` if it was already present.
    pub fn collect(&mut self, item: ItemId) -> bool {
        self.collected_items.insert(item)
    }

    /// Builds the HUD snapshot for the given floor.
    #[must_use]
    pub fn snapshot(&self, current_floor: FloorIndex) -> StatsSnapshot {
        StatsSnapshot {
            health: self.health,
            corruption: self.corruption,
            current_floor,
            logs_collected: self.collected_items.len(),
        }
    }
}

/// Meter values rendered by the heads-up display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsSnapshot {
    /// Current health.
    pub health: u8,
    /// Current corruption.
    pub corruption: u8,
    /// Floor the player is on.
    pub current_floor: FloorIndex,
    /// Number of distinct logs collected.
    pub logs_collected: usize,
}
