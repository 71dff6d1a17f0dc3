//! Floor identifiers.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifies one floor of the descent. Floors are visited in strictly
/// decreasing order; the lowest floor of a script is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FloorIndex(pub u8);

impl FloorIndex {
    /// Returns the raw floor number.
    #[must_use]
    pub const fn get(self) -> u8 {
        self.0
    }

    /// Number of floors between `self` and a lower `destination`.
    #[must_use]
    pub const fn distance_to(self, destination: FloorIndex) -> u8 {
        self.0.saturating_sub(destination.0)
    }
}

impl fmt::Display for FloorIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "B{}", self.0)
    }
}
