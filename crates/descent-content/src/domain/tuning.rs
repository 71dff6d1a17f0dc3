//! Pacing and balance constants of a mission.

use descent_core::error::DomainError;
use descent_core::resources::METER_MAX;
use descent_narrative::domain::interlude::InterludeTiming;
use descent_narrative::domain::message_queue::RevealTiming;
use descent_transition::domain::controller::TransitionTiming;
use serde::{Deserialize, Serialize};

/// Mission-wide constants. Every field falls back to its default when the
/// script omits it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tuning {
    /// Health at mission start.
    #[serde(default = "Tuning::default_initial_health")]
    pub initial_health: u8,
    /// Health lost on a penalizing minigame failure.
    #[serde(default = "Tuning::default_failure_penalty")]
    pub failure_penalty: u8,
    /// Health at or below which the warning beat is shown.
    #[serde(default = "Tuning::default_low_health_threshold")]
    pub low_health_threshold: u8,
    /// How long the floor intro card is displayed.
    #[serde(default = "Tuning::default_floor_intro_ms")]
    pub floor_intro_ms: u64,
    /// Delay between entering gameplay and showing the entry beats.
    #[serde(default = "Tuning::default_entry_beat_delay_ms")]
    pub entry_beat_delay_ms: u64,
    /// How long the failure overlay is displayed.
    #[serde(default = "Tuning::default_failure_overlay_ms")]
    pub failure_overlay_ms: u64,
    /// Delay between health depletion and the exit.
    #[serde(default = "Tuning::default_game_over_delay_ms")]
    pub game_over_delay_ms: u64,
    /// A floor completed in strictly less time unlocks `speed_demon`.
    #[serde(default = "Tuning::default_speed_threshold_ms")]
    pub speed_threshold_ms: u64,
    /// Letter-by-letter reveal speed of beats.
    #[serde(default)]
    pub reveal: RevealTiming,
    /// Interlude line pacing.
    #[serde(default)]
    pub interlude: InterludeTiming,
    /// Transition phase budgets.
    #[serde(default)]
    pub transition: TransitionTiming,
}

impl Tuning {
    fn default_initial_health() -> u8 {
        100
    }

    fn default_failure_penalty() -> u8 {
        20
    }

    fn default_low_health_threshold() -> u8 {
        40
    }

    fn default_floor_intro_ms() -> u64 {
        3_000
    }

    fn default_entry_beat_delay_ms() -> u64 {
        800
    }

    fn default_failure_overlay_ms() -> u64 {
        2_000
    }

    fn default_game_over_delay_ms() -> u64 {
        3_000
    }

    fn default_speed_threshold_ms() -> u64 {
        10_000
    }

    /// Checks meter bounds and rejects zero durations.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidScript` naming the first offending field.
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.initial_health == 0 || self.initial_health > METER_MAX {
            return Err(DomainError::InvalidScript(format!(
                "tuning.initial_health must be within 1..={METER_MAX}, got {}",
                self.initial_health
            )));
        }
        if self.low_health_threshold >= self.initial_health {
            return Err(DomainError::InvalidScript(
                "tuning.low_health_threshold must be below initial_health".to_owned(),
            ));
        }

        let durations = [
            ("tuning.floor_intro_ms", self.floor_intro_ms),
            ("tuning.failure_overlay_ms", self.failure_overlay_ms),
            ("tuning.game_over_delay_ms", self.game_over_delay_ms),
            ("tuning.speed_threshold_ms", self.speed_threshold_ms),
            ("tuning.reveal.char_interval_ms", self.reveal.char_interval_ms),
            ("tuning.interlude.stagger_ms", self.interlude.stagger_ms),
            ("tuning.interlude.trailing_ms", self.interlude.trailing_ms),
            ("tuning.transition.descent_ms", self.transition.descent_ms),
            ("tuning.transition.arrival_ms", self.transition.arrival_ms),
            ("tuning.transition.doors_ms", self.transition.doors_ms),
        ];
        if let Some((field, _)) = durations.iter().find(|(_, value)| *value == 0) {
            return Err(DomainError::InvalidScript(format!(
                "{field} must be greater than zero"
            )));
        }
        Ok(())
    }
}

impl Default for Tuning {
    fn default() -> Self {
        Self {
            initial_health: Self::default_initial_health(),
            failure_penalty: Self::default_failure_penalty(),
            low_health_threshold: Self::default_low_health_threshold(),
            floor_intro_ms: Self::default_floor_intro_ms(),
            entry_beat_delay_ms: Self::default_entry_beat_delay_ms(),
            failure_overlay_ms: Self::default_failure_overlay_ms(),
            game_over_delay_ms: Self::default_game_over_delay_ms(),
            speed_threshold_ms: Self::default_speed_threshold_ms(),
            reveal: RevealTiming::default(),
            interlude: InterludeTiming::default(),
            transition: TransitionTiming::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_documented_constants() {
        let tuning = Tuning::default();

        assert_eq!(tuning.initial_health, 100);
        assert_eq!(tuning.failure_penalty, 20);
        assert_eq!(tuning.low_health_threshold, 40);
        assert_eq!(tuning.floor_intro_ms, 3_000);
        assert_eq!(tuning.entry_beat_delay_ms, 800);
        assert_eq!(tuning.failure_overlay_ms, 2_000);
        assert_eq!(tuning.game_over_delay_ms, 3_000);
        assert_eq!(tuning.speed_threshold_ms, 10_000);
        assert_eq!(tuning.reveal.char_interval_ms, 30);
        assert_eq!(tuning.transition.total().num_milliseconds(), 5_700);
        assert!(tuning.validate().is_ok());
    }

    #[test]
    fn test_partial_yaml_keeps_defaults_for_missing_fields() {
        // Arrange
        let yaml = "failure_penalty: 25\ntransition:\n  doors_ms: 900\n";

        // Act
        let tuning: Tuning = serde_yaml::from_str(yaml).unwrap();

        // Assert
        assert_eq!(tuning.failure_penalty, 25);
        assert_eq!(tuning.transition.doors_ms, 900);
        assert_eq!(tuning.transition.descent_ms, 3_000);
        assert_eq!(tuning.initial_health, 100);
    }

    #[test]
    fn test_zero_duration_is_rejected() {
        let tuning = Tuning {
            failure_overlay_ms: 0,
            ..Tuning::default()
        };

        let error = tuning.validate().unwrap_err();

        assert!(error.to_string().contains("tuning.failure_overlay_ms"));
    }

    #[test]
    fn test_threshold_above_initial_health_is_rejected() {
        let tuning = Tuning {
            initial_health: 30,
            ..Tuning::default()
        };

        assert!(matches!(
            tuning.validate(),
            Err(DomainError::InvalidScript(_))
        ));
    }
}
