//! Runner configuration read from the environment.

use std::path::PathBuf;

use crate::error::AppError;

/// Settings of one headless playthrough.
#[derive(Debug, Clone, PartialEq)]
pub struct RunnerConfig {
    /// YAML script to play; the built-in script when unset.
    pub script_path: Option<PathBuf>,
    /// Seed of the autopilot's RNG.
    pub seed: u64,
    /// Wall-clock seconds per mission second.
    pub time_scale: f64,
    /// Probability that the autopilot fails a minigame.
    pub fail_rate: f64,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            script_path: None,
            seed: Self::DEFAULT_SEED,
            time_scale: Self::DEFAULT_TIME_SCALE,
            fail_rate: Self::DEFAULT_FAIL_RATE,
        }
    }
}

impl RunnerConfig {
    const DEFAULT_SEED: u64 = 7;
    const DEFAULT_TIME_SCALE: f64 = 0.05;
    const DEFAULT_FAIL_RATE: f64 = 0.2;

    /// Reads `DESCENT_SCRIPT`, `DESCENT_SEED`, `DESCENT_TIME_SCALE` and
    /// `DESCENT_FAIL_RATE`.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if a variable is set but invalid.
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds the configuration from an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if a variable is set but invalid.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let mut config = Self::default();
        if let Some(path) = lookup("DESCENT_SCRIPT").filter(|path| !path.trim().is_empty()) {
            config.script_path = Some(PathBuf::from(path));
        }
        if let Some(seed) = lookup("DESCENT_SEED") {
            config.seed = seed
                .trim()
                .parse()
                .map_err(|e| AppError::Config(format!("DESCENT_SEED must be a valid u64: {e}")))?;
        }
        if let Some(scale) = lookup("DESCENT_TIME_SCALE") {
            config.time_scale = scale.trim().parse().map_err(|e| {
                AppError::Config(format!("DESCENT_TIME_SCALE must be a number: {e}"))
            })?;
        }
        if let Some(rate) = lookup("DESCENT_FAIL_RATE") {
            config.fail_rate = rate.trim().parse().map_err(|e| {
                AppError::Config(format!("DESCENT_FAIL_RATE must be a number: {e}"))
            })?;
        }
        config.validate()?;
        Ok(config)
    }

    /// Checks value ranges.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` describing the first invalid value.
    pub fn validate(&self) -> Result<(), AppError> {
        if !self.time_scale.is_finite() || self.time_scale <= 0.0 {
            return Err(AppError::Config(format!(
                "DESCENT_TIME_SCALE must be greater than zero, got {}",
                self.time_scale
            )));
        }
        if !(0.0..=1.0).contains(&self.fail_rate) {
            return Err(AppError::Config(format!(
                "DESCENT_FAIL_RATE must be within 0.0..=1.0, got {}",
                self.fail_rate
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn test_defaults_when_nothing_is_set() {
        let config = RunnerConfig::from_lookup(lookup(&[])).unwrap();

        assert_eq!(config, RunnerConfig::default());
        assert_eq!(config.seed, 7);
        assert!(config.script_path.is_none());
    }

    #[test]
    fn test_reads_every_variable() {
        // Arrange
        let vars = lookup(&[
            ("DESCENT_SCRIPT", "scripts/short.yaml"),
            ("DESCENT_SEED", "42"),
            ("DESCENT_TIME_SCALE", "0.5"),
            ("DESCENT_FAIL_RATE", "0"),
        ]);

        // Act
        let config = RunnerConfig::from_lookup(vars).unwrap();

        // Assert
        assert_eq!(config.script_path, Some(PathBuf::from("scripts/short.yaml")));
        assert_eq!(config.seed, 42);
        assert!((config.time_scale - 0.5).abs() < f64::EPSILON);
        assert!(config.fail_rate.abs() < f64::EPSILON);
    }

    #[test]
    fn test_rejects_unparsable_seed() {
        let result = RunnerConfig::from_lookup(lookup(&[("DESCENT_SEED", "seven")]));

        assert!(matches!(result, Err(AppError::Config(message)) if message.contains("DESCENT_SEED")));
    }

    #[test]
    fn test_rejects_non_positive_time_scale() {
        let result = RunnerConfig::from_lookup(lookup(&[("DESCENT_TIME_SCALE", "0")]));

        assert!(matches!(result, Err(AppError::Config(_))));
    }

    #[test]
    fn test_rejects_fail_rate_above_one() {
        let result = RunnerConfig::from_lookup(lookup(&[("DESCENT_FAIL_RATE", "1.5")]));

        assert!(matches!(result, Err(AppError::Config(_))));
    }
}
