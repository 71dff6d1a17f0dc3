//! Shared helpers for runner integration tests.
#![allow(dead_code)]

use std::sync::Arc;

use descent_content::domain::script::MissionScript;
use descent_core::rng::DeterministicRng;
use descent_runner::config::RunnerConfig;
use descent_runner::runtime::{RunSummary, run_mission};

/// Configuration that plays at a hundredth of mission time.
pub fn fast_config(fail_rate: f64) -> RunnerConfig {
    RunnerConfig {
        time_scale: 0.01,
        fail_rate,
        ..RunnerConfig::default()
    }
}

/// Plays the built-in script to the end.
pub async fn play_builtin(config: &RunnerConfig, rng: Box<dyn DeterministicRng>) -> RunSummary {
    let script = Arc::new(MissionScript::builtin().unwrap());
    run_mission(config, script, rng, std::future::pending())
        .await
        .unwrap()
}
