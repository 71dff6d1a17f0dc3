//! Descent headless runner entry point.

use std::sync::Arc;

use descent_runner::config::RunnerConfig;
use descent_runner::error::AppError;
use descent_runner::rng::SeededRng;
use descent_runner::runtime::{load_script, run_mission};
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), AppError> {
    // Initialize tracing subscriber.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .init();

    tracing::info!("Starting Descent runner");

    // Read configuration from environment.
    let config = RunnerConfig::from_env()?;
    let script = Arc::new(load_script(&config)?);
    let rng = Box::new(SeededRng::new(config.seed));

    // The mission is single-owner state, one thread is enough.
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    let summary = runtime.block_on(run_mission(&config, script, rng, async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    }))?;

    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}
