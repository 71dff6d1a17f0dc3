//! Descent runner error types.

use descent_core::error::DomainError;
use thiserror::Error;

/// Startup and runtime errors of the headless runner.
#[derive(Debug, Error)]
pub enum AppError {
    /// An environment variable is invalid.
    #[error("configuration error: {0}")]
    Config(String),

    /// The script file could not be read.
    #[error("failed to read script {path}: {source}")]
    ScriptRead {
        /// Path that was read.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The mission rejected a command or the script is invalid.
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// The async runtime could not be built.
    #[error("runtime error: {0}")]
    Runtime(#[from] std::io::Error),

    /// The summary could not be serialized.
    #[error("summary error: {0}")]
    Summary(#[from] serde_json::Error),
}
