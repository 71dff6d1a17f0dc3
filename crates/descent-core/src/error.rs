//! Domain error types.

use thiserror::Error;

/// Top-level domain error type.
///
/// Stale, duplicate and blocked inputs are not errors; aggregates report them
/// as ignored outcomes instead.
#[derive(Debug, Error)]
pub enum DomainError {
    /// A command is not valid for the aggregate's current lifecycle.
    #[error("validation error: {0}")]
    Validation(String),

    /// A mission script failed to parse or violates a structural rule.
    #[error("invalid script: {0}")]
    InvalidScript(String),
}
