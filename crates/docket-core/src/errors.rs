//! Cross-cutting error types for Docket.
//!
//! Domain-specific errors (`DatabaseError`, `SyncError`, `ConfigError`) live in
//! their respective crates. `docket-cli` converges them through `anyhow`.

use thiserror::Error;

/// Errors that can be raised by any Docket crate.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Entity lookup returned no result.
    #[error("Entity not found: {entity_type} {key}")]
    NotFound { entity_type: String, key: String },

    /// A key does not follow the epic/feature/task key grammar.
    #[error("Invalid {kind} key '{key}'")]
    InvalidKey { kind: &'static str, key: String },

    /// Data failed validation (unknown enum value, constraint).
    #[error("Validation error: {0}")]
    Validation(String),

    /// Catch-all for unexpected errors.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
