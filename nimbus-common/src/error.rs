//! Error taxonomy surfaced by the control plane.
//!
//! Provider-layer failures are deliberately absent here: a failing real
//! provider is recovered locally by falling back to the simulated path and
//! is never visible to callers.

use thiserror::Error;

use crate::InstanceStatus;

/// Result type alias for control-plane operations.
pub type Result<T> = std::result::Result<T, NimbusError>;

#[derive(Error, Debug)]
pub enum NimbusError {
    /// Malformed or missing launch parameters. Surfaced to the caller as-is.
    #[error("validation failed: {0}")]
    Validation(String),

    /// The referenced instance does not exist (or belongs to another owner).
    #[error("instance not found: {id}")]
    NotFound { id: String },

    /// The requested status change is not reachable from the current status.
    #[error("invalid status transition: {from} -> {to}")]
    InvalidTransition {
        from: InstanceStatus,
        to: InstanceStatus,
    },

    /// Command execution against an unknown session id.
    #[error("session not found: {session_id}")]
    SessionNotFound { session_id: String },

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

#[derive(Error, Debug)]
#[error("unknown instance status: {0}")]
pub struct ParseStatusError(pub String);
