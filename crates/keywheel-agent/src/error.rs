//! Agent error types.

use keywheel_core::{AuditError, BusError, RotateError};
use keywheel_proto::ProtocolError;
use thiserror::Error;

/// Errors that terminate the agent.
///
/// Startup-class errors (configuration, audit-sink open, bus connect) abort
/// before the first broadcast. Runtime-class errors (publish failure after
/// retries, encode failure) terminate a running daemon; the rotation state
/// is ephemeral, so a supervisor restart re-bootstraps cleanly.
#[derive(Debug, Error)]
pub enum AgentError {
    /// Invalid configuration (bad key size, zero tick, etc.).
    #[error("configuration error: {0}")]
    Config(String),

    /// Cluster bus failure, after any retries were exhausted.
    #[error(transparent)]
    Bus(#[from] BusError),

    /// Audit sink could not be opened.
    #[error(transparent)]
    Audit(#[from] AuditError),

    /// Rotation state machine misuse.
    #[error(transparent)]
    Rotate(#[from] RotateError),

    /// Wire encoding failed.
    #[error(transparent)]
    Encode(#[from] ProtocolError),
}
