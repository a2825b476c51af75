//! Interfaces to the cluster bus and the audit trail.
//!
//! The transport is an external collaborator: the agent process connects to
//! a cluster-bus endpoint that handles membership, gossip, and delivery.
//! This module defines only the boundary the rotation logic consumes —
//! publishing named events, replying to queries, and recording audit lines.

use std::time::Duration;

use async_trait::async_trait;
use keywheel_proto::ProtocolError;
use thiserror::Error;

/// Errors from cluster bus operations.
#[derive(Debug, Error)]
pub enum BusError {
    /// The connection to the bus endpoint is gone.
    #[error("bus connection lost: {0}")]
    Disconnected(String),

    /// The endpoint acknowledged the request with a failure.
    #[error("bus rejected {name}: {reason}")]
    Rejected {
        /// Event or stream name the endpoint rejected.
        name: String,
        /// Reason reported by the endpoint.
        reason: String,
    },

    /// No acknowledgement within the configured RPC timeout.
    #[error("bus request timed out after {0:?}")]
    Timeout(Duration),

    /// Socket-level failure.
    #[error("bus I/O error: {0}")]
    Io(String),

    /// Malformed frame on the endpoint connection.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}

impl BusError {
    /// Whether a retry with backoff is worthwhile.
    ///
    /// Timeouts and I/O hiccups may clear; a rejection or a malformed frame
    /// will not.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Timeout(_) | Self::Io(_) | Self::Disconnected(_) => true,
            Self::Rejected { .. } | Self::Protocol(_) => false,
        }
    }
}

/// Errors from the audit sink.
#[derive(Debug, Error)]
pub enum AuditError {
    /// Appending the line failed.
    #[error("audit write failed: {0}")]
    Write(String),
}

impl From<std::io::Error> for AuditError {
    fn from(err: std::io::Error) -> Self {
        Self::Write(err.to_string())
    }
}

/// An inbound query delivered by the bus subscription.
#[derive(Debug, Clone)]
pub struct InboundQuery {
    /// Correlation id for the direct reply.
    pub id: u64,
    /// Full (prefixed) query name.
    pub name: String,
    /// Query payload (unused by keywheel queries).
    pub payload: Vec<u8>,
}

/// Cluster-wide event publication and point-to-point query replies.
///
/// `publish` broadcasts to every member; `respond` reaches exactly the
/// requester identified by a query's correlation id. Implementations
/// provide reliable-effort ordered delivery unless `coalesce` relaxes it.
#[async_trait]
pub trait ClusterBus: Send + Sync + 'static {
    /// Broadcast `payload` under the full event `name`.
    ///
    /// `coalesce = true` tells the bus that duplicate suppression and
    /// ordering relaxation are acceptable for this event.
    async fn publish(&self, name: &str, payload: &[u8], coalesce: bool) -> Result<(), BusError>;

    /// Send a direct reply to the query with correlation id `query_id`.
    async fn respond(&self, query_id: u64, payload: &[u8]) -> Result<(), BusError>;
}

/// Append-only record of every state transition.
///
/// Best-effort: the rotation loop surfaces write failures but does not halt
/// on them. Only a sink that cannot be opened at startup is fatal.
pub trait AuditSink: Send + Sync + 'static {
    /// Append one line to the trail.
    fn record(&self, line: &str) -> Result<(), AuditError>;
}
