//! Event announcement: audit, then publish, with bounded retry.
//!
//! The rotator hands back ordered [`ClusterEvent`]s after each window
//! mutation; this module pushes them out. Each event is audited first
//! (matching the trail to what the cluster was told, even when the publish
//! then fails), then published with bounded exponential backoff for
//! transient failures. Exhausting the retries is fatal for the daemon.

use std::{sync::Arc, time::Duration};

use keywheel_core::{AuditSink, ClusterBus, ClusterEvent, Environment};
use keywheel_proto::prefixed;

use crate::error::AgentError;

/// Retry schedule for transient publish failures.
///
/// Attempt `n` (zero-based) waits `initial_backoff * 2^n` before retrying.
/// Non-transient failures (rejections, protocol errors) are never retried.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub max_attempts: u32,
    /// Backoff before the first retry; doubles each attempt.
    pub initial_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { max_attempts: 5, initial_backoff: Duration::from_millis(100) }
    }
}

/// Publishes rotator events to the bus and records them in the audit trail.
pub struct Announcer<B, A, E> {
    bus: Arc<B>,
    audit: Arc<A>,
    env: E,
    prefix: String,
    retry: RetryPolicy,
}

impl<B, A, E> Announcer<B, A, E>
where
    B: ClusterBus,
    A: AuditSink,
    E: Environment,
{
    /// Create an announcer applying `prefix` to every event name.
    pub fn new(bus: Arc<B>, audit: Arc<A>, env: E, prefix: String, retry: RetryPolicy) -> Self {
        Self { bus, audit, env, prefix, retry }
    }

    /// Announce `events` in order.
    ///
    /// Stops at the first event whose publish fails after retries; earlier
    /// events stay announced (members apply them idempotently).
    pub async fn announce(&self, events: Vec<ClusterEvent>) -> Result<(), AgentError> {
        for event in events {
            self.announce_one(&event).await?;
        }
        Ok(())
    }

    async fn announce_one(&self, event: &ClusterEvent) -> Result<(), AgentError> {
        let name = prefixed(&self.prefix, event.event_name());
        let line = match event.key_name() {
            Some(key) => format!("{name} {key}"),
            None => name.clone(),
        };

        // Audit failures are surfaced but never block the broadcast.
        if let Err(e) = self.audit.record(&line) {
            tracing::warn!(error = %e, event = %name, "audit write failed");
        }

        self.publish_with_retry(&name, event).await
    }

    async fn publish_with_retry(&self, name: &str, event: &ClusterEvent) -> Result<(), AgentError> {
        let mut backoff = self.retry.initial_backoff;
        let mut attempt = 0u32;

        loop {
            attempt += 1;
            match self.bus.publish(name, event.payload(), event.coalesce()).await {
                Ok(()) => return Ok(()),
                Err(e) if e.is_transient() && attempt < self.retry.max_attempts => {
                    tracing::warn!(
                        error = %e,
                        event = %name,
                        attempt,
                        "publish failed, retrying after {backoff:?}"
                    );
                    self.env.sleep(backoff).await;
                    backoff *= 2;
                },
                Err(e) => {
                    tracing::error!(
                        error = %e,
                        event = %name,
                        key = ?event.key_name(),
                        "publish failed, giving up"
                    );
                    return Err(e.into());
                },
            }
        }
    }
}
