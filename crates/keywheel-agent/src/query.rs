//! Query responder: serves key-window snapshots to cluster members.
//!
//! Each inbound `retrieve-keys` query gets its own bounded task. The task
//! takes the read lock just long enough to copy a snapshot, then encodes
//! and replies without blocking the rotator. Permits cap the number of
//! in-flight handlers so a query flood cannot exhaust the process.

use std::sync::Arc;

use keywheel_core::{AuditSink, ClusterBus, InboundQuery, SharedKeyWindow};
use tokio::sync::{Semaphore, mpsc};

use crate::error::AgentError;

/// Serves snapshot queries against the shared key window.
pub struct QueryResponder<B, A> {
    window: SharedKeyWindow,
    bus: Arc<B>,
    audit: Arc<A>,
    query_name: String,
    permits: Arc<Semaphore>,
}

impl<B, A> QueryResponder<B, A>
where
    B: ClusterBus,
    A: AuditSink,
{
    /// Create a responder answering queries named `query_name` (already
    /// prefixed), with at most `max_in_flight` concurrent handlers.
    pub fn new(
        window: SharedKeyWindow,
        bus: Arc<B>,
        audit: Arc<A>,
        query_name: String,
        max_in_flight: usize,
    ) -> Self {
        Self { window, bus, audit, query_name, permits: Arc::new(Semaphore::new(max_in_flight)) }
    }

    /// Serve queries until the stream closes or a handler hits a fatal
    /// error (encode failure, reply failure).
    pub async fn run(self, mut queries: mpsc::Receiver<InboundQuery>) -> Result<(), AgentError> {
        let (err_tx, mut err_rx) = mpsc::unbounded_channel();

        loop {
            tokio::select! {
                received = queries.recv() => {
                    let Some(query) = received else {
                        return Err(AgentError::Bus(keywheel_core::BusError::Disconnected(
                            "query stream closed".to_string(),
                        )));
                    };

                    if query.name != self.query_name {
                        tracing::debug!(name = %query.name, "ignoring unrelated query");
                        continue;
                    }

                    let Ok(permit) = Arc::clone(&self.permits).acquire_owned().await else {
                        // The semaphore is never closed.
                        continue;
                    };

                    let window = Arc::clone(&self.window);
                    let bus = Arc::clone(&self.bus);
                    let audit = Arc::clone(&self.audit);
                    let query_name = self.query_name.clone();
                    let err_tx = err_tx.clone();

                    tokio::spawn(async move {
                        let result = serve(&window, &bus, &audit, &query_name, &query).await;
                        drop(permit);
                        if let Err(e) = result {
                            tracing::error!(error = %e, query_id = query.id, "query reply failed");
                            // Receiver gone means the responder is already
                            // shutting down on an earlier error.
                            drop(err_tx.send(e));
                        }
                    });
                },
                Some(err) = err_rx.recv() => return Err(err),
            }
        }
    }
}

/// Copy a snapshot under the read lock, release, then encode and reply.
#[allow(clippy::expect_used)]
async fn serve<B, A>(
    window: &SharedKeyWindow,
    bus: &Arc<B>,
    audit: &Arc<A>,
    query_name: &str,
    query: &InboundQuery,
) -> Result<(), AgentError>
where
    B: ClusterBus,
    A: AuditSink,
{
    // The lock is held only for the copy; serialization and the reply are
    // I/O and happen after release.
    let snapshot = { window.read().expect("window lock poisoned").snapshot() };

    if let Err(e) = audit.record(&format!("{query_name}: {} keys", snapshot.keys.len())) {
        tracing::warn!(error = %e, "audit write failed");
    }

    let payload = snapshot.into_response().encode()?;
    bus.respond(query.id, &payload).await?;
    Ok(())
}
