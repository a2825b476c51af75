//! In-memory bus implementation for tests and simulation.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use keywheel_core::{BusError, ClusterBus};

/// One event recorded by [`MemoryBus::publish`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishedEvent {
    /// Full (prefixed) event name.
    pub name: String,
    /// Raw payload bytes.
    pub payload: Vec<u8>,
    /// Coalesce flag the publisher passed.
    pub coalesce: bool,
}

#[derive(Default)]
struct MemoryBusInner {
    published: Vec<PublishedEvent>,
    responses: Vec<(u64, Vec<u8>)>,
    publish_failures: u32,
}

/// Records publishes and replies instead of touching a network.
///
/// `fail_next_publishes` injects transient failures so retry behavior can
/// be exercised. Clones share the same underlying log.
#[derive(Clone, Default)]
pub struct MemoryBus {
    inner: Arc<Mutex<MemoryBusInner>>,
}

impl MemoryBus {
    /// Create an empty bus.
    pub fn new() -> Self {
        Self::default()
    }

    /// All events published so far, in order.
    ///
    /// # Panics
    ///
    /// Panics if the mutex is poisoned. Acceptable for test code.
    #[allow(clippy::expect_used)]
    pub fn published(&self) -> Vec<PublishedEvent> {
        self.inner.lock().expect("bus mutex poisoned").published.clone()
    }

    /// All `(query_id, payload)` replies sent so far, in order.
    ///
    /// # Panics
    ///
    /// Panics if the mutex is poisoned. Acceptable for test code.
    #[allow(clippy::expect_used)]
    pub fn responses(&self) -> Vec<(u64, Vec<u8>)> {
        self.inner.lock().expect("bus mutex poisoned").responses.clone()
    }

    /// Make the next `count` publish calls fail with a transient I/O error.
    ///
    /// # Panics
    ///
    /// Panics if the mutex is poisoned. Acceptable for test code.
    #[allow(clippy::expect_used)]
    pub fn fail_next_publishes(&self, count: u32) {
        self.inner.lock().expect("bus mutex poisoned").publish_failures = count;
    }
}

#[async_trait]
impl ClusterBus for MemoryBus {
    /// # Panics
    ///
    /// Panics if the mutex is poisoned. Acceptable for test code.
    #[allow(clippy::expect_used)]
    async fn publish(&self, name: &str, payload: &[u8], coalesce: bool) -> Result<(), BusError> {
        let mut inner = self.inner.lock().expect("bus mutex poisoned");

        if inner.publish_failures > 0 {
            inner.publish_failures -= 1;
            return Err(BusError::Io("injected publish failure".to_string()));
        }

        inner.published.push(PublishedEvent {
            name: name.to_string(),
            payload: payload.to_vec(),
            coalesce,
        });
        Ok(())
    }

    /// # Panics
    ///
    /// Panics if the mutex is poisoned. Acceptable for test code.
    #[allow(clippy::expect_used)]
    async fn respond(&self, query_id: u64, payload: &[u8]) -> Result<(), BusError> {
        self.inner
            .lock()
            .expect("bus mutex poisoned")
            .responses
            .push((query_id, payload.to_vec()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn records_publishes_in_order() {
        let bus = MemoryBus::new();
        bus.publish("keywheel:wipe-keys", &[], true).await.unwrap();
        bus.publish("keywheel:install-key", &[1, 2], false).await.unwrap();

        let published = bus.published();
        assert_eq!(published.len(), 2);
        assert_eq!(published[0].name, "keywheel:wipe-keys");
        assert!(published[0].coalesce);
        assert_eq!(published[1].payload, vec![1, 2]);
    }

    #[tokio::test]
    async fn injected_failures_are_transient_and_finite() {
        let bus = MemoryBus::new();
        bus.fail_next_publishes(2);

        let first = bus.publish("e", &[], false).await.unwrap_err();
        assert!(first.is_transient());
        assert!(bus.publish("e", &[], false).await.is_err());
        bus.publish("e", &[], false).await.unwrap();

        assert_eq!(bus.published().len(), 1);
    }

    #[tokio::test]
    async fn records_responses() {
        let bus = MemoryBus::new();
        bus.respond(9, &[7, 7]).await.unwrap();
        assert_eq!(bus.responses(), vec![(9, vec![7, 7])]);
    }
}
