//! TCP client for the cluster-bus endpoint.
//!
//! Speaks the length-prefixed CBOR framing from [`keywheel_proto`]: every
//! request carries a fresh seq and is acknowledged by an `Ack` frame with
//! the same seq in its envelope; inbound queries arrive unsolicited with
//! seq 0 once the `query` stream is subscribed.
//!
//! A single reader task owns the read half, dispatching acks to pending
//! requests and queries to an mpsc channel. Writers share the write half
//! behind an async mutex so concurrent publishes and replies interleave at
//! frame granularity.

use std::{
    collections::HashMap,
    sync::{
        Arc, Mutex,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use keywheel_core::{BusError, ClusterBus, InboundQuery};
use keywheel_proto::{
    AgentFrame, ClientFrame, LEN_PREFIX_SIZE, decode_frame, encode_frame, frame_len,
};
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::{
        TcpStream,
        tcp::{OwnedReadHalf, OwnedWriteHalf},
    },
    sync::{mpsc, oneshot},
};

/// Pending acknowledgements, keyed by request seq.
///
/// The oneshot carries the endpoint's error string, `None` on success.
/// Dropping a sender (reader task exit) wakes the waiter with a
/// disconnect.
type PendingAcks = Arc<Mutex<HashMap<u64, oneshot::Sender<Option<String>>>>>;

/// Production cluster-bus client.
pub struct TcpBus {
    writer: tokio::sync::Mutex<OwnedWriteHalf>,
    pending: PendingAcks,
    seq: AtomicU64,
    timeout: Option<Duration>,
}

impl TcpBus {
    /// Connect, authenticate, and subscribe to the query stream.
    ///
    /// Returns the bus handle plus the channel of inbound queries. The
    /// configured `timeout` bounds every request round trip, including the
    /// handshake; `None` disables deadlines.
    pub async fn connect(
        addr: &str,
        auth: Option<String>,
        timeout: Option<Duration>,
    ) -> Result<(Arc<Self>, mpsc::Receiver<InboundQuery>), BusError> {
        let connect = TcpStream::connect(addr);
        let stream = match timeout {
            Some(limit) => tokio::time::timeout(limit, connect)
                .await
                .map_err(|_| BusError::Timeout(limit))?,
            None => connect.await,
        }
        .map_err(|e| BusError::Io(e.to_string()))?;

        let (read_half, write_half) = stream.into_split();
        let pending: PendingAcks = Arc::new(Mutex::new(HashMap::new()));
        let (query_tx, query_rx) = mpsc::channel(64);

        tokio::spawn(reader_loop(read_half, Arc::clone(&pending), query_tx));

        let bus = Arc::new(Self {
            writer: tokio::sync::Mutex::new(write_half),
            pending,
            seq: AtomicU64::new(0),
            timeout,
        });

        bus.request("handshake", ClientFrame::Handshake { auth }).await?;
        bus.request("subscribe", ClientFrame::Subscribe { stream: "query".to_string() }).await?;

        Ok((bus, query_rx))
    }

    /// Send one frame and wait for its acknowledgement.
    #[allow(clippy::expect_used)]
    async fn request(&self, name: &str, frame: ClientFrame) -> Result<(), BusError> {
        // Seq 0 is reserved for unsolicited endpoint frames.
        let seq = self.seq.fetch_add(1, Ordering::Relaxed) + 1;

        let (ack_tx, ack_rx) = oneshot::channel();
        {
            let mut pending = self.pending.lock().expect("pending map poisoned");
            pending.insert(seq, ack_tx);
        }

        let mut buf = Vec::new();
        if let Err(e) = encode_frame(seq, &frame, &mut buf) {
            self.forget(seq);
            return Err(e.into());
        }

        {
            let mut writer = self.writer.lock().await;
            if let Err(e) = writer.write_all(&buf).await {
                self.forget(seq);
                return Err(BusError::Io(e.to_string()));
            }
        }

        let ack = match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, ack_rx).await {
                Ok(result) => result,
                Err(_) => {
                    self.forget(seq);
                    return Err(BusError::Timeout(limit));
                },
            },
            None => ack_rx.await,
        };

        match ack {
            Ok(None) => Ok(()),
            Ok(Some(reason)) => Err(BusError::Rejected { name: name.to_string(), reason }),
            Err(_) => Err(BusError::Disconnected("endpoint closed".to_string())),
        }
    }

    /// Drop a pending ack entry (send failed or timed out).
    #[allow(clippy::expect_used)]
    fn forget(&self, seq: u64) {
        self.pending.lock().expect("pending map poisoned").remove(&seq);
    }
}

#[async_trait]
impl ClusterBus for TcpBus {
    async fn publish(&self, name: &str, payload: &[u8], coalesce: bool) -> Result<(), BusError> {
        self.request(
            name,
            ClientFrame::Publish { name: name.to_string(), payload: payload.to_vec(), coalesce },
        )
        .await
    }

    async fn respond(&self, query_id: u64, payload: &[u8]) -> Result<(), BusError> {
        self.request("respond", ClientFrame::Respond { query_id, payload: payload.to_vec() })
            .await
    }
}

/// Read frames until the connection drops, dispatching acks and queries.
#[allow(clippy::expect_used)]
async fn reader_loop(
    mut read: OwnedReadHalf,
    pending: PendingAcks,
    queries: mpsc::Sender<InboundQuery>,
) {
    loop {
        let mut prefix = [0u8; LEN_PREFIX_SIZE];
        if read.read_exact(&mut prefix).await.is_err() {
            tracing::debug!("bus connection closed");
            break;
        }

        let len = match frame_len(prefix) {
            Ok(len) => len,
            Err(e) => {
                tracing::warn!(error = %e, "bus endpoint sent oversized frame");
                break;
            },
        };

        let mut body = vec![0u8; len];
        if read.read_exact(&mut body).await.is_err() {
            tracing::debug!("bus connection closed mid-frame");
            break;
        }

        match decode_frame::<AgentFrame>(&body) {
            Ok((seq, AgentFrame::Ack { error })) => {
                let waiter = pending.lock().expect("pending map poisoned").remove(&seq);
                match waiter {
                    // Send fails only if the requester gave up (timeout).
                    Some(ack_tx) => drop(ack_tx.send(error)),
                    None => tracing::warn!(seq, "ack for unknown request"),
                }
            },
            Ok((_, AgentFrame::Query { query_id, name, payload })) => {
                let query = InboundQuery { id: query_id, name, payload };
                if queries.send(query).await.is_err() {
                    tracing::debug!("query channel closed, stopping reader");
                    break;
                }
            },
            Err(e) => {
                tracing::warn!(error = %e, "malformed frame from bus endpoint");
                break;
            },
        }
    }

    // Wake every in-flight request with a disconnect: dropping the senders
    // makes their receivers resolve to an error.
    pending.lock().expect("pending map poisoned").clear();
}
