//! Agent-endpoint framing.
//!
//! The agent talks to its local cluster-bus endpoint over a stream
//! transport. Each frame is a u32 big-endian length prefix followed by the
//! CBOR encoding of `(seq, body)`. Sequence numbers correlate requests with
//! acknowledgements; unsolicited frames (inbound queries) carry seq 0.
//!
//! This framing is an interface-boundary convenience for the out-of-process
//! bus endpoint, not a cluster protocol: membership, gossip, and delivery
//! retries all live on the far side of it.

use serde::{Deserialize, Serialize, de::DeserializeOwned};

use crate::errors::ProtocolError;

/// Size of the length prefix preceding every frame.
pub const LEN_PREFIX_SIZE: usize = 4;

/// Maximum frame body size. Frames declaring more are rejected before any
/// allocation happens.
pub const MAX_FRAME_LEN: usize = 4 * 1024 * 1024;

/// Frames sent by the agent to the bus endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClientFrame {
    /// Opens the session, optionally authenticating.
    Handshake {
        /// Shared auth token, if the endpoint requires one.
        auth: Option<String>,
    },

    /// Broadcast a named event to the cluster.
    Publish {
        /// Full (prefixed) event name.
        name: String,
        /// Raw event payload.
        payload: Vec<u8>,
        /// Whether duplicate-suppression/ordering relaxation is acceptable.
        coalesce: bool,
    },

    /// Subscribe to an event stream ("query" is the only stream the agent
    /// uses).
    Subscribe {
        /// Stream name.
        stream: String,
    },

    /// Direct reply to a specific query by correlation id.
    Respond {
        /// Correlation id from the [`AgentFrame::Query`] being answered.
        query_id: u64,
        /// Reply payload.
        payload: Vec<u8>,
    },
}

/// Frames sent by the bus endpoint to the agent.
///
/// An `Ack` carries the acknowledged request's seq in its envelope; `Query`
/// frames are unsolicited and carry envelope seq 0.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AgentFrame {
    /// Acknowledges the client frame whose seq is in this frame's envelope.
    Ack {
        /// Failure reason, if the request was not applied.
        error: Option<String>,
    },

    /// An inbound cluster query (after `Subscribe { stream: "query" }`).
    Query {
        /// Correlation id for the eventual [`ClientFrame::Respond`].
        query_id: u64,
        /// Full (prefixed) query name.
        name: String,
        /// Query payload (unused by keywheel queries).
        payload: Vec<u8>,
    },
}

/// Encode `(seq, body)` as a length-prefixed frame appended to `buf`.
pub fn encode_frame<T: Serialize>(
    seq: u64,
    body: &T,
    buf: &mut Vec<u8>,
) -> Result<(), ProtocolError> {
    let mut cbor = Vec::new();
    ciborium::ser::into_writer(&(seq, body), &mut cbor)
        .map_err(|e| ProtocolError::Encode(e.to_string()))?;

    if cbor.len() > MAX_FRAME_LEN {
        return Err(ProtocolError::Oversize { len: cbor.len(), max: MAX_FRAME_LEN });
    }

    buf.extend_from_slice(&(cbor.len() as u32).to_be_bytes());
    buf.extend_from_slice(&cbor);
    Ok(())
}

/// Decode a frame body (the bytes after the length prefix) into
/// `(seq, body)`.
pub fn decode_frame<T: DeserializeOwned>(bytes: &[u8]) -> Result<(u64, T), ProtocolError> {
    ciborium::de::from_reader(bytes).map_err(|e| ProtocolError::Decode(e.to_string()))
}

/// Validate a length prefix and return the frame body length.
pub fn frame_len(prefix: [u8; LEN_PREFIX_SIZE]) -> Result<usize, ProtocolError> {
    let len = u32::from_be_bytes(prefix) as usize;
    if len > MAX_FRAME_LEN {
        return Err(ProtocolError::Oversize { len, max: MAX_FRAME_LEN });
    }
    Ok(len)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_frame_round_trip() {
        let frame = ClientFrame::Publish {
            name: "keywheel:install-key".to_string(),
            payload: vec![1, 2, 3],
            coalesce: false,
        };

        let mut buf = Vec::new();
        encode_frame(7, &frame, &mut buf).unwrap();

        let len = frame_len([buf[0], buf[1], buf[2], buf[3]]).unwrap();
        assert_eq!(len, buf.len() - LEN_PREFIX_SIZE);

        let (seq, decoded): (u64, ClientFrame) = decode_frame(&buf[LEN_PREFIX_SIZE..]).unwrap();
        assert_eq!(seq, 7);
        assert_eq!(decoded, frame);
    }

    #[test]
    fn agent_frame_round_trip() {
        let frame =
            AgentFrame::Query { query_id: 42, name: "keywheel:retrieve-keys".to_string(), payload: Vec::new() };

        let mut buf = Vec::new();
        encode_frame(0, &frame, &mut buf).unwrap();
        let (seq, decoded): (u64, AgentFrame) = decode_frame(&buf[LEN_PREFIX_SIZE..]).unwrap();
        assert_eq!(seq, 0);
        assert_eq!(decoded, frame);
    }

    #[test]
    fn oversize_prefix_rejected() {
        let prefix = ((MAX_FRAME_LEN as u32) + 1).to_be_bytes();
        assert!(matches!(frame_len(prefix), Err(ProtocolError::Oversize { .. })));
    }

    #[test]
    fn truncated_body_rejected() {
        let frame = AgentFrame::Ack { error: None };
        let mut buf = Vec::new();
        encode_frame(1, &frame, &mut buf).unwrap();

        let truncated = &buf[LEN_PREFIX_SIZE..buf.len() - 1];
        let result: Result<(u64, AgentFrame), _> = decode_frame(truncated);
        assert!(result.is_err());
    }
}
