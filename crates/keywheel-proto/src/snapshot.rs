//! Snapshot payload for `retrieve-keys` queries.

use serde::{Deserialize, Serialize};

use crate::errors::ProtocolError;

/// Point-in-time view of the key window, sent as the direct reply to a
/// `retrieve-keys` query.
///
/// `keys` holds full key bytes (name ‖ material) in window order, newest
/// first. `default` holds the name of the currently active key, or `None`
/// while the window is still populating during bootstrap. Requesters match
/// `default` against the name portion of each entry in `keys`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotResponse {
    /// Name of the current default key, absent before bootstrap completes.
    pub default: Option<Vec<u8>>,
    /// Full key bytes in window order, newest first.
    pub keys: Vec<Vec<u8>>,
}

impl SnapshotResponse {
    /// Encode to CBOR.
    pub fn encode(&self) -> Result<Vec<u8>, ProtocolError> {
        let mut buf = Vec::new();
        ciborium::ser::into_writer(self, &mut buf)
            .map_err(|e| ProtocolError::Encode(e.to_string()))?;
        Ok(buf)
    }

    /// Decode from CBOR.
    pub fn decode(bytes: &[u8]) -> Result<Self, ProtocolError> {
        ciborium::de::from_reader(bytes).map_err(|e| ProtocolError::Decode(e.to_string()))
    }
}
