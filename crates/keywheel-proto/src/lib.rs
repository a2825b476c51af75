//! Keywheel wire surface.
//!
//! Everything that crosses a process boundary lives here: the lifecycle
//! event names broadcast on the cluster bus, the CBOR snapshot payload
//! returned to `retrieve-keys` queries, and the length-prefixed frames the
//! agent exchanges with its local cluster-bus endpoint.
//!
//! Event payloads themselves stay raw bytes (a key name, or name ‖ material)
//! so cluster members can apply them without a CBOR decoder. Structured
//! payloads use CBOR because it's self-describing (field names embedded),
//! compact, and doesn't need code generation.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod errors;
mod events;
mod snapshot;
mod wire;

pub use errors::ProtocolError;
pub use events::{
    INSTALL_KEY_EVENT, NAME_LEN, REMOVE_KEY_EVENT, RETRIEVE_KEYS_QUERY, SET_DEFAULT_KEY_EVENT,
    WIPE_KEYS_EVENT, prefixed,
};
pub use snapshot::SnapshotResponse;
pub use wire::{
    AgentFrame, ClientFrame, LEN_PREFIX_SIZE, MAX_FRAME_LEN, decode_frame, encode_frame,
    frame_len,
};
