//! Wire codec error types.

use thiserror::Error;

/// Errors from encoding or decoding wire data.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// CBOR encoding failed.
    #[error("encode error: {0}")]
    Encode(String),

    /// CBOR decoding failed (malformed or truncated input).
    #[error("decode error: {0}")]
    Decode(String),

    /// A frame declared a length beyond the protocol maximum.
    ///
    /// Rejected before allocation so a malicious peer can't make the agent
    /// reserve arbitrary memory.
    #[error("frame of {len} bytes exceeds maximum {max}")]
    Oversize {
        /// Declared frame length.
        len: usize,
        /// Protocol maximum ([`MAX_FRAME_LEN`](crate::MAX_FRAME_LEN)).
        max: usize,
    },
}
