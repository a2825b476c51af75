//! Fuzz target for snapshot payload decoding
//!
//! # Strategy
//!
//! - Random bytes through the CBOR decoder (malformed, truncated, nested)
//! - Structured inputs re-encoded to verify round-trip stability
//!
//! # Invariants
//!
//! - Malformed CBOR returns an error, NEVER panics
//! - Valid snapshots round trip byte-identically through decode → encode

#![no_main]

use arbitrary::Arbitrary;
use keywheel_proto::SnapshotResponse;
use libfuzzer_sys::fuzz_target;

#[derive(Debug, Arbitrary)]
struct Input {
    raw: Vec<u8>,
    default: Option<Vec<u8>>,
    keys: Vec<Vec<u8>>,
}

fuzz_target!(|input: Input| {
    let _ = SnapshotResponse::decode(&input.raw);

    let snapshot = SnapshotResponse { default: input.default, keys: input.keys };
    let encoded = snapshot.encode().expect("encoding plain data must succeed");
    let decoded = SnapshotResponse::decode(&encoded).expect("round trip must decode");
    assert_eq!(decoded, snapshot);
});
