//! Fuzz target for agent-endpoint frame decoding
//!
//! # Strategy
//!
//! - Random bytes: completely arbitrary frame bodies (general malformation)
//! - Length prefixes: arbitrary 4-byte prefixes through the length check
//! - Round trip: frames that decode must re-encode and decode identically
//!
//! # Invariants
//!
//! - Oversized declared lengths rejected before allocation
//! - Malformed CBOR returns an error, NEVER panics
//! - Decoded frames survive a re-encode round trip

#![no_main]

use keywheel_proto::{AgentFrame, ClientFrame, decode_frame, encode_frame, frame_len};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if data.len() >= 4 {
        let mut prefix = [0u8; 4];
        prefix.copy_from_slice(&data[..4]);
        let _ = frame_len(prefix);
    }

    if let Ok((seq, frame)) = decode_frame::<ClientFrame>(data) {
        let mut buf = Vec::new();
        encode_frame(seq, &frame, &mut buf).expect("re-encode of decoded frame must succeed");
        let (seq2, frame2): (u64, ClientFrame) =
            decode_frame(&buf[4..]).expect("round trip must decode");
        assert_eq!(seq, seq2);
        assert_eq!(frame, frame2);
    }

    let _ = decode_frame::<AgentFrame>(data);
});
