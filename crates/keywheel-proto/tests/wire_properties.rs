//! Property-based tests for wire framing and the snapshot payload.
//!
//! Verify round-trip correctness for arbitrary inputs, not just specific
//! examples.

use keywheel_proto::{
    AgentFrame, ClientFrame, LEN_PREFIX_SIZE, SnapshotResponse, decode_frame, encode_frame,
    frame_len,
};
use proptest::prelude::*;

/// Strategy for arbitrary client frames.
fn arbitrary_client_frame() -> impl Strategy<Value = ClientFrame> {
    prop_oneof![
        prop::option::of("[a-z0-9]{0,32}")
            .prop_map(|auth| ClientFrame::Handshake { auth }),
        ("[a-z:-]{1,40}", prop::collection::vec(any::<u8>(), 0..256), any::<bool>())
            .prop_map(|(name, payload, coalesce)| ClientFrame::Publish { name, payload, coalesce }),
        "[a-z]{1,16}".prop_map(|stream| ClientFrame::Subscribe { stream }),
        (any::<u64>(), prop::collection::vec(any::<u8>(), 0..256))
            .prop_map(|(query_id, payload)| ClientFrame::Respond { query_id, payload }),
    ]
}

/// Strategy for arbitrary agent frames.
fn arbitrary_agent_frame() -> impl Strategy<Value = AgentFrame> {
    prop_oneof![
        prop::option::of(".{0,64}").prop_map(|error| AgentFrame::Ack { error }),
        (any::<u64>(), "[a-z:-]{1,40}", prop::collection::vec(any::<u8>(), 0..256))
            .prop_map(|(query_id, name, payload)| AgentFrame::Query { query_id, name, payload }),
    ]
}

proptest! {
    #[test]
    fn client_frame_round_trips(seq in any::<u64>(), frame in arbitrary_client_frame()) {
        let mut buf = Vec::new();
        encode_frame(seq, &frame, &mut buf).unwrap();

        let mut prefix = [0u8; LEN_PREFIX_SIZE];
        prefix.copy_from_slice(&buf[..LEN_PREFIX_SIZE]);
        let len = frame_len(prefix).unwrap();
        prop_assert_eq!(len, buf.len() - LEN_PREFIX_SIZE);

        let (decoded_seq, decoded): (u64, ClientFrame) =
            decode_frame(&buf[LEN_PREFIX_SIZE..]).unwrap();
        prop_assert_eq!(decoded_seq, seq);
        prop_assert_eq!(decoded, frame);
    }

    #[test]
    fn agent_frame_round_trips(seq in any::<u64>(), frame in arbitrary_agent_frame()) {
        let mut buf = Vec::new();
        encode_frame(seq, &frame, &mut buf).unwrap();

        let (decoded_seq, decoded): (u64, AgentFrame) =
            decode_frame(&buf[LEN_PREFIX_SIZE..]).unwrap();
        prop_assert_eq!(decoded_seq, seq);
        prop_assert_eq!(decoded, frame);
    }

    #[test]
    fn snapshot_round_trips(
        default in prop::option::of(prop::collection::vec(any::<u8>(), 16)),
        keys in prop::collection::vec(prop::collection::vec(any::<u8>(), 32), 0..8),
    ) {
        let resp = SnapshotResponse { default, keys };
        let bytes = resp.encode().unwrap();
        let decoded = SnapshotResponse::decode(&bytes).unwrap();
        prop_assert_eq!(decoded, resp);
    }

    #[test]
    fn arbitrary_bytes_never_panic_decode(bytes in prop::collection::vec(any::<u8>(), 0..512)) {
        // Malformed input must produce Err, never a panic.
        let _: Result<(u64, AgentFrame), _> = decode_frame(&bytes);
        let _ = SnapshotResponse::decode(&bytes);
    }
}
