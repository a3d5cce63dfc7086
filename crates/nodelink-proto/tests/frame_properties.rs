//! Property-based tests for frame packing and one-shot decoding.

use nodelink_proto::{CURRENT_VERSION, crc16_ccitt, frame};
use proptest::prelude::*;

#[test]
fn crc16_test_vector() {
    assert_eq!(crc16_ccitt(b"123456789"), 0x29B1);
}

proptest! {
    #[test]
    fn pack_decode_round_trip(
        command: u16,
        address: u16,
        payload in prop::collection::vec(any::<u8>(), 0..4096),
    ) {
        let packed = frame::pack(command, &payload, address);
        let (decoded, consumed) = frame::decode_one(&packed, 4096).expect("decodes");
        prop_assert_eq!(consumed, packed.len());
        prop_assert_eq!(decoded.version, CURRENT_VERSION);
        prop_assert_eq!(decoded.address, address);
        prop_assert_eq!(decoded.command, command);
        prop_assert_eq!(decoded.payload, payload);
    }
}
