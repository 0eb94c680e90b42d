// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use proptest::prelude::*;

#[test]
fn header_layout_is_little_endian() {
    let out = add_request_header(&[0xAA, 0xBB]).expect("header failed");
    assert_eq!(out, vec![0x01, 0x00, 0x06, 0x00, 0xAA, 0xBB]);
}

#[test]
fn parse_short_buffer_is_none() {
    assert_eq!(RequestHeader::parse(&[0x01, 0x00, 0x06]), None);
}

#[test]
fn oversize_payload_rejected() {
    let max = u16::MAX as usize - REQUEST_HEADER_LEN;
    assert!(add_request_header(&vec![0u8; max]).is_ok());
    assert!(matches!(
        add_request_header(&vec![0u8; max + 1]),
        Err(WireError::Oversize { .. })
    ));
}

proptest! {
    #[test]
    fn round_trip(payload in proptest::collection::vec(any::<u8>(), 0..512)) {
        let out = add_request_header(&payload).expect("header failed");
        let header = RequestHeader::parse(&out).expect("parse failed");
        prop_assert_eq!(header.version, REQUEST_HEADER_VERSION);
        prop_assert_eq!(header.size as usize, REQUEST_HEADER_LEN + payload.len());
        prop_assert_eq!(&out[REQUEST_HEADER_LEN..], payload.as_slice());
    }
}
