// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use dt_core::token_status::{FuseType, InstallStatus};
use yare::parameterized;

/// Build an RX field: eight filler bytes, the error code, then `data` bytes.
fn rx_field(error_code: u8, data: &[u8]) -> String {
    let mut tokens: Vec<String> = (0u8..8).map(|b| format!("{b:02x}")).collect();
    tokens.push(format!("{error_code:02x}"));
    tokens.extend(data.iter().map(|b| format!("{b:02x}")));
    tokens.join(" ")
}

fn v1_data() -> Vec<u8> {
    vec![0x01, 0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08, 0x01]
}

#[test]
fn status_line_splits_four_fields() {
    let line = parse_status_line("12;2;aa bb;cc dd").expect("parse failed");
    assert_eq!(line.eid, 12);
    assert_eq!(line.version, 2);
    assert_eq!(line.tx, "aa bb");
    assert_eq!(line.rx, "cc dd");
}

#[test]
fn status_line_extra_fields_ignored() {
    let line = parse_status_line("3;1;tx;rx;junk").expect("parse failed");
    assert_eq!(line.eid, 3);
    assert_eq!(line.rx, "rx");
}

#[parameterized(
    empty = { "" },
    three_fields = { "1;2;tx" },
    non_decimal_eid = { "x;1;tx;rx" },
    non_decimal_version = { "1;v2;tx;rx" },
    hex_eid = { "0x10;1;tx;rx" },
)]
fn status_line_malformed(line: &str) {
    assert!(matches!(parse_status_line(line), Err(WireError::MalformedLine(_))));
}

#[test]
fn record_v1_decodes() {
    let status = parse_status_record(&rx_field(0x00, &v1_data()), 1).expect("decode failed");
    assert_eq!(status.install_status, InstallStatus::Installed);
    assert_eq!(status.fuse_type, FuseType::Debug);
    assert!(status.v2.is_none());
}

#[test]
fn record_v2_decodes() {
    let mut data = v1_data();
    data.extend_from_slice(&[0u8; 14]);
    let status = parse_status_record(&rx_field(0x00, &data), 2).expect("decode failed");
    assert!(status.v2.is_some());
}

#[test]
fn record_error_codes() {
    assert_eq!(parse_status_record(&rx_field(0x05, &v1_data()), 1), Err(StatusError::Unsupported));
    assert_eq!(
        parse_status_record(&rx_field(0x7f, &v1_data()), 1),
        Err(StatusError::Device { code: 0x7f })
    );
}

#[test]
fn record_bad_hex_token() {
    let rx = format!("{} zz", rx_field(0x00, &v1_data()[..9]));
    assert!(matches!(parse_status_record(&rx, 1), Err(StatusError::BadToken(_))));
}

#[test]
fn record_unknown_version() {
    assert_eq!(
        parse_status_record(&rx_field(0x00, &v1_data()), 3),
        Err(StatusError::UnknownVersion(3))
    );
}

#[test]
fn record_missing_error_code() {
    let rx = (0u8..8).map(|b| format!("{b:02x}")).collect::<Vec<_>>().join(" ");
    assert!(matches!(parse_status_record(&rx, 1), Err(StatusError::MalformedLength { .. })));
}

#[test]
fn record_length_grid() {
    // every post-error-code length in 0..=30 except the exact record sizes
    for len in 0..=30usize {
        let data = vec![0u8; len];
        for (version, valid) in [(1u32, 10usize), (2u32, 24usize)] {
            let result = parse_status_record(&rx_field(0x00, &data), version);
            if len == valid {
                assert!(result.is_ok(), "v{version} length {len} should decode");
            } else {
                assert_eq!(
                    result,
                    Err(StatusError::MalformedLength { len, expected: valid }),
                    "v{version} length {len} should be rejected"
                );
            }
        }
    }
}

#[test]
fn merge_keeps_per_eid_outcomes() {
    let output = format!(
        "1;1;tx;{}\n2;1;tx;{}",
        rx_field(0x00, &v1_data()),
        rx_field(0x7f, &v1_data())
    );
    let map = merge_status_map(&output);
    assert_eq!(map.len(), 2);
    assert!(map[&1].is_ok());
    assert_eq!(map[&2], Err(StatusError::Device { code: 0x7f }));
}

#[test]
fn merge_success_supersedes_failure() {
    let output = format!(
        "7;1;tx;{}\n7;1;tx;{}",
        rx_field(0x7f, &v1_data()),
        rx_field(0x00, &v1_data())
    );
    let map = merge_status_map(&output);
    assert!(map[&7].is_ok());
}

#[test]
fn merge_never_downgrades_success() {
    let output = format!(
        "7;1;tx;{}\n7;1;tx;{}\n7;1;tx;{}",
        rx_field(0x00, &v1_data()),
        rx_field(0x7f, &v1_data()),
        rx_field(0x00, &[0xAA; 3]) // malformed length
    );
    let map = merge_status_map(&output);
    assert!(map[&7].is_ok(), "a decoded status must never be downgraded");
}

#[test]
fn merge_keeps_first_failure_over_later_failure() {
    let output = format!(
        "7;1;tx;{}\n7;1;tx;{}",
        rx_field(0x05, &v1_data()),
        rx_field(0x7f, &v1_data())
    );
    let map = merge_status_map(&output);
    assert_eq!(map[&7], Err(StatusError::Unsupported));
}

#[test]
fn merge_skips_unsplittable_lines() {
    let output = format!("garbage\n\n5;1;tx;{}", rx_field(0x00, &v1_data()));
    let map = merge_status_map(&output);
    assert_eq!(map.len(), 1);
    assert!(map[&5].is_ok());
}
