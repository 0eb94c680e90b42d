// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! VDM status text wrapper format.
//!
//! The status utility emits one line per device:
//! `EID;VERSION;TX_HEX;RX_HEX`. `RX_HEX` is a space-separated sequence of
//! two-hex-digit byte tokens; byte 8 is the error/availability code and the
//! remaining bytes form the structured status record (10 bytes for version
//! 1, 24 for version 2).

use crate::error::{StatusError, WireError};
use dt_core::token_status::{VdmTokenStatus, STATUS_RECORD_V1_LEN, STATUS_RECORD_V2_LEN};
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

const ERROR_CODE_INDEX: usize = 8;
const ERROR_CODE_SUCCESS: u8 = 0x00;
const ERROR_CODE_NOT_SUPPORTED: u8 = 0x05;

/// One split line of status-utility output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusLine {
    pub eid: i32,
    pub version: u32,
    pub tx: String,
    pub rx: String,
}

/// Decode result for one device: a status record, or why it could not be
/// decoded.
pub type TokenStatusOutcome = Result<VdmTokenStatus, StatusError>;

/// Split a `;`-delimited status line into its four fields.
pub fn parse_status_line(line: &str) -> Result<StatusLine, WireError> {
    let mut fields = line.split(';');
    let (Some(eid), Some(version), Some(tx), Some(rx)) =
        (fields.next(), fields.next(), fields.next(), fields.next())
    else {
        return Err(WireError::MalformedLine(line.to_string()));
    };
    let eid: i32 =
        eid.trim().parse().map_err(|_| WireError::MalformedLine(line.to_string()))?;
    let version: u32 =
        version.trim().parse().map_err(|_| WireError::MalformedLine(line.to_string()))?;
    Ok(StatusLine { eid, version, tx: tx.to_string(), rx: rx.to_string() })
}

/// Decode the `RX_HEX` field of a status line into a typed record.
pub fn parse_status_record(rx: &str, version: u32) -> Result<VdmTokenStatus, StatusError> {
    let expected = match version {
        1 => STATUS_RECORD_V1_LEN,
        2 => STATUS_RECORD_V2_LEN,
        other => return Err(StatusError::UnknownVersion(other)),
    };

    let tokens: Vec<&str> = rx.split_whitespace().collect();
    if tokens.len() <= ERROR_CODE_INDEX {
        return Err(StatusError::MalformedLength { len: tokens.len(), expected });
    }

    let error_code = parse_hex_byte(tokens[ERROR_CODE_INDEX])?;
    match error_code {
        ERROR_CODE_SUCCESS => {}
        ERROR_CODE_NOT_SUPPORTED => return Err(StatusError::Unsupported),
        code => return Err(StatusError::Device { code }),
    }

    let mut data = Vec::with_capacity(tokens.len() - ERROR_CODE_INDEX - 1);
    for token in &tokens[ERROR_CODE_INDEX + 1..] {
        data.push(parse_hex_byte(token)?);
    }
    if data.len() != expected {
        return Err(StatusError::MalformedLength { len: data.len(), expected });
    }

    match version {
        1 => {
            let bytes: [u8; STATUS_RECORD_V1_LEN] = data
                .as_slice()
                .try_into()
                .map_err(|_| StatusError::MalformedLength { len: data.len(), expected })?;
            Ok(VdmTokenStatus::from_v1_bytes(&bytes))
        }
        _ => {
            let bytes: [u8; STATUS_RECORD_V2_LEN] = data
                .as_slice()
                .try_into()
                .map_err(|_| StatusError::MalformedLength { len: data.len(), expected })?;
            Ok(VdmTokenStatus::from_v2_bytes(&bytes))
        }
    }
}

/// Parse a batch of status lines into a per-EID outcome map.
///
/// When several lines share an EID, a line that decoded to a status record
/// supersedes an earlier one that did not, never the reverse. Lines that do
/// not even split are logged and skipped; the batch itself never aborts.
pub fn merge_status_map(output: &str) -> BTreeMap<i32, TokenStatusOutcome> {
    let mut map: BTreeMap<i32, TokenStatusOutcome> = BTreeMap::new();
    for line in output.lines() {
        if line.trim().is_empty() {
            continue;
        }
        let parsed = match parse_status_line(line) {
            Ok(p) => p,
            Err(e) => {
                tracing::warn!(error = %e, "skipping malformed status line");
                continue;
            }
        };
        let outcome = parse_status_record(&parsed.rx, parsed.version);
        match map.entry(parsed.eid) {
            Entry::Occupied(mut prev) => {
                if prev.get().is_err() && outcome.is_ok() {
                    prev.insert(outcome);
                }
            }
            Entry::Vacant(slot) => {
                slot.insert(outcome);
            }
        }
    }
    map
}

fn parse_hex_byte(token: &str) -> Result<u8, StatusError> {
    u8::from_str_radix(token, 16).map_err(|_| StatusError::BadToken(token.to_string()))
}

#[cfg(test)]
#[path = "status_text_tests.rs"]
mod tests;
