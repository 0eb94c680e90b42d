// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! SPDM measurement-transcript wrapper.
//!
//! A raw NSM token request is carried to the token server as a synthetic
//! GET_MEASUREMENTS request/response transcript: fixed opcode/version bytes,
//! a random request nonce, then a mirrored response template whose
//! length-prefixed measurement block embeds the payload, a random response
//! nonce, and a zero opaque-data length. All multi-byte lengths are
//! little-endian.

use crate::error::WireError;
use rand::rngs::OsRng;
use rand::RngCore;

/// Fixed wrapper cost in bytes on top of the payload.
pub const TRANSCRIPT_OVERHEAD: usize = 86;

const NONCE_LEN: usize = 32;
/// DMTF measurement field overhead inside the record.
const DMTF_OVERHEAD: usize = 3;
/// Measurement record header overhead.
const RECORD_OVERHEAD: usize = 4;

/// Wrap `payload` in the measurement transcript format.
///
/// Fails with `Oversize` when the wrapped output would not fit the 16-bit
/// length fields, and with `Entropy` when the OS randomness source fails;
/// nonces are never silently zero-filled.
pub fn wrap_transcript(payload: &[u8]) -> Result<Vec<u8>, WireError> {
    let max = u16::MAX as usize - TRANSCRIPT_OVERHEAD;
    if payload.len() > max {
        return Err(WireError::Oversize { len: payload.len(), max });
    }

    let mut request_nonce = [0u8; NONCE_LEN];
    let mut response_nonce = [0u8; NONCE_LEN];
    OsRng
        .try_fill_bytes(&mut request_nonce)
        .and_then(|()| OsRng.try_fill_bytes(&mut response_nonce))
        .map_err(|e| WireError::Entropy(e.to_string()))?;

    let measurement_len = payload.len() + DMTF_OVERHEAD;
    let record_len = measurement_len + RECORD_OVERHEAD;

    let mut wrapped = Vec::with_capacity(payload.len() + TRANSCRIPT_OVERHEAD);
    // request: version 1.1, GET_MEASUREMENTS, params
    wrapped.extend_from_slice(&[0x11, 0xE0, 0x02, 0x32]);
    wrapped.extend_from_slice(&request_nonce);
    wrapped.push(0x00); // slot id
    // response template: version 1.1, MEASUREMENTS, params
    wrapped.extend_from_slice(&[0x11, 0x60, 0x00, 0x00]);
    wrapped.push(0x01); // number of blocks
    wrapped.extend_from_slice(&(record_len as u32).to_le_bytes()[..3]); // uint24 record length
    wrapped.push(0x32); // measurement index
    wrapped.push(0x01); // measurement specification
    wrapped.extend_from_slice(&(measurement_len as u16).to_le_bytes());
    wrapped.push(0x85); // DMTF measurement value type
    wrapped.extend_from_slice(&(payload.len() as u16).to_le_bytes());
    wrapped.extend_from_slice(payload);
    wrapped.extend_from_slice(&response_nonce);
    wrapped.extend_from_slice(&[0x00, 0x00]); // opaque data length
    Ok(wrapped)
}

#[cfg(test)]
#[path = "transcript_tests.rs"]
mod tests;
