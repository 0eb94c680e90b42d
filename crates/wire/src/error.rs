// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Codec failure types.

use thiserror::Error;

/// Failure while encoding or splitting wire data.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WireError {
    /// The payload does not fit the format's length fields.
    #[error("payload of {len} bytes exceeds the {max}-byte limit")]
    Oversize { len: usize, max: usize },

    /// The randomness source failed; nonces are never zero-filled.
    #[error("entropy source failed: {0}")]
    Entropy(String),

    /// A status line does not have the `EID;VERSION;TX;RX` shape.
    #[error("malformed status line: {0}")]
    MalformedLine(String),
}

/// Failure while decoding one status record.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StatusError {
    /// The device reported the query is not supported (error code 0x05).
    #[error("device does not support the status query")]
    Unsupported,

    /// The device reported a non-zero error code.
    #[error("device error code {code:#04x}")]
    Device { code: u8 },

    /// The assembled record does not match any known layout.
    #[error("status record of {len} bytes, expected {expected}")]
    MalformedLength { len: usize, expected: usize },

    /// A token is not a two-digit hex byte.
    #[error("bad hex token {0:?}")]
    BadToken(String),

    /// The line names a record version this decoder does not know.
    #[error("unknown status record version {0}")]
    UnknownVersion(u32),
}
