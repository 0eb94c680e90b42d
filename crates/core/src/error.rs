// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Failure taxonomy for token operations.
//!
//! Every failure is resolved locally into one terminal status delivered
//! through the single completion callback, or into a pre-flight rejection
//! before any bus traffic. Nothing escapes as an unhandled fault.

use std::time::Duration;
use thiserror::Error;

/// Classified failure of a token operation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum OperationError {
    /// The IPC call itself failed; surfaced as an internal failure.
    #[error("transport error: {0}")]
    Transport(String),

    /// The deadline elapsed before a terminal status was observed.
    #[error("operation timed out after {0:?}")]
    Timeout(Duration),

    /// A status payload had the wrong shape; degrades to an error status,
    /// never a crash.
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    /// The argument shape does not match the requested operation; rejected
    /// before any IPC call is made.
    #[error("invalid argument for {operation}")]
    InvalidArgument { operation: String },

    /// No object implements the debug-token capability for the chassis.
    #[error("no debug-token object for chassis {chassis}")]
    ResourceNotFound { chassis: String },

    /// The single-flight invariant would be violated; the caller should
    /// retry after the reported duration rather than being queued.
    #[error("operation already in progress, retry after {retry_after:?}")]
    AlreadyInProgress { retry_after: Duration },
}
