// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Status vocabularies observed while tracking a long-running operation.
//!
//! Two distinct vocabularies flow through the same tracking pattern: the
//! async-operation statuses (`com.nvidia.Async.Status`) consumed by the
//! generic tracker, and the progress statuses
//! (`xyz.openbmc_project.Common.Progress`) consumed by targeted token
//! operations.

use std::fmt;

const ASYNC_STATUS_PREFIX: &str = "com.nvidia.Async.Status.AsyncOperationStatus.";

/// Terminal and non-terminal states of a generic async operation.
///
/// Every value except `InProgress` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AsyncStatus {
    InProgress,
    Success,
    Timeout,
    InternalFailure,
    ResourceNotFound,
    Unavailable,
    UnsupportedRequest,
    WriteFailure,
}

impl AsyncStatus {
    /// Parse the transport's dotted enum string, e.g.
    /// `com.nvidia.Async.Status.AsyncOperationStatus.InProgress`.
    ///
    /// The bare final segment is also accepted. Unknown strings return `None`
    /// and are treated as a malformed response by callers.
    pub fn parse(s: &str) -> Option<AsyncStatus> {
        let tail = s.strip_prefix(ASYNC_STATUS_PREFIX).unwrap_or(s);
        match tail {
            "InProgress" => Some(AsyncStatus::InProgress),
            "Success" => Some(AsyncStatus::Success),
            "Timeout" => Some(AsyncStatus::Timeout),
            "InternalFailure" => Some(AsyncStatus::InternalFailure),
            "ResourceNotFound" => Some(AsyncStatus::ResourceNotFound),
            "Unavailable" => Some(AsyncStatus::Unavailable),
            "UnsupportedRequest" => Some(AsyncStatus::UnsupportedRequest),
            "WriteFailure" => Some(AsyncStatus::WriteFailure),
            _ => None,
        }
    }

    /// Every status except `InProgress` completes the operation.
    pub fn is_terminal(self) -> bool {
        !matches!(self, AsyncStatus::InProgress)
    }

    /// The transport's full dotted enum string for this status.
    pub fn as_dbus_str(self) -> String {
        format!("{ASYNC_STATUS_PREFIX}{self}")
    }
}

impl fmt::Display for AsyncStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AsyncStatus::InProgress => "InProgress",
            AsyncStatus::Success => "Success",
            AsyncStatus::Timeout => "Timeout",
            AsyncStatus::InternalFailure => "InternalFailure",
            AsyncStatus::ResourceNotFound => "ResourceNotFound",
            AsyncStatus::Unavailable => "Unavailable",
            AsyncStatus::UnsupportedRequest => "UnsupportedRequest",
            AsyncStatus::WriteFailure => "WriteFailure",
        };
        f.write_str(s)
    }
}

/// Progress states reported by targeted token operations.
///
/// Matched on the final dotted segment of the property value, so both the
/// short and the fully qualified form are accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressStatus {
    InProgress,
    Completed,
    Aborted,
    Failed,
    /// A status outside the known vocabulary; carried for logging.
    Other(String),
}

impl ProgressStatus {
    /// Parse a progress property value by its final dotted segment.
    pub fn parse(s: &str) -> ProgressStatus {
        let tail = s.rsplit('.').next().unwrap_or(s);
        match tail {
            "InProgress" => ProgressStatus::InProgress,
            "Completed" => ProgressStatus::Completed,
            "Aborted" => ProgressStatus::Aborted,
            "Failed" => ProgressStatus::Failed,
            other => ProgressStatus::Other(other.to_string()),
        }
    }
}

impl fmt::Display for ProgressStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProgressStatus::InProgress => f.write_str("InProgress"),
            ProgressStatus::Completed => f.write_str("Completed"),
            ProgressStatus::Aborted => f.write_str("Aborted"),
            ProgressStatus::Failed => f.write_str("Failed"),
            ProgressStatus::Other(s) => f.write_str(s),
        }
    }
}

#[cfg(test)]
#[path = "status_tests.rs"]
mod tests;
