// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Endpoint lifecycle states and protocol variants.
//!
//! An endpoint advances `None → StatusAcquired → RequestAcquired` during a
//! normal exchange. `TokenInstalled`, `Error`, and `Unsupported` are
//! independent terminal states: once `Error` or `Unsupported` is reached the
//! endpoint performs no further protocol action until a fresh status query
//! resets it.

use std::fmt;

/// Lifecycle state of a debug-token endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EndpointState {
    /// No status or request has been acquired yet.
    None,
    /// A token status was read from the device.
    StatusAcquired,
    /// A token is already installed on the device.
    TokenInstalled,
    /// A token request was produced and wire-encoded.
    RequestAcquired,
    /// The exchange failed; the endpoint is parked until a fresh status query.
    Error,
    /// The device does not implement the debug-token capability.
    Unsupported,
}

impl EndpointState {
    /// True for states after which the endpoint takes no further protocol
    /// action until reset by a fresh status query.
    pub fn is_parked(self) -> bool {
        matches!(self, EndpointState::Error | EndpointState::Unsupported)
    }
}

impl fmt::Display for EndpointState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            EndpointState::None => "none",
            EndpointState::StatusAcquired => "status-acquired",
            EndpointState::TokenInstalled => "token-installed",
            EndpointState::RequestAcquired => "request-acquired",
            EndpointState::Error => "error",
            EndpointState::Unsupported => "unsupported",
        };
        f.write_str(s)
    }
}

/// Device protocol spoken by an endpoint.
///
/// NSM endpoints are reached through a management-object path and report
/// status as a structured tuple; SPDM endpoints are addressed by MCTP EID and
/// report status through the VDM text wrapper format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EndpointKind {
    Nsm,
    Spdm,
}

impl fmt::Display for EndpointKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EndpointKind::Nsm => f.write_str("nsm"),
            EndpointKind::Spdm => f.write_str("spdm"),
        }
    }
}

#[cfg(test)]
#[path = "state_tests.rs"]
mod tests;
