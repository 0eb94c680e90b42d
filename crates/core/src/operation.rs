// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Targeted token operations and their argument/result typing.
//!
//! A targeted operation is one chassis-scoped, single-flight,
//! deadline-bounded remote action on the debug-token capability. The
//! argument union is tagged per operation and validated locally before any
//! bus traffic; selector arguments are namespaced with fixed enum prefixes
//! here, never by callers.

use crate::error::OperationError;
use crate::token_status::NsmTokenStatus;
use std::fmt;

/// Capability interface implemented by token-capable device objects.
pub const DEBUG_TOKEN_INTERFACE: &str = "com.nvidia.DebugToken";
/// Subtree under which token-capable objects are discovered.
pub const DEBUG_TOKEN_BASE_PATH: &str = "/xyz/openbmc_project/debug_token";

const TOKEN_OPCODES_PREFIX: &str = "com.nvidia.DebugToken.TokenOpcodes.";
const TOKEN_TYPES_PREFIX: &str = "com.nvidia.DebugToken.TokenTypes.";

/// The four chassis-scoped token operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TargetedOperation {
    DisableTokens,
    GenerateTokenRequest,
    GetTokenStatus,
    InstallToken,
}

impl TargetedOperation {
    /// Remote method invoked for this operation.
    pub fn method_name(self) -> &'static str {
        match self {
            TargetedOperation::DisableTokens => "DisableTokens",
            TargetedOperation::GenerateTokenRequest => "GetRequest",
            TargetedOperation::GetTokenStatus => "GetStatus",
            TargetedOperation::InstallToken => "InstallToken",
        }
    }
}

impl fmt::Display for TargetedOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TargetedOperation::DisableTokens => "disable-tokens",
            TargetedOperation::GenerateTokenRequest => "generate-token-request",
            TargetedOperation::GetTokenStatus => "get-token-status",
            TargetedOperation::InstallToken => "install-token",
        };
        f.write_str(s)
    }
}

/// Argument carried by a targeted operation.
///
/// `DisableTokens` takes no argument, `GenerateTokenRequest` and
/// `GetTokenStatus` take a short string selector, `InstallToken` takes the
/// raw token bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperationArgument {
    None,
    Selector(String),
    Payload(Vec<u8>),
}

impl OperationArgument {
    /// Check this argument against the shape the operation expects.
    ///
    /// A mismatch is a local `InvalidArgument` failure; nothing is sent over
    /// the wire for it.
    pub fn validate_for(&self, op: TargetedOperation) -> Result<(), OperationError> {
        let ok = match op {
            TargetedOperation::DisableTokens => matches!(self, OperationArgument::None),
            TargetedOperation::GenerateTokenRequest | TargetedOperation::GetTokenStatus => {
                matches!(self, OperationArgument::Selector(_))
            }
            TargetedOperation::InstallToken => matches!(self, OperationArgument::Payload(_)),
        };
        if ok {
            Ok(())
        } else {
            Err(OperationError::InvalidArgument { operation: op.to_string() })
        }
    }

    /// Wire form of a selector argument: the selector namespaced with the
    /// enum prefix the operation's method expects.
    ///
    /// Returns `None` for non-selector arguments or operations without a
    /// selector namespace.
    pub fn encoded_selector(&self, op: TargetedOperation) -> Option<String> {
        let OperationArgument::Selector(s) = self else {
            return None;
        };
        match op {
            TargetedOperation::GenerateTokenRequest => Some(format!("{TOKEN_OPCODES_PREFIX}{s}")),
            TargetedOperation::GetTokenStatus => Some(format!("{TOKEN_TYPES_PREFIX}{s}")),
            _ => None,
        }
    }
}

/// Result delivered through a targeted operation's completion callback.
#[derive(Debug, Clone, PartialEq)]
pub enum OperationResult {
    /// No payload (disable/install success, or a plain error state).
    None,
    /// Device-reported error code from an aborted operation.
    ErrorCode(u16),
    /// Local failure classification for a degenerate completion.
    Fault(OperationError),
    /// Base64-encoded token request blob.
    Request(String),
    /// Decoded token status tuple.
    Status(NsmTokenStatus),
}

#[cfg(test)]
#[path = "operation_tests.rs"]
mod tests;
