// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! dt-core: domain vocabulary for the debug-token operation service.
//!
//! Holds the endpoint lifecycle states, the targeted-operation and
//! async-status vocabularies, the decoded token-status records for both
//! device protocols, the error taxonomy, and the service configuration.

pub mod config;
pub mod error;
pub mod operation;
pub mod state;
pub mod status;
pub mod token_status;

pub use config::ServiceConfig;
pub use error::OperationError;
pub use operation::{
    OperationArgument, OperationResult, TargetedOperation, DEBUG_TOKEN_BASE_PATH,
    DEBUG_TOKEN_INTERFACE,
};
pub use state::{EndpointKind, EndpointState};
pub use status::{AsyncStatus, ProgressStatus};
pub use token_status::{
    FuseType, InstallStatus, NsmChallengeStatus, NsmTokenStatus, ProcessingStatus, StatusV2Ext,
    TokenConfig, TokenTypeMask, VdmTokenStatus, DEVICE_ID_LENGTH, STATUS_RECORD_V1_LEN,
    STATUS_RECORD_V2_LEN,
};
