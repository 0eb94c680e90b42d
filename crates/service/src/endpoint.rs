// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-device endpoint state machine.
//!
//! One `Endpoint` is created per discovered device and lives for the
//! duration of the owning operation. The two protocol variants share a
//! uniform surface: NSM endpoints inspect the challenge-query verdict
//! embedded in a raw request and wire-encode through the transcript wrapper,
//! SPDM endpoints header-wrap the raw bytes directly and take their status
//! from the VDM text format.

use dt_core::token_status::{InstallStatus, NsmChallengeStatus, NsmTokenStatus, VdmTokenStatus};
use dt_core::{EndpointKind, EndpointState};
use dt_wire::{
    add_request_header, build_request_file, merge_status_map, wrap_transcript, FileKind,
    StatusError, TokenStatusOutcome, WireError,
};
use serde_json::Value;

enum Variant {
    Nsm { object_path: String, status: Option<NsmTokenStatus> },
    Spdm { eid: i32, object_path: String, status: Option<VdmTokenStatus> },
}

/// State held for one token-capable device.
pub struct Endpoint {
    variant: Variant,
    state: EndpointState,
    /// Wire-ready request, set only on the successful `set_request` path.
    request: Vec<u8>,
}

impl Endpoint {
    pub fn nsm(object_path: impl Into<String>) -> Endpoint {
        Endpoint {
            variant: Variant::Nsm { object_path: object_path.into(), status: None },
            state: EndpointState::None,
            request: Vec::new(),
        }
    }

    pub fn spdm(eid: i32, object_path: impl Into<String>) -> Endpoint {
        Endpoint {
            variant: Variant::Spdm { eid, object_path: object_path.into(), status: None },
            state: EndpointState::None,
            request: Vec::new(),
        }
    }

    pub fn kind(&self) -> EndpointKind {
        match self.variant {
            Variant::Nsm { .. } => EndpointKind::Nsm,
            Variant::Spdm { .. } => EndpointKind::Spdm,
        }
    }

    pub fn state(&self) -> EndpointState {
        self.state
    }

    /// MCTP EID for SPDM endpoints; NSM endpoints have none.
    pub fn eid(&self) -> Option<i32> {
        match self.variant {
            Variant::Nsm { .. } => None,
            Variant::Spdm { eid, .. } => Some(eid),
        }
    }

    pub fn object(&self) -> &str {
        match &self.variant {
            Variant::Nsm { object_path, .. } => object_path,
            Variant::Spdm { object_path, .. } => object_path,
        }
    }

    /// The wire-encoded request, empty until `set_request` succeeds.
    pub fn request(&self) -> &[u8] {
        &self.request
    }

    pub fn set_error(&mut self) {
        self.state = EndpointState::Error;
    }

    /// Accept a raw token request from the device and wire-encode it.
    ///
    /// Ignored while the endpoint is parked in `Error`/`Unsupported`. For an
    /// NSM endpoint the buffer's embedded challenge-query verdict decides
    /// the transition; only the ok path encodes. An SPDM endpoint encodes
    /// unconditionally, without transcript wrapping.
    pub fn set_request(&mut self, raw: &[u8]) -> Result<(), WireError> {
        if self.state.is_parked() {
            tracing::debug!(object = self.object(), state = %self.state, "request ignored for parked endpoint");
            return Ok(());
        }
        match self.kind() {
            EndpointKind::Nsm => {
                let Some(&verdict) = raw.first() else {
                    tracing::error!(object = self.object(), "empty token request buffer");
                    self.state = EndpointState::Error;
                    return Ok(());
                };
                match NsmChallengeStatus::from_byte(verdict) {
                    NsmChallengeStatus::Ok => {
                        let wrapped = match wrap_transcript(raw) {
                            Ok(wrapped) => wrapped,
                            Err(e) => {
                                self.state = EndpointState::Error;
                                return Err(e);
                            }
                        };
                        match add_request_header(&wrapped) {
                            Ok(request) => {
                                self.request = request;
                                self.state = EndpointState::RequestAcquired;
                            }
                            Err(e) => {
                                self.state = EndpointState::Error;
                                return Err(e);
                            }
                        }
                    }
                    NsmChallengeStatus::TokenAlreadyApplied => {
                        self.state = EndpointState::TokenInstalled;
                    }
                    NsmChallengeStatus::TokenNotSupported => {
                        self.state = EndpointState::Unsupported;
                    }
                    NsmChallengeStatus::Other(code) => {
                        tracing::error!(object = self.object(), code, "token challenge query failed");
                        self.state = EndpointState::Error;
                    }
                }
            }
            EndpointKind::Spdm => match add_request_header(raw) {
                Ok(request) => {
                    self.request = request;
                    self.state = EndpointState::RequestAcquired;
                }
                Err(e) => {
                    self.state = EndpointState::Error;
                    return Err(e);
                }
            },
        }
        Ok(())
    }

    /// Apply a decoded NSM status. A fresh status query resets a parked
    /// endpoint.
    pub fn set_nsm_status(&mut self, status: NsmTokenStatus) {
        match &mut self.variant {
            Variant::Nsm { status: slot, .. } => {
                let state = match status.token_status.as_str() {
                    "DebugSessionActive" => EndpointState::TokenInstalled,
                    "QueryFailure" => EndpointState::Error,
                    _ => EndpointState::StatusAcquired,
                };
                *slot = Some(status);
                self.state = state;
            }
            Variant::Spdm { object_path, .. } => {
                tracing::warn!(object = %object_path, "NSM status applied to SPDM endpoint");
            }
        }
    }

    /// Apply a VDM status decode outcome. A fresh status query resets a
    /// parked endpoint.
    pub fn set_vdm_status(&mut self, outcome: TokenStatusOutcome) {
        let slot = match &mut self.variant {
            Variant::Spdm { status: slot, .. } => slot,
            Variant::Nsm { object_path, .. } => {
                tracing::warn!(object = %object_path, "VDM status applied to NSM endpoint");
                return;
            }
        };
        match outcome {
            Err(StatusError::Unsupported) => {
                *slot = None;
                self.state = EndpointState::Unsupported;
            }
            Err(e) => {
                tracing::error!(error = %e, "token status decode failed");
                *slot = None;
                self.state = EndpointState::Error;
            }
            Ok(status) => {
                let state = match status.install_status {
                    InstallStatus::NotInstalled => EndpointState::StatusAcquired,
                    InstallStatus::Installed => EndpointState::TokenInstalled,
                    InstallStatus::Invalid => EndpointState::Error,
                };
                *slot = Some(status);
                self.state = state;
            }
        }
    }

    /// Last decoded status rendered for the status resource.
    pub fn status_json(&self) -> Option<Value> {
        match &self.variant {
            Variant::Nsm { status, .. } => status.as_ref().map(NsmTokenStatus::to_json),
            Variant::Spdm { status, .. } => status.as_ref().map(VdmTokenStatus::to_json),
        }
    }
}

/// Route one batch of status-utility output onto a fleet of SPDM endpoints.
///
/// Endpoints whose EID produced no line at all go to `Error`; NSM endpoints
/// are left untouched.
pub fn apply_status_output(endpoints: &mut [Endpoint], output: &str) {
    let mut outcomes = merge_status_map(output);
    for endpoint in endpoints.iter_mut() {
        let Some(eid) = endpoint.eid() else { continue };
        match outcomes.remove(&eid) {
            Some(outcome) => endpoint.set_vdm_status(outcome),
            None => {
                tracing::warn!(eid, "no status line for endpoint");
                endpoint.set_error();
            }
        }
    }
}

/// Aggregate every acquired request into one token-request file.
pub fn collect_request_file(endpoints: &[Endpoint]) -> Result<Vec<u8>, WireError> {
    let records: Vec<Vec<u8>> = endpoints
        .iter()
        .filter(|e| e.state() == EndpointState::RequestAcquired && !e.request().is_empty())
        .map(|e| e.request().to_vec())
        .collect();
    build_request_file(FileKind::TokenRequest, &records)
}

#[cfg(test)]
#[path = "endpoint_tests.rs"]
mod tests;
