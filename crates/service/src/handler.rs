// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Chassis-scoped targeted token operations.
//!
//! Follows the same tracking pattern as the generic tracker (deadline,
//! status subscription plus one direct read, take-once completion) but
//! consumes the Progress vocabulary instead of the async-status vocabulary
//! and resolves its target by subtree discovery rather than from the method
//! reply. Cleanup is two-phase: the callback slot and deadline are released
//! synchronously on completion, the subscription on the next loop turn so it
//! is never destroyed from inside its own invocation.

use crate::bus::{BusAdapter, BusTarget, BusValue};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use dt_core::{
    EndpointState, NsmTokenStatus, OperationArgument, OperationError, OperationResult,
    ProgressStatus, TargetedOperation, DEBUG_TOKEN_INTERFACE,
};
use parking_lot::Mutex;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

const PROGRESS_INTERFACE: &str = "xyz.openbmc_project.Common.Progress";
const PROGRESS_STATUS_PROPERTY: &str = "Status";
const REQUEST_FD_PROPERTY: &str = "RequestFd";
const TOKEN_STATUS_PROPERTY: &str = "TokenStatus";
const ERROR_CODE_PROPERTY: &str = "ErrorCode";
/// NSM completion code for a token command the device does not support.
const NSM_UNSUPPORTED_ERROR_CODE: u16 = 0x05;

/// Completion callback: the endpoint-state verdict plus the decoded result.
pub type OperationCallback = Box<dyn FnOnce(EndpointState, OperationResult) + Send>;

struct HandlerState {
    /// Take-once slot; `None` means the operation completed.
    callback: Option<OperationCallback>,
    deadline: Option<JoinHandle<()>>,
    subscription: Option<JoinHandle<()>>,
}

struct HandlerShared<B: BusAdapter> {
    bus: B,
    chassis: String,
    base_path: String,
    operation: TargetedOperation,
    argument: OperationArgument,
    timeout: Duration,
    state: Mutex<HandlerState>,
}

/// One in-flight targeted token operation.
pub struct TargetedOperationHandler<B: BusAdapter> {
    shared: Arc<HandlerShared<B>>,
}

impl<B: BusAdapter> TargetedOperationHandler<B> {
    /// Validate the argument and start the operation.
    ///
    /// A wrong-shaped argument is rejected here, before any bus traffic;
    /// every later failure is delivered through the callback.
    pub fn start(
        bus: B,
        base_path: &str,
        chassis: &str,
        operation: TargetedOperation,
        argument: OperationArgument,
        timeout: Duration,
        callback: OperationCallback,
    ) -> Result<Self, OperationError> {
        argument.validate_for(operation)?;
        let shared = Arc::new(HandlerShared {
            bus,
            chassis: chassis.to_string(),
            base_path: base_path.to_string(),
            operation,
            argument,
            timeout,
            state: Mutex::new(HandlerState {
                callback: Some(callback),
                deadline: None,
                subscription: None,
            }),
        });
        let weak = Arc::downgrade(&shared);
        tokio::spawn(HandlerShared::drive(weak));
        Ok(TargetedOperationHandler { shared })
    }

    pub fn operation(&self) -> TargetedOperation {
        self.shared.operation
    }

    pub fn chassis(&self) -> &str {
        &self.shared.chassis
    }

    /// True only when the callback slot, the deadline, and the subscription
    /// have all been released. While false, the second value reports the
    /// configured deadline so a caller can advise "retry after".
    pub fn finished(&self) -> (bool, Duration) {
        let state = self.shared.state.lock();
        let done =
            state.callback.is_none() && state.deadline.is_none() && state.subscription.is_none();
        (done, if done { Duration::ZERO } else { self.shared.timeout })
    }
}

impl<B: BusAdapter> HandlerShared<B> {
    async fn drive(weak: Weak<HandlerShared<B>>) {
        let Some(shared) = weak.upgrade() else { return };
        let bus = shared.bus.clone();
        let base_path = shared.base_path.clone();
        let chassis = shared.chassis.clone();
        drop(shared);

        // resolve the chassis's token-capable object
        let subtree = bus.get_subtree(&base_path, DEBUG_TOKEN_INTERFACE).await;
        let Some(shared) = weak.upgrade() else { return };
        let target = match subtree {
            Err(e) => {
                tracing::error!(error = %e, "debug token discovery failed");
                shared.resource_missing();
                return;
            }
            Ok(entries) => {
                let mut found = None;
                for (path, services) in entries {
                    if !path.contains(&chassis) {
                        continue;
                    }
                    if let Some(service) = services.into_iter().next() {
                        found = Some(BusTarget::new(service, path));
                        break;
                    }
                }
                match found {
                    Some(target) => target,
                    None => {
                        tracing::error!(chassis = %chassis, "no debug token object for chassis");
                        shared.resource_missing();
                        return;
                    }
                }
            }
        };

        {
            let mut state = shared.state.lock();
            if state.callback.is_none() {
                return;
            }
            state.deadline = Some(tokio::spawn(Self::deadline(weak.clone(), shared.timeout)));
        }
        drop(shared);

        // watch the progress property before issuing the command
        let watch = bus.watch_property(&target, PROGRESS_INTERFACE, PROGRESS_STATUS_PROPERTY).await;
        let Some(shared) = weak.upgrade() else { return };
        match watch {
            Err(e) => {
                tracing::error!(object = %target.object, error = %e, "progress subscription failed");
                shared.complete(
                    EndpointState::Error,
                    OperationResult::Fault(OperationError::Transport(e.to_string())),
                );
                return;
            }
            Ok(rx) => {
                let handle = tokio::spawn(Self::pump_progress(weak.clone(), target.clone(), rx));
                let mut state = shared.state.lock();
                if state.callback.is_none() {
                    handle.abort();
                    return;
                }
                state.subscription = Some(handle);
            }
        }

        let Some(args) = shared.method_args() else {
            // argument shape is validated before spawn; a mismatch here means
            // the handler was constructed around it some other way
            shared.complete(
                EndpointState::Error,
                OperationResult::Fault(OperationError::InvalidArgument {
                    operation: shared.operation.to_string(),
                }),
            );
            return;
        };
        let method = shared.operation.method_name();
        drop(shared);

        if let Err(e) = bus.call_method(&target, DEBUG_TOKEN_INTERFACE, method, args).await {
            let Some(shared) = weak.upgrade() else { return };
            tracing::error!(method, error = %e, "token method call failed");
            shared.complete(
                EndpointState::Error,
                OperationResult::Fault(OperationError::Transport(e.to_string())),
            );
            return;
        }

        // direct read closes the window where the operation settled before
        // the subscription delivered anything
        let read = bus.get_property(&target, PROGRESS_INTERFACE, PROGRESS_STATUS_PROPERTY).await;
        let Some(shared) = weak.upgrade() else { return };
        match read {
            Ok(value) => Self::observe_progress(&shared, &target, value),
            Err(e) => {
                // the subscription and the deadline are still armed
                tracing::debug!(object = %target.object, error = %e, "no initial progress value");
            }
        }
    }

    /// Arguments for the operation's method, already namespaced.
    fn method_args(&self) -> Option<Vec<BusValue>> {
        match self.operation {
            TargetedOperation::DisableTokens => Some(Vec::new()),
            TargetedOperation::GenerateTokenRequest | TargetedOperation::GetTokenStatus => {
                self.argument.encoded_selector(self.operation).map(|s| vec![BusValue::Str(s)])
            }
            TargetedOperation::InstallToken => match &self.argument {
                OperationArgument::Payload(token) => Some(vec![BusValue::Bytes(token.clone())]),
                _ => None,
            },
        }
    }

    async fn pump_progress(
        weak: Weak<HandlerShared<B>>,
        target: BusTarget,
        mut rx: mpsc::Receiver<BusValue>,
    ) {
        while let Some(value) = rx.recv().await {
            let Some(shared) = weak.upgrade() else { return };
            Self::observe_progress(&shared, &target, value);
            if shared.state.lock().callback.is_none() {
                return;
            }
        }
    }

    async fn deadline(weak: Weak<HandlerShared<B>>, timeout: Duration) {
        tokio::time::sleep(timeout).await;
        let Some(shared) = weak.upgrade() else { return };
        tracing::error!(chassis = %shared.chassis, "debug token operation timeout");
        shared.complete(
            EndpointState::Error,
            OperationResult::Fault(OperationError::Timeout(timeout)),
        );
    }

    /// Both the subscription and the direct read funnel in here.
    fn observe_progress(shared: &Arc<HandlerShared<B>>, target: &BusTarget, value: BusValue) {
        if shared.state.lock().callback.is_none() {
            return;
        }
        let Some(raw) = value.as_str() else {
            tracing::warn!("progress value is not a string");
            return;
        };
        match ProgressStatus::parse(raw) {
            ProgressStatus::InProgress => {}
            ProgressStatus::Completed => match shared.operation {
                TargetedOperation::GenerateTokenRequest => {
                    tokio::spawn(Self::fetch_request(Arc::downgrade(shared), target.clone()));
                }
                TargetedOperation::GetTokenStatus => {
                    tokio::spawn(Self::fetch_status(Arc::downgrade(shared), target.clone()));
                }
                TargetedOperation::DisableTokens | TargetedOperation::InstallToken => {
                    shared.complete(EndpointState::None, OperationResult::None);
                }
            },
            ProgressStatus::Aborted => {
                tokio::spawn(Self::fetch_error_code(Arc::downgrade(shared), target.clone()));
            }
            status @ (ProgressStatus::Failed | ProgressStatus::Other(_)) => {
                tracing::error!(status = %status, "unexpected progress status");
                shared.complete(EndpointState::Error, OperationResult::None);
            }
        }
    }

    /// Completed generate: read the fd-backed request and base64-encode it.
    async fn fetch_request(weak: Weak<HandlerShared<B>>, target: BusTarget) {
        let Some(shared) = weak.upgrade() else { return };
        let bus = shared.bus.clone();
        drop(shared);

        let result =
            bus.read_fd_property(&target, DEBUG_TOKEN_INTERFACE, REQUEST_FD_PROPERTY).await;
        let Some(shared) = weak.upgrade() else { return };
        match result {
            Ok(bytes) => {
                shared.complete(
                    EndpointState::RequestAcquired,
                    OperationResult::Request(BASE64.encode(&bytes)),
                );
            }
            Err(e) => {
                tracing::error!(error = %e, "token request read failed");
                shared.complete(
                    EndpointState::Error,
                    OperationResult::Fault(OperationError::Transport(e.to_string())),
                );
            }
        }
    }

    /// Completed status query: decode the status tuple.
    async fn fetch_status(weak: Weak<HandlerShared<B>>, target: BusTarget) {
        let Some(shared) = weak.upgrade() else { return };
        let bus = shared.bus.clone();
        drop(shared);

        let result = bus.get_property(&target, DEBUG_TOKEN_INTERFACE, TOKEN_STATUS_PROPERTY).await;
        let Some(shared) = weak.upgrade() else { return };
        match result {
            Ok(value) => match decode_token_status(&value) {
                Some(status) => {
                    shared.complete(EndpointState::StatusAcquired, OperationResult::Status(status));
                }
                None => {
                    tracing::error!("token status tuple has the wrong shape");
                    shared.complete(
                        EndpointState::Error,
                        OperationResult::Fault(OperationError::MalformedResponse(
                            "token status tuple".to_string(),
                        )),
                    );
                }
            },
            Err(e) => {
                tracing::error!(error = %e, "token status read failed");
                shared.complete(
                    EndpointState::Error,
                    OperationResult::Fault(OperationError::Transport(e.to_string())),
                );
            }
        }
    }

    /// Aborted: fetch the device error code to classify the failure.
    async fn fetch_error_code(weak: Weak<HandlerShared<B>>, target: BusTarget) {
        let Some(shared) = weak.upgrade() else { return };
        let bus = shared.bus.clone();
        drop(shared);

        let result = bus.get_property(&target, DEBUG_TOKEN_INTERFACE, ERROR_CODE_PROPERTY).await;
        let Some(shared) = weak.upgrade() else { return };
        match result {
            Ok(value) => {
                let code = match &value {
                    BusValue::Tuple(items) => items.first().and_then(BusValue::as_u16),
                    other => other.as_u16(),
                };
                match code {
                    Some(NSM_UNSUPPORTED_ERROR_CODE) => {
                        shared.complete(EndpointState::Unsupported, OperationResult::None);
                    }
                    Some(code) => {
                        tracing::error!(code, "device reported token error");
                        shared.complete(EndpointState::Error, OperationResult::ErrorCode(code));
                    }
                    None => {
                        shared.complete(
                            EndpointState::Error,
                            OperationResult::Fault(OperationError::MalformedResponse(
                                "error code tuple".to_string(),
                            )),
                        );
                    }
                }
            }
            Err(e) => {
                tracing::error!(error = %e, "error code read failed");
                shared.complete(
                    EndpointState::Error,
                    OperationResult::Fault(OperationError::Transport(e.to_string())),
                );
            }
        }
    }

    fn resource_missing(self: &Arc<Self>) {
        self.complete(
            EndpointState::Unsupported,
            OperationResult::Fault(OperationError::ResourceNotFound {
                chassis: self.chassis.clone(),
            }),
        );
    }

    /// Deliver the result exactly once. The callback slot and the deadline
    /// are released synchronously; the subscription is released on the next
    /// loop turn.
    fn complete(self: &Arc<Self>, endpoint_state: EndpointState, result: OperationResult) {
        let (callback, deadline) = {
            let mut state = self.state.lock();
            let Some(callback) = state.callback.take() else {
                tracing::debug!(state = %endpoint_state, "late completion event dropped");
                return;
            };
            (callback, state.deadline.take())
        };
        if let Some(handle) = deadline {
            handle.abort();
        }
        callback(endpoint_state, result);

        let weak = Arc::downgrade(self);
        tokio::spawn(async move {
            let Some(shared) = weak.upgrade() else { return };
            let handle = shared.state.lock().subscription.take();
            if let Some(handle) = handle {
                handle.abort();
            }
        });
    }
}

impl<B: BusAdapter> Drop for HandlerShared<B> {
    fn drop(&mut self) {
        let state = self.state.get_mut();
        if let Some(handle) = state.deadline.take() {
            handle.abort();
        }
        if let Some(handle) = state.subscription.take() {
            handle.abort();
        }
    }
}

fn decode_token_status(value: &BusValue) -> Option<NsmTokenStatus> {
    let BusValue::Tuple(items) = value else {
        return None;
    };
    match items.as_slice() {
        [BusValue::Str(token_type), BusValue::Str(status), BusValue::Str(info), BusValue::U32(time_left)] => {
            Some(NsmTokenStatus::from_dbus(token_type, status, info, *time_left))
        }
        _ => None,
    }
}

#[cfg(test)]
#[path = "handler_tests.rs"]
mod tests;
