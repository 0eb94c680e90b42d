// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Generic async-operation tracker.
//!
//! Turns "call a method, then watch a status property until it settles" into
//! a single completion callback with timeout and cancellation. The method
//! reply names the object representing the in-flight operation; the tracker
//! arms a deadline, subscribes to status change notifications on that
//! object, and also reads the status directly once to close the
//! subscribe-race window. The first terminal event wins; every later event
//! is detected and dropped through the take-once callback slot, and every
//! spawned callback path holds only a `Weak` reference so a dropped tracker
//! record is never dereferenced.

use crate::bus::{BusAdapter, BusTarget, BusValue};
use dt_core::AsyncStatus;
use parking_lot::Mutex;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Interface carrying the generic async status property.
pub const ASYNC_STATUS_INTERFACE: &str = "com.nvidia.Async.Status";
/// Name of the generic async status property.
pub const ASYNC_STATUS_PROPERTY: &str = "Status";
/// Interface carrying the operation's final value.
pub const ASYNC_VALUE_INTERFACE: &str = "com.nvidia.Async.Value";
/// Name of the final value property.
pub const ASYNC_VALUE_PROPERTY: &str = "Value";

/// Interface/property pair addressing one watched property.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertySelector {
    pub interface: String,
    pub property: String,
}

impl PropertySelector {
    pub fn new(interface: impl Into<String>, property: impl Into<String>) -> Self {
        PropertySelector { interface: interface.into(), property: property.into() }
    }
}

/// Everything needed to issue and track one async operation.
#[derive(Debug, Clone)]
pub struct TrackerRequest {
    /// Object the method is invoked on.
    pub target: BusTarget,
    pub interface: String,
    pub method: String,
    pub args: Vec<BusValue>,
    /// Property that carries the operation status.
    pub status: PropertySelector,
    /// Property that carries the final value; status-only operations omit it.
    pub value: Option<PropertySelector>,
    pub timeout: Duration,
}

impl TrackerRequest {
    /// Request with the generic async status and value selectors.
    pub fn generic(
        target: BusTarget,
        interface: impl Into<String>,
        method: impl Into<String>,
        args: Vec<BusValue>,
        timeout: Duration,
    ) -> Self {
        TrackerRequest {
            target,
            interface: interface.into(),
            method: method.into(),
            args,
            status: PropertySelector::new(ASYNC_STATUS_INTERFACE, ASYNC_STATUS_PROPERTY),
            value: Some(PropertySelector::new(ASYNC_VALUE_INTERFACE, ASYNC_VALUE_PROPERTY)),
            timeout,
        }
    }

    /// Same, but without a value fetch on success.
    pub fn generic_status_only(
        target: BusTarget,
        interface: impl Into<String>,
        method: impl Into<String>,
        args: Vec<BusValue>,
        timeout: Duration,
    ) -> Self {
        TrackerRequest { value: None, ..Self::generic(target, interface, method, args, timeout) }
    }
}

/// Completion callback: the terminal status, plus the fetched value when the
/// operation succeeded and a value selector was configured.
pub type TrackerCallback = Box<dyn FnOnce(AsyncStatus, Option<BusValue>) + Send>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Idle,
    MethodIssued,
    ObjectResolved,
    Completed,
    TimedOut,
}

struct TrackerState {
    phase: Phase,
    operation_object: Option<BusTarget>,
    /// Take-once slot; `None` means the operation completed.
    callback: Option<TrackerCallback>,
    deadline: Option<JoinHandle<()>>,
    subscription: Option<JoinHandle<()>>,
}

struct Shared<B: BusAdapter> {
    bus: B,
    request: TrackerRequest,
    state: Mutex<TrackerState>,
}

/// Handle owning one tracked operation. Dropping it releases the record;
/// any callback still in flight then resolves its weak reference to nothing
/// and does nothing.
pub struct AsyncOperationTracker<B: BusAdapter> {
    shared: Arc<Shared<B>>,
}

impl<B: BusAdapter> AsyncOperationTracker<B> {
    /// Issue the method call and start tracking. The callback fires exactly
    /// once, from whichever of {terminal status, deadline} occurs first.
    pub fn start(
        bus: B,
        request: TrackerRequest,
        callback: impl FnOnce(AsyncStatus, Option<BusValue>) + Send + 'static,
    ) -> Self {
        let shared = Arc::new(Shared {
            bus,
            request,
            state: Mutex::new(TrackerState {
                phase: Phase::Idle,
                operation_object: None,
                callback: Some(Box::new(callback)),
                deadline: None,
                subscription: None,
            }),
        });
        let weak = Arc::downgrade(&shared);
        tokio::spawn(Shared::drive(weak));
        AsyncOperationTracker { shared }
    }

    /// True once the completion callback has fired (or been claimed).
    pub fn is_completed(&self) -> bool {
        self.shared.state.lock().callback.is_none()
    }
}

impl<B: BusAdapter> Shared<B> {
    async fn drive(weak: Weak<Shared<B>>) {
        // snapshot the call, then release the record before suspending
        let Some(shared) = weak.upgrade() else { return };
        let bus = shared.bus.clone();
        let target = shared.request.target.clone();
        let interface = shared.request.interface.clone();
        let method = shared.request.method.clone();
        let args = shared.request.args.clone();
        let status_selector = shared.request.status.clone();
        let timeout = shared.request.timeout;
        shared.state.lock().phase = Phase::MethodIssued;
        drop(shared);

        let reply = bus.call_method(&target, &interface, &method, args).await;
        let Some(shared) = weak.upgrade() else { return };
        let object = match reply {
            Err(e) => {
                tracing::info!(method = %method, error = %e, "async method call failed");
                shared.complete(AsyncStatus::InternalFailure, None);
                return;
            }
            Ok(value) => match value.as_object_path() {
                Some(path) => BusTarget::new(shared.request.target.service.clone(), path),
                None => {
                    tracing::info!(method = %method, "async method reply is not an object path");
                    shared.complete(AsyncStatus::InternalFailure, None);
                    return;
                }
            },
        };

        {
            let mut state = shared.state.lock();
            if state.callback.is_none() {
                return;
            }
            state.phase = Phase::ObjectResolved;
            state.operation_object = Some(object.clone());
            state.deadline = Some(tokio::spawn(Self::deadline(weak.clone(), timeout)));
        }
        drop(shared);

        let watch = bus
            .watch_property(&object, &status_selector.interface, &status_selector.property)
            .await;
        let Some(shared) = weak.upgrade() else { return };
        match watch {
            Err(e) => {
                tracing::info!(object = %object.object, error = %e, "status subscription failed");
                shared.complete(AsyncStatus::InternalFailure, None);
                return;
            }
            Ok(rx) => {
                let handle = tokio::spawn(Self::pump_subscription(weak.clone(), rx));
                let mut state = shared.state.lock();
                if state.callback.is_none() {
                    handle.abort();
                    return;
                }
                state.subscription = Some(handle);
            }
        }
        drop(shared);

        // direct read, independent of the subscription, closes the window
        // where the object settled before the subscription was in place
        let read = bus
            .get_property(&object, &status_selector.interface, &status_selector.property)
            .await;
        let Some(shared) = weak.upgrade() else { return };
        match read {
            Ok(value) => Self::observe_status(&shared, value),
            Err(e) => {
                tracing::info!(object = %object.object, error = %e, "status read failed");
                shared.complete(AsyncStatus::InternalFailure, None);
            }
        }
    }

    async fn pump_subscription(weak: Weak<Shared<B>>, mut rx: mpsc::Receiver<BusValue>) {
        while let Some(value) = rx.recv().await {
            let Some(shared) = weak.upgrade() else { return };
            Self::observe_status(&shared, value);
            if shared.state.lock().callback.is_none() {
                return;
            }
        }
    }

    async fn deadline(weak: Weak<Shared<B>>, timeout: Duration) {
        tokio::time::sleep(timeout).await;
        let Some(shared) = weak.upgrade() else { return };
        tracing::info!(timeout_ms = timeout.as_millis() as u64, "async operation timed out");
        shared.complete(AsyncStatus::Timeout, None);
    }

    /// Both the subscription and the direct read funnel in here.
    fn observe_status(shared: &Arc<Shared<B>>, value: BusValue) {
        if shared.state.lock().callback.is_none() {
            return;
        }
        let Some(status) = value.as_str().and_then(AsyncStatus::parse) else {
            tracing::info!("unparsable async status value");
            shared.complete(AsyncStatus::InternalFailure, None);
            return;
        };
        if !status.is_terminal() {
            // still in progress; also absorbs a stale direct read racing a
            // subscription that already delivered the terminal status
            return;
        }
        if status == AsyncStatus::Success && shared.request.value.is_some() {
            tokio::spawn(Self::fetch_value(Arc::downgrade(shared)));
            return;
        }
        shared.complete(status, None);
    }

    async fn fetch_value(weak: Weak<Shared<B>>) {
        let Some(shared) = weak.upgrade() else { return };
        let Some(selector) = shared.request.value.clone() else { return };
        let Some(object) = shared.state.lock().operation_object.clone() else { return };
        let bus = shared.bus.clone();
        drop(shared);

        let result = bus.get_property(&object, &selector.interface, &selector.property).await;
        let Some(shared) = weak.upgrade() else {
            tracing::debug!("value reply arrived after the tracker was released");
            return;
        };
        match result {
            Ok(value) => shared.complete(AsyncStatus::Success, Some(value)),
            Err(e) => {
                tracing::info!(error = %e, "value fetch failed");
                shared.complete(AsyncStatus::InternalFailure, None);
            }
        }
    }

    /// Deliver the result exactly once and cancel whatever else is pending.
    fn complete(&self, status: AsyncStatus, value: Option<BusValue>) {
        let (callback, deadline, subscription) = {
            let mut state = self.state.lock();
            let Some(callback) = state.callback.take() else {
                tracing::debug!(status = %status, "late completion event dropped");
                return;
            };
            tracing::debug!(from = ?state.phase, status = %status, "tracker completed");
            state.phase = match status {
                AsyncStatus::Timeout => Phase::TimedOut,
                _ => Phase::Completed,
            };
            (callback, state.deadline.take(), state.subscription.take())
        };
        if let Some(handle) = deadline {
            handle.abort();
        }
        if let Some(handle) = subscription {
            handle.abort();
        }
        callback(status, value);
    }
}

impl<B: BusAdapter> Drop for Shared<B> {
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

#[cfg(test)]
#[path = "tracker_tests.rs"]
mod tests;
