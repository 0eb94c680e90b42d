// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Bus adapter seam.
//!
//! The engine never talks to the message bus directly; it goes through
//! `BusAdapter`, which covers the five primitives the tracking pattern
//! needs: invoke a method, read a property, watch a property for change
//! notifications, discover capability objects under a subtree, and read a
//! file-descriptor-backed property. A scripted `FakeBus` stands in for the
//! real transport in tests.

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;

/// Errors from bus operations.
#[derive(Debug, Error)]
pub enum BusError {
    #[error("method call failed: {0}")]
    Call(String),
    #[error("property read failed: {0}")]
    Property(String),
    #[error("subscription failed: {0}")]
    Subscribe(String),
    #[error("discovery failed: {0}")]
    Discovery(String),
    #[error("fd read failed: {0}")]
    Fd(String),
}

/// A service name plus object path pair addressing one remote object.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BusTarget {
    pub service: String,
    pub object: String,
}

impl BusTarget {
    pub fn new(service: impl Into<String>, object: impl Into<String>) -> Self {
        BusTarget { service: service.into(), object: object.into() }
    }
}

/// Variant value carried in method arguments, replies, and properties.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BusValue {
    Str(String),
    ObjectPath(String),
    U16(u16),
    U32(u32),
    Bytes(Vec<u8>),
    Tuple(Vec<BusValue>),
}

impl BusValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            BusValue::Str(s) | BusValue::ObjectPath(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_object_path(&self) -> Option<&str> {
        match self {
            BusValue::ObjectPath(s) => Some(s),
            BusValue::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_u16(&self) -> Option<u16> {
        match self {
            BusValue::U16(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_u32(&self) -> Option<u32> {
        match self {
            BusValue::U32(v) => Some(*v),
            _ => None,
        }
    }
}

/// One discovered object: its path and the services implementing it.
pub type SubtreeEntry = (String, Vec<String>);

/// Transport primitives the tracking pattern is built on.
#[async_trait]
pub trait BusAdapter: Clone + Send + Sync + 'static {
    /// Invoke a remote method and return its reply.
    async fn call_method(
        &self,
        target: &BusTarget,
        interface: &str,
        method: &str,
        args: Vec<BusValue>,
    ) -> Result<BusValue, BusError>;

    /// Read a property once.
    async fn get_property(
        &self,
        target: &BusTarget,
        interface: &str,
        property: &str,
    ) -> Result<BusValue, BusError>;

    /// Subscribe to change notifications for a property. Values arrive on
    /// the returned channel until the receiver is dropped.
    async fn watch_property(
        &self,
        target: &BusTarget,
        interface: &str,
        property: &str,
    ) -> Result<mpsc::Receiver<BusValue>, BusError>;

    /// Find objects implementing `interface` under `base_path`.
    async fn get_subtree(
        &self,
        base_path: &str,
        interface: &str,
    ) -> Result<Vec<SubtreeEntry>, BusError>;

    /// Read the contents behind a file-descriptor-valued property.
    async fn read_fd_property(
        &self,
        target: &BusTarget,
        interface: &str,
        property: &str,
    ) -> Result<Vec<u8>, BusError>;
}

#[cfg(any(test, feature = "test-support"))]
mod fake {
    use super::{BusAdapter, BusError, BusTarget, BusValue, SubtreeEntry};
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::collections::HashMap;
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::sync::mpsc;

    /// Recorded method invocation.
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct BusCall {
        pub object: String,
        pub interface: String,
        pub method: String,
        pub args: Vec<BusValue>,
    }

    struct Watcher {
        object: String,
        interface: String,
        property: String,
        tx: mpsc::Sender<BusValue>,
    }

    type PropertyKey = (String, String, String);

    #[derive(Default)]
    struct FakeBusState {
        calls: Vec<BusCall>,
        subtree: Option<Result<Vec<SubtreeEntry>, String>>,
        method_replies: HashMap<String, Result<BusValue, String>>,
        properties: HashMap<PropertyKey, Result<BusValue, String>>,
        fd_payloads: HashMap<PropertyKey, Result<Vec<u8>, String>>,
        watchers: Vec<Watcher>,
    }

    /// Scripted in-memory bus for tests.
    #[derive(Clone, Default)]
    pub struct FakeBus {
        inner: Arc<Mutex<FakeBusState>>,
    }

    impl FakeBus {
        pub fn new() -> Self {
            Self::default()
        }

        /// Script the discovery reply.
        pub fn set_subtree(&self, entries: Vec<SubtreeEntry>) {
            self.inner.lock().subtree = Some(Ok(entries));
        }

        pub fn fail_subtree(&self, error: impl Into<String>) {
            self.inner.lock().subtree = Some(Err(error.into()));
        }

        /// Script the reply for a method by name.
        pub fn set_method_reply(&self, method: impl Into<String>, reply: BusValue) {
            self.inner.lock().method_replies.insert(method.into(), Ok(reply));
        }

        pub fn fail_method(&self, method: impl Into<String>, error: impl Into<String>) {
            self.inner.lock().method_replies.insert(method.into(), Err(error.into()));
        }

        /// Script a property value for direct reads.
        pub fn set_property(
            &self,
            object: impl Into<String>,
            interface: impl Into<String>,
            property: impl Into<String>,
            value: BusValue,
        ) {
            self.inner
                .lock()
                .properties
                .insert((object.into(), interface.into(), property.into()), Ok(value));
        }

        pub fn fail_property(
            &self,
            object: impl Into<String>,
            interface: impl Into<String>,
            property: impl Into<String>,
            error: impl Into<String>,
        ) {
            self.inner
                .lock()
                .properties
                .insert((object.into(), interface.into(), property.into()), Err(error.into()));
        }

        /// Script the contents behind a file-descriptor property.
        pub fn set_fd_payload(
            &self,
            object: impl Into<String>,
            interface: impl Into<String>,
            property: impl Into<String>,
            payload: Vec<u8>,
        ) {
            self.inner
                .lock()
                .fd_payloads
                .insert((object.into(), interface.into(), property.into()), Ok(payload));
        }

        /// Deliver a change notification to every matching watcher.
        pub fn emit_property(
            &self,
            object: &str,
            interface: &str,
            property: &str,
            value: BusValue,
        ) {
            let mut state = self.inner.lock();
            state.watchers.retain(|w| !w.tx.is_closed());
            for watcher in &state.watchers {
                if watcher.object == object
                    && watcher.interface == interface
                    && watcher.property == property
                {
                    let _ = watcher.tx.try_send(value.clone());
                }
            }
        }

        /// All recorded method calls.
        pub fn calls(&self) -> Vec<BusCall> {
            self.inner.lock().calls.clone()
        }

        pub fn watcher_count(&self) -> usize {
            let mut state = self.inner.lock();
            state.watchers.retain(|w| !w.tx.is_closed());
            state.watchers.len()
        }

        /// Wait until at least `n` watchers are registered. Returns false if
        /// that does not happen within the polling budget.
        pub async fn wait_for_watchers(&self, n: usize) -> bool {
            for _ in 0..1000 {
                if self.watcher_count() >= n {
                    return true;
                }
                tokio::time::sleep(Duration::from_millis(1)).await;
            }
            false
        }

        /// Wait until a method has been invoked. Returns false if it is not
        /// seen within the polling budget.
        pub async fn wait_for_call(&self, method: &str) -> bool {
            for _ in 0..1000 {
                if self.calls().iter().any(|c| c.method == method) {
                    return true;
                }
                tokio::time::sleep(Duration::from_millis(1)).await;
            }
            false
        }
    }

    #[async_trait]
    impl BusAdapter for FakeBus {
        async fn call_method(
            &self,
            target: &BusTarget,
            interface: &str,
            method: &str,
            args: Vec<BusValue>,
        ) -> Result<BusValue, BusError> {
            let reply = {
                let mut state = self.inner.lock();
                state.calls.push(BusCall {
                    object: target.object.clone(),
                    interface: interface.to_string(),
                    method: method.to_string(),
                    args,
                });
                state.method_replies.get(method).cloned()
            };
            match reply {
                Some(Ok(value)) => Ok(value),
                Some(Err(e)) => Err(BusError::Call(e)),
                None => Ok(BusValue::ObjectPath("/fake/operation/0".to_string())),
            }
        }

        async fn get_property(
            &self,
            target: &BusTarget,
            interface: &str,
            property: &str,
        ) -> Result<BusValue, BusError> {
            let key =
                (target.object.clone(), interface.to_string(), property.to_string());
            match self.inner.lock().properties.get(&key) {
                Some(Ok(value)) => Ok(value.clone()),
                Some(Err(e)) => Err(BusError::Property(e.clone())),
                None => Err(BusError::Property(format!(
                    "no scripted value for {}/{interface}/{property}",
                    target.object
                ))),
            }
        }

        async fn watch_property(
            &self,
            target: &BusTarget,
            interface: &str,
            property: &str,
        ) -> Result<mpsc::Receiver<BusValue>, BusError> {
            let (tx, rx) = mpsc::channel(16);
            self.inner.lock().watchers.push(Watcher {
                object: target.object.clone(),
                interface: interface.to_string(),
                property: property.to_string(),
                tx,
            });
            Ok(rx)
        }

        async fn get_subtree(
            &self,
            _base_path: &str,
            _interface: &str,
        ) -> Result<Vec<SubtreeEntry>, BusError> {
            match self.inner.lock().subtree.clone() {
                Some(Ok(entries)) => Ok(entries),
                Some(Err(e)) => Err(BusError::Discovery(e)),
                None => Ok(Vec::new()),
            }
        }

        async fn read_fd_property(
            &self,
            target: &BusTarget,
            interface: &str,
            property: &str,
        ) -> Result<Vec<u8>, BusError> {
            let key =
                (target.object.clone(), interface.to_string(), property.to_string());
            match self.inner.lock().fd_payloads.get(&key) {
                Some(Ok(payload)) => Ok(payload.clone()),
                Some(Err(e)) => Err(BusError::Fd(e.clone())),
                None => Err(BusError::Fd(format!(
                    "no scripted fd payload for {}/{interface}/{property}",
                    target.object
                ))),
            }
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
pub use fake::{BusCall, FakeBus};
