// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! dt-service: the debug-token operation engine.
//!
//! Drives a remote device-management agent through a multi-step IPC
//! exchange: issue a command, discover the object representing the in-flight
//! operation, watch a status property until it settles, enforce a deadline,
//! and deliver exactly one result. The bus itself is reached through the
//! `BusAdapter` seam; everything above it is transport-agnostic.

pub mod bus;
pub mod endpoint;
pub mod handler;
pub mod registry;
pub mod tracker;

pub use bus::{BusAdapter, BusError, BusTarget, BusValue, SubtreeEntry};
pub use endpoint::Endpoint;
pub use handler::{OperationCallback, TargetedOperationHandler};
pub use registry::OperationRegistry;
pub use tracker::{AsyncOperationTracker, PropertySelector, TrackerCallback, TrackerRequest};

#[cfg(any(test, feature = "test-support"))]
pub use bus::{BusCall, FakeBus};
