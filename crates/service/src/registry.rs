// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-chassis single-flight registry.
//!
//! At most one targeted operation may be in flight per chassis. The
//! check-then-insert runs under one lock with no suspension point in
//! between; a caller racing an in-flight operation is told the configured
//! deadline so it can advise "retry after", never queued.

use crate::bus::BusAdapter;
use crate::handler::{OperationCallback, TargetedOperationHandler};
use dt_core::{
    EndpointState, OperationArgument, OperationError, OperationResult, ServiceConfig,
    TargetedOperation,
};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::time::Duration;

/// Owns the in-flight targeted operation for each chassis.
pub struct OperationRegistry<B: BusAdapter> {
    bus: B,
    config: ServiceConfig,
    operations: Mutex<HashMap<String, TargetedOperationHandler<B>>>,
}

impl<B: BusAdapter> OperationRegistry<B> {
    pub fn new(bus: B, config: ServiceConfig) -> Self {
        OperationRegistry { bus, config, operations: Mutex::new(HashMap::new()) }
    }

    /// Start a targeted operation for a chassis.
    ///
    /// Rejected with `AlreadyInProgress` while the chassis's previous
    /// operation has not finished, and with `InvalidArgument` for a
    /// wrong-shaped argument. A finished previous operation is abandoned
    /// and replaced.
    pub fn begin(
        &self,
        chassis: &str,
        operation: TargetedOperation,
        argument: OperationArgument,
        callback: impl FnOnce(EndpointState, OperationResult) + Send + 'static,
    ) -> Result<(), OperationError> {
        let mut operations = self.operations.lock();
        if let Some(existing) = operations.get(chassis) {
            let (done, retry_after) = existing.finished();
            if !done {
                tracing::info!(chassis, operation = %operation, "operation already in flight");
                return Err(OperationError::AlreadyInProgress { retry_after });
            }
        }
        let handler = TargetedOperationHandler::start(
            self.bus.clone(),
            &self.config.base_path,
            chassis,
            operation,
            argument,
            self.config.targeted_op_timeout(),
            Box::new(callback) as OperationCallback,
        )?;
        operations.insert(chassis.to_string(), handler);
        Ok(())
    }

    /// Completion state of the chassis's current operation, if any.
    pub fn finished(&self, chassis: &str) -> Option<(bool, Duration)> {
        self.operations.lock().get(chassis).map(TargetedOperationHandler::finished)
    }
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
