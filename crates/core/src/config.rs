// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Service configuration for token operations.

use serde::Deserialize;
use std::time::Duration;

use crate::operation::DEBUG_TOKEN_BASE_PATH;

fn default_targeted_op_timeout_secs() -> u64 {
    2
}

fn default_async_call_timeout_secs() -> u64 {
    30
}

fn default_base_path() -> String {
    DEBUG_TOKEN_BASE_PATH.to_string()
}

/// Deadlines and discovery scope for token operations.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServiceConfig {
    /// Deadline for one targeted token operation.
    #[serde(default = "default_targeted_op_timeout_secs")]
    pub targeted_op_timeout_secs: u64,
    /// Deadline for a generic tracked async call.
    #[serde(default = "default_async_call_timeout_secs")]
    pub async_call_timeout_secs: u64,
    /// Subtree under which token-capable objects are discovered.
    #[serde(default = "default_base_path")]
    pub base_path: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        ServiceConfig {
            targeted_op_timeout_secs: default_targeted_op_timeout_secs(),
            async_call_timeout_secs: default_async_call_timeout_secs(),
            base_path: default_base_path(),
        }
    }
}

impl ServiceConfig {
    pub fn from_toml_str(s: &str) -> Result<ServiceConfig, toml::de::Error> {
        toml::from_str(s)
    }

    pub fn targeted_op_timeout(&self) -> Duration {
        Duration::from_secs(self.targeted_op_timeout_secs)
    }

    pub fn async_call_timeout(&self) -> Duration {
        Duration::from_secs(self.async_call_timeout_secs)
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
