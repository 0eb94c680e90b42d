// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn defaults_match_shipped_deadlines() {
    let config = ServiceConfig::default();
    assert_eq!(config.targeted_op_timeout(), Duration::from_secs(2));
    assert_eq!(config.async_call_timeout(), Duration::from_secs(30));
    assert_eq!(config.base_path, "/xyz/openbmc_project/debug_token");
}

#[test]
fn toml_overrides_defaults() {
    let config = ServiceConfig::from_toml_str(
        r#"
        targeted_op_timeout_secs = 5
        base_path = "/xyz/openbmc_project/debug_token_test"
        "#,
    )
    .expect("valid config");
    assert_eq!(config.targeted_op_timeout(), Duration::from_secs(5));
    assert_eq!(config.async_call_timeout(), Duration::from_secs(30));
    assert_eq!(config.base_path, "/xyz/openbmc_project/debug_token_test");
}

#[test]
fn unknown_fields_rejected() {
    assert!(ServiceConfig::from_toml_str("bogus_field = 1").is_err());
}
