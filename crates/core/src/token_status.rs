// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Decoded token-status records for the two device protocols.
//!
//! NSM devices report status as a tuple of transport enum strings plus a
//! time-left counter. SPDM/VDM devices report a fixed-layout binary record
//! (10 bytes for version 1, 24 bytes for version 2) carried inside the text
//! wrapper format; the byte-level field decoding lives here, the wrapper
//! parsing in `dt-wire`.

use bitflags::bitflags;
use serde_json::{json, Value};

/// Length of the device identifier field in a VDM status record.
pub const DEVICE_ID_LENGTH: usize = 8;
/// Exact byte length of a version-1 status record.
pub const STATUS_RECORD_V1_LEN: usize = 10;
/// Exact byte length of a version-2 status record.
pub const STATUS_RECORD_V2_LEN: usize = 24;

/// Challenge-query status embedded in a raw NSM token request buffer.
///
/// The first byte of the buffer handed to an NSM endpoint's `set_request`
/// carries the device's verdict on the challenge query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NsmChallengeStatus {
    Ok,
    TokenAlreadyApplied,
    TokenNotSupported,
    Other(u8),
}

impl NsmChallengeStatus {
    pub fn from_byte(b: u8) -> NsmChallengeStatus {
        match b {
            0x00 => NsmChallengeStatus::Ok,
            0x01 => NsmChallengeStatus::TokenAlreadyApplied,
            0x02 => NsmChallengeStatus::TokenNotSupported,
            other => NsmChallengeStatus::Other(other),
        }
    }
}

/// Token status reported by an NSM device.
///
/// The transport delivers each enum field as a fully qualified dotted
/// string; only the final segment is meaningful to callers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NsmTokenStatus {
    pub token_type: String,
    pub token_status: String,
    pub additional_info: String,
    pub time_left: u32,
}

impl NsmTokenStatus {
    /// Decode the transport tuple, keeping only the final dotted segment of
    /// each enum string.
    pub fn from_dbus(
        token_type: &str,
        token_status: &str,
        additional_info: &str,
        time_left: u32,
    ) -> NsmTokenStatus {
        fn tail(s: &str) -> String {
            s.rsplit('.').next().unwrap_or(s).to_string()
        }
        NsmTokenStatus {
            token_type: tail(token_type),
            token_status: tail(token_status),
            additional_info: tail(additional_info),
            time_left,
        }
    }

    pub fn to_json(&self) -> Value {
        json!({
            "TokenType": self.token_type,
            "Status": self.token_status,
            "AdditionalInfo": self.additional_info,
            "TimeLeft": self.time_left,
        })
    }
}

/// Whether a token is installed on the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallStatus {
    NotInstalled,
    Installed,
    Invalid,
}

impl InstallStatus {
    pub fn from_byte(b: u8) -> InstallStatus {
        match b {
            0x00 => InstallStatus::NotInstalled,
            0x01 => InstallStatus::Installed,
            _ => InstallStatus::Invalid,
        }
    }
}

/// Firmware fuse provisioning of the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FuseType {
    Debug,
    Production,
    Invalid,
}

impl FuseType {
    pub fn from_byte(b: u8) -> FuseType {
        match b {
            0x01 => FuseType::Debug,
            0x02 => FuseType::Production,
            _ => FuseType::Invalid,
        }
    }

    fn label(self) -> &'static str {
        match self {
            FuseType::Debug => "Debug",
            FuseType::Production => "Production",
            FuseType::Invalid => "Invalid",
        }
    }
}

bitflags! {
    /// Token type mask of a version-2 status record.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct TokenTypeMask: u32 {
        const DEBUG_FW = 0x01;
        const JTAG_UNLOCK = 0x02;
        const HW_UNLOCK = 0x04;
        const RUNTIME_DEBUG = 0x08;
        const FEATURE_UNLOCK = 0x10;
    }
}

impl TokenTypeMask {
    /// Comma-joined labels of the set token types, or `Undefined` when the
    /// mask is empty.
    pub fn describe(self) -> String {
        if self.is_empty() {
            return "Undefined".to_string();
        }
        let mut parts = Vec::new();
        if self.contains(TokenTypeMask::DEBUG_FW) {
            parts.push("DebugFw");
        }
        if self.contains(TokenTypeMask::JTAG_UNLOCK) {
            parts.push("JtagUnlock");
        }
        if self.contains(TokenTypeMask::HW_UNLOCK) {
            parts.push("HwUnlock");
        }
        if self.contains(TokenTypeMask::RUNTIME_DEBUG) {
            parts.push("RuntimeDebug");
        }
        if self.contains(TokenTypeMask::FEATURE_UNLOCK) {
            parts.push("FeatureUnlock");
        }
        parts.join(", ")
    }
}

bitflags! {
    /// The six boolean configuration sub-properties of a version-2 record.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct TokenConfig: u16 {
        const TEMPORAL = 1 << 0;
        const MANUAL_ACTIVATION = 1 << 1;
        const AUTOMATIC_REVOCATION = 1 << 2;
        const DEV_ID_ENABLED = 1 << 3;
        const NONCE_ENABLED = 1 << 4;
        const RESET_POST_INSTALL = 1 << 5;
    }
}

/// Post-install processing verdict in a version-2 record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessingStatus {
    NotProcessed,
    Processed,
    VerificationFailure,
    RuntimeError,
    Invalid,
}

impl ProcessingStatus {
    pub fn from_u16(v: u16) -> ProcessingStatus {
        match v {
            0x00 => ProcessingStatus::NotProcessed,
            0x01 => ProcessingStatus::Processed,
            0x02 => ProcessingStatus::VerificationFailure,
            0x03 => ProcessingStatus::RuntimeError,
            _ => ProcessingStatus::Invalid,
        }
    }

    fn label(self) -> &'static str {
        match self {
            ProcessingStatus::NotProcessed => "NotProcessed",
            ProcessingStatus::Processed => "Processed",
            ProcessingStatus::VerificationFailure => "VerificationFailure",
            ProcessingStatus::RuntimeError => "RuntimeError",
            ProcessingStatus::Invalid => "Invalid",
        }
    }
}

/// Fields added by a version-2 status record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusV2Ext {
    pub token_type: TokenTypeMask,
    pub validity_counter: u16,
    pub config: TokenConfig,
    pub processing_status: ProcessingStatus,
}

/// Decoded VDM token status record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VdmTokenStatus {
    pub install_status: InstallStatus,
    pub device_id: [u8; DEVICE_ID_LENGTH],
    pub fuse_type: FuseType,
    /// Present only for version-2 records.
    pub v2: Option<StatusV2Ext>,
}

impl VdmTokenStatus {
    /// Decode a version-1 record: install status, device id, fuse type.
    pub fn from_v1_bytes(b: &[u8; STATUS_RECORD_V1_LEN]) -> VdmTokenStatus {
        let mut device_id = [0u8; DEVICE_ID_LENGTH];
        device_id.copy_from_slice(&b[1..1 + DEVICE_ID_LENGTH]);
        VdmTokenStatus {
            install_status: InstallStatus::from_byte(b[0]),
            device_id,
            fuse_type: FuseType::from_byte(b[9]),
            v2: None,
        }
    }

    /// Decode a version-2 record: the v1 fields plus token-type mask,
    /// validity counter, config bitfield, and processing status. All
    /// multi-byte fields are little-endian.
    pub fn from_v2_bytes(b: &[u8; STATUS_RECORD_V2_LEN]) -> VdmTokenStatus {
        let mut device_id = [0u8; DEVICE_ID_LENGTH];
        device_id.copy_from_slice(&b[1..1 + DEVICE_ID_LENGTH]);
        let token_type = u32::from_le_bytes([b[10], b[11], b[12], b[13]]);
        let validity_counter = u16::from_le_bytes([b[14], b[15]]);
        let config = u16::from_le_bytes([b[16], b[17]]);
        let processing = u16::from_le_bytes([b[18], b[19]]);
        VdmTokenStatus {
            install_status: InstallStatus::from_byte(b[0]),
            device_id,
            fuse_type: FuseType::from_byte(b[9]),
            v2: Some(StatusV2Ext {
                token_type: TokenTypeMask::from_bits_truncate(token_type),
                validity_counter,
                config: TokenConfig::from_bits_truncate(config),
                processing_status: ProcessingStatus::from_u16(processing),
            }),
        }
    }

    /// Device id rendered as `0x` plus uppercase hex.
    pub fn device_id_hex(&self) -> String {
        format!("0x{}", hex::encode_upper(self.device_id))
    }

    /// Render the record the way the status resource reports it.
    ///
    /// The `DevIdStatus` disabled branch writes `Disabled` while the enabled
    /// branch writes to `Activation`; this mirrors the shipped mapping and is
    /// flagged in DESIGN.md pending schema confirmation.
    pub fn to_json(&self) -> Value {
        let mut json = json!({
            "TokenInstalled": self.install_status == InstallStatus::Installed,
            "FirmwareFuseType": self.fuse_type.label(),
            "DeviceID": self.device_id_hex(),
        });
        let Some(ext) = &self.v2 else {
            return json;
        };
        json["TokenType"] = Value::from(ext.token_type.describe());
        json["ValidityCounter"] = Value::from(ext.validity_counter);
        json["Lifecycle"] = Value::from(if ext.config.contains(TokenConfig::TEMPORAL) {
            "Temporal"
        } else {
            "Persistent"
        });
        json["Activation"] = Value::from(if ext.config.contains(TokenConfig::MANUAL_ACTIVATION) {
            "Manual"
        } else {
            "OnBoot"
        });
        json["Revocation"] =
            Value::from(if ext.config.contains(TokenConfig::AUTOMATIC_REVOCATION) {
                "Automatic"
            } else {
                "Manual"
            });
        if ext.config.contains(TokenConfig::DEV_ID_ENABLED) {
            json["Activation"] = Value::from("Enabled");
        } else {
            json["DevIdStatus"] = Value::from("Disabled");
        }
        json["AntiReplay"] = Value::from(if ext.config.contains(TokenConfig::NONCE_ENABLED) {
            "NonceEnabled"
        } else {
            "NonceDisabled"
        });
        json["ResetPostInstall"] =
            Value::from(if ext.config.contains(TokenConfig::RESET_POST_INSTALL) {
                "Mandated"
            } else {
                "NotMandated"
            });
        json["ProcessingStatus"] = Value::from(ext.processing_status.label());
        json
    }
}

#[cfg(test)]
#[path = "token_status_tests.rs"]
mod tests;
