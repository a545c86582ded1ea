//! Tagged result kinds handed to the presentation layer.
//!
//! The presentation layer renders any command result generically: a title and
//! a list of named fields.  Instead of discovering fields at runtime, every
//! known result kind is a [`CommandOutcome`] variant that lists its own
//! fields through [`CommandOutcome::fields`].

use serde::Serialize;

use super::error::{ErrorKind, LockerError};
use super::info::DeviceInfo;
use super::lock::OpenLockResponse;

/// What a device info request produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceInfoOutcome {
    /// Unsigned scope; returned as fetched.
    Raw(DeviceInfo),
    /// Signed scope, checked against the caller's public key.
    Validated {
        info: DeviceInfo,
        signature_valid: bool,
    },
}

impl DeviceInfoOutcome {
    pub fn info(&self) -> &DeviceInfo {
        match self {
            Self::Raw(info) | Self::Validated { info, .. } => info,
        }
    }

    /// `None` when no validation was requested.
    pub fn signature_valid(&self) -> Option<bool> {
        match self {
            Self::Raw(_) => None,
            Self::Validated { signature_valid, .. } => Some(*signature_valid),
        }
    }
}

/// The last terminal result of a session command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CommandOutcome {
    EncryptionEnabled,
    LockOpened {
        response: OpenLockResponse,
    },
    DeviceInfo {
        info: DeviceInfo,
    },
    ValidatedDeviceInfo {
        info: DeviceInfo,
        signature_valid: bool,
    },
    Failed {
        error: ErrorKind,
        message: String,
    },
}

impl CommandOutcome {
    /// Heading shown above the field list.
    pub fn title(&self) -> &'static str {
        match self {
            Self::EncryptionEnabled => "Encryption enabled",
            Self::LockOpened { .. } => "Open lock response",
            Self::DeviceInfo { .. } => "Device info",
            Self::ValidatedDeviceInfo { .. } => "Device info with validation",
            Self::Failed { .. } => "Error",
        }
    }

    /// Named fields for generic display, in a stable order.
    pub fn fields(&self) -> Vec<(&'static str, String)> {
        match self {
            Self::EncryptionEnabled => Vec::new(),
            Self::LockOpened { response } => vec![
                ("status", format!("{:?}", response.status)),
                ("cell", response.cell.to_string()),
            ],
            Self::DeviceInfo { info } => info_fields(info),
            Self::ValidatedDeviceInfo { info, signature_valid } => {
                let mut fields = info_fields(info);
                fields.push(("signature_valid", signature_valid.to_string()));
                fields
            }
            Self::Failed { error, message } => vec![
                ("error", format!("{error:?}")),
                ("message", message.clone()),
            ],
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }
}

fn info_fields(info: &DeviceInfo) -> Vec<(&'static str, String)> {
    let mut fields = vec![
        ("device_id", info.device_id.to_string()),
        ("project_id", info.project_id.to_string()),
        ("firmware_version", info.firmware_version.clone()),
        ("kind", info.kind.to_string()),
        ("signed_payload", hex_bytes(&info.signed_payload)),
    ];
    if let Some(signature) = &info.signature {
        fields.push(("signature", hex_bytes(signature)));
    }
    fields
}

fn hex_bytes(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("{b:02X}"))
        .collect::<Vec<_>>()
        .join(" ")
}

impl From<DeviceInfoOutcome> for CommandOutcome {
    fn from(outcome: DeviceInfoOutcome) -> Self {
        match outcome {
            DeviceInfoOutcome::Raw(info) => Self::DeviceInfo { info },
            DeviceInfoOutcome::Validated { info, signature_valid } => {
                Self::ValidatedDeviceInfo { info, signature_valid }
            }
        }
    }
}

impl From<OpenLockResponse> for CommandOutcome {
    fn from(response: OpenLockResponse) -> Self {
        Self::LockOpened { response }
    }
}

impl From<&LockerError> for CommandOutcome {
    fn from(err: &LockerError) -> Self {
        Self::Failed {
            error: err.kind(),
            message: err.to_string(),
        }
    }
}
