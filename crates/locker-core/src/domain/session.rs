//! Per-session enums shared by the command executor and the presentation layer.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Encryption state of one command session.
///
/// Progresses `Disabled → InProgress → Enabled`.  A failed handshake returns
/// the session to `Disabled` so the caller may retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EncryptionState {
    #[default]
    Disabled,
    InProgress,
    Enabled,
}

/// Which identity scope a device info request fetches.
///
/// The scope also decides whether the returned payload is checked against a
/// caller-supplied public key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceInfoRequestKind {
    /// Unsigned device info.  No signature validation.
    #[default]
    None,
    /// Info signed with the project key.
    ProjectKey,
    /// Info signed with the per-device key issued by the project.
    DeviceKey,
}

impl DeviceInfoRequestKind {
    /// All request kinds, in picker order.
    pub const ALL: [Self; 3] = [Self::None, Self::ProjectKey, Self::DeviceKey];

    /// Whether the response must be validated against a public key.
    pub fn requires_validation(self) -> bool {
        !matches!(self, Self::None)
    }
}

impl fmt::Display for DeviceInfoRequestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::None => "none",
            Self::ProjectKey => "projectKey",
            Self::DeviceKey => "deviceKey",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_encryption_state_is_disabled() {
        assert_eq!(EncryptionState::default(), EncryptionState::Disabled);
    }

    #[test]
    fn test_only_none_skips_validation() {
        assert!(!DeviceInfoRequestKind::None.requires_validation());
        assert!(DeviceInfoRequestKind::ProjectKey.requires_validation());
        assert!(DeviceInfoRequestKind::DeviceKey.requires_validation());
    }

    #[test]
    fn test_request_kind_display_names() {
        let names: Vec<String> = DeviceInfoRequestKind::ALL.iter().map(|k| k.to_string()).collect();
        assert_eq!(names, ["none", "projectKey", "deviceKey"]);
    }
}
