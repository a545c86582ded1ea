//! Unlock command response.

use serde::{Deserialize, Serialize};

/// How the controller handled an unlock request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OpenLockStatus {
    /// The cell latch was released.
    Opened,
    /// The cell was already open; nothing changed.
    AlreadyOpen,
    /// The password was well-formed but not accepted.
    Denied,
}

/// Structured response to an unlock command, reported to the caller as-is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenLockResponse {
    pub status: OpenLockStatus,
    /// Cell index the controller acted on.
    pub cell: u16,
}

impl OpenLockResponse {
    pub fn is_open(&self) -> bool {
        matches!(self.status, OpenLockStatus::Opened | OpenLockStatus::AlreadyOpen)
    }
}
