//! Error taxonomy for locker commands.
//!
//! Every command-level failure is captured into a [`CommandResult`]; none of
//! them is fatal to the process.  [`LockerError::kind`] flattens an error to a
//! serialisable [`ErrorKind`] so the presentation layer can branch on the
//! failure without matching on message strings.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::info::VerificationError;
use crate::domain::device::DeviceId;

/// The caller-visible outcome of a command: exactly one of success or failure.
pub type CommandResult<T> = Result<T, LockerError>;

/// Errors reported by the radio transport collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// The peripheral did not answer in time.
    #[error("operation timed out")]
    Timeout,
    /// The command requires an active connection and there is none.
    #[error("no active connection")]
    NotConnected,
    /// The peripheral answered with a non-success status.
    #[error("device rejected the command (status {0:#04x})")]
    Rejected(u8),
    /// Any other link-layer failure, described by the transport.
    #[error("link error: {0}")]
    Link(String),
}

/// Errors surfaced to callers of the coordinator and the session executor.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LockerError {
    /// The radio adapter is not powered on.
    #[error("radio adapter is not available")]
    AdapterUnavailable,

    /// The device id is not in the nearby set (or its session was closed).
    #[error("unknown device {0}")]
    DeviceUnknown(DeviceId),

    #[error("failed to connect to device {device}: {source}")]
    ConnectFailed {
        device: DeviceId,
        #[source]
        source: TransportError,
    },

    /// The transport did not acknowledge the disconnect.  Local cleanup has
    /// already happened when this is reported.
    #[error("failed to disconnect from device {device}: {source}")]
    DisconnectFailed {
        device: DeviceId,
        #[source]
        source: TransportError,
    },

    #[error("encryption handshake failed: {0}")]
    EncryptionFailed(#[source] TransportError),

    /// The password text is not an unsigned 64-bit integer.
    #[error("password must be an unsigned 64-bit integer")]
    InvalidPassword,

    /// A public key token is not a two-digit hexadecimal byte.
    #[error("invalid public key encoding near {token:?}")]
    InvalidKeyEncoding { token: String },

    #[error("signature verification failed: {0}")]
    SignatureVerificationFailed(#[source] VerificationError),

    #[error("device info request failed: {0}")]
    DeviceInfoFetchFailed(#[source] TransportError),

    #[error("open lock command failed: {0}")]
    OpenLockFailed(#[source] TransportError),

    /// The adapter was ready but the transport refused to start scanning.
    #[error("failed to start scanning: {0}")]
    ScanFailed(#[source] TransportError),

    /// The coordinator task is no longer running.
    #[error("connection coordinator has stopped")]
    CoordinatorStopped,
}

/// Flat, serialisable classification of a [`LockerError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    AdapterUnavailable,
    DeviceUnknown,
    ConnectFailed,
    DisconnectFailed,
    EncryptionFailed,
    InvalidPassword,
    InvalidKeyEncoding,
    SignatureVerificationFailed,
    DeviceInfoFetchFailed,
    OpenLockFailed,
    ScanFailed,
    CoordinatorStopped,
}

impl LockerError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::AdapterUnavailable => ErrorKind::AdapterUnavailable,
            Self::DeviceUnknown(_) => ErrorKind::DeviceUnknown,
            Self::ConnectFailed { .. } => ErrorKind::ConnectFailed,
            Self::DisconnectFailed { .. } => ErrorKind::DisconnectFailed,
            Self::EncryptionFailed(_) => ErrorKind::EncryptionFailed,
            Self::InvalidPassword => ErrorKind::InvalidPassword,
            Self::InvalidKeyEncoding { .. } => ErrorKind::InvalidKeyEncoding,
            Self::SignatureVerificationFailed(_) => ErrorKind::SignatureVerificationFailed,
            Self::DeviceInfoFetchFailed(_) => ErrorKind::DeviceInfoFetchFailed,
            Self::OpenLockFailed(_) => ErrorKind::OpenLockFailed,
            Self::ScanFailed(_) => ErrorKind::ScanFailed,
            Self::CoordinatorStopped => ErrorKind::CoordinatorStopped,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_matches_variant() {
        assert_eq!(LockerError::InvalidPassword.kind(), ErrorKind::InvalidPassword);
        assert_eq!(
            LockerError::DeviceUnknown(DeviceId(1)).kind(),
            ErrorKind::DeviceUnknown
        );
        assert_eq!(
            LockerError::DisconnectFailed {
                device: DeviceId(1),
                source: TransportError::Timeout,
            }
            .kind(),
            ErrorKind::DisconnectFailed
        );
    }

    #[test]
    fn test_transport_source_is_preserved() {
        use std::error::Error as _;

        let err = LockerError::OpenLockFailed(TransportError::Rejected(0x05));
        let source = err.source().expect("source must be attached");
        assert_eq!(source.to_string(), "device rejected the command (status 0x05)");
    }

    #[test]
    fn test_messages_name_the_device() {
        let err = LockerError::ConnectFailed {
            device: DeviceId(12),
            source: TransportError::Timeout,
        };
        assert_eq!(
            err.to_string(),
            "failed to connect to device 12: operation timed out"
        );
    }
}
