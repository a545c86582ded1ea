//! Presentation bridge for the locker client.
//!
//! Converts coordinator and session state into plain serialisable DTOs that a
//! UI (or the demo binary) can render without touching the application
//! layer's channels or locks.
//!
//! # `ResultEnvelope<T>`
//!
//! Every bridge call returns a unified envelope:
//! ```json
//! { "success": true,  "data": {...}, "error": null }
//! { "success": false, "data": null,  "error": { "kind": "InvalidPassword", "message": "..." } }
//! ```
//!
//! # `ResultView`
//!
//! A command outcome rendered generically: a title plus an ordered list of
//! named fields.  The UI shows every kind of result the same way.

use std::sync::Arc;

use locker_core::{
    CommandOutcome, CommandResult, Device, DeviceId, EncryptionState, ErrorKind, LockerError,
};
use serde::{Deserialize, Serialize};

use crate::application::coordinator::{ConnectionCoordinator, RegistrySnapshot};
use crate::application::session::SessionCommandExecutor;

// ── DTOs ──────────────────────────────────────────────────────────────────────

/// One nearby device as shown in the device list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceDto {
    pub id: DeviceId,
    /// Advertisement bytes as spaced upper-case hex.
    pub user_data: String,
    pub peripheral_state: String,
    pub connected: bool,
}

/// The full device list plus the scanning indicator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryDto {
    pub scanning: bool,
    pub devices: Vec<DeviceDto>,
}

impl From<&RegistrySnapshot> for RegistryDto {
    fn from(snapshot: &RegistrySnapshot) -> Self {
        let devices = snapshot
            .nearby
            .iter()
            .map(|device| device_dto(device, snapshot.connected.contains(&device.id())))
            .collect();
        Self {
            scanning: snapshot.scanning,
            devices,
        }
    }
}

fn device_dto(device: &Device, connected: bool) -> DeviceDto {
    DeviceDto {
        id: device.id(),
        user_data: device
            .user_data()
            .iter()
            .map(|b| format!("{b:02X}"))
            .collect::<Vec<_>>()
            .join(" "),
        peripheral_state: format!("{:?}", device.peripheral_state),
        connected,
    }
}

/// A session as shown on the device detail screen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionDto {
    pub session_id: String,
    pub device: DeviceId,
    pub encryption: EncryptionState,
    pub last_result: Option<ResultView>,
}

impl From<&SessionCommandExecutor> for SessionDto {
    fn from(session: &SessionCommandExecutor) -> Self {
        Self {
            session_id: session.session_id().to_string(),
            device: session.device_id(),
            encryption: session.encryption_state(),
            last_result: session.last_result().as_ref().map(ResultView::from),
        }
    }
}

/// A titled list of named fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultView {
    pub title: String,
    pub fields: Vec<FieldDto>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDto {
    pub name: String,
    pub value: String,
}

impl From<&CommandOutcome> for ResultView {
    fn from(outcome: &CommandOutcome) -> Self {
        Self {
            title: outcome.title().to_string(),
            fields: outcome
                .fields()
                .into_iter()
                .map(|(name, value)| FieldDto {
                    name: name.to_string(),
                    value,
                })
                .collect(),
        }
    }
}

/// Error part of the envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorDto {
    pub kind: ErrorKind,
    pub message: String,
}

impl From<&LockerError> for ErrorDto {
    fn from(err: &LockerError) -> Self {
        Self {
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

/// Unified response wrapper for bridge calls.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultEnvelope<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<ErrorDto>,
}

impl<T> ResultEnvelope<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn err(error: &LockerError) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(ErrorDto::from(error)),
        }
    }
}

impl<T> From<CommandResult<T>> for ResultEnvelope<T> {
    fn from(result: CommandResult<T>) -> Self {
        match result {
            Ok(data) => Self::ok(data),
            Err(e) => Self::err(&e),
        }
    }
}

// ── Bridge calls ──────────────────────────────────────────────────────────────

/// Current device list.
pub async fn get_registry(coordinator: &ConnectionCoordinator) -> ResultEnvelope<RegistryDto> {
    let snapshot = coordinator.snapshot().await;
    ResultEnvelope::ok(RegistryDto::from(&snapshot))
}

/// State of the session for `device`.
pub async fn get_session(
    coordinator: &ConnectionCoordinator,
    device: DeviceId,
) -> ResultEnvelope<SessionDto> {
    match coordinator.session(device).await {
        Some(session) => ResultEnvelope::ok(SessionDto::from(session.as_ref())),
        None => ResultEnvelope::err(&LockerError::DeviceUnknown(device)),
    }
}

/// Connects and returns the new session's state.
pub async fn connect_device(
    coordinator: &ConnectionCoordinator,
    device: DeviceId,
) -> ResultEnvelope<SessionDto> {
    coordinator
        .connect(device)
        .await
        .map(|session: Arc<SessionCommandExecutor>| SessionDto::from(session.as_ref()))
        .into()
}

/// Renders a command result as a generic view.
pub fn render_result<T>(result: &CommandResult<T>) -> ResultView
where
    T: Clone + Into<CommandOutcome>,
{
    match result {
        Ok(value) => ResultView::from(&value.clone().into()),
        Err(e) => ResultView::from(&CommandOutcome::from(e)),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
