//! Devices as reported by the radio transport.
//!
//! A [`Device`] is an immutable identity plus an opaque advertisement payload
//! and the peripheral's current link state.  The registry owns the canonical
//! copy; everything else refers to a device by its [`DeviceId`].

use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque identifier the transport assigns to a locker controller.
///
/// Stable for as long as the device stays in radio range.  The numeric value
/// carries no meaning for the client beyond equality and ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceId(pub u64);

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for DeviceId {
    fn from(raw: u64) -> Self {
        Self(raw)
    }
}

/// Link state of a peripheral as reported by the transport.
///
/// Only [`PeripheralState::Disconnected`] has registry semantics; the other
/// states are display-only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PeripheralState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    Disconnecting,
}

/// A locker controller discovered by the transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Device {
    id: DeviceId,
    user_data: Vec<u8>,
    pub peripheral_state: PeripheralState,
}

impl Device {
    /// Creates a device in the [`PeripheralState::Disconnected`] state.
    pub fn new(id: impl Into<DeviceId>, user_data: Vec<u8>) -> Self {
        Self {
            id: id.into(),
            user_data,
            peripheral_state: PeripheralState::Disconnected,
        }
    }

    /// Returns a copy of this device carrying `state`.
    pub fn with_state(mut self, state: PeripheralState) -> Self {
        self.peripheral_state = state;
        self
    }

    pub fn id(&self) -> DeviceId {
        self.id
    }

    /// Project-defined advertisement bytes.  Opaque to the client.
    pub fn user_data(&self) -> &[u8] {
        &self.user_data
    }
}

/// A discovery or link-state event emitted by the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifecycleEvent {
    /// The device started advertising within range, or re-advertised.
    Found(Device),
    /// The device went out of range.
    Lost(Device),
    /// The device's peripheral state changed.
    Updated(Device),
}

impl LifecycleEvent {
    /// The device the event refers to.
    pub fn device(&self) -> &Device {
        match self {
            Self::Found(d) | Self::Lost(d) | Self::Updated(d) => d,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_device_starts_disconnected() {
        let device = Device::new(7, vec![1, 2, 3]);
        assert_eq!(device.peripheral_state, PeripheralState::Disconnected);
        assert_eq!(device.id(), DeviceId(7));
        assert_eq!(device.user_data(), &[1, 2, 3]);
    }

    #[test]
    fn test_with_state_keeps_identity() {
        let device = Device::new(7, vec![9]).with_state(PeripheralState::Connecting);
        assert_eq!(device.id(), DeviceId(7));
        assert_eq!(device.peripheral_state, PeripheralState::Connecting);
    }

    #[test]
    fn test_lifecycle_event_exposes_device() {
        let event = LifecycleEvent::Lost(Device::new(3, Vec::new()));
        assert_eq!(event.device().id(), DeviceId(3));
    }

    #[test]
    fn test_device_id_displays_raw_value() {
        assert_eq!(DeviceId(42).to_string(), "42");
    }
}
