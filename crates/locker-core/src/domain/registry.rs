//! DeviceRegistry: the canonical nearby / connected device sets.
//!
//! The registry is the client's in-memory view of every locker controller the
//! transport has reported.  It holds two collections:
//!
//! - `nearby`: every device currently in radio range, keyed by [`DeviceId`].
//! - `connected`: the ids of devices with an established command session.
//!
//! # Invariants
//!
//! - `connected ⊆ nearby.keys()` after every mutation.  A device can only be
//!   marked connected while it is nearby, and removing it from `nearby` also
//!   removes it from `connected`.
//! - A device id appears at most once in `nearby`; rediscovery replaces the
//!   stored entry.
//!
//! # Single writer
//!
//! The registry is a plain struct with `&mut self` mutators.  The coordinator
//! owns it on one sequencing task, so readers always see a consistent snapshot
//! and no locking is needed here.

use std::collections::{BTreeMap, BTreeSet};

use tracing::debug;

use super::device::{Device, DeviceId, PeripheralState};

/// What a lifecycle mutation requires from the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistryChange {
    /// Nothing observable changed.
    Unchanged,
    /// An entry was inserted, replaced, or refreshed.
    Updated,
    /// Any open session for this device must be closed.
    CloseSession(DeviceId),
}

/// In-memory registry of nearby and connected devices.
///
/// `BTreeMap` keeps listing order stable across snapshots so the device list
/// does not reshuffle on every update.
#[derive(Debug, Default)]
pub struct DeviceRegistry {
    nearby: BTreeMap<DeviceId, Device>,
    connected: BTreeSet<DeviceId>,
}

impl DeviceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces a discovered device.
    pub fn on_found(&mut self, device: Device) -> RegistryChange {
        let id = device.id();
        if self.nearby.insert(id, device).is_none() {
            debug!(device = %id, "device entered range");
        }
        RegistryChange::Updated
    }

    /// Removes a device from both sets unconditionally.
    pub fn on_lost(&mut self, id: DeviceId) -> RegistryChange {
        let was_nearby = self.nearby.remove(&id).is_some();
        let was_connected = self.connected.remove(&id);
        if was_nearby || was_connected {
            debug!(device = %id, was_connected, "device left range");
            RegistryChange::CloseSession(id)
        } else {
            RegistryChange::Unchanged
        }
    }

    /// Applies a peripheral state change.
    ///
    /// A transition to `Disconnected` drops the id from `connected` and asks the
    /// caller to close the session.  Other transitions only refresh the stored
    /// state for display; they never change set membership.
    pub fn on_updated(&mut self, device: Device) -> RegistryChange {
        let id = device.id();
        match device.peripheral_state {
            PeripheralState::Disconnected => {
                self.connected.remove(&id);
                if let Some(entry) = self.nearby.get_mut(&id) {
                    entry.peripheral_state = PeripheralState::Disconnected;
                }
                RegistryChange::CloseSession(id)
            }
            state => match self.nearby.get_mut(&id) {
                Some(entry) if entry.peripheral_state != state => {
                    entry.peripheral_state = state;
                    RegistryChange::Updated
                }
                _ => RegistryChange::Unchanged,
            },
        }
    }

    /// Marks `id` connected if, and only if, it is still nearby.
    ///
    /// Returns `false` when the device left range in the meantime; the caller
    /// must then discard whatever result it was about to apply.
    pub fn mark_connected(&mut self, id: DeviceId) -> bool {
        if self.nearby.contains_key(&id) {
            self.connected.insert(id);
            true
        } else {
            false
        }
    }

    /// Removes `id` from `connected`.  Returns whether it was present.
    pub fn mark_disconnected(&mut self, id: DeviceId) -> bool {
        self.connected.remove(&id)
    }

    pub fn get(&self, id: DeviceId) -> Option<&Device> {
        self.nearby.get(&id)
    }

    pub fn contains(&self, id: DeviceId) -> bool {
        self.nearby.contains_key(&id)
    }

    /// Returns a snapshot of all nearby devices, ordered by id.
    pub fn list_nearby(&self) -> Vec<Device> {
        self.nearby.values().cloned().collect()
    }

    /// Returns the ids of all connected devices, ordered.
    pub fn list_connected(&self) -> Vec<DeviceId> {
        self.connected.iter().copied().collect()
    }

    pub fn is_connected(&self, id: DeviceId) -> bool {
        self.connected.contains(&id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn device(id: u64) -> Device {
        Device::new(id, vec![id as u8])
    }

    #[test]
    fn test_registry_starts_empty() {
        let registry = DeviceRegistry::new();
        assert!(registry.list_nearby().is_empty());
        assert!(registry.list_connected().is_empty());
    }

    #[test]
    fn test_on_found_adds_device() {
        let mut registry = DeviceRegistry::new();
        registry.on_found(device(1));
        assert!(registry.contains(DeviceId(1)));
    }

    #[test]
    fn test_on_found_twice_replaces_without_duplicating() {
        // Arrange
        let mut registry = DeviceRegistry::new();
        registry.on_found(device(1));

        // Act
        registry.on_found(Device::new(1, vec![0xAA]));

        // Assert
        let nearby = registry.list_nearby();
        assert_eq!(nearby.len(), 1);
        assert_eq!(nearby[0].user_data(), &[0xAA]);
    }

    #[test]
    fn test_on_lost_removes_from_both_sets() {
        // Arrange
        let mut registry = DeviceRegistry::new();
        registry.on_found(device(1));
        assert!(registry.mark_connected(DeviceId(1)));

        // Act
        let change = registry.on_lost(DeviceId(1));

        // Assert
        assert_eq!(change, RegistryChange::CloseSession(DeviceId(1)));
        assert!(!registry.contains(DeviceId(1)));
        assert!(!registry.is_connected(DeviceId(1)));
    }

    #[test]
    fn test_on_lost_unknown_device_is_unchanged() {
        let mut registry = DeviceRegistry::new();
        assert_eq!(registry.on_lost(DeviceId(9)), RegistryChange::Unchanged);
    }

    #[test]
    fn test_on_updated_disconnected_drops_connection_but_keeps_nearby() {
        // Arrange
        let mut registry = DeviceRegistry::new();
        registry.on_found(device(1));
        registry.mark_connected(DeviceId(1));

        // Act
        let change =
            registry.on_updated(device(1).with_state(PeripheralState::Disconnected));

        // Assert
        assert_eq!(change, RegistryChange::CloseSession(DeviceId(1)));
        assert!(registry.contains(DeviceId(1)));
        assert!(!registry.is_connected(DeviceId(1)));
    }

    #[test]
    fn test_on_updated_non_disconnect_states_do_not_change_membership() {
        let mut registry = DeviceRegistry::new();
        registry.on_found(device(1));
        registry.mark_connected(DeviceId(1));

        for state in [
            PeripheralState::Connecting,
            PeripheralState::Connected,
            PeripheralState::Disconnecting,
        ] {
            registry.on_updated(device(1).with_state(state));
            assert!(registry.is_connected(DeviceId(1)), "{state:?} must not disconnect");
            assert_eq!(registry.get(DeviceId(1)).unwrap().peripheral_state, state);
        }
    }

    #[test]
    fn test_on_updated_unknown_device_is_not_inserted() {
        let mut registry = DeviceRegistry::new();
        registry.on_updated(device(4).with_state(PeripheralState::Connected));
        assert!(!registry.contains(DeviceId(4)));
    }

    #[test]
    fn test_mark_connected_refuses_device_not_nearby() {
        let mut registry = DeviceRegistry::new();
        assert!(!registry.mark_connected(DeviceId(5)));
        assert!(registry.list_connected().is_empty());
    }

    #[test]
    fn test_list_nearby_is_ordered_by_id() {
        let mut registry = DeviceRegistry::new();
        registry.on_found(device(3));
        registry.on_found(device(1));
        registry.on_found(device(2));
        let ids: Vec<_> = registry.list_nearby().iter().map(Device::id).collect();
        assert_eq!(ids, vec![DeviceId(1), DeviceId(2), DeviceId(3)]);
    }
}
