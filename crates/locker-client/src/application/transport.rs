//! The radio transport port.
//!
//! The transport is the boundary to the wireless stack: it scans, connects,
//! runs the encryption handshake, and exchanges commands with a controller.
//! Each platform provides an implementation in the infrastructure layer;
//! [`SimulatedTransport`](crate::infrastructure::transport::simulated::SimulatedTransport)
//! is the in-memory one used by the demo binary.
//!
//! Lifecycle events (found / lost / updated) are not part of this trait.  The
//! transport hands a `tokio::sync::mpsc::Receiver<LifecycleEvent>` to the
//! coordinator at construction, which is the single consumer of that stream.

use async_trait::async_trait;
use locker_core::{
    Device, DeviceId, DeviceInfo, DeviceInfoRequestKind, OpenLockResponse, TransportError,
};

/// Platform-agnostic locker transport.
///
/// Session-scoped calls (`enable_encryption`, `open_lock`, `device_info`)
/// address the device by id and require an active connection to it.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LockerTransport: Send + Sync {
    /// Starts advertisement scanning.  Idempotent.
    fn start_scan(&self) -> Result<(), TransportError>;

    /// Stops advertisement scanning.  Idempotent.
    fn stop_scan(&self) -> Result<(), TransportError>;

    /// Establishes a link to `device`.
    async fn connect(&self, device: &Device) -> Result<(), TransportError>;

    /// Tears down the link to `device`.
    async fn disconnect(&self, device: &Device) -> Result<(), TransportError>;

    /// Runs the encryption handshake on the active link to `device`.
    async fn enable_encryption(&self, device: DeviceId) -> Result<(), TransportError>;

    /// Sends the unlock command with a numeric password.
    async fn open_lock(
        &self,
        device: DeviceId,
        password: u64,
    ) -> Result<OpenLockResponse, TransportError>;

    /// Fetches identity information in the requested scope.
    async fn device_info(
        &self,
        device: DeviceId,
        kind: DeviceInfoRequestKind,
    ) -> Result<DeviceInfo, TransportError>;
}
