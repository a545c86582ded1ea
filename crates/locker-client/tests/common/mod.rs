//! Shared test doubles for locker-client integration tests.
//!
//! [`GatedTransport`] records every call and can hold `connect`,
//! `disconnect` and `enable_encryption` open until the test releases them, which lets tests
//! interleave lifecycle events with in-flight commands deterministically.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use locker_client::application::adapter_availability::{AdapterAvailabilityMonitor, AdapterState};
use locker_client::application::coordinator::{ChannelCapacity, ConnectionCoordinator};
use locker_client::application::transport::LockerTransport;
use locker_core::{
    Device, DeviceId, DeviceInfo, DeviceInfoRequestKind, LifecycleEvent, OpenLockResponse,
    OpenLockStatus, TransportError,
};
use tokio::sync::{mpsc, watch, Notify};

/// A transport call as recorded by [`GatedTransport`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    StartScan,
    StopScan,
    Connect(DeviceId),
    Disconnect(DeviceId),
    EnableEncryption(DeviceId),
    OpenLock(DeviceId, u64),
    DeviceInfo(DeviceId, DeviceInfoRequestKind),
}

/// Holds a transport call until opened.
pub struct Gate {
    open: watch::Sender<bool>,
    entered: Notify,
}

impl Gate {
    pub fn opened() -> Self {
        Self {
            open: watch::channel(true).0,
            entered: Notify::new(),
        }
    }

    pub fn closed() -> Self {
        Self {
            open: watch::channel(false).0,
            entered: Notify::new(),
        }
    }

    pub fn open(&self) {
        self.open.send_replace(true);
    }

    /// Resolves once a call has reached the gate.
    pub async fn entered(&self) {
        self.entered.notified().await;
    }

    async fn pass(&self) {
        self.entered.notify_one();
        let mut rx = self.open.subscribe();
        let _ = rx.wait_for(|open| *open).await;
    }
}

/// Recording transport with gates on the slow calls.
pub struct GatedTransport {
    pub connect_gate: Gate,
    pub disconnect_gate: Gate,
    pub encryption_gate: Gate,
    pub connect_result: Mutex<Result<(), TransportError>>,
    pub disconnect_result: Mutex<Result<(), TransportError>>,
    pub calls: Mutex<Vec<Call>>,
}

impl Default for GatedTransport {
    fn default() -> Self {
        Self {
            connect_gate: Gate::opened(),
            disconnect_gate: Gate::opened(),
            encryption_gate: Gate::opened(),
            connect_result: Mutex::new(Ok(())),
            disconnect_result: Mutex::new(Ok(())),
            calls: Mutex::new(Vec::new()),
        }
    }
}

impl GatedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_closed_connect() -> Self {
        Self {
            connect_gate: Gate::closed(),
            ..Self::default()
        }
    }

    pub fn with_closed_disconnect() -> Self {
        Self {
            disconnect_gate: Gate::closed(),
            ..Self::default()
        }
    }

    pub fn with_closed_encryption() -> Self {
        Self {
            encryption_gate: Gate::closed(),
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, matches: impl Fn(&Call) -> bool) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| matches(c)).count()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl LockerTransport for GatedTransport {
    fn start_scan(&self) -> Result<(), TransportError> {
        self.record(Call::StartScan);
        Ok(())
    }

    fn stop_scan(&self) -> Result<(), TransportError> {
        self.record(Call::StopScan);
        Ok(())
    }

    async fn connect(&self, device: &Device) -> Result<(), TransportError> {
        self.record(Call::Connect(device.id()));
        self.connect_gate.pass().await;
        self.connect_result.lock().unwrap().clone()
    }

    async fn disconnect(&self, device: &Device) -> Result<(), TransportError> {
        self.record(Call::Disconnect(device.id()));
        self.disconnect_gate.pass().await;
        self.disconnect_result.lock().unwrap().clone()
    }

    async fn enable_encryption(&self, device: DeviceId) -> Result<(), TransportError> {
        self.record(Call::EnableEncryption(device));
        self.encryption_gate.pass().await;
        Ok(())
    }

    async fn open_lock(
        &self,
        device: DeviceId,
        password: u64,
    ) -> Result<OpenLockResponse, TransportError> {
        self.record(Call::OpenLock(device, password));
        Ok(OpenLockResponse {
            status: OpenLockStatus::Opened,
            cell: 1,
        })
    }

    async fn device_info(
        &self,
        device: DeviceId,
        kind: DeviceInfoRequestKind,
    ) -> Result<DeviceInfo, TransportError> {
        self.record(Call::DeviceInfo(device, kind));
        Ok(DeviceInfo::new(device, 1, "3.1.0", kind, Vec::new()))
    }
}

/// A coordinator over `transport` with a powered-on adapter.
pub struct Harness {
    pub coordinator: ConnectionCoordinator,
    pub lifecycle: mpsc::Sender<LifecycleEvent>,
    pub adapter: AdapterAvailabilityMonitor,
    pub transport: Arc<GatedTransport>,
}

impl Harness {
    pub fn new(transport: GatedTransport) -> Self {
        Self::with_adapter(transport, AdapterState::PoweredOn)
    }

    pub fn with_adapter(transport: GatedTransport, state: AdapterState) -> Self {
        let transport = Arc::new(transport);
        let (lifecycle, lifecycle_rx) = mpsc::channel(32);
        let adapter = AdapterAvailabilityMonitor::new(state);
        let coordinator = ConnectionCoordinator::spawn(
            transport.clone(),
            lifecycle_rx,
            adapter.clone(),
            ChannelCapacity::default(),
        );
        Self {
            coordinator,
            lifecycle,
            adapter,
            transport,
        }
    }

    pub async fn found(&self, id: u64) {
        self.send(LifecycleEvent::Found(device(id))).await;
    }

    pub async fn lost(&self, id: u64) {
        self.send(LifecycleEvent::Lost(device(id))).await;
    }

    pub async fn send(&self, event: LifecycleEvent) {
        self.lifecycle.send(event).await.expect("coordinator alive");
    }
}

pub fn device(id: u64) -> Device {
    Device::new(id, vec![id as u8])
}
