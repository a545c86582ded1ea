//! In-memory locker fleet implementing [`LockerTransport`].
//!
//! # How the simulation works (for beginners)
//!
//! A real transport talks to a radio stack: the stack reports advertisements
//! and link changes asynchronously, and commands travel over the air.  The
//! simulated transport keeps the same shape without a radio:
//!
//! - Each [`SimulatedLocker`] holds a password, a firmware version, and two
//!   Ed25519 signing keys (one per project, one per device), all derived
//!   deterministically from its ids so runs are reproducible.
//! - Tests or the demo move lockers in and out of range with
//!   [`SimulatedTransport::bring_in_range`] and
//!   [`SimulatedTransport::take_out_of_range`].  While scanning, those calls
//!   emit `Found` / `Lost` events on the lifecycle channel.
//! - Only lockers whose project id matches the transport's project id are
//!   ever reported.
//! - Session commands require an active link; `open_lock` additionally
//!   requires an encrypted link.
//! - Lifecycle emission never blocks the caller.  When the lifecycle channel is
//!   full the event is dropped with a warning, just as a radio stack drops
//!   advertisements nobody reads; a dropped `Lost` leaves the coordinator
//!   listing the locker.  Size the channel above the number of lockers that
//!   can change state before the coordinator drains it.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use ed25519_dalek::{Signer, SigningKey};
use locker_core::{
    Device, DeviceId, DeviceInfo, DeviceInfoRequestKind, LifecycleEvent, OpenLockResponse,
    OpenLockStatus, PeripheralState, TransportError,
};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::application::transport::LockerTransport;
use crate::infrastructure::crypto::{format_public_key, Ed25519Scheme};

/// Status byte returned when a command needs an encrypted link.
pub const STATUS_NOT_ENCRYPTED: u8 = 0x03;

// ── Simulated locker ──────────────────────────────────────────────────────────

/// One simulated locker controller.
#[derive(Debug, Clone)]
pub struct SimulatedLocker {
    pub id: DeviceId,
    pub project_id: u32,
    pub firmware_version: String,
    pub password: u64,
    /// Cell index reported in unlock responses.
    pub cell: u16,
    project_key: SigningKey,
    device_key: SigningKey,
}

impl SimulatedLocker {
    pub fn new(id: impl Into<DeviceId>, project_id: u32, password: u64) -> Self {
        let id = id.into();
        let mut project_seed = [0x5A; 32];
        project_seed[..4].copy_from_slice(&project_id.to_be_bytes());
        let mut device_seed = [0xA5; 32];
        device_seed[..8].copy_from_slice(&id.0.to_be_bytes());

        Self {
            id,
            project_id,
            firmware_version: "3.1.0".to_string(),
            password,
            cell: 1,
            project_key: SigningKey::from_bytes(&project_seed),
            device_key: SigningKey::from_bytes(&device_seed),
        }
    }

    /// Project public key in the `"DE AD .."` form users type in.
    pub fn project_public_key(&self) -> String {
        format_public_key(self.project_key.verifying_key().as_bytes())
    }

    /// Device public key in the `"DE AD .."` form users type in.
    pub fn device_public_key(&self) -> String {
        format_public_key(self.device_key.verifying_key().as_bytes())
    }

    fn advertisement(&self) -> Device {
        Device::new(self.id, self.project_id.to_be_bytes().to_vec())
    }

    fn device_info(&self, kind: DeviceInfoRequestKind) -> DeviceInfo {
        let payload = format!("{}|{}|{}", self.id, self.project_id, self.firmware_version);
        let info = DeviceInfo::new(
            self.id,
            self.project_id,
            self.firmware_version.clone(),
            kind,
            payload.clone().into_bytes(),
        );
        let key = match kind {
            DeviceInfoRequestKind::None => return info,
            DeviceInfoRequestKind::ProjectKey => &self.project_key,
            DeviceInfoRequestKind::DeviceKey => &self.device_key,
        };
        let signature = key.sign(payload.as_bytes()).to_bytes().to_vec();
        info.with_signature(signature, Arc::new(Ed25519Scheme))
    }
}

// ── Transport ─────────────────────────────────────────────────────────────────

#[derive(Default)]
struct Fleet {
    lockers: BTreeMap<DeviceId, SimulatedLocker>,
    in_range: BTreeSet<DeviceId>,
    linked: BTreeSet<DeviceId>,
    encrypted: BTreeSet<DeviceId>,
    opened: BTreeSet<DeviceId>,
    scanning: bool,
}

/// A [`LockerTransport`] backed by an in-memory fleet.
pub struct SimulatedTransport {
    project_id: u32,
    latency: Duration,
    events: mpsc::Sender<LifecycleEvent>,
    fleet: Mutex<Fleet>,
}

impl SimulatedTransport {
    /// Creates a transport reporting lockers of `project_id`.
    ///
    /// Returns the lifecycle stream to hand to the coordinator.  Events beyond
    /// `capacity` undrained ones are dropped.
    pub fn new(project_id: u32, capacity: usize) -> (Arc<Self>, mpsc::Receiver<LifecycleEvent>) {
        let (events, rx) = mpsc::channel(capacity.max(1));
        let transport = Arc::new(Self {
            project_id,
            latency: Duration::ZERO,
            events,
            fleet: Mutex::new(Fleet::default()),
        });
        (transport, rx)
    }

    /// Same as [`new`](Self::new) with a fixed delay on every async call.
    pub fn with_latency(
        project_id: u32,
        capacity: usize,
        latency: Duration,
    ) -> (Arc<Self>, mpsc::Receiver<LifecycleEvent>) {
        let (events, rx) = mpsc::channel(capacity.max(1));
        let transport = Arc::new(Self {
            project_id,
            latency,
            events,
            fleet: Mutex::new(Fleet::default()),
        });
        (transport, rx)
    }

    /// Registers a locker.  It stays out of range until brought in.
    pub fn add_locker(&self, locker: SimulatedLocker) {
        self.fleet().lockers.insert(locker.id, locker);
    }

    pub fn locker(&self, id: DeviceId) -> Option<SimulatedLocker> {
        self.fleet().lockers.get(&id).cloned()
    }

    /// Moves a locker into radio range.  Reported as `Found` while scanning.
    pub fn bring_in_range(&self, id: DeviceId) {
        let mut fleet = self.fleet();
        let Some(locker) = fleet.lockers.get(&id) else {
            warn!(device = %id, "bring_in_range for unregistered locker");
            return;
        };
        let advertisement = locker.advertisement();
        let visible = locker.project_id == self.project_id;
        fleet.in_range.insert(id);
        if visible && fleet.scanning {
            self.emit(LifecycleEvent::Found(advertisement));
        }
    }

    /// Moves a locker out of range, dropping any link to it.
    pub fn take_out_of_range(&self, id: DeviceId) {
        let mut fleet = self.fleet();
        if !fleet.in_range.remove(&id) {
            return;
        }
        let Some(advertisement) = fleet.lockers.get(&id).map(SimulatedLocker::advertisement)
        else {
            return;
        };
        if fleet.linked.remove(&id) {
            fleet.encrypted.remove(&id);
            self.emit(LifecycleEvent::Updated(
                advertisement.clone().with_state(PeripheralState::Disconnected),
            ));
        }
        if fleet.scanning {
            self.emit(LifecycleEvent::Lost(advertisement));
        }
    }

    pub fn is_linked(&self, id: DeviceId) -> bool {
        self.fleet().linked.contains(&id)
    }

    pub fn is_scanning(&self) -> bool {
        self.fleet().scanning
    }

    fn fleet(&self) -> MutexGuard<'_, Fleet> {
        self.fleet.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Lossy under backpressure; see the module docs.
    fn emit(&self, event: LifecycleEvent) {
        if let Err(e) = self.events.try_send(event) {
            warn!("dropping lifecycle event: {e}");
        }
    }

    async fn delay(&self) {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
    }

    /// Returns the locker if it is in range and linked.
    fn linked_locker(&self, id: DeviceId) -> Result<SimulatedLocker, TransportError> {
        let fleet = self.fleet();
        if !fleet.linked.contains(&id) {
            return Err(TransportError::NotConnected);
        }
        fleet
            .lockers
            .get(&id)
            .cloned()
            .ok_or(TransportError::NotConnected)
    }
}

#[async_trait]
impl LockerTransport for SimulatedTransport {
    fn start_scan(&self) -> Result<(), TransportError> {
        let mut fleet = self.fleet();
        if fleet.scanning {
            return Ok(());
        }
        fleet.scanning = true;
        let visible: Vec<Device> = fleet
            .in_range
            .iter()
            .filter_map(|id| fleet.lockers.get(id))
            .filter(|locker| locker.project_id == self.project_id)
            .map(SimulatedLocker::advertisement)
            .collect();
        debug!(visible = visible.len(), "simulated scan started");
        for device in visible {
            self.emit(LifecycleEvent::Found(device));
        }
        Ok(())
    }

    fn stop_scan(&self) -> Result<(), TransportError> {
        self.fleet().scanning = false;
        Ok(())
    }

    async fn connect(&self, device: &Device) -> Result<(), TransportError> {
        self.delay().await;
        let mut fleet = self.fleet();
        if !fleet.in_range.contains(&device.id()) {
            return Err(TransportError::Link("device out of range".to_string()));
        }
        fleet.linked.insert(device.id());
        self.emit(LifecycleEvent::Updated(
            device.clone().with_state(PeripheralState::Connected),
        ));
        Ok(())
    }

    async fn disconnect(&self, device: &Device) -> Result<(), TransportError> {
        self.delay().await;
        let mut fleet = self.fleet();
        fleet.encrypted.remove(&device.id());
        if fleet.linked.remove(&device.id()) {
            Ok(())
        } else {
            Err(TransportError::NotConnected)
        }
    }

    async fn enable_encryption(&self, device: DeviceId) -> Result<(), TransportError> {
        self.delay().await;
        self.linked_locker(device)?;
        self.fleet().encrypted.insert(device);
        Ok(())
    }

    async fn open_lock(
        &self,
        device: DeviceId,
        password: u64,
    ) -> Result<OpenLockResponse, TransportError> {
        self.delay().await;
        let locker = self.linked_locker(device)?;
        let mut fleet = self.fleet();
        if !fleet.encrypted.contains(&device) {
            return Err(TransportError::Rejected(STATUS_NOT_ENCRYPTED));
        }
        let status = if password != locker.password {
            OpenLockStatus::Denied
        } else if fleet.opened.insert(device) {
            OpenLockStatus::Opened
        } else {
            OpenLockStatus::AlreadyOpen
        };
        Ok(OpenLockResponse {
            status,
            cell: locker.cell,
        })
    }

    async fn device_info(
        &self,
        device: DeviceId,
        kind: DeviceInfoRequestKind,
    ) -> Result<DeviceInfo, TransportError> {
        self.delay().await;
        Ok(self.linked_locker(device)?.device_info(kind))
    }
}
