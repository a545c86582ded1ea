//! ConnectionCoordinator: the single owner of device and session state.
//!
//! # How it works (for beginners)
//!
//! Several things can change the registry at once: the transport reports
//! devices coming and going, a connect attempt finishes, the user asks for a
//! disconnect.  Instead of sharing the registry behind a lock, one background
//! task (the *actor*) owns it and everything else talks to that task through
//! channels:
//!
//! ```text
//!  transport ──LifecycleEvent──►┐
//!                               │      ┌────────────────────────┐
//!  spawned connect/disconnect ──┼─────►│  CoordinatorActor      │──► watch<RegistrySnapshot>
//!  tasks (completions)          │      │  registry, sessions,   │──► broadcast<CoordinatorEvent>
//!                               │      │  scanning flag         │
//!  ConnectionCoordinator ─Cmd──►┘      └────────────────────────┘
//!  (cloneable handle)
//! ```
//!
//! The actor polls its inputs in a fixed priority: lifecycle events first,
//! then completions of transport calls, then caller commands.  A `Lost` event
//! that was delivered before a connect attempt resolved is therefore always
//! applied first, and the late connect result finds the device gone and is
//! discarded.
//!
//! Transport calls that take time (`connect`, `disconnect`) run in their own
//! tasks so the actor keeps processing events while they are pending.  Their
//! results come back as completions and are applied on the actor like any
//! other mutation.
//!
//! A disconnect only ever closes the session that was open when it was
//! issued; a session opened while it was in flight survives its completion.
//! A disconnect issued while a connect is pending waits for that connect to
//! finish and then runs against whatever it produced.

use std::collections::HashMap;
use std::sync::Arc;

use locker_core::{
    CommandResult, Device, DeviceId, DeviceRegistry, LifecycleEvent, LockerError,
    RegistryChange, TransportError,
};
use serde::Serialize;
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::adapter_availability::{AdapterAvailabilityMonitor, ReadinessSubscription};
use super::session::SessionCommandExecutor;
use super::transport::LockerTransport;

// ── Public types ──────────────────────────────────────────────────────────────

/// A consistent view of the registry, published after every mutation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RegistrySnapshot {
    pub nearby: Vec<Device>,
    pub connected: Vec<DeviceId>,
    pub scanning: bool,
}

/// Why a session was closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CloseReason {
    /// The device went out of range.
    Lost,
    /// The transport reported the peripheral as disconnected.
    PeripheralDisconnected,
    /// The caller asked for the disconnect.
    Disconnected,
    /// The coordinator shut down.
    Shutdown,
}

/// Session lifecycle notifications.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum CoordinatorEvent {
    SessionOpened {
        device: DeviceId,
        session: Uuid,
    },
    SessionClosed {
        device: DeviceId,
        session: Uuid,
        reason: CloseReason,
    },
}

/// Channel sizes for the coordinator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelCapacity {
    /// Pending caller commands before `send` waits.
    pub commands: usize,
    /// Events retained for slow [`ConnectionCoordinator::events`] subscribers.
    pub events: usize,
}

impl Default for ChannelCapacity {
    fn default() -> Self {
        Self {
            commands: 64,
            events: 128,
        }
    }
}

// ── Handle ────────────────────────────────────────────────────────────────────

type Reply<T> = oneshot::Sender<T>;

enum Command {
    StartScan(Reply<CommandResult<()>>),
    StopScan(Reply<()>),
    Connect(DeviceId, Reply<CommandResult<Arc<SessionCommandExecutor>>>),
    Disconnect(DeviceId, Reply<CommandResult<()>>),
    Session(DeviceId, Reply<Option<Arc<SessionCommandExecutor>>>),
    Snapshot(Reply<RegistrySnapshot>),
}

/// Cloneable handle to the coordinator task.
///
/// The task runs until every handle is dropped.
#[derive(Clone)]
pub struct ConnectionCoordinator {
    commands: mpsc::Sender<Command>,
    snapshot: watch::Receiver<RegistrySnapshot>,
    events: broadcast::Sender<CoordinatorEvent>,
}

impl ConnectionCoordinator {
    /// Spawns the coordinator task on the current Tokio runtime.
    ///
    /// `lifecycle` is the transport's event stream; the coordinator is its
    /// only consumer.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime.
    pub fn spawn(
        transport: Arc<dyn LockerTransport>,
        lifecycle: mpsc::Receiver<LifecycleEvent>,
        adapter: AdapterAvailabilityMonitor,
        capacity: ChannelCapacity,
    ) -> Self {
        let (command_tx, command_rx) = mpsc::channel(capacity.commands.max(1));
        let (snapshot_tx, snapshot_rx) = watch::channel(RegistrySnapshot::default());
        let (events_tx, _) = broadcast::channel(capacity.events.max(1));
        let (completion_tx, completion_rx) = mpsc::unbounded_channel();

        let readiness = adapter.subscribe();
        let actor = CoordinatorActor {
            transport,
            adapter,
            registry: DeviceRegistry::new(),
            sessions: HashMap::new(),
            pending_connects: HashMap::new(),
            deferred_disconnects: HashMap::new(),
            scanning: false,
            snapshot: snapshot_tx,
            events: events_tx.clone(),
            completions: completion_tx,
        };
        tokio::spawn(actor.run(command_rx, lifecycle, completion_rx, readiness));

        Self {
            commands: command_tx,
            snapshot: snapshot_rx,
            events: events_tx,
        }
    }

    /// Starts scanning for devices.
    ///
    /// Calling it while already scanning succeeds without touching the
    /// transport.
    ///
    /// # Errors
    ///
    /// - [`LockerError::AdapterUnavailable`] if the adapter is not powered on.
    /// - [`LockerError::ScanFailed`] if the transport refuses to scan.
    pub async fn start_scan(&self) -> CommandResult<()> {
        self.request(Command::StartScan).await?
    }

    /// Stops scanning.  A no-op when not scanning.
    pub async fn stop_scan(&self) {
        if self.request(Command::StopScan).await.is_err() {
            debug!("stop_scan ignored: coordinator stopped");
        }
    }

    /// Connects to a nearby device and opens a command session.
    ///
    /// Returns the existing session if the device is already connected.
    /// Concurrent calls for the same device share one transport connect.
    ///
    /// # Errors
    ///
    /// - [`LockerError::DeviceUnknown`] if the device is not nearby, or left
    ///   range before the connect finished.
    /// - [`LockerError::ConnectFailed`] if the transport could not connect.
    pub async fn connect(&self, device: DeviceId) -> CommandResult<Arc<SessionCommandExecutor>> {
        self.request(|reply| Command::Connect(device, reply)).await?
    }

    /// Disconnects a device and closes its session.
    ///
    /// The session is closed and the device leaves the connected set even
    /// when the transport reports an error.  If a connect to the device is
    /// still pending, the disconnect starts once that connect has finished.
    ///
    /// # Errors
    ///
    /// - [`LockerError::DeviceUnknown`] if the device is not nearby.
    /// - [`LockerError::DisconnectFailed`] if the transport reported an error.
    pub async fn disconnect(&self, device: DeviceId) -> CommandResult<()> {
        self.request(|reply| Command::Disconnect(device, reply)).await?
    }

    /// The open session for `device`, if any.
    pub async fn session(&self, device: DeviceId) -> Option<Arc<SessionCommandExecutor>> {
        self.request(|reply| Command::Session(device, reply))
            .await
            .ok()
            .flatten()
    }

    pub async fn list_nearby(&self) -> Vec<Device> {
        self.snapshot().await.nearby
    }

    pub async fn list_connected(&self) -> Vec<DeviceId> {
        self.snapshot().await.connected
    }

    pub async fn is_connected(&self, device: DeviceId) -> bool {
        self.snapshot().await.connected.contains(&device)
    }

    pub async fn is_scanning(&self) -> bool {
        self.snapshot().await.scanning
    }

    /// Watches registry snapshots.  The receiver starts with the latest one.
    pub fn subscribe(&self) -> watch::Receiver<RegistrySnapshot> {
        self.snapshot.clone()
    }

    /// Subscribes to session open/close events from now on.
    pub fn events(&self) -> broadcast::Receiver<CoordinatorEvent> {
        self.events.subscribe()
    }

    /// Snapshot after every event queued so far has been applied.
    ///
    /// Falls back to the last published snapshot if the task has stopped.
    pub async fn snapshot(&self) -> RegistrySnapshot {
        match self.request(Command::Snapshot).await {
            Ok(snapshot) => snapshot,
            Err(_) => self.snapshot.borrow().clone(),
        }
    }

    async fn request<T>(&self, build: impl FnOnce(Reply<T>) -> Command) -> CommandResult<T> {
        let (tx, rx) = oneshot::channel();
        self.commands
            .send(build(tx))
            .await
            .map_err(|_| LockerError::CoordinatorStopped)?;
        rx.await.map_err(|_| LockerError::CoordinatorStopped)
    }
}

// ── Actor ─────────────────────────────────────────────────────────────────────

enum Completion {
    Connected {
        device: DeviceId,
        result: Result<(), TransportError>,
    },
    Disconnected {
        device: DeviceId,
        /// Session open when the disconnect was issued.
        session: Option<Uuid>,
        result: Result<(), TransportError>,
        replies: Vec<Reply<CommandResult<()>>>,
    },
}

struct CoordinatorActor {
    transport: Arc<dyn LockerTransport>,
    adapter: AdapterAvailabilityMonitor,
    registry: DeviceRegistry,
    sessions: HashMap<DeviceId, Arc<SessionCommandExecutor>>,
    /// Callers waiting on an in-flight connect, per device.
    pending_connects: HashMap<DeviceId, Vec<Reply<CommandResult<Arc<SessionCommandExecutor>>>>>,
    /// Disconnects issued while a connect was pending, started when it finishes.
    deferred_disconnects: HashMap<DeviceId, Vec<Reply<CommandResult<()>>>>,
    scanning: bool,
    snapshot: watch::Sender<RegistrySnapshot>,
    events: broadcast::Sender<CoordinatorEvent>,
    completions: mpsc::UnboundedSender<Completion>,
}

impl CoordinatorActor {
    async fn run(
        mut self,
        mut commands: mpsc::Receiver<Command>,
        mut lifecycle: mpsc::Receiver<LifecycleEvent>,
        mut completions: mpsc::UnboundedReceiver<Completion>,
        mut readiness: ReadinessSubscription,
    ) {
        let mut lifecycle_open = true;
        let mut adapter_open = true;
        info!("connection coordinator started");

        loop {
            tokio::select! {
                biased;

                event = lifecycle.recv(), if lifecycle_open => match event {
                    Some(event) => self.on_lifecycle(event),
                    None => {
                        debug!("lifecycle stream closed");
                        lifecycle_open = false;
                    }
                },
                Some(completion) = completions.recv() => self.on_completion(completion),
                ready = readiness.next(), if adapter_open => match ready {
                    Some(ready) => self.on_readiness(ready),
                    None => adapter_open = false,
                },
                command = commands.recv() => match command {
                    Some(command) => self.on_command(command),
                    None => break,
                },
            }
        }

        for device in self.sessions.keys().copied().collect::<Vec<_>>() {
            self.close_session(device, CloseReason::Shutdown);
        }
        info!("connection coordinator stopped");
    }

    // ── Lifecycle ─────────────────────────────────────────────────────────────

    fn on_lifecycle(&mut self, event: LifecycleEvent) {
        let change = match event {
            LifecycleEvent::Found(device) => self.registry.on_found(device),
            LifecycleEvent::Lost(device) => {
                let id = device.id();
                let change = self.registry.on_lost(id);
                if change != RegistryChange::Unchanged {
                    self.close_session(id, CloseReason::Lost);
                }
                change
            }
            LifecycleEvent::Updated(device) => {
                let change = self.registry.on_updated(device);
                if let RegistryChange::CloseSession(id) = change {
                    self.close_session(id, CloseReason::PeripheralDisconnected);
                }
                change
            }
        };
        if change != RegistryChange::Unchanged {
            self.publish();
        }
    }

    fn on_readiness(&mut self, ready: bool) {
        if !ready && self.scanning {
            info!("radio adapter no longer ready; scanning halted");
            self.scanning = false;
            self.publish();
        }
    }

    // ── Commands ──────────────────────────────────────────────────────────────

    fn on_command(&mut self, command: Command) {
        match command {
            Command::StartScan(reply) => {
                let _ = reply.send(self.start_scan());
            }
            Command::StopScan(reply) => {
                self.stop_scan();
                let _ = reply.send(());
            }
            Command::Connect(device, reply) => self.connect(device, reply),
            Command::Disconnect(device, reply) => self.disconnect(device, reply),
            Command::Session(device, reply) => {
                let _ = reply.send(self.sessions.get(&device).cloned());
            }
            Command::Snapshot(reply) => {
                let _ = reply.send(self.build_snapshot());
            }
        }
    }

    fn start_scan(&mut self) -> CommandResult<()> {
        if !self.adapter.is_ready() {
            warn!(state = ?self.adapter.state(), "scan requested while adapter not ready");
            return Err(LockerError::AdapterUnavailable);
        }
        if self.scanning {
            return Ok(());
        }
        self.transport.start_scan().map_err(LockerError::ScanFailed)?;
        info!("scanning started");
        self.scanning = true;
        self.publish();
        Ok(())
    }

    fn stop_scan(&mut self) {
        if !self.scanning {
            return;
        }
        if let Err(e) = self.transport.stop_scan() {
            warn!("transport failed to stop scanning: {e}");
        }
        info!("scanning stopped");
        self.scanning = false;
        self.publish();
    }

    fn connect(&mut self, id: DeviceId, reply: Reply<CommandResult<Arc<SessionCommandExecutor>>>) {
        let Some(device) = self.registry.get(id).cloned() else {
            let _ = reply.send(Err(LockerError::DeviceUnknown(id)));
            return;
        };
        if let Some(session) = self.sessions.get(&id) {
            debug!(device = %id, "already connected");
            let _ = reply.send(Ok(Arc::clone(session)));
            return;
        }
        if let Some(waiters) = self.pending_connects.get_mut(&id) {
            debug!(device = %id, "joining pending connect");
            waiters.push(reply);
            return;
        }

        info!(device = %id, "connecting");
        self.pending_connects.insert(id, vec![reply]);
        let transport = Arc::clone(&self.transport);
        let completions = self.completions.clone();
        tokio::spawn(async move {
            let result = transport.connect(&device).await;
            let _ = completions.send(Completion::Connected { device: id, result });
        });
    }

    fn disconnect(&mut self, id: DeviceId, reply: Reply<CommandResult<()>>) {
        if self.pending_connects.contains_key(&id) {
            debug!(device = %id, "disconnect deferred until pending connect finishes");
            self.deferred_disconnects.entry(id).or_default().push(reply);
            return;
        }
        self.begin_disconnect(id, vec![reply]);
    }

    fn begin_disconnect(&mut self, id: DeviceId, replies: Vec<Reply<CommandResult<()>>>) {
        let Some(device) = self.registry.get(id).cloned() else {
            for reply in replies {
                let _ = reply.send(Err(LockerError::DeviceUnknown(id)));
            }
            return;
        };

        let session = self.sessions.get(&id).map(|s| s.session_id());
        info!(device = %id, ?session, "disconnecting");
        let transport = Arc::clone(&self.transport);
        let completions = self.completions.clone();
        tokio::spawn(async move {
            let result = transport.disconnect(&device).await;
            let _ = completions.send(Completion::Disconnected {
                device: id,
                session,
                result,
                replies,
            });
        });
    }

    // ── Completions ───────────────────────────────────────────────────────────

    fn on_completion(&mut self, completion: Completion) {
        match completion {
            Completion::Connected { device, result } => self.finish_connect(device, result),
            Completion::Disconnected {
                device,
                session,
                result,
                replies,
            } => self.finish_disconnect(device, session, result, replies),
        }
    }

    fn finish_disconnect(
        &mut self,
        id: DeviceId,
        issued_for: Option<Uuid>,
        result: Result<(), TransportError>,
        replies: Vec<Reply<CommandResult<()>>>,
    ) {
        let current = self.sessions.get(&id).map(|s| s.session_id());
        if current == issued_for {
            self.registry.mark_disconnected(id);
            self.close_session(id, CloseReason::Disconnected);
            self.publish();
        } else {
            debug!(device = %id, ?current, "newer session opened during disconnect; kept");
        }

        let result = result.map_err(|source| {
            warn!(device = %id, "transport disconnect failed: {source}");
            LockerError::DisconnectFailed { device: id, source }
        });
        for reply in replies {
            let _ = reply.send(result.clone());
        }
    }

    fn finish_connect(&mut self, id: DeviceId, result: Result<(), TransportError>) {
        let waiters = self.pending_connects.remove(&id).unwrap_or_default();

        let outcome = match result {
            Err(source) => {
                warn!(device = %id, "connect failed: {source}");
                Err(LockerError::ConnectFailed { device: id, source })
            }
            Ok(()) => {
                if self.registry.mark_connected(id) {
                    Ok(self.open_session(id))
                } else {
                    warn!(device = %id, "device left range while connecting; result discarded");
                    Err(LockerError::DeviceUnknown(id))
                }
            }
        };

        for waiter in waiters {
            let _ = waiter.send(outcome.clone());
        }

        if let Some(replies) = self.deferred_disconnects.remove(&id) {
            self.begin_disconnect(id, replies);
        }
    }

    // ── Sessions ──────────────────────────────────────────────────────────────

    fn open_session(&mut self, id: DeviceId) -> Arc<SessionCommandExecutor> {
        let session = Arc::new(SessionCommandExecutor::new(id, Arc::clone(&self.transport)));
        info!(device = %id, session = %session.session_id(), "session opened");
        self.sessions.insert(id, Arc::clone(&session));
        self.publish();
        let _ = self.events.send(CoordinatorEvent::SessionOpened {
            device: id,
            session: session.session_id(),
        });
        session
    }

    fn close_session(&mut self, id: DeviceId, reason: CloseReason) {
        let Some(session) = self.sessions.remove(&id) else {
            return;
        };
        session.retire();
        info!(device = %id, session = %session.session_id(), ?reason, "session closed");
        let _ = self.events.send(CoordinatorEvent::SessionClosed {
            device: id,
            session: session.session_id(),
            reason,
        });
    }

    // ── Snapshots ─────────────────────────────────────────────────────────────

    fn build_snapshot(&self) -> RegistrySnapshot {
        RegistrySnapshot {
            nearby: self.registry.list_nearby(),
            connected: self.registry.list_connected(),
            scanning: self.scanning,
        }
    }

    fn publish(&self) {
        let next = self.build_snapshot();
        self.snapshot.send_if_modified(|current| {
            if *current == next {
                false
            } else {
                *current = next;
                true
            }
        });
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
