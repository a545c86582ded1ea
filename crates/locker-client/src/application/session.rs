//! SessionCommandExecutor: authenticated commands for one connected device.
//!
//! The coordinator creates one executor per successful connect and retires it
//! when the device disconnects or leaves range.  The executor refers to its
//! device by id only; it never touches the registry.
//!
//! # Encryption state machine
//!
//! ```text
//! Disabled ──enable_encryption()──► InProgress ──handshake ok──► Enabled
//!     ▲                                  │
//!     └────────── handshake failed ──────┘
//! ```
//!
//! The `Disabled → InProgress` step happens synchronously when
//! [`enable_encryption`](SessionCommandExecutor::enable_encryption) is
//! *called*, before the returned future is first polled.  A second call made
//! while the first is still pending observes `InProgress` and returns at once,
//! so at most one handshake is ever in flight per session.
//!
//! # Retirement
//!
//! Once retired, new commands fail with [`LockerError::DeviceUnknown`].
//! Commands already in flight still return their transport result to the
//! caller, but no longer touch the encryption state or the last result.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use locker_core::{
    CommandOutcome, CommandResult, DeviceId, DeviceInfoOutcome, DeviceInfoRequestKind,
    EncryptionState, LockerError, OpenLockResponse, SignatureValidator,
};
use tokio::sync::watch;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::transport::LockerTransport;

/// Executes session commands against one connected device.
pub struct SessionCommandExecutor {
    session_id: Uuid,
    device: DeviceId,
    transport: Arc<dyn LockerTransport>,
    validator: SignatureValidator,
    encryption: watch::Sender<EncryptionState>,
    last_result: watch::Sender<Option<CommandOutcome>>,
    retired: AtomicBool,
}

impl SessionCommandExecutor {
    /// Creates an executor for a freshly connected device.
    pub fn new(device: DeviceId, transport: Arc<dyn LockerTransport>) -> Self {
        let (encryption, _) = watch::channel(EncryptionState::Disabled);
        let (last_result, _) = watch::channel(None);
        Self {
            session_id: Uuid::new_v4(),
            device,
            transport,
            validator: SignatureValidator::new(),
            encryption,
            last_result,
            retired: AtomicBool::new(false),
        }
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub fn device_id(&self) -> DeviceId {
        self.device
    }

    pub fn encryption_state(&self) -> EncryptionState {
        *self.encryption.borrow()
    }

    /// Watches the encryption indicator.
    pub fn subscribe_encryption(&self) -> watch::Receiver<EncryptionState> {
        self.encryption.subscribe()
    }

    /// The most recent terminal outcome of any command on this session.
    pub fn last_result(&self) -> Option<CommandOutcome> {
        self.last_result.borrow().clone()
    }

    pub fn subscribe_results(&self) -> watch::Receiver<Option<CommandOutcome>> {
        self.last_result.subscribe()
    }

    pub fn is_retired(&self) -> bool {
        self.retired.load(Ordering::Acquire)
    }

    /// Closes the session.  Called by the coordinator only.
    pub(crate) fn retire(&self) {
        if !self.retired.swap(true, Ordering::AcqRel) {
            debug!(device = %self.device, session = %self.session_id, "session retired");
        }
    }

    /// Negotiates encryption on the session.
    ///
    /// Returns immediately with the current state unless the state is
    /// `Disabled`.  Otherwise the state moves to `InProgress` before this
    /// method returns, and the future resolves once the handshake finishes.
    ///
    /// # Errors
    ///
    /// - [`LockerError::DeviceUnknown`] if the session is retired.
    /// - [`LockerError::EncryptionFailed`] if the handshake fails; the state
    ///   reverts to `Disabled` so the call can be retried.
    pub fn enable_encryption(
        &self,
    ) -> impl Future<Output = CommandResult<EncryptionState>> + Send + '_ {
        let retired = self.is_retired();
        let claimed = !retired
            && self.encryption.send_if_modified(|state| {
                if *state == EncryptionState::Disabled {
                    *state = EncryptionState::InProgress;
                    true
                } else {
                    false
                }
            });

        async move {
            if retired {
                return Err(LockerError::DeviceUnknown(self.device));
            }
            if !claimed {
                let current = self.encryption_state();
                debug!(device = %self.device, ?current, "encryption request ignored");
                return Ok(current);
            }

            info!(device = %self.device, "starting encryption handshake");
            let result = match self.transport.enable_encryption(self.device).await {
                Ok(()) => {
                    info!(device = %self.device, "encryption enabled");
                    self.apply_encryption(EncryptionState::Enabled);
                    Ok(EncryptionState::Enabled)
                }
                Err(source) => {
                    warn!(device = %self.device, "encryption handshake failed: {source}");
                    self.apply_encryption(EncryptionState::Disabled);
                    Err(LockerError::EncryptionFailed(source))
                }
            };
            self.settle(result, |_| CommandOutcome::EncryptionEnabled)
        }
    }

    /// Sends the unlock command.
    ///
    /// `password_text` must parse as an unsigned 64-bit integer; otherwise the
    /// call fails without contacting the device.
    ///
    /// # Errors
    ///
    /// - [`LockerError::InvalidPassword`] if the text does not parse.
    /// - [`LockerError::OpenLockFailed`] carrying the transport error verbatim.
    /// - [`LockerError::DeviceUnknown`] if the session is retired.
    pub async fn open_lock(&self, password_text: &str) -> CommandResult<OpenLockResponse> {
        self.ensure_active()?;

        let result = match password_text.parse::<u64>() {
            Ok(password) => self.send_open_lock(password).await,
            Err(_) => {
                debug!(device = %self.device, "rejected non-numeric password");
                Err(LockerError::InvalidPassword)
            }
        };
        self.settle(result, |response| CommandOutcome::from(response.clone()))
    }

    async fn send_open_lock(&self, password: u64) -> CommandResult<OpenLockResponse> {
        info!(device = %self.device, "sending open lock command");
        let response = self
            .transport
            .open_lock(self.device, password)
            .await
            .map_err(LockerError::OpenLockFailed)?;
        info!(
            device = %self.device,
            status = ?response.status,
            cell = response.cell,
            "open lock answered"
        );
        Ok(response)
    }

    /// Fetches device info in the scope selected by `kind`.
    ///
    /// For signed scopes the payload is validated against `public_key_hex`
    /// and the verdict is returned alongside the info.  `public_key_hex` is
    /// ignored for [`DeviceInfoRequestKind::None`].
    ///
    /// # Errors
    ///
    /// - [`LockerError::DeviceInfoFetchFailed`] if the fetch fails.
    /// - [`LockerError::InvalidKeyEncoding`] or
    ///   [`LockerError::SignatureVerificationFailed`] if validation cannot run.
    ///   A failed validation is never merged into a partial success.
    pub async fn request_device_info(
        &self,
        kind: DeviceInfoRequestKind,
        public_key_hex: &str,
    ) -> CommandResult<DeviceInfoOutcome> {
        self.ensure_active()?;
        info!(device = %self.device, %kind, "requesting device info");
        let result = self.fetch_device_info(kind, public_key_hex).await;
        self.settle(result, |outcome| CommandOutcome::from(outcome.clone()))
    }

    async fn fetch_device_info(
        &self,
        kind: DeviceInfoRequestKind,
        public_key_hex: &str,
    ) -> CommandResult<DeviceInfoOutcome> {
        let info = self
            .transport
            .device_info(self.device, kind)
            .await
            .map_err(LockerError::DeviceInfoFetchFailed)?;

        if !kind.requires_validation() {
            return Ok(DeviceInfoOutcome::Raw(info));
        }
        let signature_valid = self.validator.validate(&info, public_key_hex)?;
        Ok(DeviceInfoOutcome::Validated {
            info,
            signature_valid,
        })
    }

    fn ensure_active(&self) -> CommandResult<()> {
        if self.is_retired() {
            Err(LockerError::DeviceUnknown(self.device))
        } else {
            Ok(())
        }
    }

    fn apply_encryption(&self, state: EncryptionState) {
        if !self.is_retired() {
            self.encryption.send_replace(state);
        }
    }

    /// Records the terminal outcome of a command, unless the session was
    /// retired while it ran, and hands the result back unchanged.
    fn settle<T>(
        &self,
        result: CommandResult<T>,
        outcome: impl FnOnce(&T) -> CommandOutcome,
    ) -> CommandResult<T> {
        if !self.is_retired() {
            let recorded = match &result {
                Ok(value) => outcome(value),
                Err(err) => CommandOutcome::from(err),
            };
            self.last_result.send_replace(Some(recorded));
        }
        result
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
