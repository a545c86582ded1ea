//! Radio adapter readiness as a state holder.
//!
//! The platform reports the adapter's power state whenever it changes.  The
//! monitor keeps the latest value and maps it to a single boolean: ready or
//! not.  It is a *state holder*, not an edge-triggered event source: a new
//! subscriber immediately receives the current value, even if nothing has
//! changed since it was set.
//!
//! The monitor enforces no policy.  The coordinator checks [`is_ready`]
//! before starting a scan; other callers must do the same.
//!
//! [`is_ready`]: AdapterAvailabilityMonitor::is_ready

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::info;

/// Power state of the platform radio adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdapterState {
    Unknown,
    Resetting,
    Unsupported,
    Unauthorized,
    PoweredOff,
    PoweredOn,
}

impl AdapterState {
    pub fn is_ready(self) -> bool {
        matches!(self, Self::PoweredOn)
    }
}

/// Holds the current adapter state and fans it out to subscribers.
///
/// Cloning the monitor shares the same underlying state.
#[derive(Debug, Clone)]
pub struct AdapterAvailabilityMonitor {
    tx: Arc<watch::Sender<AdapterState>>,
}

impl AdapterAvailabilityMonitor {
    /// Creates a monitor holding `initial`.
    pub fn new(initial: AdapterState) -> Self {
        let (tx, _rx) = watch::channel(initial);
        Self {
            tx: Arc::new(tx),
        }
    }

    /// Records a new adapter state reported by the platform.
    ///
    /// Subscribers are only woken when the state actually changes.
    pub fn update(&self, state: AdapterState) {
        let changed = self.tx.send_if_modified(|current| {
            if *current == state {
                false
            } else {
                *current = state;
                true
            }
        });
        if changed {
            info!(?state, ready = state.is_ready(), "radio adapter state changed");
        }
    }

    pub fn state(&self) -> AdapterState {
        *self.tx.borrow()
    }

    pub fn is_ready(&self) -> bool {
        self.state().is_ready()
    }

    /// Subscribes to readiness.  The first [`ReadinessSubscription::next`]
    /// resolves immediately with the current value.
    pub fn subscribe(&self) -> ReadinessSubscription {
        ReadinessSubscription {
            rx: self.tx.subscribe(),
            last: None,
        }
    }
}

impl Default for AdapterAvailabilityMonitor {
    /// Starts powered off until the platform reports otherwise.
    fn default() -> Self {
        Self::new(AdapterState::PoweredOff)
    }
}

/// A stream of readiness values, starting with the current one.
///
/// Consecutive values always differ: a state change that keeps readiness the
/// same (`PoweredOff → Unauthorized`) is not delivered.
#[derive(Debug)]
pub struct ReadinessSubscription {
    rx: watch::Receiver<AdapterState>,
    last: Option<bool>,
}

impl ReadinessSubscription {
    /// Returns the current readiness on the first call, then waits until
    /// readiness flips.  `None` once the monitor is dropped.
    pub async fn next(&mut self) -> Option<bool> {
        loop {
            if self.last.is_some() {
                self.rx.changed().await.ok()?;
            }
            let ready = self.rx.borrow_and_update().is_ready();
            if self.last != Some(ready) {
                self.last = Some(ready);
                return Some(ready);
            }
        }
    }
}
