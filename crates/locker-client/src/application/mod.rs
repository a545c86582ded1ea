//! Application layer use cases for the locker client.
//!
//! - **`transport`** – The [`LockerTransport`](transport::LockerTransport) port
//!   every radio stack implementation provides.  Injected at construction
//!   time; the application never reaches for a global SDK instance.
//!
//! - **`adapter_availability`** – Holds the radio adapter's power state and
//!   answers "may we scan right now?".
//!
//! - **`session`** – One [`SessionCommandExecutor`](session::SessionCommandExecutor)
//!   per connected device: encryption negotiation, unlock, and info requests.
//!
//! - **`coordinator`** – The top-level orchestrator.  Owns the device registry
//!   on a single sequencing task, runs scans, connects and disconnects, and
//!   creates or retires session executors.

pub mod adapter_availability;
pub mod coordinator;
pub mod session;
pub mod transport;
