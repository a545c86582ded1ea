//! locker-client library entry point.
//!
//! Re-exports all public modules so that integration tests in `tests/` and the
//! binary entry point in `main.rs` share the same module tree.
//!
//! # What does locker-client do?
//!
//! The client drives short-range locker controllers on behalf of a user:
//!
//! 1. Watches the radio adapter and refuses to scan while it is off.
//! 2. Scans for controllers and keeps the nearby / connected sets current
//!    as the transport reports devices entering and leaving range.
//! 3. Connects to a controller and opens a command session for it.
//! 4. Within a session, negotiates encryption, unlocks cells, and fetches
//!    identity information with optional signature validation.
//!
//! Lifecycle events and command completions are applied on one sequencing
//! task owned by the [`ConnectionCoordinator`](application::coordinator::ConnectionCoordinator),
//! so a device that disappears while a command is in flight can never be
//! resurrected by the late result.

/// Application layer: the coordinator, session executor, and their ports.
pub mod application;

/// Infrastructure layer: transports, crypto, configuration, and UI DTOs.
pub mod infrastructure;
