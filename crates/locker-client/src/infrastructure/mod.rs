//! Infrastructure layer for the locker client.
//!
//! Contains the adapters that touch the outside world: the radio transport,
//! the signature scheme, configuration files, and the presentation bridge.
//!
//! **Dependency rule**: this layer may depend on `application` and
//! `locker_core`, but MUST NOT be imported by the `application` layer.
//!
//! # Sub-modules
//!
//! - **`transport`** – `LockerTransport` implementations.  The in-memory
//!   `SimulatedTransport` backs the demo binary and the integration tests.
//!
//! - **`crypto`** – Ed25519 implementation of `SignatureScheme`.
//!
//! - **`storage`** – TOML configuration persistence.
//!
//! - **`ui_bridge`** – Serialisable DTOs and the result envelope handed to a
//!   presentation layer.

pub mod crypto;
pub mod storage;
pub mod transport;
pub mod ui_bridge;
