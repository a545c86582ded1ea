//! # locker-core
//!
//! Shared library for the locker client containing the device registry,
//! command result types, and the public-key signature validator.
//!
//! This crate has zero dependencies on async runtimes, radio stacks, or UI
//! frameworks.  Everything in it can be unit-tested on any host.
//!
//! # Architecture overview
//!
//! A locker controller is a short-range wireless peripheral that guards one or
//! more locker cells.  The client discovers controllers nearby, connects to
//! them, negotiates an encrypted command channel, and then issues
//! authenticated commands (unlock, identity retrieval).
//!
//! This crate (`locker-core`) is the shared foundation.  It defines:
//!
//! - **`domain`** – Devices as reported by the transport, the registry that
//!   tracks which devices are nearby and which are connected, and the
//!   per-session enums (encryption state, info request scope).
//!
//! - **`command`** – What commands return: the error taxonomy, the device
//!   info and unlock response payloads, and the tagged `CommandOutcome`
//!   union handed to the presentation layer.
//!
//! - **`signature`** – Parsing of whitespace-separated hex public keys and
//!   delegation of the signature check to the device info payload.

pub mod command;
pub mod domain;
pub mod signature;

pub use command::error::{CommandResult, ErrorKind, LockerError, TransportError};
pub use command::info::{DeviceInfo, SignatureScheme, VerificationError};
pub use command::lock::{OpenLockResponse, OpenLockStatus};
pub use command::outcome::{CommandOutcome, DeviceInfoOutcome};
pub use domain::device::{Device, DeviceId, LifecycleEvent, PeripheralState};
pub use domain::registry::{DeviceRegistry, RegistryChange};
pub use domain::session::{DeviceInfoRequestKind, EncryptionState};
pub use signature::{parse_public_key, SignatureValidator};
