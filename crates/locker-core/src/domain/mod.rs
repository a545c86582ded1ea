//! Domain entities for the locker client.
//!
//! Pure business logic with no infrastructure dependencies.  The transport
//! reports devices and lifecycle changes; the registry turns that stream into
//! the canonical `nearby` / `connected` sets the rest of the client reads.

/// Devices, identities, and transport lifecycle events.
pub mod device;

/// The canonical nearby / connected device sets.
pub mod registry;

/// Per-session enums shared by the executor and the presentation layer.
pub mod session;
