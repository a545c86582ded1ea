//! Radio transport implementations.
//!
//! Platform radio stacks plug in here by implementing
//! [`LockerTransport`](crate::application::transport::LockerTransport).
//! [`simulated`] provides an in-memory fleet used by the demo binary and the
//! integration tests.

pub mod simulated;
