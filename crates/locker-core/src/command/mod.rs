//! Command payloads, outcomes, and the error taxonomy.
//!
//! Every user-initiated command resolves to exactly one
//! [`CommandResult`](error::CommandResult).  Successful results carry one of
//! the payload types defined here; failures carry a [`LockerError`](error::LockerError).

pub mod error;
pub mod info;
pub mod lock;
pub mod outcome;
