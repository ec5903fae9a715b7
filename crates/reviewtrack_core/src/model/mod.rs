//! Domain model for regulatory review projects.
//!
//! # Responsibility
//! - Define canonical project/phase/role structures used by core logic.
//! - Keep validation close to the data it guards.
//!
//! # Invariants
//! - Every project is identified by a stable `ProjectId`.
//! - Phases are owned by exactly one project and never deleted.

pub mod actor;
pub mod phase;
pub mod project;
pub mod role;

use std::time::{SystemTime, UNIX_EPOCH};

/// Returns current wall-clock time in Unix epoch milliseconds.
///
/// Falls back to `0` if the system clock reads earlier than the epoch.
pub fn now_epoch_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as i64)
        .unwrap_or(0)
}
