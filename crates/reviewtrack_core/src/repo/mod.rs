//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define use-case oriented data access contracts.
//! - Isolate SQLite query details from lifecycle orchestration.
//!
//! # Invariants
//! - Repository writes must enforce `Project::validate()` before persistence.
//! - Absent rows are `Ok(None)`; errors are reserved for transport faults
//!   and invalid persisted data.

pub mod project_repo;
