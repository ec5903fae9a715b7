//! Permission store boundary.
//!
//! # Responsibility
//! - Define the role-grant contract the lifecycle depends on.
//! - Provide a SQLite implementation for embedded deployments and tests.
//!
//! # Invariants
//! - Grants are keyed by `(subject, role)`; granting twice is a no-op.
//! - Callers never assume a grant is visible to reads in the same request.

pub mod permission_store;
