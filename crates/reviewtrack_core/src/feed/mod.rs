//! Recent-activity feed boundary.
//!
//! Posting is best-effort from the lifecycle's point of view; failures are
//! reported to the caller and logged there, never retried here.

pub mod activity_feed;
