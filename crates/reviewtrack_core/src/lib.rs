//! Core domain logic for regulatory review project tracking.
//! This crate is the single source of truth for lifecycle invariants.

pub mod access;
pub mod config;
pub mod db;
pub mod feed;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use access::permission_store::{
    AccessError, GrantSubject, PermissionStore, RoleGrant, SqlitePermissionStore,
};
pub use config::{ConfigError, CoreConfig, LifecycleConfig, RoleGrantMode};
pub use feed::activity_feed::{ActivityFeed, FeedError, NewsItem, NewsKind, SqliteActivityFeed};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::actor::{Actor, PLATFORM_ORG_CODE};
pub use model::phase::{Activity, Milestone, Phase, PhaseId, PhaseState};
pub use model::project::{Project, ProjectAccess, ProjectId, ProjectStatus};
pub use model::role::{RoleId, RoleKind, RoleOrg};
pub use repo::project_repo::{
    ProjectListQuery, ProjectRepository, RepoError, RepoResult, SqliteProjectRepository,
};
pub use service::code_allocator::{allocate_code, guarantee_unique_code, slugify, AllocationError};
pub use service::context::RequestContext;
pub use service::phase_engine::{PhaseEngine, PhaseError};
pub use service::phase_template::{
    PhaseTemplate, PhaseTemplateRegistry, PhaseTemplateSource, DEFAULT_PHASE_CODES,
};
pub use service::project_lifecycle::{
    LifecycleError, LifecycleResult, ProjectLifecycle, ProjectSummary,
};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
