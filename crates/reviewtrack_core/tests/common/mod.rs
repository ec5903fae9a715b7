#![allow(dead_code)]

use reviewtrack_core::{
    AccessError, ActivityFeed, FeedError, GrantSubject, LifecycleConfig, NewsItem, PermissionStore,
    PhaseEngine, Project, ProjectId, ProjectLifecycle, ProjectListQuery, ProjectRepository,
    RepoError, RepoResult, RoleGrant, SqliteActivityFeed, SqlitePermissionStore,
    SqliteProjectRepository,
};
use rusqlite::Connection;

pub type SqliteLifecycle<'conn> = ProjectLifecycle<
    SqliteProjectRepository<'conn>,
    SqlitePermissionStore<'conn>,
    SqliteActivityFeed<'conn>,
>;

pub fn sqlite_lifecycle(conn: &Connection) -> SqliteLifecycle<'_> {
    sqlite_lifecycle_with(conn, LifecycleConfig::default())
}

pub fn sqlite_lifecycle_with(conn: &Connection, config: LifecycleConfig) -> SqliteLifecycle<'_> {
    ProjectLifecycle::new(
        SqliteProjectRepository::new(conn),
        SqlitePermissionStore::new(conn),
        SqliteActivityFeed::new(conn),
        PhaseEngine::with_defaults(),
        config,
    )
}

/// Permission store whose every call fails.
pub struct OfflinePermissionStore;

impl PermissionStore for OfflinePermissionStore {
    fn find_roles_for_user(&self, _username: &str) -> Result<Vec<RoleGrant>, AccessError> {
        Err(AccessError::Unavailable("role service offline".to_string()))
    }

    fn grant_role(&self, _subject: &GrantSubject, _grant: &RoleGrant) -> Result<(), AccessError> {
        Err(AccessError::Unavailable("role service offline".to_string()))
    }

    fn revoke_role(&self, _subject: &GrantSubject, _grant: &RoleGrant) -> Result<(), AccessError> {
        Err(AccessError::Unavailable("role service offline".to_string()))
    }

    fn purge_roles(&self, _subject: &GrantSubject) -> Result<usize, AccessError> {
        Err(AccessError::Unavailable("role service offline".to_string()))
    }
}

/// Activity feed whose posts always fail.
pub struct OfflineFeed;

impl ActivityFeed for OfflineFeed {
    fn post_message(&self, _item: &NewsItem) -> Result<(), FeedError> {
        Err(FeedError::InvalidData("feed offline".to_string()))
    }
}

/// Repository wrapper whose uniqueness probe fails.
pub struct ProbeFaultRepository<'conn> {
    pub inner: SqliteProjectRepository<'conn>,
}

impl ProjectRepository for ProbeFaultRepository<'_> {
    fn find_by_code(&self, code: &str) -> RepoResult<Option<Project>> {
        self.inner.find_by_code(code)
    }

    fn find_by_id(&self, id: ProjectId) -> RepoResult<Option<Project>> {
        self.inner.find_by_id(id)
    }

    fn code_exists(&self, _code: &str) -> RepoResult<bool> {
        Err(RepoError::InvalidData("store unreachable".to_string()))
    }

    fn save(&self, project: &Project) -> RepoResult<()> {
        self.inner.save(project)
    }

    fn list_projects(&self, query: &ProjectListQuery) -> RepoResult<Vec<Project>> {
        self.inner.list_projects(query)
    }
}

/// Repository wrapper whose writes always fail.
pub struct ReadOnlyRepository<'conn> {
    pub inner: SqliteProjectRepository<'conn>,
}

impl ProjectRepository for ReadOnlyRepository<'_> {
    fn find_by_code(&self, code: &str) -> RepoResult<Option<Project>> {
        self.inner.find_by_code(code)
    }

    fn find_by_id(&self, id: ProjectId) -> RepoResult<Option<Project>> {
        self.inner.find_by_id(id)
    }

    fn code_exists(&self, code: &str) -> RepoResult<bool> {
        self.inner.code_exists(code)
    }

    fn save(&self, _project: &Project) -> RepoResult<()> {
        Err(RepoError::InvalidData("store is read-only".to_string()))
    }

    fn list_projects(&self, query: &ProjectListQuery) -> RepoResult<Vec<Project>> {
        self.inner.list_projects(query)
    }
}

pub fn project_count(conn: &Connection) -> i64 {
    conn.query_row("SELECT COUNT(*) FROM projects;", [], |row| row.get(0))
        .unwrap()
}
