//! Role-grant store contract and SQLite implementation.

use crate::db::DbError;
use crate::model::role::RoleId;
use rusqlite::{params, Connection};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type AccessResult<T> = Result<T, AccessError>;

/// Permission store failure.
#[derive(Debug)]
pub enum AccessError {
    Db(DbError),
    /// Store could not answer; carries a transport-level description.
    Unavailable(String),
}

impl Display for AccessError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::Unavailable(message) => write!(f, "permission store unavailable: {message}"),
        }
    }
}

impl Error for AccessError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::Unavailable(_) => None,
        }
    }
}

impl From<rusqlite::Error> for AccessError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Holder of a role grant.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum GrantSubject {
    /// A user, keyed by username.
    User(String),
    /// A project object, keyed by project code.
    Project(String),
}

impl GrantSubject {
    fn kind(&self) -> &'static str {
        match self {
            Self::User(_) => "user",
            Self::Project(_) => "project",
        }
    }

    fn key(&self) -> &str {
        match self {
            Self::User(value) | Self::Project(value) => value,
        }
    }
}

/// One role scoped to a context (project code).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RoleGrant {
    pub context: String,
    pub role: String,
}

impl RoleGrant {
    pub fn new(context: impl Into<String>, role: impl Into<String>) -> Self {
        Self {
            context: context.into(),
            role: role.into(),
        }
    }

    /// Grant for a project role; context is the role's project code.
    pub fn for_role(role: &RoleId) -> Self {
        Self::new(role.project_code(), role.to_string())
    }
}

/// Capability-based permission store used by the lifecycle.
pub trait PermissionStore {
    /// Returns every grant held by the user. Zero grants is `Ok(vec![])`.
    fn find_roles_for_user(&self, username: &str) -> AccessResult<Vec<RoleGrant>>;
    fn grant_role(&self, subject: &GrantSubject, grant: &RoleGrant) -> AccessResult<()>;
    /// Removes one grant. Revoking a grant the subject does not hold is a no-op.
    fn revoke_role(&self, subject: &GrantSubject, grant: &RoleGrant) -> AccessResult<()>;
    /// Removes every grant held by `subject`, returning how many were removed.
    fn purge_roles(&self, subject: &GrantSubject) -> AccessResult<usize>;
}

/// SQLite-backed permission store over `role_grants`.
pub struct SqlitePermissionStore<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqlitePermissionStore<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    /// Lists grants held by any subject, sorted by context and role.
    pub fn grants_for(&self, subject: &GrantSubject) -> AccessResult<Vec<RoleGrant>> {
        let mut stmt = self.conn.prepare(
            "SELECT context, role
             FROM role_grants
             WHERE subject_kind = ?1
               AND subject = ?2
             ORDER BY context ASC, role ASC;",
        )?;
        let grants = stmt
            .query_map(params![subject.kind(), subject.key()], |row| {
                Ok(RoleGrant {
                    context: row.get(0)?,
                    role: row.get(1)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(grants)
    }
}

impl PermissionStore for SqlitePermissionStore<'_> {
    fn find_roles_for_user(&self, username: &str) -> AccessResult<Vec<RoleGrant>> {
        self.grants_for(&GrantSubject::User(username.to_string()))
    }

    fn grant_role(&self, subject: &GrantSubject, grant: &RoleGrant) -> AccessResult<()> {
        self.conn.execute(
            "INSERT INTO role_grants (subject_kind, subject, context, role)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT (subject_kind, subject, role) DO NOTHING;",
            params![
                subject.kind(),
                subject.key(),
                grant.context.as_str(),
                grant.role.as_str()
            ],
        )?;
        Ok(())
    }

    fn revoke_role(&self, subject: &GrantSubject, grant: &RoleGrant) -> AccessResult<()> {
        self.conn.execute(
            "DELETE FROM role_grants
             WHERE subject_kind = ?1
               AND subject = ?2
               AND role = ?3;",
            params![subject.kind(), subject.key(), grant.role.as_str()],
        )?;
        Ok(())
    }

    fn purge_roles(&self, subject: &GrantSubject) -> AccessResult<usize> {
        let removed = self.conn.execute(
            "DELETE FROM role_grants WHERE subject_kind = ?1 AND subject = ?2;",
            params![subject.kind(), subject.key()],
        )?;
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::{GrantSubject, PermissionStore, RoleGrant, SqlitePermissionStore};
    use crate::db::open_db_in_memory;
    use crate::model::role::{RoleId, RoleKind, RoleOrg};

    #[test]
    fn grants_are_idempotent_and_scoped_by_subject() {
        let conn = open_db_in_memory().unwrap();
        let store = SqlitePermissionStore::new(&conn);
        let alice = GrantSubject::User("alice".to_string());
        let grant = RoleGrant::for_role(&RoleId::new("site-c", RoleOrg::Eao, RoleKind::Admin));

        store.grant_role(&alice, &grant).unwrap();
        store.grant_role(&alice, &grant).unwrap();
        store
            .grant_role(&GrantSubject::Project("site-c".to_string()), &grant)
            .unwrap();

        let grants = store.find_roles_for_user("alice").unwrap();
        assert_eq!(grants, vec![RoleGrant::new("site-c", "site-c:eao:admin")]);
        assert!(store.find_roles_for_user("bob").unwrap().is_empty());
    }

    #[test]
    fn revoke_removes_a_single_grant() {
        let conn = open_db_in_memory().unwrap();
        let store = SqlitePermissionStore::new(&conn);
        let alice = GrantSubject::User("alice".to_string());
        let admin = RoleGrant::new("site-c", "site-c:pro:admin");
        let member = RoleGrant::new("dam-b", "dam-b:pro:member");

        store.grant_role(&alice, &admin).unwrap();
        store.grant_role(&alice, &member).unwrap();
        store.revoke_role(&alice, &admin).unwrap();
        store.revoke_role(&alice, &admin).unwrap();

        assert_eq!(store.find_roles_for_user("alice").unwrap(), vec![member]);
    }

    #[test]
    fn purge_removes_only_subject_grants() {
        let conn = open_db_in_memory().unwrap();
        let store = SqlitePermissionStore::new(&conn);
        let alice = GrantSubject::User("alice".to_string());
        let bob = GrantSubject::User("bob".to_string());

        store
            .grant_role(&alice, &RoleGrant::new("site-c", "site-c:pro:admin"))
            .unwrap();
        store
            .grant_role(&alice, &RoleGrant::new("dam-b", "dam-b:pro:member"))
            .unwrap();
        store
            .grant_role(&bob, &RoleGrant::new("site-c", "site-c:eao:member"))
            .unwrap();

        assert_eq!(store.purge_roles(&alice).unwrap(), 2);
        assert!(store.find_roles_for_user("alice").unwrap().is_empty());
        assert_eq!(store.find_roles_for_user("bob").unwrap().len(), 1);
    }
}
