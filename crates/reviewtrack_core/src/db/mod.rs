//! Review-tracking store: connection bootstrap and schema migrations.
//!
//! # Responsibility
//! - Hand out connections whose schema holds the `projects`/`phases`
//!   tables and the `role_grants`/`recent_activity` side tables.
//! - Report which migration step failed when an upgrade cannot complete.
//!
//! # Invariants
//! - Schema version lives in `PRAGMA user_version`; one step per migration.
//! - A failed upgrade rolls back every step of that upgrade.
//! - Stores never see a connection whose schema is older or newer than
//!   this binary's.

use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod migrations;
mod open;

pub use open::{open_db, open_db_in_memory};

pub type DbResult<T> = Result<T, DbError>;

/// Storage failure shared by the project, permission and feed stores.
#[derive(Debug)]
pub enum DbError {
    Sqlite(rusqlite::Error),
    /// The file was written by a newer build of the tracker.
    SchemaTooNew { found: u32, supported: u32 },
    /// A schema step failed; the whole upgrade was rolled back.
    Migration {
        version: u32,
        name: &'static str,
        source: rusqlite::Error,
    },
}

impl Display for DbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite(err) => write!(f, "{err}"),
            Self::SchemaTooNew { found, supported } => write!(
                f,
                "review store schema version {found} is newer than supported {supported}"
            ),
            Self::Migration {
                version,
                name,
                source,
            } => write!(f, "schema migration {version} ({name}) failed: {source}"),
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sqlite(err) => Some(err),
            Self::Migration { source, .. } => Some(source),
            Self::SchemaTooNew { .. } => None,
        }
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}
