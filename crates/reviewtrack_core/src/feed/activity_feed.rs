//! Activity feed contract and SQLite implementation.

use crate::db::DbError;
use crate::model::now_epoch_ms;
use crate::model::project::ProjectId;
use rusqlite::{params, Connection};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

pub type FeedResult<T> = Result<T, FeedError>;

#[derive(Debug)]
pub enum FeedError {
    Db(DbError),
    InvalidData(String),
}

impl Display for FeedError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::InvalidData(message) => write!(f, "invalid persisted feed data: {message}"),
        }
    }
}

impl Error for FeedError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::InvalidData(_) => None,
        }
    }
}

impl From<rusqlite::Error> for FeedError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Category of a feed entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NewsKind {
    News,
}

impl NewsKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::News => "News",
        }
    }

    fn parse(value: &str) -> Option<Self> {
        match value {
            "News" => Some(Self::News),
            _ => None,
        }
    }
}

/// Message posted to the feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewsItem {
    pub headline: String,
    pub content: String,
    pub project: ProjectId,
    pub kind: NewsKind,
}

/// Stored feed entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedEntry {
    pub id: Uuid,
    pub item: NewsItem,
    /// Unix epoch milliseconds.
    pub created_at: i64,
}

pub trait ActivityFeed {
    fn post_message(&self, item: &NewsItem) -> FeedResult<()>;
}

/// SQLite-backed feed over `recent_activity`.
pub struct SqliteActivityFeed<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteActivityFeed<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    /// Returns the newest `limit` entries, newest first.
    pub fn recent(&self, limit: u32) -> FeedResult<Vec<FeedEntry>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, headline, content, project_id, kind, created_at
             FROM recent_activity
             ORDER BY created_at DESC, rowid DESC
             LIMIT ?1;",
        )?;
        let mut rows = stmt.query([i64::from(limit)])?;
        let mut entries = Vec::new();

        while let Some(row) = rows.next()? {
            let id_text: String = row.get(0)?;
            let project_text: String = row.get(3)?;
            let kind_text: String = row.get(4)?;
            entries.push(FeedEntry {
                id: parse_uuid(&id_text)?,
                item: NewsItem {
                    headline: row.get(1)?,
                    content: row.get(2)?,
                    project: parse_uuid(&project_text)?,
                    kind: NewsKind::parse(&kind_text).ok_or_else(|| {
                        FeedError::InvalidData(format!("unknown feed kind `{kind_text}`"))
                    })?,
                },
                created_at: row.get(5)?,
            });
        }

        Ok(entries)
    }
}

impl ActivityFeed for SqliteActivityFeed<'_> {
    fn post_message(&self, item: &NewsItem) -> FeedResult<()> {
        self.conn.execute(
            "INSERT INTO recent_activity (id, headline, content, project_id, kind, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6);",
            params![
                Uuid::new_v4().to_string(),
                item.headline.as_str(),
                item.content.as_str(),
                item.project.to_string(),
                item.kind.as_str(),
                now_epoch_ms(),
            ],
        )?;
        Ok(())
    }
}

fn parse_uuid(value: &str) -> FeedResult<Uuid> {
    Uuid::parse_str(value)
        .map_err(|_| FeedError::InvalidData(format!("invalid uuid value `{value}`")))
}

#[cfg(test)]
mod tests {
    use super::{ActivityFeed, NewsItem, NewsKind, SqliteActivityFeed};
    use crate::db::open_db_in_memory;
    use uuid::Uuid;

    #[test]
    fn recent_returns_newest_first() {
        let conn = open_db_in_memory().unwrap();
        let feed = SqliteActivityFeed::new(&conn);
        let project = Uuid::new_v4();

        for headline in ["first", "second"] {
            feed.post_message(&NewsItem {
                headline: headline.to_string(),
                content: String::new(),
                project,
                kind: NewsKind::News,
            })
            .unwrap();
        }

        let entries = feed.recent(10).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].item.headline, "second");
        assert_eq!(feed.recent(1).unwrap().len(), 1);
    }
}
