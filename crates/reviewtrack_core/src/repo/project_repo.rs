//! Project repository contract and SQLite implementation.
//!
//! # Responsibility
//! - Provide lookup, upsert and filtered listing over `projects`/`phases`.
//! - Keep SQL details inside the core persistence boundary.
//!
//! # Invariants
//! - `save` writes the project row and all of its phases in one transaction.
//! - Persisted phases are never deleted or reordered; `save` rejects a
//!   project whose phase list does not extend the stored one.
//! - Read paths reject invalid persisted state instead of masking it.

use crate::db::DbError;
use crate::model::phase::{Milestone, Phase, PhaseId, PhaseState};
use crate::model::project::{
    Project, ProjectAccess, ProjectId, ProjectStatus, ProjectValidationError,
};
use crate::model::role::RoleId;
use rusqlite::types::Value;
use rusqlite::{
    params, params_from_iter, Connection, Row, Transaction, TransactionBehavior,
};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

const PROJECT_SELECT_SQL: &str = "SELECT
    id,
    code,
    name,
    short_name,
    description,
    org_code,
    status,
    type,
    sector_role,
    region,
    eac_decision,
    lat,
    lon,
    mem_permit_id,
    current_phase,
    current_phase_code,
    current_phase_name,
    admin_role,
    proponent_admin_role,
    eao_invitee_role,
    proponent_invitee_role,
    eao_member,
    pro_member,
    access_json,
    is_published,
    date_completed
FROM projects";

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error for project persistence and query operations.
#[derive(Debug)]
pub enum RepoError {
    Validation(ProjectValidationError),
    Db(DbError),
    /// Stored phases are not a prefix of the phases being saved.
    PhaseHistoryRewritten(ProjectId),
    InvalidData(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::PhaseHistoryRewritten(id) => {
                write!(f, "phases of project {id} may only be appended")
            }
            Self::InvalidData(message) => write!(f, "invalid persisted project data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ProjectValidationError> for RepoError {
    fn from(value: ProjectValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Filter options for listing projects.
///
/// Results are always sorted by `name ASC, code ASC`.
#[derive(Debug, Clone, Default)]
pub struct ProjectListQuery {
    /// Exact match on `is_published` when set.
    pub is_published: Option<bool>,
    /// Set membership on `code` when set. An empty set matches nothing.
    pub codes: Option<Vec<String>>,
    /// `false` keeps only projects with `date_completed IS NULL`.
    pub include_archived: bool,
}

/// Repository interface for project persistence.
pub trait ProjectRepository {
    fn find_by_code(&self, code: &str) -> RepoResult<Option<Project>>;
    fn find_by_id(&self, id: ProjectId) -> RepoResult<Option<Project>>;
    /// Read-only uniqueness probe used by code allocation.
    fn code_exists(&self, code: &str) -> RepoResult<bool>;
    /// Inserts or updates the project together with its phases.
    fn save(&self, project: &Project) -> RepoResult<()>;
    fn list_projects(&self, query: &ProjectListQuery) -> RepoResult<Vec<Project>>;
}

/// SQLite-backed project repository.
pub struct SqliteProjectRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteProjectRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl ProjectRepository for SqliteProjectRepository<'_> {
    fn find_by_code(&self, code: &str) -> RepoResult<Option<Project>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{PROJECT_SELECT_SQL} WHERE code = ?1;"))?;
        let mut rows = stmt.query([code])?;
        match rows.next()? {
            Some(row) => Ok(Some(load_project(self.conn, row)?)),
            None => Ok(None),
        }
    }

    fn find_by_id(&self, id: ProjectId) -> RepoResult<Option<Project>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{PROJECT_SELECT_SQL} WHERE id = ?1;"))?;
        let mut rows = stmt.query([id.to_string()])?;
        match rows.next()? {
            Some(row) => Ok(Some(load_project(self.conn, row)?)),
            None => Ok(None),
        }
    }

    fn code_exists(&self, code: &str) -> RepoResult<bool> {
        let exists: i64 = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM projects WHERE code = ?1);",
            [code],
            |row| row.get(0),
        )?;
        Ok(exists == 1)
    }

    fn save(&self, project: &Project) -> RepoResult<()> {
        project.validate()?;

        let access_json = serde_json::to_string(&project.access)
            .map_err(|err| RepoError::InvalidData(format!("access lists: {err}")))?;

        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;

        let stored_phase_ids = list_phase_ids(&tx, project.id)?;
        let extends_history = stored_phase_ids.len() <= project.phases.len()
            && stored_phase_ids
                .iter()
                .zip(&project.phases)
                .all(|(stored, phase)| *stored == phase.id);
        if !extends_history {
            return Err(RepoError::PhaseHistoryRewritten(project.id));
        }

        tx.execute(
            "INSERT INTO projects (
                id,
                code,
                name,
                short_name,
                description,
                org_code,
                status,
                type,
                sector_role,
                region,
                eac_decision,
                lat,
                lon,
                mem_permit_id,
                current_phase,
                current_phase_code,
                current_phase_name,
                admin_role,
                proponent_admin_role,
                eao_invitee_role,
                proponent_invitee_role,
                eao_member,
                pro_member,
                access_json,
                is_published,
                date_completed
            ) VALUES (
                ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13,
                ?14, ?15, ?16, ?17, ?18, ?19, ?20, ?21, ?22, ?23, ?24, ?25, ?26
            )
            ON CONFLICT (id) DO UPDATE SET
                code = excluded.code,
                name = excluded.name,
                short_name = excluded.short_name,
                description = excluded.description,
                org_code = excluded.org_code,
                status = excluded.status,
                type = excluded.type,
                sector_role = excluded.sector_role,
                region = excluded.region,
                eac_decision = excluded.eac_decision,
                lat = excluded.lat,
                lon = excluded.lon,
                mem_permit_id = excluded.mem_permit_id,
                current_phase = excluded.current_phase,
                current_phase_code = excluded.current_phase_code,
                current_phase_name = excluded.current_phase_name,
                admin_role = excluded.admin_role,
                proponent_admin_role = excluded.proponent_admin_role,
                eao_invitee_role = excluded.eao_invitee_role,
                proponent_invitee_role = excluded.proponent_invitee_role,
                eao_member = excluded.eao_member,
                pro_member = excluded.pro_member,
                access_json = excluded.access_json,
                is_published = excluded.is_published,
                date_completed = excluded.date_completed,
                updated_at = (strftime('%s', 'now') * 1000);",
            params![
                project.id.to_string(),
                project.code.as_str(),
                project.name.as_str(),
                project.short_name.as_str(),
                project.description.as_str(),
                project.org_code.as_deref(),
                project.status.as_str(),
                project.project_type.as_str(),
                project.sector_role.as_deref(),
                project.region.as_deref(),
                project.eac_decision.as_deref(),
                project.lat,
                project.lon,
                project.mem_permit_id.as_deref(),
                project.current_phase.map(|id| id.to_string()),
                project.current_phase_code.as_deref(),
                project.current_phase_name.as_deref(),
                role_to_db(&project.admin_role),
                role_to_db(&project.proponent_admin_role),
                role_to_db(&project.eao_invitee_role),
                role_to_db(&project.proponent_invitee_role),
                role_to_db(&project.eao_member),
                role_to_db(&project.pro_member),
                access_json,
                bool_to_int(project.is_published),
                project.date_completed,
            ],
        )?;

        for (position, phase) in project.phases.iter().enumerate() {
            let milestones_json = serde_json::to_string(&phase.milestones).map_err(|err| {
                RepoError::InvalidData(format!("milestones of phase {}: {err}", phase.id))
            })?;
            tx.execute(
                "INSERT INTO phases (
                    id,
                    project_id,
                    position,
                    code,
                    name,
                    state,
                    milestones_json,
                    started_at,
                    completed_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                ON CONFLICT (id) DO UPDATE SET
                    code = excluded.code,
                    name = excluded.name,
                    state = excluded.state,
                    milestones_json = excluded.milestones_json,
                    started_at = excluded.started_at,
                    completed_at = excluded.completed_at
                WHERE phases.project_id = excluded.project_id;",
                params![
                    phase.id.to_string(),
                    project.id.to_string(),
                    position as i64,
                    phase.code.as_str(),
                    phase.name.as_str(),
                    phase_state_to_db(phase.state),
                    milestones_json,
                    phase.started_at,
                    phase.completed_at,
                ],
            )?;
        }

        tx.commit()?;
        Ok(())
    }

    fn list_projects(&self, query: &ProjectListQuery) -> RepoResult<Vec<Project>> {
        let mut sql = format!("{PROJECT_SELECT_SQL} WHERE 1 = 1");
        let mut bind_values: Vec<Value> = Vec::new();

        if let Some(is_published) = query.is_published {
            sql.push_str(" AND is_published = ?");
            bind_values.push(Value::Integer(bool_to_int(is_published)));
        }

        if let Some(codes) = &query.codes {
            if codes.is_empty() {
                return Ok(Vec::new());
            }
            let placeholders = vec!["?"; codes.len()].join(", ");
            sql.push_str(&format!(" AND code IN ({placeholders})"));
            bind_values.extend(codes.iter().cloned().map(Value::Text));
        }

        if !query.include_archived {
            sql.push_str(" AND date_completed IS NULL");
        }

        sql.push_str(" ORDER BY name ASC, code ASC");

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut projects = Vec::new();
        while let Some(row) = rows.next()? {
            projects.push(load_project(self.conn, row)?);
        }

        Ok(projects)
    }
}

fn load_project(conn: &Connection, row: &Row<'_>) -> RepoResult<Project> {
    let id = parse_uuid(&row.get::<_, String>("id")?, "projects.id")?;

    let status_text: String = row.get("status")?;
    let status = ProjectStatus::parse(&status_text).ok_or_else(|| {
        RepoError::InvalidData(format!("invalid status `{status_text}` in projects.status"))
    })?;

    let current_phase = match row.get::<_, Option<String>>("current_phase")? {
        Some(value) => Some(parse_uuid(&value, "projects.current_phase")?),
        None => None,
    };

    let access_text: String = row.get("access_json")?;
    let access: ProjectAccess = serde_json::from_str(&access_text).map_err(|err| {
        RepoError::InvalidData(format!("invalid projects.access_json: {err}"))
    })?;

    let is_published = match row.get::<_, i64>("is_published")? {
        0 => false,
        1 => true,
        other => {
            return Err(RepoError::InvalidData(format!(
                "invalid is_published value `{other}` in projects.is_published"
            )));
        }
    };

    let project = Project {
        id,
        code: row.get("code")?,
        name: row.get("name")?,
        short_name: row.get("short_name")?,
        description: row.get("description")?,
        org_code: row.get("org_code")?,
        status,
        project_type: row.get("type")?,
        sector_role: row.get("sector_role")?,
        region: row.get("region")?,
        eac_decision: row.get("eac_decision")?,
        lat: row.get("lat")?,
        lon: row.get("lon")?,
        mem_permit_id: row.get("mem_permit_id")?,
        phases: load_phases(conn, id)?,
        current_phase,
        current_phase_code: row.get("current_phase_code")?,
        current_phase_name: row.get("current_phase_name")?,
        admin_role: parse_role(row, "admin_role")?,
        proponent_admin_role: parse_role(row, "proponent_admin_role")?,
        eao_invitee_role: parse_role(row, "eao_invitee_role")?,
        proponent_invitee_role: parse_role(row, "proponent_invitee_role")?,
        eao_member: parse_role(row, "eao_member")?,
        pro_member: parse_role(row, "pro_member")?,
        access,
        is_published,
        date_completed: row.get("date_completed")?,
    };
    project.validate()?;
    Ok(project)
}

fn load_phases(conn: &Connection, project_id: ProjectId) -> RepoResult<Vec<Phase>> {
    let mut stmt = conn.prepare(
        "SELECT id, code, name, state, milestones_json, started_at, completed_at
         FROM phases
         WHERE project_id = ?1
         ORDER BY position ASC;",
    )?;
    let mut rows = stmt.query([project_id.to_string()])?;
    let mut phases = Vec::new();

    while let Some(row) = rows.next()? {
        let state_text: String = row.get("state")?;
        let state = parse_phase_state(&state_text).ok_or_else(|| {
            RepoError::InvalidData(format!("invalid phase state `{state_text}` in phases.state"))
        })?;
        let milestones_text: String = row.get("milestones_json")?;
        let milestones: Vec<Milestone> = serde_json::from_str(&milestones_text).map_err(|err| {
            RepoError::InvalidData(format!("invalid phases.milestones_json: {err}"))
        })?;

        phases.push(Phase {
            id: parse_uuid(&row.get::<_, String>("id")?, "phases.id")?,
            code: row.get("code")?,
            name: row.get("name")?,
            state,
            milestones,
            started_at: row.get("started_at")?,
            completed_at: row.get("completed_at")?,
        });
    }

    Ok(phases)
}

fn list_phase_ids(conn: &Connection, project_id: ProjectId) -> RepoResult<Vec<PhaseId>> {
    let mut stmt = conn.prepare(
        "SELECT id FROM phases WHERE project_id = ?1 ORDER BY position ASC;",
    )?;
    let mut rows = stmt.query([project_id.to_string()])?;
    let mut ids = Vec::new();
    while let Some(row) = rows.next()? {
        ids.push(parse_uuid(&row.get::<_, String>(0)?, "phases.id")?);
    }
    Ok(ids)
}

fn parse_role(row: &Row<'_>, column: &'static str) -> RepoResult<Option<RoleId>> {
    match row.get::<_, Option<String>>(column)? {
        Some(value) => RoleId::parse(&value)
            .map(Some)
            .map_err(|err| RepoError::InvalidData(format!("projects.{column}: {err}"))),
        None => Ok(None),
    }
}

fn parse_uuid(value: &str, column: &'static str) -> RepoResult<Uuid> {
    Uuid::parse_str(value)
        .map_err(|_| RepoError::InvalidData(format!("invalid uuid value `{value}` in {column}")))
}

fn role_to_db(role: &Option<RoleId>) -> Option<String> {
    role.as_ref().map(ToString::to_string)
}

fn phase_state_to_db(state: PhaseState) -> &'static str {
    match state {
        PhaseState::Pending => "pending",
        PhaseState::Active => "active",
        PhaseState::Completed => "completed",
    }
}

fn parse_phase_state(value: &str) -> Option<PhaseState> {
    match value {
        "pending" => Some(PhaseState::Pending),
        "active" => Some(PhaseState::Active),
        "completed" => Some(PhaseState::Completed),
        _ => None,
    }
}

fn bool_to_int(value: bool) -> i64 {
    if value {
        1
    } else {
        0
    }
}
