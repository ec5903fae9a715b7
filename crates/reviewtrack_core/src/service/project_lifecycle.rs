//! Project lifecycle orchestration.
//!
//! # Responsibility
//! - Run project creation: code allocation, role provisioning, access
//!   stamping and default phase bootstrap.
//! - Run submission, phase completion/advancement and publishing.
//! - Serve the published and access-scoped project read models.
//!
//! # Invariants
//! - Steps run strictly in sequence; every mutation stays in memory until a
//!   single terminal `save`, so a failed operation persists nothing.
//! - A failed creation leaves no creator grant in the permission store.
//! - Best-effort side effects (creator grant in best-effort mode, submit
//!   grants, publish news) are logged on failure and never abort.
//! - Concurrent mutation of the same project is last-writer-wins; callers
//!   serialize per project code.

use crate::access::permission_store::{AccessError, GrantSubject, PermissionStore, RoleGrant};
use crate::config::{LifecycleConfig, RoleGrantMode};
use crate::feed::activity_feed::{ActivityFeed, NewsItem, NewsKind};
use crate::logging::sanitize_message;
use crate::model::project::{Project, ProjectId, ProjectStatus};
use crate::repo::project_repo::{ProjectListQuery, ProjectRepository, RepoError};
use crate::service::code_allocator::{
    allocate_code, guarantee_unique_code, slugify, AllocationError,
};
use crate::service::context::RequestContext;
use crate::service::phase_engine::{PhaseEngine, PhaseError};
use crate::service::phase_template::{PhaseTemplateRegistry, PhaseTemplateSource};
use crate::service::role_provisioner::{
    assign_creator_role, creator_role, init_default_roles, set_roles,
};
use log::{debug, info, warn};
use serde::Serialize;
use std::collections::BTreeSet;
use std::error::Error;
use std::fmt::{Display, Formatter};

const MAX_LOGGED_ERROR_CHARS: usize = 200;

pub type LifecycleResult<T> = Result<T, LifecycleError>;

/// Failure taxonomy for lifecycle operations.
#[derive(Debug)]
pub enum LifecycleError {
    /// Malformed input such as a name with no usable code characters.
    Validation(String),
    /// Referenced project or phase is absent.
    NotFound(String),
    /// Code uniqueness probe failed in the store.
    Allocation(AllocationError),
    UnknownTemplate(String),
    OutOfPhases { project: ProjectId, index: usize },
    NoCurrentPhase(ProjectId),
    /// Role query for the actor failed.
    RolesNotFound { username: String, source: AccessError },
    Repo(RepoError),
    Access(AccessError),
}

impl Display for LifecycleError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(message) => write!(f, "validation failed: {message}"),
            Self::NotFound(message) => write!(f, "not found: {message}"),
            Self::Allocation(err) => write!(f, "{err}"),
            Self::UnknownTemplate(code) => write!(f, "unknown phase template: {code}"),
            Self::OutOfPhases { project, index } => {
                write!(f, "project {project} has no phase after index {index}")
            }
            Self::NoCurrentPhase(project) => write!(f, "project {project} has no current phase"),
            Self::RolesNotFound { username, .. } => {
                write!(f, "roles not found for username: {username}")
            }
            Self::Repo(err) => write!(f, "{err}"),
            Self::Access(err) => write!(f, "{err}"),
        }
    }
}

impl Error for LifecycleError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Allocation(err) => Some(err),
            Self::RolesNotFound { source, .. } => Some(source),
            Self::Repo(err) => Some(err),
            Self::Access(err) => Some(err),
            _ => None,
        }
    }
}

impl From<AllocationError> for LifecycleError {
    fn from(value: AllocationError) -> Self {
        match value {
            AllocationError::InvalidName(name) => {
                Self::Validation(format!("cannot derive a project code from `{name}`"))
            }
            other => Self::Allocation(other),
        }
    }
}

impl From<PhaseError> for LifecycleError {
    fn from(value: PhaseError) -> Self {
        match value {
            PhaseError::UnknownTemplate(code) => Self::UnknownTemplate(code),
            PhaseError::NoCurrentPhase(project) => Self::NoCurrentPhase(project),
            PhaseError::OutOfPhases { project, index } => Self::OutOfPhases { project, index },
            PhaseError::PhaseNotFound(id) => Self::NotFound(format!("phase {id}")),
        }
    }
}

impl From<RepoError> for LifecycleError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::Validation(err) => Self::Validation(err.to_string()),
            other => Self::Repo(other),
        }
    }
}

impl From<AccessError> for LifecycleError {
    fn from(value: AccessError) -> Self {
        Self::Access(value)
    }
}

/// Minimal public projection of a project.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProjectSummary {
    pub id: ProjectId,
    pub code: String,
    pub name: String,
    pub region: Option<String>,
    pub status: ProjectStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub eac_decision: Option<String>,
    /// Name of the current phase.
    pub current_phase: Option<String>,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    #[serde(rename = "type")]
    pub project_type: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mem_permit_id: Option<String>,
}

impl ProjectSummary {
    fn published(project: Project) -> Self {
        Self {
            current_phase: project.current_phase().map(|phase| phase.name.clone()),
            id: project.id,
            code: project.code,
            name: project.name,
            region: project.region,
            status: project.status,
            eac_decision: project.eac_decision,
            lat: project.lat,
            lon: project.lon,
            project_type: project.project_type,
            description: project.description,
            mem_permit_id: project.mem_permit_id,
        }
    }

    fn member_view(project: Project) -> Self {
        Self {
            eac_decision: None,
            mem_permit_id: None,
            ..Self::published(project)
        }
    }
}

/// Orchestrates project creation and lifecycle transitions.
pub struct ProjectLifecycle<R, P, F, S = PhaseTemplateRegistry>
where
    R: ProjectRepository,
    P: PermissionStore,
    F: ActivityFeed,
    S: PhaseTemplateSource,
{
    repo: R,
    permissions: P,
    feed: F,
    engine: PhaseEngine<S>,
    config: LifecycleConfig,
}

impl<R, P, F, S> ProjectLifecycle<R, P, F, S>
where
    R: ProjectRepository,
    P: PermissionStore,
    F: ActivityFeed,
    S: PhaseTemplateSource,
{
    pub fn new(
        repo: R,
        permissions: P,
        feed: F,
        engine: PhaseEngine<S>,
        config: LifecycleConfig,
    ) -> Self {
        Self {
            repo,
            permissions,
            feed,
            engine,
            config,
        }
    }

    pub fn repo(&self) -> &R {
        &self.repo
    }

    pub fn permissions(&self) -> &P {
        &self.permissions
    }

    pub fn engine(&self) -> &PhaseEngine<S> {
        &self.engine
    }

    /// Prepares a new project for its first persistence.
    ///
    /// Allocates a unique code from `short_name`, defaults `org_code` from
    /// the actor, derives roles, stamps access lists for the creator role and
    /// bootstraps the default phases when none are present. Nothing is
    /// written to any store here; the creator grant is issued by `create`.
    pub fn preprocess_create(
        &self,
        ctx: &RequestContext,
        mut project: Project,
    ) -> LifecycleResult<Project> {
        let candidate = allocate_code(&project.short_name)?;
        project.code = guarantee_unique_code(&self.repo, &candidate)?;

        if project.org_code.is_none() {
            project.org_code = Some(ctx.actor.org_code.clone());
        }

        // Member roles are handed to the bulk role-assignment job; they are
        // only stamped onto the project here.
        let pending_member_roles = init_default_roles(&mut project);
        debug!(
            "event=roles_pending module=lifecycle code={} roles={}",
            project.code,
            pending_member_roles
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(",")
        );

        let creator = creator_role(&project, &ctx.actor);
        set_roles(&mut project, &creator);

        self.engine
            .bootstrap(&mut project, &self.config.default_phase_codes)?;

        info!(
            "event=project_preprocess module=lifecycle status=ok code={} phases={}",
            project.code,
            project.phases.len()
        );
        Ok(project)
    }

    /// Runs `preprocess_create`, then persists the project once and grants
    /// the creator role.
    ///
    /// In strict mode the grant precedes the save and is revoked again when
    /// the save fails. In best-effort mode the grant follows a successful
    /// save and its failure is only logged. A failed creation never leaves a
    /// grant behind.
    pub fn create(&self, ctx: &RequestContext, project: Project) -> LifecycleResult<Project> {
        let project = self.preprocess_create(ctx, project)?;
        let user = GrantSubject::User(ctx.actor.username.clone());

        match self.config.role_grant_mode {
            RoleGrantMode::Strict => {
                let creator = match assign_creator_role(&self.permissions, &project, &ctx.actor)
                {
                    Ok(role) => role,
                    Err(err) => {
                        warn!(
                            "event=creator_grant module=lifecycle status=error mode=strict code={} user={} error={}",
                            project.code,
                            ctx.actor.username,
                            sanitize_message(&err.to_string(), MAX_LOGGED_ERROR_CHARS)
                        );
                        return Err(LifecycleError::Access(err));
                    }
                };
                if let Err(err) = self.repo.save(&project) {
                    if let Err(revoke_err) = self
                        .permissions
                        .revoke_role(&user, &RoleGrant::for_role(&creator))
                    {
                        warn!(
                            "event=creator_revoke module=lifecycle status=error code={} user={} error={}",
                            project.code,
                            ctx.actor.username,
                            sanitize_message(&revoke_err.to_string(), MAX_LOGGED_ERROR_CHARS)
                        );
                    }
                    return Err(err.into());
                }
            }
            RoleGrantMode::BestEffort => {
                self.repo.save(&project)?;
                if let Err(err) = assign_creator_role(&self.permissions, &project, &ctx.actor) {
                    warn!(
                        "event=creator_grant module=lifecycle status=error mode=best_effort code={} user={} error={}",
                        project.code,
                        ctx.actor.username,
                        sanitize_message(&err.to_string(), MAX_LOGGED_ERROR_CHARS)
                    );
                }
            }
        }

        info!(
            "event=project_create module=lifecycle status=ok code={} user={}",
            project.code, ctx.actor.username
        );
        Ok(project)
    }

    /// Marks the project submitted and exposes it to the reviewing side.
    ///
    /// The admin and sector roles are granted on the project object after
    /// the save; those grants are best-effort.
    pub fn submit(&self, mut project: Project) -> LifecycleResult<Project> {
        project.status = ProjectStatus::Submitted;
        let sector_role = slugify(&project.project_type);
        project.sector_role = (!sector_role.is_empty()).then_some(sector_role);

        self.repo.save(&project)?;

        let subject = GrantSubject::Project(project.code.clone());
        let mut grants = Vec::new();
        if let Some(admin) = &project.admin_role {
            grants.push(RoleGrant::for_role(admin));
        }
        if let Some(sector) = &project.sector_role {
            grants.push(RoleGrant::new(project.code.clone(), sector.clone()));
        }
        for grant in &grants {
            if let Err(err) = self.permissions.grant_role(&subject, grant) {
                warn!(
                    "event=submit_grant module=lifecycle status=error code={} role={} error={}",
                    project.code,
                    grant.role,
                    sanitize_message(&err.to_string(), MAX_LOGGED_ERROR_CHARS)
                );
            }
        }

        info!(
            "event=project_submit module=lifecycle status=ok code={} sector_role={}",
            project.code,
            project.sector_role.as_deref().unwrap_or("none")
        );
        Ok(project)
    }

    /// Completes the current phase without advancing.
    ///
    /// Returns the project unchanged when it has no current phase.
    pub fn complete_current_phase(&self, mut project: Project) -> LifecycleResult<Project> {
        if project.current_phase.is_none() {
            return Ok(project);
        }

        self.engine.complete_current(&mut project)?;
        self.repo.save(&project)?;
        info!(
            "event=phase_complete module=lifecycle status=ok code={} phase={}",
            project.code,
            project.current_phase_code.as_deref().unwrap_or_default()
        );
        self.reload(project.id)
    }

    /// Completes the current phase and starts the next one.
    ///
    /// Returns the project unchanged when it has no current phase.
    pub fn start_next_phase(&self, mut project: Project) -> LifecycleResult<Project> {
        if project.current_phase.is_none() {
            return Ok(project);
        }

        self.engine.advance(&mut project)?;
        self.repo.save(&project)?;
        info!(
            "event=phase_next module=lifecycle status=ok code={} phase={}",
            project.code,
            project.current_phase_code.as_deref().unwrap_or_default()
        );
        self.reload(project.id)
    }

    /// Sets `is_published`; publishing also posts a news item (best-effort).
    pub fn publish(&self, mut project: Project, value: bool) -> LifecycleResult<Project> {
        if value {
            let item = NewsItem {
                headline: format!("New Assessment: {}", project.name),
                content: format!(
                    "New Environmental Assessment: {}\n{}",
                    project.name, project.description
                ),
                project: project.id,
                kind: NewsKind::News,
            };
            if let Err(err) = self.feed.post_message(&item) {
                warn!(
                    "event=publish_news module=lifecycle status=error code={} error={}",
                    project.code,
                    sanitize_message(&err.to_string(), MAX_LOGGED_ERROR_CHARS)
                );
            }
            project.publish();
        } else {
            project.unpublish();
        }

        self.repo.save(&project)?;
        info!(
            "event=project_publish module=lifecycle status=ok code={} published={}",
            project.code, project.is_published
        );
        self.reload(project.id)
    }

    pub fn unpublish(&self, project: Project) -> LifecycleResult<Project> {
        self.publish(project, false)
    }

    /// Published projects sorted by name, projected to the public summary.
    pub fn list_published(&self) -> LifecycleResult<Vec<ProjectSummary>> {
        let projects = self.repo.list_projects(&ProjectListQuery {
            is_published: Some(true),
            codes: None,
            include_archived: true,
        })?;
        Ok(projects.into_iter().map(ProjectSummary::published).collect())
    }

    /// Non-archived projects the actor holds any role on, sorted by name.
    ///
    /// An actor with zero grants gets an empty list. A failing role query
    /// is `RolesNotFound`.
    pub fn list_mine(&self, ctx: &RequestContext) -> LifecycleResult<Vec<ProjectSummary>> {
        let username = ctx.actor.username.as_str();
        let grants = self.permissions.find_roles_for_user(username).map_err(|err| {
            warn!(
                "event=list_mine module=lifecycle status=error user={} error={}",
                username,
                sanitize_message(&err.to_string(), MAX_LOGGED_ERROR_CHARS)
            );
            LifecycleError::RolesNotFound {
                username: username.to_string(),
                source: err,
            }
        })?;

        let codes: BTreeSet<String> = grants.into_iter().map(|grant| grant.context).collect();
        if codes.is_empty() {
            return Ok(Vec::new());
        }

        let projects = self.repo.list_projects(&ProjectListQuery {
            is_published: None,
            codes: Some(codes.into_iter().collect()),
            include_archived: false,
        })?;
        Ok(projects
            .into_iter()
            .map(ProjectSummary::member_view)
            .collect())
    }

    fn reload(&self, id: ProjectId) -> LifecycleResult<Project> {
        self.repo
            .find_by_id(id)?
            .ok_or_else(|| LifecycleError::NotFound(format!("project {id}")))
    }
}
