//! Phase state machine over a project's phase list.
//!
//! # Responsibility
//! - Instantiate phases from templates and append them to a project.
//! - Start, complete and advance phases.
//!
//! # Invariants
//! - Phase order is append order; nothing here reorders or removes phases.
//! - `complete` is idempotent; the first `completed_at` wins.
//! - A failed operation leaves the project untouched.

use crate::model::now_epoch_ms;
use crate::model::phase::{Phase, PhaseId};
use crate::model::project::{Project, ProjectId};
use crate::service::phase_template::{PhaseTemplateRegistry, PhaseTemplateSource};
use log::{debug, info};
use std::error::Error;
use std::fmt::{Display, Formatter};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PhaseError {
    UnknownTemplate(String),
    /// Project has no current phase; callers treat this as nothing to do.
    NoCurrentPhase(ProjectId),
    /// Current phase is the last one.
    OutOfPhases { project: ProjectId, index: usize },
    /// `current_phase` does not reference any phase of the project.
    PhaseNotFound(PhaseId),
}

impl Display for PhaseError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownTemplate(code) => write!(f, "unknown phase template: {code}"),
            Self::NoCurrentPhase(project) => write!(f, "project {project} has no current phase"),
            Self::OutOfPhases { project, index } => write!(
                f,
                "project {project} has no phase after index {index}"
            ),
            Self::PhaseNotFound(id) => write!(f, "phase not found: {id}"),
        }
    }
}

impl Error for PhaseError {}

/// Drives phase transitions using a template source.
pub struct PhaseEngine<S: PhaseTemplateSource = PhaseTemplateRegistry> {
    templates: S,
}

impl PhaseEngine<PhaseTemplateRegistry> {
    /// Engine backed by the built-in templates.
    pub fn with_defaults() -> Self {
        Self::new(PhaseTemplateRegistry::with_defaults())
    }
}

impl<S: PhaseTemplateSource> PhaseEngine<S> {
    pub fn new(templates: S) -> Self {
        Self { templates }
    }

    pub fn templates(&self) -> &S {
        &self.templates
    }

    /// Appends a pending phase stamped from `base_code` to `project`.
    pub fn instantiate(&self, base_code: &str, project: &mut Project) -> Result<PhaseId, PhaseError> {
        let phase = self.stamp(base_code)?;
        let id = phase.id;
        project.phases.push(phase);
        Ok(id)
    }

    /// Pending -> Active. Re-starting an active or completed phase is a no-op.
    pub fn start(&self, phase: &mut Phase) {
        if phase.start(now_epoch_ms()) {
            debug!("event=phase_start module=phase status=ok code={}", phase.code);
        } else {
            debug!(
                "event=phase_start module=phase status=skipped code={} state={:?}",
                phase.code, phase.state
            );
        }
    }

    /// Pending/Active -> Completed. Completing a completed phase is a no-op.
    pub fn complete(&self, phase: &mut Phase) {
        if phase.complete(now_epoch_ms()) {
            debug!("event=phase_complete module=phase status=ok code={}", phase.code);
        } else {
            debug!(
                "event=phase_complete module=phase status=skipped code={}",
                phase.code
            );
        }
    }

    /// Appends one phase per code, points `current_phase` at the first one
    /// and starts it.
    ///
    /// Does nothing when the project already has phases. Every template is
    /// resolved before the project is touched.
    pub fn bootstrap(&self, project: &mut Project, base_codes: &[String]) -> Result<(), PhaseError> {
        if !project.phases.is_empty() || base_codes.is_empty() {
            return Ok(());
        }

        let phases = base_codes
            .iter()
            .map(|code| self.stamp(code))
            .collect::<Result<Vec<_>, _>>()?;
        project.phases.extend(phases);
        project.set_current_phase(0);
        self.start(&mut project.phases[0]);

        info!(
            "event=phase_bootstrap module=phase status=ok project={} phases={}",
            project.id,
            project.phases.len()
        );
        Ok(())
    }

    /// Completes the current phase without moving `current_phase`.
    pub fn complete_current(&self, project: &mut Project) -> Result<PhaseId, PhaseError> {
        let index = self.current_index(project)?;
        let phase = &mut project.phases[index];
        self.complete(phase);
        Ok(phase.id)
    }

    /// Completes the current phase and starts the next one.
    ///
    /// Returns the id of the newly current phase. On the last phase this
    /// fails with `OutOfPhases` before anything is modified.
    pub fn advance(&self, project: &mut Project) -> Result<PhaseId, PhaseError> {
        let index = self.current_index(project)?;
        let next_index = index + 1;
        if next_index >= project.phases.len() {
            return Err(PhaseError::OutOfPhases {
                project: project.id,
                index,
            });
        }

        self.complete(&mut project.phases[index]);
        project.set_current_phase(next_index);
        self.start(&mut project.phases[next_index]);

        info!(
            "event=phase_advance module=phase status=ok project={} from={} to={}",
            project.id, project.phases[index].code, project.phases[next_index].code
        );
        Ok(project.phases[next_index].id)
    }

    fn current_index(&self, project: &Project) -> Result<usize, PhaseError> {
        let current = project
            .current_phase
            .ok_or(PhaseError::NoCurrentPhase(project.id))?;
        project
            .current_phase_index()
            .ok_or(PhaseError::PhaseNotFound(current))
    }

    fn stamp(&self, base_code: &str) -> Result<Phase, PhaseError> {
        self.templates
            .get_template(base_code)
            .map(|template| template.instantiate())
            .ok_or_else(|| PhaseError::UnknownTemplate(base_code.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::{PhaseEngine, PhaseError};
    use crate::model::phase::PhaseState;
    use crate::model::project::Project;
    use crate::service::phase_template::DEFAULT_PHASE_CODES;

    fn default_codes() -> Vec<String> {
        DEFAULT_PHASE_CODES.iter().map(|code| code.to_string()).collect()
    }

    #[test]
    fn instantiate_appends_pending_phase() {
        let engine = PhaseEngine::with_defaults();
        let mut project = Project::new("Site C", "Site C", "Energy");

        let id = engine.instantiate("decision", &mut project).unwrap();
        assert_eq!(project.phases.len(), 1);
        assert_eq!(project.phases[0].id, id);
        assert_eq!(project.phases[0].state, PhaseState::Pending);

        let err = engine.instantiate("appeal", &mut project).unwrap_err();
        assert_eq!(err, PhaseError::UnknownTemplate("appeal".to_string()));
        assert_eq!(project.phases.len(), 1);
    }

    #[test]
    fn bootstrap_is_all_or_nothing() {
        let engine = PhaseEngine::with_defaults();
        let mut project = Project::new("Site C", "Site C", "Energy");
        let codes = vec!["intake".to_string(), "appeal".to_string()];

        let err = engine.bootstrap(&mut project, &codes).unwrap_err();
        assert_eq!(err, PhaseError::UnknownTemplate("appeal".to_string()));
        assert!(project.phases.is_empty());
        assert!(project.current_phase.is_none());
    }

    #[test]
    fn bootstrap_skips_projects_with_phases() {
        let engine = PhaseEngine::with_defaults();
        let mut project = Project::new("Site C", "Site C", "Energy");
        engine.instantiate("intake", &mut project).unwrap();

        engine.bootstrap(&mut project, &default_codes()).unwrap();
        assert_eq!(project.phases.len(), 1);
        assert!(project.current_phase.is_none());
    }

    #[test]
    fn advance_requires_current_phase() {
        let engine = PhaseEngine::with_defaults();
        let mut project = Project::new("Site C", "Site C", "Energy");
        let err = engine.advance(&mut project).unwrap_err();
        assert_eq!(err, PhaseError::NoCurrentPhase(project.id));
    }

    #[test]
    fn advance_completes_pending_current_phase_too() {
        let engine = PhaseEngine::with_defaults();
        let mut project = Project::new("Site C", "Site C", "Energy");
        engine.instantiate("intake", &mut project).unwrap();
        engine.instantiate("pre-ea", &mut project).unwrap();
        project.set_current_phase(0);

        engine.advance(&mut project).unwrap();
        assert_eq!(project.phases[0].state, PhaseState::Completed);
        assert!(project.phases[0].started_at.is_none());
        assert_eq!(project.phases[1].state, PhaseState::Active);
        assert_eq!(project.current_phase_code.as_deref(), Some("pre-ea"));
    }
}
