//! Project domain model.
//!
//! # Responsibility
//! - Define the canonical project record tracked through review phases.
//! - Carry the role identifiers and access lists that gate the project.
//!
//! # Invariants
//! - `code` is unique across projects and stable once assigned.
//! - `current_phase`, when set, references an element of `phases`.
//! - `phases` is append-only; insertion order is execution order.

use crate::model::phase::{Phase, PhaseId, PhaseValidationError};
use crate::model::role::RoleId;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Stable identifier for a project.
pub type ProjectId = Uuid;

static PROJECT_CODE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z0-9]+(-[a-z0-9]+)*$").expect("valid project code regex"));

/// Review status of a project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectStatus {
    /// Created, not yet visible to the reviewing organization.
    Draft,
    Submitted,
    InProgress,
    Certified,
    NotCertified,
    Withdrawn,
    Terminated,
}

impl ProjectStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Submitted => "submitted",
            Self::InProgress => "in_progress",
            Self::Certified => "certified",
            Self::NotCertified => "not_certified",
            Self::Withdrawn => "withdrawn",
            Self::Terminated => "terminated",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "draft" => Some(Self::Draft),
            "submitted" => Some(Self::Submitted),
            "in_progress" => Some(Self::InProgress),
            "certified" => Some(Self::Certified),
            "not_certified" => Some(Self::NotCertified),
            "withdrawn" => Some(Self::Withdrawn),
            "terminated" => Some(Self::Terminated),
            _ => None,
        }
    }
}

/// Project-local access lists keyed by role identifier strings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectAccess {
    pub read: BTreeSet<String>,
    pub write: BTreeSet<String>,
    pub delete: BTreeSet<String>,
}

/// Canonical project record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub id: ProjectId,
    /// Unique URL-safe slug. Empty until allocated on creation.
    pub code: String,
    pub name: String,
    /// Human name the code is derived from.
    pub short_name: String,
    pub description: String,
    pub org_code: Option<String>,
    pub status: ProjectStatus,
    /// Serialized as `type` to match external schema naming.
    #[serde(rename = "type")]
    pub project_type: String,
    /// Slug of `project_type`; set on submission.
    pub sector_role: Option<String>,
    pub region: Option<String>,
    pub eac_decision: Option<String>,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub mem_permit_id: Option<String>,
    pub phases: Vec<Phase>,
    pub current_phase: Option<PhaseId>,
    pub current_phase_code: Option<String>,
    pub current_phase_name: Option<String>,
    pub admin_role: Option<RoleId>,
    pub proponent_admin_role: Option<RoleId>,
    pub eao_invitee_role: Option<RoleId>,
    pub proponent_invitee_role: Option<RoleId>,
    pub eao_member: Option<RoleId>,
    pub pro_member: Option<RoleId>,
    pub access: ProjectAccess,
    pub is_published: bool,
    /// Unix epoch milliseconds. A set value marks the project archived.
    pub date_completed: Option<i64>,
}

/// Validation errors for project state.
#[derive(Debug, Clone, PartialEq)]
pub enum ProjectValidationError {
    EmptyName,
    EmptyCode,
    InvalidCode(String),
    CurrentPhaseNotInPhases(PhaseId),
    CurrentPhaseFieldsMismatch(PhaseId),
    DuplicatePhaseId(PhaseId),
    InvalidCoordinate { field: &'static str, value: f64 },
    Phase(PhaseValidationError),
}

impl Display for ProjectValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyName => write!(f, "project name must not be blank"),
            Self::EmptyCode => write!(f, "project code must be allocated before persistence"),
            Self::InvalidCode(code) => write!(f, "project code is not a valid slug: `{code}`"),
            Self::CurrentPhaseNotInPhases(id) => {
                write!(f, "current phase {id} is not one of the project's phases")
            }
            Self::CurrentPhaseFieldsMismatch(id) => {
                write!(f, "current phase code/name do not match phase {id}")
            }
            Self::DuplicatePhaseId(id) => write!(f, "phase {id} appears more than once"),
            Self::InvalidCoordinate { field, value } => {
                write!(f, "coordinate `{field}` out of range: {value}")
            }
            Self::Phase(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ProjectValidationError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Phase(err) => Some(err),
            _ => None,
        }
    }
}

impl From<PhaseValidationError> for ProjectValidationError {
    fn from(value: PhaseValidationError) -> Self {
        Self::Phase(value)
    }
}

impl Project {
    /// Creates a draft project with a generated stable ID.
    ///
    /// # Invariants
    /// - `code` starts empty and is assigned by code allocation.
    /// - Role fields, phases and access lists start empty.
    pub fn new(
        name: impl Into<String>,
        short_name: impl Into<String>,
        project_type: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            code: String::new(),
            name: name.into(),
            short_name: short_name.into(),
            description: String::new(),
            org_code: None,
            status: ProjectStatus::Draft,
            project_type: project_type.into(),
            sector_role: None,
            region: None,
            eac_decision: None,
            lat: None,
            lon: None,
            mem_permit_id: None,
            phases: Vec::new(),
            current_phase: None,
            current_phase_code: None,
            current_phase_name: None,
            admin_role: None,
            proponent_admin_role: None,
            eao_invitee_role: None,
            proponent_invitee_role: None,
            eao_member: None,
            pro_member: None,
            access: ProjectAccess::default(),
            is_published: false,
            date_completed: None,
        }
    }

    /// Returns the index of `current_phase` inside `phases`.
    pub fn current_phase_index(&self) -> Option<usize> {
        let current = self.current_phase?;
        self.phases.iter().position(|phase| phase.id == current)
    }

    pub fn current_phase(&self) -> Option<&Phase> {
        self.current_phase_index().map(|index| &self.phases[index])
    }

    /// Points `current_phase` and its denormalized fields at `phases[index]`.
    ///
    /// Returns `false` when `index` is out of bounds.
    pub fn set_current_phase(&mut self, index: usize) -> bool {
        let Some(phase) = self.phases.get(index) else {
            return false;
        };
        self.current_phase = Some(phase.id);
        self.current_phase_code = Some(phase.code.clone());
        self.current_phase_name = Some(phase.name.clone());
        true
    }

    pub fn publish(&mut self) {
        self.is_published = true;
    }

    pub fn unpublish(&mut self) {
        self.is_published = false;
    }

    pub fn is_archived(&self) -> bool {
        self.date_completed.is_some()
    }

    /// Validates invariants required before persistence.
    pub fn validate(&self) -> Result<(), ProjectValidationError> {
        if self.name.trim().is_empty() {
            return Err(ProjectValidationError::EmptyName);
        }
        if self.code.is_empty() {
            return Err(ProjectValidationError::EmptyCode);
        }
        if !PROJECT_CODE_RE.is_match(&self.code) {
            return Err(ProjectValidationError::InvalidCode(self.code.clone()));
        }

        let mut seen = HashSet::new();
        for phase in &self.phases {
            if !seen.insert(phase.id) {
                return Err(ProjectValidationError::DuplicatePhaseId(phase.id));
            }
            phase.validate()?;
        }

        if let Some(current) = self.current_phase {
            let phase = self
                .phases
                .iter()
                .find(|phase| phase.id == current)
                .ok_or(ProjectValidationError::CurrentPhaseNotInPhases(current))?;
            if self.current_phase_code.as_deref() != Some(phase.code.as_str())
                || self.current_phase_name.as_deref() != Some(phase.name.as_str())
            {
                return Err(ProjectValidationError::CurrentPhaseFieldsMismatch(current));
            }
        }

        if let Some(lat) = self.lat {
            if !(-90.0..=90.0).contains(&lat) {
                return Err(ProjectValidationError::InvalidCoordinate {
                    field: "lat",
                    value: lat,
                });
            }
        }
        if let Some(lon) = self.lon {
            if !(-180.0..=180.0).contains(&lon) {
                return Err(ProjectValidationError::InvalidCoordinate {
                    field: "lon",
                    value: lon,
                });
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{Project, ProjectStatus, ProjectValidationError};
    use crate::model::phase::Phase;
    use uuid::Uuid;

    fn coded(name: &str, code: &str) -> Project {
        let mut project = Project::new(name, name, "Mines");
        project.code = code.to_string();
        project
    }

    #[test]
    fn new_project_starts_as_unpublished_draft() {
        let project = Project::new("Site C", "Site C", "Energy");
        assert_eq!(project.status, ProjectStatus::Draft);
        assert!(project.code.is_empty());
        assert!(!project.is_published);
        assert!(project.current_phase().is_none());
    }

    #[test]
    fn validate_requires_allocated_slug_code() {
        let project = Project::new("Site C", "Site C", "Energy");
        assert_eq!(project.validate(), Err(ProjectValidationError::EmptyCode));

        let bad = coded("Site C", "Site C");
        assert!(matches!(
            bad.validate(),
            Err(ProjectValidationError::InvalidCode(_))
        ));
        assert!(coded("Site C", "site-c-2").validate().is_ok());
    }

    #[test]
    fn validate_rejects_dangling_current_phase() {
        let mut project = coded("Site C", "site-c");
        project.phases.push(Phase::new("intake", "Intake", vec![]));
        project.current_phase = Some(Uuid::new_v4());
        assert!(matches!(
            project.validate(),
            Err(ProjectValidationError::CurrentPhaseNotInPhases(_))
        ));

        assert!(project.set_current_phase(0));
        assert!(project.validate().is_ok());
        assert!(!project.set_current_phase(1));
    }

    #[test]
    fn status_strings_roundtrip() {
        for status in [
            ProjectStatus::Draft,
            ProjectStatus::Submitted,
            ProjectStatus::InProgress,
            ProjectStatus::Certified,
            ProjectStatus::NotCertified,
            ProjectStatus::Withdrawn,
            ProjectStatus::Terminated,
        ] {
            assert_eq!(ProjectStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(ProjectStatus::parse("Submitted"), None);
    }
}
