//! Phase domain model.
//!
//! # Responsibility
//! - Define the per-project phase record stamped from a phase template.
//! - Provide the Pending -> Active -> Completed transitions.
//!
//! # Invariants
//! - `Completed` is terminal; a completed phase always has `completed_at`.
//! - An `Active` phase has `started_at` and no `completed_at`.
//! - A `Pending` phase has neither timestamp.

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Stable identifier of one phase instance.
pub type PhaseId = Uuid;

/// Lifecycle state of one phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhaseState {
    Pending,
    Active,
    Completed,
}

/// Unit of work inside a milestone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Activity {
    pub code: String,
    pub name: String,
}

/// Ordered checkpoint inside a phase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Milestone {
    pub code: String,
    pub name: String,
    pub activities: Vec<Activity>,
}

/// One stage of a project's review, owned by exactly one project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Phase {
    pub id: PhaseId,
    /// Base template code, e.g. `intake`.
    pub code: String,
    pub name: String,
    pub state: PhaseState,
    pub milestones: Vec<Milestone>,
    /// Unix epoch milliseconds.
    pub started_at: Option<i64>,
    /// Unix epoch milliseconds. `None` until completed.
    pub completed_at: Option<i64>,
}

/// Validation errors for phase state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PhaseValidationError {
    EmptyCode(PhaseId),
    InconsistentTimestamps { id: PhaseId, state: PhaseState },
}

impl Display for PhaseValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyCode(id) => write!(f, "phase {id} has an empty code"),
            Self::InconsistentTimestamps { id, state } => {
                write!(f, "phase {id} timestamps do not match state {state:?}")
            }
        }
    }
}

impl Error for PhaseValidationError {}

impl Phase {
    /// Creates a pending phase with a generated stable ID.
    pub fn new(code: impl Into<String>, name: impl Into<String>, milestones: Vec<Milestone>) -> Self {
        Self {
            id: Uuid::new_v4(),
            code: code.into(),
            name: name.into(),
            state: PhaseState::Pending,
            milestones,
            started_at: None,
            completed_at: None,
        }
    }

    /// Moves a pending phase to `Active`.
    ///
    /// Returns `false` without touching the phase when it is already
    /// active or completed.
    pub fn start(&mut self, now_ms: i64) -> bool {
        if self.state != PhaseState::Pending {
            return false;
        }
        self.state = PhaseState::Active;
        self.started_at = Some(now_ms);
        true
    }

    /// Moves a pending or active phase to `Completed`.
    ///
    /// Returns `false` without touching the phase when it is already
    /// completed, so the first `completed_at` is kept.
    pub fn complete(&mut self, now_ms: i64) -> bool {
        if self.state == PhaseState::Completed {
            return false;
        }
        self.state = PhaseState::Completed;
        self.completed_at = Some(now_ms);
        true
    }

    pub fn is_completed(&self) -> bool {
        self.state == PhaseState::Completed
    }

    pub fn validate(&self) -> Result<(), PhaseValidationError> {
        if self.code.trim().is_empty() {
            return Err(PhaseValidationError::EmptyCode(self.id));
        }

        let consistent = match self.state {
            PhaseState::Pending => self.started_at.is_none() && self.completed_at.is_none(),
            PhaseState::Active => self.started_at.is_some() && self.completed_at.is_none(),
            PhaseState::Completed => self.completed_at.is_some(),
        };
        if !consistent {
            return Err(PhaseValidationError::InconsistentTimestamps {
                id: self.id,
                state: self.state,
            });
        }

        Ok(())
    }
}
