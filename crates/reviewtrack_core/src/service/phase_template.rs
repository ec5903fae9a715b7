//! Phase template registry.
//!
//! # Responsibility
//! - Map phase base codes to reusable phase blueprints.
//! - Ship the built-in review sequence templates.
//!
//! # Invariants
//! - Template codes are non-empty `[a-z0-9-]` strings and unique.
//! - Instantiation deep-copies milestones; phases never share structure
//!   with their template.

use crate::model::phase::{Activity, Milestone, Phase};
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Base codes of the default phase sequence, in execution order.
pub const DEFAULT_PHASE_CODES: [&str; 7] = [
    "intake",
    "pre-ea",
    "pre-app",
    "evaluation",
    "application-review",
    "decision",
    "post-certification",
];

/// Reusable blueprint a phase is stamped from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhaseTemplate {
    pub code: String,
    pub name: String,
    pub milestones: Vec<Milestone>,
}

impl PhaseTemplate {
    /// Stamps a new pending phase from this template.
    pub fn instantiate(&self) -> Phase {
        Phase::new(
            self.code.clone(),
            self.name.clone(),
            self.milestones.clone(),
        )
    }
}

/// Lookup contract for phase templates.
pub trait PhaseTemplateSource {
    fn get_template(&self, base_code: &str) -> Option<&PhaseTemplate>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateRegistryError {
    InvalidTemplateCode(String),
    DuplicateTemplateCode(String),
}

impl Display for TemplateRegistryError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidTemplateCode(code) => write!(f, "phase template code is invalid: {code}"),
            Self::DuplicateTemplateCode(code) => {
                write!(f, "phase template already registered: {code}")
            }
        }
    }
}

impl Error for TemplateRegistryError {}

/// Static in-process template registry.
#[derive(Debug, Clone, Default)]
pub struct PhaseTemplateRegistry {
    templates: BTreeMap<String, PhaseTemplate>,
}

impl PhaseTemplateRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry preloaded with the seven built-in review phases.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        for template in builtin_templates() {
            registry.templates.insert(template.code.clone(), template);
        }
        registry
    }

    pub fn register(&mut self, template: PhaseTemplate) -> Result<(), TemplateRegistryError> {
        let code = template.code.trim().to_string();
        if !is_valid_template_code(&code) {
            return Err(TemplateRegistryError::InvalidTemplateCode(code));
        }
        if self.templates.contains_key(&code) {
            return Err(TemplateRegistryError::DuplicateTemplateCode(code));
        }

        self.templates.insert(
            code.clone(),
            PhaseTemplate {
                code,
                ..template
            },
        );
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    /// Returns sorted template codes.
    pub fn codes(&self) -> Vec<String> {
        self.templates.keys().cloned().collect()
    }
}

impl PhaseTemplateSource for PhaseTemplateRegistry {
    fn get_template(&self, base_code: &str) -> Option<&PhaseTemplate> {
        self.templates.get(base_code.trim())
    }
}

fn is_valid_template_code(value: &str) -> bool {
    !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
}

fn milestone(code: &str, name: &str, activities: &[(&str, &str)]) -> Milestone {
    Milestone {
        code: code.to_string(),
        name: name.to_string(),
        activities: activities
            .iter()
            .map(|(code, name)| Activity {
                code: (*code).to_string(),
                name: (*name).to_string(),
            })
            .collect(),
    }
}

fn template(code: &str, name: &str, milestones: Vec<Milestone>) -> PhaseTemplate {
    PhaseTemplate {
        code: code.to_string(),
        name: name.to_string(),
        milestones,
    }
}

fn builtin_templates() -> Vec<PhaseTemplate> {
    vec![
        template(
            "intake",
            "Intake",
            vec![milestone(
                "project-description",
                "Project Description Received",
                &[
                    ("review-description", "Review project description"),
                    ("confirm-proponent", "Confirm proponent contacts"),
                ],
            )],
        ),
        template(
            "pre-ea",
            "Pre-EA",
            vec![milestone(
                "determination",
                "Reviewability Determination",
                &[
                    ("assess-thresholds", "Assess reviewability thresholds"),
                    ("issue-determination", "Issue determination letter"),
                ],
            )],
        ),
        template(
            "pre-app",
            "Pre-Application",
            vec![
                milestone(
                    "section-11-order",
                    "Procedural Order",
                    &[("draft-order", "Draft procedural order")],
                ),
                milestone(
                    "application-information",
                    "Application Information Requirements",
                    &[
                        ("draft-requirements", "Draft information requirements"),
                        ("public-comment", "Hold public comment period"),
                    ],
                ),
            ],
        ),
        template(
            "evaluation",
            "Evaluation",
            vec![milestone(
                "screening",
                "Application Screening",
                &[("screen-application", "Screen application for completeness")],
            )],
        ),
        template(
            "application-review",
            "Application Review",
            vec![
                milestone(
                    "working-group",
                    "Working Group Review",
                    &[("collect-comments", "Collect working group comments")],
                ),
                milestone(
                    "assessment-report",
                    "Assessment Report",
                    &[("draft-report", "Draft assessment report")],
                ),
            ],
        ),
        template(
            "decision",
            "Decision",
            vec![milestone(
                "ministerial-decision",
                "Ministerial Decision",
                &[
                    ("referral-package", "Prepare referral package"),
                    ("record-decision", "Record decision"),
                ],
            )],
        ),
        template(
            "post-certification",
            "Post-Certification",
            vec![milestone(
                "compliance",
                "Compliance and Enforcement",
                &[("inspections", "Schedule compliance inspections")],
            )],
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::{
        PhaseTemplate, PhaseTemplateRegistry, PhaseTemplateSource, TemplateRegistryError,
        DEFAULT_PHASE_CODES,
    };
    use crate::model::phase::PhaseState;

    #[test]
    fn defaults_cover_the_default_sequence() {
        let registry = PhaseTemplateRegistry::with_defaults();
        assert_eq!(registry.len(), DEFAULT_PHASE_CODES.len());
        for code in DEFAULT_PHASE_CODES {
            let template = registry.get_template(code).expect("default template");
            assert_eq!(template.code, code);
            assert!(!template.milestones.is_empty());
        }
        let mut expected: Vec<String> = DEFAULT_PHASE_CODES.iter().map(|c| c.to_string()).collect();
        expected.sort();
        assert_eq!(registry.codes(), expected);
    }

    #[test]
    fn rejects_invalid_or_duplicate_codes() {
        let mut registry = PhaseTemplateRegistry::with_defaults();
        let invalid = registry.register(PhaseTemplate {
            code: "Pre EA".to_string(),
            name: "Pre EA".to_string(),
            milestones: vec![],
        });
        assert_eq!(
            invalid,
            Err(TemplateRegistryError::InvalidTemplateCode("Pre EA".to_string()))
        );

        let duplicate = registry.register(PhaseTemplate {
            code: " intake ".to_string(),
            name: "Intake again".to_string(),
            milestones: vec![],
        });
        assert_eq!(
            duplicate,
            Err(TemplateRegistryError::DuplicateTemplateCode("intake".to_string()))
        );
    }

    #[test]
    fn instantiate_deep_copies_structure() {
        let registry = PhaseTemplateRegistry::with_defaults();
        let template = registry.get_template("pre-app").expect("pre-app template");

        let mut first = template.instantiate();
        let second = template.instantiate();
        assert_ne!(first.id, second.id);
        assert_eq!(first.state, PhaseState::Pending);

        first.milestones[0].activities.clear();
        assert!(!second.milestones[0].activities.is_empty());
        assert!(!template.milestones[0].activities.is_empty());
    }
}
