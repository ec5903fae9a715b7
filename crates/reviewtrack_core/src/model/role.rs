//! Typed project role identifiers.
//!
//! # Responsibility
//! - Model the `<projectCode>:<org>:<kind>` keys handed to the permission store.
//! - Keep the external string format stable in both directions.
//!
//! # Invariants
//! - `RoleId` values are a pure function of `(project_code, org, kind)`.
//! - `RoleId::parse(role.to_string()) == Ok(role)` for every valid role.

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Organization side a role belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RoleOrg {
    /// Platform (reviewing organization) side.
    Eao,
    /// Proponent side.
    Pro,
}

impl RoleOrg {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Eao => "eao",
            Self::Pro => "pro",
        }
    }

    fn parse(value: &str) -> Option<Self> {
        match value {
            "eao" => Some(Self::Eao),
            "pro" => Some(Self::Pro),
            _ => None,
        }
    }
}

/// Role kind within one organization side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RoleKind {
    Admin,
    Member,
    Invitee,
}

impl RoleKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Member => "member",
            Self::Invitee => "invitee",
        }
    }

    fn parse(value: &str) -> Option<Self> {
        match value {
            "admin" => Some(Self::Admin),
            "member" => Some(Self::Member),
            "invitee" => Some(Self::Invitee),
            _ => None,
        }
    }
}

/// Role identifier scoped to one project, organization side and kind.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RoleId {
    project_code: String,
    org: RoleOrg,
    kind: RoleKind,
}

impl RoleId {
    pub fn new(project_code: impl Into<String>, org: RoleOrg, kind: RoleKind) -> Self {
        Self {
            project_code: project_code.into(),
            org,
            kind,
        }
    }

    /// Parses the external `<projectCode>:<org>:<kind>` format.
    pub fn parse(value: &str) -> Result<Self, RoleIdError> {
        let mut parts = value.rsplitn(3, ':');
        let kind_text = parts.next().unwrap_or_default();
        let org_text = parts
            .next()
            .ok_or_else(|| RoleIdError::Malformed(value.to_string()))?;
        let project_code = parts
            .next()
            .filter(|code| !code.is_empty())
            .ok_or_else(|| RoleIdError::Malformed(value.to_string()))?;

        let org = RoleOrg::parse(org_text)
            .ok_or_else(|| RoleIdError::UnknownOrg(org_text.to_string()))?;
        let kind = RoleKind::parse(kind_text)
            .ok_or_else(|| RoleIdError::UnknownKind(kind_text.to_string()))?;

        Ok(Self::new(project_code, org, kind))
    }

    pub fn project_code(&self) -> &str {
        &self.project_code
    }

    pub fn org(&self) -> RoleOrg {
        self.org
    }

    pub fn kind(&self) -> RoleKind {
        self.kind
    }
}

impl Display for RoleId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}:{}:{}",
            self.project_code,
            self.org.as_str(),
            self.kind.as_str()
        )
    }
}

impl From<RoleId> for String {
    fn from(value: RoleId) -> Self {
        value.to_string()
    }
}

impl TryFrom<String> for RoleId {
    type Error = RoleIdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

/// Role identifier parse errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoleIdError {
    Malformed(String),
    UnknownOrg(String),
    UnknownKind(String),
}

impl Display for RoleIdError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Malformed(value) => write!(f, "malformed role identifier: `{value}`"),
            Self::UnknownOrg(value) => write!(f, "unknown role organization: `{value}`"),
            Self::UnknownKind(value) => write!(f, "unknown role kind: `{value}`"),
        }
    }
}

impl Error for RoleIdError {}
