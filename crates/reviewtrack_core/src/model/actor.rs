//! Request actor identity.

use serde::{Deserialize, Serialize};

/// Organization code of the platform operator.
///
/// Actors from this organization always receive platform-side rights.
pub const PLATFORM_ORG_CODE: &str = "eao";

/// Authenticated caller on whose behalf a lifecycle operation runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    /// Login name; key for role grants in the permission store.
    pub username: String,
    /// Organization the actor belongs to.
    pub org_code: String,
}

impl Actor {
    pub fn new(username: impl Into<String>, org_code: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            org_code: org_code.into(),
        }
    }

    /// Returns whether this actor belongs to the platform organization.
    pub fn is_platform(&self) -> bool {
        self.org_code == PLATFORM_ORG_CODE
    }
}
