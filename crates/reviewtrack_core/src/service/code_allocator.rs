//! Project code allocation.
//!
//! # Responsibility
//! - Derive URL-safe slugs from human names.
//! - Resolve slug collisions against persisted project codes.
//!
//! # Invariants
//! - Allocated codes match `[a-z0-9]+(-[a-z0-9]+)*`.
//! - Collisions are resolved in-process with a numeric suffix; only a
//!   store fault during the uniqueness probe is an error.

use crate::repo::project_repo::{ProjectRepository, RepoError};
use log::{debug, error};
use once_cell::sync::Lazy;
use regex::Regex;
use std::error::Error;
use std::fmt::{Display, Formatter};

static NON_SLUG_RUN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^a-z0-9]+").expect("valid slug separator regex"));

/// First suffix tried after the bare slug is taken (`foo`, `foo-2`, `foo-3`, ...).
const FIRST_DISAMBIGUATION_SUFFIX: u32 = 2;
const MAX_DISAMBIGUATION_ATTEMPTS: u32 = 10_000;

#[derive(Debug)]
pub enum AllocationError {
    /// Name contains no characters usable in a slug.
    InvalidName(String),
    /// Uniqueness probe failed in the persistence layer.
    Store(RepoError),
    /// Every suffix up to the attempt limit is taken.
    Exhausted(String),
}

impl Display for AllocationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidName(name) => write!(f, "cannot derive a project code from `{name}`"),
            Self::Store(err) => write!(f, "project code uniqueness probe failed: {err}"),
            Self::Exhausted(code) => write!(f, "no free project code derived from `{code}`"),
        }
    }
}

impl Error for AllocationError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Store(err) => Some(err),
            _ => None,
        }
    }
}

/// Lower-cases `value` and joins its alphanumeric runs with single hyphens.
///
/// Leading and trailing separators are dropped, so `"Foo Bar Mine!!"`
/// becomes `"foo-bar-mine"`.
pub fn slugify(value: &str) -> String {
    let lowered = value.to_lowercase();
    NON_SLUG_RUN_RE
        .replace_all(&lowered, "-")
        .trim_matches('-')
        .to_string()
}

/// Derives a candidate project code from a human name.
pub fn allocate_code(name: &str) -> Result<String, AllocationError> {
    let code = slugify(name);
    if code.is_empty() {
        return Err(AllocationError::InvalidName(name.to_string()));
    }
    Ok(code)
}

/// Returns `candidate` or the first free `candidate-N`, probing `repo`.
pub fn guarantee_unique_code<R: ProjectRepository + ?Sized>(
    repo: &R,
    candidate: &str,
) -> Result<String, AllocationError> {
    let probe = |code: &str| {
        repo.code_exists(code).map_err(|err| {
            error!(
                "event=code_allocate module=lifecycle status=error code={} error={}",
                code, err
            );
            AllocationError::Store(err)
        })
    };

    if !probe(candidate)? {
        return Ok(candidate.to_string());
    }

    let last_suffix = FIRST_DISAMBIGUATION_SUFFIX + MAX_DISAMBIGUATION_ATTEMPTS;
    for suffix in FIRST_DISAMBIGUATION_SUFFIX..last_suffix {
        let code = format!("{candidate}-{suffix}");
        if !probe(&code)? {
            debug!(
                "event=code_allocate module=lifecycle status=ok candidate={} code={}",
                candidate, code
            );
            return Ok(code);
        }
    }

    Err(AllocationError::Exhausted(candidate.to_string()))
}

#[cfg(test)]
mod tests {
    use super::{allocate_code, slugify, AllocationError};

    #[test]
    fn slugify_collapses_separator_runs() {
        assert_eq!(slugify("Foo Bar Mine!!"), "foo-bar-mine");
        assert_eq!(slugify("Foo   Bar Mine"), "foo-bar-mine");
        assert_eq!(slugify("  --Site   C--  "), "site-c");
        assert_eq!(slugify("Mines & Metals"), "mines-metals");
        assert_eq!(slugify("snake_case_name"), "snake-case-name");
    }

    #[test]
    fn allocate_rejects_names_without_slug_characters() {
        let err = allocate_code(" !! ").expect_err("punctuation-only name must fail");
        assert!(matches!(err, AllocationError::InvalidName(_)));
    }

    #[test]
    fn allocate_output_matches_code_shape() {
        for name in ["Ajax Mine", "Site C (Clean Energy)", "LNG-Canada 2", "Ünïcode Dam"] {
            let code = allocate_code(name).expect("name should allocate");
            assert!(code
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-'));
            assert!(!code.contains("--"));
            assert!(!code.starts_with('-') && !code.ends_with('-'));
        }
    }
}
