//! Core configuration.
//!
//! Loaded from a JSON document; every field is optional and falls back to
//! the defaults below.

use crate::logging::{default_log_level, init_logging, normalize_level};
use crate::service::phase_template::DEFAULT_PHASE_CODES;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// How the creator-role grant during project creation is treated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoleGrantMode {
    /// Grant failures are logged; creation proceeds.
    #[default]
    BestEffort,
    /// Grant failures abort creation.
    Strict,
}

/// Settings consumed by `ProjectLifecycle`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LifecycleConfig {
    pub role_grant_mode: RoleGrantMode,
    /// Template codes instantiated, in order, for projects created without phases.
    pub default_phase_codes: Vec<String>,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            role_grant_mode: RoleGrantMode::default(),
            default_phase_codes: DEFAULT_PHASE_CODES
                .iter()
                .map(|code| code.to_string())
                .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CoreConfig {
    pub log_level: String,
    /// Absolute directory for rolling log files. Logging stays off when unset.
    pub log_dir: Option<String>,
    pub lifecycle: LifecycleConfig,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level().to_string(),
            log_dir: None,
            lifecycle: LifecycleConfig::default(),
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Parse(serde_json::Error),
    UnsupportedLogLevel(String),
    EmptyPhaseSequence,
    InvalidPhaseCode(String),
    Logging(String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Parse(err) => write!(f, "invalid configuration document: {err}"),
            Self::UnsupportedLogLevel(message) => write!(f, "{message}"),
            Self::EmptyPhaseSequence => write!(f, "default_phase_codes must not be empty"),
            Self::InvalidPhaseCode(code) => write!(f, "invalid default phase code: `{code}`"),
            Self::Logging(message) => write!(f, "logging init failed: {message}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Parse(err) => Some(err),
            _ => None,
        }
    }
}

impl CoreConfig {
    /// Parses and validates a JSON configuration document.
    pub fn from_json_str(document: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(document).map_err(ConfigError::Parse)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        normalize_level(&self.log_level).map_err(ConfigError::UnsupportedLogLevel)?;

        let codes = &self.lifecycle.default_phase_codes;
        if codes.is_empty() {
            return Err(ConfigError::EmptyPhaseSequence);
        }
        if let Some(bad) = codes.iter().find(|code| {
            code.is_empty()
                || !code
                    .chars()
                    .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
        }) {
            return Err(ConfigError::InvalidPhaseCode(bad.clone()));
        }
        Ok(())
    }

    /// Starts file logging when `log_dir` is configured.
    pub fn init_logging(&self) -> Result<(), ConfigError> {
        match self.log_dir.as_deref() {
            Some(dir) => init_logging(&self.log_level, dir).map_err(ConfigError::Logging),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{ConfigError, CoreConfig, RoleGrantMode};

    #[test]
    fn empty_document_uses_defaults() {
        let config = CoreConfig::from_json_str("{}").expect("empty config should parse");
        assert_eq!(config, CoreConfig::default());
        assert_eq!(config.lifecycle.role_grant_mode, RoleGrantMode::BestEffort);
        assert_eq!(config.lifecycle.default_phase_codes.len(), 7);
        assert_eq!(config.lifecycle.default_phase_codes[0], "intake");
    }

    #[test]
    fn parses_strict_mode_and_custom_sequence() {
        let config = CoreConfig::from_json_str(
            r#"{"log_level":"warn","lifecycle":{"role_grant_mode":"strict","default_phase_codes":["intake","decision"]}}"#,
        )
        .expect("config should parse");
        assert_eq!(config.lifecycle.role_grant_mode, RoleGrantMode::Strict);
        assert_eq!(config.lifecycle.default_phase_codes, vec!["intake", "decision"]);
    }

    #[test]
    fn rejects_bad_values() {
        assert!(matches!(
            CoreConfig::from_json_str(r#"{"log_level":"loud"}"#),
            Err(ConfigError::UnsupportedLogLevel(_))
        ));
        assert!(matches!(
            CoreConfig::from_json_str(r#"{"lifecycle":{"default_phase_codes":[]}}"#),
            Err(ConfigError::EmptyPhaseSequence)
        ));
        assert!(matches!(
            CoreConfig::from_json_str(r#"{"lifecycle":{"default_phase_codes":["Pre EA"]}}"#),
            Err(ConfigError::InvalidPhaseCode(_))
        ));
        assert!(matches!(
            CoreConfig::from_json_str("[1, 2]"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn lifecycle_settings_must_be_nested() {
        assert!(matches!(
            CoreConfig::from_json_str(r#"{"role_grant_mode":"strict"}"#),
            Err(ConfigError::Parse(_))
        ));
        assert!(matches!(
            CoreConfig::from_json_str(r#"{"lifecycle":{"grant_mode":"strict"}}"#),
            Err(ConfigError::Parse(_))
        ));
    }
}
