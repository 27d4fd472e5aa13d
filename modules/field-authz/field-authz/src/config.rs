//! Configuration for the field `AuthZ` module.

use std::path::Path;

use figment::Figment;
use figment::providers::{Env, Format, Serialized, Yaml};
use field_authz_sdk::ConfigError;
use serde::{Deserialize, Serialize};

/// Environment variable prefix layered over the YAML file.
pub const ENV_PREFIX: &str = "GRAPHGUARD_";

/// Module configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct FieldAuthzConfig {
    /// Decision for fields that have no registered predicate list.
    pub unmapped_fields: UnmappedFieldPolicy,

    /// What a field read does when one of its predicates fails.
    pub on_read_error: ReadErrorPolicy,

    /// Emit a debug event for every field and entry-point decision.
    pub log_decisions: bool,
}

impl Default for FieldAuthzConfig {
    fn default() -> Self {
        Self {
            unmapped_fields: UnmappedFieldPolicy::Allow,
            on_read_error: ReadErrorPolicy::Redact,
            log_decisions: true,
        }
    }
}

/// Decision for fields without a predicate list.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum UnmappedFieldPolicy {
    /// No field-level restriction (default).
    #[default]
    Allow,
    /// Redact every field that was not explicitly mapped.
    Deny,
}

/// Field-read behaviour when a predicate fails to evaluate.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ReadErrorPolicy {
    /// Treat the failure as a deny and redact the field (default).
    #[default]
    Redact,
    /// Return the evaluation error to the resolver.
    Propagate,
}

impl FieldAuthzConfig {
    /// Defaults, overlaid by the YAML file at `path` (if it exists), overlaid
    /// by `GRAPHGUARD_*` environment variables.
    pub fn figment(path: impl AsRef<Path>) -> Figment {
        Figment::from(Serialized::defaults(Self::default()))
            .merge(Yaml::file(path.as_ref()))
            .merge(Env::prefixed(ENV_PREFIX))
    }

    /// Load configuration from `path` and the environment.
    ///
    /// # Errors
    ///
    /// [`ConfigError::InvalidConfig`] if the merged sources do not describe a
    /// valid configuration.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        Self::from_figment(&Self::figment(path))
    }

    /// Extract configuration from an already assembled figment.
    ///
    /// # Errors
    ///
    /// [`ConfigError::InvalidConfig`] on unknown keys or malformed values.
    pub fn from_figment(figment: &Figment) -> Result<Self, ConfigError> {
        figment
            .extract()
            .map_err(|e| ConfigError::InvalidConfig(e.to_string()))
    }
}
