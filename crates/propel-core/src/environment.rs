//! Trigger-to-environment resolution.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::PropagateError;

/// Event data that starts one propagation attempt.
///
/// Produced once per pipeline invocation and immutable afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Trigger {
    /// Source ref the build was produced from (e.g., "main")
    pub source_ref: String,
    /// Explicit environment override; bypasses the branch mapping when
    /// present and non-empty
    pub env_override: Option<String>,
}

impl Trigger {
    /// Create a trigger for a source ref with no override.
    pub fn new(source_ref: impl Into<String>) -> Self {
        Self {
            source_ref: source_ref.into(),
            env_override: None,
        }
    }

    /// Set an explicit environment override.
    pub fn with_override(mut self, environment: impl Into<String>) -> Self {
        self.env_override = Some(environment.into());
        self
    }
}

/// A resolved deployment target.
///
/// Constructed by the resolver (or directly when the caller already knows the
/// target). The locator's record existence check is the authoritative
/// validation that the environment is actually provisioned.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Environment(String);

impl Environment {
    /// Wrap an environment name.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Maps triggers to environments using an operator-supplied branch mapping.
///
/// The mapping is configuration, never code: adding a branch -> environment
/// pair is an edit to propel.toml, and the resolver carries no built-in
/// defaults.
#[derive(Debug, Clone)]
pub struct EnvironmentResolver {
    mapping: BTreeMap<String, String>,
}

impl EnvironmentResolver {
    /// Create a resolver over a branch -> environment mapping.
    pub fn new(mapping: BTreeMap<String, String>) -> Self {
        Self { mapping }
    }

    /// Resolve a trigger to exactly one target environment.
    ///
    /// A non-empty override wins verbatim; its existence is validated
    /// downstream by the record locator. Otherwise the source ref must have a
    /// mapping entry. A miss fails closed rather than falling back to a
    /// default, so an unmapped branch can never deploy anywhere by accident.
    pub fn resolve(&self, trigger: &Trigger) -> Result<Environment, PropagateError> {
        if let Some(name) = trigger.env_override.as_deref()
            && !name.is_empty()
        {
            return Ok(Environment::new(name));
        }

        self.mapping
            .get(&trigger.source_ref)
            .map(|name| Environment::new(name.clone()))
            .ok_or_else(|| PropagateError::UnsupportedRef {
                source_ref: trigger.source_ref.clone(),
            })
    }
}
