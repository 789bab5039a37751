//! Configuration schema for propel.toml
//!
//! One file carries everything the coordinator needs: the configuration
//! repository coordinates, the record layout, the retry and timeout budgets,
//! and the promotion mapping. There are no ambient environment variables.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::propagate::PropagationConfig;
use crate::record::RecordLayout;

/// Root configuration structure for propel.toml
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct PropelConfig {
    /// URL of the configuration repository the reconciliation agent watches
    pub config_repo: String,

    /// Tracked branch
    #[serde(default = "default_branch")]
    pub branch: String,

    /// Root directory holding one subdirectory per environment
    #[serde(default = "default_environments_dir")]
    pub environments_dir: String,

    /// Record file name inside each environment directory
    #[serde(default = "default_record_file")]
    pub record_file: String,

    /// Conflict-retry budget for publish
    #[serde(default = "default_max_publish_attempts")]
    pub max_publish_attempts: u32,

    /// Deadline in seconds for each clone/fetch/push invocation
    #[serde(default = "default_transport_timeout_secs")]
    pub transport_timeout_secs: u64,

    /// Committer identity for propagation commits
    #[serde(default = "default_author_name")]
    pub author_name: String,
    #[serde(default = "default_author_email")]
    pub author_email: String,

    /// Source ref -> environment promotion mapping.
    ///
    /// Required and non-empty: whether `main` promotes to `dev` or to
    /// `production` is policy the operator must state, not something the
    /// tool infers.
    #[serde(default)]
    pub mapping: BTreeMap<String, String>,
}

fn default_branch() -> String {
    "main".to_string()
}

fn default_environments_dir() -> String {
    "environments".to_string()
}

fn default_record_file() -> String {
    "deployment.yaml".to_string()
}

fn default_max_publish_attempts() -> u32 {
    3
}

fn default_transport_timeout_secs() -> u64 {
    120
}

fn default_author_name() -> String {
    "propel".to_string()
}

fn default_author_email() -> String {
    "propel@localhost".to_string()
}

impl PropelConfig {
    /// Validate invariants that the schema alone cannot express.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.config_repo.trim().is_empty() {
            anyhow::bail!("config-repo must not be empty");
        }
        if self.branch.trim().is_empty() {
            anyhow::bail!("branch must not be empty");
        }
        if self.max_publish_attempts == 0 {
            anyhow::bail!("max-publish-attempts must be at least 1");
        }
        if self.mapping.is_empty() {
            anyhow::bail!(
                "[mapping] must define at least one source ref -> environment pair; \
                 there is no built-in promotion mapping"
            );
        }
        for (source_ref, environment) in &self.mapping {
            if environment.trim().is_empty() {
                anyhow::bail!("mapping for '{}' names an empty environment", source_ref);
            }
        }
        Ok(())
    }

    /// Build the coordinator configuration from this file.
    pub fn propagation(&self) -> PropagationConfig {
        PropagationConfig {
            config_repo: self.config_repo.clone(),
            branch: self.branch.clone(),
            layout: RecordLayout {
                environments_dir: self.environments_dir.clone(),
                record_file: self.record_file.clone(),
            },
            mapping: self.mapping.clone(),
            max_publish_attempts: self.max_publish_attempts,
            transport_timeout: Duration::from_secs(self.transport_timeout_secs),
            author_name: self.author_name.clone(),
            author_email: self.author_email.clone(),
        }
    }
}
