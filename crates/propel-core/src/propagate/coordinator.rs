//! The propagation coordinator.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use crate::artifact::ArtifactDescriptor;
use crate::environment::{Environment, EnvironmentResolver, Trigger};
use crate::error::PropagateError;
use crate::git::{GitWorkspace, PushResult};
use crate::record::{self, RecordLayout};

use super::PublishOutcome;

static CHECKOUT_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Explicit configuration for the coordinator.
///
/// Everything the pipeline used to carry in ambient environment variables
/// (repository URL, branch, paths) lives here and is passed in at
/// construction.
#[derive(Debug, Clone)]
pub struct PropagationConfig {
    /// URL of the configuration repository
    pub config_repo: String,
    /// Tracked branch the reconciliation agent watches
    pub branch: String,
    /// Record layout inside the repository
    pub layout: RecordLayout,
    /// Source ref -> environment mapping (operator-supplied, never defaulted)
    pub mapping: BTreeMap<String, String>,
    /// Conflict-retry budget for publish
    pub max_publish_attempts: u32,
    /// Deadline for each clone/fetch/push invocation
    pub transport_timeout: Duration,
    /// Committer identity
    pub author_name: String,
    pub author_email: String,
}

/// Orchestrates one propagation attempt end to end.
///
/// Each call works in a fresh clone under the state directory; no state is
/// shared between invocations. Concurrent invocations racing on the same
/// environment are serialized optimistically: a push rejected as
/// non-fast-forward refetches the remote head and re-applies the mutation
/// against the fresh content, bounded by the attempt budget. The stale diff
/// is never replayed, because the competing change may have touched other
/// parts of the same record. Pipelines that can queue should still admit at
/// most one propagation per environment at a time; the retry loop is the
/// fallback, not the plan.
#[derive(Debug)]
pub struct PropagationCoordinator {
    config: PropagationConfig,
    resolver: EnvironmentResolver,
    state_dir: PathBuf,
}

impl PropagationCoordinator {
    /// Create a coordinator that keeps its transient clones under `state_dir`.
    pub fn new(config: PropagationConfig, state_dir: PathBuf) -> Self {
        let resolver = EnvironmentResolver::new(config.mapping.clone());
        Self {
            config,
            resolver,
            state_dir,
        }
    }

    /// Propagate an artifact into its environment's configuration record.
    pub fn propagate(
        &self,
        trigger: &Trigger,
        artifact: &ArtifactDescriptor,
    ) -> Result<PublishOutcome, PropagateError> {
        let environment = self.resolver.resolve(trigger)?;
        tracing::info!(
            environment = %environment,
            repository = %artifact.repository,
            tag = %artifact.tag,
            "resolved target environment"
        );

        let checkout = self.checkout_dir();
        let result = self.propagate_in(&checkout, &environment, artifact);
        let _ = std::fs::remove_dir_all(&checkout);
        result
    }

    fn propagate_in(
        &self,
        checkout: &Path,
        environment: &Environment,
        artifact: &ArtifactDescriptor,
    ) -> Result<PublishOutcome, PropagateError> {
        let workspace = GitWorkspace::clone(
            &self.config.config_repo,
            &self.config.branch,
            checkout.to_path_buf(),
            &self.config.author_name,
            &self.config.author_email,
            self.config.transport_timeout,
        )?;

        let attempts = self.config.max_publish_attempts.max(1);
        for attempt in 0..attempts {
            if attempt > 0 {
                workspace.fetch_reset()?;
            }

            // Locate and mutate against the head fetched just above; a stale
            // base never crosses an attempt boundary.
            let record_ref = record::locate(environment, workspace.root(), &self.config.layout)?;
            let existing = std::fs::read_to_string(&record_ref.path)?;
            let mutation = record::mutate(&existing, artifact)?;

            if !mutation.changed {
                tracing::info!(
                    environment = %environment,
                    tag = %artifact.tag,
                    "record already current; nothing to publish"
                );
                return Ok(PublishOutcome::NoOpNotNeeded);
            }

            std::fs::write(&record_ref.path, &mutation.new_content)?;
            let message = commit_message(environment, artifact);
            let commit_id = workspace.commit_path(&record_ref.rel_path, &message)?;

            match workspace.push()? {
                PushResult::Pushed => {
                    tracing::info!(
                        environment = %environment,
                        commit = %commit_id,
                        conflict_retries = attempt,
                        "published configuration update"
                    );
                    return Ok(PublishOutcome::Committed {
                        commit_id,
                        conflict_retries: attempt,
                    });
                }
                PushResult::RejectedNonFastForward => {
                    tracing::warn!(
                        environment = %environment,
                        attempt = attempt + 1,
                        "push rejected, remote advanced; refetching"
                    );
                }
            }
        }

        Err(PropagateError::ConflictExhausted { attempts })
    }

    fn checkout_dir(&self) -> PathBuf {
        let n = CHECKOUT_COUNTER.fetch_add(1, Ordering::Relaxed);
        self.state_dir
            .join("checkouts")
            .join(format!("{}.{}", std::process::id(), n))
    }
}

/// Deterministic commit message encoding environment and artifact identity.
pub fn commit_message(environment: &Environment, artifact: &ArtifactDescriptor) -> String {
    format!(
        "deploy({}): {}:{}",
        environment, artifact.repository, artifact.tag
    )
}
