//! Error taxonomy for propagation attempts.

use std::path::PathBuf;

use thiserror::Error;

/// Failure classes for a propagation attempt.
///
/// Every variant is terminal for the current invocation and surfaced verbatim
/// to the caller; nothing is retried beyond the bounded conflict loop in the
/// coordinator. A no-op propagation is not an error (see
/// [`crate::propagate::PublishOutcome::NoOpNotNeeded`]).
#[derive(Debug, Error)]
pub enum PropagateError {
    /// The trigger's source ref has no entry in the branch mapping and no
    /// override was supplied. The operator must extend the mapping or pass an
    /// explicit environment; there is no default target.
    #[error("no environment mapping for source ref '{source_ref}' and no override given")]
    UnsupportedRef { source_ref: String },

    /// The resolved environment has no configuration record in the working
    /// copy. This is the authoritative environment validation; it catches
    /// typos in overrides and unprovisioned environments.
    #[error("no configuration record for environment '{environment}' at {}", .path.display())]
    RecordNotFound { environment: String, path: PathBuf },

    /// The record exists but one of the owned fields is absent, null, or not
    /// a scalar. The core never inserts or repairs structure, so this is a
    /// record authoring bug.
    #[error("configuration record field '{field}' is missing, empty, or not a scalar")]
    MissingField { field: &'static str },

    /// The record is not parseable YAML.
    #[error("configuration record is not valid YAML: {0}")]
    MalformedRecord(#[from] serde_yaml::Error),

    /// The in-place rewrite could not locate the image fields in the record
    /// text, or produced content that differs from the original outside the
    /// two owned fields. Nothing is committed.
    #[error("structural rewrite of the record failed; image fields were not safely updatable in place")]
    RewriteVerification,

    /// Network or auth failure talking to the configuration repository,
    /// including a clone/fetch/push that exceeded the transport timeout.
    #[error("git transport failure: {0}")]
    Transport(String),

    /// Local git inspection of the working copy failed.
    #[error("git operation failed: {0}")]
    Git(#[from] git2::Error),

    /// A local git invocation inside the working copy failed (staging,
    /// committing, resetting). Distinct from transport failures; never
    /// retried.
    #[error("local git operation failed: {0}")]
    LocalGit(String),

    /// The push lost the race against concurrent writers more times than the
    /// configured budget allows. Safe to re-trigger.
    #[error("publish conflict persisted after {attempts} attempts")]
    ConflictExhausted { attempts: u32 },

    /// Filesystem failure inside the working copy.
    #[error("working copy I/O failure: {0}")]
    Io(#[from] std::io::Error),
}
