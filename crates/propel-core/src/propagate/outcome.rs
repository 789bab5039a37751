//! Terminal states of a propagation attempt.

use serde::Serialize;

/// Successful terminal state of a propagation attempt.
///
/// Failures are the `Err` arm of the coordinator's result. Both variants here
/// are successes: the invoking pipeline must exit zero for either, and a
/// no-op is an observable outcome, not a swallowed failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "kebab-case")]
pub enum PublishOutcome {
    /// The record already carried the artifact identity; nothing was staged
    /// or pushed.
    NoOpNotNeeded,
    /// The mutated record was committed and published to the tracked branch.
    Committed {
        /// Commit id now at the remote branch head
        commit_id: String,
        /// Non-fast-forward rejections absorbed before the publish landed
        conflict_retries: u32,
    },
}
