//! Git transport for the configuration repository.
//!
//! All repository mutation goes through the system `git` binary so that the
//! operator's transports and credential helpers apply unchanged; local
//! inspection (HEAD ids) goes through libgit2.

mod workspace;

pub use workspace::{GitWorkspace, PushResult};
