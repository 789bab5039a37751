//! Propagation orchestration: clone, mutate, publish.

mod coordinator;
mod outcome;

pub use coordinator::{PropagationConfig, PropagationCoordinator, commit_message};
pub use outcome::PublishOutcome;
