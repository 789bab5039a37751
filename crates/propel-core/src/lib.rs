//! Propel Core Library
//!
//! Environment resolution and config propagation for a deployment-promotion
//! pipeline: map a build trigger to exactly one target environment, rewrite
//! the image identity in that environment's configuration record, and publish
//! the change to the configuration repository that the reconciliation agent
//! watches.

pub mod artifact;
pub mod config;
pub mod environment;
pub mod error;
pub mod git;
pub mod propagate;
pub mod record;

/// Re-exports of commonly used types
pub mod prelude {
    // Trigger and resolution
    pub use crate::environment::{Environment, EnvironmentResolver, Trigger};

    // Artifact identity
    pub use crate::artifact::ArtifactDescriptor;

    // Records
    pub use crate::record::{ConfigRecordRef, MutationResult, RecordLayout, locate, mutate};

    // Propagation
    pub use crate::propagate::{PropagationConfig, PropagationCoordinator, PublishOutcome};

    // Configuration
    pub use crate::config::{PropelConfig, parse_propel_toml};

    // Errors
    pub use crate::error::PropagateError;
}
