//! Artifact identity supplied by the build collaborator.

use serde::{Deserialize, Serialize};

/// Identity of a built, registry-resident image.
///
/// Produced once per pipeline invocation, after the image has been pushed to
/// the registry. The core only consumes the identity and assumes the artifact
/// is already pullable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactDescriptor {
    /// Stable registry path (e.g., "ghcr.io/org/svc")
    pub repository: String,
    /// Immutable tag, expected to be collision-resistant (the triggering
    /// commit's content hash)
    pub tag: String,
}

impl ArtifactDescriptor {
    /// Create a new ArtifactDescriptor.
    pub fn new(repository: impl Into<String>, tag: impl Into<String>) -> Self {
        Self {
            repository: repository.into(),
            tag: tag.into(),
        }
    }
}
