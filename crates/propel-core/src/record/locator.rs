//! Deterministic record paths inside the configuration repository.

use std::path::{Path, PathBuf};

use crate::environment::Environment;
use crate::error::PropagateError;

/// Directory layout of records inside the configuration repository.
#[derive(Debug, Clone)]
pub struct RecordLayout {
    /// Fixed root directory holding one subdirectory per environment
    pub environments_dir: String,
    /// Fixed record file name inside each environment directory
    pub record_file: String,
}

impl Default for RecordLayout {
    fn default() -> Self {
        Self {
            environments_dir: "environments".to_string(),
            record_file: "deployment.yaml".to_string(),
        }
    }
}

/// Resolved location of an environment's configuration record.
#[derive(Debug, Clone)]
pub struct ConfigRecordRef {
    pub environment: Environment,
    /// Absolute path inside the working copy
    pub path: PathBuf,
    /// Repository-relative path, used when staging the commit
    pub rel_path: PathBuf,
}

/// Compute the record path for an environment and verify it exists.
///
/// The path is always `<environments-dir>/<env>/<record-file>` under the
/// working copy root. The existence check is the authoritative environment
/// validation: it catches typos in overrides and stale mapping entries that
/// the resolver cannot catch on its own.
pub fn locate(
    environment: &Environment,
    repo_root: &Path,
    layout: &RecordLayout,
) -> Result<ConfigRecordRef, PropagateError> {
    let name = environment.as_str();

    // Names that would resolve outside the environments root are treated the
    // same as unprovisioned environments.
    if name.is_empty() || name == "." || name == ".." || name.contains(['/', '\\']) {
        return Err(PropagateError::RecordNotFound {
            environment: name.to_string(),
            path: repo_root.join(&layout.environments_dir).join(name),
        });
    }

    let rel_path = Path::new(&layout.environments_dir)
        .join(name)
        .join(&layout.record_file);
    let path = repo_root.join(&rel_path);

    if !path.is_file() {
        return Err(PropagateError::RecordNotFound {
            environment: name.to_string(),
            path,
        });
    }

    Ok(ConfigRecordRef {
        environment: environment.clone(),
        path,
        rel_path,
    })
}
