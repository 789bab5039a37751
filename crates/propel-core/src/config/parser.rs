//! TOML parser with helpful error messages

use std::path::Path;

use anyhow::{Context, Result};

use super::schema::PropelConfig;

/// Parse propel.toml with file context on failure
pub fn parse_propel_toml(path: &Path) -> Result<PropelConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    parse_propel_toml_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Parse propel.toml content from string
pub fn parse_propel_toml_str(content: &str) -> Result<PropelConfig> {
    let config: PropelConfig =
        toml::from_str(content).context("propel.toml is not valid TOML for this schema")?;

    config.validate()?;

    Ok(config)
}
