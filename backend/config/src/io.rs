//! Config file location and loading.

use crate::schema::AmethystConfig;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info};

/// Default config file name within the config directory.
const CONFIG_FILE_NAME: &str = "config.yaml";

/// Resolve the Amethyst config directory.
/// Priority: `AMETHYST_CONFIG_DIR` env > `~/.amethyst/` > `./.amethyst`
pub fn config_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("AMETHYST_CONFIG_DIR") {
        return PathBuf::from(dir);
    }
    match dirs::home_dir() {
        Some(home) => home.join(".amethyst"),
        None => PathBuf::from(".amethyst"),
    }
}

/// Resolve the full path to the main config file.
pub fn config_file_path(config_dir: &Path) -> PathBuf {
    config_dir.join(CONFIG_FILE_NAME)
}

/// Read the config file as a JSON value tree for further processing.
///
/// A missing file reads as an empty object (first run).
pub async fn load_config_value(path: &Path) -> Result<serde_json::Value> {
    if !path.exists() {
        debug!(path = %path.display(), "Config file does not exist; using defaults");
        return Ok(serde_json::Value::Object(Default::default()));
    }

    let raw = fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    // An empty document parses as null.
    let value: serde_json::Value = serde_yaml::from_str(&raw)
        .with_context(|| format!("Failed to parse config YAML at: {}", path.display()))?;
    let value = if value.is_null() { serde_json::Value::Object(Default::default()) } else { value };

    info!(path = %path.display(), "Loaded config");
    Ok(value)
}

/// Load and parse the config from disk without further processing.
pub async fn load_config(path: &Path) -> Result<AmethystConfig> {
    let value = load_config_value(path).await?;
    serde_json::from_value(value)
        .with_context(|| format!("Invalid config at: {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_file_is_default() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config(&config_file_path(dir.path())).await.unwrap();
        assert_eq!(config, AmethystConfig::default());
    }

    #[tokio::test]
    async fn empty_file_is_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = config_file_path(dir.path());
        std::fs::write(&path, "").unwrap();
        assert_eq!(load_config(&path).await.unwrap(), AmethystConfig::default());
    }

    #[tokio::test]
    async fn bad_yaml_names_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = config_file_path(dir.path());
        std::fs::write(&path, "prefixes: [unterminated").unwrap();
        let err = load_config(&path).await.unwrap_err();
        assert!(format!("{err:#}").contains("config.yaml"));
    }
}
