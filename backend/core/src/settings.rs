//! Settings stores and the bot's persisted settings blob.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio::fs;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info};

use crate::error::AmethystError;
use crate::traits::SettingsStore;

/// Key under which [`BotSettings`] is stored.
pub const BOT_SETTINGS_KEY: &str = "settings";

// ---------------------------------------------------------------------------
// Bot settings blob
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BotSettings {
    #[serde(default)]
    pub owners: Vec<u64>,
    #[serde(default)]
    pub blacklist: Vec<u64>,
    /// Modules to load on start, in order.
    #[serde(default)]
    pub modules: Vec<String>,
}

impl BotSettings {
    /// Read the blob, falling back to defaults when absent.
    pub async fn load_from(store: &dyn SettingsStore) -> Result<Self> {
        match store.load(BOT_SETTINGS_KEY).await? {
            Some(value) => serde_json::from_value(value)
                .with_context(|| format!("Malformed `{BOT_SETTINGS_KEY}` settings blob")),
            None => Ok(Self::default()),
        }
    }

    pub async fn save_to(&self, store: &dyn SettingsStore) -> Result<()> {
        let value = serde_json::to_value(self).context("Failed to serialize bot settings")?;
        store.save(BOT_SETTINGS_KEY, value).await
    }

    /// Append `module` unless already listed. Returns whether it changed.
    pub fn remember_module(&mut self, module: &str) -> bool {
        if self.modules.iter().any(|m| m == module) {
            return false;
        }
        self.modules.push(module.to_string());
        true
    }

    pub fn forget_module(&mut self, module: &str) -> bool {
        let before = self.modules.len();
        self.modules.retain(|m| m != module);
        before != self.modules.len()
    }
}

// ---------------------------------------------------------------------------
// In-memory store
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct MemorySettings {
    values: RwLock<HashMap<String, Value>>,
}

impl MemorySettings {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SettingsStore for MemorySettings {
    async fn load(&self, key: &str) -> Result<Option<Value>> {
        Ok(self.values.read().await.get(key).cloned())
    }

    async fn save(&self, key: &str, value: Value) -> Result<()> {
        self.values.write().await.insert(key.to_string(), value);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// JSON file store
// ---------------------------------------------------------------------------

/// All keys live in one JSON object on disk, rewritten atomically on save.
pub struct JsonFileStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), write_lock: Mutex::new(()) }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_all(&self) -> Result<Map<String, Value>> {
        if !self.path.exists() {
            debug!(path = %self.path.display(), "Settings file does not exist; starting empty");
            return Ok(Map::new());
        }
        let raw = fs::read_to_string(&self.path)
            .await
            .with_context(|| format!("Failed to read settings file: {}", self.path.display()))?;
        if raw.trim().is_empty() {
            return Ok(Map::new());
        }
        match serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse settings JSON at: {}", self.path.display()))?
        {
            Value::Object(map) => Ok(map),
            _ => Err(AmethystError::SettingsError(format!(
                "{} does not contain a JSON object",
                self.path.display()
            ))
            .into()),
        }
    }
}

#[async_trait]
impl SettingsStore for JsonFileStore {
    async fn load(&self, key: &str) -> Result<Option<Value>> {
        Ok(self.read_all().await?.remove(key))
    }

    async fn save(&self, key: &str, value: Value) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let mut all = self.read_all().await?;
        all.insert(key.to_string(), value);

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await.with_context(|| {
                format!("Failed to create settings directory: {}", parent.display())
            })?;
        }

        let json = serde_json::to_string_pretty(&Value::Object(all))
            .context("Failed to serialize settings")?;
        let tmp_path = self.path.with_extension("json.tmp");
        fs::write(&tmp_path, json.as_bytes())
            .await
            .with_context(|| format!("Failed to write temp settings: {}", tmp_path.display()))?;
        fs::rename(&tmp_path, &self.path).await.with_context(|| {
            format!("Failed to rename temp settings to: {}", self.path.display())
        })?;

        info!(path = %self.path.display(), key, "Saved settings");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_bot_settings_default_when_absent() {
        let store = MemorySettings::new();
        let settings = BotSettings::load_from(&store).await.unwrap();
        assert_eq!(settings, BotSettings::default());
    }

    #[tokio::test]
    async fn test_bot_settings_round_trip_through_memory() {
        let store = MemorySettings::new();
        let mut settings = BotSettings { owners: vec![7], ..Default::default() };
        assert!(settings.remember_module("modules.basic"));
        assert!(!settings.remember_module("modules.basic"));
        settings.save_to(&store).await.unwrap();

        let loaded = BotSettings::load_from(&store).await.unwrap();
        assert_eq!(loaded.owners, vec![7]);
        assert_eq!(loaded.modules, vec!["modules.basic".to_string()]);
    }

    #[tokio::test]
    async fn test_json_file_store_keeps_other_keys() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("nested").join("settings.json"));
        store.save("a", serde_json::json!(1)).await.unwrap();
        store.save("b", serde_json::json!({"x": true})).await.unwrap();

        assert_eq!(store.load("a").await.unwrap(), Some(serde_json::json!(1)));
        assert_eq!(store.load("b").await.unwrap().unwrap()["x"], true);
        assert_eq!(store.load("missing").await.unwrap(), None);
        assert!(!store.path().with_extension("json.tmp").exists());
    }

    #[tokio::test]
    async fn test_json_file_store_rejects_non_object() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, "[1, 2]").unwrap();
        let store = JsonFileStore::new(&path);
        assert!(store.load("a").await.is_err());
    }
}
