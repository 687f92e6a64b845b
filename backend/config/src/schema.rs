//! Amethyst runtime configuration schema.
//!
//! Every field is optional on disk; [`crate::apply_all_defaults`] fills the
//! gaps and the accessors below read the effective values.

use serde::{Deserialize, Serialize};

use crate::defaults::*;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AmethystConfig {
    /// Command prefixes, tried in order.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prefixes: Option<Vec<String>>,

    /// Bot owner user ids, merged with persisted owners.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owners: Option<Vec<u64>>,

    /// Modules loaded at start-up, before persisted ones.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modules: Option<Vec<String>>,

    /// Outgoing messages are split to this many characters.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_limit: Option<usize>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub help: Option<HelpConfig>,

    /// How long a disambiguation prompt waits for an answer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt_timeout_secs: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ignore_bots: Option<bool>,

    /// JSON settings blob used by the host.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settings_path: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logging: Option<LoggingConfig>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub console: Option<ConsoleConfig>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HelpConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_size: Option<usize>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoggingConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,
    /// Rolling log file directory. No file output when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dir: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub json: Option<bool>,
}

/// Identity of the user typing into the console host.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsoleConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_name: Option<String>,
}

// ---------------------------------------------------------------------------
// Effective values
// ---------------------------------------------------------------------------

impl AmethystConfig {
    pub fn prefixes(&self) -> Vec<String> {
        self.prefixes.clone().unwrap_or_else(default_prefixes)
    }

    pub fn owners(&self) -> Vec<u64> {
        self.owners.clone().unwrap_or_default()
    }

    pub fn modules(&self) -> Vec<String> {
        self.modules.clone().unwrap_or_else(default_modules)
    }

    pub fn message_limit(&self) -> usize {
        self.message_limit.unwrap_or(DEFAULT_MESSAGE_LIMIT)
    }

    pub fn help_page_size(&self) -> usize {
        self.help.as_ref().and_then(|h| h.page_size).unwrap_or(DEFAULT_HELP_PAGE_SIZE)
    }

    pub fn prompt_timeout_secs(&self) -> u64 {
        self.prompt_timeout_secs.unwrap_or(DEFAULT_PROMPT_TIMEOUT_SECS)
    }

    pub fn ignore_bots(&self) -> bool {
        self.ignore_bots.unwrap_or(true)
    }

    pub fn settings_path(&self) -> &str {
        self.settings_path.as_deref().unwrap_or(DEFAULT_SETTINGS_PATH)
    }

    pub fn log_level(&self) -> &str {
        self.logging.as_ref().and_then(|l| l.level.as_deref()).unwrap_or(DEFAULT_LOG_LEVEL)
    }

    pub fn log_dir(&self) -> Option<&str> {
        self.logging.as_ref().and_then(|l| l.dir.as_deref())
    }

    pub fn log_json(&self) -> bool {
        self.logging.as_ref().and_then(|l| l.json).unwrap_or(false)
    }

    pub fn console_user_id(&self) -> u64 {
        self.console.as_ref().and_then(|c| c.user_id).unwrap_or(DEFAULT_CONSOLE_USER_ID)
    }

    pub fn console_user_name(&self) -> &str {
        self.console
            .as_ref()
            .and_then(|c| c.user_name.as_deref())
            .unwrap_or(DEFAULT_CONSOLE_USER_NAME)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_camel_case_yaml() {
        let yaml = r#"
prefixes: ["?", "amethyst "]
owners: [1234]
messageLimit: 1500
help:
  pageSize: 1200
promptTimeoutSecs: 30
logging:
  level: debug
console:
  userName: root
"#;
        let config: AmethystConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.prefixes(), vec!["?", "amethyst "]);
        assert_eq!(config.owners(), vec![1234]);
        assert_eq!(config.message_limit(), 1500);
        assert_eq!(config.help_page_size(), 1200);
        assert_eq!(config.prompt_timeout_secs(), 30);
        assert_eq!(config.log_level(), "debug");
        assert_eq!(config.console_user_name(), "root");
        assert_eq!(config.console_user_id(), DEFAULT_CONSOLE_USER_ID);
        assert_eq!(config.modules(), vec!["modules.core"]);
    }
}
