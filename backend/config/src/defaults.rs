//! Config defaults: applies default values to a parsed config.

use crate::schema::{AmethystConfig, ConsoleConfig, HelpConfig, LoggingConfig};

pub const DEFAULT_PREFIX: &str = "!";
pub const DEFAULT_MODULE: &str = "modules.core";
pub const DEFAULT_MESSAGE_LIMIT: usize = 2000;
pub const DEFAULT_HELP_PAGE_SIZE: usize = 1900;
pub const DEFAULT_PROMPT_TIMEOUT_SECS: u64 = 15;
pub const DEFAULT_SETTINGS_PATH: &str = "settings.json";
pub const DEFAULT_LOG_LEVEL: &str = "info";
pub const DEFAULT_CONSOLE_USER_ID: u64 = 1;
pub const DEFAULT_CONSOLE_USER_NAME: &str = "console";

pub fn default_prefixes() -> Vec<String> {
    vec![DEFAULT_PREFIX.to_string()]
}

pub fn default_modules() -> Vec<String> {
    vec![DEFAULT_MODULE.to_string()]
}

/// Apply all defaults to a freshly loaded config.
pub fn apply_all_defaults(config: AmethystConfig) -> AmethystConfig {
    let config = apply_command_defaults(config);
    let config = apply_help_defaults(config);
    let config = apply_logging_defaults(config);
    apply_console_defaults(config)
}

fn apply_command_defaults(mut config: AmethystConfig) -> AmethystConfig {
    config.prefixes.get_or_insert_with(default_prefixes);
    config.owners.get_or_insert_with(Vec::new);
    config.modules.get_or_insert_with(default_modules);
    config.message_limit.get_or_insert(DEFAULT_MESSAGE_LIMIT);
    config.prompt_timeout_secs.get_or_insert(DEFAULT_PROMPT_TIMEOUT_SECS);
    config.ignore_bots.get_or_insert(true);
    config.settings_path.get_or_insert_with(|| DEFAULT_SETTINGS_PATH.to_string());
    config
}

/// The help page never exceeds the message limit.
fn apply_help_defaults(mut config: AmethystConfig) -> AmethystConfig {
    let limit = config.message_limit.unwrap_or(DEFAULT_MESSAGE_LIMIT);
    let help = config.help.get_or_insert_with(HelpConfig::default);
    help.page_size.get_or_insert(DEFAULT_HELP_PAGE_SIZE.min(limit));
    config
}

fn apply_logging_defaults(mut config: AmethystConfig) -> AmethystConfig {
    let logging = config.logging.get_or_insert_with(LoggingConfig::default);
    logging.level.get_or_insert_with(|| DEFAULT_LOG_LEVEL.to_string());
    logging.json.get_or_insert(false);
    config
}

fn apply_console_defaults(mut config: AmethystConfig) -> AmethystConfig {
    let console = config.console.get_or_insert_with(ConsoleConfig::default);
    console.user_id.get_or_insert(DEFAULT_CONSOLE_USER_ID);
    console.user_name.get_or_insert_with(|| DEFAULT_CONSOLE_USER_NAME.to_string());
    config
}
