//! Config validation with field paths and user-friendly messages.

use crate::schema::AmethystConfig;
use thiserror::Error;

/// Smallest message limit the splitter is asked to honour.
pub const MIN_MESSAGE_LIMIT: usize = 100;

/// Hard limit of the chat platform.
pub const PLATFORM_MESSAGE_LIMIT: usize = 2000;

const LOG_LEVELS: [&str; 6] = ["trace", "debug", "info", "warn", "error", "off"];

/// A config validation error with field path and message.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Config validation error at '{path}': {message}")]
pub struct ConfigValidationError {
    pub path: String,
    pub message: String,
}

/// Every error and warning found in one pass.
#[derive(Debug, Default)]
pub struct ValidationReport {
    pub errors: Vec<ConfigValidationError>,
    pub warnings: Vec<ConfigValidationError>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    fn error(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ConfigValidationError { path: path.into(), message: message.into() });
    }

    fn warn(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ConfigValidationError { path: path.into(), message: message.into() });
    }
}

/// Validate the effective config.
pub fn validate(config: &AmethystConfig) -> ValidationReport {
    let mut report = ValidationReport::default();
    validate_prefixes(config, &mut report);
    validate_limits(config, &mut report);
    validate_modules(config, &mut report);
    validate_logging(config, &mut report);
    validate_console(config, &mut report);
    report
}

fn validate_prefixes(config: &AmethystConfig, report: &mut ValidationReport) {
    let prefixes = config.prefixes();
    if prefixes.is_empty() {
        report.error("prefixes", "At least one prefix is required");
    }
    for (i, prefix) in prefixes.iter().enumerate() {
        if prefix.is_empty() {
            report.error(format!("prefixes[{i}]"), "Prefix cannot be empty");
            continue;
        }
        // Prefixes are tried in order, so an earlier prefix of a later one wins.
        if let Some(earlier) = prefixes[..i].iter().find(|p| !p.is_empty() && prefix.starts_with(p.as_str())) {
            report.warn(
                format!("prefixes[{i}]"),
                format!("'{prefix}' is never reached; '{earlier}' is tried first"),
            );
        }
    }
}

fn validate_limits(config: &AmethystConfig, report: &mut ValidationReport) {
    let limit = config.message_limit();
    if limit < MIN_MESSAGE_LIMIT {
        report.error("messageLimit", format!("messageLimit must be >= {MIN_MESSAGE_LIMIT}"));
    } else if limit > PLATFORM_MESSAGE_LIMIT {
        report.warn(
            "messageLimit",
            format!("messageLimit {limit} exceeds the platform limit of {PLATFORM_MESSAGE_LIMIT}"),
        );
    }

    let page = config.help_page_size();
    if page > limit {
        report.error("help.pageSize", format!("help.pageSize must be <= messageLimit ({limit})"));
    }
    if page < MIN_MESSAGE_LIMIT {
        report.error("help.pageSize", format!("help.pageSize must be >= {MIN_MESSAGE_LIMIT}"));
    }

    if config.prompt_timeout_secs() == 0 {
        report.error("promptTimeoutSecs", "promptTimeoutSecs must be > 0");
    }
}

fn validate_modules(config: &AmethystConfig, report: &mut ValidationReport) {
    let modules = config.modules();
    for (i, module) in modules.iter().enumerate() {
        if module.trim().is_empty() {
            report.error(format!("modules[{i}]"), "Module name cannot be empty");
        } else if modules[..i].contains(module) {
            report.warn(format!("modules[{i}]"), format!("Module '{module}' is listed twice"));
        }
    }
    if !modules.iter().any(|m| m == "modules.core") {
        report.warn("modules", "modules.core is not loaded; help and module management are unavailable");
    }
}

fn validate_logging(config: &AmethystConfig, report: &mut ValidationReport) {
    let level = config.log_level();
    if !LOG_LEVELS.contains(&level.to_ascii_lowercase().as_str()) {
        report.warn("logging.level", format!("'{level}' is not a plain level; it is used as a filter directive"));
    }
}

fn validate_console(config: &AmethystConfig, report: &mut ValidationReport) {
    if config.console_user_name().trim().is_empty() {
        report.error("console.userName", "Console user name cannot be empty");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::defaults::apply_all_defaults;
    use crate::schema::HelpConfig;

    #[test]
    fn default_config_is_valid() {
        let report = validate(&apply_all_defaults(AmethystConfig::default()));
        assert!(report.is_valid(), "errors: {:?}", report.errors);
        assert!(report.warnings.is_empty(), "warnings: {:?}", report.warnings);
    }

    #[test]
    fn empty_prefixes_are_errors() {
        let config = AmethystConfig { prefixes: Some(vec![]), ..Default::default() };
        assert_eq!(validate(&config).errors[0].path, "prefixes");

        let config = AmethystConfig { prefixes: Some(vec!["!".into(), "".into()]), ..Default::default() };
        assert_eq!(validate(&config).errors[0].path, "prefixes[1]");
    }

    #[test]
    fn shadowed_prefix_warns() {
        let config = AmethystConfig { prefixes: Some(vec!["!".into(), "!!".into()]), ..Default::default() };
        let report = validate(&config);
        assert!(report.is_valid());
        assert_eq!(report.warnings[0].path, "prefixes[1]");
    }

    #[test]
    fn page_size_bounded_by_limit() {
        let config = AmethystConfig {
            message_limit: Some(1000),
            help: Some(HelpConfig { page_size: Some(1500) }),
            ..Default::default()
        };
        let report = validate(&config);
        assert!(report.errors.iter().any(|e| e.path == "help.pageSize"));

        let config = AmethystConfig { message_limit: Some(50), ..Default::default() };
        assert!(validate(&config).errors.iter().any(|e| e.path == "messageLimit"));
    }

    #[test]
    fn zero_timeout_is_error() {
        let config = AmethystConfig { prompt_timeout_secs: Some(0), ..Default::default() };
        assert_eq!(validate(&config).errors[0].path, "promptTimeoutSecs");
    }
}
