//! `amethyst-config` — Amethyst runtime configuration.
//!
//! Provides:
//! - Typed config schema with camelCase YAML keys
//! - `${ENV_VAR}` substitution
//! - Default value application
//! - Validation with errors and warnings

pub mod defaults;
pub mod env;
pub mod io;
pub mod schema;
pub mod validation;

pub use defaults::apply_all_defaults;
pub use env::{resolve_env_vars, resolve_env_vars_with, MissingEnvVarError};
pub use io::{config_dir, config_file_path, load_config, load_config_value};
pub use schema::{AmethystConfig, ConsoleConfig, HelpConfig, LoggingConfig};
pub use validation::{validate, ConfigValidationError, ValidationReport};

use anyhow::{Context, Result};
use std::path::Path;

/// Load, substitute env vars, apply defaults and validate a config file.
///
/// Warnings and errors are logged; the caller decides whether errors are
/// fatal.
pub async fn load_and_prepare(path: &Path) -> Result<(AmethystConfig, ValidationReport)> {
    let value = load_config_value(path).await?;

    let value = resolve_env_vars(&value).context("Failed to resolve env vars in config")?;

    let config: AmethystConfig = serde_json::from_value(value)
        .with_context(|| format!("Invalid config at: {}", path.display()))?;
    let config = apply_all_defaults(config);

    let report = validate(&config);
    for warning in &report.warnings {
        tracing::warn!(path = %warning.path, message = %warning.message, "Config warning");
    }
    for error in &report.errors {
        tracing::error!(path = %error.path, message = %error.message, "Config error");
    }

    Ok((config, report))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn prepares_file_with_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = config_file_path(dir.path());
        std::fs::write(&path, "prefixes: ['?']\nmessageLimit: 50\n").unwrap();

        let (config, report) = load_and_prepare(&path).await.unwrap();
        assert_eq!(config.prefixes(), vec!["?"]);
        assert_eq!(config.help_page_size(), 50);
        assert!(!report.is_valid());
        assert!(report.errors.iter().any(|e| e.path == "messageLimit"));
    }
}
