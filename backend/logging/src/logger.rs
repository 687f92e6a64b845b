//! Subscriber initialisation.
//!
//! Console output goes to stderr so a console host keeps stdout for chat
//! traffic. A daily rolling NDJSON file is added when a directory is given.

use std::path::Path;

use anyhow::{Context, Result};
use tracing_subscriber::{EnvFilter, Layer, fmt, layer::SubscriberExt, util::SubscriberInitExt};
use tracing_appender::rolling::{RollingFileAppender, Rotation};

/// Install the global subscriber.
///
/// `RUST_LOG` wins over `level`. `json` switches the console layer to JSON.
/// Calling this twice is harmless; the second call is ignored.
pub fn init_logger(log_dir: Option<&Path>, level: &str, json: bool) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .with_context(|| format!("Invalid log level `{level}`"))?;

    let console_layer = if json {
        fmt::layer().json().with_writer(std::io::stderr).boxed()
    } else {
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false)
            .with_ansi(true)
            .boxed()
    };

    let file_layer = match log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create log directory {}", dir.display()))?;
            // Writes `amethyst.log.YYYY-MM-DD`
            let appender = RollingFileAppender::new(Rotation::DAILY, dir, "amethyst.log");
            Some(fmt::layer().json().with_writer(appender).with_ansi(false))
        }
        None => None,
    };

    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .try_init();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_creates_log_directory() {
        let dir = tempfile::tempdir().unwrap();
        let logs = dir.path().join("logs");
        init_logger(Some(&logs), "debug", false).unwrap();
        assert!(logs.is_dir());
    }
}
