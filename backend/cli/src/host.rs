//! The `run` command: wires config, settings, modules and the console
//! gateway into one host and feeds it stdin.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Result};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;

use amethyst_commands::{Host, HostConfig};
use amethyst_config::{load_and_prepare, AmethystConfig};
use amethyst_core::{JsonFileStore, RosterLookup, User};
use amethyst_logging::init_logger;
use amethyst_plugins::builtin_modules;

use crate::console::ConsoleClient;

/// Translate the loaded config into dispatcher settings.
pub fn host_config(config: &AmethystConfig) -> HostConfig {
    HostConfig {
        prefixes: config.prefixes(),
        prompt_timeout: Duration::from_secs(config.prompt_timeout_secs()),
        help_page_size: config.help_page_size(),
        message_limit: config.message_limit(),
        ignore_bots: config.ignore_bots(),
    }
}

/// Relative settings paths live next to the config file.
fn settings_path(config: &AmethystConfig, config_path: &Path) -> PathBuf {
    let path = PathBuf::from(config.settings_path());
    if path.is_absolute() {
        return path;
    }
    config_path.parent().map_or(path.clone(), |dir| dir.join(&path))
}

pub async fn run(config_path: &Path) -> Result<()> {
    let (config, report) = load_and_prepare(config_path).await?;
    init_logger(config.log_dir().map(Path::new), config.log_level(), config.log_json())?;
    if !report.is_valid() {
        bail!("Config has {} error(s); run `amethyst check-config` for details", report.errors.len());
    }

    let user = User::new(config.console_user_id(), config.console_user_name(), "0000");
    let client = Arc::new(ConsoleClient::new(user.clone()));
    let lookup = RosterLookup::new().with_member(user.clone()).with_channel(client.channel());

    // The person at the terminal runs the bot.
    let host = Host::builder(client.clone())
        .config(host_config(&config))
        .lookup(Arc::new(lookup))
        .settings(Arc::new(JsonFileStore::new(settings_path(&config, config_path))))
        .source(Arc::new(builtin_modules()))
        .owners(config.owners().into_iter().chain([user.id]))
        .build();

    let loaded = host.autoload(&config.modules()).await;
    info!(modules = ?loaded, prefixes = ?config.prefixes(), "[Host] Ready");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            _ = host.wait_for_shutdown() => break,
            _ = tokio::signal::ctrl_c() => {
                info!("[Host] Interrupted");
                break;
            }
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                let Some(line) = client.offer_reply(line) else { continue };
                spawn_dispatch(&host, client.message(&line));
            }
        }
    }

    info!("[Host] Shutting down");
    Ok(())
}

/// Dispatch concurrently so a handler waiting on a prompt does not block input.
fn spawn_dispatch(host: &Arc<Host>, msg: amethyst_core::IncomingMessage) {
    let host = host.clone();
    tokio::spawn(async move {
        let outcome = host.on_message(msg).await;
        tracing::debug!(?outcome, "[Host] Dispatch finished");
    });
}
