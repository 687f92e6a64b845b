//! Host and dispatcher: turns incoming messages into command runs.

use std::collections::HashSet;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use amethyst_core::{
    BotSettings, ChatClient, IncomingMessage, Lookup, MemorySettings, RosterLookup, SettingsStore,
};
use amethyst_logging::{CommandEvent, EventLogger};
use anyhow::Result;
use futures::FutureExt;
use tokio::sync::Notify;
use tracing::{Instrument, debug, error, info, info_span, warn};
use uuid::Uuid;

use crate::command::RunOutcome;
use crate::context::Context;
use crate::converters::{Converter, ConverterRegistry};
use crate::holder::CommandHolder;
use crate::module::{ModuleSource, SetupContext, StaticModules};
use crate::parsing::ParsedCommand;
use crate::types::ArgType;

/// Most lines of an error chain shown in a diagnostic.
const MAX_TRACE_LINES: usize = 15;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct HostConfig {
    /// Tried in order against every message.
    pub prefixes: Vec<String>,
    pub prompt_timeout: Duration,
    pub help_page_size: usize,
    pub message_limit: usize,
    pub ignore_bots: bool,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            prefixes: vec!["!".to_string()],
            prompt_timeout: Duration::from_secs(15),
            help_page_size: 1900,
            message_limit: amethyst_markdown::MESSAGE_LIMIT,
            ignore_bots: true,
        }
    }
}

/// What became of one incoming message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Filtered before parsing: empty, from a bot, or from a blacklisted user.
    Ignored,
    NotCommand,
    UnknownCommand,
    Ran(RunOutcome),
    /// The handler failed or panicked and a diagnostic was sent.
    Failed,
}

// ---------------------------------------------------------------------------
// Host
// ---------------------------------------------------------------------------

pub struct Host {
    config: HostConfig,
    holder: CommandHolder,
    converters: Arc<ConverterRegistry>,
    client: Arc<dyn ChatClient>,
    lookup: Arc<dyn Lookup>,
    settings: Arc<dyn SettingsStore>,
    configured_owners: HashSet<u64>,
    owners: RwLock<HashSet<u64>>,
    blacklist: RwLock<HashSet<u64>>,
    shutdown: Notify,
    shutdown_requested: AtomicBool,
}

impl Host {
    pub fn builder(client: Arc<dyn ChatClient>) -> HostBuilder {
        HostBuilder::new(client)
    }

    pub fn config(&self) -> &HostConfig {
        &self.config
    }

    pub fn holder(&self) -> &CommandHolder {
        &self.holder
    }

    pub fn converters(&self) -> &ConverterRegistry {
        &self.converters
    }

    pub fn client(&self) -> &dyn ChatClient {
        self.client.as_ref()
    }

    pub fn lookup(&self) -> &dyn Lookup {
        self.lookup.as_ref()
    }

    pub fn settings(&self) -> &dyn SettingsStore {
        self.settings.as_ref()
    }

    pub fn is_owner(&self, user_id: u64) -> bool {
        self.owners.read().unwrap_or_else(PoisonError::into_inner).contains(&user_id)
    }

    pub fn is_blacklisted(&self, user_id: u64) -> bool {
        self.blacklist.read().unwrap_or_else(PoisonError::into_inner).contains(&user_id)
    }

    /// Re-read the persisted settings and merge owners and blacklist.
    pub async fn refresh_settings(&self) -> Result<BotSettings> {
        let settings = BotSettings::load_from(self.settings.as_ref()).await?;
        {
            let mut owners = self.owners.write().unwrap_or_else(PoisonError::into_inner);
            *owners = self.configured_owners.iter().chain(&settings.owners).copied().collect();
        }
        {
            let mut blacklist = self.blacklist.write().unwrap_or_else(PoisonError::into_inner);
            *blacklist = settings.blacklist.iter().copied().collect();
        }
        Ok(settings)
    }

    /// Parse `msg` into a context, or `None` if it is not a command.
    pub fn context(self: &Arc<Self>, msg: IncomingMessage) -> Option<Context> {
        let parsed = ParsedCommand::parse(&msg.content, &self.config.prefixes)?;
        Some(Context::new(msg, parsed, self.clone()))
    }

    /// Load configured modules, then persisted ones.
    ///
    /// A persisted module that fails to load is dropped from the settings.
    /// Failures are logged and never abort start-up. Returns the loaded
    /// module identifiers.
    pub async fn autoload(&self, configured: &[String]) -> Vec<String> {
        let mut settings = match self.refresh_settings().await {
            Ok(settings) => settings,
            Err(err) => {
                warn!("[Modules] Could not read persisted settings: {err:#}");
                BotSettings::default()
            }
        };

        for id in configured {
            if self.holder.is_loaded(id).await {
                continue;
            }
            if let Err(err) = self.holder.load_module(id).await {
                warn!(module = %id, "[Modules] Module `{id}` blew up: {err}");
            }
        }

        let mut dropped = false;
        for id in settings.modules.clone() {
            if self.holder.is_loaded(&id).await {
                continue;
            }
            if let Err(err) = self.holder.load_module(&id).await {
                warn!(module = %id, "[Modules] Module `{id}` blew up: {err}");
                dropped |= settings.forget_module(&id);
            }
        }
        if dropped {
            if let Err(err) = settings.save_to(self.settings.as_ref()).await {
                warn!("[Modules] Could not persist module list: {err:#}");
            }
        }

        let loaded = self.holder.all_modules().await;
        info!(modules = ?loaded, "[Modules] Autoload finished");
        loaded
    }

    /// Handle one incoming message to completion.
    pub async fn on_message(self: &Arc<Self>, msg: IncomingMessage) -> DispatchOutcome {
        if msg.content.trim().is_empty() {
            return DispatchOutcome::Ignored;
        }
        if msg.author.bot && self.config.ignore_bots {
            return DispatchOutcome::Ignored;
        }
        let author = msg.author.id;
        if self.is_blacklisted(author) && !self.is_owner(author) {
            debug!(author, "[Dispatch] Ignoring blacklisted user");
            return DispatchOutcome::Ignored;
        }

        let Some(mut ctx) = self.context(msg) else {
            return DispatchOutcome::NotCommand;
        };

        let invocation = Uuid::new_v4().to_string();
        let span = info_span!(
            "command",
            cmd = %ctx.cmd,
            author = ctx.msg.author.id,
            channel = ctx.msg.channel.id,
            invocation = %invocation,
        );
        self.dispatch(&mut ctx, &invocation).instrument(span).await
    }

    async fn dispatch(&self, ctx: &mut Context, invocation: &str) -> DispatchOutcome {
        let top = ctx.cmd.clone();
        let result = AssertUnwindSafe(self.holder.run_command(ctx)).catch_unwind().await;

        let (kind, lines) = match result {
            Ok(Ok(None)) => {
                debug!("[Dispatch] Unknown command `{top}`");
                return DispatchOutcome::UnknownCommand;
            }
            Ok(Ok(Some(outcome))) => {
                EventLogger::log_event(
                    invocation,
                    CommandEvent::Invoked {
                        command: ctx.cmd.clone(),
                        author_id: ctx.msg.author.id,
                        channel_id: ctx.msg.channel.id,
                        content: ctx.msg.content.clone(),
                    },
                );
                if outcome == RunOutcome::BindingFailed {
                    EventLogger::log_event(invocation, CommandEvent::BindingFailed { command: ctx.cmd.clone() });
                }
                return DispatchOutcome::Ran(outcome);
            }
            Ok(Err(err)) => {
                error!("[Dispatch] Command `{}` failed: {err:#}", ctx.cmd);
                ("Error", err.chain().map(|cause| cause.to_string()).collect::<Vec<_>>())
            }
            Err(panic) => {
                let message = panic_message(panic.as_ref());
                error!("[Dispatch] Command `{}` panicked: {message}", ctx.cmd);
                ("Panic", vec![message])
            }
        };

        EventLogger::log_event(
            invocation,
            CommandEvent::Failed { command: ctx.cmd.clone(), error_msg: lines.join("\n") },
        );

        let text = diagnostic(kind, &ctx.cmd, &lines, self.config.message_limit);
        if let Err(err) = ctx.send(text).await {
            warn!("[Dispatch] Could not report failure of `{}`: {err:#}", ctx.cmd);
        }
        DispatchOutcome::Failed
    }

    /// Ask the hosting process to stop.
    pub fn request_shutdown(&self) {
        info!("[Host] Shutdown requested");
        self.shutdown_requested.store(true, Ordering::SeqCst);
        self.shutdown.notify_one();
    }

    pub fn shutdown_requested(&self) -> bool {
        self.shutdown_requested.load(Ordering::SeqCst)
    }

    /// Resolves once [`request_shutdown`](Self::request_shutdown) has been called.
    pub async fn wait_for_shutdown(&self) {
        if self.shutdown_requested() {
            return;
        }
        self.shutdown.notified().await;
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Failure report for the invoking channel, or a short fallback when the
/// report would not fit in one message.
fn diagnostic(kind: &str, cmd: &str, causes: &[String], limit: usize) -> String {
    let trace: Vec<&str> = causes.iter().flat_map(|c| c.lines()).take(MAX_TRACE_LINES).collect();
    let text = format!("`{kind}` in command `{cmd}`:\n```py\n{}\n```", trace.join("\n"));
    if text.chars().count() > limit {
        return format!("Something broke while running `{cmd}`.");
    }
    text
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

pub struct HostBuilder {
    client: Arc<dyn ChatClient>,
    config: HostConfig,
    lookup: Arc<dyn Lookup>,
    settings: Arc<dyn SettingsStore>,
    source: Arc<dyn ModuleSource>,
    owners: HashSet<u64>,
    blacklist: HashSet<u64>,
    converters: ConverterRegistry,
}

impl HostBuilder {
    fn new(client: Arc<dyn ChatClient>) -> Self {
        Self {
            client,
            config: HostConfig::default(),
            lookup: Arc::new(RosterLookup::new()),
            settings: Arc::new(MemorySettings::new()),
            source: Arc::new(StaticModules::new()),
            owners: HashSet::new(),
            blacklist: HashSet::new(),
            converters: ConverterRegistry::new(),
        }
    }

    pub fn config(mut self, config: HostConfig) -> Self {
        self.config = config;
        self
    }

    pub fn lookup(mut self, lookup: Arc<dyn Lookup>) -> Self {
        self.lookup = lookup;
        self
    }

    pub fn settings(mut self, settings: Arc<dyn SettingsStore>) -> Self {
        self.settings = settings;
        self
    }

    pub fn source(mut self, source: Arc<dyn ModuleSource>) -> Self {
        self.source = source;
        self
    }

    pub fn owners(mut self, owners: impl IntoIterator<Item = u64>) -> Self {
        self.owners.extend(owners);
        self
    }

    pub fn blacklist(mut self, users: impl IntoIterator<Item = u64>) -> Self {
        self.blacklist.extend(users);
        self
    }

    /// Install or replace the converter for one argument type.
    pub fn converter(mut self, ty: ArgType, converter: Arc<dyn Converter>) -> Self {
        self.converters.register(ty, converter);
        self
    }

    pub fn build(self) -> Arc<Host> {
        let converters = Arc::new(self.converters);
        let setup = SetupContext { settings: self.settings.clone(), config: self.config.clone() };
        let holder = CommandHolder::new(self.source, setup, converters.clone());
        Arc::new(Host {
            config: self.config,
            holder,
            converters,
            client: self.client,
            lookup: self.lookup,
            settings: self.settings,
            owners: RwLock::new(self.owners.clone()),
            configured_owners: self.owners,
            blacklist: RwLock::new(self.blacklist),
            shutdown: Notify::new(),
            shutdown_requested: AtomicBool::new(false),
        })
    }
}
