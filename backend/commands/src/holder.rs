//! Process-wide command holder: flat name/alias maps plus module records.
//!
//! Every mutation runs to completion under one write lock without awaiting,
//! so dispatch never observes a half-applied load, unload or reload.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Weak};

use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::command::{Command, RunOutcome};
use crate::context::Context;
use crate::converters::ConverterRegistry;
use crate::module::{ModuleSource, Plugin, SetupContext};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoadError {
    #[error("Module `{0}` is already loaded.")]
    AlreadyLoaded(String),

    #[error("Module `{0}` is not loaded.")]
    NotLoaded(String),

    #[error("Module `{0}` could not be found.")]
    NotFound(String),

    #[error("Module `{0}` does not have a `setup` function.")]
    MissingSetup(String),

    #[error("Setup for module `{module}` failed: {reason}")]
    Setup { module: String, reason: String },

    #[error("Module `{0}` is empty.")]
    Empty(String),

    #[error("Module `{module}` cannot register `{name}`: already registered by `{owner}`.")]
    Collision { module: String, name: String, owner: String },

    #[error("Module `{module}` has an invalid command `{command}`: {reason}")]
    InvalidCommand { module: String, command: String, reason: String },
}

// ---------------------------------------------------------------------------
// Registry state
// ---------------------------------------------------------------------------

struct ModuleRecord {
    plugin: Arc<dyn Plugin>,
    commands: Vec<Arc<Command>>,
    /// Every name and alias this module contributed.
    keys: Vec<String>,
}

#[derive(Default)]
struct Registry {
    commands: HashMap<String, Arc<Command>>,
    aliases: HashMap<String, Arc<Command>>,
    modules: BTreeMap<String, ModuleRecord>,
}

impl Registry {
    fn owner_of(&self, key: &str) -> String {
        self.modules
            .iter()
            .find(|(_, record)| record.keys.iter().any(|k| k == key))
            .map(|(id, _)| id.clone())
            .unwrap_or_default()
    }

    fn attach(&mut self, id: &str, record: ModuleRecord) {
        for cmd in &record.commands {
            self.commands.insert(cmd.name().to_string(), cmd.clone());
            for alias in cmd.aliases() {
                self.aliases.insert(alias.clone(), cmd.clone());
            }
        }
        self.modules.insert(id.to_string(), record);
    }

    fn detach(&mut self, id: &str) -> Option<ModuleRecord> {
        let record = self.modules.remove(id)?;
        for cmd in &record.commands {
            self.commands.remove(cmd.name());
            for alias in cmd.aliases() {
                self.aliases.remove(alias);
            }
        }
        Some(record)
    }
}

/// Comparable view of the holder's registrations.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HolderSnapshot {
    pub commands: Vec<String>,
    /// `(alias, command name)` pairs.
    pub aliases: Vec<(String, String)>,
    /// `(module id, contributed keys)` pairs.
    pub modules: Vec<(String, Vec<String>)>,
}

// ---------------------------------------------------------------------------
// Holder
// ---------------------------------------------------------------------------

/// Shared handle to the command registry.
#[derive(Clone)]
pub struct CommandHolder {
    registry: Arc<RwLock<Registry>>,
    source: Arc<dyn ModuleSource>,
    setup: SetupContext,
    converters: Arc<ConverterRegistry>,
}

impl CommandHolder {
    pub fn new(
        source: Arc<dyn ModuleSource>,
        setup: SetupContext,
        converters: Arc<ConverterRegistry>,
    ) -> Self {
        Self { registry: Arc::default(), source, setup, converters }
    }

    pub async fn load_module(&self, id: &str) -> Result<(), LoadError> {
        let mut registry = self.registry.write().await;
        if registry.modules.contains_key(id) {
            return Err(LoadError::AlreadyLoaded(id.to_string()));
        }
        let record = self.stage(&registry, id, None)?;
        let count = record.commands.len();
        registry.attach(id, record);
        info!(module = id, commands = count, "[Modules] Loaded");
        Ok(())
    }

    pub async fn unload_module(&self, id: &str) -> Result<(), LoadError> {
        let record = {
            let mut registry = self.registry.write().await;
            registry.detach(id).ok_or_else(|| LoadError::NotLoaded(id.to_string()))?
        };
        record.plugin.on_unload();
        self.source.evict(id);
        info!(module = id, "[Modules] Unloaded");
        Ok(())
    }

    /// Swap a module for a fresh import of itself, or load it if absent.
    ///
    /// The fresh import is staged while the previous registration is still
    /// attached. If staging fails, or panics, nothing has changed.
    pub async fn reload_module(&self, id: &str) -> Result<(), LoadError> {
        let mut registry = self.registry.write().await;
        if !registry.modules.contains_key(id) {
            let record = self.stage(&registry, id, None)?;
            registry.attach(id, record);
            info!(module = id, "[Modules] Loaded (nothing to reload)");
            return Ok(());
        }

        self.source.evict(id);
        let record = self.stage(&registry, id, Some(id))?;
        let old = registry.detach(id);
        registry.attach(id, record);
        drop(registry);

        if let Some(old) = old {
            old.plugin.on_unload();
        }
        info!(module = id, "[Modules] Reloaded");
        Ok(())
    }

    /// Build a module's registration without touching the registry.
    ///
    /// Keys held by `replacing` do not count as collisions.
    fn stage(&self, registry: &Registry, id: &str, replacing: Option<&str>) -> Result<ModuleRecord, LoadError> {
        let unit = self.source.import(id).ok_or_else(|| LoadError::NotFound(id.to_string()))?;
        let Some(setup) = unit.setup else {
            self.source.evict(id);
            return Err(LoadError::MissingSetup(id.to_string()));
        };
        let plugin = setup(&self.setup).map_err(|err| {
            self.source.evict(id);
            LoadError::Setup { module: id.to_string(), reason: format!("{err:#}") }
        })?;

        let abandon = |err: LoadError| {
            plugin.on_unload();
            self.source.evict(id);
            err
        };

        let builders = plugin.clone().commands();
        if builders.is_empty() {
            return Err(abandon(LoadError::Empty(id.to_string())));
        }

        for builder in &builders {
            if let Err(reason) = builder.validate() {
                return Err(abandon(LoadError::InvalidCommand {
                    module: id.to_string(),
                    command: builder.name().to_string(),
                    reason,
                }));
            }
        }

        let commands: Vec<Arc<Command>> = builders
            .into_iter()
            .map(|b| b.build(Weak::new(), id, &self.converters))
            .collect();

        let replaced: &[String] = replacing
            .and_then(|r| registry.modules.get(r))
            .map_or(&[], |record| record.keys.as_slice());

        let mut keys: Vec<String> = Vec::new();
        for cmd in &commands {
            for key in cmd.keys() {
                let owner = if keys.iter().any(|k| k == key) {
                    Some(id.to_string())
                } else if replaced.iter().any(|k| k == key) {
                    None
                } else if registry.commands.contains_key(key) || registry.aliases.contains_key(key) {
                    Some(registry.owner_of(key))
                } else {
                    None
                };
                if let Some(owner) = owner {
                    return Err(abandon(LoadError::Collision {
                        module: id.to_string(),
                        name: key.to_string(),
                        owner,
                    }));
                }
                keys.push(key.to_string());
            }
        }

        debug!(module = id, ?keys, "[Modules] Staged registration");
        Ok(ModuleRecord { plugin, commands, keys })
    }

    /// Look a command up by name or alias.
    pub async fn get_command(&self, key: &str) -> Option<Arc<Command>> {
        let registry = self.registry.read().await;
        registry.aliases.get(key).or_else(|| registry.commands.get(key)).cloned()
    }

    /// Run the command named by `ctx.cmd`. `None` if there is no such command.
    pub async fn run_command(&self, ctx: &mut Context) -> anyhow::Result<Option<RunOutcome>> {
        let Some(cmd) = self.get_command(&ctx.cmd).await else {
            return Ok(None);
        };
        cmd.run(ctx).await.map(Some)
    }

    pub async fn is_loaded(&self, id: &str) -> bool {
        self.registry.read().await.modules.contains_key(id)
    }

    pub async fn all_commands(&self) -> Vec<String> {
        let mut names: Vec<String> = self.registry.read().await.commands.keys().cloned().collect();
        names.sort();
        names
    }

    pub async fn all_aliases(&self) -> Vec<String> {
        let mut names: Vec<String> = self.registry.read().await.aliases.keys().cloned().collect();
        names.sort();
        names
    }

    pub async fn all_modules(&self) -> Vec<String> {
        self.registry.read().await.modules.keys().cloned().collect()
    }

    /// Top-level commands grouped by plugin name, both sorted.
    pub async fn commands_by_plugin(&self) -> Vec<(String, Vec<Arc<Command>>)> {
        let registry = self.registry.read().await;
        let mut grouped: BTreeMap<String, Vec<Arc<Command>>> = BTreeMap::new();
        for record in registry.modules.values() {
            grouped
                .entry(record.plugin.name().to_string())
                .or_default()
                .extend(record.commands.iter().cloned());
        }
        grouped
            .into_iter()
            .map(|(plugin, mut commands)| {
                commands.sort_by(|a, b| a.name().cmp(b.name()));
                (plugin, commands)
            })
            .collect()
    }

    pub async fn snapshot(&self) -> HolderSnapshot {
        let registry = self.registry.read().await;
        let mut commands: Vec<String> = registry.commands.keys().cloned().collect();
        commands.sort();
        let mut aliases: Vec<(String, String)> = registry
            .aliases
            .iter()
            .map(|(alias, cmd)| (alias.clone(), cmd.name().to_string()))
            .collect();
        aliases.sort();
        let modules = registry
            .modules
            .iter()
            .map(|(id, record)| {
                let mut keys = record.keys.clone();
                keys.sort();
                (id.clone(), keys)
            })
            .collect();
        HolderSnapshot { commands, aliases, modules }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use std::panic::AssertUnwindSafe;

    use anyhow::bail;
    use futures::FutureExt;

    use super::*;
    use crate::command::{CommandBuilder, HandlerFuture};
    use crate::module::StaticModules;
    use crate::testing::{TestHost, message};
    use crate::types::Args;

    static UNLOADS: AtomicUsize = AtomicUsize::new(0);

    fn ok(_ctx: &Context, _args: Args) -> HandlerFuture<'_> {
        Box::pin(async { Ok(()) })
    }

    struct Fixed {
        name: &'static str,
        commands: fn() -> Vec<CommandBuilder>,
    }

    impl Plugin for Fixed {
        fn name(&self) -> &str {
            self.name
        }

        fn commands(self: Arc<Self>) -> Vec<CommandBuilder> {
            (self.commands)()
        }

        fn on_unload(&self) {
            UNLOADS.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn fixed(name: &'static str, commands: fn() -> Vec<CommandBuilder>) -> anyhow::Result<Arc<dyn Plugin>> {
        Ok(Arc::new(Fixed { name, commands }))
    }

    fn music(_: &SetupContext) -> anyhow::Result<Arc<dyn Plugin>> {
        fixed("Music", || {
            vec![
                CommandBuilder::command("play").alias("p").handler(ok),
                CommandBuilder::group("queue")
                    .alias("q")
                    .subcommand(CommandBuilder::command("clear").handler(ok)),
            ]
        })
    }

    fn clashing(_: &SetupContext) -> anyhow::Result<Arc<dyn Plugin>> {
        fixed("Clash", || {
            vec![
                CommandBuilder::command("stop").handler(ok),
                CommandBuilder::command("shuffle").alias("p").handler(ok),
            ]
        })
    }

    fn self_clashing(_: &SetupContext) -> anyhow::Result<Arc<dyn Plugin>> {
        fixed("Twice", || {
            vec![
                CommandBuilder::command("dup").handler(ok),
                CommandBuilder::command("other").alias("dup").handler(ok),
            ]
        })
    }

    fn empty(_: &SetupContext) -> anyhow::Result<Arc<dyn Plugin>> {
        fixed("Empty", Vec::new)
    }

    fn broken(_: &SetupContext) -> anyhow::Result<Arc<dyn Plugin>> {
        bail!("no database")
    }

    fn invalid(_: &SetupContext) -> anyhow::Result<Arc<dyn Plugin>> {
        fixed("Invalid", || vec![CommandBuilder::command("nohandler")])
    }

    static FLAKY_IMPORTS: AtomicUsize = AtomicUsize::new(0);
    static GROWING_IMPORTS: AtomicUsize = AtomicUsize::new(0);
    static PANICKY_IMPORTS: AtomicUsize = AtomicUsize::new(0);

    /// Works once, then fails every later setup.
    fn flaky(_: &SetupContext) -> anyhow::Result<Arc<dyn Plugin>> {
        if FLAKY_IMPORTS.fetch_add(1, Ordering::SeqCst) > 0 {
            bail!("config went missing");
        }
        fixed("Flaky", || vec![CommandBuilder::command("roll").alias("r").handler(ok)])
    }

    /// Later imports grab `play`, which `modules.music` owns.
    fn growing(_: &SetupContext) -> anyhow::Result<Arc<dyn Plugin>> {
        if GROWING_IMPORTS.fetch_add(1, Ordering::SeqCst) == 0 {
            fixed("Growing", || vec![CommandBuilder::command("stop").handler(ok)])
        } else {
            fixed("Growing", || {
                vec![CommandBuilder::command("stop").handler(ok), CommandBuilder::command("play").handler(ok)]
            })
        }
    }

    fn panicky(_: &SetupContext) -> anyhow::Result<Arc<dyn Plugin>> {
        if PANICKY_IMPORTS.fetch_add(1, Ordering::SeqCst) > 0 {
            panic!("setup blew up");
        }
        fixed("Panicky", || vec![CommandBuilder::command("boom").handler(ok)])
    }

    fn source() -> Arc<StaticModules> {
        Arc::new(
            StaticModules::new()
                .with("modules.music", music)
                .with("modules.clash", clashing)
                .with("modules.twice", self_clashing)
                .with("modules.empty", empty)
                .with("modules.broken", broken)
                .with("modules.invalid", invalid)
                .with("modules.flaky", flaky)
                .with("modules.growing", growing)
                .with("modules.panicky", panicky)
                .with_unit_without_setup("modules.bare"),
        )
    }

    #[tokio::test]
    async fn test_load_registers_names_and_aliases() {
        let source = source();
        let host = TestHost::new().source(source.clone()).build();
        let holder = host.holder();

        holder.load_module("modules.music").await.unwrap();
        assert_eq!(holder.all_commands().await, vec!["play", "queue"]);
        assert_eq!(holder.all_aliases().await, vec!["p", "q"]);
        assert_eq!(holder.all_modules().await, vec!["modules.music"]);
        assert_eq!(holder.get_command("q").await.unwrap().name(), "queue");
        assert!(holder.get_command("clear").await.is_none());
        assert!(source.is_cached("modules.music"));

        let err = holder.load_module("modules.music").await.unwrap_err();
        assert_eq!(err, LoadError::AlreadyLoaded("modules.music".into()));
    }

    #[tokio::test]
    async fn test_failed_loads_leave_registry_unchanged() {
        let source = source();
        let host = TestHost::new().source(source.clone()).build();
        let holder = host.holder();
        holder.load_module("modules.music").await.unwrap();
        let before = holder.snapshot().await;

        let cases = [
            ("modules.clash", "Collision"),
            ("modules.twice", "Collision"),
            ("modules.empty", "Empty"),
            ("modules.broken", "Setup"),
            ("modules.invalid", "InvalidCommand"),
            ("modules.bare", "MissingSetup"),
            ("modules.nowhere", "NotFound"),
        ];
        for (id, kind) in cases {
            let err = holder.load_module(id).await.unwrap_err();
            assert!(format!("{err:?}").starts_with(kind), "{id}: {err:?}");
            assert_eq!(holder.snapshot().await, before, "{id}");
            assert!(!source.is_cached(id), "{id}");
        }
    }

    #[tokio::test]
    async fn test_collision_names_the_owner() {
        let host = TestHost::new().source(source()).build();
        let holder = host.holder();
        holder.load_module("modules.music").await.unwrap();

        let err = holder.load_module("modules.clash").await.unwrap_err();
        assert_eq!(
            err,
            LoadError::Collision {
                module: "modules.clash".into(),
                name: "p".into(),
                owner: "modules.music".into(),
            }
        );
        assert!(holder.get_command("stop").await.is_none());
    }

    #[tokio::test]
    async fn test_unload_restores_snapshot() {
        let source = source();
        let host = TestHost::new().source(source.clone()).build();
        let holder = host.holder();
        let before = holder.snapshot().await;

        holder.load_module("modules.music").await.unwrap();
        assert_ne!(holder.snapshot().await, before);
        holder.unload_module("modules.music").await.unwrap();
        assert_eq!(holder.snapshot().await, before);
        assert!(!source.is_cached("modules.music"));

        let err = holder.unload_module("modules.music").await.unwrap_err();
        assert_eq!(err, LoadError::NotLoaded("modules.music".into()));
    }

    #[tokio::test]
    async fn test_reload_swaps_instances() {
        let host = TestHost::new().source(source()).build();
        let holder = host.holder();

        holder.reload_module("modules.music").await.unwrap();
        let first = holder.get_command("play").await.unwrap();
        let unloads = UNLOADS.load(Ordering::SeqCst);

        holder.reload_module("modules.music").await.unwrap();
        let second = holder.get_command("play").await.unwrap();
        assert!(!Arc::ptr_eq(&first, &second));
        assert!(UNLOADS.load(Ordering::SeqCst) > unloads);
        assert_eq!(holder.all_modules().await, vec!["modules.music"]);
    }

    #[tokio::test]
    async fn test_failed_reload_keeps_old_registration() {
        let host = TestHost::new().source(source()).build();
        let holder = host.holder();
        holder.load_module("modules.music").await.unwrap();
        holder.load_module("modules.flaky").await.unwrap();
        holder.load_module("modules.growing").await.unwrap();
        let before = holder.snapshot().await;
        let roll = holder.get_command("r").await.unwrap();

        let err = holder.reload_module("modules.flaky").await.unwrap_err();
        assert!(matches!(err, LoadError::Setup { ref module, .. } if module == "modules.flaky"), "{err:?}");
        assert_eq!(holder.snapshot().await, before);
        assert!(Arc::ptr_eq(&holder.get_command("r").await.unwrap(), &roll));

        let err = holder.reload_module("modules.growing").await.unwrap_err();
        assert_eq!(
            err,
            LoadError::Collision {
                module: "modules.growing".into(),
                name: "play".into(),
                owner: "modules.music".into(),
            }
        );
        assert_eq!(holder.snapshot().await, before);
        assert_eq!(holder.get_command("play").await.unwrap().module(), "modules.music");
        assert_eq!(holder.get_command("stop").await.unwrap().module(), "modules.growing");
    }

    #[tokio::test]
    async fn test_panicking_reload_keeps_old_registration() {
        let host = TestHost::new().source(source()).build();
        let holder = host.holder();
        holder.load_module("modules.panicky").await.unwrap();
        let before = holder.snapshot().await;

        let result = AssertUnwindSafe(holder.reload_module("modules.panicky")).catch_unwind().await;
        assert!(result.is_err());
        assert_eq!(holder.snapshot().await, before);
        assert!(holder.get_command("boom").await.is_some());
        assert!(holder.is_loaded("modules.panicky").await);
    }

    #[tokio::test]
    async fn test_run_command_resolves_by_token() {
        let host = TestHost::new().source(source()).build();
        let holder = host.holder();
        holder.load_module("modules.music").await.unwrap();

        let mut ctx = host.context(message("!p something")).unwrap();
        assert_eq!(holder.run_command(&mut ctx).await.unwrap(), Some(RunOutcome::Completed));

        let mut ctx = host.context(message("!nothing")).unwrap();
        assert_eq!(holder.run_command(&mut ctx).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_commands_grouped_by_plugin() {
        let host = TestHost::new().source(source()).build();
        let holder = host.holder();
        holder.load_module("modules.music").await.unwrap();

        let grouped = holder.commands_by_plugin().await;
        assert_eq!(grouped.len(), 1);
        assert_eq!(grouped[0].0, "Music");
        let names: Vec<&str> = grouped[0].1.iter().map(|c| c.name()).collect();
        assert_eq!(names, vec!["play", "queue"]);
    }
}
