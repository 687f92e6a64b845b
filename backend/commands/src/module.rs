//! Plugin units and the sources they are imported from.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, PoisonError};

use amethyst_core::SettingsStore;
use anyhow::Result;
use tracing::debug;

use crate::command::CommandBuilder;
use crate::dispatch::HostConfig;

/// A loaded plugin instance contributing top-level commands.
pub trait Plugin: Send + Sync {
    /// Display name, used to group help output.
    fn name(&self) -> &str;

    /// Top-level commands. Subcommands travel inside their groups.
    fn commands(self: Arc<Self>) -> Vec<CommandBuilder>;

    /// Called once the plugin's commands are unregistered.
    fn on_unload(&self) {}
}

/// What a setup entry point gets to build its plugin from.
#[derive(Clone)]
pub struct SetupContext {
    pub settings: Arc<dyn SettingsStore>,
    pub config: HostConfig,
}

/// Entry point every module must expose.
pub type SetupFn = fn(&SetupContext) -> Result<Arc<dyn Plugin>>;

/// An imported module.
#[derive(Clone)]
pub struct ModuleUnit {
    pub id: String,
    /// `None` when the unit exists but exposes no entry point.
    pub setup: Option<SetupFn>,
}

/// Where module units come from.
pub trait ModuleSource: Send + Sync {
    /// Import `id`, or `None` if no such module exists.
    fn import(&self, id: &str) -> Option<ModuleUnit>;

    /// Forget any cached import so the next one starts fresh.
    fn evict(&self, id: &str);
}

/// A compiled-in catalogue of modules.
#[derive(Default)]
pub struct StaticModules {
    catalog: BTreeMap<String, Option<SetupFn>>,
    imported: Mutex<HashMap<String, ModuleUnit>>,
}

impl StaticModules {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, id: impl Into<String>, setup: SetupFn) -> Self {
        self.catalog.insert(id.into(), Some(setup));
        self
    }

    /// Register a unit that has no setup entry point.
    pub fn with_unit_without_setup(mut self, id: impl Into<String>) -> Self {
        self.catalog.insert(id.into(), None);
        self
    }

    /// Every module identifier in the catalogue, sorted.
    pub fn available(&self) -> Vec<String> {
        self.catalog.keys().cloned().collect()
    }

    pub fn is_cached(&self, id: &str) -> bool {
        self.imported.lock().unwrap_or_else(PoisonError::into_inner).contains_key(id)
    }
}

impl ModuleSource for StaticModules {
    fn import(&self, id: &str) -> Option<ModuleUnit> {
        let setup = *self.catalog.get(id)?;
        let mut imported = self.imported.lock().unwrap_or_else(PoisonError::into_inner);
        let unit = imported
            .entry(id.to_string())
            .or_insert_with(|| {
                debug!(module = id, "[Modules] Importing");
                ModuleUnit { id: id.to_string(), setup }
            })
            .clone();
        Some(unit)
    }

    fn evict(&self, id: &str) {
        self.imported.lock().unwrap_or_else(PoisonError::into_inner).remove(id);
    }
}
