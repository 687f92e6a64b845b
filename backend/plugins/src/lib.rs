//! Built-in Amethyst modules.

pub mod basic;
pub mod core_module;

use amethyst_commands::StaticModules;

pub use basic::BasicPlugin;
pub use core_module::CorePlugin;

pub const CORE_MODULE: &str = "modules.core";
pub const BASIC_MODULE: &str = "modules.basic";

/// Catalogue of every module compiled into the binary.
pub fn builtin_modules() -> StaticModules {
    StaticModules::new()
        .with(CORE_MODULE, core_module::setup)
        .with(BASIC_MODULE, basic::setup)
}
