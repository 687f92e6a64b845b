//! Command dispatch engine for Amethyst.
//!
//! Messages are parsed against the configured prefixes, resolved through the
//! [`CommandHolder`], gated by [`Check`]s, bound to declared [`ArgSpec`]s via
//! the [`ConverterRegistry`] and handed to command handlers.

pub mod checks;
pub mod command;
pub mod context;
pub mod converters;
pub mod dispatch;
pub mod help;
pub mod holder;
pub mod lookups;
pub mod module;
pub mod parsing;
pub mod types;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use checks::{
    Check, author_permissions, bot_permissions, guild_only, has_named_roles, has_roles, nsfw_only,
    owner_only, run_checks,
};
pub use command::{Command, CommandBuilder, CommandHandler, HandlerFuture, RunOutcome, generate_usage};
pub use context::{Context, Who};
pub use converters::{Converter, ConverterRegistry, parse_bool};
pub use dispatch::{DispatchOutcome, Host, HostBuilder, HostConfig};
pub use help::render_help;
pub use holder::{CommandHolder, HolderSnapshot, LoadError};
pub use lookups::{find_channel, find_member, find_role};
pub use module::{ModuleSource, ModuleUnit, Plugin, SetupContext, SetupFn, StaticModules};
pub use parsing::{ParsedCommand, match_prefix, skip_tokens, split_command, strip_prefix, tokenize};
pub use types::{ArgSpec, ArgType, Args, InvalidArgument, Value};
