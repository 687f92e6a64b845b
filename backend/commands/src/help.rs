//! Help text generated from the holder's registry.

use std::sync::Arc;

use amethyst_markdown::Paginator;

use crate::command::Command;
use crate::holder::CommandHolder;

const HELP_LANG: &str = "md";

/// Render help for `path`, or the full listing when `path` is empty.
///
/// Returns `None` when the path names no command, or passes through a
/// hidden one while `show_hidden` is off.
pub async fn render_help(
    holder: &CommandHolder,
    path: &[String],
    show_hidden: bool,
    page_size: usize,
    prefix: &str,
) -> Option<Vec<String>> {
    let mut pages = Paginator::new(HELP_LANG, page_size);

    let Some((first, rest)) = path.split_first() else {
        for (plugin, commands) in holder.commands_by_plugin().await {
            let visible: Vec<&Arc<Command>> =
                commands.iter().filter(|c| show_hidden || !c.is_hidden()).collect();
            if visible.is_empty() {
                continue;
            }
            pages.add_section(&format!("{plugin}:\n{}", listing(&visible)));
        }
        pages.add_section(&format!("Type {prefix}help <command> for more info on a command."));
        return Some(pages.pages());
    };

    let mut cmd = holder.get_command(first).await?;
    for key in rest {
        if cmd.is_hidden() && !show_hidden {
            return None;
        }
        let child = cmd.child(key)?.clone();
        cmd = child;
    }
    if cmd.is_hidden() && !show_hidden {
        return None;
    }

    pages.add_section(&detail(&cmd, prefix));
    if cmd.is_group() {
        let children = cmd.children();
        let visible: Vec<&Arc<Command>> =
            children.iter().filter(|c| show_hidden || !c.is_hidden()).collect();
        if !visible.is_empty() {
            pages.add_section(&format!("Subcommands:\n{}", listing(&visible)));
        }
    }
    Some(pages.pages())
}

/// Usage line, description and aliases of one command.
fn detail(cmd: &Command, prefix: &str) -> String {
    let mut lines = vec![format!("{prefix}{} {}", cmd.qualified_name(), cmd.usage()).trim_end().to_string()];
    if !cmd.description().is_empty() {
        lines.push(String::new());
        lines.push(cmd.description().to_string());
    }
    if !cmd.aliases().is_empty() {
        lines.push(String::new());
        lines.push(format!("Aliases: {}", cmd.aliases().join(", ")));
    }
    lines.join("\n")
}

/// Indented, name-aligned lines with short descriptions.
fn listing(commands: &[&Arc<Command>]) -> String {
    let width = commands.iter().map(|c| c.name().chars().count()).max().unwrap_or(0);
    commands
        .iter()
        .map(|c| format!("  {:<width$}  {}", c.name(), c.short_description()).trim_end().to_string())
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checks::owner_only;
    use crate::command::{CommandBuilder, HandlerFuture};
    use crate::context::Context;
    use crate::module::{Plugin, SetupContext, StaticModules};
    use crate::testing::TestHost;
    use crate::types::{ArgSpec, ArgType, Args};

    fn ok(_ctx: &Context, _args: Args) -> HandlerFuture<'_> {
        Box::pin(async { Ok(()) })
    }

    struct Admin;

    impl Plugin for Admin {
        fn name(&self) -> &str {
            "Admin"
        }

        fn commands(self: Arc<Self>) -> Vec<CommandBuilder> {
            vec![
                CommandBuilder::command("kick")
                    .alias("boot")
                    .description("Kick a member.\nThey can rejoin with an invite.")
                    .arg(ArgSpec::new("who", ArgType::User))
                    .handler(ok),
                CommandBuilder::command("restart").check(owner_only()).handler(ok),
                CommandBuilder::group("config")
                    .description("Inspect settings.")
                    .handler(ok)
                    .subcommand(
                        CommandBuilder::command("set")
                            .description("Change a setting.")
                            .arg(ArgSpec::new("key", ArgType::String))
                            .arg(ArgSpec::new("value", ArgType::String))
                            .handler(ok),
                    )
                    .subcommand(CommandBuilder::command("wipe").hidden().handler(ok)),
                CommandBuilder::group("module")
                    .check(owner_only())
                    .handler(ok)
                    .subcommand(CommandBuilder::command("load").description("Loads a module.").handler(ok)),
            ]
        }
    }

    struct Fun;

    impl Plugin for Fun {
        fn name(&self) -> &str {
            "Fun"
        }

        fn commands(self: Arc<Self>) -> Vec<CommandBuilder> {
            vec![CommandBuilder::command("roll").description("Roll a die.").handler(ok)]
        }
    }

    fn admin(_: &SetupContext) -> anyhow::Result<Arc<dyn Plugin>> {
        Ok(Arc::new(Admin))
    }

    fn fun(_: &SetupContext) -> anyhow::Result<Arc<dyn Plugin>> {
        Ok(Arc::new(Fun))
    }

    async fn holder() -> CommandHolder {
        let source = StaticModules::new().with("modules.admin", admin).with("modules.fun", fun);
        let host = TestHost::new().source(Arc::new(source)).build();
        let holder = host.holder().clone();
        holder.load_module("modules.fun").await.unwrap();
        holder.load_module("modules.admin").await.unwrap();
        holder
    }

    fn path(parts: &[&str]) -> Vec<String> {
        parts.iter().map(|p| p.to_string()).collect()
    }

    #[tokio::test]
    async fn test_root_listing_groups_by_plugin() {
        let holder = holder().await;
        let pages = render_help(&holder, &[], false, 1900, "!").await.unwrap();
        assert_eq!(
            pages,
            vec![
                "```md\n\
                 Admin:\n  config  Inspect settings.\n  kick    Kick a member.\n\n\
                 Fun:\n  roll  Roll a die.\n\n\
                 Type !help <command> for more info on a command.\n```"
                    .to_string()
            ]
        );

        let pages = render_help(&holder, &[], true, 1900, "!").await.unwrap();
        assert!(pages[0].contains("  restart"));
    }

    #[tokio::test]
    async fn test_command_detail() {
        let holder = holder().await;
        let pages = render_help(&holder, &path(&["boot"]), false, 1900, "?").await.unwrap();
        assert_eq!(
            pages[0],
            "```md\n?kick <who: user>\n\nKick a member.\nThey can rejoin with an invite.\n\nAliases: boot\n```"
        );
    }

    #[tokio::test]
    async fn test_group_lists_visible_subcommands() {
        let holder = holder().await;
        let pages = render_help(&holder, &path(&["config"]), false, 1900, "!").await.unwrap();
        assert!(pages[0].contains("Subcommands:\n  set  Change a setting."));
        assert!(!pages[0].contains("wipe"));

        let pages = render_help(&holder, &path(&["config", "set"]), false, 1900, "!").await.unwrap();
        assert!(pages[0].starts_with("```md\n!config set <key: string> <value: string>"));
    }

    #[tokio::test]
    async fn test_unknown_and_hidden_paths() {
        let holder = holder().await;
        assert!(render_help(&holder, &path(&["nothing"]), false, 1900, "!").await.is_none());
        assert!(render_help(&holder, &path(&["kick", "deeper"]), false, 1900, "!").await.is_none());
        assert!(render_help(&holder, &path(&["restart"]), false, 1900, "!").await.is_none());
        assert!(render_help(&holder, &path(&["restart"]), true, 1900, "!").await.is_some());
    }

    #[tokio::test]
    async fn test_children_of_hidden_group_stay_hidden() {
        let holder = holder().await;
        assert!(render_help(&holder, &path(&["module"]), false, 1900, "!").await.is_none());
        assert!(render_help(&holder, &path(&["module", "load"]), false, 1900, "!").await.is_none());

        let pages = render_help(&holder, &path(&["module", "load"]), true, 1900, "!").await.unwrap();
        assert_eq!(pages[0], "```md\n!module load\n\nLoads a module.\n```");
    }

    #[tokio::test]
    async fn test_long_listing_paginates_into_fenced_pages() {
        let holder = holder().await;
        let pages = render_help(&holder, &[], true, 60, "!").await.unwrap();
        assert!(pages.len() > 1);
        for page in &pages {
            assert!(page.chars().count() <= 60, "{page}");
            assert!(page.starts_with("```md\n") && page.ends_with("\n```"), "{page}");
        }
    }
}
