//! `modules.core`: help, module management and shutdown.

use std::sync::Arc;

use amethyst_commands::{
    ArgSpec, ArgType, Args, CommandBuilder, Context, HandlerFuture, Plugin, SetupContext,
    owner_only, render_help, tokenize,
};
use amethyst_core::BotSettings;
use anyhow::Result;
use tracing::{info, warn};

const MODULE_PREFIX: &str = "modules.";

pub struct CorePlugin;

pub fn setup(_ctx: &SetupContext) -> Result<Arc<dyn Plugin>> {
    Ok(Arc::new(CorePlugin))
}

impl Plugin for CorePlugin {
    fn name(&self) -> &str {
        "Core"
    }

    fn commands(self: Arc<Self>) -> Vec<CommandBuilder> {
        let module_arg = || ArgSpec::new("module", ArgType::String);
        vec![
            CommandBuilder::command("help")
                .alias("commands")
                .description("Shows help about a command, or lists every command.")
                .usage("[command]")
                .arg(ArgSpec::new("command", ArgType::String).optional().remaining())
                .handler(help),
            CommandBuilder::group("module")
                .alias("cog")
                .description("Lists loaded modules.")
                .check(owner_only())
                .handler(list_modules)
                .subcommand(
                    CommandBuilder::command("load")
                        .description("Loads a module.")
                        .arg(module_arg())
                        .handler(load),
                )
                .subcommand(
                    CommandBuilder::command("unload")
                        .description("Unloads a module.")
                        .arg(module_arg())
                        .handler(unload),
                )
                .subcommand(
                    CommandBuilder::command("reload")
                        .description("Reloads a module, keeping the old one if the new one fails.")
                        .arg(module_arg())
                        .handler(reload),
                ),
            CommandBuilder::command("shutdown")
                .alias("kys")
                .description("Logs the bot out.")
                .check(owner_only())
                .handler(shutdown),
        ]
    }
}

/// `core` and `modules.core` name the same module.
fn module_id(raw: &str) -> String {
    if raw.starts_with(MODULE_PREFIX) {
        raw.to_string()
    } else {
        format!("{MODULE_PREFIX}{raw}")
    }
}

// ---------------------------------------------------------------------------
// help
// ---------------------------------------------------------------------------

fn help(ctx: &Context, args: Args) -> HandlerFuture<'_> {
    Box::pin(async move {
        let path: Vec<String> = args
            .str("command")
            .map(tokenize)
            .unwrap_or_default();
        let host = &ctx.host;
        let rendered = render_help(
            host.holder(),
            &path,
            ctx.is_owner(),
            host.config().help_page_size,
            &ctx.prefix,
        )
        .await;

        let Some(pages) = rendered else {
            ctx.send(format!("No command called `{}` found.", path.join(" "))).await?;
            return Ok(());
        };

        if !path.is_empty() || ctx.is_private() {
            for page in &pages {
                ctx.send(page).await?;
            }
            return Ok(());
        }

        for page in &pages {
            if let Err(err) = ctx.send_author(page).await {
                warn!("[Core] Could not DM help to {}: {err:#}", ctx.author().id);
                ctx.send("Cannot send the help to you. Perhaps you have DMs blocked?").await?;
                break;
            }
        }
        Ok(())
    })
}

// ---------------------------------------------------------------------------
// module management
// ---------------------------------------------------------------------------

fn list_modules(ctx: &Context, _args: Args) -> HandlerFuture<'_> {
    Box::pin(async move {
        let modules = ctx.host.holder().all_modules().await;
        ctx.send(format!("```\nLoaded modules:\n{}\n```", modules.join("\n"))).await?;
        Ok(())
    })
}

/// Apply `change` to the persisted settings blob and save it.
async fn persist(ctx: &Context, change: impl FnOnce(&mut BotSettings) -> bool) -> Result<()> {
    let store = ctx.host.settings();
    let mut settings = BotSettings::load_from(store).await?;
    if change(&mut settings) {
        settings.save_to(store).await?;
    }
    Ok(())
}

fn load(ctx: &Context, args: Args) -> HandlerFuture<'_> {
    Box::pin(async move {
        let id = module_id(args.str("module").unwrap_or_default());
        match ctx.host.holder().load_module(&id).await {
            Ok(()) => {
                persist(ctx, |s| s.remember_module(&id)).await?;
                info!(module = %id, "[Core] Loaded by {}", ctx.author().tag());
                ctx.send(format!("Loaded module `{id}`.")).await?;
            }
            Err(err) => {
                ctx.send(err.to_string()).await?;
            }
        }
        Ok(())
    })
}

fn unload(ctx: &Context, args: Args) -> HandlerFuture<'_> {
    Box::pin(async move {
        let id = module_id(args.str("module").unwrap_or_default());
        match ctx.host.holder().unload_module(&id).await {
            Ok(()) => {
                persist(ctx, |s| s.forget_module(&id)).await?;
                info!(module = %id, "[Core] Unloaded by {}", ctx.author().tag());
                ctx.send(format!("Unloaded module `{id}`.")).await?;
            }
            Err(err) => {
                ctx.send(err.to_string()).await?;
            }
        }
        Ok(())
    })
}

fn reload(ctx: &Context, args: Args) -> HandlerFuture<'_> {
    Box::pin(async move {
        let id = module_id(args.str("module").unwrap_or_default());
        match ctx.host.holder().reload_module(&id).await {
            Ok(()) => {
                persist(ctx, |s| s.remember_module(&id)).await?;
                ctx.send(format!("Reloaded module `{id}`.")).await?;
            }
            Err(err) => {
                ctx.send(err.to_string()).await?;
            }
        }
        Ok(())
    })
}

// ---------------------------------------------------------------------------
// shutdown
// ---------------------------------------------------------------------------

fn shutdown(ctx: &Context, _args: Args) -> HandlerFuture<'_> {
    Box::pin(async move {
        ctx.send("Logging out...").await?;
        ctx.host.request_shutdown();
        Ok(())
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use amethyst_commands::testing::{
        AUTHOR_ID, OWNER_ID, TestHost, message, owner_message, private_message,
    };
    use amethyst_commands::{DispatchOutcome, Host, RunOutcome};
    use amethyst_core::{BotSettings, Destination};

    use crate::{BASIC_MODULE, CORE_MODULE, builtin_modules};

    async fn host(test: &TestHost) -> Arc<Host> {
        let host = test.build();
        host.holder().load_module(CORE_MODULE).await.unwrap();
        host
    }

    fn fixture() -> TestHost {
        TestHost::new().source(Arc::new(builtin_modules()))
    }

    #[tokio::test]
    async fn test_shutdown_from_non_owner_is_silent() {
        let test = fixture();
        let host = host(&test).await;

        let outcome = host.on_message(message("!shutdown")).await;
        assert_eq!(outcome, DispatchOutcome::Ran(RunOutcome::Rejected));
        assert!(test.client.texts().is_empty());
        assert!(!host.shutdown_requested());

        host.on_message(owner_message("!kys")).await;
        assert_eq!(test.client.texts(), vec!["Logging out...".to_string()]);
        assert!(host.shutdown_requested());
    }

    #[tokio::test]
    async fn test_module_load_persists_and_unload_forgets() {
        let test = fixture();
        let host = host(&test).await;

        host.on_message(owner_message("!module load basic")).await;
        assert!(host.holder().is_loaded(BASIC_MODULE).await);
        let persisted = BotSettings::load_from(host.settings()).await.unwrap();
        assert_eq!(persisted.modules, vec![BASIC_MODULE]);

        host.on_message(owner_message("!cog load modules.basic")).await;
        host.on_message(owner_message("!module reload basic")).await;
        host.on_message(owner_message("!module unload basic")).await;
        assert!(!host.holder().is_loaded(BASIC_MODULE).await);
        let persisted = BotSettings::load_from(host.settings()).await.unwrap();
        assert!(persisted.modules.is_empty());

        host.on_message(owner_message("!module")).await;
        assert_eq!(
            test.client.texts(),
            vec![
                "Loaded module `modules.basic`.".to_string(),
                "Module `modules.basic` is already loaded.".to_string(),
                "Reloaded module `modules.basic`.".to_string(),
                "Unloaded module `modules.basic`.".to_string(),
                "```\nLoaded modules:\nmodules.core\n```".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn test_module_commands_are_owner_only() {
        let test = fixture();
        let host = host(&test).await;
        host.on_message(message("!module load basic")).await;
        assert!(!host.holder().is_loaded(BASIC_MODULE).await);
        assert!(test.client.texts().is_empty());
    }

    #[tokio::test]
    async fn test_help_listing_goes_to_author() {
        let test = fixture();
        let host = host(&test).await;

        host.on_message(message("!help")).await;
        let dms = test.client.texts_to(Destination::User(AUTHOR_ID));
        assert_eq!(dms.len(), 1);
        assert!(dms[0].contains("Core:\n  help  Shows help about a command"));
        assert!(!dms[0].contains("shutdown"));

        host.on_message(owner_message("!commands")).await;
        let owner_dms = test.client.texts_to(Destination::User(OWNER_ID));
        assert!(owner_dms[0].contains("shutdown"));
    }

    #[tokio::test]
    async fn test_help_falls_back_when_dms_blocked() {
        let test = fixture();
        test.client.block_dms();
        let host = host(&test).await;

        host.on_message(message("!help")).await;
        assert_eq!(
            test.client.texts(),
            vec!["Cannot send the help to you. Perhaps you have DMs blocked?".to_string()]
        );
    }

    #[tokio::test]
    async fn test_help_for_command_and_unknown() {
        let test = fixture();
        let host = host(&test).await;

        host.on_message(message("!help commands")).await;
        host.on_message(message("!help nothing here")).await;
        host.on_message(message("!help shutdown")).await;
        host.on_message(private_message("!help")).await;

        let texts = test.client.texts();
        assert!(texts[0].starts_with("```md\n!help [command]\n"));
        assert!(texts[0].contains("Aliases: commands"));
        assert_eq!(texts[1], "No command called `nothing here` found.");
        assert_eq!(texts[2], "No command called `shutdown` found.");
        assert!(texts[3].contains("Core:"));
    }
}
