//! `modules.basic`: small everyday commands.

use std::sync::Arc;

use amethyst_commands::{
    ArgSpec, ArgType, Args, CommandBuilder, Context, HandlerFuture, Plugin, SetupContext,
};
use anyhow::Result;

pub struct BasicPlugin;

pub fn setup(_ctx: &SetupContext) -> Result<Arc<dyn Plugin>> {
    Ok(Arc::new(BasicPlugin))
}

impl Plugin for BasicPlugin {
    fn name(&self) -> &str {
        "Basic"
    }

    fn commands(self: Arc<Self>) -> Vec<CommandBuilder> {
        vec![
            CommandBuilder::command("ping").description("Check the bot is alive.").handler(ping),
            CommandBuilder::command("echo")
                .description("Repeat a message back.")
                .arg(ArgSpec::new("msg", ArgType::String).remaining())
                .handler(echo),
        ]
    }
}

fn ping(ctx: &Context, _args: Args) -> HandlerFuture<'_> {
    Box::pin(async move {
        ctx.send("Pong.").await?;
        Ok(())
    })
}

fn echo(ctx: &Context, args: Args) -> HandlerFuture<'_> {
    Box::pin(async move {
        let msg = args.str("msg").unwrap_or_default();
        ctx.send(msg).await?;
        Ok(())
    })
}
