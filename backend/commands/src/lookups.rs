//! Entity lookups with an interactive choice prompt for ambiguous matches.

use amethyst_core::{Channel, Destination, OutgoingMessage, Role, User};
use amethyst_markdown::escape_mentions;
use tokio::time::timeout;
use tracing::{debug, warn};

use crate::context::Context;
use crate::types::{ArgType, InvalidArgument};

/// Most candidates offered in one prompt.
pub const MAX_CHOICES: usize = 10;

struct Noun {
    plural: &'static str,
    singular: &'static str,
}

const MEMBERS: Noun = Noun { plural: "Members", singular: "member" };
const CHANNELS: Noun = Noun { plural: "Channels", singular: "channel" };
const ROLES: Noun = Noun { plural: "Roles", singular: "role" };

#[derive(Debug)]
enum PromptFailure {
    TimedOut,
    NotANumber,
    OutOfRange,
    /// The gateway stopped delivering messages, or the prompt could not be sent.
    Unavailable,
}

impl PromptFailure {
    fn message(&self) -> Option<&'static str> {
        match self {
            PromptFailure::TimedOut => Some("Choice timed out."),
            PromptFailure::NotANumber => Some("Invalid choice (Full number required)."),
            PromptFailure::OutOfRange => Some("Choice is either too large or too small."),
            PromptFailure::Unavailable => None,
        }
    }
}

pub async fn find_member(ctx: &Context, query: &str) -> Result<User, InvalidArgument> {
    let found = ctx.host.lookup().members(&ctx.msg, query).await;
    let candidates = unwrap_lookup(found, ArgType::User)?;
    choose(ctx, query, ArgType::User, &MEMBERS, candidates, User::tag).await
}

pub async fn find_channel(
    ctx: &Context,
    query: &str,
    voice_only: bool,
) -> Result<Channel, InvalidArgument> {
    let ty = if voice_only { ArgType::VoiceChannel } else { ArgType::Channel };
    if ctx.is_private() {
        return Err(InvalidArgument::for_type(ty));
    }
    let found = ctx.host.lookup().channels(&ctx.msg, query, voice_only).await;
    let candidates = unwrap_lookup(found, ty)?;
    choose(ctx, query, ty, &CHANNELS, candidates, |c: &Channel| c.name.clone()).await
}

pub async fn find_role(ctx: &Context, query: &str) -> Result<Role, InvalidArgument> {
    if ctx.is_private() {
        return Err(InvalidArgument::for_type(ArgType::Role));
    }
    let found = ctx.host.lookup().roles(&ctx.msg, query).await;
    let candidates = unwrap_lookup(found, ArgType::Role)?;
    choose(ctx, query, ArgType::Role, &ROLES, candidates, |r: &Role| r.name.clone()).await
}

fn unwrap_lookup<T>(found: anyhow::Result<Vec<T>>, ty: ArgType) -> Result<Vec<T>, InvalidArgument> {
    found.map_err(|err| {
        warn!(kind = ty.name(), "[Lookups] Lookup failed: {err:#}");
        InvalidArgument::for_type(ty)
    })
}

async fn choose<T, F>(
    ctx: &Context,
    query: &str,
    ty: ArgType,
    noun: &Noun,
    mut candidates: Vec<T>,
    label: F,
) -> Result<T, InvalidArgument>
where
    T: Send,
    F: Fn(&T) -> String + Send,
{
    match candidates.len() {
        0 => Err(InvalidArgument::for_type(ty)),
        1 => Ok(candidates.remove(0)),
        _ => {
            candidates.truncate(MAX_CHOICES);
            let labels: Vec<String> = candidates.iter().map(label).collect();
            match prompt(ctx, query, noun, &labels).await {
                Ok(index) => Ok(candidates.swap_remove(index)),
                Err(failure) => {
                    debug!(?failure, "[Lookups] Choice prompt abandoned");
                    if let Some(text) = failure.message() {
                        if let Err(err) = ctx.send(text).await {
                            warn!("[Lookups] Could not report prompt failure: {err:#}");
                        }
                    }
                    Err(InvalidArgument::for_type(ty).silenced())
                }
            }
        }
    }
}

fn prompt_text(query: &str, noun: &Noun, labels: &[String]) -> String {
    let listing = labels
        .iter()
        .enumerate()
        .map(|(i, label)| format!("{}. {label}", i + 1))
        .collect::<Vec<_>>()
        .join("\n");
    format!(
        "```py\n>>> Multiple {plural} found matching '{query}'.\n\
         >>> Select the wanted {singular} by typing their corresponding number.\n\
         >>> If you cannot find the {singular} you want, try refining your search.\n\n\
         {listing}\n```",
        plural = noun.plural,
        singular = noun.singular,
    )
}

/// Ask the author to pick one of `labels`. Returns the zero-based index.
///
/// The prompt message is deleted whatever the outcome.
async fn prompt(
    ctx: &Context,
    query: &str,
    noun: &Noun,
    labels: &[String],
) -> Result<usize, PromptFailure> {
    let client = ctx.host.client();
    let text = escape_mentions(&prompt_text(query, noun, labels));
    let to = Destination::Channel(ctx.msg.channel.id);

    let sent = match client.send(&to, OutgoingMessage::text(text)).await {
        Ok(sent) => sent,
        Err(err) => {
            warn!("[Lookups] Could not send choice prompt: {err:#}");
            return Err(PromptFailure::Unavailable);
        }
    };

    let reply = timeout(
        ctx.host.config().prompt_timeout,
        client.next_reply(ctx.msg.channel.id, ctx.msg.author.id),
    )
    .await;

    if let Err(err) = client.delete(&sent).await {
        warn!("[Lookups] Could not delete choice prompt: {err:#}");
    }

    let reply = match reply {
        Err(_elapsed) => return Err(PromptFailure::TimedOut),
        Ok(Ok(Some(reply))) => reply,
        Ok(Ok(None)) => return Err(PromptFailure::Unavailable),
        Ok(Err(err)) => {
            warn!("[Lookups] Waiting for a choice failed: {err:#}");
            return Err(PromptFailure::Unavailable);
        }
    };

    let choice: i64 = reply.content.trim().parse().map_err(|_| PromptFailure::NotANumber)?;
    if choice < 1 || choice as usize > labels.len() {
        return Err(PromptFailure::OutOfRange);
    }
    Ok(choice as usize - 1)
}
