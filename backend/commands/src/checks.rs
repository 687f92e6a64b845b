//! Check chain: ordered predicates gating a command.
//!
//! Checks run in declaration order and stop at the first rejection. A
//! rejection is silent; a check that wants to explain itself sends its own
//! message before returning `false`.
use std::sync::Arc;

use amethyst_core::Permission;
use async_trait::async_trait;
use futures::future::BoxFuture;
use tracing::{debug, warn};

use crate::context::{Context, Who};

// ---------------------------------------------------------------------------
// Predicate trait
// ---------------------------------------------------------------------------

#[async_trait]
pub trait Predicate: Send + Sync {
    async fn test(&self, ctx: &Context) -> bool;
}

struct SyncFn<F>(F);

#[async_trait]
impl<F> Predicate for SyncFn<F>
where
    F: Fn(&Context) -> bool + Send + Sync,
{
    async fn test(&self, ctx: &Context) -> bool {
        (self.0)(ctx)
    }
}

struct AsyncFn<F>(F);

#[async_trait]
impl<F> Predicate for AsyncFn<F>
where
    F: for<'a> Fn(&'a Context) -> BoxFuture<'a, bool> + Send + Sync,
{
    async fn test(&self, ctx: &Context) -> bool {
        (self.0)(ctx).await
    }
}

// ---------------------------------------------------------------------------
// Check
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct Check {
    name: String,
    /// Commands carrying this check are hidden from default help.
    hide: bool,
    predicate: Arc<dyn Predicate>,
}

impl Check {
    pub fn new(name: impl Into<String>, predicate: impl Predicate + 'static) -> Self {
        Self { name: name.into(), hide: false, predicate: Arc::new(predicate) }
    }

    pub fn from_fn<F>(name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&Context) -> bool + Send + Sync + 'static,
    {
        Self::new(name, SyncFn(f))
    }

    pub fn from_async<F>(name: impl Into<String>, f: F) -> Self
    where
        F: for<'a> Fn(&'a Context) -> BoxFuture<'a, bool> + Send + Sync + 'static,
    {
        Self::new(name, AsyncFn(f))
    }

    pub fn hidden(mut self) -> Self {
        self.hide = true;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn hides(&self) -> bool {
        self.hide
    }

    pub async fn passes(&self, ctx: &Context) -> bool {
        self.predicate.test(ctx).await
    }
}

impl std::fmt::Debug for Check {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Check").field("name", &self.name).field("hide", &self.hide).finish()
    }
}

/// Evaluate `checks` in order, stopping at the first rejection.
pub async fn run_checks(checks: &[Check], ctx: &Context) -> bool {
    for check in checks {
        if !check.passes(ctx).await {
            debug!(check = check.name(), cmd = %ctx.cmd, "[Commands] Check rejected invocation");
            return false;
        }
    }
    true
}

// ---------------------------------------------------------------------------
// Standard checks
// ---------------------------------------------------------------------------

/// Caller is a bot owner. Hides the command.
pub fn owner_only() -> Check {
    Check::from_fn("owner_only", |ctx| ctx.is_owner()).hidden()
}

/// Not invoked from a private channel.
pub fn guild_only() -> Check {
    Check::from_fn("guild_only", |ctx| !ctx.is_private())
}

/// Caller holds every role in `ids`.
pub fn has_roles(ids: impl IntoIterator<Item = u64>) -> Check {
    let ids: Vec<u64> = ids.into_iter().collect();
    Check::from_fn("has_roles", move |ctx| {
        !ctx.is_private() && ids.iter().all(|id| ctx.msg.author_roles.iter().any(|r| r.id == *id))
    })
}

/// Caller holds a role by each of `names`.
pub fn has_named_roles<S: Into<String>>(names: impl IntoIterator<Item = S>) -> Check {
    let names: Vec<String> = names.into_iter().map(Into::into).collect();
    Check::from_fn("has_named_roles", move |ctx| {
        !ctx.is_private()
            && names.iter().all(|name| ctx.msg.author_roles.iter().any(|r| &r.name == name))
    })
}

/// Invoked in a channel flagged for adult content.
pub fn nsfw_only() -> Check {
    Check::from_fn("nsfw_only", |ctx| ctx.msg.channel.is_nsfw())
}

struct PermissionCheck {
    perms: Vec<Permission>,
    who: Who,
}

#[async_trait]
impl Predicate for PermissionCheck {
    async fn test(&self, ctx: &Context) -> bool {
        match ctx.has_permissions(&self.perms, self.who).await {
            Ok(granted) => granted,
            Err(err) => {
                warn!(cmd = %ctx.cmd, "[Commands] Permission lookup failed: {err:#}");
                false
            }
        }
    }
}

/// Caller has every permission in `perms` in the invoking channel.
pub fn author_permissions(perms: impl IntoIterator<Item = Permission>) -> Check {
    let perms = perms.into_iter().collect();
    Check::new("author_permissions", PermissionCheck { perms, who: Who::Author })
}

/// The bot has every permission in `perms` in the invoking channel.
pub fn bot_permissions(perms: impl IntoIterator<Item = Permission>) -> Check {
    let perms = perms.into_iter().collect();
    Check::new("bot_permissions", PermissionCheck { perms, who: Who::Bot })
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use amethyst_core::{Channel, IncomingMessage, Permissions, Role, User};

    use super::*;
    use crate::testing::{OWNER_ID, TestHost, message, private_message};

    #[tokio::test]
    async fn test_short_circuits_on_first_failure() {
        let host = TestHost::new().build();
        let ctx = host.context(message("!x")).unwrap();
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();

        let checks = vec![
            Check::from_fn("no", |_| false),
            Check::from_fn("count", move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
                true
            }),
        ];
        assert!(!run_checks(&checks, &ctx).await);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_async_predicates_are_awaited() {
        let host = TestHost::new().build();
        let ctx = host.context(message("!x")).unwrap();
        let check = Check::from_async("later", |ctx| {
            Box::pin(async move {
                tokio::task::yield_now().await;
                ctx.args.is_empty()
            })
        });
        assert!(run_checks(&[check], &ctx).await);
    }

    #[tokio::test]
    async fn test_owner_only_is_hidden() {
        let host = TestHost::new().build();
        assert!(owner_only().hides());
        assert!(!guild_only().hides());

        let mut owner_msg = message("!x");
        owner_msg.author.id = OWNER_ID;
        assert!(owner_only().passes(&host.context(owner_msg).unwrap()).await);
        assert!(!owner_only().passes(&host.context(message("!x")).unwrap()).await);
    }

    #[tokio::test]
    async fn test_guild_and_nsfw() {
        let host = TestHost::new().build();
        assert!(!guild_only().passes(&host.context(private_message("!x")).unwrap()).await);
        assert!(guild_only().passes(&host.context(message("!x")).unwrap()).await);

        let lewd = IncomingMessage::new(1, "!x", User::new(5, "u", "0005"), Channel::nsfw(9, "lewd"));
        assert!(nsfw_only().passes(&host.context(lewd).unwrap()).await);
        assert!(!nsfw_only().passes(&host.context(message("!x")).unwrap()).await);
    }

    #[tokio::test]
    async fn test_roles_require_all() {
        let host = TestHost::new().build();
        let msg = message("!x").with_roles(vec![Role::new(1, "Mod"), Role::new(2, "DJ")]);
        let ctx = host.context(msg).unwrap();

        assert!(has_roles([1, 2]).passes(&ctx).await);
        assert!(!has_roles([1, 3]).passes(&ctx).await);
        assert!(has_named_roles(["DJ"]).passes(&ctx).await);
        assert!(!has_named_roles(["DJ", "Admin"]).passes(&ctx).await);
    }

    #[tokio::test]
    async fn test_permission_checks_ask_the_client() {
        let test = TestHost::new();
        test.client.grant_author([Permission::KickMembers].into_iter().collect());
        test.client.grant_bot(Permissions::none());
        let host = test.build();
        let ctx = host.context(message("!x")).unwrap();

        assert!(author_permissions([Permission::KickMembers]).passes(&ctx).await);
        assert!(!author_permissions([Permission::BanMembers]).passes(&ctx).await);
        assert!(!bot_permissions([Permission::SendMessages]).passes(&ctx).await);
    }
}
