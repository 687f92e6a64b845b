//! Commands and command groups: metadata, argument binding and routing.

use std::collections::BTreeMap;
use std::sync::{Arc, Weak};

use anyhow::Result;
use futures::future::BoxFuture;
use tracing::debug;

use crate::checks::{Check, run_checks};
use crate::context::Context;
use crate::converters::ConverterRegistry;
use crate::parsing::skip_tokens;
use crate::types::{ArgSpec, Args, InvalidArgument, validate_schema};

// ---------------------------------------------------------------------------
// Handler
// ---------------------------------------------------------------------------

pub type HandlerFuture<'a> = BoxFuture<'a, Result<()>>;

pub trait CommandHandler: Send + Sync {
    fn call<'a>(&'a self, ctx: &'a Context, args: Args) -> HandlerFuture<'a>;
}

impl<F> CommandHandler for F
where
    F: for<'a> Fn(&'a Context, Args) -> HandlerFuture<'a> + Send + Sync,
{
    fn call<'a>(&'a self, ctx: &'a Context, args: Args) -> HandlerFuture<'a> {
        (self)(ctx, args)
    }
}

/// How one invocation of [`Command::run`] ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// The handler ran to completion.
    Completed,
    /// A check rejected the caller.
    Rejected,
    /// Arguments could not be bound; the caller was told why.
    BindingFailed,
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Declarative description of a command, turned into a [`Command`] on load.
pub struct CommandBuilder {
    name: String,
    aliases: Vec<String>,
    description: String,
    usage: Option<String>,
    hidden: bool,
    checks: Vec<Check>,
    args: Vec<ArgSpec>,
    handler: Option<Arc<dyn CommandHandler>>,
    children: Vec<CommandBuilder>,
    is_group: bool,
}

impl CommandBuilder {
    pub fn command(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            aliases: Vec::new(),
            description: String::new(),
            usage: None,
            hidden: false,
            checks: Vec::new(),
            args: Vec::new(),
            handler: None,
            children: Vec::new(),
            is_group: false,
        }
    }

    pub fn group(name: impl Into<String>) -> Self {
        Self { is_group: true, ..Self::command(name) }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.aliases.push(alias.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Fixed usage text. Without one, usage is generated from the arguments.
    pub fn usage(mut self, usage: impl Into<String>) -> Self {
        self.usage = Some(usage.into());
        self
    }

    pub fn hidden(mut self) -> Self {
        self.hidden = true;
        self
    }

    pub fn check(mut self, check: Check) -> Self {
        self.hidden |= check.hides();
        self.checks.push(check);
        self
    }

    pub fn arg(mut self, spec: ArgSpec) -> Self {
        self.args.push(spec);
        self
    }

    pub fn handler<F>(self, f: F) -> Self
    where
        F: for<'a> Fn(&'a Context, Args) -> HandlerFuture<'a> + Send + Sync + 'static,
    {
        self.handler_impl(f)
    }

    pub fn handler_impl(mut self, handler: impl CommandHandler + 'static) -> Self {
        self.handler = Some(Arc::new(handler));
        self
    }

    pub fn subcommand(mut self, child: CommandBuilder) -> Self {
        self.children.push(child);
        self
    }

    fn keys(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.name.as_str()).chain(self.aliases.iter().map(String::as_str))
    }

    /// Reject shapes that could never be registered or bound.
    pub fn validate(&self) -> Result<(), String> {
        for key in self.keys() {
            if key.is_empty() || key.contains(char::is_whitespace) {
                return Err(format!("`{key}` is not a valid command name or alias"));
            }
        }
        let keys: Vec<&str> = self.keys().collect();
        if let Some(dup) = keys.iter().enumerate().find_map(|(i, k)| keys[..i].contains(k).then_some(*k)) {
            return Err(format!("`{dup}` is declared twice"));
        }
        if !self.is_group && self.handler.is_none() {
            return Err("command has no handler".to_string());
        }
        if !self.is_group && !self.children.is_empty() {
            return Err("only groups can have subcommands".to_string());
        }
        validate_schema(&self.args)?;

        let mut child_keys: Vec<&str> = Vec::new();
        for child in &self.children {
            child.validate().map_err(|reason| format!("{} {}: {reason}", self.name, child.name))?;
            for key in child.keys() {
                if child_keys.contains(&key) {
                    return Err(format!("subcommand `{key}` of `{}` is registered twice", self.name));
                }
                child_keys.push(key);
            }
        }
        Ok(())
    }

    /// Build the command tree. Call [`validate`](Self::validate) first.
    pub(crate) fn build(
        self,
        parent: Weak<Command>,
        module: &str,
        converters: &ConverterRegistry,
    ) -> Arc<Command> {
        let CommandBuilder {
            name,
            aliases,
            description,
            usage,
            hidden,
            checks,
            args,
            handler,
            children,
            is_group,
        } = self;
        let usage = usage.unwrap_or_else(|| generate_usage(&args, converters));

        Arc::new_cyclic(|me| {
            let mut map = BTreeMap::new();
            for child in children {
                let built = child.build(me.clone(), module, converters);
                for key in built.keys() {
                    map.insert(key.to_string(), built.clone());
                }
            }
            Command {
                name,
                aliases,
                description,
                usage,
                hidden,
                checks,
                args,
                handler,
                children: map,
                is_group,
                parent,
                module: module.to_string(),
            }
        })
    }
}

/// Usage text for an argument list, e.g. `<user: user> [reason: string]`.
pub fn generate_usage(specs: &[ArgSpec], converters: &ConverterRegistry) -> String {
    specs
        .iter()
        .map(|spec| {
            let types = spec
                .types
                .iter()
                .map(|ty| converters.type_name(*ty))
                .collect::<Vec<_>>()
                .join(" or ");
            let multiple = if spec.variadic { " (multiple)" } else { "" };
            if spec.required {
                format!("<{}: {types}{multiple}>", spec.name)
            } else {
                format!("[{}: {types}{multiple}]", spec.name)
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

// ---------------------------------------------------------------------------
// Command
// ---------------------------------------------------------------------------

enum BindFailure<'a> {
    Missing(&'a ArgSpec),
    Invalid(&'a ArgSpec, InvalidArgument),
}

pub struct Command {
    name: String,
    aliases: Vec<String>,
    description: String,
    usage: String,
    hidden: bool,
    checks: Vec<Check>,
    args: Vec<ArgSpec>,
    handler: Option<Arc<dyn CommandHandler>>,
    /// Keyed by every child's name and every alias.
    children: BTreeMap<String, Arc<Command>>,
    is_group: bool,
    parent: Weak<Command>,
    module: String,
}

impl Command {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn aliases(&self) -> &[String] {
        &self.aliases
    }

    /// Name followed by aliases.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.name.as_str()).chain(self.aliases.iter().map(String::as_str))
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    /// First line of the description.
    pub fn short_description(&self) -> &str {
        self.description.lines().next().unwrap_or("")
    }

    pub fn usage(&self) -> &str {
        &self.usage
    }

    pub fn is_hidden(&self) -> bool {
        self.hidden
    }

    pub fn is_group(&self) -> bool {
        self.is_group
    }

    pub fn checks(&self) -> &[Check] {
        &self.checks
    }

    pub fn args(&self) -> &[ArgSpec] {
        &self.args
    }

    /// Identifier of the module that registered this command.
    pub fn module(&self) -> &str {
        &self.module
    }

    pub fn parent(&self) -> Option<Arc<Command>> {
        self.parent.upgrade()
    }

    pub fn child(&self, key: &str) -> Option<&Arc<Command>> {
        self.children.get(key)
    }

    /// Unique children, ordered by name.
    pub fn children(&self) -> Vec<Arc<Command>> {
        self.children
            .iter()
            .filter(|(key, child)| key.as_str() == child.name)
            .map(|(_, child)| child.clone())
            .collect()
    }

    /// Space separated path from the top-level command.
    pub fn qualified_name(&self) -> String {
        let mut parts = vec![self.name.clone()];
        let mut parent = self.parent.upgrade();
        while let Some(p) = parent {
            parts.push(p.name.clone());
            parent = p.parent.upgrade();
        }
        parts.reverse();
        parts.join(" ")
    }

    /// Route and run an invocation.
    ///
    /// A group whose first token names a child runs its own checks, moves
    /// the token onto the command path and hands over to the child.
    /// Otherwise checks run, then binding, then the handler.
    pub fn run<'a>(&'a self, ctx: &'a mut Context) -> BoxFuture<'a, Result<RunOutcome>> {
        Box::pin(async move {
            let child = match ctx.args.first() {
                Some(token) if self.is_group => self.children.get(token).cloned(),
                _ => None,
            };

            if let Some(child) = child {
                if !run_checks(&self.checks, ctx).await {
                    return Ok(RunOutcome::Rejected);
                }
                ctx.descend();
                debug!(cmd = %ctx.cmd, "[Commands] Routing to subcommand");
                return child.run(ctx).await;
            }

            if !run_checks(&self.checks, ctx).await {
                return Ok(RunOutcome::Rejected);
            }
            self.invoke(ctx).await
        })
    }

    async fn invoke(&self, ctx: &Context) -> Result<RunOutcome> {
        let args = if self.args.is_empty() {
            Args::new()
        } else {
            match self.bind(ctx).await {
                Ok(args) => args,
                Err(failure) => {
                    self.report(ctx, failure).await?;
                    return Ok(RunOutcome::BindingFailed);
                }
            }
        };

        if let Some(handler) = &self.handler {
            handler.call(ctx, args).await?;
        }
        Ok(RunOutcome::Completed)
    }

    /// Bind tokens to the declared parameters.
    ///
    /// A leading variadic takes `tokens - named` tokens. Named parameters then
    /// take one token each, except a capturing last parameter which takes
    /// the raw text of the rest, spacing and quotes intact. Surplus tokens
    /// are ignored.
    async fn bind<'s>(&'s self, ctx: &Context) -> Result<Args, BindFailure<'s>> {
        let converters = ctx.host.converters();
        let tokens = &ctx.args;
        let mut args = Args::new();
        let mut next = 0;

        let (variadic, named) = match self.args.split_first() {
            Some((first, rest)) if first.variadic => (Some(first), rest),
            _ => (None, &self.args[..]),
        };

        if let Some(spec) = variadic {
            let take = tokens.len().saturating_sub(named.len());
            if take == 0 && spec.required {
                return Err(BindFailure::Missing(spec));
            }
            for token in &tokens[..take] {
                let value = converters
                    .convert(ctx, &spec.types, token)
                    .await
                    .map_err(|err| BindFailure::Invalid(spec, err))?;
                args.push_variadic(value);
            }
            next = take;
        }

        for spec in named {
            if next >= tokens.len() {
                if spec.required {
                    return Err(BindFailure::Missing(spec));
                }
                break;
            }
            let raw = if spec.capture_remaining {
                let rest = skip_tokens(&ctx.suffix, next).trim_end().to_string();
                next = tokens.len();
                rest
            } else {
                next += 1;
                tokens[next - 1].clone()
            };
            let value = converters
                .convert(ctx, &spec.types, &raw)
                .await
                .map_err(|err| BindFailure::Invalid(spec, err))?;
            args.insert(spec.name.clone(), value);
        }

        Ok(args)
    }

    async fn report(&self, ctx: &Context, failure: BindFailure<'_>) -> Result<()> {
        let text = match failure {
            BindFailure::Missing(spec) => {
                let converters = ctx.host.converters();
                let expected = spec
                    .types
                    .iter()
                    .map(|ty| converters.type_name(*ty))
                    .collect::<Vec<_>>()
                    .join(" or ");
                let mut text = format!(
                    "Missing argument `{}` for command `{}`. Expected `{expected}`.",
                    spec.name, ctx.cmd
                );
                if !self.usage.is_empty() {
                    text.push_str(&format!("\n**Usage:** `{}{} {}`", ctx.prefix, ctx.cmd, self.usage));
                }
                text
            }
            BindFailure::Invalid(_, err) if err.silent => return Ok(()),
            BindFailure::Invalid(spec, err) => {
                format!("Error for argument `{}` for command `{}`:\n{err}", spec.name, ctx.cmd)
            }
        };
        ctx.send(text).await?;
        Ok(())
    }
}

impl std::fmt::Debug for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Command")
            .field("name", &self.name)
            .field("aliases", &self.aliases)
            .field("module", &self.module)
            .field("is_group", &self.is_group)
            .field("children", &self.children.keys().collect::<Vec<_>>())
            .finish()
    }
}
