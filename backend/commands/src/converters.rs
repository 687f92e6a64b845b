//! Converter registry: raw argument token to typed value.
use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use crate::context::Context;
use crate::lookups;
use crate::types::{ArgType, InvalidArgument, Value};

// ---------------------------------------------------------------------------
// Converter trait
// ---------------------------------------------------------------------------

#[async_trait]
pub trait Converter: Send + Sync {
    /// Human-readable type name for usage and error text.
    fn type_name(&self) -> &str;

    fn example(&self) -> Option<&str> {
        None
    }

    async fn convert(&self, ctx: &Context, raw: &str) -> Result<Value, InvalidArgument>;

    fn invalid(&self) -> InvalidArgument {
        InvalidArgument::new(self.type_name(), self.example())
    }
}

const TRUTHY: [&str; 9] = ["yes", "y", "true", "t", "1", "enable", "on", "affirmative", "+"];
const FALSY: [&str; 9] = ["no", "n", "false", "f", "0", "disable", "off", "negative", "-"];

/// Case-insensitive boolean parse over the fixed truthy and falsy sets.
pub fn parse_bool(raw: &str) -> Option<bool> {
    let lowered = raw.to_lowercase();
    if TRUTHY.contains(&lowered.as_str()) {
        Some(true)
    } else if FALSY.contains(&lowered.as_str()) {
        Some(false)
    } else {
        None
    }
}

// ---------------------------------------------------------------------------
// Built-in converters
// ---------------------------------------------------------------------------

pub struct StringConverter;

#[async_trait]
impl Converter for StringConverter {
    fn type_name(&self) -> &str {
        ArgType::String.name()
    }

    async fn convert(&self, _ctx: &Context, raw: &str) -> Result<Value, InvalidArgument> {
        Ok(Value::String(raw.to_string()))
    }
}

pub struct IntegerConverter;

#[async_trait]
impl Converter for IntegerConverter {
    fn type_name(&self) -> &str {
        ArgType::Integer.name()
    }

    fn example(&self) -> Option<&str> {
        ArgType::Integer.example()
    }

    async fn convert(&self, _ctx: &Context, raw: &str) -> Result<Value, InvalidArgument> {
        raw.parse().map(Value::Integer).map_err(|_| self.invalid())
    }
}

pub struct FloatConverter;

#[async_trait]
impl Converter for FloatConverter {
    fn type_name(&self) -> &str {
        ArgType::Float.name()
    }

    fn example(&self) -> Option<&str> {
        ArgType::Float.example()
    }

    async fn convert(&self, _ctx: &Context, raw: &str) -> Result<Value, InvalidArgument> {
        match raw.parse::<f64>() {
            Ok(f) if f.is_finite() => Ok(Value::Float(f)),
            _ => Err(self.invalid()),
        }
    }
}

pub struct BooleanConverter;

#[async_trait]
impl Converter for BooleanConverter {
    fn type_name(&self) -> &str {
        ArgType::Boolean.name()
    }

    fn example(&self) -> Option<&str> {
        ArgType::Boolean.example()
    }

    async fn convert(&self, _ctx: &Context, raw: &str) -> Result<Value, InvalidArgument> {
        parse_bool(raw).map(Value::Boolean).ok_or_else(|| self.invalid())
    }
}

pub struct UserConverter;

#[async_trait]
impl Converter for UserConverter {
    fn type_name(&self) -> &str {
        ArgType::User.name()
    }

    fn example(&self) -> Option<&str> {
        ArgType::User.example()
    }

    async fn convert(&self, ctx: &Context, raw: &str) -> Result<Value, InvalidArgument> {
        lookups::find_member(ctx, raw).await.map(Value::User)
    }
}

pub struct ChannelConverter {
    pub voice_only: bool,
}

#[async_trait]
impl Converter for ChannelConverter {
    fn type_name(&self) -> &str {
        self.arg_type().name()
    }

    fn example(&self) -> Option<&str> {
        self.arg_type().example()
    }

    async fn convert(&self, ctx: &Context, raw: &str) -> Result<Value, InvalidArgument> {
        lookups::find_channel(ctx, raw, self.voice_only).await.map(Value::Channel)
    }
}

impl ChannelConverter {
    fn arg_type(&self) -> ArgType {
        if self.voice_only { ArgType::VoiceChannel } else { ArgType::Channel }
    }
}

pub struct RoleConverter;

#[async_trait]
impl Converter for RoleConverter {
    fn type_name(&self) -> &str {
        ArgType::Role.name()
    }

    fn example(&self) -> Option<&str> {
        ArgType::Role.example()
    }

    async fn convert(&self, ctx: &Context, raw: &str) -> Result<Value, InvalidArgument> {
        lookups::find_role(ctx, raw).await.map(Value::Role)
    }
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct ConverterRegistry {
    converters: HashMap<ArgType, Arc<dyn Converter>>,
}

impl ConverterRegistry {
    /// An empty registry. Every conversion fails until converters are registered.
    pub fn empty() -> Self {
        Self { converters: HashMap::new() }
    }

    pub fn new() -> Self {
        let mut registry = Self::empty();
        registry.register(ArgType::String, Arc::new(StringConverter));
        registry.register(ArgType::Integer, Arc::new(IntegerConverter));
        registry.register(ArgType::Float, Arc::new(FloatConverter));
        registry.register(ArgType::Boolean, Arc::new(BooleanConverter));
        registry.register(ArgType::User, Arc::new(UserConverter));
        registry.register(ArgType::Channel, Arc::new(ChannelConverter { voice_only: false }));
        registry.register(ArgType::VoiceChannel, Arc::new(ChannelConverter { voice_only: true }));
        registry.register(ArgType::Role, Arc::new(RoleConverter));
        registry
    }

    /// Install or replace the converter for `ty`.
    pub fn register(&mut self, ty: ArgType, converter: Arc<dyn Converter>) {
        self.converters.insert(ty, converter);
    }

    pub fn get(&self, ty: ArgType) -> Option<&Arc<dyn Converter>> {
        self.converters.get(&ty)
    }

    pub fn type_name(&self, ty: ArgType) -> String {
        self.get(ty).map_or_else(|| ty.name().to_string(), |c| c.type_name().to_string())
    }

    fn complaint(&self, ty: ArgType) -> InvalidArgument {
        match self.get(ty) {
            Some(c) => c.invalid(),
            None => InvalidArgument::for_type(ty),
        }
    }

    /// Convert `raw` to the first of `types` that accepts it.
    ///
    /// A silent failure ends the attempt at once: the user has already been
    /// answered (for example by an abandoned choice prompt).
    pub async fn convert(
        &self,
        ctx: &Context,
        types: &[ArgType],
        raw: &str,
    ) -> Result<Value, InvalidArgument> {
        let mut failures = Vec::new();

        for ty in types {
            let Some(converter) = self.get(*ty) else {
                failures.push(self.complaint(*ty));
                continue;
            };
            match converter.convert(ctx, raw).await {
                Ok(value) => return Ok(value),
                Err(err) if err.silent => return Err(err),
                Err(err) => failures.push(err),
            }
        }

        if failures.len() == 1 {
            return Err(failures.remove(0));
        }
        let expected = failures.iter().map(|f| f.expected.as_str()).collect::<Vec<_>>().join(" or ");
        let examples = failures.iter().filter_map(|f| f.example.as_deref()).collect::<Vec<_>>();
        let example = (!examples.is_empty()).then(|| examples.join(", "));
        Err(InvalidArgument::new(expected, example.as_deref()))
    }
}

impl Default for ConverterRegistry {
    fn default() -> Self {
        Self::new()
    }
}
