//! Argument schema, converted values and the invalid-argument result.
use std::fmt;

use amethyst_core::{Channel, Role, User};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Arg types
// ---------------------------------------------------------------------------

/// Semantic type of a command argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArgType {
    String,
    Integer,
    Float,
    Boolean,
    User,
    Channel,
    VoiceChannel,
    Role,
}

impl ArgType {
    /// Human-readable name used in usage and error text.
    pub fn name(&self) -> &'static str {
        match self {
            ArgType::String => "string",
            ArgType::Integer => "integer",
            ArgType::Float => "float",
            ArgType::Boolean => "boolean",
            ArgType::User => "user",
            ArgType::Channel => "channel",
            ArgType::VoiceChannel => "voice channel",
            ArgType::Role => "role",
        }
    }

    pub fn example(&self) -> Option<&'static str> {
        match self {
            ArgType::String => None,
            ArgType::Integer => Some("10, 0, 400, -5"),
            ArgType::Float => Some("0.5, 3.1415, -5.25"),
            ArgType::Boolean => Some("yes, no, off, on"),
            ArgType::User => Some("@example, example, 1234567890 (id)"),
            ArgType::Channel => Some("#example, example, 1234567890 (id)"),
            ArgType::VoiceChannel => Some("\"Example Voice\", 1234567890 (id)"),
            ArgType::Role => Some("@example, example, 1234567890 (id)"),
        }
    }
}

// ---------------------------------------------------------------------------
// Arg spec
// ---------------------------------------------------------------------------

/// One declared parameter of a command handler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArgSpec {
    pub name: String,
    /// Accepted types, tried in order.
    pub types: Vec<ArgType>,
    pub required: bool,
    /// Consumes a prefix of the tokens, each converted on its own.
    pub variadic: bool,
    /// If true, consumes all remaining text.
    pub capture_remaining: bool,
}

impl ArgSpec {
    /// A required positional parameter.
    pub fn new(name: impl Into<String>, ty: ArgType) -> Self {
        Self {
            name: name.into(),
            types: vec![ty],
            required: true,
            variadic: false,
            capture_remaining: false,
        }
    }

    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    pub fn variadic(mut self) -> Self {
        self.variadic = true;
        self
    }

    pub fn remaining(mut self) -> Self {
        self.capture_remaining = true;
        self
    }

    /// Also accept `ty`, tried after the types already declared.
    pub fn or(mut self, ty: ArgType) -> Self {
        if !self.types.contains(&ty) {
            self.types.push(ty);
        }
        self
    }
}

/// Check an ordered parameter list for shapes binding cannot honour.
pub fn validate_schema(specs: &[ArgSpec]) -> Result<(), String> {
    let mut seen_optional = false;

    for (i, spec) in specs.iter().enumerate() {
        if spec.name.is_empty() {
            return Err(format!("parameter #{} has no name", i + 1));
        }
        if specs[..i].iter().any(|s| s.name == spec.name) {
            return Err(format!("parameter `{}` is declared twice", spec.name));
        }
        if spec.types.is_empty() {
            return Err(format!("parameter `{}` has no type", spec.name));
        }
        if spec.variadic {
            if i != 0 {
                return Err(format!("variadic parameter `{}` must come first", spec.name));
            }
            if spec.capture_remaining {
                return Err(format!(
                    "variadic parameter `{}` cannot also capture remaining text",
                    spec.name
                ));
            }
            continue;
        }
        if spec.capture_remaining {
            if i + 1 != specs.len() {
                return Err(format!("parameter `{}` captures remaining text but is not last", spec.name));
            }
            if specs[0].variadic {
                return Err(format!(
                    "parameter `{}` captures remaining text alongside a variadic",
                    spec.name
                ));
            }
        }
        if spec.required && seen_optional {
            return Err(format!("required parameter `{}` follows an optional one", spec.name));
        }
        seen_optional |= !spec.required;
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Values
// ---------------------------------------------------------------------------

/// A converted argument.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    String(String),
    Integer(i64),
    Float(f64),
    Boolean(bool),
    User(User),
    Channel(Channel),
    Role(Role),
}

impl Value {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            Value::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_user(&self) -> Option<&User> {
        match self {
            Value::User(u) => Some(u),
            _ => None,
        }
    }

    pub fn as_channel(&self) -> Option<&Channel> {
        match self {
            Value::Channel(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_role(&self) -> Option<&Role> {
        match self {
            Value::Role(r) => Some(r),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::String(s) => f.write_str(s),
            Value::Integer(i) => write!(f, "{i}"),
            Value::Float(x) => write!(f, "{x}"),
            Value::Boolean(b) => write!(f, "{b}"),
            Value::User(u) => f.write_str(&u.tag()),
            Value::Channel(c) => write!(f, "#{}", c.name),
            Value::Role(r) => f.write_str(&r.name),
        }
    }
}

// ---------------------------------------------------------------------------
// Invalid argument
// ---------------------------------------------------------------------------

/// A failed conversion. Returned, never raised.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidArgument {
    pub expected: String,
    pub example: Option<String>,
    /// The user was already told what went wrong; send nothing more.
    pub silent: bool,
}

impl InvalidArgument {
    pub fn new(expected: impl Into<String>, example: Option<&str>) -> Self {
        Self {
            expected: expected.into(),
            example: example.map(str::to_string),
            silent: false,
        }
    }

    pub fn for_type(ty: ArgType) -> Self {
        Self::new(ty.name(), ty.example())
    }

    pub fn silenced(mut self) -> Self {
        self.silent = true;
        self
    }
}

impl fmt::Display for InvalidArgument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Invalid argument type. Expected `{}`.", self.expected)?;
        if let Some(example) = &self.example {
            write!(f, "\n**Example:** `{example}`")?;
        }
        Ok(())
    }
}

impl std::error::Error for InvalidArgument {}

// ---------------------------------------------------------------------------
// Bound arguments
// ---------------------------------------------------------------------------

/// Arguments bound to a handler's declared parameters.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Args {
    variadic: Vec<Value>,
    named: Vec<(String, Value)>,
}

impl Args {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push_variadic(&mut self, value: Value) {
        self.variadic.push(value);
    }

    pub(crate) fn insert(&mut self, name: impl Into<String>, value: Value) {
        self.named.push((name.into(), value));
    }

    pub fn is_empty(&self) -> bool {
        self.variadic.is_empty() && self.named.is_empty()
    }

    /// Values bound to the variadic parameter, in order.
    pub fn variadic(&self) -> &[Value] {
        &self.variadic
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.named.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    pub fn str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(Value::as_str)
    }

    pub fn int(&self, name: &str) -> Option<i64> {
        self.get(name).and_then(Value::as_int)
    }

    pub fn float(&self, name: &str) -> Option<f64> {
        self.get(name).and_then(Value::as_float)
    }

    pub fn bool(&self, name: &str) -> Option<bool> {
        self.get(name).and_then(Value::as_bool)
    }

    pub fn user(&self, name: &str) -> Option<&User> {
        self.get(name).and_then(Value::as_user)
    }

    pub fn channel(&self, name: &str) -> Option<&Channel> {
        self.get(name).and_then(Value::as_channel)
    }

    pub fn role(&self, name: &str) -> Option<&Role> {
        self.get(name).and_then(Value::as_role)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_argument_text() {
        let err = InvalidArgument::for_type(ArgType::Integer);
        assert_eq!(
            err.to_string(),
            "Invalid argument type. Expected `integer`.\n**Example:** `10, 0, 400, -5`"
        );
        assert_eq!(
            InvalidArgument::for_type(ArgType::String).to_string(),
            "Invalid argument type. Expected `string`."
        );
    }

    #[test]
    fn test_schema_accepts_common_shapes() {
        assert!(validate_schema(&[]).is_ok());
        assert!(
            validate_schema(&[
                ArgSpec::new("ids", ArgType::Integer).variadic(),
                ArgSpec::new("reason", ArgType::String).optional(),
            ])
            .is_ok()
        );
        assert!(
            validate_schema(&[
                ArgSpec::new("user", ArgType::User),
                ArgSpec::new("reason", ArgType::String).optional().remaining(),
            ])
            .is_ok()
        );
    }

    #[test]
    fn test_schema_rejects_bad_shapes() {
        let late_variadic = [ArgSpec::new("a", ArgType::String), ArgSpec::new("b", ArgType::String).variadic()];
        assert!(validate_schema(&late_variadic).unwrap_err().contains("must come first"));

        let early_remaining = [ArgSpec::new("a", ArgType::String).remaining(), ArgSpec::new("b", ArgType::String)];
        assert!(validate_schema(&early_remaining).unwrap_err().contains("not last"));

        let required_after_optional =
            [ArgSpec::new("a", ArgType::String).optional(), ArgSpec::new("b", ArgType::String)];
        assert!(validate_schema(&required_after_optional).unwrap_err().contains("follows an optional"));

        let duplicate = [ArgSpec::new("a", ArgType::String), ArgSpec::new("a", ArgType::Integer)];
        assert!(validate_schema(&duplicate).unwrap_err().contains("twice"));

        let both = [ArgSpec::new("v", ArgType::String).variadic(), ArgSpec::new("r", ArgType::String).remaining()];
        assert!(validate_schema(&both).is_err());
    }

    #[test]
    fn test_union_keeps_declared_order() {
        let spec = ArgSpec::new("target", ArgType::User).or(ArgType::Integer).or(ArgType::User);
        assert_eq!(spec.types, vec![ArgType::User, ArgType::Integer]);
    }

    #[test]
    fn test_args_accessors() {
        let mut args = Args::new();
        args.insert("n", Value::Integer(0));
        args.insert("flag", Value::Boolean(false));
        args.push_variadic(Value::String("x".into()));
        assert_eq!(args.int("n"), Some(0));
        assert_eq!(args.bool("flag"), Some(false));
        assert_eq!(args.float("n"), Some(0.0));
        assert_eq!(args.str("n"), None);
        assert_eq!(args.variadic().len(), 1);
    }
}
