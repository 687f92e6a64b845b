//! Message parsing: prefix stripping, command/suffix split and tokenizing.
//!
//! Tokenizing follows POSIX shell quoting:
//! - whitespace outside quotes separates tokens
//! - `'...'` is taken literally
//! - `"..."` groups, and inside it `\"` and `\\` are escapes
//! - outside quotes, `\x` yields `x`
//! - adjacent quoted and unquoted parts join into one token
//! - an unterminated quote runs to the end of the input
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Prefixes
// ---------------------------------------------------------------------------

/// The first prefix `text` starts with, and the text after it.
pub fn match_prefix<'t, 'p>(text: &'t str, prefixes: &'p [String]) -> Option<(&'p str, &'t str)> {
    prefixes
        .iter()
        .find_map(|p| text.strip_prefix(p.as_str()).map(|rest| (p.as_str(), rest)))
}

/// Remove the first matching prefix, or return `text` unchanged.
pub fn strip_prefix<'t>(text: &'t str, prefixes: &[String]) -> &'t str {
    match_prefix(text, prefixes).map_or(text, |(_, rest)| rest)
}

// ---------------------------------------------------------------------------
// Command / suffix
// ---------------------------------------------------------------------------

/// Split at the first whitespace into `(command_token, raw_suffix)`.
pub fn split_command(text: &str) -> (&str, &str) {
    text.split_once(char::is_whitespace).unwrap_or((text, ""))
}

pub fn tokenize(raw: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_token = false;
    let mut chars = raw.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            c if c.is_whitespace() => {
                if in_token {
                    tokens.push(std::mem::take(&mut current));
                    in_token = false;
                }
            }
            '\'' => {
                in_token = true;
                for c in chars.by_ref() {
                    if c == '\'' {
                        break;
                    }
                    current.push(c);
                }
            }
            '"' => {
                in_token = true;
                while let Some(c) = chars.next() {
                    match c {
                        '"' => break,
                        '\\' => match chars.next_if(|n| matches!(n, '"' | '\\')) {
                            Some(escaped) => current.push(escaped),
                            None => current.push('\\'),
                        },
                        _ => current.push(c),
                    }
                }
            }
            '\\' => {
                in_token = true;
                current.push(chars.next().unwrap_or('\\'));
            }
            _ => {
                in_token = true;
                current.push(c);
            }
        }
    }

    if in_token {
        tokens.push(current);
    }
    tokens
}

/// Raw text after the first `n` tokens of `raw`, leading whitespace removed.
///
/// Token boundaries follow the same quoting rules as [`tokenize`], so
/// `skip_tokens(raw, k)` lines up with `tokenize(raw)[k..]`.
pub fn skip_tokens(raw: &str, n: usize) -> &str {
    let mut rest = raw.trim_start();
    for _ in 0..n {
        if rest.is_empty() {
            break;
        }
        rest = after_token(rest);
    }
    rest
}

/// `text` starts a token. Returns what follows it, trimmed at the start.
fn after_token(text: &str) -> &str {
    let mut quote: Option<char> = None;
    let mut chars = text.char_indices().peekable();

    while let Some((i, c)) = chars.next() {
        match (quote, c) {
            (None, c) if c.is_whitespace() => return text[i..].trim_start(),
            (None, '\\') => {
                chars.next();
            }
            (None, '\'' | '"') => quote = Some(c),
            (Some('"'), '\\') => {
                chars.next_if(|&(_, n)| matches!(n, '"' | '\\'));
            }
            (Some(q), c) if c == q => quote = None,
            _ => {}
        }
    }
    ""
}

// ---------------------------------------------------------------------------
// Parsed invocation
// ---------------------------------------------------------------------------

/// A message that looks like a command invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedCommand {
    pub prefix: String,
    pub command: String,
    /// Raw text after the command token.
    pub suffix: String,
    pub args: Vec<String>,
}

impl ParsedCommand {
    /// Parse `content`, or `None` if it is not a command.
    ///
    /// Not a command: no prefix matches, nothing follows the prefix, or the
    /// prefix is followed by whitespace.
    pub fn parse(content: &str, prefixes: &[String]) -> Option<Self> {
        let (prefix, rest) = match_prefix(content, prefixes)?;
        if rest.is_empty() || rest.starts_with(char::is_whitespace) {
            return None;
        }
        let (command, suffix) = split_command(rest);
        Some(Self {
            prefix: prefix.to_string(),
            command: command.to_string(),
            suffix: suffix.to_string(),
            args: tokenize(suffix),
        })
    }
}
