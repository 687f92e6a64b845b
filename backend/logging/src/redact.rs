//! Scrubs bot tokens and bearer credentials from strings prior to logging.

use regex::Regex;
use std::sync::LazyLock;

// Three dot separated base64url segments, as chat bot tokens are issued.
static BOT_TOKEN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[A-Za-z\d_-]{23,28}\.[A-Za-z\d_-]{6,7}\.[A-Za-z\d_-]{27,}").unwrap());
static BEARER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(Bot|Bearer)\s+[a-zA-Z0-9\-\._~+/]{20,}=*").unwrap());

/// Redacts sensitive patterns in a string.
pub fn redact_sensitive_data(input: &str) -> String {
    let redacted = BEARER_RE.replace_all(input, "$1 [REDACTED_TOKEN]");
    BOT_TOKEN_RE.replace_all(&redacted, "[REDACTED_TOKEN]").into_owned()
}
