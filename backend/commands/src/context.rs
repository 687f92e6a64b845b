//! Per-invocation context handed to checks, converters and handlers.

use std::sync::Arc;

use amethyst_core::{
    AmethystError, Destination, Embed, IncomingMessage, OutgoingMessage, Permission, SentMessage, User,
};
use amethyst_markdown::{escape_mentions, split_message};
use anyhow::Result;

use crate::dispatch::Host;
use crate::parsing::{ParsedCommand, skip_tokens};

/// Whose permissions to inspect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Who {
    /// The bot account.
    Bot,
    Author,
}

/// Owned by exactly one in-flight dispatch.
pub struct Context {
    pub msg: IncomingMessage,
    /// Prefix the invocation used.
    pub prefix: String,
    /// Command path so far, space separated. Grows as groups descend.
    pub cmd: String,
    /// Raw text after the current command path.
    pub suffix: String,
    /// Tokens after the current command path.
    pub args: Vec<String>,
    pub host: Arc<Host>,
}

impl Context {
    pub fn new(msg: IncomingMessage, parsed: ParsedCommand, host: Arc<Host>) -> Self {
        Self {
            msg,
            prefix: parsed.prefix,
            cmd: parsed.command,
            suffix: parsed.suffix,
            args: parsed.args,
            host,
        }
    }

    pub fn author(&self) -> &User {
        &self.msg.author
    }

    pub fn is_private(&self) -> bool {
        self.msg.is_private()
    }

    pub fn is_owner(&self) -> bool {
        self.host.is_owner(self.msg.author.id)
    }

    /// Move one token from the arguments onto the command path.
    pub(crate) fn descend(&mut self) {
        if self.args.is_empty() {
            return;
        }
        let token = self.args.remove(0);
        self.cmd = format!("{} {token}", self.cmd);
        self.suffix = skip_tokens(&self.suffix, 1).to_string();
    }

    /// Send text to the originating channel, split to the message limit.
    pub async fn send(&self, text: impl AsRef<str>) -> Result<Vec<SentMessage>> {
        self.send_to(Destination::Channel(self.msg.channel.id), text.as_ref()).await
    }

    /// Send text to the author directly.
    pub async fn send_author(&self, text: impl AsRef<str>) -> Result<Vec<SentMessage>> {
        self.send_to(Destination::User(self.msg.author.id), text.as_ref()).await
    }

    pub async fn send_to(&self, to: Destination, text: &str) -> Result<Vec<SentMessage>> {
        let text = escape_mentions(text);
        if text.is_empty() {
            return Err(AmethystError::EmptyMessage.into());
        }

        let client = self.host.client();
        let mut sent = Vec::new();
        for chunk in split_message(&text, self.host.config().message_limit) {
            sent.push(client.send(&to, OutgoingMessage::text(chunk)).await?);
        }
        Ok(sent)
    }

    pub async fn send_embed(&self, embed: Embed) -> Result<SentMessage> {
        let to = Destination::Channel(self.msg.channel.id);
        self.host.client().send(&to, OutgoingMessage::embed(embed)).await
    }

    pub async fn has_permissions(&self, perms: &[Permission], who: Who) -> Result<bool> {
        let user = match who {
            Who::Bot => None,
            Who::Author => Some(self.msg.author.id),
        };
        let granted = self.host.client().permissions(&self.msg.channel, user).await?;
        Ok(granted.contains_all(perms))
    }

    pub async fn has_permission(&self, perm: Permission, who: Who) -> Result<bool> {
        self.has_permissions(&[perm], who).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{TestHost, message};

    #[tokio::test]
    async fn test_descend_peels_one_token() {
        let host = TestHost::new().build();
        let mut ctx = host.context(message("!config set volume 5")).unwrap();
        ctx.descend();
        assert_eq!(ctx.cmd, "config set");
        assert_eq!(ctx.suffix, "volume 5");
        assert_eq!(ctx.args, vec!["volume", "5"]);
        ctx.descend();
        ctx.descend();
        ctx.descend();
        assert_eq!(ctx.cmd, "config set volume 5");
        assert_eq!(ctx.suffix, "");
        assert!(ctx.args.is_empty());
    }

    #[tokio::test]
    async fn test_descend_with_uneven_spacing_and_quotes() {
        let host = TestHost::new().build();
        let mut ctx = host.context(message("!config  set   volume 5")).unwrap();
        ctx.descend();
        assert_eq!(ctx.cmd, "config set");
        assert_eq!(ctx.suffix, "volume 5");
        assert_eq!(ctx.args, vec!["volume", "5"]);

        let mut ctx = host.context(message(r#"!config "set" "big volume" 5"#)).unwrap();
        ctx.descend();
        assert_eq!(ctx.suffix, r#""big volume" 5"#);
        ctx.descend();
        assert_eq!(ctx.cmd, "config set big volume");
        assert_eq!(ctx.suffix, "5");
        assert_eq!(ctx.args, vec!["5"]);
    }

    #[tokio::test]
    async fn test_send_escapes_and_splits() {
        let test = TestHost::new().message_limit(100);
        let host = test.build();
        let ctx = host.context(message("!x")).unwrap();
        let text = format!("@everyone {}", "word ".repeat(40));
        let sent = ctx.send(&text).await.unwrap();
        assert_eq!(sent.len(), 3);

        let texts = test.client.texts();
        assert!(texts[0].starts_with("@\u{200b}everyone"));
        assert!(texts.iter().all(|t| t.chars().count() <= 100));
    }

    #[tokio::test]
    async fn test_send_nothing_is_an_error() {
        let host = TestHost::new().build();
        let ctx = host.context(message("!x")).unwrap();
        assert!(ctx.send("").await.is_err());
    }
}
