use serde::{Deserialize, Serialize};

/// A chat account as seen by the command engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: u64,
    pub name: String,
    /// Four digit tag distinguishing users sharing a name.
    pub discriminator: String,
    /// Server-specific nickname, if any.
    #[serde(default)]
    pub nick: Option<String>,
    #[serde(default)]
    pub bot: bool,
}

impl User {
    pub fn new(id: u64, name: impl Into<String>, discriminator: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            discriminator: discriminator.into(),
            nick: None,
            bot: false,
        }
    }

    pub fn with_nick(mut self, nick: impl Into<String>) -> Self {
        self.nick = Some(nick.into());
        self
    }

    pub fn as_bot(mut self) -> Self {
        self.bot = true;
        self
    }

    /// `name#discriminator`
    pub fn tag(&self) -> String {
        format!("{}#{}", self.name, self.discriminator)
    }

    pub fn mention(&self) -> String {
        format!("<@{}>", self.id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    pub id: u64,
    pub name: String,
}

impl Role {
    pub fn new(id: u64, name: impl Into<String>) -> Self {
        Self { id, name: name.into() }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChannelKind {
    Text { nsfw: bool },
    Voice,
    /// Direct messages between the bot and one user.
    Private,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Channel {
    pub id: u64,
    pub name: String,
    pub kind: ChannelKind,
}

impl Channel {
    pub fn text(id: u64, name: impl Into<String>) -> Self {
        Self { id, name: name.into(), kind: ChannelKind::Text { nsfw: false } }
    }

    pub fn nsfw(id: u64, name: impl Into<String>) -> Self {
        Self { id, name: name.into(), kind: ChannelKind::Text { nsfw: true } }
    }

    pub fn voice(id: u64, name: impl Into<String>) -> Self {
        Self { id, name: name.into(), kind: ChannelKind::Voice }
    }

    pub fn private(id: u64) -> Self {
        Self { id, name: String::new(), kind: ChannelKind::Private }
    }

    pub fn is_private(&self) -> bool {
        matches!(self.kind, ChannelKind::Private)
    }

    pub fn is_voice(&self) -> bool {
        matches!(self.kind, ChannelKind::Voice)
    }

    pub fn is_nsfw(&self) -> bool {
        matches!(self.kind, ChannelKind::Text { nsfw: true })
    }
}

/// A message delivered by the gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncomingMessage {
    pub id: u64,
    pub content: String,
    pub author: User,
    /// Roles the author holds in the guild the message came from.
    #[serde(default)]
    pub author_roles: Vec<Role>,
    pub channel: Channel,
    /// `None` for direct messages.
    #[serde(default)]
    pub guild_id: Option<u64>,
}

impl IncomingMessage {
    pub fn new(id: u64, content: impl Into<String>, author: User, channel: Channel) -> Self {
        let guild_id = if channel.is_private() { None } else { Some(0) };
        Self {
            id,
            content: content.into(),
            author,
            author_roles: Vec::new(),
            channel,
            guild_id,
        }
    }

    pub fn with_roles(mut self, roles: Vec<Role>) -> Self {
        self.author_roles = roles;
        self
    }

    pub fn in_guild(mut self, guild_id: u64) -> Self {
        self.guild_id = Some(guild_id);
        self
    }

    pub fn is_private(&self) -> bool {
        self.channel.is_private()
    }
}
