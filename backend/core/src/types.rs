use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Outgoing messages
// ---------------------------------------------------------------------------

/// Where an outgoing message goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "id", rename_all = "snake_case")]
pub enum Destination {
    Channel(u64),
    /// Direct message to a user.
    User(u64),
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Destination::Channel(id) => write!(f, "channel {id}"),
            Destination::User(id) => write!(f, "user {id}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmbedField {
    pub name: String,
    pub value: String,
    pub inline: bool,
}

/// Structured rich message.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Embed {
    pub title: Option<String>,
    pub description: Option<String>,
    pub color: Option<u32>,
    #[serde(default)]
    pub fields: Vec<EmbedField>,
}

impl Embed {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn field(mut self, name: impl Into<String>, value: impl Into<String>, inline: bool) -> Self {
        self.fields.push(EmbedField { name: name.into(), value: value.into(), inline });
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutgoingMessage {
    pub content: Option<String>,
    pub embed: Option<Embed>,
}

impl OutgoingMessage {
    pub fn text(content: impl Into<String>) -> Self {
        Self { content: Some(content.into()), embed: None }
    }

    pub fn embed(embed: Embed) -> Self {
        Self { content: None, embed: Some(embed) }
    }

    pub fn is_empty(&self) -> bool {
        self.content.as_deref().map_or(true, str::is_empty) && self.embed.is_none()
    }
}

/// Handle to a message the bot has sent, used for later deletion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SentMessage {
    pub id: u64,
    pub channel_id: u64,
}

// ---------------------------------------------------------------------------
// Permissions
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Permission {
    Administrator,
    KickMembers,
    BanMembers,
    ManageChannels,
    ManageServer,
    ManageRoles,
    ManageMessages,
    ManageNicknames,
    ReadMessages,
    SendMessages,
    EmbedLinks,
    AttachFiles,
    MentionEveryone,
    Connect,
    Speak,
}

impl Permission {
    pub const ALL: [Permission; 15] = [
        Permission::Administrator,
        Permission::KickMembers,
        Permission::BanMembers,
        Permission::ManageChannels,
        Permission::ManageServer,
        Permission::ManageRoles,
        Permission::ManageMessages,
        Permission::ManageNicknames,
        Permission::ReadMessages,
        Permission::SendMessages,
        Permission::EmbedLinks,
        Permission::AttachFiles,
        Permission::MentionEveryone,
        Permission::Connect,
        Permission::Speak,
    ];

    /// Human-readable label, e.g. "Manage Server".
    pub fn label(&self) -> &'static str {
        match self {
            Permission::Administrator => "Administrator",
            Permission::KickMembers => "Kick Members",
            Permission::BanMembers => "Ban Members",
            Permission::ManageChannels => "Manage Channels",
            Permission::ManageServer => "Manage Server",
            Permission::ManageRoles => "Manage Roles",
            Permission::ManageMessages => "Manage Messages",
            Permission::ManageNicknames => "Manage Nicknames",
            Permission::ReadMessages => "Read Messages",
            Permission::SendMessages => "Send Messages",
            Permission::EmbedLinks => "Embed Links",
            Permission::AttachFiles => "Attach Files",
            Permission::MentionEveryone => "Mention Everyone",
            Permission::Connect => "Connect",
            Permission::Speak => "Speak",
        }
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A set of granted permissions. `Administrator` implies everything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Permissions(BTreeSet<Permission>);

impl Permissions {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn all() -> Self {
        Self(Permission::ALL.into_iter().collect())
    }

    pub fn contains(&self, perm: Permission) -> bool {
        self.0.contains(&Permission::Administrator) || self.0.contains(&perm)
    }

    pub fn contains_all(&self, perms: &[Permission]) -> bool {
        perms.iter().all(|p| self.contains(*p))
    }

    /// Members of `perms` this set does not grant.
    pub fn missing(&self, perms: &[Permission]) -> Vec<Permission> {
        perms.iter().copied().filter(|p| !self.contains(*p)).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = Permission> + '_ {
        self.0.iter().copied()
    }
}

impl FromIterator<Permission> for Permissions {
    fn from_iter<I: IntoIterator<Item = Permission>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_administrator_implies_everything() {
        let perms: Permissions = [Permission::Administrator].into_iter().collect();
        assert!(perms.contains(Permission::BanMembers));
        assert!(perms.missing(&[Permission::Speak, Permission::KickMembers]).is_empty());
    }

    #[test]
    fn test_missing_lists_ungranted() {
        let perms: Permissions = [Permission::SendMessages].into_iter().collect();
        assert_eq!(
            perms.missing(&[Permission::SendMessages, Permission::ManageServer]),
            vec![Permission::ManageServer]
        );
        assert_eq!(Permission::ManageServer.to_string(), "Manage Server");
    }

    #[test]
    fn test_outgoing_emptiness() {
        assert!(OutgoingMessage::default().is_empty());
        assert!(OutgoingMessage::text("").is_empty());
        assert!(!OutgoingMessage::embed(Embed::new()).is_empty());
    }
}
