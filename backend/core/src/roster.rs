//! In-process [`Lookup`] over a fixed roster of members, channels and roles.

use anyhow::Result;
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::message::{Channel, IncomingMessage, Role, User};
use crate::traits::Lookup;

static USER_MENTION: Lazy<Regex> = Lazy::new(|| Regex::new(r"^<@!?(\d+)>$").unwrap());
static CHANNEL_MENTION: Lazy<Regex> = Lazy::new(|| Regex::new(r"^<#(\d+)>$").unwrap());
static ROLE_MENTION: Lazy<Regex> = Lazy::new(|| Regex::new(r"^<@&(\d+)>$").unwrap());

fn mentioned_id(pattern: &Regex, query: &str) -> Option<u64> {
    pattern.captures(query).and_then(|caps| caps[1].parse().ok())
}

fn all_digits(query: &str) -> bool {
    !query.is_empty() && query.bytes().all(|b| b.is_ascii_digit())
}

// ---------------------------------------------------------------------------
// Matching rules
// ---------------------------------------------------------------------------

/// Members matching `query`.
///
/// A mention matches the exact id. A four digit query matches the
/// discriminator; any other all-digit query matches a substring of the id or
/// the name. Everything else is a case-insensitive substring of the name or
/// nickname.
pub fn match_members(members: &[User], query: &str) -> Vec<User> {
    if let Some(id) = mentioned_id(&USER_MENTION, query) {
        return members.iter().filter(|m| m.id == id).cloned().collect();
    }

    if all_digits(query) {
        return if query.len() == 4 {
            members.iter().filter(|m| m.discriminator == query).cloned().collect()
        } else {
            members
                .iter()
                .filter(|m| m.id.to_string().contains(query) || m.name.contains(query))
                .cloned()
                .collect()
        };
    }

    let needle = query.to_lowercase();
    members
        .iter()
        .filter(|m| {
            m.name.to_lowercase().contains(&needle)
                || m.nick.as_ref().is_some_and(|n| n.to_lowercase().contains(&needle))
        })
        .cloned()
        .collect()
}

pub fn match_channels(channels: &[Channel], query: &str, voice_only: bool) -> Vec<Channel> {
    let candidates = channels.iter().filter(|c| !voice_only || c.is_voice());

    if let Some(id) = mentioned_id(&CHANNEL_MENTION, query) {
        return candidates.filter(|c| c.id == id).cloned().collect();
    }

    let needle = query.to_lowercase();
    candidates
        .filter(|c| c.name.to_lowercase().contains(&needle) || c.id.to_string().contains(query))
        .cloned()
        .collect()
}

pub fn match_roles(roles: &[Role], query: &str) -> Vec<Role> {
    if let Some(id) = mentioned_id(&ROLE_MENTION, query) {
        return roles.iter().filter(|r| r.id == id).cloned().collect();
    }

    let needle = query.to_lowercase();
    roles.iter().filter(|r| r.name.to_lowercase().contains(&needle)).cloned().collect()
}

// ---------------------------------------------------------------------------
// Roster
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
pub struct RosterLookup {
    members: Vec<User>,
    channels: Vec<Channel>,
    roles: Vec<Role>,
}

impl RosterLookup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_member(mut self, user: User) -> Self {
        self.members.push(user);
        self
    }

    pub fn with_channel(mut self, channel: Channel) -> Self {
        self.channels.push(channel);
        self
    }

    pub fn with_role(mut self, role: Role) -> Self {
        self.roles.push(role);
        self
    }
}

#[async_trait]
impl Lookup for RosterLookup {
    async fn members(&self, _origin: &IncomingMessage, query: &str) -> Result<Vec<User>> {
        Ok(match_members(&self.members, query))
    }

    async fn channels(
        &self,
        _origin: &IncomingMessage,
        query: &str,
        voice_only: bool,
    ) -> Result<Vec<Channel>> {
        Ok(match_channels(&self.channels, query, voice_only))
    }

    async fn roles(&self, _origin: &IncomingMessage, query: &str) -> Result<Vec<Role>> {
        Ok(match_roles(&self.roles, query))
    }
}
