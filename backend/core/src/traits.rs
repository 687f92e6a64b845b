use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;

use crate::message::{Channel, IncomingMessage, Role, User};
use crate::types::{Destination, OutgoingMessage, Permissions, SentMessage};

/// Outbound side of the chat gateway.
#[async_trait]
pub trait ChatClient: Send + Sync {
    /// Deliver one message. Length limits are the caller's concern.
    async fn send(&self, to: &Destination, message: OutgoingMessage) -> Result<SentMessage>;

    async fn delete(&self, message: &SentMessage) -> Result<()>;

    /// Wait for the next message by `author_id` in `channel_id`.
    ///
    /// May wait forever; callers bound it with a timeout. `None` means the
    /// gateway closed.
    async fn next_reply(&self, channel_id: u64, author_id: u64) -> Result<Option<IncomingMessage>>;

    /// Effective permissions in `channel` for `user_id`, or for the bot itself when `None`.
    async fn permissions(&self, channel: &Channel, user_id: Option<u64>) -> Result<Permissions>;
}

/// Fuzzy entity search scoped to the origin message's guild.
#[async_trait]
pub trait Lookup: Send + Sync {
    async fn members(&self, origin: &IncomingMessage, query: &str) -> Result<Vec<User>>;

    async fn channels(
        &self,
        origin: &IncomingMessage,
        query: &str,
        voice_only: bool,
    ) -> Result<Vec<Channel>>;

    async fn roles(&self, origin: &IncomingMessage, query: &str) -> Result<Vec<Role>>;
}

/// Key/value persistence for settings blobs.
#[async_trait]
pub trait SettingsStore: Send + Sync {
    async fn load(&self, key: &str) -> Result<Option<Value>>;

    async fn save(&self, key: &str, value: Value) -> Result<()>;
}
