//! Recording doubles for the chat collaborators and message fixtures.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use amethyst_core::{
    AmethystError, Channel, ChatClient, Destination, IncomingMessage, Lookup, MemorySettings,
    OutgoingMessage, Permissions, RosterLookup, SentMessage, User,
};
use anyhow::Result;
use async_trait::async_trait;

use crate::dispatch::{Host, HostConfig};
use crate::module::{ModuleSource, StaticModules};

pub const OWNER_ID: u64 = 1;
pub const AUTHOR_ID: u64 = 7;
pub const CHANNEL_ID: u64 = 100;
pub const PRIVATE_CHANNEL_ID: u64 = 200;

static MESSAGE_IDS: AtomicU64 = AtomicU64::new(1_000);

fn author() -> User {
    User::new(AUTHOR_ID, "tester", "0007")
}

/// A message from a regular member in a guild text channel.
pub fn message(content: &str) -> IncomingMessage {
    let id = MESSAGE_IDS.fetch_add(1, Ordering::Relaxed);
    IncomingMessage::new(id, content, author(), Channel::text(CHANNEL_ID, "general"))
}

/// Same as [`message`], but sent by [`OWNER_ID`].
pub fn owner_message(content: &str) -> IncomingMessage {
    let mut msg = message(content);
    msg.author = User::new(OWNER_ID, "owner", "0001");
    msg
}

pub fn private_message(content: &str) -> IncomingMessage {
    let id = MESSAGE_IDS.fetch_add(1, Ordering::Relaxed);
    IncomingMessage::new(id, content, author(), Channel::private(PRIVATE_CHANNEL_ID))
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

// ---------------------------------------------------------------------------
// Recording client
// ---------------------------------------------------------------------------

/// Records every send and delete, and answers prompts from a queue.
pub struct RecordingClient {
    sent: Mutex<Vec<(Destination, OutgoingMessage)>>,
    deleted: Mutex<Vec<SentMessage>>,
    replies: Mutex<VecDeque<String>>,
    author_perms: Mutex<Permissions>,
    bot_perms: Mutex<Permissions>,
    dms_blocked: AtomicBool,
    next_id: AtomicU64,
}

impl Default for RecordingClient {
    fn default() -> Self {
        Self {
            sent: Mutex::default(),
            deleted: Mutex::default(),
            replies: Mutex::default(),
            author_perms: Mutex::new(Permissions::none()),
            bot_perms: Mutex::new(Permissions::all()),
            dms_blocked: AtomicBool::new(false),
            next_id: AtomicU64::new(1),
        }
    }
}

impl RecordingClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<(Destination, OutgoingMessage)> {
        lock(&self.sent).clone()
    }

    /// Text of every message sent, in order.
    pub fn texts(&self) -> Vec<String> {
        lock(&self.sent).iter().filter_map(|(_, m)| m.content.clone()).collect()
    }

    /// Text of every message sent to `to`.
    pub fn texts_to(&self, to: Destination) -> Vec<String> {
        lock(&self.sent)
            .iter()
            .filter(|(dest, _)| *dest == to)
            .filter_map(|(_, m)| m.content.clone())
            .collect()
    }

    pub fn deleted(&self) -> Vec<SentMessage> {
        lock(&self.deleted).clone()
    }

    /// Queue the author's answer to the next prompt.
    pub fn queue_reply(&self, content: &str) {
        lock(&self.replies).push_back(content.to_string());
    }

    pub fn grant_author(&self, perms: Permissions) {
        *lock(&self.author_perms) = perms;
    }

    pub fn grant_bot(&self, perms: Permissions) {
        *lock(&self.bot_perms) = perms;
    }

    /// Make direct messages to users fail.
    pub fn block_dms(&self) {
        self.dms_blocked.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl ChatClient for RecordingClient {
    async fn send(&self, to: &Destination, message: OutgoingMessage) -> Result<SentMessage> {
        if message.is_empty() {
            return Err(AmethystError::EmptyMessage.into());
        }
        let (channel_id, blocked) = match to {
            Destination::Channel(id) => (*id, false),
            Destination::User(id) => (*id, self.dms_blocked.load(Ordering::SeqCst)),
        };
        if blocked {
            return Err(AmethystError::SendFailed {
                destination: to.to_string(),
                message: "Cannot send messages to this user".to_string(),
            }
            .into());
        }
        lock(&self.sent).push((*to, message));
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        Ok(SentMessage { id, channel_id })
    }

    async fn delete(&self, message: &SentMessage) -> Result<()> {
        lock(&self.deleted).push(*message);
        Ok(())
    }

    async fn next_reply(&self, channel_id: u64, author_id: u64) -> Result<Option<IncomingMessage>> {
        let queued = lock(&self.replies).pop_front();
        match queued {
            Some(content) => {
                let id = MESSAGE_IDS.fetch_add(1, Ordering::Relaxed);
                Ok(Some(IncomingMessage::new(
                    id,
                    content,
                    User::new(author_id, "tester", "0007"),
                    Channel::text(channel_id, "general"),
                )))
            }
            None => std::future::pending().await,
        }
    }

    async fn permissions(&self, _channel: &Channel, user_id: Option<u64>) -> Result<Permissions> {
        Ok(match user_id {
            Some(_) => lock(&self.author_perms).clone(),
            None => lock(&self.bot_perms).clone(),
        })
    }
}

// ---------------------------------------------------------------------------
// Host fixture
// ---------------------------------------------------------------------------

/// Builds hosts around one shared [`RecordingClient`] and settings store.
pub struct TestHost {
    pub client: Arc<RecordingClient>,
    pub settings: Arc<MemorySettings>,
    config: HostConfig,
    lookup: Arc<dyn Lookup>,
    source: Arc<dyn ModuleSource>,
    owners: Vec<u64>,
    blacklist: Vec<u64>,
}

impl Default for TestHost {
    fn default() -> Self {
        Self {
            client: Arc::new(RecordingClient::new()),
            settings: Arc::new(MemorySettings::new()),
            config: HostConfig::default(),
            lookup: Arc::new(RosterLookup::new()),
            source: Arc::new(StaticModules::new()),
            owners: vec![OWNER_ID],
            blacklist: Vec::new(),
        }
    }
}

impl TestHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn config(mut self, config: HostConfig) -> Self {
        self.config = config;
        self
    }

    pub fn lookup(mut self, lookup: impl Lookup + 'static) -> Self {
        self.lookup = Arc::new(lookup);
        self
    }

    pub fn source(mut self, source: Arc<dyn ModuleSource>) -> Self {
        self.source = source;
        self
    }

    /// Replace the configured owners. [`OWNER_ID`] is the default.
    pub fn owners(mut self, owners: impl IntoIterator<Item = u64>) -> Self {
        self.owners = owners.into_iter().collect();
        self
    }

    pub fn blacklist(mut self, users: impl IntoIterator<Item = u64>) -> Self {
        self.blacklist = users.into_iter().collect();
        self
    }

    pub fn message_limit(mut self, limit: usize) -> Self {
        self.config.message_limit = limit;
        self
    }

    pub fn prompt_timeout(mut self, timeout: Duration) -> Self {
        self.config.prompt_timeout = timeout;
        self
    }

    /// A fresh host sharing this fixture's client and settings.
    pub fn build(&self) -> Arc<Host> {
        Host::builder(self.client.clone())
            .config(self.config.clone())
            .lookup(self.lookup.clone())
            .settings(self.settings.clone())
            .source(self.source.clone())
            .owners(self.owners.iter().copied())
            .blacklist(self.blacklist.iter().copied())
            .build()
    }
}
