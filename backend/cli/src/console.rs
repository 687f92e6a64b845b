//! Console gateway: stdin lines in, stdout messages out.

use std::io::Write;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use amethyst_core::{
    AmethystError, Channel, ChatClient, Destination, Embed, IncomingMessage, OutgoingMessage,
    Permissions, SentMessage, User,
};
use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::oneshot;
use tracing::debug;

pub const CONSOLE_CHANNEL_ID: u64 = 1;
pub const CONSOLE_CHANNEL_NAME: &str = "console";

/// A chat client whose only channel is the terminal.
pub struct ConsoleClient {
    user: User,
    out: Mutex<Box<dyn Write + Send>>,
    /// Set while a prompt waits for the next console line.
    waiter: Mutex<Option<oneshot::Sender<String>>>,
    next_id: AtomicU64,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl ConsoleClient {
    pub fn new(user: User) -> Self {
        Self::with_writer(user, Box::new(std::io::stdout()))
    }

    pub fn with_writer(user: User, out: Box<dyn Write + Send>) -> Self {
        Self { user, out: Mutex::new(out), waiter: Mutex::new(None), next_id: AtomicU64::new(1) }
    }

    pub fn user(&self) -> &User {
        &self.user
    }

    pub fn channel(&self) -> Channel {
        Channel::text(CONSOLE_CHANNEL_ID, CONSOLE_CHANNEL_NAME)
    }

    /// Wrap one typed line as a message from the console user.
    pub fn message(&self, line: &str) -> IncomingMessage {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        IncomingMessage::new(id, line, self.user.clone(), self.channel())
    }

    /// Hand `line` to a waiting prompt. Gives the line back if nobody waits.
    pub fn offer_reply(&self, line: String) -> Option<String> {
        match lock(&self.waiter).take() {
            Some(tx) => tx.send(line).err(),
            None => Some(line),
        }
    }

    fn render_embed(embed: &Embed) -> String {
        let mut lines = Vec::new();
        if let Some(title) = &embed.title {
            lines.push(format!("== {title} =="));
        }
        if let Some(description) = &embed.description {
            lines.push(description.clone());
        }
        for field in &embed.fields {
            lines.push(format!("{}: {}", field.name, field.value));
        }
        lines.join("\n")
    }
}

#[async_trait]
impl ChatClient for ConsoleClient {
    async fn send(&self, to: &Destination, message: OutgoingMessage) -> Result<SentMessage> {
        if message.is_empty() {
            return Err(AmethystError::EmptyMessage.into());
        }
        let mut body = message.content.unwrap_or_default();
        if let Some(embed) = &message.embed {
            if !body.is_empty() {
                body.push('\n');
            }
            body.push_str(&Self::render_embed(embed));
        }

        let label = match to {
            Destination::Channel(_) => String::new(),
            Destination::User(id) => format!("[dm -> {id}] "),
        };
        {
            let mut out = lock(&self.out);
            writeln!(out, "{label}{body}").and_then(|_| out.flush()).map_err(|err| {
                AmethystError::SendFailed { destination: to.to_string(), message: err.to_string() }
            })?;
        }

        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        Ok(SentMessage { id, channel_id: CONSOLE_CHANNEL_ID })
    }

    async fn delete(&self, message: &SentMessage) -> Result<()> {
        debug!(id = message.id, "[Console] Message removed");
        Ok(())
    }

    async fn next_reply(&self, channel_id: u64, author_id: u64) -> Result<Option<IncomingMessage>> {
        if channel_id != CONSOLE_CHANNEL_ID || author_id != self.user.id {
            return std::future::pending().await;
        }
        let (tx, rx) = oneshot::channel();
        *lock(&self.waiter) = Some(tx);
        // A dropped sender means the console closed.
        Ok(rx.await.ok().map(|line| self.message(&line)))
    }

    async fn permissions(&self, _channel: &Channel, _user_id: Option<u64>) -> Result<Permissions> {
        Ok(Permissions::all())
    }
}
