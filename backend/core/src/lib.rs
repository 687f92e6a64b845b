pub mod error;
pub mod message;
pub mod roster;
pub mod settings;
pub mod traits;
pub mod types;

pub use error::AmethystError;
pub use message::{Channel, ChannelKind, IncomingMessage, Role, User};
pub use roster::RosterLookup;
pub use settings::{BotSettings, JsonFileStore, MemorySettings, BOT_SETTINGS_KEY};
pub use traits::{ChatClient, Lookup, SettingsStore};
pub use types::{Destination, Embed, EmbedField, OutgoingMessage, Permission, Permissions, SentMessage};
