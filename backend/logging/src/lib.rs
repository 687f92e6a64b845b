//! Structured logging for Amethyst.
//!
//! Subscriber setup with console and rolling file output, secret redaction
//! and command audit events.

pub mod event_logger;
pub mod logger;
pub mod redact;

pub use event_logger::{CommandEvent, EventLogEntry, EventLogger, COMMAND_EVENTS_TARGET};
pub use logger::init_logger;
pub use redact::redact_sensitive_data;
