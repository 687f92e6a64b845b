use thiserror::Error;

/// Top-level error type for the Amethyst runtime.
#[derive(Debug, Error)]
pub enum AmethystError {
    #[error("nothing to send: message has neither text nor embed")]
    EmptyMessage,

    #[error("send failed ({destination}): {message}")]
    SendFailed { destination: String, message: String },

    #[error("settings error: {0}")]
    SettingsError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
