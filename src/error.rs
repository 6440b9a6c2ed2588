//! Error types for the productivity bot.

use std::time::Duration;

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Database-related errors.
///
/// `Pool` and `Migration` mean the store is unavailable and are fatal at
/// startup. `Query` is a failed read or write against an open store.
#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    #[error("Connection error: {0}")]
    Pool(String),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Migration failed: {0}")]
    Migration(String),
}

/// Transport errors raised by a chat channel.
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error("Channel {name} failed to start: {reason}")]
    StartupFailed { name: String, reason: String },

    #[error("Channel {name} disconnected: {reason}")]
    Disconnected { name: String, reason: String },

    /// Another process is polling with the same bot token.
    #[error("Channel {name} conflicts with another running instance")]
    Conflict { name: String },

    #[error("Failed to send response on channel {name}: {reason}")]
    SendFailed { name: String, reason: String },

    #[error("Channel {name} gave up after {attempts} attempts (last backoff {backoff:?})")]
    RetriesExhausted {
        name: String,
        attempts: u32,
        backoff: Duration,
    },
}

impl ChannelError {
    /// Whether the supervisor should restart the channel after this error.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Conflict { .. } | Self::Disconnected { .. } | Self::StartupFailed { .. }
        )
    }
}
