//! Error types for the room card bot binary.
//!
//! [`BotError`] is the top-level error type that wraps all possible
//! failure modes during startup and shutdown.

/// Top-level error for the room card bot binary.
///
/// Each variant wraps a specific subsystem error, providing a single
/// error type that `main` can propagate with `?`.
#[derive(Debug, thiserror::Error)]
pub enum BotError {
    /// Configuration loading failed.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: roomcard_core::ConfigError,
    },

    /// The Discord client could not be created.
    #[error("discord error: {source}")]
    Discord {
        /// The underlying client error.
        #[from]
        source: roomcard_discord::DiscordError,
    },

    /// The ingress server failed to bind or serve.
    #[error("ingress error: {source}")]
    Ingress {
        /// The underlying server error.
        #[from]
        source: roomcard_ingress::ServerError,
    },

    /// A background task panicked or was cancelled.
    #[error("task error: {message}")]
    Task {
        /// Description of the task failure.
        message: String,
    },
}
