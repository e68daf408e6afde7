//! The seam between the reflector and the chat platform.
//!
//! A [`Publisher`] creates, fetches, and edits the single card message in
//! the target channel. Implementations must report a vanished message as
//! [`PublishError::NotFound`] so the reflector can recreate it; every
//! other failure is [`PublishError::Transient`] and is retried later.

use std::future::Future;

use crate::render::EmbedCard;
use crate::update::MessageId;

/// Errors reported by a [`Publisher`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PublishError {
    /// The addressed message no longer exists.
    #[error("message not found")]
    NotFound,

    /// Any other failure (network, rate limit, server error, bad response).
    #[error("transient publish error: {0}")]
    Transient(String),
}

/// Outbound message operations on the target channel.
///
/// Methods return `Send` futures so the reflector can run on a spawned
/// Tokio task.
pub trait Publisher: Send + Sync {
    /// Post `card` as a new message and return its identity.
    fn create_message(
        &self,
        card: &EmbedCard,
    ) -> impl Future<Output = Result<MessageId, PublishError>> + Send;

    /// Check that the message `id` still exists.
    fn fetch_message(
        &self,
        id: &MessageId,
    ) -> impl Future<Output = Result<(), PublishError>> + Send;

    /// Replace the content of message `id` with `card`.
    fn edit_message(
        &self,
        id: &MessageId,
        card: &EmbedCard,
    ) -> impl Future<Output = Result<(), PublishError>> + Send;
}
