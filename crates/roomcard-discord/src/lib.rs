//! Discord REST publisher for the room card bot.
//!
//! [`DiscordClient`] implements [`Publisher`] on top of three Discord REST
//! endpoints, all scoped to one channel:
//!
//! | Operation | Request |
//! |-----------|---------|
//! | create | `POST {api}/channels/{channel}/messages` |
//! | fetch | `GET {api}/channels/{channel}/messages/{id}` |
//! | edit | `PATCH {api}/channels/{channel}/messages/{id}` |
//!
//! A `404` becomes [`PublishError::NotFound`]; every other failure is
//! [`PublishError::Transient`]. No gateway session is opened: the bot only
//! needs the REST API to maintain its card.

use std::time::Duration;

use reqwest::{RequestBuilder, Response, StatusCode};
use roomcard_core::render::EmbedCard;
use roomcard_core::{MessageId, PublishError, Publisher};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Per-request timeout for Discord calls.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Longest error body kept in a [`PublishError::Transient`] message.
const MAX_ERROR_BODY: usize = 512;

/// Errors raised while constructing a [`DiscordClient`].
#[derive(Debug, thiserror::Error)]
pub enum DiscordError {
    /// The HTTP client could not be built.
    #[error("failed to build HTTP client: {0}")]
    Client(String),
}

/// Body sent when creating or editing the card.
#[derive(Debug, Serialize)]
struct MessagePayload<'a> {
    embeds: [&'a EmbedCard; 1],
}

/// The part of a Discord message object the bot reads back.
#[derive(Debug, Deserialize)]
struct MessageObject {
    id: MessageId,
}

/// Body of a Discord `429 Too Many Requests` response.
#[derive(Debug, Deserialize)]
struct RateLimited {
    retry_after: f64,
}

/// Publisher that talks to the Discord REST API with a bot token.
#[derive(Debug, Clone)]
pub struct DiscordClient {
    client: reqwest::Client,
    api_url: String,
    token: String,
    channel_id: String,
}

impl DiscordClient {
    /// Create a client for `channel_id` using `token`.
    ///
    /// `api_url` is the REST base, e.g. `https://discord.com/api/v10`.
    ///
    /// # Errors
    ///
    /// Returns [`DiscordError::Client`] if the TLS backend cannot be
    /// initialized.
    pub fn new(
        api_url: impl Into<String>,
        token: impl Into<String>,
        channel_id: impl Into<String>,
    ) -> Result<Self, DiscordError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(concat!(
                "DiscordBot (https://github.com/roomcard/roomcard, ",
                env!("CARGO_PKG_VERSION"),
                ")"
            ))
            .build()
            .map_err(|e| DiscordError::Client(format!("{e}")))?;

        Ok(Self {
            client,
            api_url: api_url.into().trim_end_matches('/').to_owned(),
            token: token.into(),
            channel_id: channel_id.into(),
        })
    }

    fn messages_url(&self) -> String {
        format!("{}/channels/{}/messages", self.api_url, self.channel_id)
    }

    fn message_url(&self, id: &MessageId) -> String {
        format!("{}/{}", self.messages_url(), id)
    }

    /// Send `request` with bot authentication and map failures.
    async fn send(&self, request: RequestBuilder, action: &str) -> Result<Response, PublishError> {
        let response = request
            .header("Authorization", format!("Bot {}", self.token))
            .send()
            .await
            .map_err(|e| PublishError::Transient(format!("Discord {action} request failed: {e}")))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "unable to read error body".to_owned());
        Err(classify_failure(action, status, &body))
    }
}

impl Publisher for DiscordClient {
    async fn create_message(&self, card: &EmbedCard) -> Result<MessageId, PublishError> {
        let request = self
            .client
            .post(self.messages_url())
            .json(&MessagePayload { embeds: [card] });
        let response = self.send(request, "create").await?;

        let message: MessageObject = response.json().await.map_err(|e| {
            PublishError::Transient(format!("Discord create response parse failed: {e}"))
        })?;
        debug!(message_id = %message.id, channel_id = %self.channel_id, "Discord message created");
        Ok(message.id)
    }

    async fn fetch_message(&self, id: &MessageId) -> Result<(), PublishError> {
        let request = self.client.get(self.message_url(id));
        self.send(request, "fetch").await?;
        Ok(())
    }

    async fn edit_message(&self, id: &MessageId, card: &EmbedCard) -> Result<(), PublishError> {
        let request = self
            .client
            .patch(self.message_url(id))
            .json(&MessagePayload { embeds: [card] });
        self.send(request, "edit").await?;
        debug!(message_id = %id, "Discord message edited");
        Ok(())
    }
}

/// Map a non-success Discord response to a [`PublishError`].
fn classify_failure(action: &str, status: StatusCode, body: &str) -> PublishError {
    if status == StatusCode::NOT_FOUND {
        return PublishError::NotFound;
    }

    if status == StatusCode::TOO_MANY_REQUESTS {
        let retry = serde_json::from_str::<RateLimited>(body)
            .map(|r| format!(", retry after {}s", r.retry_after))
            .unwrap_or_default();
        return PublishError::Transient(format!("Discord {action} rate limited{retry}"));
    }

    let body: String = body.chars().take(MAX_ERROR_BODY).collect();
    PublishError::Transient(format!("Discord {action} returned {status}: {body}"))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    #[test]
    fn not_found_is_distinguished() {
        let error = classify_failure(
            "edit",
            StatusCode::NOT_FOUND,
            r#"{"message": "Unknown Message", "code": 10008}"#,
        );
        assert_eq!(error, PublishError::NotFound);
    }

    #[test]
    fn rate_limit_reports_retry_after() {
        let error = classify_failure(
            "edit",
            StatusCode::TOO_MANY_REQUESTS,
            r#"{"message": "You are being rate limited.", "retry_after": 1.5, "global": false}"#,
        );
        assert_eq!(
            error,
            PublishError::Transient(String::from("Discord edit rate limited, retry after 1.5s"))
        );
    }

    #[test]
    fn server_error_is_transient() {
        let error = classify_failure("create", StatusCode::BAD_GATEWAY, "upstream down");
        assert_eq!(
            error,
            PublishError::Transient(String::from(
                "Discord create returned 502 Bad Gateway: upstream down"
            ))
        );
    }

    #[test]
    fn forbidden_is_transient_not_not_found() {
        let error = classify_failure("fetch", StatusCode::FORBIDDEN, "{}");
        assert!(matches!(error, PublishError::Transient(_)));
    }

    #[test]
    fn long_error_bodies_are_truncated() {
        let body = "x".repeat(4096);
        let error = classify_failure("edit", StatusCode::INTERNAL_SERVER_ERROR, &body);
        assert!(matches!(error, PublishError::Transient(ref m) if m.len() < 1024));
    }

    #[test]
    fn urls_are_channel_scoped() {
        let client = DiscordClient::new("https://discord.com/api/v10/", "t", "123").unwrap();
        assert_eq!(
            client.messages_url(),
            "https://discord.com/api/v10/channels/123/messages"
        );
        assert_eq!(
            client.message_url(&MessageId::new("456")),
            "https://discord.com/api/v10/channels/123/messages/456"
        );
    }

    #[test]
    fn payload_wraps_card_in_embeds_array() {
        let card = roomcard_core::CardTemplate {
            room_link: String::from("https://example.com"),
            thumbnail_url: None,
        }
        .render(
            &roomcard_core::RoomUpdate::new("Lobby", 1),
            chrono::NaiveDateTime::default(),
        );
        let json = serde_json::to_value(MessagePayload { embeds: [&card] }).unwrap();
        assert_eq!(json["embeds"][0]["title"], "LOBBY");
    }
}
