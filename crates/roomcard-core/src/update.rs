//! Value types passed between the ingress endpoint and the reflector.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

/// Latest reported occupancy of the tracked room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomUpdate {
    /// Display name of the room.
    pub room_name: String,
    /// Number of users currently in the room.
    pub user_count: u64,
}

impl RoomUpdate {
    /// Create a new room update.
    pub fn new(room_name: impl Into<String>, user_count: u64) -> Self {
        Self {
            room_name: room_name.into(),
            user_count,
        }
    }
}

/// Identity of the card message in the target channel.
///
/// Discord snowflakes are carried as strings. The bot never inspects or
/// orders them, it only hands them back to the platform.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct MessageId(String);

impl MessageId {
    /// Wrap a platform message identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the raw identifier.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identity files written by older deployments store the snowflake as a
/// bare JSON number, so both forms are accepted.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawMessageId {
    Text(String),
    Number(u64),
}

impl<'de> Deserialize<'de> for MessageId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        match RawMessageId::deserialize(deserializer)? {
            RawMessageId::Text(id) => Ok(Self(id)),
            RawMessageId::Number(id) => Ok(Self(id.to_string())),
        }
    }
}
