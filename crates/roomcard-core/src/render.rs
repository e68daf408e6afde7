//! Card rendering.
//!
//! [`CardTemplate`] turns a [`RoomUpdate`] into an [`EmbedCard`], whose
//! serde representation is a Discord embed object and can be sent as-is
//! in the `embeds` array of a message payload.

use chrono::NaiveDateTime;
use serde::Serialize;

use crate::update::RoomUpdate;

/// Default embed colour (Discord's "default", i.e. no accent).
const DEFAULT_COLOR: u32 = 0;

/// A rendered embed, serialized in Discord's embed object shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmbedCard {
    /// Embed title.
    pub title: String,
    /// Text under the title.
    pub description: String,
    /// Accent colour as `0xRRGGBB`.
    pub color: u32,
    /// Small image in the top-right corner.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<EmbedImage>,
    /// Name/value sections of the card.
    pub fields: Vec<EmbedField>,
    /// Footer line.
    pub footer: EmbedFooter,
}

/// Image reference inside an embed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmbedImage {
    /// Absolute URL of the image.
    pub url: String,
}

/// One name/value section of an embed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmbedField {
    /// Section heading.
    pub name: String,
    /// Section body (Discord markdown).
    pub value: String,
    /// Whether Discord may place this field next to its neighbours.
    pub inline: bool,
}

/// Footer line of an embed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmbedFooter {
    /// Footer text.
    pub text: String,
}

/// Fixed parts of the card that do not change between updates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardTemplate {
    /// Link players follow to join the room.
    pub room_link: String,
    /// Thumbnail shown on the card, if any.
    pub thumbnail_url: Option<String>,
}

impl CardTemplate {
    /// Render `update` into a card stamped with `updated_at`.
    pub fn render(&self, update: &RoomUpdate, updated_at: NaiveDateTime) -> EmbedCard {
        let occupancy = EmbedField {
            name: String::from("Usuários atuais"),
            value: format!(
                "```fix\n🎮 {} Usuários no quarto\n```",
                update.user_count
            ),
            inline: false,
        };

        let link = EmbedField {
            name: String::from("Link do quarto"),
            value: format!(
                "```fix\nAcesse o quarto abaixo\n```\n➡️ [Clique aqui para entrar]({})",
                self.room_link
            ),
            inline: false,
        };

        EmbedCard {
            title: update.room_name.to_uppercase(),
            description: String::from("Chame seus amigos e vem jogar!"),
            color: DEFAULT_COLOR,
            thumbnail: self
                .thumbnail_url
                .as_ref()
                .map(|url| EmbedImage { url: url.clone() }),
            fields: vec![occupancy, link],
            footer: EmbedFooter {
                text: format!("Atualizado em {}", updated_at.format("%d/%m/%Y %H:%M:%S")),
            },
        }
    }
}
