//! Configuration loading for the room card bot.
//!
//! Settings come from two layers:
//!
//! 1. An optional YAML file (`roomcard-config.yaml`, or the path in
//!    `ROOMCARD_CONFIG`) holding non-secret settings.
//! 2. Environment variables, which override the file.
//!
//! Secrets (`DISCORD_TOKEN`, `API_KEY`) are only read from the
//! environment; the file parser rejects unknown keys, so a token pasted
//! into the YAML is a load error rather than a silently ignored value.
//!
//! | Variable | Meaning | Default |
//! |----------|---------|---------|
//! | `DISCORD_TOKEN` | bot token | required |
//! | `CHANNEL_ID` | target channel | required |
//! | `API_KEY` | ingress shared secret | required |
//! | `HOST` | bind address | `0.0.0.0` |
//! | `PORT` | listen port | `8000` |
//! | `UPDATE_INTERVAL_SECS` | minimum publish spacing | `60` |
//! | `TICK_INTERVAL_SECS` | reflector cadence | `5` |
//! | `MESSAGE_ID_PATH` | identity file | `message_id.json` |
//! | `DISCORD_API_URL` | REST base URL | `https://discord.com/api/v10` |
//! | `ROOM_LINK` | link shown on the card | Habblet room |
//! | `THUMBNAIL_URL` | card thumbnail, empty to disable | loading GIF |
//! | `PUBLISH_ON_INGRESS` | wake the reflector on each update | `true` |

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;

use crate::render::CardTemplate;

/// Config file read when `ROOMCARD_CONFIG` is unset.
pub const DEFAULT_CONFIG_PATH: &str = "roomcard-config.yaml";

/// Room link used when none is configured.
pub const DEFAULT_ROOM_LINK: &str = "https://www.habblet.city/room/6065930";

/// Thumbnail used when none is configured.
pub const DEFAULT_THUMBNAIL_URL: &str =
    "https://cdn.discordapp.com/attachments/1303772458762895480/1424811285542863000/load-32.gif";

/// Discord REST base URL used when none is configured.
pub const DEFAULT_DISCORD_API_URL: &str = "https://discord.com/api/v10";

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 8000;
const DEFAULT_UPDATE_INTERVAL_SECS: u64 = 60;
const DEFAULT_TICK_INTERVAL_SECS: u64 = 5;
const DEFAULT_MESSAGE_ID_PATH: &str = "message_id.json";

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },

    /// A required setting is absent.
    #[error("missing required setting {name}")]
    Missing {
        /// Environment variable name.
        name: &'static str,
    },

    /// A setting is present but unusable.
    #[error("invalid {name}: {message}")]
    Invalid {
        /// Environment variable name.
        name: &'static str,
        /// What is wrong with the value.
        message: String,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Non-secret settings read from the YAML file.
///
/// Every field is optional; environment variables take precedence.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    /// Target channel id.
    pub channel_id: Option<String>,
    /// Bind address.
    pub host: Option<String>,
    /// Listen port.
    pub port: Option<u16>,
    /// Minimum spacing between publishes, in seconds.
    pub update_interval_secs: Option<u64>,
    /// Reflector cadence, in seconds.
    pub tick_interval_secs: Option<u64>,
    /// Identity file path.
    pub message_id_path: Option<PathBuf>,
    /// Discord REST base URL.
    pub discord_api_url: Option<String>,
    /// Link shown on the card.
    pub room_link: Option<String>,
    /// Thumbnail shown on the card; empty disables it.
    pub thumbnail_url: Option<String>,
    /// Wake the reflector on each accepted update.
    pub publish_on_ingress: Option<bool>,
}

impl FileConfig {
    /// Load file settings from `path`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, or
    /// [`ConfigError::Yaml`] if the content is not valid YAML.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parse file settings from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML or
    /// contains unknown keys.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yml::from_str(yaml)?)
    }
}

/// Complete bot configuration.
#[derive(Clone, PartialEq, Eq)]
pub struct BotConfig {
    /// Discord bot token.
    pub discord_token: String,
    /// Channel that holds the card.
    pub channel_id: String,
    /// Shared secret expected in the `x-api-key` header.
    pub api_key: String,
    /// Bind address for the ingress server.
    pub host: String,
    /// Listen port for the ingress server.
    pub port: u16,
    /// Minimum spacing between two successful publishes.
    pub update_interval: Duration,
    /// How often the reflector checks for a due update.
    pub tick_interval: Duration,
    /// File holding the card message identity.
    pub message_id_path: PathBuf,
    /// Discord REST base URL.
    pub discord_api_url: String,
    /// Link shown on the card.
    pub room_link: String,
    /// Thumbnail shown on the card.
    pub thumbnail_url: Option<String>,
    /// Wake the reflector on each accepted update.
    pub publish_on_ingress: bool,
}

impl BotConfig {
    /// Load configuration from the optional YAML file and the process
    /// environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file is unreadable or invalid, a
    /// required variable is missing, or a value does not parse.
    pub fn load() -> Result<Self, ConfigError> {
        let explicit = std::env::var_os("ROOMCARD_CONFIG").map(PathBuf::from);
        let file = match explicit {
            // An explicitly named file must exist.
            Some(path) => Some(FileConfig::from_file(&path)?),
            None => {
                let path = Path::new(DEFAULT_CONFIG_PATH);
                if path.exists() {
                    Some(FileConfig::from_file(path)?)
                } else {
                    None
                }
            }
        };

        Self::from_sources(file.unwrap_or_default(), |name| std::env::var(name).ok())
    }

    /// Build the configuration from file settings and a variable lookup.
    ///
    /// `lookup` returns the value of an environment variable, or `None`
    /// if unset. Values from `lookup` override `file`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if a required value is missing or a value
    /// does not parse.
    pub fn from_sources<L>(file: FileConfig, lookup: L) -> Result<Self, ConfigError>
    where
        L: Fn(&str) -> Option<String>,
    {
        let discord_token = required(&lookup, "DISCORD_TOKEN")?;
        let api_key = required(&lookup, "API_KEY")?;
        let channel_id = lookup("CHANNEL_ID")
            .or(file.channel_id)
            .filter(|v| !v.is_empty())
            .ok_or(ConfigError::Missing { name: "CHANNEL_ID" })?;
        if !channel_id.bytes().all(|b| b.is_ascii_digit()) {
            return Err(ConfigError::Invalid {
                name: "CHANNEL_ID",
                message: format!("expected a numeric channel id, got {channel_id:?}"),
            });
        }

        let host = lookup("HOST")
            .or(file.host)
            .unwrap_or_else(|| DEFAULT_HOST.to_owned());
        let port = parsed(&lookup, "PORT")?
            .or(file.port)
            .unwrap_or(DEFAULT_PORT);

        let update_interval_secs = parsed(&lookup, "UPDATE_INTERVAL_SECS")?
            .or(file.update_interval_secs)
            .unwrap_or(DEFAULT_UPDATE_INTERVAL_SECS);
        let tick_interval_secs = parsed(&lookup, "TICK_INTERVAL_SECS")?
            .or(file.tick_interval_secs)
            .unwrap_or(DEFAULT_TICK_INTERVAL_SECS);
        if update_interval_secs == 0 {
            return Err(ConfigError::Invalid {
                name: "UPDATE_INTERVAL_SECS",
                message: String::from("must be at least 1"),
            });
        }
        if tick_interval_secs == 0 {
            return Err(ConfigError::Invalid {
                name: "TICK_INTERVAL_SECS",
                message: String::from("must be at least 1"),
            });
        }

        let message_id_path = lookup("MESSAGE_ID_PATH")
            .map(PathBuf::from)
            .or(file.message_id_path)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_MESSAGE_ID_PATH));
        let discord_api_url = lookup("DISCORD_API_URL")
            .or(file.discord_api_url)
            .unwrap_or_else(|| DEFAULT_DISCORD_API_URL.to_owned())
            .trim_end_matches('/')
            .to_owned();
        let room_link = lookup("ROOM_LINK")
            .or(file.room_link)
            .unwrap_or_else(|| DEFAULT_ROOM_LINK.to_owned());
        let thumbnail_url = lookup("THUMBNAIL_URL")
            .or(file.thumbnail_url)
            .map_or_else(
                || Some(DEFAULT_THUMBNAIL_URL.to_owned()),
                |url| Some(url).filter(|u| !u.is_empty()),
            );
        let publish_on_ingress = parsed(&lookup, "PUBLISH_ON_INGRESS")?
            .or(file.publish_on_ingress)
            .unwrap_or(true);

        Ok(Self {
            discord_token,
            channel_id,
            api_key,
            host,
            port,
            update_interval: Duration::from_secs(update_interval_secs),
            tick_interval: Duration::from_secs(tick_interval_secs),
            message_id_path,
            discord_api_url,
            room_link,
            thumbnail_url,
            publish_on_ingress,
        })
    }

    /// The fixed parts of the card.
    pub fn card_template(&self) -> CardTemplate {
        CardTemplate {
            room_link: self.room_link.clone(),
            thumbnail_url: self.thumbnail_url.clone(),
        }
    }
}

impl fmt::Debug for BotConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BotConfig")
            .field("discord_token", &"<redacted>")
            .field("channel_id", &self.channel_id)
            .field("api_key", &"<redacted>")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("update_interval", &self.update_interval)
            .field("tick_interval", &self.tick_interval)
            .field("message_id_path", &self.message_id_path)
            .field("discord_api_url", &self.discord_api_url)
            .field("room_link", &self.room_link)
            .field("thumbnail_url", &self.thumbnail_url)
            .field("publish_on_ingress", &self.publish_on_ingress)
            .finish()
    }
}

/// Read a required, non-empty variable.
fn required<L>(lookup: &L, name: &'static str) -> Result<String, ConfigError>
where
    L: Fn(&str) -> Option<String>,
{
    lookup(name)
        .filter(|v| !v.is_empty())
        .ok_or(ConfigError::Missing { name })
}

/// Read and parse an optional variable.
fn parsed<L, T>(lookup: &L, name: &'static str) -> Result<Option<T>, ConfigError>
where
    L: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: fmt::Display,
{
    lookup(name)
        .map(|raw| {
            raw.trim().parse::<T>().map_err(|e| ConfigError::Invalid {
                name,
                message: format!("{e}"),
            })
        })
        .transpose()
}
