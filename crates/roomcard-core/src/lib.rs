//! Core of the room card bot.
//!
//! The bot mirrors the occupancy of a single room into one Discord embed
//! message that is edited in place. This crate holds everything that does
//! not depend on a particular HTTP server or chat client:
//!
//! - [`update`] -- the [`RoomUpdate`] payload and the opaque [`MessageId`]
//! - [`state`] -- [`ReflectorState`], the last-write-wins pending slot and
//!   rate-limit clock shared by the ingress endpoint and the reflector
//! - [`render`] -- turns a [`RoomUpdate`] into an [`EmbedCard`]
//! - [`store`] -- durable storage of the card's [`MessageId`]
//! - [`publish`] -- the [`Publisher`] seam to the chat platform
//! - [`reflector`] -- the polling loop that coalesces updates and publishes
//!   at most once per update interval
//! - [`config`] -- configuration loaded from YAML and the environment
//!
//! # Data flow
//!
//! ```text
//! POST /update-room --> ReflectorState (pending slot) --> Reflector --> Publisher
//!                                                            |
//!                                                      IdentityStore
//! ```

pub mod config;
pub mod publish;
pub mod reflector;
pub mod render;
pub mod state;
pub mod store;
pub mod update;

pub use config::{BotConfig, ConfigError};
pub use publish::{PublishError, Publisher};
pub use reflector::{Reflector, TickOutcome};
pub use render::{CardTemplate, EmbedCard};
pub use state::{Pending, ReflectorState};
pub use store::{FileIdentityStore, IdentityStore, MemoryIdentityStore, StoreError};
pub use update::{MessageId, RoomUpdate};
