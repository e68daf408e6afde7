//! Ingress API server for the room card bot.
//!
//! This crate provides an Axum HTTP server with a single endpoint,
//! `POST /update-room`, that game-side scripts call whenever the room's
//! occupancy changes. Accepted updates overwrite the pending slot in
//! [`ReflectorState`]; the reflector task publishes them on its own
//! schedule.
//!
//! # Architecture
//!
//! Handlers never talk to Discord. They authenticate the caller with a
//! shared secret, validate the payload, store it, and optionally nudge the
//! reflector. Bursts of requests therefore collapse into a single pending
//! update no matter how fast they arrive.
//!
//! [`ReflectorState`]: roomcard_core::ReflectorState

pub mod error;
pub mod handlers;
pub mod router;
pub mod server;
pub mod state;

// Re-export primary types for convenience.
pub use error::IngressError;
pub use router::build_router;
pub use server::{bind, serve, ServerConfig, ServerError};
pub use state::IngressState;
