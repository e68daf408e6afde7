//! Axum router construction for the ingress API.
//!
//! Assembles the routes into a single [`Router`] with CORS middleware
//! enabled so browser-side scripts on the game page can post updates.

use std::sync::Arc;

use axum::routing::post;
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::IngressState;

/// Build the complete Axum router for the ingress server.
///
/// The router includes:
/// - `POST /update-room` -- store the latest room occupancy
///
/// CORS allows any origin, method, and header.
pub fn build_router(state: Arc<IngressState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/update-room", post(handlers::update_room))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
