//! HTTP handlers for the ingress API.
//!
//! `POST /update-room` expects the `x-api-key` header and a JSON body
//! `{"roomName": string, "userCount": integer}`. Authentication is checked
//! before the body is even parsed, so a caller without the secret always
//! gets `401` and never touches the pending slot.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use roomcard_core::RoomUpdate;
use serde::Deserialize;
use subtle::ConstantTimeEq;
use tracing::{debug, info};

use crate::error::IngressError;
use crate::state::IngressState;

/// Header carrying the shared secret.
pub const API_KEY_HEADER: &str = "x-api-key";

/// Wire shape of an update.
///
/// Both fields are optional here so that a missing field produces our own
/// validation message instead of a generic deserialization error.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdateRoomRequest {
    room_name: Option<String>,
    user_count: Option<u64>,
}

// ---------------------------------------------------------------------------
// POST /update-room
// ---------------------------------------------------------------------------

/// Store a new room update, replacing any update not yet published.
pub async fn update_room(
    State(state): State<Arc<IngressState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<serde_json::Value>, IngressError> {
    authorize(&headers, &state.api_key)?;
    let update = parse_update(&body)?;

    info!(
        room_name = %update.room_name,
        user_count = update.user_count,
        "Room update received"
    );

    let replaced = state.reflector.set_pending(update);
    if replaced {
        debug!("Unpublished update superseded");
    }

    if state.publish_on_ingress {
        state.reflector.nudge();
    }

    Ok(Json(serde_json::json!({ "status": "ok" })))
}

/// Check the `x-api-key` header against the configured secret.
fn authorize(headers: &HeaderMap, api_key: &str) -> Result<(), IngressError> {
    let provided = headers
        .get(API_KEY_HEADER)
        .map(|v| v.as_bytes())
        .ok_or(IngressError::Unauthorized)?;

    if bool::from(provided.ct_eq(api_key.as_bytes())) {
        Ok(())
    } else {
        Err(IngressError::Unauthorized)
    }
}

/// Parse and validate a request body.
///
/// `userCount` of zero is a real reading and is accepted; only an absent
/// count is rejected.
fn parse_update(body: &[u8]) -> Result<RoomUpdate, IngressError> {
    let request: UpdateRoomRequest = serde_json::from_slice(body)
        .map_err(|e| IngressError::Validation(format!("Dados inválidos: {e}")))?;

    let room_name = request
        .room_name
        .filter(|name| !name.is_empty())
        .ok_or_else(|| IngressError::Validation("Dados inválidos: roomName is required".to_owned()))?;
    let user_count = request
        .user_count
        .ok_or_else(|| IngressError::Validation("Dados inválidos: userCount is required".to_owned()))?;

    Ok(RoomUpdate {
        room_name,
        user_count,
    })
}
