//! Integration tests for the ingress API endpoint.
//!
//! Tests use Axum's `Router` directly via `tower::ServiceExt` without
//! starting a TCP server. This validates handler logic and routing
//! without needing a live network connection.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use roomcard_core::{ReflectorState, RoomUpdate};
use roomcard_ingress::router::build_router;
use roomcard_ingress::state::IngressState;
use serde_json::Value;
use tower::ServiceExt;

const API_KEY: &str = "test-secret";

fn make_test_state() -> (Arc<ReflectorState>, Arc<IngressState>) {
    let reflector = Arc::new(ReflectorState::new(Duration::from_secs(20)));
    let ingress = Arc::new(IngressState::new(Arc::clone(&reflector), API_KEY));
    (reflector, ingress)
}

fn post_update(key: Option<&str>, body: &str) -> Request<Body> {
    let mut builder = Request::post("/update-room").header("content-type", "application/json");
    if let Some(key) = key {
        builder = builder.header("x-api-key", key);
    }
    builder.body(Body::from(body.to_owned())).unwrap()
}

async fn body_to_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

// =========================================================================
// Tests
// =========================================================================

#[tokio::test]
async fn test_valid_update_is_stored() {
    let (reflector, state) = make_test_state();
    let router = build_router(state);

    let response = router
        .oneshot(post_update(
            Some(API_KEY),
            r#"{"roomName":"Lobby","userCount":7}"#,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["status"], "ok");
    assert_eq!(reflector.pending(), Some(RoomUpdate::new("Lobby", 7)));
}

#[tokio::test]
async fn test_zero_users_is_accepted() {
    let (reflector, state) = make_test_state();
    let router = build_router(state);

    let response = router
        .oneshot(post_update(
            Some(API_KEY),
            r#"{"roomName":"Lobby","userCount":0}"#,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(reflector.pending(), Some(RoomUpdate::new("Lobby", 0)));
}

#[tokio::test]
async fn test_missing_key_is_unauthorized() {
    let (reflector, state) = make_test_state();
    let router = build_router(state);

    let response = router
        .oneshot(post_update(None, r#"{"roomName":"Lobby","userCount":1}"#))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["error"], "Unauthorized");
    assert_eq!(reflector.pending(), None);
}

#[tokio::test]
async fn test_wrong_key_is_unauthorized() {
    let (reflector, state) = make_test_state();
    let router = build_router(state);

    let response = router
        .oneshot(post_update(
            Some("not-the-secret"),
            r#"{"roomName":"Lobby","userCount":1}"#,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(reflector.pending(), None);
}

#[tokio::test]
async fn test_wrong_key_beats_invalid_body() {
    let (reflector, state) = make_test_state();
    let router = build_router(state);

    let response = router
        .oneshot(post_update(Some("nope"), "not json at all"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(reflector.pending(), None);
}

#[tokio::test]
async fn test_empty_room_name_is_rejected() {
    let (reflector, state) = make_test_state();
    let router = build_router(state);

    let response = router
        .oneshot(post_update(
            Some(API_KEY),
            r#"{"roomName":"","userCount":5}"#,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_to_json(response.into_body()).await;
    assert!(json["error"].as_str().unwrap().contains("roomName"));
    assert_eq!(reflector.pending(), None);
}

#[tokio::test]
async fn test_missing_room_name_is_rejected() {
    let (reflector, state) = make_test_state();
    let router = build_router(state);

    let response = router
        .oneshot(post_update(Some(API_KEY), r#"{"userCount":5}"#))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(reflector.pending(), None);
}

#[tokio::test]
async fn test_missing_user_count_is_rejected() {
    let (reflector, state) = make_test_state();
    let router = build_router(state);

    let response = router
        .oneshot(post_update(Some(API_KEY), r#"{"roomName":"Lobby"}"#))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_to_json(response.into_body()).await;
    assert!(json["error"].as_str().unwrap().contains("userCount"));
    assert_eq!(reflector.pending(), None);
}

#[tokio::test]
async fn test_rejected_update_keeps_previous_pending() {
    let (reflector, state) = make_test_state();
    reflector.set_pending(RoomUpdate::new("Lobby", 3));
    let router = build_router(state);

    let response = router
        .oneshot(post_update(Some(API_KEY), r#"{"roomName":""}"#))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(reflector.pending(), Some(RoomUpdate::new("Lobby", 3)));
}

#[tokio::test]
async fn test_last_write_wins() {
    let (reflector, state) = make_test_state();
    let router = build_router(state);

    for (room, users) in [("A", 1), ("B", 2), ("C", 3)] {
        let body = format!(r#"{{"roomName":"{room}","userCount":{users}}}"#);
        let response = router
            .clone()
            .oneshot(post_update(Some(API_KEY), &body))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    assert_eq!(reflector.pending(), Some(RoomUpdate::new("C", 3)));
}

#[tokio::test]
async fn test_accepted_update_nudges_reflector() {
    let (reflector, state) = make_test_state();
    let router = build_router(state);

    router
        .oneshot(post_update(
            Some(API_KEY),
            r#"{"roomName":"Lobby","userCount":1}"#,
        ))
        .await
        .unwrap();

    tokio::time::timeout(Duration::from_secs(1), reflector.nudged())
        .await
        .unwrap();
}

#[tokio::test]
async fn test_nudge_can_be_disabled() {
    let reflector = Arc::new(ReflectorState::new(Duration::from_secs(20)));
    let state = Arc::new(
        IngressState::new(Arc::clone(&reflector), API_KEY).with_publish_on_ingress(false),
    );
    let router = build_router(state);

    router
        .oneshot(post_update(
            Some(API_KEY),
            r#"{"roomName":"Lobby","userCount":1}"#,
        ))
        .await
        .unwrap();

    let woke = tokio::time::timeout(Duration::from_millis(50), reflector.nudged()).await;
    assert!(woke.is_err());
    assert!(reflector.pending().is_some());
}

#[tokio::test]
async fn test_cors_preflight_allows_any_origin() {
    let (_reflector, state) = make_test_state();
    let router = build_router(state);

    let response = router
        .oneshot(
            Request::options("/update-room")
                .header("origin", "https://game.example.com")
                .header("access-control-request-method", "POST")
                .header("access-control-request-headers", "x-api-key,content-type")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let allow_origin = response
        .headers()
        .get("access-control-allow-origin")
        .unwrap()
        .to_str()
        .unwrap();
    assert_eq!(allow_origin, "*");
}

#[tokio::test]
async fn test_get_is_not_allowed() {
    let (_reflector, state) = make_test_state();
    let router = build_router(state);

    let response = router
        .oneshot(Request::get("/update-room").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
}
