//! Session control surface tests, driven through the router with oneshot.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use frontdesk_db::{create_pool, DbSettings};
use frontdesk_ledger::Ledger;
use frontdesk_server::config::ServerConfig;
use frontdesk_server::{app, AppState};
use frontdesk_session::{SessionProviders, SessionRegistry};
use frontdesk_types::{BusinessHours, RateCard};
use frontdesk_voice::scripted::{ScriptedLlm, ScriptedStt, ScriptedTts};
use frontdesk_voice::{RoomConfig, RoomService};
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;
use uuid::Uuid;

fn live_room_config() -> RoomConfig {
    RoomConfig {
        url: "wss://frontdesk.livekit.cloud".to_string(),
        api_key: "lk-test-key".to_string(),
        api_secret: "lk-test-secret-at-least-32-bytes!!".to_string(),
        token_ttl_seconds: 600,
    }
}

fn rig_with_rooms(room: RoomConfig) -> (TempDir, Ledger, Router) {
    let dir = tempfile::tempdir().expect("tempdir");
    let db_path = dir.path().join("frontdesk.db");
    let pool = create_pool(db_path.to_str().expect("utf-8 path"), DbSettings::default())
        .expect("create pool");
    {
        let conn = pool.get().expect("pooled connection");
        frontdesk_db::run_migrations(&conn).expect("migrations");
    }
    let ledger = Ledger::new(pool);

    let state = AppState {
        ledger: ledger.clone(),
        registry: SessionRegistry::new(),
        rooms: Arc::new(RoomService::new(room)),
        providers: SessionProviders {
            stt: Arc::new(ScriptedStt::new()),
            tts: Arc::new(ScriptedTts::new()),
            llm: Arc::new(ScriptedLlm::new()),
            avatar: None,
        },
        hours: BusinessHours::default(),
        rates: RateCard::default(),
    };
    let router = app(state, &ServerConfig::default());
    (dir, ledger, router)
}

fn rig() -> (TempDir, Ledger, Router) {
    rig_with_rooms(live_room_config())
}

async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router.clone().oneshot(request).await.expect("request");
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("json body")
    };
    (status, body)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .body(Body::empty())
        .expect("request")
}

fn post_empty(uri: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .body(Body::empty())
        .expect("request")
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .expect("request")
}

#[tokio::test]
async fn health_reports_ok_and_version() {
    let (_dir, _ledger, router) = rig();

    let (status, body) = send(&router, get("/api/health")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn create_session_registers_a_pending_room() {
    let (_dir, _ledger, router) = rig();

    let (status, body) = send(&router, post_empty("/api/sessions")).await;
    assert_eq!(status, StatusCode::CREATED);

    let session_id: Uuid = body["sessionId"]
        .as_str()
        .expect("sessionId")
        .parse()
        .expect("uuid");
    let room_name = body["roomName"].as_str().expect("roomName").to_string();
    assert!(room_name.starts_with("voice-room-"));

    let (status, listed) = send(&router, get("/api/sessions")).await;
    assert_eq!(status, StatusCode::OK);
    let listed = listed.as_array().expect("array");
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0]["sessionId"], json!(session_id));

    let (status, snapshot) = send(&router, get(&format!("/api/sessions/{session_id}"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(snapshot["phase"], "connecting");
    assert_eq!(snapshot["roomName"], json!(room_name));
}

#[tokio::test]
async fn unknown_session_is_404() {
    let (_dir, _ledger, router) = rig();

    let (status, body) = send(&router, get(&format!("/api/sessions/{}", Uuid::new_v4()))).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].as_str().expect("error").contains("no session"));
}

#[tokio::test]
async fn token_minting_requires_a_live_session() {
    let (_dir, _ledger, router) = rig();

    let (status, body) = send(
        &router,
        post_json(&format!("/api/sessions/{}/token", Uuid::new_v4()), json!({})),
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].as_str().expect("error").contains("no session"));
}

#[tokio::test]
async fn token_embeds_the_session_room() {
    let (_dir, _ledger, router) = rig();

    let (_, created) = send(&router, post_empty("/api/sessions")).await;
    let session_id = created["sessionId"].as_str().expect("sessionId").to_string();
    let room_name = created["roomName"].as_str().expect("roomName").to_string();

    let (status, body) = send(
        &router,
        post_json(
            &format!("/api/sessions/{session_id}/token"),
            json!({"participantName": "Dana"}),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert!(!body["token"].as_str().expect("token").is_empty());
    assert_eq!(body["roomName"], json!(room_name));
    assert_eq!(body["livekitUrl"], "wss://frontdesk.livekit.cloud");
}

#[tokio::test]
async fn token_body_defaults_the_participant_name() {
    let (_dir, _ledger, router) = rig();

    let (_, created) = send(&router, post_empty("/api/sessions")).await;
    let session_id = created["sessionId"].as_str().expect("sessionId").to_string();

    let (status, body) = send(
        &router,
        post_json(&format!("/api/sessions/{session_id}/token"), json!({})),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert!(!body["token"].as_str().expect("token").is_empty());
}

#[tokio::test]
async fn token_without_livekit_credentials_is_a_server_error() {
    let (_dir, _ledger, router) = rig_with_rooms(RoomConfig::default());

    let (_, created) = send(&router, post_empty("/api/sessions")).await;
    let session_id = created["sessionId"].as_str().expect("sessionId").to_string();

    let (status, body) = send(
        &router,
        post_json(&format!("/api/sessions/{session_id}/token"), json!({})),
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["error"]
        .as_str()
        .expect("error")
        .contains("could not mint"));
}

#[tokio::test]
async fn end_session_repeats_as_a_no_op() {
    let (_dir, _ledger, router) = rig();

    let (_, created) = send(&router, post_empty("/api/sessions")).await;
    let session_id = created["sessionId"].as_str().expect("sessionId").to_string();
    let uri = format!("/api/sessions/{session_id}/end");

    let (status, body) = send(&router, post_empty(&uri)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ended"], true);

    // Asking again is harmless; the cancellation token is already tripped.
    let (status, body) = send(&router, post_empty(&uri)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ended"], true);

    let (status, _) = send(
        &router,
        post_empty(&format!("/api/sessions/{}/end", Uuid::new_v4())),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
