//! Appointment route tests: booking, slots, rescheduling, cancellation.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use frontdesk_db::{create_pool, DbSettings};
use frontdesk_ledger::Ledger;
use frontdesk_server::config::ServerConfig;
use frontdesk_server::{app, AppState};
use frontdesk_session::{SessionProviders, SessionRegistry};
use frontdesk_types::{BusinessHours, RateCard, User};
use frontdesk_voice::scripted::{ScriptedLlm, ScriptedStt, ScriptedTts};
use frontdesk_voice::{RoomConfig, RoomService};
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;
use uuid::Uuid;

fn rig() -> (TempDir, Ledger, Router) {
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
        rooms: Arc::new(RoomService::new(RoomConfig::default())),
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

async fn seed_user(ledger: &Ledger) -> User {
    ledger
        .create_user("+15550104455", Some("Test Caller".to_string()))
        .await
        .expect("create user")
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

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .expect("request")
}

fn patch_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("PATCH")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .expect("request")
}

fn delete(uri: &str) -> Request<Body> {
    Request::builder()
        .method("DELETE")
        .uri(uri)
        .body(Body::empty())
        .expect("request")
}

/// Books via the API and returns the created appointment body.
async fn book(router: &Router, user_id: Uuid, starts_at: &str, minutes: u32) -> Value {
    let (status, body) = send(
        router,
        post_json(
            "/api/appointments",
            json!({
                "user_id": user_id,
                "starts_at": starts_at,
                "duration_minutes": minutes,
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "booking failed: {body}");
    body
}

#[tokio::test]
async fn booking_returns_the_created_row() {
    let (_dir, ledger, router) = rig();
    let user = seed_user(&ledger).await;

    let (status, body) = send(
        &router,
        post_json(
            "/api/appointments",
            json!({
                "user_id": user.id,
                "starts_at": "2030-01-07T10:00:00Z",
                "duration_minutes": 60,
                "notes": "brake check",
            }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["user_id"], json!(user.id));
    assert_eq!(body["starts_at"], "2030-01-07T10:00:00Z");
    assert_eq!(body["duration_minutes"], 60);
    assert_eq!(body["status"], "booked");
    assert_eq!(body["notes"], "brake check");
}

#[tokio::test]
async fn overlapping_booking_is_a_conflict() {
    let (_dir, ledger, router) = rig();
    let user = seed_user(&ledger).await;
    book(&router, user.id, "2030-01-07T10:00:00Z", 60).await;

    let (status, body) = send(
        &router,
        post_json(
            "/api/appointments",
            json!({
                "user_id": user.id,
                "starts_at": "2030-01-07T10:30:00Z",
                "duration_minutes": 60,
            }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["error"].as_str().expect("error").contains("overlaps"));
}

#[tokio::test]
async fn booking_for_an_unknown_user_is_404() {
    let (_dir, _ledger, router) = rig();

    let (status, body) = send(
        &router,
        post_json(
            "/api/appointments",
            json!({
                "user_id": Uuid::new_v4(),
                "starts_at": "2030-01-07T10:00:00Z",
                "duration_minutes": 60,
            }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"]
        .as_str()
        .expect("error")
        .contains("user not found"));
}

#[tokio::test]
async fn zero_duration_is_rejected() {
    let (_dir, ledger, router) = rig();
    let user = seed_user(&ledger).await;

    let (status, body) = send(
        &router,
        post_json(
            "/api/appointments",
            json!({
                "user_id": user.id,
                "starts_at": "2030-01-07T10:00:00Z",
                "duration_minutes": 0,
            }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"]
        .as_str()
        .expect("error")
        .contains("must be positive"));
}

#[tokio::test]
async fn slots_default_to_today() {
    let (_dir, _ledger, router) = rig();

    let (status, body) = send(&router, get("/api/appointments/slots")).await;

    assert_eq!(status, StatusCode::OK);
    let slots = body.as_array().expect("array");
    assert_eq!(slots.len(), 8, "default hours offer eight hourly slots");
    assert_eq!(slots[0]["duration_minutes"], 60);
}

#[tokio::test]
async fn slots_subtract_booked_intervals() {
    let (_dir, ledger, router) = rig();
    let user = seed_user(&ledger).await;
    book(&router, user.id, "2030-01-07T10:00:00Z", 60).await;

    let (status, body) = send(
        &router,
        get("/api/appointments/slots?date=2030-01-07&to=2030-01-08"),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let starts: Vec<&str> = body
        .as_array()
        .expect("array")
        .iter()
        .map(|slot| slot["starts_at"].as_str().expect("starts_at"))
        .collect();
    assert_eq!(starts.len(), 15, "two open days minus the booked hour");
    assert!(!starts.contains(&"2030-01-07T10:00:00Z"));
    assert!(starts.contains(&"2030-01-08T10:00:00Z"));
}

#[tokio::test]
async fn malformed_slot_date_is_rejected() {
    let (_dir, _ledger, router) = rig();

    let (status, body) = send(&router, get("/api/appointments/slots?date=whenever")).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"]
        .as_str()
        .expect("error")
        .contains("expected YYYY-MM-DD"));
}

#[tokio::test]
async fn reschedule_moves_and_keeps_duration() {
    let (_dir, ledger, router) = rig();
    let user = seed_user(&ledger).await;
    let booked = book(&router, user.id, "2030-01-07T10:00:00Z", 30).await;
    let id = booked["id"].as_str().expect("id");

    let (status, body) = send(
        &router,
        patch_json(
            &format!("/api/appointments/{id}"),
            json!({"starts_at": "2030-01-07T14:00:00Z"}),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["starts_at"], "2030-01-07T14:00:00Z");
    assert_eq!(body["duration_minutes"], 30, "duration carries over");
}

#[tokio::test]
async fn reschedule_conflicts_exclude_the_appointment_itself() {
    let (_dir, ledger, router) = rig();
    let user = seed_user(&ledger).await;
    let first = book(&router, user.id, "2030-01-07T10:00:00Z", 60).await;
    let first_id = first["id"].as_str().expect("id");

    // Growing in place only overlaps itself, which does not count.
    let (status, body) = send(
        &router,
        patch_json(
            &format!("/api/appointments/{first_id}"),
            json!({"duration_minutes": 90}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["duration_minutes"], 90);

    let second = book(&router, user.id, "2030-01-07T12:00:00Z", 60).await;
    let second_id = second["id"].as_str().expect("id");

    // 10:30 lands inside the first appointment's new 10:00-11:30 interval.
    let (status, body) = send(
        &router,
        patch_json(
            &format!("/api/appointments/{second_id}"),
            json!({"starts_at": "2030-01-07T10:30:00Z"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["error"].as_str().expect("error").contains("overlaps"));
}

#[tokio::test]
async fn cancelling_twice_is_rejected() {
    let (_dir, ledger, router) = rig();
    let user = seed_user(&ledger).await;
    let booked = book(&router, user.id, "2030-01-07T10:00:00Z", 60).await;
    let uri = format!("/api/appointments/{}", booked["id"].as_str().expect("id"));

    let (status, body) = send(&router, delete(&uri)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "cancelled");

    let (status, body) = send(&router, delete(&uri)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"]
        .as_str()
        .expect("error")
        .contains("already cancelled"));

    let (status, _) = send(
        &router,
        delete(&format!("/api/appointments/{}", Uuid::new_v4())),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn cancellation_reopens_the_slot() {
    let (_dir, ledger, router) = rig();
    let user = seed_user(&ledger).await;
    let booked = book(&router, user.id, "2030-01-07T10:00:00Z", 60).await;
    let id = booked["id"].as_str().expect("id");

    send(&router, delete(&format!("/api/appointments/{id}"))).await;

    let (status, body) = send(
        &router,
        get("/api/appointments/slots?date=2030-01-07&to=2030-01-07"),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let starts: Vec<&str> = body
        .as_array()
        .expect("array")
        .iter()
        .map(|slot| slot["starts_at"].as_str().expect("starts_at"))
        .collect();
    assert!(starts.contains(&"2030-01-07T10:00:00Z"));
}

#[tokio::test]
async fn user_listing_filters_by_status() {
    let (_dir, ledger, router) = rig();
    let user = seed_user(&ledger).await;
    let first = book(&router, user.id, "2030-01-07T10:00:00Z", 60).await;
    book(&router, user.id, "2030-01-07T12:00:00Z", 60).await;
    let first_id = first["id"].as_str().expect("id");
    send(&router, delete(&format!("/api/appointments/{first_id}"))).await;

    let (status, body) = send(&router, get(&format!("/api/appointments/user/{}", user.id))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().expect("array").len(), 2);

    let (status, body) = send(
        &router,
        get(&format!("/api/appointments/user/{}?status=booked", user.id)),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let booked = body.as_array().expect("array");
    assert_eq!(booked.len(), 1);
    assert_eq!(booked[0]["starts_at"], "2030-01-07T12:00:00Z");

    let (status, body) = send(
        &router,
        get(&format!(
            "/api/appointments/user/{}?status=cancelled",
            user.id
        )),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().expect("array").len(), 1);
}

#[tokio::test]
async fn appointment_lookup_by_id() {
    let (_dir, ledger, router) = rig();
    let user = seed_user(&ledger).await;
    let booked = book(&router, user.id, "2030-01-07T10:00:00Z", 60).await;
    let id = booked["id"].as_str().expect("id");

    let (status, body) = send(&router, get(&format!("/api/appointments/{id}"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], json!(id));

    let (status, body) = send(
        &router,
        get(&format!("/api/appointments/{}", Uuid::new_v4())),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"]
        .as_str()
        .expect("error")
        .contains("appointment not found"));
}
