//! Front desk server library logic.

pub mod api;
pub mod api_appointments;
pub mod api_sessions;
pub mod api_summaries;
pub mod api_users;
pub mod config;

use std::sync::Arc;
use std::time::Duration;

use axum::http::HeaderValue;
use axum::routing::{get, post};
use axum::{Extension, Json, Router};
use frontdesk_ledger::Ledger;
use frontdesk_session::{SessionProviders, SessionRegistry};
use frontdesk_types::{BusinessHours, RateCard};
use frontdesk_voice::RoomService;
use serde_json::{json, Value};
use tower_http::cors::{Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use config::ServerConfig;

/// Application state shared across all request handlers.
#[derive(Clone)]
pub struct AppState {
    /// Booking ledger (users, appointments, call summaries).
    pub ledger: Ledger,
    /// Registry of live call sessions.
    pub registry: SessionRegistry,
    /// Room naming and join-token minting.
    pub rooms: Arc<RoomService>,
    /// Provider clients handed to each call session.
    pub providers: SessionProviders,
    /// Bookable hours policy.
    pub hours: BusinessHours,
    /// Provider price card for cost estimates.
    pub rates: RateCard,
}

/// Health check handler.
async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Builds the application router with all routes.
pub fn app(state: AppState, server: &ServerConfig) -> Router {
    Router::new()
        .route("/api/health", get(health))
        .route(
            "/api/sessions",
            post(api_sessions::create_session_handler).get(api_sessions::list_sessions_handler),
        )
        .route(
            "/api/sessions/{sessionId}",
            get(api_sessions::get_session_handler),
        )
        .route(
            "/api/sessions/{sessionId}/token",
            post(api_sessions::mint_token_handler),
        )
        .route(
            "/api/sessions/{sessionId}/end",
            post(api_sessions::end_session_handler),
        )
        .route("/api/users", post(api_users::create_user_handler))
        .route(
            "/api/users/{userId}",
            get(api_users::get_user_handler).patch(api_users::update_user_handler),
        )
        .route(
            "/api/users/by-phone/{phone}",
            get(api_users::user_by_phone_handler),
        )
        .route(
            "/api/appointments",
            post(api_appointments::book_appointment_handler),
        )
        .route(
            "/api/appointments/slots",
            get(api_appointments::get_slots_handler),
        )
        .route(
            "/api/appointments/{appointmentId}",
            get(api_appointments::get_appointment_handler)
                .patch(api_appointments::modify_appointment_handler)
                .delete(api_appointments::cancel_appointment_handler),
        )
        .route(
            "/api/appointments/user/{userId}",
            get(api_appointments::user_appointments_handler),
        )
        .route(
            "/api/summaries/session/{sessionId}",
            get(api_summaries::session_summary_handler),
        )
        .route(
            "/api/summaries/user/{userId}",
            get(api_summaries::user_summaries_handler),
        )
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(Duration::from_secs(
            server.request_timeout_seconds,
        )))
        .layer(cors_layer(&server.cors_allow_origin))
        .layer(Extension(Arc::new(state)))
}

fn cors_layer(allow_origin: &str) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    match allow_origin {
        "" | "*" => layer.allow_origin(Any),
        origin => match origin.parse::<HeaderValue>() {
            Ok(value) => layer.allow_origin(value),
            Err(_) => {
                tracing::warn!(origin, "unparseable CORS origin, allowing any");
                layer.allow_origin(Any)
            }
        },
    }
}
