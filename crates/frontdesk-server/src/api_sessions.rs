//! Session control surface: create, inspect, join, and end call sessions.

use std::sync::Arc;

use axum::extract::Path;
use axum::http::StatusCode;
use axum::{Extension, Json};
use frontdesk_session::{SessionHandle, SessionSnapshot};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::ApiError;
use crate::AppState;

/// Response for session creation.
#[derive(Debug, Serialize)]
pub struct CreateSessionResponse {
    #[serde(rename = "sessionId")]
    pub session_id: Uuid,
    #[serde(rename = "roomName")]
    pub room_name: String,
}

/// Request body for token minting. All fields default, so `{}` is valid.
#[derive(Debug, Deserialize)]
pub struct TokenRequest {
    #[serde(rename = "participantName", default = "default_participant_name")]
    pub participant_name: String,
}

fn default_participant_name() -> String {
    "caller".to_string()
}

/// Response for token minting.
#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub token: String,
    #[serde(rename = "roomName")]
    pub room_name: String,
    #[serde(rename = "livekitUrl")]
    pub livekit_url: String,
}

/// Response for session termination.
#[derive(Debug, Serialize)]
pub struct EndSessionResponse {
    pub ended: bool,
}

/// Allocates a room and registers a new session awaiting its caller.
pub async fn create_session_handler(
    Extension(state): Extension<Arc<AppState>>,
) -> Result<(StatusCode, Json<CreateSessionResponse>), ApiError> {
    let session_id = Uuid::new_v4();
    let room_name = state.rooms.allocate_room_name();

    state
        .registry
        .register(session_id, SessionHandle::pending(room_name.clone()))
        .await;
    tracing::info!(%session_id, room = %room_name, "session created");

    Ok((
        StatusCode::CREATED,
        Json(CreateSessionResponse {
            session_id,
            room_name,
        }),
    ))
}

/// Lists every live session, oldest first.
pub async fn list_sessions_handler(
    Extension(state): Extension<Arc<AppState>>,
) -> Json<Vec<SessionSnapshot>> {
    Json(state.registry.snapshots().await)
}

/// Point-in-time view of one session.
pub async fn get_session_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path(session_id): Path<Uuid>,
) -> Result<Json<SessionSnapshot>, ApiError> {
    state
        .registry
        .snapshot(session_id)
        .await
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("no session {session_id}")))
}

/// Mints a LiveKit join token for the session's room.
pub async fn mint_token_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path(session_id): Path<Uuid>,
    Json(payload): Json<TokenRequest>,
) -> Result<Json<TokenResponse>, ApiError> {
    let room_name = state
        .registry
        .room_name(session_id)
        .await
        .ok_or_else(|| ApiError::NotFound(format!("no session {session_id}")))?;

    // Identities must be unique within a room or LiveKit evicts the
    // earlier participant, so the display name never doubles as identity.
    let identity = format!("caller-{}", &Uuid::new_v4().simple().to_string()[..8]);
    let token = state
        .rooms
        .generate_join_token(&room_name, &identity, &payload.participant_name)
        .map_err(|e| {
            tracing::error!(%session_id, error = %e, "join token mint failed");
            ApiError::InternalServerError("could not mint a join token".to_string())
        })?;

    Ok(Json(TokenResponse {
        token,
        room_name,
        livekit_url: state.rooms.url().to_string(),
    }))
}

/// Asks a session to wind down. Repeating the request is a no-op success;
/// the session itself writes its summary before it goes.
pub async fn end_session_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path(session_id): Path<Uuid>,
) -> Result<Json<EndSessionResponse>, ApiError> {
    if state.registry.end(session_id).await {
        Ok(Json(EndSessionResponse { ended: true }))
    } else {
        Err(ApiError::NotFound(format!("no session {session_id}")))
    }
}
