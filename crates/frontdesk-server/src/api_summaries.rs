//! Call summary routes. Summaries are written by sessions, never over HTTP.

use std::sync::Arc;

use axum::extract::Path;
use axum::{Extension, Json};
use frontdesk_types::CallSummary;
use uuid::Uuid;

use crate::api::ApiError;
use crate::AppState;

/// Fetches the summary written for one session.
pub async fn session_summary_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path(session_id): Path<Uuid>,
) -> Result<Json<CallSummary>, ApiError> {
    state
        .ledger
        .summary_by_session(session_id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("no summary for session {session_id}")))
}

/// Lists every summary attributed to a user, newest first.
pub async fn user_summaries_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path(user_id): Path<Uuid>,
) -> Result<Json<Vec<CallSummary>>, ApiError> {
    let summaries = state.ledger.summaries_for_user(user_id).await?;
    Ok(Json(summaries))
}
