//! User account routes.

use std::sync::Arc;

use axum::extract::Path;
use axum::http::StatusCode;
use axum::{Extension, Json};
use frontdesk_types::User;
use serde::Deserialize;
use uuid::Uuid;

use crate::api::ApiError;
use crate::AppState;

/// Request body for account creation.
#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    /// Phone number in any spoken form; stored normalized.
    pub phone: String,
    #[serde(default)]
    pub display_name: Option<String>,
}

/// Request body for account updates.
#[derive(Debug, Deserialize)]
pub struct UpdateUserRequest {
    /// New display name; `null` clears it.
    pub display_name: Option<String>,
}

/// Creates an account keyed by normalized phone number.
pub async fn create_user_handler(
    Extension(state): Extension<Arc<AppState>>,
    Json(payload): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<User>), ApiError> {
    let user = state
        .ledger
        .create_user(&payload.phone, payload.display_name)
        .await?;
    Ok((StatusCode::CREATED, Json(user)))
}

/// Fetches an account by id.
pub async fn get_user_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path(user_id): Path<Uuid>,
) -> Result<Json<User>, ApiError> {
    state
        .ledger
        .user_by_id(user_id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("no user {user_id}")))
}

/// Updates the display name on an account.
pub async fn update_user_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path(user_id): Path<Uuid>,
    Json(payload): Json<UpdateUserRequest>,
) -> Result<Json<User>, ApiError> {
    let user = state
        .ledger
        .set_display_name(user_id, payload.display_name)
        .await?;
    Ok(Json(user))
}

/// Looks up an account by phone number, normalizing first.
pub async fn user_by_phone_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path(phone): Path<String>,
) -> Result<Json<User>, ApiError> {
    state
        .ledger
        .user_by_phone(&phone)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("no user with phone {phone}")))
}
