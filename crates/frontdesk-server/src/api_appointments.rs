//! Appointment booking routes.

use std::sync::Arc;

use axum::extract::{Path, Query};
use axum::http::StatusCode;
use axum::{Extension, Json};
use chrono::{DateTime, NaiveDate, Utc};
use frontdesk_types::{Appointment, AppointmentStatus, Slot};
use serde::Deserialize;
use uuid::Uuid;

use crate::api::ApiError;
use crate::AppState;

/// Request body for booking.
#[derive(Debug, Deserialize)]
pub struct BookAppointmentRequest {
    pub user_id: Uuid,
    pub starts_at: DateTime<Utc>,
    pub duration_minutes: u32,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Request body for rescheduling. Absent fields keep their current value.
#[derive(Debug, Deserialize)]
pub struct ModifyAppointmentRequest {
    #[serde(default)]
    pub starts_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub duration_minutes: Option<u32>,
}

/// Query for the open-slot listing. Dates are `YYYY-MM-DD`.
#[derive(Debug, Deserialize)]
pub struct SlotsQuery {
    /// First day of the range; defaults to today (UTC).
    #[serde(default)]
    pub date: Option<String>,
    /// Last day of the range, inclusive; defaults to `date`.
    #[serde(default)]
    pub to: Option<String>,
}

/// Query for per-user appointment listings.
#[derive(Debug, Deserialize)]
pub struct UserAppointmentsQuery {
    #[serde(default)]
    pub status: Option<AppointmentStatus>,
}

fn parse_day(value: &str) -> Result<NaiveDate, ApiError> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|_| ApiError::BadRequest(format!("invalid date '{value}', expected YYYY-MM-DD")))
}

/// Books an appointment on the ledger.
pub async fn book_appointment_handler(
    Extension(state): Extension<Arc<AppState>>,
    Json(payload): Json<BookAppointmentRequest>,
) -> Result<(StatusCode, Json<Appointment>), ApiError> {
    let appointment = state
        .ledger
        .book_appointment(
            payload.user_id,
            payload.starts_at,
            payload.duration_minutes,
            payload.notes,
        )
        .await?;
    Ok((StatusCode::CREATED, Json(appointment)))
}

/// Lists open slots over a day range, bookings subtracted.
pub async fn get_slots_handler(
    Extension(state): Extension<Arc<AppState>>,
    Query(query): Query<SlotsQuery>,
) -> Result<Json<Vec<Slot>>, ApiError> {
    let from = match &query.date {
        Some(value) => parse_day(value)?,
        None => Utc::now().date_naive(),
    };
    let to = match &query.to {
        Some(value) => parse_day(value)?,
        None => from,
    };

    let slots = state.ledger.available_slots(from, to, &state.hours).await?;
    Ok(Json(slots))
}

/// Fetches one appointment by id.
pub async fn get_appointment_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path(appointment_id): Path<Uuid>,
) -> Result<Json<Appointment>, ApiError> {
    let appointment = state.ledger.get_appointment(appointment_id).await?;
    Ok(Json(appointment))
}

/// Reschedules an appointment, keeping whatever the request leaves out.
pub async fn modify_appointment_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path(appointment_id): Path<Uuid>,
    Json(payload): Json<ModifyAppointmentRequest>,
) -> Result<Json<Appointment>, ApiError> {
    let current = state.ledger.get_appointment(appointment_id).await?;
    let new_start = payload.starts_at.unwrap_or(current.starts_at);
    let new_duration = payload.duration_minutes.unwrap_or(current.duration_minutes);

    let updated = state
        .ledger
        .modify_appointment(appointment_id, new_start, new_duration)
        .await?;
    Ok(Json(updated))
}

/// Cancels an appointment and returns the cancelled row.
pub async fn cancel_appointment_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path(appointment_id): Path<Uuid>,
) -> Result<Json<Appointment>, ApiError> {
    let cancelled = state.ledger.cancel_appointment(appointment_id).await?;
    Ok(Json(cancelled))
}

/// Lists a user's appointments, optionally filtered by status.
pub async fn user_appointments_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path(user_id): Path<Uuid>,
    Query(query): Query<UserAppointmentsQuery>,
) -> Result<Json<Vec<Appointment>>, ApiError> {
    let appointments = state
        .ledger
        .appointments_for_user(user_id, query.status)
        .await?;
    Ok(Json(appointments))
}
