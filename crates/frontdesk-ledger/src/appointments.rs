//! Appointment booking, rescheduling, and cancellation.
//!
//! Every write that could violate the overlap invariant follows the same
//! shape: claim the target interval, open an immediate-mode transaction,
//! re-check overlap against committed rows, then write. The re-check runs at
//! commit time on purpose — allocator output may be stale by the time a
//! booking attempt lands.

use chrono::{DateTime, Duration, Utc};
use frontdesk_types::{format_ts, now_ts, parse_ts, Appointment, AppointmentStatus};
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};
use uuid::Uuid;

use crate::{Ledger, LedgerError};

const APPOINTMENT_COLUMNS: &str =
    "id, user_id, starts_at, ends_at, status, notes, created_at, updated_at";

/// An appointment row exactly as stored, before domain conversion.
struct StoredAppointment {
    id: String,
    user_id: String,
    starts_at: String,
    ends_at: String,
    status: String,
    notes: Option<String>,
    created_at: String,
    updated_at: String,
}

fn read_appointment(row: &rusqlite::Row<'_>) -> rusqlite::Result<StoredAppointment> {
    Ok(StoredAppointment {
        id: row.get(0)?,
        user_id: row.get(1)?,
        starts_at: row.get(2)?,
        ends_at: row.get(3)?,
        status: row.get(4)?,
        notes: row.get(5)?,
        created_at: row.get(6)?,
        updated_at: row.get(7)?,
    })
}

fn to_appointment(stored: StoredAppointment) -> Result<Appointment, LedgerError> {
    let corrupt = |field: &str| LedgerError::Corrupt(format!("appointment {field}"));

    let starts_at = parse_ts(&stored.starts_at).ok_or_else(|| corrupt("starts_at"))?;
    let ends_at = parse_ts(&stored.ends_at).ok_or_else(|| corrupt("ends_at"))?;
    let minutes = (ends_at - starts_at).num_minutes();
    if minutes <= 0 {
        return Err(corrupt("interval"));
    }

    Ok(Appointment {
        id: Uuid::parse_str(&stored.id).map_err(|_| corrupt("id"))?,
        user_id: Uuid::parse_str(&stored.user_id).map_err(|_| corrupt("user_id"))?,
        starts_at,
        duration_minutes: minutes as u32,
        status: AppointmentStatus::from_str(&stored.status).ok_or_else(|| corrupt("status"))?,
        notes: stored.notes,
        created_at: parse_ts(&stored.created_at).ok_or_else(|| corrupt("created_at"))?,
        updated_at: parse_ts(&stored.updated_at).ok_or_else(|| corrupt("updated_at"))?,
    })
}

/// Whether any non-cancelled appointment intersects `[start, end)`,
/// optionally excluding one row (used when that row itself is being moved).
///
/// Stored timestamps share one fixed format, so the string comparisons are
/// chronological.
fn overlap_exists(
    conn: &Connection,
    start: &str,
    end: &str,
    exclude: Option<&str>,
) -> rusqlite::Result<bool> {
    match exclude {
        Some(id) => conn.query_row(
            "SELECT EXISTS(
                SELECT 1 FROM appointments
                WHERE status != 'cancelled' AND starts_at < ?2 AND ends_at > ?1 AND id != ?3
             )",
            params![start, end, id],
            |row| row.get(0),
        ),
        None => conn.query_row(
            "SELECT EXISTS(
                SELECT 1 FROM appointments
                WHERE status != 'cancelled' AND starts_at < ?2 AND ends_at > ?1
             )",
            params![start, end],
            |row| row.get(0),
        ),
    }
}

fn find_stored(conn: &Connection, id: Uuid) -> Result<Option<StoredAppointment>, LedgerError> {
    let row = conn
        .query_row(
            &format!("SELECT {APPOINTMENT_COLUMNS} FROM appointments WHERE id = ?1"),
            [id.to_string()],
            read_appointment,
        )
        .optional()?;
    Ok(row)
}

impl Ledger {
    /// Books `[starts_at, starts_at + duration_minutes)` for a user.
    ///
    /// Fails with `SlotConflict` if any non-cancelled appointment overlaps
    /// the interval at commit time, and with `UserNotFound` for an unknown
    /// user. On conflict nothing is written.
    pub async fn book_appointment(
        &self,
        user_id: Uuid,
        starts_at: DateTime<Utc>,
        duration_minutes: u32,
        notes: Option<String>,
    ) -> Result<Appointment, LedgerError> {
        if duration_minutes == 0 {
            return Err(LedgerError::InvalidDuration);
        }
        let ends_at = starts_at + Duration::minutes(i64::from(duration_minutes));

        let _claim = self.claims.acquire(starts_at, ends_at).await;
        let appointment = self
            .with_conn(move |conn| {
                let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

                let user_exists: bool = tx.query_row(
                    "SELECT EXISTS(SELECT 1 FROM users WHERE id = ?1)",
                    [user_id.to_string()],
                    |row| row.get(0),
                )?;
                if !user_exists {
                    return Err(LedgerError::UserNotFound(user_id));
                }

                let start_s = format_ts(starts_at);
                let end_s = format_ts(ends_at);
                if overlap_exists(&tx, &start_s, &end_s, None)? {
                    return Err(LedgerError::SlotConflict);
                }

                let id = Uuid::new_v4();
                let now = now_ts();
                let now_s = format_ts(now);
                tx.execute(
                    "INSERT INTO appointments
                        (id, user_id, starts_at, ends_at, status, notes, created_at, updated_at)
                     VALUES (?1, ?2, ?3, ?4, 'booked', ?5, ?6, ?6)",
                    params![id.to_string(), user_id.to_string(), start_s, end_s, notes, now_s],
                )?;
                tx.commit()?;

                Ok(Appointment {
                    id,
                    user_id,
                    starts_at,
                    duration_minutes,
                    status: AppointmentStatus::Booked,
                    notes,
                    created_at: now,
                    updated_at: now,
                })
            })
            .await?;

        tracing::info!(
            appointment_id = %appointment.id,
            user_id = %appointment.user_id,
            starts_at = %format_ts(appointment.starts_at),
            duration_minutes = appointment.duration_minutes,
            "appointment booked"
        );
        Ok(appointment)
    }

    /// Moves an existing appointment to a new interval, re-checking overlap
    /// with the appointment itself excluded from the conflict set.
    ///
    /// Fails with `AppointmentNotFound` if the id is unknown or the
    /// appointment is already cancelled; with `SlotConflict` if the target
    /// interval is taken. On failure the original row is untouched.
    pub async fn modify_appointment(
        &self,
        id: Uuid,
        new_start: DateTime<Utc>,
        new_duration_minutes: u32,
    ) -> Result<Appointment, LedgerError> {
        if new_duration_minutes == 0 {
            return Err(LedgerError::InvalidDuration);
        }
        let new_end = new_start + Duration::minutes(i64::from(new_duration_minutes));

        let _claim = self.claims.acquire(new_start, new_end).await;
        let appointment = self
            .with_conn(move |conn| {
                let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

                let stored = find_stored(&tx, id)?.ok_or(LedgerError::AppointmentNotFound(id))?;
                if stored.status == AppointmentStatus::Cancelled.as_str() {
                    return Err(LedgerError::AppointmentNotFound(id));
                }

                let start_s = format_ts(new_start);
                let end_s = format_ts(new_end);
                if overlap_exists(&tx, &start_s, &end_s, Some(&stored.id))? {
                    return Err(LedgerError::SlotConflict);
                }

                let now_s = format_ts(now_ts());
                tx.execute(
                    "UPDATE appointments SET starts_at = ?2, ends_at = ?3, updated_at = ?4
                     WHERE id = ?1",
                    params![stored.id, start_s, end_s, now_s],
                )?;

                let updated = find_stored(&tx, id)?.ok_or(LedgerError::AppointmentNotFound(id))?;
                tx.commit()?;
                to_appointment(updated)
            })
            .await?;

        tracing::info!(
            appointment_id = %appointment.id,
            starts_at = %format_ts(appointment.starts_at),
            "appointment rescheduled"
        );
        Ok(appointment)
    }

    /// Cancels an appointment. A status transition only — the row is kept
    /// and its interval becomes free. Never a conflict.
    pub async fn cancel_appointment(&self, id: Uuid) -> Result<Appointment, LedgerError> {
        let appointment = self
            .with_conn(move |conn| {
                let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

                let stored = find_stored(&tx, id)?.ok_or(LedgerError::AppointmentNotFound(id))?;
                if stored.status == AppointmentStatus::Cancelled.as_str() {
                    return Err(LedgerError::AlreadyCancelled(id));
                }

                let now_s = format_ts(now_ts());
                tx.execute(
                    "UPDATE appointments SET status = 'cancelled', updated_at = ?2 WHERE id = ?1",
                    params![stored.id, now_s],
                )?;

                let updated = find_stored(&tx, id)?.ok_or(LedgerError::AppointmentNotFound(id))?;
                tx.commit()?;
                to_appointment(updated)
            })
            .await?;

        tracing::info!(appointment_id = %appointment.id, "appointment cancelled");
        Ok(appointment)
    }

    /// Marks an appointment as completed (it keeps occupying its interval
    /// for audit purposes, but its time has passed).
    pub async fn complete_appointment(&self, id: Uuid) -> Result<Appointment, LedgerError> {
        let appointment = self
            .with_conn(move |conn| {
                let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

                let stored = find_stored(&tx, id)?.ok_or(LedgerError::AppointmentNotFound(id))?;
                if stored.status == AppointmentStatus::Cancelled.as_str() {
                    return Err(LedgerError::AlreadyCancelled(id));
                }

                let now_s = format_ts(now_ts());
                tx.execute(
                    "UPDATE appointments SET status = 'completed', updated_at = ?2 WHERE id = ?1",
                    params![stored.id, now_s],
                )?;

                let updated = find_stored(&tx, id)?.ok_or(LedgerError::AppointmentNotFound(id))?;
                tx.commit()?;
                to_appointment(updated)
            })
            .await?;

        tracing::info!(appointment_id = %appointment.id, "appointment completed");
        Ok(appointment)
    }

    /// Fetches one appointment by id.
    pub async fn get_appointment(&self, id: Uuid) -> Result<Appointment, LedgerError> {
        self.with_conn(move |conn| {
            let stored = find_stored(conn, id)?.ok_or(LedgerError::AppointmentNotFound(id))?;
            to_appointment(stored)
        })
        .await
    }

    /// Lists a user's appointments in start order, optionally filtered by
    /// status.
    pub async fn appointments_for_user(
        &self,
        user_id: Uuid,
        status: Option<AppointmentStatus>,
    ) -> Result<Vec<Appointment>, LedgerError> {
        self.with_conn(move |conn| {
            let mut out = Vec::new();
            match status {
                Some(status) => {
                    let mut stmt = conn.prepare(&format!(
                        "SELECT {APPOINTMENT_COLUMNS} FROM appointments
                         WHERE user_id = ?1 AND status = ?2
                         ORDER BY starts_at ASC"
                    ))?;
                    let rows = stmt.query_map(
                        params![user_id.to_string(), status.as_str()],
                        read_appointment,
                    )?;
                    for row in rows {
                        out.push(to_appointment(row?)?);
                    }
                }
                None => {
                    let mut stmt = conn.prepare(&format!(
                        "SELECT {APPOINTMENT_COLUMNS} FROM appointments
                         WHERE user_id = ?1
                         ORDER BY starts_at ASC"
                    ))?;
                    let rows = stmt.query_map([user_id.to_string()], read_appointment)?;
                    for row in rows {
                        out.push(to_appointment(row?)?);
                    }
                }
            }
            Ok(out)
        })
        .await
    }

    /// All non-cancelled appointments intersecting `[from, to)`, in start
    /// order. Feeds the slot allocator.
    pub async fn active_appointments_between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Appointment>, LedgerError> {
        self.with_conn(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {APPOINTMENT_COLUMNS} FROM appointments
                 WHERE status != 'cancelled' AND starts_at < ?2 AND ends_at > ?1
                 ORDER BY starts_at ASC"
            ))?;
            let rows = stmt.query_map(params![format_ts(from), format_ts(to)], read_appointment)?;
            let mut out = Vec::new();
            for row in rows {
                out.push(to_appointment(row?)?);
            }
            Ok(out)
        })
        .await
    }
}
