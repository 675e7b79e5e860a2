//! User records, keyed by normalized phone number.

use frontdesk_types::{format_ts, normalize_phone, now_ts, parse_ts, User};
use rusqlite::{params, Connection, ErrorCode, OptionalExtension};
use uuid::Uuid;

use crate::{Ledger, LedgerError};

fn read_user(row: &rusqlite::Row<'_>) -> rusqlite::Result<(String, String, Option<String>, String)> {
    Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
}

fn to_user(raw: (String, String, Option<String>, String)) -> Result<User, LedgerError> {
    let corrupt = |field: &str| LedgerError::Corrupt(format!("user {field}"));
    Ok(User {
        id: Uuid::parse_str(&raw.0).map_err(|_| corrupt("id"))?,
        phone: raw.1,
        display_name: raw.2,
        created_at: parse_ts(&raw.3).ok_or_else(|| corrupt("created_at"))?,
    })
}

fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _) if e.code == ErrorCode::ConstraintViolation
    )
}

fn find_by_phone(conn: &Connection, phone: &str) -> Result<Option<User>, LedgerError> {
    let raw = conn
        .query_row(
            "SELECT id, phone, display_name, created_at FROM users WHERE phone = ?1",
            [phone],
            read_user,
        )
        .optional()?;
    raw.map(to_user).transpose()
}

impl Ledger {
    /// Creates a user from a raw phone number and optional display name.
    ///
    /// The phone number is normalized before storage; two spellings of the
    /// same number are the same user. Fails with `DuplicatePhone` if the
    /// number is already registered.
    pub async fn create_user(
        &self,
        phone: &str,
        display_name: Option<String>,
    ) -> Result<User, LedgerError> {
        let normalized = normalize_phone(phone)
            .ok_or_else(|| LedgerError::InvalidPhone(phone.to_string()))?;

        let user = self
            .with_conn(move |conn| {
                let id = Uuid::new_v4();
                let now = now_ts();
                let result = conn.execute(
                    "INSERT INTO users (id, phone, display_name, created_at)
                     VALUES (?1, ?2, ?3, ?4)",
                    params![id.to_string(), normalized, display_name, format_ts(now)],
                );

                match result {
                    Ok(_) => Ok(User {
                        id,
                        phone: normalized,
                        display_name,
                        created_at: now,
                    }),
                    Err(e) if is_unique_violation(&e) => {
                        Err(LedgerError::DuplicatePhone(normalized))
                    }
                    Err(e) => Err(e.into()),
                }
            })
            .await?;

        tracing::info!(user_id = %user.id, "user created");
        Ok(user)
    }

    /// Looks a user up by raw phone number (normalized before the query).
    pub async fn user_by_phone(&self, phone: &str) -> Result<Option<User>, LedgerError> {
        let normalized = normalize_phone(phone)
            .ok_or_else(|| LedgerError::InvalidPhone(phone.to_string()))?;
        self.with_conn(move |conn| find_by_phone(conn, &normalized))
            .await
    }

    /// Looks a user up by id.
    pub async fn user_by_id(&self, id: Uuid) -> Result<Option<User>, LedgerError> {
        self.with_conn(move |conn| {
            let raw = conn
                .query_row(
                    "SELECT id, phone, display_name, created_at FROM users WHERE id = ?1",
                    [id.to_string()],
                    read_user,
                )
                .optional()?;
            raw.map(to_user).transpose()
        })
        .await
    }

    /// Updates the display name — the only mutable user attribute.
    pub async fn set_display_name(
        &self,
        id: Uuid,
        display_name: Option<String>,
    ) -> Result<User, LedgerError> {
        self.with_conn(move |conn| {
            let changed = conn.execute(
                "UPDATE users SET display_name = ?2 WHERE id = ?1",
                params![id.to_string(), display_name],
            )?;
            if changed == 0 {
                return Err(LedgerError::UserNotFound(id));
            }

            let raw = conn
                .query_row(
                    "SELECT id, phone, display_name, created_at FROM users WHERE id = ?1",
                    [id.to_string()],
                    read_user,
                )
                .optional()?;
            raw.map(to_user)
                .transpose()?
                .ok_or(LedgerError::UserNotFound(id))
        })
        .await
    }
}
