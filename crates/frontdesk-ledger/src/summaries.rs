//! Call summary records: one per session, written once.

use frontdesk_types::{format_ts, now_ts, parse_ts, CallSummary, SummaryOutcome};
use rusqlite::{params, ErrorCode, OptionalExtension};
use uuid::Uuid;

use crate::{Ledger, LedgerError};

/// A summary ready to persist. The ledger stamps the id and timestamp.
#[derive(Debug, Clone)]
pub struct SummaryDraft {
    pub session_id: Uuid,
    pub user_id: Option<Uuid>,
    pub summary: String,
    pub outcome: SummaryOutcome,
    pub appointment_ids: Vec<Uuid>,
    pub duration_seconds: Option<i64>,
}

struct StoredSummary {
    id: String,
    session_id: String,
    user_id: Option<String>,
    summary: String,
    outcome: String,
    appointment_ids: String,
    duration_seconds: Option<i64>,
    created_at: String,
}

const SUMMARY_COLUMNS: &str =
    "id, session_id, user_id, summary, outcome, appointment_ids, duration_seconds, created_at";

fn read_summary(row: &rusqlite::Row<'_>) -> rusqlite::Result<StoredSummary> {
    Ok(StoredSummary {
        id: row.get(0)?,
        session_id: row.get(1)?,
        user_id: row.get(2)?,
        summary: row.get(3)?,
        outcome: row.get(4)?,
        appointment_ids: row.get(5)?,
        duration_seconds: row.get(6)?,
        created_at: row.get(7)?,
    })
}

fn to_summary(stored: StoredSummary) -> Result<CallSummary, LedgerError> {
    let corrupt = |field: &str| LedgerError::Corrupt(format!("call summary {field}"));

    let user_id = match stored.user_id {
        Some(raw) => Some(Uuid::parse_str(&raw).map_err(|_| corrupt("user_id"))?),
        None => None,
    };
    let appointment_ids: Vec<Uuid> = serde_json::from_str(&stored.appointment_ids)
        .map_err(|_| corrupt("appointment_ids"))?;

    Ok(CallSummary {
        id: Uuid::parse_str(&stored.id).map_err(|_| corrupt("id"))?,
        session_id: Uuid::parse_str(&stored.session_id).map_err(|_| corrupt("session_id"))?,
        user_id,
        summary: stored.summary,
        outcome: SummaryOutcome::from_str(&stored.outcome).ok_or_else(|| corrupt("outcome"))?,
        appointment_ids,
        duration_seconds: stored.duration_seconds,
        created_at: parse_ts(&stored.created_at).ok_or_else(|| corrupt("created_at"))?,
    })
}

impl Ledger {
    /// Persists the summary for a finished session.
    ///
    /// Each session gets exactly one summary; a second write for the same
    /// session fails with `SummaryExists` and leaves the first untouched.
    pub async fn record_summary(&self, draft: SummaryDraft) -> Result<CallSummary, LedgerError> {
        let recorded = self
            .with_conn(move |conn| {
                let id = Uuid::new_v4();
                let now = now_ts();
                let ids_json = serde_json::to_string(&draft.appointment_ids)
                    .map_err(|e| LedgerError::Corrupt(format!("appointment ids: {e}")))?;

                let result = conn.execute(
                    "INSERT INTO call_summaries
                        (id, session_id, user_id, summary, outcome,
                         appointment_ids, duration_seconds, created_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                    params![
                        id.to_string(),
                        draft.session_id.to_string(),
                        draft.user_id.map(|u| u.to_string()),
                        draft.summary,
                        draft.outcome.as_str(),
                        ids_json,
                        draft.duration_seconds,
                        format_ts(now),
                    ],
                );

                match result {
                    Ok(_) => Ok(CallSummary {
                        id,
                        session_id: draft.session_id,
                        user_id: draft.user_id,
                        summary: draft.summary,
                        outcome: draft.outcome,
                        appointment_ids: draft.appointment_ids,
                        duration_seconds: draft.duration_seconds,
                        created_at: now,
                    }),
                    Err(rusqlite::Error::SqliteFailure(e, ref msg))
                        if e.code == ErrorCode::ConstraintViolation
                            && msg
                                .as_deref()
                                .is_some_and(|m| m.contains("call_summaries.session_id")) =>
                    {
                        Err(LedgerError::SummaryExists(draft.session_id))
                    }
                    Err(e) => Err(e.into()),
                }
            })
            .await?;

        tracing::info!(
            session_id = %recorded.session_id,
            outcome = recorded.outcome.as_str(),
            "call summary recorded"
        );
        Ok(recorded)
    }

    /// Fetches the summary for a session, if one was recorded.
    pub async fn summary_by_session(
        &self,
        session_id: Uuid,
    ) -> Result<Option<CallSummary>, LedgerError> {
        self.with_conn(move |conn| {
            let row = conn
                .query_row(
                    &format!(
                        "SELECT {SUMMARY_COLUMNS} FROM call_summaries WHERE session_id = ?1"
                    ),
                    [session_id.to_string()],
                    read_summary,
                )
                .optional()?;
            row.map(to_summary).transpose()
        })
        .await
    }

    /// Lists all summaries attributed to a user, newest first.
    pub async fn summaries_for_user(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<CallSummary>, LedgerError> {
        self.with_conn(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {SUMMARY_COLUMNS} FROM call_summaries
                 WHERE user_id = ?1
                 ORDER BY created_at DESC, id DESC"
            ))?;
            let rows = stmt.query_map([user_id.to_string()], read_summary)?;
            let mut out = Vec::new();
            for row in rows {
                out.push(to_summary(row?)?);
            }
            Ok(out)
        })
        .await
    }
}
