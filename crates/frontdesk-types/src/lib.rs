//! Shared domain types for the frontdesk platform.
//!
//! This crate defines the vocabulary used across all frontdesk crates:
//! callers ([`User`]), their [`Appointment`]s, derived availability
//! ([`Slot`]), end-of-call records ([`CallSummary`]), and conversation
//! transcript entries ([`Turn`]).
//!
//! No crate in the workspace depends on anything *except* `frontdesk-types`
//! for cross-cutting type definitions. This keeps the dependency graph clean
//! and prevents circular dependencies.

use chrono::{DateTime, Duration, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

mod policy;
pub use policy::{BusinessHours, RateCard};

/// Formats a timestamp the way every frontdesk store and API does: RFC 3339,
/// UTC, whole seconds, `Z` suffix (`2025-09-01T10:00:00Z`).
///
/// A single fixed format means stored timestamps compare correctly as plain
/// strings, which the appointment overlap checks rely on.
pub fn format_ts(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Parses a timestamp previously written by [`format_ts`] (any RFC 3339
/// offset is accepted and normalized to UTC).
pub fn parse_ts(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Current time truncated to whole seconds — the resolution timestamps are
/// stored at, so a value written with [`format_ts`] reads back equal.
pub fn now_ts() -> DateTime<Utc> {
    let now = Utc::now();
    DateTime::from_timestamp(now.timestamp(), 0).unwrap_or(now)
}

/// Normalizes a caller-supplied phone number to its canonical stored form:
/// digits only, with an optional leading `+`.
///
/// Separators (spaces, dashes, dots, parentheses) are stripped. Returns
/// `None` if anything else remains or the digit count falls outside 7..=15
/// (the E.164 envelope).
pub fn normalize_phone(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    let (plus, rest) = match trimmed.strip_prefix('+') {
        Some(rest) => ("+", rest),
        None => ("", trimmed),
    };

    let mut digits = String::with_capacity(rest.len());
    for ch in rest.chars() {
        if ch.is_ascii_digit() {
            digits.push(ch);
        } else if matches!(ch, ' ' | '-' | '.' | '(' | ')') {
            continue;
        } else {
            return None;
        }
    }

    if !(7..=15).contains(&digits.len()) {
        return None;
    }

    Some(format!("{plus}{digits}"))
}

/// Returns whether two half-open time intervals `[start, start+minutes)`
/// intersect.
///
/// Half-open on purpose: an appointment ending at 10:00 does not conflict
/// with one starting at 10:00, so back-to-back bookings are allowed.
pub fn intervals_overlap(
    a_start: DateTime<Utc>,
    a_minutes: u32,
    b_start: DateTime<Utc>,
    b_minutes: u32,
) -> bool {
    let a_end = a_start + Duration::minutes(i64::from(a_minutes));
    let b_end = b_start + Duration::minutes(i64::from(b_minutes));
    a_start < b_end && b_start < a_end
}

/// A caller, identified by phone number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Unique user id.
    pub id: Uuid,
    /// Normalized phone number (unique across users).
    pub phone: String,
    /// Optional display name.
    pub display_name: Option<String>,
    /// When the user record was created.
    pub created_at: DateTime<Utc>,
}

/// Lifecycle status of an appointment.
///
/// Appointments are never deleted; cancellation is a status transition so
/// the booking history stays auditable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AppointmentStatus {
    /// An active booking that occupies its time interval.
    Booked,
    /// A released booking; its interval is free again.
    Cancelled,
    /// A booking whose time has passed and was honored.
    Completed,
}

impl AppointmentStatus {
    /// Returns the stored string form of this status.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Booked => "booked",
            Self::Cancelled => "cancelled",
            Self::Completed => "completed",
        }
    }

    /// Attempts to parse a stored status string.
    ///
    /// Returns `None` for unrecognized strings.
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "booked" => Some(Self::Booked),
            "cancelled" => Some(Self::Cancelled),
            "completed" => Some(Self::Completed),
            _ => None,
        }
    }

    /// Whether this status occupies its time interval for conflict purposes.
    pub fn occupies_interval(self) -> bool {
        !matches!(self, Self::Cancelled)
    }
}

/// A booked (or formerly booked) time interval on the shared calendar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Appointment {
    /// Unique appointment id.
    pub id: Uuid,
    /// Owning user.
    pub user_id: Uuid,
    /// Start of the interval (UTC).
    pub starts_at: DateTime<Utc>,
    /// Length of the interval in minutes (always > 0).
    pub duration_minutes: u32,
    /// Current lifecycle status.
    pub status: AppointmentStatus,
    /// Free-form notes captured at booking time.
    pub notes: Option<String>,
    /// When the row was created.
    pub created_at: DateTime<Utc>,
    /// When the row was last modified.
    pub updated_at: DateTime<Utc>,
}

impl Appointment {
    /// Exclusive end of the appointment interval.
    pub fn ends_at(&self) -> DateTime<Utc> {
        self.starts_at + Duration::minutes(i64::from(self.duration_minutes))
    }

    /// Whether this appointment's interval intersects `[start, start+minutes)`.
    pub fn overlaps(&self, start: DateTime<Utc>, minutes: u32) -> bool {
        intervals_overlap(self.starts_at, self.duration_minutes, start, minutes)
    }
}

/// A derived, bookable window: inside business hours and free of any
/// non-cancelled appointment. Computed on demand, never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Slot {
    /// Start of the free window (UTC).
    pub starts_at: DateTime<Utc>,
    /// Length of the window in minutes.
    pub duration_minutes: u32,
}

/// Who produced a transcript turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The human caller.
    Caller,
    /// The voice assistant.
    Assistant,
    /// A tool result fed back into the conversation.
    Tool,
}

impl Role {
    /// Returns the stored string form of this role.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Caller => "caller",
            Self::Assistant => "assistant",
            Self::Tool => "tool",
        }
    }
}

/// One entry in a session transcript.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    /// Speaker of this turn.
    pub role: Role,
    /// What was said (or the tool result text).
    pub text: String,
    /// When the turn was recorded.
    pub at: DateTime<Utc>,
}

impl Turn {
    /// Convenience constructor stamping the turn with the current time.
    pub fn now(role: Role, text: impl Into<String>) -> Self {
        Self {
            role,
            text: text.into(),
            at: Utc::now(),
        }
    }
}

/// What a call accomplished, as recorded on its summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SummaryOutcome {
    /// At least one appointment was booked.
    Booked,
    /// An existing appointment was moved.
    Modified,
    /// An existing appointment was cancelled.
    Cancelled,
    /// The call completed without calendar changes.
    NoAction,
    /// The outcome could not be determined (degraded summary).
    Unknown,
}

impl SummaryOutcome {
    /// Returns the stored string form of this outcome.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Booked => "booked",
            Self::Modified => "modified",
            Self::Cancelled => "cancelled",
            Self::NoAction => "no_action",
            Self::Unknown => "unknown",
        }
    }

    /// Attempts to parse a stored outcome string.
    ///
    /// Returns `None` for unrecognized strings.
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "booked" => Some(Self::Booked),
            "modified" => Some(Self::Modified),
            "cancelled" => Some(Self::Cancelled),
            "no_action" => Some(Self::NoAction),
            "unknown" => Some(Self::Unknown),
            _ => None,
        }
    }
}

/// The persisted record of one finished call. Written exactly once per
/// session, immutable thereafter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallSummary {
    /// Unique summary id.
    pub id: Uuid,
    /// The session this summary describes (unique, one-to-one).
    pub session_id: Uuid,
    /// The identified caller, if identification happened.
    pub user_id: Option<Uuid>,
    /// Generated summary text.
    pub summary: String,
    /// Structured outcome tag.
    pub outcome: SummaryOutcome,
    /// Appointments touched during the call.
    pub appointment_ids: Vec<Uuid>,
    /// Call duration in whole seconds, when known.
    pub duration_seconds: Option<i64>,
    /// When the summary was written.
    pub created_at: DateTime<Utc>,
}
