use thiserror::Error;
use uuid::Uuid;

/// Errors produced by ledger operations.
///
/// The first group (`SlotConflict` through `SummaryExists`) are domain
/// outcomes a conversation can recover from; the rest indicate
/// infrastructure failure.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// The requested interval overlaps a non-cancelled appointment.
    #[error("requested time overlaps an existing appointment")]
    SlotConflict,

    /// No user with the given id.
    #[error("user not found: {0}")]
    UserNotFound(Uuid),

    /// No appointment with the given id, or it is already cancelled where
    /// the operation requires an active one.
    #[error("appointment not found: {0}")]
    AppointmentNotFound(Uuid),

    /// The appointment was already cancelled.
    #[error("appointment already cancelled: {0}")]
    AlreadyCancelled(Uuid),

    /// A user with this phone number already exists.
    #[error("a user with phone {0} already exists")]
    DuplicatePhone(String),

    /// The phone number could not be normalized.
    #[error("invalid phone number: {0:?}")]
    InvalidPhone(String),

    /// Appointment durations must be positive.
    #[error("appointment duration must be positive")]
    InvalidDuration,

    /// A summary was already recorded for this session.
    #[error("summary already recorded for session {0}")]
    SummaryExists(Uuid),

    /// A stored row failed to parse back into its domain type.
    #[error("stored row is malformed: {0}")]
    Corrupt(String),

    /// Underlying SQLite failure.
    #[error("database error: {0}")]
    Db(#[from] rusqlite::Error),

    /// Could not obtain a pooled connection.
    #[error("connection pool error: {0}")]
    Pool(#[from] r2d2::Error),

    /// The blocking task running the query was cancelled or panicked.
    #[error("blocking task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

impl LedgerError {
    /// Whether this error is a domain outcome the conversation layer can
    /// phrase as a spoken reply (as opposed to infrastructure failure).
    pub fn is_domain(&self) -> bool {
        matches!(
            self,
            Self::SlotConflict
                | Self::UserNotFound(_)
                | Self::AppointmentNotFound(_)
                | Self::AlreadyCancelled(_)
                | Self::DuplicatePhone(_)
                | Self::InvalidPhone(_)
                | Self::InvalidDuration
                | Self::SummaryExists(_)
        )
    }
}
