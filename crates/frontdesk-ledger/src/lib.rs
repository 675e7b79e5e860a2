//! The booking ledger: transactional store of users, appointments, and call
//! summaries, plus the slot allocator that derives availability from it.
//!
//! The ledger is the only mutable state shared between call sessions. Its
//! central guarantee is the booking-consistency invariant: **no two
//! non-cancelled appointments overlap in time**, where intervals are
//! half-open `[starts_at, ends_at)`.
//!
//! # Design decisions
//!
//! - **Optimistic writes with a commit-time re-check**: availability reads
//!   are allowed to go stale; `book_appointment` and `modify_appointment`
//!   re-verify the overlap condition inside an immediate-mode SQLite
//!   transaction, so a conflicting write always loses with `SlotConflict`
//!   and never commits.
//! - **Interval-granularity admission**: before touching the database, a
//!   writer claims its target interval in the in-process
//!   [`claims::IntervalClaims`] registry. Writers whose intervals overlap
//!   take turns; writers on disjoint intervals proceed independently. The
//!   claim only orders writers — the transaction re-check stays the
//!   authority, so a crashed claim holder cannot corrupt anything.
//! - **Async facade over blocking SQLite**: all public operations are
//!   `async` and run their database work under `spawn_blocking`, keeping
//!   session loops free to suspend.

mod appointments;
mod claims;
mod error;
mod slots;
mod summaries;
mod users;

pub use error::LedgerError;
pub use summaries::SummaryDraft;

use frontdesk_db::DbPool;

/// Handle to the booking ledger. Cheap to clone; all clones share the same
/// pool and interval-claim registry.
#[derive(Clone)]
pub struct Ledger {
    pool: DbPool,
    claims: claims::IntervalClaims,
}

impl Ledger {
    /// Creates a ledger over an initialized (migrated) connection pool.
    pub fn new(pool: DbPool) -> Self {
        Self {
            pool,
            claims: claims::IntervalClaims::new(),
        }
    }

    /// Runs a closure against a pooled connection on the blocking thread
    /// pool.
    pub(crate) async fn with_conn<T, F>(&self, job: F) -> Result<T, LedgerError>
    where
        T: Send + 'static,
        F: FnOnce(&mut rusqlite::Connection) -> Result<T, LedgerError> + Send + 'static,
    {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = pool.get()?;
            job(&mut *conn)
        })
        .await?
    }
}
