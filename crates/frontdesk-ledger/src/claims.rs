//! In-process admission control for appointment writes.
//!
//! A writer claims its target interval before opening a transaction.
//! Writers whose intervals overlap are admitted one at a time, in arrival
//! order of their lock attempts; writers on disjoint intervals are never
//! blocked by each other. This is what keeps the locking granularity at the
//! contested interval rather than the whole calendar.
//!
//! The claim registry is an ordering device, not the invariant's
//! enforcement: the transaction's commit-time overlap re-check remains the
//! authority. A process that died holding a claim therefore cannot have
//! corrupted the ledger — at worst its claim vanished with it.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::Notify;

#[derive(Clone)]
pub(crate) struct IntervalClaims {
    inner: Arc<ClaimsInner>,
}

struct ClaimsInner {
    /// Intervals currently held, keyed by claim id.
    held: Mutex<HashMap<u64, (DateTime<Utc>, DateTime<Utc>)>>,
    next_id: AtomicU64,
    /// Signalled whenever a claim is released.
    released: Notify,
}

impl IntervalClaims {
    pub(crate) fn new() -> Self {
        Self {
            inner: Arc::new(ClaimsInner {
                held: Mutex::new(HashMap::new()),
                next_id: AtomicU64::new(0),
                released: Notify::new(),
            }),
        }
    }

    /// Claims the half-open interval `[start, end)`, waiting until no
    /// overlapping claim is held. The claim is released when the returned
    /// guard drops.
    pub(crate) async fn acquire(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> IntervalClaim {
        loop {
            // Create the wakeup future before inspecting the map, so a
            // release that lands in between still wakes us.
            let released = self.inner.released.notified();

            {
                let mut held = self
                    .inner
                    .held
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner);

                let contested = held.values().any(|(s, e)| *s < end && start < *e);
                if !contested {
                    let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
                    held.insert(id, (start, end));
                    return IntervalClaim {
                        inner: Arc::clone(&self.inner),
                        id,
                    };
                }
            }

            released.await;
        }
    }

    #[cfg(test)]
    fn held_count(&self) -> usize {
        self.inner
            .held
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

/// RAII guard for a claimed interval.
pub(crate) struct IntervalClaim {
    inner: Arc<ClaimsInner>,
    id: u64,
}

impl Drop for IntervalClaim {
    fn drop(&mut self) {
        self.inner
            .held
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.id);
        self.inner.released.notify_waiters();
    }
}
