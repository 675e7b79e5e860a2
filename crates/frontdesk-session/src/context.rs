//! Mutable per-call facts shared between the orchestrator and the tools.

use chrono::{DateTime, Utc};
use frontdesk_types::{SummaryOutcome, Turn, User};
use uuid::Uuid;

/// Everything a call knows about itself while it is running.
///
/// Owned by the session's turn loop; the tool dispatcher borrows it mutably
/// while a tool executes, so identification and booking results carry over
/// into later turns. Handed read-only to the summary generator at the end.
#[derive(Debug, Clone)]
pub struct SessionContext {
    pub session_id: Uuid,
    pub started_at: DateTime<Utc>,
    /// The identified caller, once `identify_user` or `create_user` found
    /// them. Stays `None` for anonymous calls.
    pub user: Option<User>,
    /// Spoken turns in order: caller utterances, assistant replies, and the
    /// sentences tools reported back.
    pub transcript: Vec<Turn>,
    booked: Vec<Uuid>,
    modified: Vec<Uuid>,
    cancelled: Vec<Uuid>,
}

impl SessionContext {
    pub fn new(session_id: Uuid) -> Self {
        Self {
            session_id,
            started_at: Utc::now(),
            user: None,
            transcript: Vec::new(),
            booked: Vec::new(),
            modified: Vec::new(),
            cancelled: Vec::new(),
        }
    }

    pub fn note_booked(&mut self, id: Uuid) {
        if !self.booked.contains(&id) {
            self.booked.push(id);
        }
    }

    pub fn note_modified(&mut self, id: Uuid) {
        if !self.modified.contains(&id) {
            self.modified.push(id);
        }
    }

    pub fn note_cancelled(&mut self, id: Uuid) {
        if !self.cancelled.contains(&id) {
            self.cancelled.push(id);
        }
    }

    pub fn booked(&self) -> &[Uuid] {
        &self.booked
    }

    pub fn modified(&self) -> &[Uuid] {
        &self.modified
    }

    pub fn cancelled(&self) -> &[Uuid] {
        &self.cancelled
    }

    /// The call's outcome tag. Booking dominates rescheduling, which
    /// dominates cancellation, so a call that did several things is tagged
    /// by the most consequential one.
    pub fn outcome(&self) -> SummaryOutcome {
        if !self.booked.is_empty() {
            SummaryOutcome::Booked
        } else if !self.modified.is_empty() {
            SummaryOutcome::Modified
        } else if !self.cancelled.is_empty() {
            SummaryOutcome::Cancelled
        } else {
            SummaryOutcome::NoAction
        }
    }

    /// Every appointment the call touched, deduplicated, in first-touch
    /// order.
    pub fn appointment_ids(&self) -> Vec<Uuid> {
        let mut ids: Vec<Uuid> = Vec::new();
        for id in self
            .booked
            .iter()
            .chain(&self.modified)
            .chain(&self.cancelled)
        {
            if !ids.contains(id) {
                ids.push(*id);
            }
        }
        ids
    }
}
