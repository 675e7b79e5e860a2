//! Slot allocation: business hours minus active appointments.

use chrono::{NaiveDate, NaiveTime};
use frontdesk_types::{BusinessHours, Slot};

use crate::{Ledger, LedgerError};

impl Ledger {
    /// Returns the open slots for each day in `from..=to`.
    ///
    /// A slot is offered when it lies inside business hours on an open day
    /// and no active appointment overlaps any part of it. Appointments that
    /// straddle a slot boundary knock out every slot they touch. An inverted
    /// range yields no slots rather than an error.
    pub async fn available_slots(
        &self,
        from: NaiveDate,
        to: NaiveDate,
        hours: &BusinessHours,
    ) -> Result<Vec<Slot>, LedgerError> {
        if to < from {
            return Ok(Vec::new());
        }

        let range_start = from.and_time(NaiveTime::MIN).and_utc();
        let range_end = to
            .succ_opt()
            .unwrap_or(to)
            .and_time(NaiveTime::MIN)
            .and_utc();

        let busy = self
            .active_appointments_between(range_start, range_end)
            .await?;

        let mut open = Vec::new();
        let mut day = from;
        while day <= to {
            for slot in hours.day_slots(day) {
                let taken = busy
                    .iter()
                    .any(|appt| appt.overlaps(slot.starts_at, slot.duration_minutes));
                if !taken {
                    open.push(slot);
                }
            }
            day = match day.succ_opt() {
                Some(next) => next,
                None => break,
            };
        }

        Ok(open)
    }
}
