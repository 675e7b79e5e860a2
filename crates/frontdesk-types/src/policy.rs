//! Business-hours policy and provider rate card.

use chrono::{DateTime, Datelike, Duration, NaiveDate, TimeZone, Utc, Weekday};
use serde::{Deserialize, Serialize};

use crate::Slot;

/// The bookable window of each open day.
///
/// All hours are interpreted in UTC, matching how appointment times are
/// stored. Slot starts step from `open_hour` in `slot_minutes` increments;
/// a slot only counts when it ends by `close_hour`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusinessHours {
    /// First bookable hour of the day (inclusive).
    #[serde(default = "default_open_hour")]
    pub open_hour: u32,
    /// Hour the calendar closes (exclusive; appointments must end by it).
    #[serde(default = "default_close_hour")]
    pub close_hour: u32,
    /// Slot granularity in minutes.
    #[serde(default = "default_slot_minutes")]
    pub slot_minutes: u32,
    /// Weekdays on which no slots are offered.
    #[serde(default)]
    pub closed_weekdays: Vec<Weekday>,
}

fn default_open_hour() -> u32 {
    9
}

fn default_close_hour() -> u32 {
    17
}

fn default_slot_minutes() -> u32 {
    60
}

impl Default for BusinessHours {
    fn default() -> Self {
        Self {
            open_hour: default_open_hour(),
            close_hour: default_close_hour(),
            slot_minutes: default_slot_minutes(),
            closed_weekdays: Vec::new(),
        }
    }
}

impl BusinessHours {
    /// Whether any slots are offered on the given date.
    pub fn is_open_on(&self, date: NaiveDate) -> bool {
        !self.closed_weekdays.contains(&date.weekday())
    }

    /// Candidate slots for one day, in start order, ignoring bookings.
    ///
    /// Returns an empty vector for closed weekdays.
    pub fn day_slots(&self, date: NaiveDate) -> Vec<Slot> {
        if !self.is_open_on(date) {
            return Vec::new();
        }

        let Some(open) = date.and_hms_opt(self.open_hour, 0, 0) else {
            return Vec::new();
        };
        let Some(close) = date.and_hms_opt(self.close_hour, 0, 0) else {
            return Vec::new();
        };

        let open = Utc.from_utc_datetime(&open);
        let close = Utc.from_utc_datetime(&close);
        let step = Duration::minutes(i64::from(self.slot_minutes));

        let mut slots = Vec::new();
        let mut start = open;
        while start + step <= close {
            slots.push(Slot {
                starts_at: start,
                duration_minutes: self.slot_minutes,
            });
            start += step;
        }
        slots
    }

    /// Whether the interval `[start, start+minutes)` lies entirely within
    /// one open day's hours.
    pub fn fits(&self, start: DateTime<Utc>, minutes: u32) -> bool {
        let date = start.date_naive();
        if !self.is_open_on(date) {
            return false;
        }

        let (Some(open), Some(close)) = (
            date.and_hms_opt(self.open_hour, 0, 0),
            date.and_hms_opt(self.close_hour, 0, 0),
        ) else {
            return false;
        };

        // `close` is on the same date, so an interval spilling past midnight
        // fails the end comparison on its own.
        let end = start + Duration::minutes(i64::from(minutes));
        start.naive_utc() >= open && end.naive_utc() <= close
    }

    /// Human-readable description of the open window, for spoken replies
    /// ("between 9:00 and 17:00").
    pub fn describe(&self) -> String {
        format!("between {}:00 and {}:00", self.open_hour, self.close_hour)
    }
}

/// Per-unit provider prices used to turn usage metadata into an estimated
/// cost. All amounts are in the deployment currency.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RateCard {
    /// Price per second of transcribed caller audio.
    #[serde(default = "default_stt_per_second")]
    pub stt_per_second: f64,
    /// Price per synthesized character.
    #[serde(default = "default_tts_per_character")]
    pub tts_per_character: f64,
    /// Price per 1000 prompt tokens.
    #[serde(default = "default_llm_prompt_per_1k")]
    pub llm_prompt_per_1k: f64,
    /// Price per 1000 completion tokens.
    #[serde(default = "default_llm_completion_per_1k")]
    pub llm_completion_per_1k: f64,
    /// Price per minute of rendered avatar video.
    #[serde(default = "default_avatar_per_minute")]
    pub avatar_per_minute: f64,
}

fn default_stt_per_second() -> f64 {
    0.000_072
}

fn default_tts_per_character() -> f64 {
    0.000_015
}

fn default_llm_prompt_per_1k() -> f64 {
    0.000_15
}

fn default_llm_completion_per_1k() -> f64 {
    0.000_6
}

fn default_avatar_per_minute() -> f64 {
    0.10
}

impl Default for RateCard {
    fn default() -> Self {
        Self {
            stt_per_second: default_stt_per_second(),
            tts_per_character: default_tts_per_character(),
            llm_prompt_per_1k: default_llm_prompt_per_1k(),
            llm_completion_per_1k: default_llm_completion_per_1k(),
            avatar_per_minute: default_avatar_per_minute(),
        }
    }
}
