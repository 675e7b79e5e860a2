//! Coercion of spoken dates and times into concrete timestamps.
//!
//! The model passes through whatever the caller said — "tomorrow",
//! "next Tuesday", "2 pm" — and tools need real instants. Anything this
//! module cannot pin down is an error so the assistant asks a clarifying
//! question instead of guessing.

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, Utc, Weekday};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TimeParseError {
    #[error("unrecognized date: {0:?}")]
    Date(String),
    #[error("unrecognized time: {0:?}")]
    Time(String),
}

const WEEKDAYS: [(&str, Weekday); 7] = [
    ("monday", Weekday::Mon),
    ("tuesday", Weekday::Tue),
    ("wednesday", Weekday::Wed),
    ("thursday", Weekday::Thu),
    ("friday", Weekday::Fri),
    ("saturday", Weekday::Sat),
    ("sunday", Weekday::Sun),
];

/// Resolves a spoken day to a calendar date.
///
/// Accepts "today", "tomorrow", weekday names (always the next occurrence,
/// so "monday" said on a Monday means a week out), `YYYY-MM-DD`,
/// `MM/DD/YYYY`, and month-name forms like "September 3" (current year
/// assumed when the caller names none).
pub fn parse_spoken_date(raw: &str, today: NaiveDate) -> Option<NaiveDate> {
    let lowered = raw.trim().to_ascii_lowercase();
    if lowered.is_empty() {
        return None;
    }
    if lowered.contains("today") {
        return Some(today);
    }
    if lowered.contains("tomorrow") {
        return today.succ_opt();
    }

    for (name, weekday) in WEEKDAYS {
        if lowered.contains(name) {
            let mut ahead = i64::from(weekday.num_days_from_monday())
                - i64::from(today.weekday().num_days_from_monday());
            if ahead <= 0 {
                ahead += 7;
            }
            return today.checked_add_signed(Duration::days(ahead));
        }
    }

    let cleaned = lowered.replace(',', " ");
    let cleaned = cleaned.split_whitespace().collect::<Vec<_>>().join(" ");

    for format in ["%Y-%m-%d", "%m/%d/%Y", "%B %d %Y", "%b %d %Y"] {
        if let Ok(date) = NaiveDate::parse_from_str(&cleaned, format) {
            return Some(date);
        }
    }

    // Month-name forms usually arrive without a year.
    let with_year = format!("{} {}", cleaned, today.year());
    for format in ["%B %d %Y", "%b %d %Y"] {
        if let Ok(date) = NaiveDate::parse_from_str(&with_year, format) {
            return Some(date);
        }
    }

    None
}

/// Resolves a spoken time of day.
///
/// Accepts `HH:MM` 24-hour, `H[:MM] am/pm` in any spacing, and bare hour
/// digits. A bare hour below 9 with no meridiem is read as afternoon.
pub fn parse_spoken_time(raw: &str) -> Option<NaiveTime> {
    let lowered = raw.trim().to_ascii_lowercase().replace('.', "");
    let (base, meridiem) = if let Some(rest) = lowered.strip_suffix("pm") {
        (rest.trim_end(), Some(true))
    } else if let Some(rest) = lowered.strip_suffix("am") {
        (rest.trim_end(), Some(false))
    } else {
        (lowered.as_str(), None)
    };

    let (hour_text, minute_text) = match base.split_once(':') {
        Some((hour, minute)) => (hour.trim(), Some(minute.trim())),
        None => (base.trim(), None),
    };

    let mut hour: u32 = hour_text.parse().ok()?;
    let minute: u32 = match minute_text {
        Some(text) => text.parse().ok()?,
        None => 0,
    };

    match meridiem {
        Some(true) if hour < 12 => hour += 12,
        Some(false) if hour == 12 => hour = 0,
        None if minute_text.is_none() && hour < 9 => hour += 12,
        _ => {}
    }

    NaiveTime::from_hms_opt(hour, minute, 0)
}

/// Combines a spoken date and time into a UTC instant, reporting which part
/// could not be understood.
pub fn parse_spoken_start(
    date_raw: &str,
    time_raw: &str,
    today: NaiveDate,
) -> Result<DateTime<Utc>, TimeParseError> {
    let date = parse_spoken_date(date_raw, today)
        .ok_or_else(|| TimeParseError::Date(date_raw.to_string()))?;
    let time =
        parse_spoken_time(time_raw).ok_or_else(|| TimeParseError::Time(time_raw.to_string()))?;
    Ok(date.and_time(time).and_utc())
}
