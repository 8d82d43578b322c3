//! Reminder sentence composition.

use chrono::{DateTime, Duration, Utc};
use chrono_tz::Tz;

use crate::error::{RemindError, Result};

/// Sessions starting within this long from now are announced as "today".
const TODAY_WINDOW_HOURS: i64 = 13;

/// True when the session has not started yet and starts within the next 13 hours.
///
/// This is a same-evening heuristic, not a calendar-day comparison.
pub fn is_today(start: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    now < start && start < now + Duration::hours(TODAY_WINDOW_HOURS)
}

/// Compose the reminder sentence for a session starting at `start`.
///
/// The timezone must be supplied by the caller; a missing one is an error,
/// never a silent fallback to UTC.
pub fn compose_reminder(start: DateTime<Utc>, tz: Option<Tz>, now: DateTime<Utc>) -> Result<String> {
    let tz = tz.ok_or(RemindError::MissingTimezone)?;
    let local = start.with_timezone(&tz);

    let (day, date) = if is_today(start, now) {
        ("today".to_string(), String::new())
    } else {
        (local.format("%A").to_string(), local.format(" %-m/%-d").to_string())
    };
    let time = local.format("%-I:%M%p %Z");

    Ok(format!(
        "Hi from Operation Spark! A friendly reminder that you have an Intro to Coding Info Session {day}{date} at {time}."
    ))
}
