//! Lookahead period parsing: "2 days", "3 hours", "45 min".

use chrono::{Duration, Utc};

use crate::error::{RemindError, Result};

/// Parse a `"<integer> <unit>"` period into a duration.
///
/// Units are matched by case-sensitive substring, checked in the order
/// `day`, `hour`, `min`; the first match wins, so `"3 daymin"` is three days.
pub fn parse_period(period: &str) -> Result<Duration> {
    let trimmed = period.trim();
    let (magnitude, unit) = match trimmed.split_once(char::is_whitespace) {
        Some((n, rest)) => (n, rest.trim()),
        None => (trimmed, ""),
    };

    let n: i64 = magnitude.parse().map_err(|e| RemindError::Parse {
        period: period.to_string(),
        reason: format!("\"{magnitude}\" is not a whole number ({e})"),
    })?;

    let duration = if unit.contains("day") {
        Duration::try_days(n)
    } else if unit.contains("hour") {
        Duration::try_hours(n)
    } else if unit.contains("min") {
        Duration::try_minutes(n)
    } else {
        return Err(RemindError::UnsupportedUnit(period.to_string()));
    };

    // The window must also land on a representable date from now.
    match duration.filter(|d| Utc::now().checked_add_signed(*d).is_some()) {
        Some(d) => Ok(d),
        None => Err(RemindError::Parse {
            period: period.to_string(),
            reason: "period is out of range".into(),
        }),
    }
}
