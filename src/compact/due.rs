//! Due-date parsing and the tiny humanized labels shown on the display.

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, NaiveTime};

const MINUTE: i64 = 60;
const HOUR: i64 = 60 * MINUTE;
const DAY: i64 = 24 * HOUR;

pub const NO_DATE_LABEL: &str = "no date";
pub const TODAY_LABEL: &str = "today";

/// Parse a due value into local wall-clock time.
///
/// Date-only values land on local midnight of that date. Values with an
/// offset are converted to the local zone; naive date-times are taken as-is.
pub fn parse_due(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Some(date.and_time(NaiveTime::MIN));
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(dt);
    }
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| dt.with_timezone(&Local).naive_local())
}

/// Display label for a task's due value relative to `now`.
pub fn due_label(raw: Option<&str>, now: NaiveDateTime) -> String {
    let Some(raw) = raw else {
        return NO_DATE_LABEL.to_string();
    };
    match parse_due(raw) {
        Some(due) => humanize(due, now),
        None => raw.trim().to_string(),
    }
}

/// `today` for local midnight of today, otherwise `2d ago` / `in 3h`.
pub fn humanize(due: NaiveDateTime, now: NaiveDateTime) -> String {
    if due == now.date().and_time(NaiveTime::MIN) {
        return TODAY_LABEL.to_string();
    }

    let delta = now.signed_duration_since(due).num_seconds();
    let Some(span) = tiny_span(delta.unsigned_abs()) else {
        return "now".to_string();
    };
    if delta > 0 {
        format!("{span} ago")
    } else {
        format!("in {span}")
    }
}

fn tiny_span(secs: u64) -> Option<String> {
    let secs = i64::try_from(secs).unwrap_or(i64::MAX);
    let days = secs / DAY;
    let span = match secs {
        0 => return None,
        s if s < MINUTE => format!("{s}s"),
        s if s < HOUR => format!("{}m", s / MINUTE),
        s if s < DAY => format!("{}h", s / HOUR),
        _ if days < 7 => format!("{days}d"),
        _ if days < 31 => format!("{}w", days / 7),
        _ if days < 365 => format!("{}M", (days * 2 / 61).max(1)),
        _ => format!("{}y", days / 365),
    };
    Some(span)
}
