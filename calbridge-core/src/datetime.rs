//! Datetime parsing and formatting helpers.
//!
//! Events carry `DateTime<Tz>` values; raw records may hold RFC 3339 strings,
//! naive local datetimes, plain dates or epoch seconds.

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;
use serde_json::Value;

/// RFC 2445 UTC timestamp, e.g. `20130928T175328Z`.
pub const ICAL_UTC_FORMAT: &str = "%Y%m%dT%H%M%SZ";
pub const ICAL_LOCAL_FORMAT: &str = "%Y%m%dT%H%M%S";
pub const ICAL_DATE_FORMAT: &str = "%Y%m%d";
/// ISO 8601 without timezone suffix, as FullCalendar expects.
pub const FULLCALENDAR_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

const NAIVE_DATETIME_FORMATS: [&str; 7] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%d/%m/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M",
    "%Y%m%dT%H%M%S",
];

const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%d/%m/%Y", "%Y%m%d"];

pub fn parse_timezone(name: &str) -> Option<Tz> {
    name.trim().parse::<Tz>().ok()
}

/// Current time truncated to the minute.
pub fn now_in(tz: Tz) -> DateTime<Tz> {
    let now = Utc::now();
    let secs = now.timestamp();
    DateTime::from_timestamp(secs - secs.rem_euclid(60), 0)
        .unwrap_or(now)
        .with_timezone(&tz)
}

/// Interpret a wall-clock datetime in `tz` (earliest match on DST folds).
pub fn localize(naive: NaiveDateTime, tz: Tz) -> Option<DateTime<Tz>> {
    tz.from_local_datetime(&naive).earliest()
}

/// Same calendar date, different wall-clock time.
pub fn with_time(dt: &DateTime<Tz>, hour: u32, minute: u32, second: u32) -> DateTime<Tz> {
    dt.date_naive()
        .and_hms_opt(hour, minute, second)
        .and_then(|naive| localize(naive, dt.timezone()))
        .unwrap_or(*dt)
}

pub fn parse_datetime(value: &Value, tz: Tz) -> Option<DateTime<Tz>> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .and_then(|secs| DateTime::from_timestamp(secs, 0))
            .map(|dt| dt.with_timezone(&tz)),
        Value::String(s) => parse_datetime_str(s, tz),
        _ => None,
    }
}

/// Parse a datetime string; values without offset are local to `tz`.
pub fn parse_datetime_str(s: &str, tz: Tz) -> Option<DateTime<Tz>> {
    let s = s.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&tz));
    }

    if let Some(naive) = s
        .strip_suffix('Z')
        .and_then(|utc| NaiveDateTime::parse_from_str(utc, ICAL_LOCAL_FORMAT).ok())
    {
        return Some(naive.and_utc().with_timezone(&tz));
    }

    for format in NAIVE_DATETIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, format) {
            return localize(naive, tz);
        }
    }

    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(s, format) {
            return localize(date.and_hms_opt(0, 0, 0)?, tz);
        }
    }

    None
}

/// Format as an RFC 2445 UTC timestamp.
pub fn format_ical_utc<T: TimeZone>(dt: &DateTime<T>) -> String {
    dt.with_timezone(&Utc).format(ICAL_UTC_FORMAT).to_string()
}
