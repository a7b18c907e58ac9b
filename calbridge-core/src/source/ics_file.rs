//! Source reading VEVENTs from an `.ics` file.

use chrono::{Duration, NaiveDate, SecondsFormat};
use icalendar::{
    CalendarDateTime, DatePerhapsTime,
    parser::{Component, read_calendar, unfold},
};
use serde_json::{Value, json};
use tracing::{debug, warn};

use crate::datetime;
use crate::error::{CalendarError, CalendarResult};
use crate::options::{self, Options, Record};
use crate::source::EventSource;
use crate::source::json_file::path_option;

/// Every VEVENT of `options.path` becomes one record. `criteria.from` and
/// `criteria.to` (`YYYY-MM-DD`, inclusive) restrict events by start date.
#[derive(Debug, Default)]
pub struct IcsFileSource;

impl IcsFileSource {
    pub const KIND: &'static str = "ics_file";
    pub const PATH_OPTION: &'static str = "path";
}

impl EventSource for IcsFileSource {
    fn fetch_results(&mut self, options: &Options) -> CalendarResult<Vec<Record>> {
        let path = path_option(options, Self::PATH_OPTION)?;
        let content = std::fs::read_to_string(&path)?;

        let (from, to) = date_criteria(options)?;
        let records = parse_records(&content)?;
        let total = records.len();

        let records: Vec<Record> = records
            .into_iter()
            .filter(|(start, _)| {
                from.is_none_or(|from| *start >= from) && to.is_none_or(|to| *start <= to)
            })
            .map(|(_, record)| record)
            .collect();

        debug!(
            path = %path.display(),
            total,
            kept = records.len(),
            "Parsed ics file"
        );
        Ok(records)
    }
}

fn date_criteria(options: &Options) -> CalendarResult<(Option<NaiveDate>, Option<NaiveDate>)> {
    let Some(criteria) = options.get(options::CRITERIA).and_then(Value::as_object) else {
        return Ok((None, None));
    };

    let parse = |key: &str| -> CalendarResult<Option<NaiveDate>> {
        match options::get_str(criteria, key) {
            None => Ok(None),
            Some(raw) => NaiveDate::parse_from_str(raw, "%Y-%m-%d").map(Some).map_err(|_| {
                CalendarError::InvalidArgument(format!(
                    "Criteria '{key}' must be a YYYY-MM-DD date, got '{raw}'"
                ))
            }),
        }
    };

    Ok((parse("from")?, parse("to")?))
}

/// Records with the start date used for criteria filtering.
fn parse_records(content: &str) -> CalendarResult<Vec<(NaiveDate, Record)>> {
    let unfolded = unfold(content);
    let calendar = read_calendar(&unfolded)
        .map_err(|e| CalendarError::Serialization(format!("Invalid ics content: {e}")))?;

    Ok(calendar
        .components
        .iter()
        .filter(|c| c.name == "VEVENT")
        .filter_map(|vevent| {
            let record = to_record(vevent);
            if record.is_none() {
                warn!("Skipping VEVENT without UID or DTSTART");
            }
            record
        })
        .collect())
}

fn to_record(vevent: &Component<'_>) -> Option<(NaiveDate, Record)> {
    let mut record = Record::new();

    let uid = vevent.find_prop("UID")?.val.to_string();
    record.insert("id".into(), json!(uid));

    let dtstart = vevent.find_prop("DTSTART")?;
    let start = DatePerhapsTime::try_from(dtstart).ok()?;
    let end = vevent
        .find_prop("DTEND")
        .and_then(|p| DatePerhapsTime::try_from(p).ok());

    let start_date = match &start {
        DatePerhapsTime::Date(d) => *d,
        DatePerhapsTime::DateTime(dt) => naive_date(dt),
    };

    // all-day values may carry TZID as a plain parameter
    let tzid = match &start {
        DatePerhapsTime::DateTime(CalendarDateTime::WithTimezone { tzid, .. }) => Some(tzid.clone()),
        _ => dtstart
            .params
            .iter()
            .find(|p| p.key == "TZID")
            .and_then(|p| p.val.as_ref().map(|v| v.to_string())),
    };
    if let Some(tzid) = tzid {
        if datetime::parse_timezone(&tzid).is_some() {
            record.insert(options::TIMEZONE.into(), json!(tzid));
        }
    }

    let all_day = matches!(start, DatePerhapsTime::Date(_));
    record.insert("start".into(), time_value(&start, false));
    record.insert(
        "end".into(),
        match &end {
            Some(end) => time_value(end, true),
            None => time_value(&start, false),
        },
    );
    record.insert("allDay".into(), json!(all_day));

    let text = |name: &str| vevent.find_prop(name).map(|p| unescape(p.val.as_ref()));
    if let Some(summary) = text("SUMMARY") {
        record.insert("title".into(), json!(summary));
    }
    if let Some(description) = text("DESCRIPTION") {
        record.insert("description".into(), json!(description));
    }
    if let Some(categories) = text("CATEGORIES") {
        record.insert("type".into(), json!(categories));
    }
    if let Some(location) = text("LOCATION") {
        record.insert("location".into(), json!(location));
    }
    if let Some(class) = text("CLASS") {
        record.insert("public".into(), json!(class.eq_ignore_ascii_case("PUBLIC")));
    }

    Some((start_date, record))
}

fn naive_date(dt: &CalendarDateTime) -> NaiveDate {
    match dt {
        CalendarDateTime::Utc(dt) => dt.date_naive(),
        CalendarDateTime::Floating(naive) => naive.date(),
        CalendarDateTime::WithTimezone { date_time, .. } => date_time.date(),
    }
}

/// Render a DTSTART/DTEND value in a form the event builder parses.
/// All-day DTEND is exclusive in ics, so it is moved back one day.
fn time_value(value: &DatePerhapsTime, is_end: bool) -> Value {
    match value {
        DatePerhapsTime::Date(d) => {
            let date = if is_end { *d - Duration::days(1) } else { *d };
            json!(date.format("%Y-%m-%d").to_string())
        }
        DatePerhapsTime::DateTime(CalendarDateTime::Utc(dt)) => {
            json!(dt.to_rfc3339_opts(SecondsFormat::Secs, true))
        }
        DatePerhapsTime::DateTime(CalendarDateTime::Floating(naive)) => {
            json!(naive.format("%Y-%m-%d %H:%M:%S").to_string())
        }
        DatePerhapsTime::DateTime(CalendarDateTime::WithTimezone { date_time, tzid }) => {
            match datetime::parse_timezone(tzid).and_then(|tz| datetime::localize(*date_time, tz)) {
                Some(dt) => json!(dt.to_rfc3339_opts(SecondsFormat::Secs, true)),
                None => json!(date_time.format("%Y-%m-%d %H:%M:%S").to_string()),
            }
        }
    }
}

/// Reverse RFC 5545 text escaping.
fn unescape(value: &str) -> String {
    let mut result = String::with_capacity(value.len());
    let mut chars = value.chars();

    while let Some(c) = chars.next() {
        if c != '\\' {
            result.push(c);
            continue;
        }
        match chars.next() {
            Some('n') | Some('N') => result.push('\n'),
            Some(escaped @ (',' | ';' | '\\')) => result.push(escaped),
            Some(other) => {
                result.push('\\');
                result.push(other);
            }
            None => result.push('\\'),
        }
    }

    result
}
