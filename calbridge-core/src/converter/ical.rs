//! iCalendar output.
//!
//! Events are rendered with the `icalendar` crate and the resulting text is
//! normalized afterwards: our own PRODID, no CALSCALE line, CRLF endings.

use std::sync::{Arc, LazyLock};

use chrono::{DateTime, Duration, Utc};
use chrono_tz::Tz;
use icalendar::{Calendar as IcsCalendar, Component, EventLike, Property, ValueType};
use regex::Regex;

use crate::calendar::Calendar;
use crate::config::CalendarConfig;
use crate::converter::factory::{ConvertibleEventFactory, IcalFormat};
use crate::converter::{CalendarConverter, ConvertibleEvent};
use crate::datetime::{self, ICAL_DATE_FORMAT, ICAL_LOCAL_FORMAT};
use crate::error::CalendarResult;
use crate::event::CalendarEvent;
use crate::options::{self, Options};
use crate::registry::Registry;

pub type IcalOutput = icalendar::Event;

pub const PRODID: &str = "-//CALBRIDGE";

static TIMESTAMP_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9]{8}T[0-9]{6}Z$").expect("valid timestamp pattern"));

pub fn is_valid_timestamp(value: &str) -> bool {
    TIMESTAMP_PATTERN.is_match(value)
}

/// Default VEVENT adapter.
///
/// Recognized options: `uid_prefix`, and `dtstamp`, `created`,
/// `last_modified` as `YYYYMMDDTHHMMSSZ` timestamps (other values are
/// ignored). All three timestamps default to the adapter's build time.
#[derive(Debug, Clone)]
pub struct IcalEvent {
    event: CalendarEvent,
    options: Options,
    uid_prefix: String,
    dtstamp: String,
    created: String,
    last_modified: String,
    summary: Option<String>,
    description: Option<String>,
    location: Option<String>,
    categories: Option<String>,
    class: String,
    transp: String,
    status: String,
    intended_status: String,
}

impl IcalEvent {
    pub fn new(event: CalendarEvent) -> Self {
        let now = datetime::format_ical_utc(&Utc::now());
        let location = event
            .attribute("location")
            .and_then(options::value_as_string);

        IcalEvent {
            summary: event.title().map(str::to_string),
            description: event.description().map(str::to_string),
            categories: event.event_type().map(str::to_string),
            location,
            event,
            options: Options::new(),
            uid_prefix: String::new(),
            dtstamp: now.clone(),
            created: now.clone(),
            last_modified: now,
            class: "PUBLIC".into(),
            transp: "OPAQUE".into(),
            status: "CONFIRMED".into(),
            intended_status: "BUSY".into(),
        }
    }

    pub fn uid(&self) -> String {
        format!("{}{}", self.uid_prefix, self.event.uid())
    }

    pub fn set_uid_prefix(&mut self, prefix: impl Into<String>) -> &mut Self {
        self.uid_prefix = prefix.into();
        self
    }

    pub fn dtstamp(&self) -> &str {
        &self.dtstamp
    }

    /// Ignored unless `timestamp` looks like `20171103T100000Z`.
    pub fn set_dtstamp(&mut self, timestamp: &str) -> &mut Self {
        if is_valid_timestamp(timestamp) {
            self.dtstamp = timestamp.to_string();
        }
        self
    }

    pub fn created(&self) -> &str {
        &self.created
    }

    pub fn set_created(&mut self, timestamp: &str) -> &mut Self {
        if is_valid_timestamp(timestamp) {
            self.created = timestamp.to_string();
        }
        self
    }

    pub fn last_modified(&self) -> &str {
        &self.last_modified
    }

    pub fn set_last_modified(&mut self, timestamp: &str) -> &mut Self {
        if is_valid_timestamp(timestamp) {
            self.last_modified = timestamp.to_string();
        }
        self
    }

    pub fn set_summary(&mut self, summary: impl Into<String>) -> &mut Self {
        self.summary = Some(summary.into());
        self
    }

    pub fn set_description(&mut self, description: impl Into<String>) -> &mut Self {
        self.description = Some(description.into());
        self
    }

    pub fn set_location(&mut self, location: impl Into<String>) -> &mut Self {
        self.location = Some(location.into());
        self
    }

    pub fn set_categories(&mut self, categories: impl Into<String>) -> &mut Self {
        self.categories = Some(categories.into());
        self
    }

    pub fn set_class(&mut self, class: impl Into<String>) -> &mut Self {
        self.class = class.into();
        self
    }

    pub fn set_transp(&mut self, transp: impl Into<String>) -> &mut Self {
        self.transp = transp.into();
        self
    }

    pub fn set_status(&mut self, status: impl Into<String>) -> &mut Self {
        self.status = status.into();
        self
    }

    pub fn set_intended_status(&mut self, status: impl Into<String>) -> &mut Self {
        self.intended_status = status.into();
        self
    }

    fn add_start_end(&self, vevent: &mut IcalOutput) {
        let start = self.event.start();
        let end = self.event.end();
        let tz = start.timezone();

        if self.event.is_all_day() {
            let start_date = start.date_naive();
            let mut end_date = end.date_naive();
            // DTEND is exclusive for all-day events
            if start != end {
                end_date += Duration::days(1);
            }
            for (name, date) in [("DTSTART", start_date), ("DTEND", end_date)] {
                let mut prop = Property::new(name, date.format(ICAL_DATE_FORMAT).to_string());
                prop.add_parameter("TZID", tz.name());
                prop.append_parameter(ValueType::Date);
                vevent.append_property(prop);
            }
            return;
        }

        for (name, dt) in [("DTSTART", *start), ("DTEND", end.with_timezone(&tz))] {
            vevent.append_property(zoned_property(name, &dt, tz));
        }
    }
}

fn zoned_property(name: &str, dt: &DateTime<Tz>, tz: Tz) -> Property {
    let mut prop = Property::new(name, dt.format(ICAL_LOCAL_FORMAT).to_string());
    prop.add_parameter("TZID", tz.name());
    prop
}

impl ConvertibleEvent for IcalEvent {
    type Output = IcalOutput;

    fn event(&self) -> &CalendarEvent {
        &self.event
    }

    fn set_options(&mut self, options: &Options) {
        self.options = options.clone();

        if let Some(prefix) = options::get_str(options, "uid_prefix") {
            self.uid_prefix = prefix.to_string();
        }
        if let Some(timestamp) = options::get_str(options, "dtstamp") {
            self.set_dtstamp(timestamp);
        }
        if let Some(timestamp) = options::get_str(options, "created") {
            self.set_created(timestamp);
        }
        if let Some(timestamp) = options::get_str(options, "last_modified") {
            self.set_last_modified(timestamp);
        }
    }

    fn options(&self) -> &Options {
        &self.options
    }

    fn render(&self) -> IcalOutput {
        let mut vevent = icalendar::Event::new();
        vevent.uid(&self.uid());
        vevent.add_property("DTSTAMP", &self.dtstamp);
        self.add_start_end(&mut vevent);

        vevent.add_property("CLASS", &self.class);
        vevent.add_property("CREATED", &self.created);
        vevent.add_property("LAST-MODIFIED", &self.last_modified);
        vevent.add_property("SEQUENCE", "0");
        vevent.add_property("STATUS", &self.status);
        vevent.add_property("TRANSP", &self.transp);
        vevent.add_property("X-MICROSOFT-CDO-INTENDEDSTATUS", &self.intended_status);

        if let Some(summary) = &self.summary {
            vevent.summary(summary);
        }
        if let Some(description) = &self.description {
            vevent.description(&description.replace("\r\n", "\n"));
        }
        if let Some(location) = &self.location {
            vevent.location(location);
        }
        if let Some(categories) = &self.categories {
            vevent.add_property("CATEGORIES", categories);
        }

        vevent.done()
    }

    /// The VEVENT block alone.
    fn convert(&self) -> CalendarResult<String> {
        let mut cal = IcsCalendar::new();
        cal.push(self.render());
        let text = normalize(&cal.done().to_string());

        let mut block = String::new();
        let mut inside = false;
        for line in text.split("\r\n") {
            if line == "BEGIN:VEVENT" {
                inside = true;
            }
            if inside {
                block.push_str(line);
                block.push_str("\r\n");
            }
            if line == "END:VEVENT" {
                break;
            }
        }
        Ok(block)
    }
}

/// Normalize `icalendar` output: PRODID, no CALSCALE, CRLF line endings.
fn normalize(ics: &str) -> String {
    let mut result = String::with_capacity(ics.len());

    for line in ics.lines() {
        if line.starts_with("PRODID:") {
            result.push_str("PRODID:");
            result.push_str(PRODID);
            result.push_str("\r\n");
            continue;
        }
        if line == "CALSCALE:GREGORIAN" {
            continue;
        }
        result.push_str(line);
        result.push_str("\r\n");
    }

    result
}

/// Renders a calendar as one VCALENDAR document.
pub struct IcalConverter {
    factory: ConvertibleEventFactory<IcalFormat>,
}

impl IcalConverter {
    pub fn new(config: Arc<CalendarConfig>, registry: Arc<Registry>) -> Self {
        IcalConverter {
            factory: ConvertibleEventFactory::new(config, registry),
        }
    }
}

impl CalendarConverter for IcalConverter {
    fn convert(&self, calendar: &mut Calendar, options: &Options) -> CalendarResult<String> {
        let mut cal = IcsCalendar::new();

        for event in calendar.events()?.values() {
            let mut adapter = self.factory.build(event)?;
            adapter.set_options(options);
            cal.push(adapter.render());
        }

        Ok(normalize(&cal.done().to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::CalendarBuilder;
    use crate::event::EventKind;
    use serde_json::{Value, json};

    fn event(values: Value) -> CalendarEvent {
        let mut event = CalendarEvent::new(123, Arc::new(EventKind::default()), Options::new());
        match values {
            Value::Object(map) => event.hydrate(map),
            _ => panic!("expected object"),
        }
        event
    }

    fn options(value: Value) -> Options {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn test_all_day_values_are_zoned_dates_with_exclusive_end() {
        let adapter = IcalEvent::new(event(json!({
            "title": "Conference",
            "timezone": "Europe/Paris",
            "start": "2017-11-03",
            "end": "2017-11-03",
            "allDay": true
        })));
        let vevent = adapter.convert().unwrap();

        let dtstart = property_line(&vevent, "DTSTART");
        assert!(dtstart.ends_with(":20171103"), "got: {dtstart}");
        assert!(dtstart.contains(";VALUE=DATE"), "got: {dtstart}");
        assert!(dtstart.contains(";TZID=Europe/Paris"), "all-day start keeps its zone: {dtstart}");

        let dtend = property_line(&vevent, "DTEND");
        assert!(dtend.ends_with(":20171104"), "got: {dtend}");
        assert!(dtend.contains(";VALUE=DATE"), "got: {dtend}");
        assert!(dtend.contains(";TZID=Europe/Paris"), "got: {dtend}");
    }

    fn property_line<'a>(vevent: &'a str, name: &str) -> &'a str {
        vevent
            .split("\r\n")
            .find(|line| line.starts_with(&format!("{name};")))
            .unwrap_or_else(|| panic!("no {name} line in: {vevent}"))
    }

    #[test]
    fn test_timed_event_uses_start_timezone() {
        let adapter = IcalEvent::new(event(json!({
            "timezone": "Europe/Berlin",
            "start": "2017-03-16 14:00",
            "end": "2017-03-16T15:30:00Z"
        })));
        let vevent = adapter.convert().unwrap();

        assert!(vevent.contains("DTSTART;TZID=Europe/Berlin:20170316T140000\r\n"), "got: {vevent}");
        assert!(vevent.contains("DTEND;TZID=Europe/Berlin:20170316T163000\r\n"), "got: {vevent}");
    }

    #[test]
    fn test_fixed_fields_and_uid_prefix() {
        let mut adapter = IcalEvent::new(event(json!({"title": "Call", "type": "work"})));
        adapter.set_options(&options(json!({"uid_prefix": "cal-"})));
        let vevent = adapter.convert().unwrap();

        for line in [
            "BEGIN:VEVENT",
            "UID:cal-123",
            "CLASS:PUBLIC",
            "TRANSP:OPAQUE",
            "STATUS:CONFIRMED",
            "SEQUENCE:0",
            "X-MICROSOFT-CDO-INTENDEDSTATUS:BUSY",
            "SUMMARY:Call",
            "CATEGORIES:work",
            "END:VEVENT",
        ] {
            assert!(vevent.contains(&format!("{line}\r\n")), "missing {line} in: {vevent}");
        }
    }

    #[test]
    fn test_timestamp_overrides_are_validated() {
        let mut adapter = IcalEvent::new(event(json!({})));
        let build_time = adapter.dtstamp().to_string();
        assert!(is_valid_timestamp(&build_time));

        adapter.set_options(&options(json!({
            "dtstamp": "20130928T175328Z",
            "created": "2013-09-28",
            "last_modified": "20130928T175328"
        })));

        assert_eq!(adapter.dtstamp(), "20130928T175328Z");
        assert_eq!(adapter.created(), build_time, "invalid values are ignored");
        assert_eq!(adapter.last_modified(), build_time);
        assert!(adapter.convert().unwrap().contains("DTSTAMP:20130928T175328Z\r\n"));
    }

    #[test]
    fn test_is_valid_timestamp() {
        assert!(is_valid_timestamp("20171103T100000Z"));
        assert!(!is_valid_timestamp("20171103T100000"));
        assert!(!is_valid_timestamp("2017-11-03T10:00:00Z"));
        assert!(!is_valid_timestamp(" 20171103T100000Z"));
    }

    /// Adapter that takes its summary from a custom attribute and marks the
    /// event tentative.
    struct TentativeEvent(IcalEvent);

    impl ConvertibleEvent for TentativeEvent {
        type Output = IcalOutput;

        fn event(&self) -> &CalendarEvent {
            self.0.event()
        }

        fn set_options(&mut self, options: &Options) {
            self.0.set_options(options);
        }

        fn options(&self) -> &Options {
            self.0.options()
        }

        fn render(&self) -> IcalOutput {
            let mut inner = self.0.clone();
            inner.set_status("TENTATIVE");
            if let Some(special) = self.event().attribute("special").and_then(Value::as_str) {
                inner.set_summary(special);
            }
            inner.render()
        }

        fn convert(&self) -> CalendarResult<String> {
            let mut inner = self.0.clone();
            inner.set_status("TENTATIVE");
            inner.convert()
        }
    }

    #[test]
    fn test_calendar_document_with_configured_adapter() {
        let config = CalendarConfig::from_toml_str(
            "[calendar.converters.ical]\nspecial = \"tentative\"\n",
        )
        .unwrap();
        let mut registry = Registry::with_defaults();
        registry.register_event_kind(EventKind::new("special").with_attributes(["special"]));
        registry.register_ical_adapter(
            "tentative",
            Arc::new(
                |event: &CalendarEvent| -> CalendarResult<Box<dyn ConvertibleEvent<Output = IcalOutput>>> {
                    Ok(Box::new(TentativeEvent(IcalEvent::new(event.clone()))))
                },
            ),
        );

        let builder = CalendarBuilder::new(config, registry);
        let mut source_options = Options::new();
        source_options.insert("event".into(), json!("special"));
        source_options.insert(
            "events".into(),
            json!([{"id": 1, "title": "Plain title", "special": "Special title"}]),
        );
        let mut calendar = builder.build("demo", vec![("inline", source_options)]).unwrap();

        let converter = IcalConverter::new(builder.config().clone(), builder.registry().clone());
        let output = converter.convert(&mut calendar, &Options::new()).unwrap();

        assert!(output.starts_with("BEGIN:VCALENDAR\r\n"));
        assert!(output.ends_with("END:VCALENDAR\r\n"));
        assert!(output.contains("VERSION:2.0\r\n"));
        assert!(output.contains("PRODID:-//CALBRIDGE\r\n"));
        assert!(!output.contains("CALSCALE"));
        assert!(output.contains("SUMMARY:Special title\r\n"), "got: {output}");
        assert!(output.contains("STATUS:TENTATIVE\r\n"));
        assert!(!output.contains("\n\n"), "every line ends with CRLF");
    }
}
