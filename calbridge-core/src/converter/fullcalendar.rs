//! FullCalendar event objects.
//!
//! The default adapter maps an event onto the keys FullCalendar reads
//! (`id`, `title`, `allDay`, `start`, `end`, `editable`) plus a few extras
//! used by tooltips. Attribute overrides let configuration compose extra
//! keys out of event fields and literals:
//!
//! ```text
//! attributes = { title = ["[", "type", "] ", "title"], editable = [true] }
//! ```
//!
//! Strings naming a non-empty event field are replaced by that field,
//! other strings are kept literally and everything is concatenated.

use std::sync::Arc;

use serde_json::{Value, json};

use crate::calendar::Calendar;
use crate::config::CalendarConfig;
use crate::converter::factory::{ConvertibleEventFactory, FullCalendarFormat};
use crate::converter::{CalendarConverter, ConvertibleEvent};
use crate::datetime::FULLCALENDAR_FORMAT;
use crate::error::CalendarResult;
use crate::event::CalendarEvent;
use crate::options::{self, Options, Record};
use crate::registry::Registry;

/// Option holding attribute overrides.
pub const ATTRIBUTES_OPTION: &str = "attributes";

#[derive(Debug, Clone)]
pub struct FullCalendarEvent {
    event: CalendarEvent,
    options: Options,
    title: Option<String>,
    title_details: Option<String>,
    description: String,
    editable: bool,
    attributes: Options,
}

impl FullCalendarEvent {
    pub fn new(event: CalendarEvent) -> Self {
        FullCalendarEvent {
            title: event.title().map(str::to_string),
            description: event.description().unwrap_or_default().to_string(),
            event,
            options: Options::new(),
            title_details: None,
            editable: false,
            attributes: Options::new(),
        }
    }

    pub fn set_title(&mut self, title: impl Into<String>) -> &mut Self {
        self.title = Some(title.into());
        self
    }

    /// Hover text; the description is used when unset.
    pub fn set_title_details(&mut self, details: impl Into<String>) -> &mut Self {
        self.title_details = Some(details.into());
        self
    }

    pub fn set_description(&mut self, description: impl Into<String>) -> &mut Self {
        self.description = description.into();
        self
    }

    pub fn set_editable(&mut self, editable: bool) -> &mut Self {
        self.editable = editable;
        self
    }

    pub fn attributes(&self) -> &Options {
        &self.attributes
    }

    pub fn set_attributes(&mut self, attributes: Options) -> &mut Self {
        self.attributes = attributes;
        self
    }

    fn resolve_attribute(&self, attribute: &Value) -> Value {
        let elements: Vec<&Value> = match attribute {
            Value::Array(items) => items.iter().collect(),
            single => vec![single],
        };

        let mut value = Value::Null;
        for element in elements {
            match element {
                Value::Array(_) => {
                    let nested = self.resolve_attribute(element);
                    append_text(&mut value, &nested);
                }
                Value::String(text) => match self.event_field(text) {
                    Some(Value::Array(items)) => value = titles(&items),
                    Some(field) => append_text(&mut value, &field),
                    None => append_text(&mut value, element),
                },
                Value::Bool(_) => value = element.clone(),
                Value::Number(n) if n.is_i64() || n.is_u64() => value = element.clone(),
                _ => {}
            }
        }
        value
    }

    /// A non-empty event field named by `name`, if `name` is alphanumeric.
    fn event_field(&self, name: &str) -> Option<Value> {
        if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric()) {
            return None;
        }
        self.event.field(name).filter(is_truthy)
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty() && s != "0",
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

fn append_text(target: &mut Value, piece: &Value) {
    let mut text = options::value_as_string(target).unwrap_or_default();
    text.push_str(&options::value_as_string(piece).unwrap_or_default());
    *target = Value::String(text);
}

fn titles(items: &[Value]) -> Value {
    Value::Array(
        items
            .iter()
            .filter_map(|item| item.get("title").cloned())
            .collect(),
    )
}

impl ConvertibleEvent for FullCalendarEvent {
    type Output = Record;

    fn event(&self) -> &CalendarEvent {
        &self.event
    }

    /// `options.attributes`, when an object, replaces the attribute overrides.
    fn set_options(&mut self, options: &Options) {
        self.options = options.clone();
        if let Some(Value::Object(attributes)) = options.get(ATTRIBUTES_OPTION) {
            self.attributes = attributes.clone();
        }
    }

    fn options(&self) -> &Options {
        &self.options
    }

    fn render(&self) -> Record {
        let event = &self.event;
        let mut record = Record::new();

        record.insert("id".into(), json!(event.uid()));
        record.insert("idBySource".into(), event.id().to_value());
        record.insert("title".into(), json!(self.title));
        record.insert(
            "titleDetails".into(),
            json!(self.title_details.as_deref().unwrap_or(self.description.as_str())),
        );
        record.insert("description".into(), json!(self.description));
        record.insert("published".into(), json!(event.is_public()));
        record.insert("type".into(), json!(event.event_type()));
        record.insert("allDay".into(), json!(event.is_all_day()));
        record.insert("start".into(), json!(event.start().format(FULLCALENDAR_FORMAT).to_string()));
        record.insert("end".into(), json!(event.end().format(FULLCALENDAR_FORMAT).to_string()));
        record.insert("editable".into(), json!(self.editable));

        for (key, attribute) in &self.attributes {
            record.insert(key.clone(), self.resolve_attribute(attribute));
        }

        record
    }

    fn convert(&self) -> CalendarResult<String> {
        Ok(serde_json::to_string(&self.render())?)
    }
}

/// Renders a flat array of FullCalendar event objects.
pub struct FullCalendarConverter {
    factory: ConvertibleEventFactory<FullCalendarFormat>,
}

impl FullCalendarConverter {
    pub fn new(config: Arc<CalendarConfig>, registry: Arc<Registry>) -> Self {
        FullCalendarConverter {
            factory: ConvertibleEventFactory::new(config, registry),
        }
    }
}

impl CalendarConverter for FullCalendarConverter {
    fn convert(&self, calendar: &mut Calendar, options: &Options) -> CalendarResult<String> {
        let mut events = Vec::new();
        for event in calendar.events()?.values() {
            let mut adapter = self.factory.build(event)?;
            adapter.set_options(options);
            events.push(Value::Object(adapter.render()));
        }
        Ok(serde_json::to_string(&events)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::CalendarBuilder;
    use crate::event::EventKind;

    fn options(value: Value) -> Options {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    fn event(values: Value) -> CalendarEvent {
        let kind = EventKind::default().with_attributes(["location", "speakers"]);
        let mut event = CalendarEvent::new(
            5,
            Arc::new(kind),
            options(json!({"prefix_identifier": "fc-", "timezone": "Europe/Berlin"})),
        );
        event.hydrate(options(values));
        event
    }

    #[test]
    fn test_render_default_keys() {
        let record = FullCalendarEvent::new(event(json!({
            "title": "Lecture",
            "type": "course",
            "start": "2017-08-31 09:15",
            "end": "2017-08-31 22:00"
        })))
        .render();

        assert_eq!(record["id"], "fc-5");
        assert_eq!(record["idBySource"], 5);
        assert_eq!(record["title"], "Lecture");
        assert_eq!(record["description"], "", "missing description renders empty");
        assert_eq!(record["titleDetails"], "");
        assert_eq!(record["published"], true);
        assert_eq!(record["type"], "course");
        assert_eq!(record["allDay"], false);
        assert_eq!(record["start"], "2017-08-31T09:15:00");
        assert_eq!(record["end"], "2017-08-31T22:00:00");
        assert_eq!(record["editable"], false);
    }

    #[test]
    fn test_times_are_wall_clock_in_event_timezone() {
        let record = FullCalendarEvent::new(event(json!({
            "start": "2017-08-31T07:15:00Z",
            "end": "2017-08-31T20:00:00Z"
        })))
        .render();

        assert_eq!(record["start"], "2017-08-31T09:15:00");
        assert_eq!(record["end"], "2017-08-31T22:00:00");
    }

    #[test]
    fn test_title_details_override() {
        let mut adapter = FullCalendarEvent::new(event(json!({"description": "Long text"})));
        assert_eq!(adapter.render()["titleDetails"], "Long text");

        adapter.set_title_details("Hover");
        let record = adapter.render();
        assert_eq!(record["titleDetails"], "Hover");
        assert_eq!(record["description"], "Long text");
    }

    #[test]
    fn test_attribute_overrides_resolve_fields_and_literals() {
        let mut adapter = FullCalendarEvent::new(event(json!({
            "title": "Lecture",
            "type": "course",
            "location": "Room 4"
        })));
        adapter.set_options(&options(json!({"attributes": {
            "title": ["[", "type", "] ", "title"],
            "where": ["location", [" / ", "building"]],
            "editable": [true],
            "priority": 3,
            "plain": "description"
        }})));
        let record = adapter.render();

        assert_eq!(record["title"], "[course] Lecture");
        assert_eq!(record["where"], "Room 4 / building", "unknown names stay literal");
        assert_eq!(record["editable"], true);
        assert_eq!(record["priority"], 3);
        assert_eq!(record["plain"], "description", "empty fields are not substituted");
    }

    #[test]
    fn test_attribute_with_object_list_yields_titles() {
        let mut adapter = FullCalendarEvent::new(event(json!({
            "speakers": [{"title": "Ada"}, {"title": "Grace"}]
        })));
        adapter.set_attributes(options(json!({"speakers": ["speakers"]})));

        assert_eq!(adapter.render()["speakers"], json!(["Ada", "Grace"]));
    }

    #[test]
    fn test_calendar_document_is_flat_array() {
        let builder = CalendarBuilder::new(CalendarConfig::default(), Registry::with_defaults());
        let source = options(json!({
            "timezone": "Europe/Berlin",
            "events": [
                {"id": 1, "title": "One", "start": "2017-08-31 09:15", "end": "2017-08-31 22:00"},
                {"id": 2, "title": "Two", "start": "2017-09-01", "end": "2017-09-01", "allDay": true}
            ]
        }));
        let mut calendar = builder.build("demo", vec![("inline", source)]).unwrap();

        let output = FullCalendarConverter::new(builder.config().clone(), builder.registry().clone())
            .convert(&mut calendar, &Options::new())
            .unwrap();
        let parsed: Value = serde_json::from_str(&output).unwrap();
        let events = parsed.as_array().expect("flat array");

        assert_eq!(events.len(), 2);
        assert_eq!(events[0]["start"], "2017-08-31T09:15:00");
        assert_eq!(events[1]["allDay"], true);
        assert_eq!(events[1]["end"], "2017-09-01T23:59:59");
    }
}
