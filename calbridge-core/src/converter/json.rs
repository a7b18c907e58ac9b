use std::sync::Arc;

use serde_json::{Value, json};

use crate::calendar::Calendar;
use crate::config::CalendarConfig;
use crate::converter::factory::{ConvertibleEventFactory, JsonFormat};
use crate::converter::{CalendarConverter, ConvertibleEvent};
use crate::error::CalendarResult;
use crate::event::CalendarEvent;
use crate::options::{Options, Record};
use crate::registry::Registry;

/// Default JSON adapter. Datetimes are rendered as epoch seconds.
#[derive(Debug, Clone)]
pub struct JsonEvent {
    event: CalendarEvent,
    options: Options,
}

impl JsonEvent {
    pub fn new(event: CalendarEvent) -> Self {
        JsonEvent {
            event,
            options: Options::new(),
        }
    }
}

impl ConvertibleEvent for JsonEvent {
    type Output = Record;

    fn event(&self) -> &CalendarEvent {
        &self.event
    }

    fn set_options(&mut self, options: &Options) {
        self.options = options.clone();
    }

    fn options(&self) -> &Options {
        &self.options
    }

    fn render(&self) -> Record {
        let event = &self.event;
        let mut record = Record::new();

        record.insert("id".into(), event.id().to_value());
        record.insert("uid".into(), json!(event.uid()));
        record.insert("title".into(), json!(event.title()));
        record.insert("titleShort".into(), json!(event.title_short()));
        record.insert("description".into(), json!(event.description()));
        record.insert("type".into(), json!(event.event_type()));
        record.insert("allDayEvent".into(), json!(event.is_all_day()));
        record.insert("start".into(), json!(event.start().timestamp()));
        record.insert("end".into(), json!(event.end().timestamp()));
        record.insert("created".into(), json!(event.created().timestamp()));
        record.insert("lastModified".into(), json!(event.last_modified().timestamp()));

        if let Some(color) = event.color_code() {
            record.insert("color".into(), Value::String(color));
        }

        record
    }

    fn convert(&self) -> CalendarResult<String> {
        let mut wrapper = Record::new();
        wrapper.insert(self.event.uid().to_string(), Value::Object(self.render()));
        Ok(serde_json::to_string(&wrapper)?)
    }
}

/// Renders `{"events": [...]}` in merge order.
pub struct JsonConverter {
    factory: ConvertibleEventFactory<JsonFormat>,
}

impl JsonConverter {
    pub fn new(config: Arc<CalendarConfig>, registry: Arc<Registry>) -> Self {
        JsonConverter {
            factory: ConvertibleEventFactory::new(config, registry),
        }
    }
}

impl CalendarConverter for JsonConverter {
    fn convert(&self, calendar: &mut Calendar, options: &Options) -> CalendarResult<String> {
        let mut events = Vec::new();
        for event in calendar.events()?.values() {
            let mut adapter = self.factory.build(event)?;
            adapter.set_options(options);
            events.push(Value::Object(adapter.render()));
        }

        Ok(serde_json::to_string(&json!({ "events": events }))?)
    }
}
