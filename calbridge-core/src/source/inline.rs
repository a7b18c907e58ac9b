//! Source serving records given directly in its options.

use serde_json::Value;

use crate::error::{CalendarError, CalendarResult};
use crate::options::{Options, Record};
use crate::source::EventSource;

/// Records come from `options.events`, an array of objects.
#[derive(Debug, Default)]
pub struct InlineSource;

impl InlineSource {
    pub const KIND: &'static str = "inline";
    pub const EVENTS_OPTION: &'static str = "events";
}

impl EventSource for InlineSource {
    fn fetch_results(&mut self, options: &Options) -> CalendarResult<Vec<Record>> {
        match options.get(Self::EVENTS_OPTION) {
            None | Some(Value::Null) => Ok(Vec::new()),
            Some(Value::Array(items)) => items
                .iter()
                .enumerate()
                .map(|(i, item)| match item {
                    Value::Object(record) => Ok(record.clone()),
                    other => Err(CalendarError::InvalidArgument(format!(
                        "Inline event #{i} must be an object, got {other}"
                    ))),
                })
                .collect(),
            Some(other) => Err(CalendarError::InvalidArgument(format!(
                "Option '{}' must be an array of events, got {other}",
                Self::EVENTS_OPTION
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::Source;
    use crate::source::tests::{record, test_builder};
    use serde_json::json;

    #[test]
    fn test_inline_records_become_events() {
        let options = record(json!({
            "prefix_identifier": "demo-",
            "events": [
                {"id": 1, "title": "Kickoff", "start": "2017-08-31 09:15", "end": "2017-08-31 10:00"},
                {"id": "b", "title": "Review"}
            ]
        }));
        let mut source = Source::new(InlineSource::KIND, Box::new(InlineSource), None, options, test_builder());

        let events = source.events(false).unwrap();
        let uids: Vec<&str> = events.keys().collect();
        assert_eq!(uids, vec!["demo-1", "demo-b"]);
        assert_eq!(events.get("demo-1").and_then(|e| e.title()), Some("Kickoff"));
    }

    #[test]
    fn test_inline_rejects_non_objects() {
        let mut source = InlineSource;
        let err = source
            .fetch_results(&record(json!({"events": [1, 2]})))
            .unwrap_err();
        assert!(err.is_invalid_argument());

        assert!(source.fetch_results(&Options::new()).unwrap().is_empty());
    }
}
