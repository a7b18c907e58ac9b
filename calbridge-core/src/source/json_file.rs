//! Source reading records from a JSON file.

use std::path::PathBuf;

use serde_json::Value;

use crate::error::{CalendarError, CalendarResult};
use crate::options::{self, Options, Record};
use crate::source::EventSource;

/// Reads `options.path`: a JSON array of record objects, or an object with
/// an `events` array.
#[derive(Debug, Default)]
pub struct JsonFileSource;

impl JsonFileSource {
    pub const KIND: &'static str = "json_file";
    pub const PATH_OPTION: &'static str = "path";
}

pub(crate) fn path_option(options: &Options, key: &str) -> CalendarResult<PathBuf> {
    options::get_str(options, key)
        .filter(|p| !p.is_empty())
        .map(PathBuf::from)
        .ok_or_else(|| CalendarError::InvalidArgument(format!("Missing '{key}' option")))
}

impl EventSource for JsonFileSource {
    fn fetch_results(&mut self, options: &Options) -> CalendarResult<Vec<Record>> {
        let path = path_option(options, Self::PATH_OPTION)?;
        let content = std::fs::read_to_string(&path)?;

        let items = match serde_json::from_str::<Value>(&content)? {
            Value::Array(items) => items,
            Value::Object(mut map) => match map.remove("events") {
                Some(Value::Array(items)) => items,
                _ => {
                    return Err(CalendarError::Serialization(format!(
                        "{} has no 'events' array",
                        path.display()
                    )));
                }
            },
            _ => {
                return Err(CalendarError::Serialization(format!(
                    "{} must contain an array of events",
                    path.display()
                )));
            }
        };

        Ok(items
            .into_iter()
            .filter_map(|item| match item {
                Value::Object(record) => Some(record),
                _ => None,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::Source;
    use crate::source::tests::{record, test_builder};
    use serde_json::json;
    use std::io::Write;

    #[test]
    fn test_reads_records_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"[{{"id": 123, "title": "Conference", "start": "03/11/2017", "end": "05/11/2017", "allDay": true}},
               {{"id": 456, "title": "Call"}}]"#
        )
        .unwrap();

        let options = record(json!({"path": file.path().to_str().unwrap()}));
        let mut source = Source::new(JsonFileSource::KIND, Box::new(JsonFileSource), None, options, test_builder());

        assert_eq!(source.identifier(), "jsonfile");
        let events = source.events(false).unwrap();
        assert_eq!(events.count(), 2);
        assert!(events.get("123").unwrap().is_all_day());
    }

    #[test]
    fn test_accepts_events_wrapper_object() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"events": [{{"id": 1}}]}}"#).unwrap();

        let records = JsonFileSource
            .fetch_results(&record(json!({"path": file.path().to_str().unwrap()})))
            .unwrap();
        assert_eq!(records.len(), 1);
    }

    #[test]
    fn test_missing_path_and_missing_file() {
        let err = JsonFileSource.fetch_results(&Options::new()).unwrap_err();
        assert!(err.is_invalid_argument());

        let err = JsonFileSource
            .fetch_results(&record(json!({"path": "/nonexistent/events.json"})))
            .unwrap_err();
        assert!(matches!(err, CalendarError::Io(_)));
    }
}
