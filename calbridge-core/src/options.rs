//! Free-form option maps and name helpers shared by builders, sources and converters.

use serde_json::Value;

/// Free-form options passed to sources, events and converter adapters.
pub type Options = serde_json::Map<String, Value>;

/// One raw record fetched by a source (field name → value).
pub type Record = serde_json::Map<String, Value>;

/// Identifier prefix prepended to the event id to build its uid.
pub const PREFIX_IDENTIFIER: &str = "prefix_identifier";
/// Color strategy alias or `{name, attributes}` descriptor.
pub const COLOR_STRATEGY: &str = "color_strategy";
/// IANA timezone name used for event datetimes.
pub const TIMEZONE: &str = "timezone";
/// Source criteria sub-map.
pub const CRITERIA: &str = "criteria";

const CANONICALIZE_CHARS: [char; 5] = ['-', '_', ' ', '\\', '/'];

/// Lowercase a name and strip separators (`- _ space \ /`).
///
/// Used for source identifiers, converter formats and kind lookups, so
/// `Full-Calendar`, `full_calendar` and `FullCalendar` all resolve alike.
pub fn canonicalize(name: &str) -> String {
    name.chars()
        .filter(|c| !CANONICALIZE_CHARS.contains(c))
        .flat_map(char::to_lowercase)
        .collect()
}

/// Get a string option, ignoring values of any other JSON type.
pub fn get_str<'a>(options: &'a Options, key: &str) -> Option<&'a str> {
    options.get(key).and_then(Value::as_str)
}

/// Merge `other` into `target`: nested objects are merged recursively,
/// arrays are appended, any other value replaces the existing one.
pub fn merge(target: &mut Options, other: &Options) {
    for (key, value) in other {
        match (target.get_mut(key), value) {
            (Some(Value::Object(existing)), Value::Object(incoming)) => merge(existing, incoming),
            (Some(Value::Array(existing)), Value::Array(incoming)) => {
                existing.extend(incoming.iter().cloned())
            }
            _ => {
                target.insert(key.clone(), value.clone());
            }
        }
    }
}

/// Loose boolean cast: `true`, non-zero numbers and `"true"`/`"1"`/`"yes"`/`"on"`.
pub fn value_as_bool(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => matches!(
            s.trim().to_ascii_lowercase().as_str(),
            "true" | "1" | "yes" | "on"
        ),
        Value::Null => false,
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

/// Render a scalar value as text (`null` becomes `None`).
pub fn value_as_string(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}
