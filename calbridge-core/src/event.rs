//! The calendar event model.
//!
//! A [`CalendarEvent`] is produced by the event builder from a raw source
//! record. Well-known fields are typed; extra per-kind attributes (location,
//! attendees, ...) live in a side-map restricted to the names the
//! [`EventKind`] declares.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, SecondsFormat};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{debug, warn};

use crate::color::{ColorStrategy, FALLBACK_COLOR};
use crate::datetime;
use crate::options::{self, Options, Record};

/// Source-local event identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EventId {
    Int(i64),
    Text(String),
}

impl EventId {
    /// Integer JSON numbers and strings are valid ids; anything else is not.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => n.as_i64().map(EventId::Int),
            Value::String(s) => Some(EventId::Text(s.clone())),
            _ => None,
        }
    }

    pub fn to_value(&self) -> Value {
        match self {
            EventId::Int(i) => json!(i),
            EventId::Text(s) => json!(s),
        }
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventId::Int(i) => write!(f, "{i}"),
            EventId::Text(s) => f.write_str(s),
        }
    }
}

impl From<i64> for EventId {
    fn from(id: i64) -> Self {
        EventId::Int(id)
    }
}

impl From<&str> for EventId {
    fn from(id: &str) -> Self {
        EventId::Text(id.to_string())
    }
}

impl From<String> for EventId {
    fn from(id: String) -> Self {
        EventId::Text(id)
    }
}

/// A registered kind of event: its name, whether it is colored and which
/// extra attributes it accepts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventKind {
    name: String,
    colored: bool,
    default_color: Option<String>,
    attributes: Vec<String>,
}

impl EventKind {
    pub const DEFAULT: &'static str = "default";

    pub fn new(name: impl Into<String>) -> Self {
        EventKind {
            name: name.into(),
            colored: false,
            default_color: None,
            attributes: Vec::new(),
        }
    }

    /// Mark the kind as colored, optionally with its own default color.
    pub fn colored(mut self, default_color: Option<&str>) -> Self {
        self.colored = true;
        self.default_color = default_color.map(str::to_string);
        self
    }

    pub fn with_attributes<I, S>(mut self, attributes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.attributes.extend(attributes.into_iter().map(Into::into));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_colored(&self) -> bool {
        self.colored
    }

    pub fn default_color(&self) -> Option<&str> {
        self.default_color.as_deref()
    }

    pub fn attributes(&self) -> &[String] {
        &self.attributes
    }

    /// Declared attribute matching `name` (compared canonicalized).
    pub fn declared_attribute(&self, name: &str) -> Option<&str> {
        let wanted = options::canonicalize(name);
        self.attributes
            .iter()
            .find(|a| options::canonicalize(a) == wanted)
            .map(String::as_str)
    }
}

impl Default for EventKind {
    fn default() -> Self {
        EventKind::new(EventKind::DEFAULT)
    }
}

#[derive(Debug, Clone)]
pub struct CalendarEvent {
    id: EventId,
    uid: String,
    kind: Arc<EventKind>,
    title: Option<String>,
    title_short: Option<String>,
    description: Option<String>,
    timezone: Tz,
    start: DateTime<Tz>,
    end: DateTime<Tz>,
    all_day: bool,
    public: bool,
    event_type: Option<String>,
    created: DateTime<Tz>,
    last_modified: DateTime<Tz>,
    color_code: Option<String>,
    color_strategy: Option<Arc<dyn ColorStrategy>>,
    attributes: BTreeMap<String, Value>,
    options: Options,
}

impl CalendarEvent {
    /// Create an event with default field values.
    ///
    /// `options.prefix_identifier` (when a string) is prepended to the id to
    /// form the uid; `options.timezone` sets the event timezone (UTC when
    /// missing or unknown).
    pub fn new(id: impl Into<EventId>, kind: Arc<EventKind>, options: Options) -> Self {
        let id = id.into();
        let prefix = options::get_str(&options, options::PREFIX_IDENTIFIER).unwrap_or_default();
        let uid = format!("{prefix}{id}");

        let timezone = match options::get_str(&options, options::TIMEZONE) {
            Some(name) => datetime::parse_timezone(name).unwrap_or_else(|| {
                warn!(timezone = name, uid = %uid, "Unknown timezone, using UTC");
                Tz::UTC
            }),
            None => Tz::UTC,
        };
        let now = datetime::now_in(timezone);

        CalendarEvent {
            id,
            uid,
            kind,
            title: None,
            title_short: None,
            description: None,
            timezone,
            start: now,
            end: now,
            all_day: false,
            public: true,
            event_type: None,
            created: now,
            last_modified: now,
            color_code: None,
            color_strategy: None,
            attributes: BTreeMap::new(),
            options,
        }
    }

    pub fn id(&self) -> &EventId {
        &self.id
    }

    pub fn uid(&self) -> &str {
        &self.uid
    }

    pub fn kind(&self) -> &EventKind {
        &self.kind
    }

    pub fn kind_name(&self) -> &str {
        self.kind.name()
    }

    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    /// Set the title; also fills the short title while it is still empty.
    pub fn set_title(&mut self, title: impl Into<String>) -> &mut Self {
        let title = title.into();
        if self.title_short.as_deref().is_none_or(str::is_empty) {
            self.title_short = Some(title.clone());
        }
        self.title = Some(title);
        self
    }

    pub fn title_short(&self) -> Option<&str> {
        self.title_short.as_deref()
    }

    pub fn set_title_short(&mut self, title_short: impl Into<String>) -> &mut Self {
        self.title_short = Some(title_short.into());
        self
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn set_description(&mut self, description: impl Into<String>) -> &mut Self {
        self.description = Some(description.into());
        self
    }

    pub fn timezone(&self) -> Tz {
        self.timezone
    }

    /// Move the event into another timezone. Instants are kept.
    pub fn set_timezone(&mut self, timezone: Tz) -> &mut Self {
        self.timezone = timezone;
        self.start = self.start.with_timezone(&timezone);
        self.end = self.end.with_timezone(&timezone);
        self.created = self.created.with_timezone(&timezone);
        self.last_modified = self.last_modified.with_timezone(&timezone);
        self
    }

    pub fn start(&self) -> &DateTime<Tz> {
        &self.start
    }

    pub fn set_start(&mut self, start: DateTime<Tz>) -> &mut Self {
        self.start = start;
        self
    }

    pub fn end(&self) -> &DateTime<Tz> {
        &self.end
    }

    pub fn set_end(&mut self, end: DateTime<Tz>) -> &mut Self {
        self.end = end;
        self
    }

    pub fn is_all_day(&self) -> bool {
        self.all_day
    }

    /// Setting `true` snaps start to 00:00:00 and end to 23:59:59 of their
    /// own dates.
    pub fn set_all_day(&mut self, all_day: bool) -> &mut Self {
        self.all_day = all_day;
        if all_day {
            self.start = datetime::with_time(&self.start, 0, 0, 0);
            self.end = datetime::with_time(&self.end, 23, 59, 59);
        }
        self
    }

    pub fn is_public(&self) -> bool {
        self.public
    }

    pub fn set_public(&mut self, public: bool) -> &mut Self {
        self.public = public;
        self
    }

    pub fn event_type(&self) -> Option<&str> {
        self.event_type.as_deref()
    }

    pub fn set_event_type(&mut self, event_type: impl Into<String>) -> &mut Self {
        self.event_type = Some(event_type.into());
        self
    }

    pub fn created(&self) -> &DateTime<Tz> {
        &self.created
    }

    pub fn set_created(&mut self, created: DateTime<Tz>) -> &mut Self {
        self.created = created;
        self
    }

    pub fn last_modified(&self) -> &DateTime<Tz> {
        &self.last_modified
    }

    pub fn set_last_modified(&mut self, last_modified: DateTime<Tz>) -> &mut Self {
        self.last_modified = last_modified;
        self
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    pub fn attributes(&self) -> &BTreeMap<String, Value> {
        &self.attributes
    }

    pub fn attribute(&self, name: &str) -> Option<&Value> {
        let declared = self.kind.declared_attribute(name)?;
        self.attributes.get(declared)
    }

    /// Store an extra attribute. Returns `false` (and stores nothing) when
    /// the event kind does not declare `name`.
    pub fn set_attribute(&mut self, name: &str, value: Value) -> bool {
        match self.kind.declared_attribute(name) {
            Some(declared) => {
                self.attributes.insert(declared.to_string(), value);
                true
            }
            None => false,
        }
    }

    pub fn color_strategy(&self) -> Option<&Arc<dyn ColorStrategy>> {
        self.color_strategy.as_ref()
    }

    pub fn set_color_strategy(&mut self, strategy: Arc<dyn ColorStrategy>) -> &mut Self {
        self.color_strategy = Some(strategy);
        self
    }

    /// Literal color override; wins over any strategy.
    pub fn set_color_code(&mut self, color_code: impl Into<String>) -> &mut Self {
        self.color_code = Some(color_code.into());
        self
    }

    /// Effective color of a colored event; `None` for uncolored kinds.
    ///
    /// Resolution: literal override, attached strategy, kind default color,
    /// then `#aaaaaa`.
    pub fn color_code(&self) -> Option<String> {
        if !self.kind.is_colored() {
            return None;
        }
        if let Some(code) = self.color_code.as_deref().filter(|c| !c.is_empty()) {
            return Some(code.to_string());
        }
        if let Some(strategy) = &self.color_strategy {
            return Some(strategy.color_code(self));
        }
        Some(
            self.kind
                .default_color()
                .unwrap_or(FALLBACK_COLOR)
                .to_string(),
        )
    }

    /// Apply raw record values onto the event.
    ///
    /// `timezone` is applied first and `allDay` last so that all-day
    /// normalization sees the final dates. Keys that are neither known
    /// fields nor declared attributes are dropped.
    pub fn hydrate(&mut self, values: Record) {
        let mut timezone = None;
        let mut title = None;
        let mut all_day = None;
        let mut rest = Vec::with_capacity(values.len());

        for (key, value) in values {
            match options::canonicalize(&key).as_str() {
                "timezone" => timezone = Some(value),
                "title" => title = Some(value),
                "allday" | "alldayevent" => all_day = Some(options::value_as_bool(&value)),
                _ => rest.push((key, value)),
            }
        }

        if let Some(value) = timezone {
            match value.as_str().and_then(datetime::parse_timezone) {
                Some(tz) => {
                    self.set_timezone(tz);
                }
                None => warn!(uid = %self.uid, value = %value, "Invalid timezone value ignored"),
            }
        }

        if let Some(title) = title.as_ref().and_then(options::value_as_string) {
            self.set_title(title);
        }

        for (key, value) in rest {
            self.apply_value(&key, value);
        }

        if let Some(all_day) = all_day {
            self.set_all_day(all_day);
        }
    }

    fn apply_value(&mut self, key: &str, value: Value) {
        if value.is_null() {
            return;
        }

        match options::canonicalize(key).as_str() {
            "id" | "uid" => {}
            "titleshort" => {
                if let Some(v) = options::value_as_string(&value) {
                    self.set_title_short(v);
                }
            }
            "description" => {
                if let Some(v) = options::value_as_string(&value) {
                    self.set_description(v);
                }
            }
            "type" | "eventtype" => {
                if let Some(v) = options::value_as_string(&value) {
                    self.set_event_type(v);
                }
            }
            "colorcode" => {
                if let Some(v) = options::value_as_string(&value) {
                    self.set_color_code(v);
                }
            }
            "public" | "published" => {
                self.set_public(options::value_as_bool(&value));
            }
            field @ ("start" | "end" | "created" | "lastmodified") => {
                let Some(dt) = datetime::parse_datetime(&value, self.timezone) else {
                    warn!(uid = %self.uid, field = key, value = %value, "Unparseable datetime ignored");
                    return;
                };
                match field {
                    "start" => self.start = dt,
                    "end" => self.end = dt,
                    "created" => self.created = dt,
                    _ => self.last_modified = dt,
                }
            }
            _ => {
                if !self.set_attribute(key, value) {
                    debug!(uid = %self.uid, kind = self.kind.name(), key, "Dropping undeclared event value");
                }
            }
        }
    }

    /// Look up a field by name for attribute templating.
    ///
    /// Accepts `titleShort`, `title_short` or getter-style `getTitleShort`.
    /// Datetimes are rendered as RFC 3339.
    pub fn field(&self, name: &str) -> Option<Value> {
        let key = options::canonicalize(name);
        if let Some(value) = self.lookup_field(&key) {
            return Some(value);
        }
        key.strip_prefix("get")
            .and_then(|stripped| self.lookup_field(stripped))
    }

    fn lookup_field(&self, key: &str) -> Option<Value> {
        let text = |v: Option<&str>| v.map(|s| Value::String(s.to_string()));
        let time = |dt: &DateTime<Tz>| Some(Value::String(dt.to_rfc3339_opts(SecondsFormat::Secs, true)));

        match key {
            "id" => Some(self.id.to_value()),
            "uid" => Some(Value::String(self.uid.clone())),
            "title" => text(self.title()),
            "titleshort" => text(self.title_short()),
            "description" => text(self.description()),
            "type" | "eventtype" => text(self.event_type()),
            "start" => time(&self.start),
            "end" => time(&self.end),
            "created" => time(&self.created),
            "lastmodified" => time(&self.last_modified),
            "allday" | "alldayevent" => Some(Value::Bool(self.all_day)),
            "public" | "published" => Some(Value::Bool(self.public)),
            "timezone" => Some(Value::String(self.timezone.name().to_string())),
            "colorcode" | "color" => self.color_code().map(Value::String),
            "kind" => Some(Value::String(self.kind.name().to_string())),
            _ => {
                let declared = self
                    .kind
                    .attributes()
                    .iter()
                    .find(|a| options::canonicalize(a) == key)?;
                self.attributes.get(declared).cloned()
            }
        }
    }

    /// Shallow field map, as used by collection `to_array`.
    pub fn to_map(&self) -> Record {
        let mut map = Record::new();
        for (key, field) in [
            ("id", "id"),
            ("uid", "uid"),
            ("kind", "kind"),
            ("title", "title"),
            ("titleShort", "titleshort"),
            ("description", "description"),
            ("type", "type"),
            ("start", "start"),
            ("end", "end"),
            ("allDay", "allday"),
            ("public", "public"),
            ("created", "created"),
            ("lastModified", "lastmodified"),
            ("timezone", "timezone"),
            ("colorCode", "colorcode"),
        ] {
            map.insert(key.to_string(), self.lookup_field(field).unwrap_or(Value::Null));
        }
        for (name, value) in &self.attributes {
            map.insert(name.clone(), value.clone());
        }
        map
    }
}

impl PartialEq for CalendarEvent {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
            && self.uid == other.uid
            && self.kind == other.kind
            && self.title == other.title
            && self.title_short == other.title_short
            && self.description == other.description
            && self.timezone == other.timezone
            && self.start == other.start
            && self.end == other.end
            && self.all_day == other.all_day
            && self.public == other.public
            && self.event_type == other.event_type
            && self.created == other.created
            && self.last_modified == other.last_modified
            && self.color_code == other.color_code
            && self.attributes == other.attributes
            && self.options == other.options
    }
}
