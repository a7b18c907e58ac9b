//! Calendar configuration.
//!
//! Loaded with the `config` crate from a TOML, JSON or YAML file whose root
//! must contain a `calendar` table:
//!
//! ```toml
//! [calendar.sources.team]
//! kind = "json_file"
//! options = { path = "team.json", prefix_identifier = "team-" }
//!
//! [calendar.calendars]
//! office = { sources = ["team"] }
//!
//! [calendar.colors.strategies]
//! by_type = { name = "type", attributes = { meeting = "#3366ff" } }
//! ```
//!
//! `CALBRIDGE__CALENDAR__...` environment variables are layered on top.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use config::{Config, Environment, File};
use serde::Deserialize;

use crate::error::{CalendarError, CalendarResult};
use crate::options::{self, Options};

/// Prefix for environment overrides, e.g. `CALBRIDGE__CALENDAR__EVENTS__TASK=colored`.
pub const ENV_PREFIX: &str = "CALBRIDGE";

#[derive(Deserialize)]
struct ConfigFile {
    calendar: Option<CalendarConfig>,
}

/// The `calendar` table.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CalendarConfig {
    /// Calendar name → calendar kind and default sources.
    pub calendars: BTreeMap<String, CalendarEntry>,
    /// Source name → source kind and options.
    pub sources: BTreeMap<String, SourceEntry>,
    /// Event name → event kind.
    pub events: BTreeMap<String, String>,
    /// Format → (event kind → adapter name).
    pub converters: BTreeMap<String, BTreeMap<String, String>>,
    pub colors: ColorsConfig,
}

/// A calendar entry: a bare kind name or a table.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum CalendarEntry {
    Kind(String),
    Table {
        #[serde(default)]
        kind: Option<String>,
        #[serde(default)]
        sources: Vec<String>,
    },
}

impl CalendarEntry {
    pub fn kind(&self) -> Option<&str> {
        match self {
            CalendarEntry::Kind(kind) => Some(kind),
            CalendarEntry::Table { kind, .. } => kind.as_deref(),
        }
    }

    pub fn sources(&self) -> &[String] {
        match self {
            CalendarEntry::Kind(_) => &[],
            CalendarEntry::Table { sources, .. } => sources,
        }
    }
}

/// A source entry: a bare kind name or a table with default options.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum SourceEntry {
    Kind(String),
    Table {
        kind: String,
        #[serde(default)]
        options: Options,
    },
}

impl SourceEntry {
    pub fn kind(&self) -> &str {
        match self {
            SourceEntry::Kind(kind) => kind,
            SourceEntry::Table { kind, .. } => kind,
        }
    }

    pub fn options(&self) -> Option<&Options> {
        match self {
            SourceEntry::Kind(_) => None,
            SourceEntry::Table { options, .. } => Some(options),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ColorsConfig {
    /// Free-form name → color code table.
    pub codes: BTreeMap<String, String>,
    /// Strategy alias → strategy name or `{name, attributes}`.
    pub strategies: BTreeMap<String, StrategyRef>,
}

/// Reference to a color strategy, as found in config or event options.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum StrategyRef {
    Name(String),
    Descriptor {
        name: String,
        #[serde(default)]
        attributes: Options,
    },
}

impl StrategyRef {
    pub fn name(&self) -> &str {
        match self {
            StrategyRef::Name(name) => name,
            StrategyRef::Descriptor { name, .. } => name,
        }
    }

    pub fn attributes(&self) -> Option<&Options> {
        match self {
            StrategyRef::Name(_) => None,
            StrategyRef::Descriptor { attributes, .. } => Some(attributes),
        }
    }
}

/// Look up `name` in a config map, comparing keys canonicalized.
fn lookup<'a, V>(map: &'a BTreeMap<String, V>, name: &str) -> Option<&'a V> {
    map.get(name).or_else(|| {
        let wanted = options::canonicalize(name);
        map.iter()
            .find(|(key, _)| options::canonicalize(key) == wanted)
            .map(|(_, value)| value)
    })
}

impl CalendarConfig {
    /// Default location: `~/.config/calbridge/config.toml`.
    pub fn default_path() -> CalendarResult<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| CalendarError::Config("Could not determine config directory".into()))?
            .join("calbridge");

        Ok(config_dir.join("config.toml"))
    }

    /// Load from a file (format picked by extension) plus environment
    /// overrides. The file must exist and contain a `calendar` table.
    pub fn load(path: &Path) -> CalendarResult<Self> {
        let file: ConfigFile = Config::builder()
            .add_source(File::from(path).required(true))
            .add_source(Environment::with_prefix(ENV_PREFIX).separator("__"))
            .build()
            .map_err(|e| CalendarError::Config(e.to_string()))?
            .try_deserialize()
            .map_err(|e| CalendarError::Config(e.to_string()))?;

        file.calendar.ok_or_else(|| {
            CalendarError::Config(format!(
                "Missing 'calendar' root table in {}",
                path.display()
            ))
        })
    }

    /// Parse from an in-memory TOML document.
    pub fn from_toml_str(content: &str) -> CalendarResult<Self> {
        let file: ConfigFile = Config::builder()
            .add_source(File::from_str(content, config::FileFormat::Toml))
            .build()
            .map_err(|e| CalendarError::Config(e.to_string()))?
            .try_deserialize()
            .map_err(|e| CalendarError::Config(e.to_string()))?;

        file.calendar
            .ok_or_else(|| CalendarError::Config("Missing 'calendar' root table".into()))
    }

    pub fn calendar(&self, name: &str) -> Option<&CalendarEntry> {
        lookup(&self.calendars, name)
    }

    pub fn source(&self, name: &str) -> Option<&SourceEntry> {
        lookup(&self.sources, name)
    }

    /// Event kind aliased to `name`, if any.
    pub fn event_kind(&self, name: &str) -> Option<&str> {
        lookup(&self.events, name).map(String::as_str)
    }

    /// Adapter configured for `event_kind` under `format`.
    pub fn converter_adapter(&self, format: &str, event_kind: &str) -> Option<&str> {
        lookup(&self.converters, format)
            .and_then(|adapters| lookup(adapters, event_kind))
            .map(String::as_str)
    }

    pub fn strategy(&self, alias: &str) -> Option<&StrategyRef> {
        lookup(&self.colors.strategies, alias)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SAMPLE: &str = r##"
[calendar.calendars]
office = { sources = ["team", "holidays"] }
plain = "default"

[calendar.sources]
holidays = "ics_file"

[calendar.sources.team]
kind = "json_file"
options = { path = "team.json", prefix_identifier = "team-" }

[calendar.events]
task = "colored"

[calendar.converters.ical]
colored = "default"

[calendar.colors.codes]
meeting = "#3366ff"

[calendar.colors.strategies]
pastel = "hash"
by_type = { name = "type", attributes = { meeting = "#ff0000" } }
"##;

    #[test]
    fn test_parse_sample_config() {
        let config = CalendarConfig::from_toml_str(SAMPLE).unwrap();

        let office = config.calendar("office").expect("office calendar should exist");
        assert_eq!(office.sources(), ["team".to_string(), "holidays".to_string()]);
        assert_eq!(office.kind(), None);
        assert_eq!(config.calendar("plain").and_then(|c| c.kind()), Some("default"));

        let team = config.source("team").unwrap();
        assert_eq!(team.kind(), "json_file");
        assert_eq!(
            team.options().and_then(|o| o.get("path")).and_then(|v| v.as_str()),
            Some("team.json")
        );
        assert_eq!(config.source("holidays").map(|s| s.kind()), Some("ics_file"));

        assert_eq!(config.event_kind("task"), Some("colored"));
        assert_eq!(config.converter_adapter("ical", "colored"), Some("default"));
        assert_eq!(config.colors.codes.get("meeting").map(String::as_str), Some("#3366ff"));
        assert_eq!(config.strategy("pastel"), Some(&StrategyRef::Name("hash".into())));
        assert_eq!(config.strategy("by_type").map(|s| s.name()), Some("type"));
    }

    #[test]
    fn test_lookup_is_canonicalized() {
        let config = CalendarConfig::from_toml_str(SAMPLE).unwrap();
        assert!(config.source("Team").is_some());
        assert!(config.strategy("by-type").is_some());
    }

    #[test]
    fn test_missing_calendar_table_is_config_error() {
        let err = CalendarConfig::from_toml_str("[other]\nkey = 1\n").unwrap_err();
        assert!(
            matches!(err, CalendarError::Config(ref msg) if msg.contains("calendar")),
            "unexpected error: {err}"
        );
    }

    #[test]
    fn test_partial_calendar_table_defaults() {
        let config = CalendarConfig::from_toml_str("[calendar.events]\ntask = \"colored\"\n").unwrap();
        assert!(config.calendars.is_empty());
        assert!(config.sources.is_empty());
        assert!(config.colors.strategies.is_empty());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();

        let config = CalendarConfig::load(file.path()).unwrap();
        assert_eq!(config.sources.len(), 2);

        let missing = CalendarConfig::load(Path::new("/nonexistent/calbridge.toml"));
        assert!(matches!(missing, Err(CalendarError::Config(_))));
    }
}
