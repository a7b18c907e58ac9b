//! Named implementations available to the builders.
//!
//! Every lookup by name (sources, event kinds, calendar kinds, color
//! strategies, converters and converter adapters) goes through a
//! [`Registry`]. Names are stored and compared canonicalized.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::calendar::CalendarKind;
use crate::color::{self, StrategyFactory};
use crate::converter::{AdapterFactory, CalendarConverter, IcalOutput};
use crate::event::EventKind;
use crate::options::{Record, canonicalize};
use crate::source::{EventSource, IcsFileSource, InlineSource, JsonFileSource};

/// Creates a fresh source implementation.
pub type SourceFactory = Arc<dyn Fn() -> Box<dyn EventSource> + Send + Sync>;

/// What a name is registered as.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KindCategory {
    Source,
    Event,
    Calendar,
}

impl fmt::Display for KindCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KindCategory::Source => write!(f, "source"),
            KindCategory::Event => write!(f, "event"),
            KindCategory::Calendar => write!(f, "calendar"),
        }
    }
}

#[derive(Default, Clone)]
pub struct Registry {
    sources: BTreeMap<String, SourceFactory>,
    event_kinds: BTreeMap<String, Arc<EventKind>>,
    calendar_kinds: BTreeMap<String, Arc<dyn CalendarKind>>,
    strategies: BTreeMap<String, StrategyFactory>,
    converters: BTreeMap<String, Arc<dyn CalendarConverter>>,
    ical_adapters: BTreeMap<String, AdapterFactory<IcalOutput>>,
    json_adapters: BTreeMap<String, AdapterFactory<Record>>,
    fullcalendar_adapters: BTreeMap<String, AdapterFactory<Record>>,
}

impl Registry {
    /// Name of the colored event kind registered by [`Registry::with_defaults`].
    pub const COLORED_EVENT: &'static str = "colored";

    /// Empty registry, apart from the default event kind.
    pub fn new() -> Self {
        let mut registry = Registry::default();
        registry.register_event_kind(EventKind::new(EventKind::DEFAULT).with_attributes(["location"]));
        registry
    }

    /// Built-in sources, event kinds and color strategies.
    pub fn with_defaults() -> Self {
        let mut registry = Registry::new();

        registry.register_source(InlineSource::KIND, || Box::new(InlineSource));
        registry.register_source(JsonFileSource::KIND, || Box::new(JsonFileSource));
        registry.register_source(IcsFileSource::KIND, || Box::new(IcsFileSource));

        registry.register_event_kind(
            EventKind::new(Self::COLORED_EVENT)
                .colored(None)
                .with_attributes(["location"]),
        );

        for (name, factory) in color::builtin_strategies() {
            registry.strategies.insert(canonicalize(name), factory);
        }

        registry
    }

    pub fn register_source<F>(&mut self, name: &str, factory: F) -> &mut Self
    where
        F: Fn() -> Box<dyn EventSource> + Send + Sync + 'static,
    {
        self.sources.insert(canonicalize(name), Arc::new(factory));
        self
    }

    pub fn register_event_kind(&mut self, kind: EventKind) -> &mut Self {
        self.event_kinds
            .insert(canonicalize(kind.name()), Arc::new(kind));
        self
    }

    pub fn register_calendar_kind(&mut self, kind: Arc<dyn CalendarKind>) -> &mut Self {
        self.calendar_kinds.insert(canonicalize(kind.name()), kind);
        self
    }

    pub fn register_strategy(&mut self, name: &str, factory: StrategyFactory) -> &mut Self {
        self.strategies.insert(canonicalize(name), factory);
        self
    }

    /// Register a converter for a custom format name.
    pub fn register_converter(
        &mut self,
        format: &str,
        converter: Arc<dyn CalendarConverter>,
    ) -> &mut Self {
        self.converters.insert(canonicalize(format), converter);
        self
    }

    pub fn register_ical_adapter(&mut self, name: &str, factory: AdapterFactory<IcalOutput>) -> &mut Self {
        self.ical_adapters.insert(canonicalize(name), factory);
        self
    }

    pub fn register_json_adapter(&mut self, name: &str, factory: AdapterFactory<Record>) -> &mut Self {
        self.json_adapters.insert(canonicalize(name), factory);
        self
    }

    pub fn register_fullcalendar_adapter(
        &mut self,
        name: &str,
        factory: AdapterFactory<Record>,
    ) -> &mut Self {
        self.fullcalendar_adapters.insert(canonicalize(name), factory);
        self
    }

    pub fn source(&self, name: &str) -> Option<&SourceFactory> {
        self.sources.get(&canonicalize(name))
    }

    pub fn event_kind(&self, name: &str) -> Option<&Arc<EventKind>> {
        self.event_kinds.get(&canonicalize(name))
    }

    /// The default event kind; registered by every constructor.
    pub fn default_event_kind(&self) -> Arc<EventKind> {
        self.event_kind(EventKind::DEFAULT)
            .cloned()
            .unwrap_or_else(|| Arc::new(EventKind::default()))
    }

    pub fn calendar_kind(&self, name: &str) -> Option<&Arc<dyn CalendarKind>> {
        self.calendar_kinds.get(&canonicalize(name))
    }

    pub fn strategy(&self, name: &str) -> Option<&StrategyFactory> {
        self.strategies.get(&canonicalize(name))
    }

    pub fn converter(&self, format: &str) -> Option<&Arc<dyn CalendarConverter>> {
        self.converters.get(&canonicalize(format))
    }

    pub fn ical_adapter(&self, name: &str) -> Option<&AdapterFactory<IcalOutput>> {
        self.ical_adapters.get(&canonicalize(name))
    }

    pub fn json_adapter(&self, name: &str) -> Option<&AdapterFactory<Record>> {
        self.json_adapters.get(&canonicalize(name))
    }

    pub fn fullcalendar_adapter(&self, name: &str) -> Option<&AdapterFactory<Record>> {
        self.fullcalendar_adapters.get(&canonicalize(name))
    }

    /// Every category `name` is registered under.
    pub fn categories(&self, name: &str) -> Vec<KindCategory> {
        let key = canonicalize(name);
        let mut categories = Vec::new();
        if self.sources.contains_key(&key) {
            categories.push(KindCategory::Source);
        }
        if self.event_kinds.contains_key(&key) {
            categories.push(KindCategory::Event);
        }
        if self.calendar_kinds.contains_key(&key) {
            categories.push(KindCategory::Calendar);
        }
        categories
    }

    pub fn source_names(&self) -> impl Iterator<Item = &str> {
        self.sources.keys().map(String::as_str)
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("sources", &self.sources.keys().collect::<Vec<_>>())
            .field("event_kinds", &self.event_kinds.keys().collect::<Vec<_>>())
            .field("calendar_kinds", &self.calendar_kinds.keys().collect::<Vec<_>>())
            .field("strategies", &self.strategies.keys().collect::<Vec<_>>())
            .field("converters", &self.converters.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}
