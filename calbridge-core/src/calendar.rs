//! Calendars: named, ordered sets of sources with a merged event view.

use tracing::{debug, warn};

use crate::builder::source::SourceBuilder;
use crate::collection::EventCollection;
use crate::error::{CalendarError, CalendarResult};
use crate::options::{self, Options};
use crate::source::Source;

/// A registered kind of calendar. `init` runs once when the calendar
/// builder creates a calendar of this kind, before any requested source is
/// attached.
pub trait CalendarKind: Send + Sync {
    fn name(&self) -> &str;

    fn init(&self, _calendar: &mut Calendar) -> CalendarResult<()> {
        Ok(())
    }
}

/// Used for calendar names that are not registered as a kind.
#[derive(Debug, Default)]
pub struct DefaultCalendar;

impl DefaultCalendar {
    pub const NAME: &'static str = "default";
}

impl CalendarKind for DefaultCalendar {
    fn name(&self) -> &str {
        Self::NAME
    }
}

#[derive(Debug)]
pub struct Calendar {
    name: String,
    kind: String,
    sources: Vec<Source>,
    events: EventCollection,
    source_builder: SourceBuilder,
}

impl Calendar {
    pub fn new(name: impl Into<String>, kind: impl Into<String>, source_builder: SourceBuilder) -> Self {
        Calendar {
            name: name.into(),
            kind: kind.into(),
            sources: Vec::new(),
            events: EventCollection::new(),
            source_builder,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) -> &mut Self {
        self.name = name.into();
        self
    }

    /// Name of the calendar kind that built this calendar.
    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn source_builder(&self) -> &SourceBuilder {
        &self.source_builder
    }

    /// Build the source `name` and attach it, replacing any source with the
    /// same identifier in place.
    pub fn add_source(&mut self, name: &str, options: Options) -> CalendarResult<&mut Self> {
        let source = self.source_builder.build(name, options).inspect_err(|e| {
            warn!(calendar = %self.name, source = name, error = %e, "Unable to add source");
        })?;
        Ok(self.attach(source))
    }

    /// Attach an already built source.
    pub fn attach(&mut self, source: Source) -> &mut Self {
        debug!(calendar = %self.name, source = source.identifier(), "Attaching source");
        match self
            .sources
            .iter_mut()
            .find(|s| s.identifier() == source.identifier())
        {
            Some(existing) => *existing = source,
            None => self.sources.push(source),
        }
        self
    }

    pub fn has_source(&self, name: &str) -> bool {
        let identifier = options::canonicalize(name);
        self.sources.iter().any(|s| s.identifier() == identifier)
    }

    pub fn source(&self, name: &str) -> CalendarResult<&Source> {
        let identifier = options::canonicalize(name);
        self.sources
            .iter()
            .find(|s| s.identifier() == identifier)
            .ok_or_else(|| self.unknown_source(name))
    }

    pub fn source_mut(&mut self, name: &str) -> CalendarResult<&mut Source> {
        let identifier = options::canonicalize(name);
        match self.sources.iter().position(|s| s.identifier() == identifier) {
            Some(i) => Ok(&mut self.sources[i]),
            None => Err(self.unknown_source(name)),
        }
    }

    pub fn sources(&self) -> &[Source] {
        &self.sources
    }

    fn unknown_source(&self, name: &str) -> CalendarError {
        CalendarError::UnknownSource {
            calendar: self.name.clone(),
            name: name.to_string(),
        }
    }

    /// Merge the events of every source, in attachment order. Later sources
    /// win on uid collisions. Sources serve their own cache when filled.
    pub fn events(&mut self) -> CalendarResult<&EventCollection> {
        self.collect_events(false)
    }

    /// Like [`Calendar::events`], but every source refetches first.
    pub fn refetch_events(&mut self) -> CalendarResult<&EventCollection> {
        self.collect_events(true)
    }

    fn collect_events(&mut self, refetch: bool) -> CalendarResult<&EventCollection> {
        self.events.clear();
        for source in &mut self.sources {
            let events = source.events(refetch)?;
            self.events.add_events(events);
        }
        Ok(&self.events)
    }
}
