//! Event sources.
//!
//! An [`EventSource`] implementation knows how to fetch raw records; the
//! [`Source`] wrapper owns its identifier, options, the last fetch output and
//! the cached event collection built from it.

pub mod ics_file;
pub mod inline;
pub mod json_file;

use std::fmt;
use std::sync::Arc;

use tracing::{debug, info};

use crate::builder::event::EventBuilder;
use crate::collection::EventCollection;
use crate::error::{CalendarError, CalendarResult};
use crate::event::EventKind;
use crate::options::{self, Options, Record};

pub use ics_file::IcsFileSource;
pub use inline::InlineSource;
pub use json_file::JsonFileSource;

/// Option naming the event kind a source builds its records as.
pub const EVENT_OPTION: &str = "event";

/// What an event source implementation sees while building events.
pub struct BuildContext<'a> {
    pub identifier: &'a str,
    pub event_builder: &'a EventBuilder,
    pub options: &'a Options,
}

pub trait EventSource: fmt::Debug {
    /// Identifier used when the source is built without an explicit one.
    fn identifier(&self) -> Option<&'static str> {
        None
    }

    /// Event name each record is built as.
    fn event_name(&self) -> &str {
        EventKind::DEFAULT
    }

    /// Fetch raw records. May block.
    fn fetch_results(&mut self, options: &Options) -> CalendarResult<Vec<Record>>;

    /// Turn fetched records into events and add them to `collection`.
    ///
    /// Records are built as `options.event` when set, else as
    /// [`EventSource::event_name`], with the source options as event options.
    fn build_events(
        &self,
        results: &[Record],
        ctx: &BuildContext<'_>,
        collection: &mut EventCollection,
    ) -> CalendarResult<()> {
        let name = options::get_str(ctx.options, EVENT_OPTION).unwrap_or(self.event_name());
        for record in results {
            let event = ctx
                .event_builder
                .build(name, record.clone(), ctx.options.clone());
            collection.add(event);
        }
        Ok(())
    }
}

#[derive(Debug)]
pub struct Source {
    identifier: String,
    kind: String,
    inner: Box<dyn EventSource>,
    options: Options,
    fetched_results: Vec<Record>,
    events: EventCollection,
    event_builder: Arc<EventBuilder>,
}

impl Source {
    /// Wrap an implementation. The identifier is the canonicalized explicit
    /// one, else the implementation's declared identifier, else the
    /// canonicalized kind name.
    pub fn new(
        kind: impl Into<String>,
        inner: Box<dyn EventSource>,
        identifier: Option<&str>,
        options: Options,
        event_builder: Arc<EventBuilder>,
    ) -> Self {
        let kind = kind.into();
        let identifier = match identifier.filter(|id| !id.is_empty()) {
            Some(id) => options::canonicalize(id),
            None => inner
                .identifier()
                .map(options::canonicalize)
                .unwrap_or_else(|| options::canonicalize(&kind)),
        };

        Source {
            identifier,
            kind,
            inner,
            options,
            fetched_results: Vec::new(),
            events: EventCollection::new(),
            event_builder,
        }
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    /// Registered kind name the source was built from.
    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    /// Merge options recursively (arrays are appended).
    pub fn add_options(&mut self, options: &Options) -> &mut Self {
        options::merge(&mut self.options, options);
        self
    }

    pub fn criteria(&self) -> Option<&Options> {
        self.options.get(options::CRITERIA).and_then(|v| v.as_object())
    }

    /// Merge into the `criteria` sub-map, creating it when missing.
    pub fn add_criteria(&mut self, criteria: &Options) -> &mut Self {
        let mut wrapped = Options::new();
        wrapped.insert(
            options::CRITERIA.to_string(),
            serde_json::Value::Object(criteria.clone()),
        );
        if !matches!(self.options.get(options::CRITERIA), Some(v) if v.is_object()) {
            self.options.remove(options::CRITERIA);
        }
        self.add_options(&wrapped)
    }

    pub fn fetched_results(&self) -> &[Record] {
        &self.fetched_results
    }

    pub fn event_builder(&self) -> &Arc<EventBuilder> {
        &self.event_builder
    }

    /// The source's events, fetched and built when the cache is empty or
    /// `refetch` is set.
    ///
    /// Any failure is reported as a single runtime error naming the source;
    /// nothing from the failed attempt stays cached.
    pub fn events(&mut self, refetch: bool) -> CalendarResult<&EventCollection> {
        if refetch || self.events.is_empty() {
            self.rebuild().map_err(|e| {
                self.events.clear();
                self.fetched_results.clear();
                CalendarError::runtime(
                    format!(
                        "Unable to build events collection for source {}",
                        self.identifier
                    ),
                    e,
                )
            })?;
        }
        Ok(&self.events)
    }

    fn rebuild(&mut self) -> CalendarResult<()> {
        self.events.clear();

        info!(source = %self.identifier, kind = %self.kind, "Fetching source");
        self.fetched_results = self.inner.fetch_results(&self.options)?;
        debug!(
            source = %self.identifier,
            records = self.fetched_results.len(),
            "Fetched records"
        );

        let ctx = BuildContext {
            identifier: &self.identifier,
            event_builder: &self.event_builder,
            options: &self.options,
        };
        self.inner
            .build_events(&self.fetched_results, &ctx, &mut self.events)
    }
}
