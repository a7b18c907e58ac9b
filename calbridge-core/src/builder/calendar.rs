//! Calendar builder, the main entry point of the library.

use std::sync::Arc;

use tracing::debug;

use crate::builder::event::EventBuilder;
use crate::builder::source::SourceBuilder;
use crate::calendar::{Calendar, CalendarKind, DefaultCalendar};
use crate::config::CalendarConfig;
use crate::error::{CalendarError, CalendarResult};
use crate::options::Options;
use crate::registry::Registry;

/// Builds calendars. Owns the event builder shared by every source of every
/// calendar it creates.
#[derive(Debug, Clone)]
pub struct CalendarBuilder {
    config: Arc<CalendarConfig>,
    registry: Arc<Registry>,
    source_builder: SourceBuilder,
}

impl CalendarBuilder {
    pub fn new(config: CalendarConfig, registry: Registry) -> Self {
        Self::from_shared(Arc::new(config), Arc::new(registry))
    }

    pub fn from_shared(config: Arc<CalendarConfig>, registry: Arc<Registry>) -> Self {
        let event_builder = Arc::new(EventBuilder::new(config.clone(), registry.clone()));
        let source_builder = SourceBuilder::new(config.clone(), registry.clone(), event_builder);

        CalendarBuilder {
            config,
            registry,
            source_builder,
        }
    }

    pub fn config(&self) -> &Arc<CalendarConfig> {
        &self.config
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    pub fn source_builder(&self) -> &SourceBuilder {
        &self.source_builder
    }

    /// Build the calendar `name` and attach `sources` in order.
    ///
    /// The kind is looked up through the `calendars` config then the
    /// registry; unregistered names get a [`DefaultCalendar`] carrying the
    /// requested name. Sources listed for the calendar in config are
    /// attached after the kind's `init` hook and before `sources`.
    pub fn build<I, S>(&self, name: &str, sources: I) -> CalendarResult<Calendar>
    where
        I: IntoIterator<Item = (S, Options)>,
        S: AsRef<str>,
    {
        if name.trim().is_empty() {
            return Err(CalendarError::InvalidArgument(
                "Calendar name must not be empty.".into(),
            ));
        }

        let entry = self.config.calendar(name);
        let target = entry.and_then(|e| e.kind()).unwrap_or(name);
        let declared = entry.is_some_and(|e| e.kind().is_none());
        let kind = self.resolve_kind(name, target, declared)?;

        let mut calendar = Calendar::new(name, kind.name(), self.source_builder.clone());
        kind.init(&mut calendar)?;
        calendar.set_name(name);

        for configured in entry.map(|e| e.sources()).unwrap_or_default() {
            calendar.add_source(configured, Options::new())?;
        }
        for (source, options) in sources {
            calendar.add_source(source.as_ref(), options)?;
        }

        debug!(
            calendar = name,
            kind = calendar.kind(),
            sources = calendar.sources().len(),
            "Built calendar"
        );
        Ok(calendar)
    }

    /// `declared` marks a `calendars` entry without a kind: the name is a
    /// calendar even when it is also registered as something else.
    fn resolve_kind(
        &self,
        name: &str,
        target: &str,
        declared: bool,
    ) -> CalendarResult<Arc<dyn CalendarKind>> {
        if let Some(kind) = self.registry.calendar_kind(target) {
            return Ok(kind.clone());
        }
        if declared {
            return Ok(Arc::new(DefaultCalendar));
        }

        let categories = self.registry.categories(target);
        if !categories.is_empty() || self.config.source(target).is_some() {
            let registered_as = if categories.is_empty() {
                "source".to_string()
            } else {
                categories
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(", ")
            };
            return Err(CalendarError::InvalidArgument(format!(
                "Calendar '{name}' ({target}) needs to implement the calendar contract, it is registered as: {registered_as}"
            )));
        }

        Ok(Arc::new(DefaultCalendar))
    }
}
