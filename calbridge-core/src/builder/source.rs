//! Source builder.

use std::sync::Arc;

use tracing::debug;

use crate::builder::event::EventBuilder;
use crate::config::CalendarConfig;
use crate::error::{CalendarError, CalendarResult};
use crate::options::{self, Options};
use crate::registry::Registry;
use crate::source::Source;

/// Resolves source names through the `sources` config and the registry.
#[derive(Debug, Clone)]
pub struct SourceBuilder {
    config: Arc<CalendarConfig>,
    registry: Arc<Registry>,
    event_builder: Arc<EventBuilder>,
}

impl SourceBuilder {
    pub fn new(
        config: Arc<CalendarConfig>,
        registry: Arc<Registry>,
        event_builder: Arc<EventBuilder>,
    ) -> Self {
        SourceBuilder {
            config,
            registry,
            event_builder,
        }
    }

    pub fn event_builder(&self) -> &Arc<EventBuilder> {
        &self.event_builder
    }

    /// Instantiate the source called `name` without fetching anything.
    ///
    /// Options configured for the source are the base; `options` is merged
    /// on top. The source identifier is the requested name.
    pub fn build(&self, name: &str, options: Options) -> CalendarResult<Source> {
        let (kind, mut merged) = match self.config.source(name) {
            Some(entry) => (entry.kind(), entry.options().cloned().unwrap_or_default()),
            None => (name, Options::new()),
        };

        let Some(factory) = self.registry.source(kind) else {
            let categories = self.registry.categories(kind);
            if !categories.is_empty() || self.config.calendar(kind).is_some() {
                let registered_as = categories
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(", ");
                return Err(CalendarError::InvalidArgument(format!(
                    "Calendar source '{name}' ({kind}) needs to implement the source contract, it is registered as: {}",
                    if registered_as.is_empty() { "calendar" } else { registered_as.as_str() }
                )));
            }
            return Err(CalendarError::InvalidArgument(format!(
                "Calendar source '{name}' does not exist"
            )));
        };

        options::merge(&mut merged, &options);
        debug!(source = name, kind, "Building source");

        Ok(Source::new(
            kind,
            factory(),
            Some(name),
            merged,
            self.event_builder.clone(),
        ))
    }
}
