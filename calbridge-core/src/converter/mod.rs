//! Converters rendering a calendar's merged events into wire formats.
//!
//! Each format wraps every event in a [`ConvertibleEvent`] adapter obtained
//! from its [`ConvertibleEventFactory`], hands it the per-call options and
//! assembles the rendered adapters into the final document.

pub mod factory;
pub mod fullcalendar;
pub mod ical;
pub mod json;

use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use crate::builder::CalendarBuilder;
use crate::calendar::Calendar;
use crate::config::CalendarConfig;
use crate::error::{CalendarError, CalendarResult};
use crate::event::CalendarEvent;
use crate::options::{Options, canonicalize};
use crate::registry::Registry;

pub use factory::{AdapterFormat, ConvertibleEventFactory, FullCalendarFormat, IcalFormat, JsonFormat};
pub use fullcalendar::{FullCalendarConverter, FullCalendarEvent};
pub use ical::{IcalConverter, IcalEvent, IcalOutput};
pub use json::{JsonConverter, JsonEvent};

/// Renders a whole calendar.
pub trait CalendarConverter: Send + Sync {
    fn convert(&self, calendar: &mut Calendar, options: &Options) -> CalendarResult<String>;
}

/// Per-event adapter for one output format.
pub trait ConvertibleEvent {
    type Output;

    fn event(&self) -> &CalendarEvent;

    fn set_options(&mut self, options: &Options);

    fn options(&self) -> &Options;

    /// Structured output, assembled by the format's converter.
    fn render(&self) -> Self::Output;

    /// Standalone text for this event alone.
    fn convert(&self) -> CalendarResult<String>;
}

/// Creates the adapter for one event.
pub type AdapterFactory<O> = Arc<
    dyn Fn(&CalendarEvent) -> CalendarResult<Box<dyn ConvertibleEvent<Output = O>>> + Send + Sync,
>;

/// Entry point: resolves a format name to a converter and runs it.
///
/// Built-in formats are `ical`, `json` and `fullcalendar`; names are
/// canonicalized, so `Full-Calendar` works too. Converters registered in the
/// registry take precedence. Resolved converters are cached.
pub struct Converter {
    config: Arc<CalendarConfig>,
    registry: Arc<Registry>,
    cache: HashMap<String, Arc<dyn CalendarConverter>>,
}

impl Converter {
    pub fn new(config: Arc<CalendarConfig>, registry: Arc<Registry>) -> Self {
        Converter {
            config,
            registry,
            cache: HashMap::new(),
        }
    }

    /// Converter sharing a calendar builder's config and registry.
    pub fn for_builder(builder: &CalendarBuilder) -> Self {
        Self::new(builder.config().clone(), builder.registry().clone())
    }

    pub fn convert(
        &mut self,
        calendar: &mut Calendar,
        format: &str,
        options: &Options,
    ) -> CalendarResult<String> {
        let converter = self.resolve(format)?;
        debug!(calendar = calendar.name(), format, "Converting calendar");
        converter.convert(calendar, options)
    }

    fn resolve(&mut self, format: &str) -> CalendarResult<Arc<dyn CalendarConverter>> {
        let key = canonicalize(format);
        if let Some(converter) = self.cache.get(&key) {
            return Ok(converter.clone());
        }

        let converter: Arc<dyn CalendarConverter> = match self.registry.converter(&key) {
            Some(custom) => custom.clone(),
            None => match key.as_str() {
                "ical" => Arc::new(IcalConverter::new(self.config.clone(), self.registry.clone())),
                "json" => Arc::new(JsonConverter::new(self.config.clone(), self.registry.clone())),
                "fullcalendar" => Arc::new(FullCalendarConverter::new(
                    self.config.clone(),
                    self.registry.clone(),
                )),
                _ => {
                    return Err(CalendarError::InvalidArgument(format!(
                        "Unknown converter format '{format}'"
                    )));
                }
            },
        };

        self.cache.insert(key, converter.clone());
        Ok(converter)
    }
}
