//! Per-format adapter lookup.

use std::marker::PhantomData;
use std::sync::Arc;

use tracing::debug;

use crate::config::CalendarConfig;
use crate::converter::fullcalendar::FullCalendarEvent;
use crate::converter::ical::{IcalEvent, IcalOutput};
use crate::converter::json::JsonEvent;
use crate::converter::{AdapterFactory, ConvertibleEvent};
use crate::error::{CalendarError, CalendarResult};
use crate::event::CalendarEvent;
use crate::options::Record;
use crate::registry::Registry;

/// An output format with its own adapters.
pub trait AdapterFormat {
    type Output;

    /// Canonical format name, also the key under `converters` in config.
    const NAME: &'static str;

    fn registered(registry: &Registry, name: &str) -> Option<AdapterFactory<Self::Output>>;

    fn default_adapter(event: &CalendarEvent) -> Box<dyn ConvertibleEvent<Output = Self::Output>>;
}

pub struct IcalFormat;

impl AdapterFormat for IcalFormat {
    type Output = IcalOutput;
    const NAME: &'static str = "ical";

    fn registered(registry: &Registry, name: &str) -> Option<AdapterFactory<IcalOutput>> {
        registry.ical_adapter(name).cloned()
    }

    fn default_adapter(event: &CalendarEvent) -> Box<dyn ConvertibleEvent<Output = IcalOutput>> {
        Box::new(IcalEvent::new(event.clone()))
    }
}

pub struct JsonFormat;

impl AdapterFormat for JsonFormat {
    type Output = Record;
    const NAME: &'static str = "json";

    fn registered(registry: &Registry, name: &str) -> Option<AdapterFactory<Record>> {
        registry.json_adapter(name).cloned()
    }

    fn default_adapter(event: &CalendarEvent) -> Box<dyn ConvertibleEvent<Output = Record>> {
        Box::new(JsonEvent::new(event.clone()))
    }
}

pub struct FullCalendarFormat;

impl AdapterFormat for FullCalendarFormat {
    type Output = Record;
    const NAME: &'static str = "fullcalendar";

    fn registered(registry: &Registry, name: &str) -> Option<AdapterFactory<Record>> {
        registry.fullcalendar_adapter(name).cloned()
    }

    fn default_adapter(event: &CalendarEvent) -> Box<dyn ConvertibleEvent<Output = Record>> {
        Box::new(FullCalendarEvent::new(event.clone()))
    }
}

/// Picks the adapter for each event of one format.
///
/// Lookup order: the adapter configured for the event kind under
/// `converters.<format>`, an adapter registered under the event kind's
/// name, then the format default.
pub struct ConvertibleEventFactory<F: AdapterFormat> {
    config: Arc<CalendarConfig>,
    registry: Arc<Registry>,
    format: PhantomData<fn() -> F>,
}

impl<F: AdapterFormat> ConvertibleEventFactory<F> {
    pub fn new(config: Arc<CalendarConfig>, registry: Arc<Registry>) -> Self {
        ConvertibleEventFactory {
            config,
            registry,
            format: PhantomData,
        }
    }

    pub fn build(
        &self,
        event: &CalendarEvent,
    ) -> CalendarResult<Box<dyn ConvertibleEvent<Output = F::Output>>> {
        let kind = event.kind_name();
        let context = || format!("Unable to convert event of type {kind} to {}", F::NAME);

        if let Some(adapter) = self.config.converter_adapter(F::NAME, kind) {
            let Some(factory) = F::registered(&self.registry, adapter) else {
                return Err(CalendarError::runtime(
                    context(),
                    CalendarError::InvalidArgument(format!("Adapter '{adapter}' is not registered")),
                ));
            };
            debug!(format = F::NAME, kind, adapter, "Using configured adapter");
            return factory(event).map_err(|e| CalendarError::runtime(context(), e));
        }

        match F::registered(&self.registry, kind) {
            Some(factory) => factory(event).map_err(|e| CalendarError::runtime(context(), e)),
            None => Ok(F::default_adapter(event)),
        }
    }
}
