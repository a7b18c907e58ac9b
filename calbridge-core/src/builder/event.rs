//! Event builder.

use std::sync::Arc;

use tracing::{debug, warn};
use uuid::Uuid;

use crate::color::{ColorStrategy, DefaultColorStrategy, StrategyContext};
use crate::config::{CalendarConfig, StrategyRef};
use crate::event::{CalendarEvent, EventId, EventKind};
use crate::options::{self, Options, Record};
use crate::registry::Registry;

/// Suffix accepted on event names, e.g. `BirthdayCalendarEvent` → `birthday`.
const EVENT_NAME_SUFFIX: &str = "CalendarEvent";

/// Builds events from raw records. One instance is shared by every source a
/// [`SourceBuilder`](crate::builder::SourceBuilder) creates.
#[derive(Debug)]
pub struct EventBuilder {
    config: Arc<CalendarConfig>,
    registry: Arc<Registry>,
}

impl EventBuilder {
    pub fn new(config: Arc<CalendarConfig>, registry: Arc<Registry>) -> Self {
        EventBuilder { config, registry }
    }

    pub fn config(&self) -> &CalendarConfig {
        &self.config
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Build an event of kind `name` from `values`.
    ///
    /// `values.id` becomes the id (a fresh one is generated otherwise); the
    /// remaining values are applied onto the event. Never fails: unknown
    /// kinds and strategies fall back to defaults.
    pub fn build(&self, name: &str, mut values: Record, options: Options) -> CalendarEvent {
        let id = values
            .remove("id")
            .and_then(|v| EventId::from_value(&v))
            .unwrap_or_else(|| Self::generate_id(name));

        let kind = self.resolve_kind(name);
        let mut event = CalendarEvent::new(id, kind.clone(), options);
        event.hydrate(values);

        if kind.is_colored() {
            let strategy = self.resolve_strategy(&event);
            event.set_color_strategy(strategy);
        }

        event
    }

    fn generate_id(name: &str) -> EventId {
        EventId::Text(format!(
            "{}{}",
            name.to_lowercase(),
            Uuid::new_v4().simple()
        ))
    }

    /// Registered kind for `name` (or its alias in the `events` config),
    /// accepting a `CalendarEvent` suffix; the default kind otherwise.
    pub fn resolve_kind(&self, name: &str) -> Arc<EventKind> {
        let target = self.config.event_kind(name).unwrap_or(name);

        if let Some(kind) = self.registry.event_kind(target) {
            return kind.clone();
        }

        if let Some(kind) = target
            .strip_suffix(EVENT_NAME_SUFFIX)
            .filter(|stem| !stem.is_empty())
            .and_then(|stem| self.registry.event_kind(stem))
        {
            return kind.clone();
        }

        debug!(name, target, "No registered event kind, using default");
        self.registry.default_event_kind()
    }

    /// Strategy named by `options.color_strategy`, resolved through the
    /// `colors.strategies` config then the registry.
    fn resolve_strategy(&self, event: &CalendarEvent) -> Arc<dyn ColorStrategy> {
        let mut context = StrategyContext {
            event_uid: event.uid().to_string(),
            colors: self.config.colors.clone(),
            attributes: Options::new(),
        };

        let requested = event
            .options()
            .get(options::COLOR_STRATEGY)
            .and_then(|v| serde_json::from_value::<StrategyRef>(v.clone()).ok());

        let Some(requested) = requested else {
            warn!(uid = event.uid(), "No color strategy configured, using default");
            return Arc::new(DefaultColorStrategy::new(context));
        };

        let name = match self.config.strategy(requested.name()) {
            Some(configured) => {
                if let Some(attributes) = configured.attributes() {
                    options::merge(&mut context.attributes, attributes);
                }
                configured.name()
            }
            None => requested.name(),
        };
        if let Some(attributes) = requested.attributes() {
            options::merge(&mut context.attributes, attributes);
        }

        match self.registry.strategy(name) {
            Some(factory) => factory(context),
            None => {
                warn!(
                    uid = event.uid(),
                    strategy = name,
                    "Unknown color strategy, using default"
                );
                Arc::new(DefaultColorStrategy::new(context))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Value, json};

    fn map(value: Value) -> Record {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    fn builder_with(config: &str, registry: Registry) -> EventBuilder {
        EventBuilder::new(
            Arc::new(CalendarConfig::from_toml_str(config).unwrap()),
            Arc::new(registry),
        )
    }

    fn default_builder() -> EventBuilder {
        EventBuilder::new(
            Arc::new(CalendarConfig::default()),
            Arc::new(Registry::with_defaults()),
        )
    }

    #[test]
    fn test_id_from_values_or_generated() {
        let builder = default_builder();

        let event = builder.build("default", map(json!({"id": 123, "title": "x"})), Options::new());
        assert_eq!(event.id(), &EventId::Int(123));
        assert_eq!(event.uid(), "123");

        let a = builder.build("Meeting", Record::new(), Options::new());
        let b = builder.build("Meeting", Record::new(), Options::new());
        assert_ne!(a.id(), b.id(), "generated ids must be distinct");
        assert!(a.uid().starts_with("meeting"));
    }

    #[test]
    fn test_unregistered_name_uses_default_kind() {
        let event = default_builder().build("SomethingElse", Record::new(), Options::new());
        assert_eq!(event.kind_name(), "default");
    }

    #[test]
    fn test_kind_resolution_by_alias_and_suffix() {
        let mut registry = Registry::with_defaults();
        registry.register_event_kind(EventKind::new("birthday").colored(Some("#ffcc00")));
        let builder = builder_with("[calendar.events]\nparty = \"birthday\"\n", registry);

        assert_eq!(builder.resolve_kind("birthday").name(), "birthday");
        assert_eq!(builder.resolve_kind("BirthdayCalendarEvent").name(), "birthday");
        assert_eq!(builder.resolve_kind("party").name(), "birthday");
        assert_eq!(builder.resolve_kind("CalendarEvent").name(), "default");
    }

    #[test]
    fn test_colored_event_gets_strategy() {
        let builder = default_builder();
        let options = map(json!({"prefix_identifier": "test-", "color_strategy": "hash"}));

        let event = builder.build("colored", map(json!({"id": 123})), options);
        assert!(event.color_strategy().is_some());
        assert_eq!(event.color_code().as_deref(), Some("#be80ca"));
    }

    #[test]
    fn test_strategy_alias_and_descriptor_attributes() {
        let config = r##"
[calendar.colors.codes]
meeting = "#00ff00"

[calendar.colors.strategies]
by_type = { name = "type", attributes = { meeting = "#111111", call = "#222222" } }
"##;
        let builder = builder_with(config, Registry::with_defaults());

        let options = map(json!({
            "color_strategy": {"name": "by_type", "attributes": {"meeting": "#333333"}}
        }));
        let meeting = builder.build("colored", map(json!({"id": 1, "type": "meeting"})), options.clone());
        assert_eq!(meeting.color_code().as_deref(), Some("#333333"), "descriptor attributes win");

        let call = builder.build("colored", map(json!({"id": 2, "type": "call"})), options);
        assert_eq!(call.color_code().as_deref(), Some("#222222"));
    }

    #[test]
    fn test_unknown_or_missing_strategy_falls_back() {
        let builder = default_builder();

        let unknown = builder.build(
            "colored",
            map(json!({"id": 1})),
            map(json!({"color_strategy": "rainbow"})),
        );
        assert_eq!(unknown.color_code().as_deref(), Some("#aaaaaa"));

        let missing = builder.build("colored", map(json!({"id": 2})), Options::new());
        assert!(missing.color_strategy().is_some());
        assert_eq!(missing.color_code().as_deref(), Some("#aaaaaa"));

        let plain = builder.build("default", map(json!({"id": 3})), Options::new());
        assert!(plain.color_strategy().is_none(), "uncolored kinds get no strategy");
    }
}
