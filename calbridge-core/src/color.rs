//! Color strategies for colored event kinds.
//!
//! A strategy is attached to an event when the event builder creates it and
//! computes the event's color code on demand from the injected color
//! configuration and per-event attributes.

use std::fmt;
use std::sync::Arc;

use crate::config::ColorsConfig;
use crate::event::CalendarEvent;
use crate::options::Options;

/// Color used when neither an override, a strategy nor the kind provides one.
pub const FALLBACK_COLOR: &str = "#aaaaaa";

pub trait ColorStrategy: fmt::Debug + Send + Sync {
    fn color_code(&self, event: &CalendarEvent) -> String;
}

/// Everything a strategy receives when it is attached to an event.
#[derive(Debug, Clone, Default)]
pub struct StrategyContext {
    /// Uid of the event the strategy is attached to.
    pub event_uid: String,
    pub colors: ColorsConfig,
    /// Configured attributes with per-event descriptor attributes merged on top.
    pub attributes: Options,
}

/// Creates a strategy instance for one event.
pub type StrategyFactory = Arc<dyn Fn(StrategyContext) -> Arc<dyn ColorStrategy> + Send + Sync>;

fn kind_default(event: &CalendarEvent) -> String {
    event
        .kind()
        .default_color()
        .unwrap_or(FALLBACK_COLOR)
        .to_string()
}

/// The kind's declared default color, else `#aaaaaa`.
#[derive(Debug, Clone, Default)]
pub struct DefaultColorStrategy {
    context: StrategyContext,
}

impl DefaultColorStrategy {
    pub const NAME: &'static str = "default";

    pub fn new(context: StrategyContext) -> Self {
        DefaultColorStrategy { context }
    }

    pub fn context(&self) -> &StrategyContext {
        &self.context
    }
}

impl ColorStrategy for DefaultColorStrategy {
    fn color_code(&self, event: &CalendarEvent) -> String {
        kind_default(event)
    }
}

/// Colors by event type: strategy attributes first, then `colors.codes`.
#[derive(Debug, Clone, Default)]
pub struct TypeColorStrategy {
    context: StrategyContext,
}

impl TypeColorStrategy {
    pub const NAME: &'static str = "type";

    pub fn new(context: StrategyContext) -> Self {
        TypeColorStrategy { context }
    }
}

impl ColorStrategy for TypeColorStrategy {
    fn color_code(&self, event: &CalendarEvent) -> String {
        let Some(event_type) = event.event_type() else {
            return kind_default(event);
        };

        self.context
            .attributes
            .get(event_type)
            .and_then(|v| v.as_str())
            .or_else(|| self.context.colors.codes.get(event_type).map(String::as_str))
            .map(str::to_string)
            .unwrap_or_else(|| kind_default(event))
    }
}

/// Stable pastel color derived from the MD5 digest of the uid the strategy
/// was attached to (the event's own uid for a detached strategy).
#[derive(Debug, Clone, Default)]
pub struct HashColorStrategy {
    context: StrategyContext,
}

impl HashColorStrategy {
    pub const NAME: &'static str = "hash";

    pub fn new(context: StrategyContext) -> Self {
        HashColorStrategy { context }
    }

    pub fn context(&self) -> &StrategyContext {
        &self.context
    }
}

impl ColorStrategy for HashColorStrategy {
    fn color_code(&self, event: &CalendarEvent) -> String {
        let uid = match self.context.event_uid.as_str() {
            "" => event.uid(),
            attached => attached,
        };
        let digest = md5::compute(uid.as_bytes());
        let lift = |byte: u8| if byte < 128 { byte + 128 } else { byte };

        format!(
            "#{:02x}{:02x}{:02x}",
            lift(digest.0[4]),
            lift(digest.0[2]),
            lift(digest.0[0])
        )
    }
}

/// Factories for the built-in strategies, keyed by name.
pub fn builtin_strategies() -> Vec<(&'static str, StrategyFactory)> {
    vec![
        (
            DefaultColorStrategy::NAME,
            Arc::new(|ctx: StrategyContext| Arc::new(DefaultColorStrategy::new(ctx)) as Arc<dyn ColorStrategy>),
        ),
        (
            TypeColorStrategy::NAME,
            Arc::new(|ctx: StrategyContext| Arc::new(TypeColorStrategy::new(ctx)) as Arc<dyn ColorStrategy>),
        ),
        (
            HashColorStrategy::NAME,
            Arc::new(|ctx: StrategyContext| Arc::new(HashColorStrategy::new(ctx)) as Arc<dyn ColorStrategy>),
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::EventKind;
    use serde_json::json;

    fn colored_event(id: i64, prefix: &str) -> CalendarEvent {
        let mut options = Options::new();
        options.insert("prefix_identifier".into(), json!(prefix));
        CalendarEvent::new(id, Arc::new(EventKind::new("colored").colored(None)), options)
    }

    #[test]
    fn test_hash_strategy_is_stable_pastel() {
        let strategy = HashColorStrategy::default();
        assert_eq!(strategy.color_code(&colored_event(123, "test-")), "#be80ca");
        assert_eq!(strategy.color_code(&colored_event(456, "test-")), "#d3b68b");
    }

    #[test]
    fn test_hash_strategy_uses_attached_uid() {
        let strategy = HashColorStrategy::new(StrategyContext {
            event_uid: "test-123".into(),
            ..StrategyContext::default()
        });
        assert_eq!(
            strategy.color_code(&colored_event(456, "test-")),
            "#be80ca",
            "color follows the uid the strategy was built for"
        );
    }

    #[test]
    fn test_type_strategy_prefers_attributes_over_codes() {
        let mut colors = ColorsConfig::default();
        colors.codes.insert("meeting".into(), "#00ff00".into());
        colors.codes.insert("holiday".into(), "#0000ff".into());

        let mut attributes = Options::new();
        attributes.insert("meeting".into(), json!("#ff00ff"));

        let strategy = TypeColorStrategy::new(StrategyContext {
            event_uid: "1".into(),
            colors,
            attributes,
        });

        let mut event = colored_event(1, "");
        event.set_event_type("meeting");
        assert_eq!(strategy.color_code(&event), "#ff00ff");

        event.set_event_type("holiday");
        assert_eq!(strategy.color_code(&event), "#0000ff");

        event.set_event_type("unknown");
        assert_eq!(strategy.color_code(&event), FALLBACK_COLOR);
    }

    #[test]
    fn test_default_strategy_uses_kind_color() {
        let event = CalendarEvent::new(
            1,
            Arc::new(EventKind::new("birthday").colored(Some("#ffcc00"))),
            Options::new(),
        );
        assert_eq!(DefaultColorStrategy::default().color_code(&event), "#ffcc00");
        assert_eq!(DefaultColorStrategy::default().color_code(&colored_event(2, "")), FALLBACK_COLOR);
    }
}
