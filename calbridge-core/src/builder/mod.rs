//! Builders turning names and option maps into events, sources and calendars.

pub mod calendar;
pub mod event;
pub mod source;

pub use calendar::CalendarBuilder;
pub use event::EventBuilder;
pub use source::SourceBuilder;
