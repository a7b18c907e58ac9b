//! Calendar event aggregation for calbridge.
//!
//! This crate provides:
//! - `builder` to assemble calendars from named, configured sources
//! - `source` with the `EventSource` contract and the bundled sources
//! - `event`, `color` and `collection` for the merged event model
//! - `converter` to render a calendar as iCal, JSON or FullCalendar JSON
//!
//! Kinds referenced by name in configuration are resolved through a
//! [`Registry`].

pub mod builder;
pub mod calendar;
pub mod collection;
pub mod color;
pub mod config;
pub mod converter;
pub mod datetime;
pub mod error;
pub mod event;
pub mod options;
pub mod registry;
pub mod source;

pub use builder::{CalendarBuilder, EventBuilder, SourceBuilder};
pub use calendar::{Calendar, CalendarKind, DefaultCalendar};
pub use collection::EventCollection;
pub use color::ColorStrategy;
pub use config::CalendarConfig;
pub use converter::{CalendarConverter, ConvertibleEvent, Converter};
pub use error::{CalendarError, CalendarResult};
pub use event::{CalendarEvent, EventId, EventKind};
pub use options::{Options, Record};
pub use registry::Registry;
pub use source::{EventSource, Source};
