//! Calendar event engine for calbook.
//!
//! This crate holds the domain model shared by calbook front ends:
//! - `Event`, the identity key and property edits
//! - `RecurrenceRule` and `EventSeries` for weekly recurring events
//! - `Calendar`, a zoned collection of events with scoped editing
//! - `CalendarRegistry` and `Session` for working with several calendars
//! - copying events between calendars, with zone conversion

pub mod calbook_config;
pub mod calendar;
pub mod copy;
pub mod date_range;
pub mod error;
pub mod event;
pub mod recurrence;
pub mod registry;
pub mod series;

// Re-export the main types at crate root for convenience
pub use calbook_config::CalbookConfig;
pub use calendar::{Calendar, EditScope, EventLocator};
pub use copy::CopyReport;
pub use date_range::DateRange;
pub use error::{CalbookError, CalbookResult};
pub use event::{Event, EventKey, EventProperty, PropertyChange};
pub use recurrence::{RecurrenceRule, Termination, WeekdayMask};
pub use registry::{CalendarRegistry, Session};
pub use series::EventSeries;
