//! Calendar events.
//!
//! Start and end are wall-clock date-times without a zone. The calendar that
//! owns an event gives them meaning through its timezone, which is why moving
//! an event between calendars (or re-zoning a calendar) rewrites them.

use std::fmt;
use std::str::FromStr;

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::error::{CalbookError, CalbookResult};

/// All-day events run from 08:00 to 17:00.
const ALL_DAY_START_HOUR: i64 = 8;
const ALL_DAY_END_HOUR: i64 = 17;

/// Formats accepted for start/end property values, tried in order.
const DATE_TIME_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M"];

/// The identity tuple of an event.
///
/// Duplicate rejection and event lookups compare events by this tuple only.
/// Description, location and status are not part of it, so two
/// events differing only in those fields are considered the same event.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EventKey {
    pub subject: String,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl fmt::Display for EventKey {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "'{}' ({} - {})", self.subject, self.start, self.end)
    }
}

/// A single calendar event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    subject: String,
    start: NaiveDateTime,
    end: NaiveDateTime,
    description: Option<String>,
    location: Option<String>,
    status: Option<String>,
}

impl Event {
    /// Create a timed event. Fails unless `start` is strictly before `end`.
    pub fn new(
        subject: impl Into<String>,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> CalbookResult<Self> {
        let subject = subject.into();
        if start >= end {
            return Err(CalbookError::Validation(format!(
                "Event '{}' must start before it ends ({} >= {})",
                subject, start, end
            )));
        }
        Ok(Self::unchecked(subject, start, end))
    }

    /// Create an all-day event, which occupies 08:00-17:00 on `date`.
    pub fn all_day(subject: impl Into<String>, date: NaiveDate) -> Self {
        let midnight = start_of_day(date);
        Self::unchecked(
            subject.into(),
            midnight + Duration::hours(ALL_DAY_START_HOUR),
            midnight + Duration::hours(ALL_DAY_END_HOUR),
        )
    }

    fn unchecked(subject: String, start: NaiveDateTime, end: NaiveDateTime) -> Self {
        Event {
            subject,
            start,
            end,
            description: None,
            location: None,
            status: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.status = Some(status.into());
        self
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub fn start(&self) -> NaiveDateTime {
        self.start
    }

    pub fn end(&self) -> NaiveDateTime {
        self.end
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn location(&self) -> Option<&str> {
        self.location.as_deref()
    }

    pub fn status(&self) -> Option<&str> {
        self.status.as_deref()
    }

    /// The date this event starts on.
    pub fn date(&self) -> NaiveDate {
        self.start.date()
    }

    pub fn duration(&self) -> Duration {
        self.end - self.start
    }

    pub fn key(&self) -> EventKey {
        EventKey {
            subject: self.subject.clone(),
            start: self.start,
            end: self.end,
        }
    }

    /// True when both events share the identity tuple (subject, start, end).
    pub fn conflicts_with(&self, other: &Event) -> bool {
        self.subject == other.subject && self.start == other.start && self.end == other.end
    }

    pub fn has_key(&self, key: &EventKey) -> bool {
        self.subject == key.subject && self.start == key.start && self.end == key.end
    }

    /// True when the event has this subject and start, whatever its end.
    pub fn is_at(&self, subject: &str, start: NaiveDateTime) -> bool {
        self.subject == subject && self.start == start
    }

    /// Parse and apply a named property update.
    pub fn set_property(&mut self, property: &str, value: &str) -> CalbookResult<()> {
        let change = PropertyChange::parse(property, value)?;
        self.apply(&change);
        Ok(())
    }

    /// Apply an already validated property update.
    ///
    /// The start/end ordering is only enforced at construction, so an update
    /// may leave the event with `end <= start`.
    pub fn apply(&mut self, change: &PropertyChange) {
        match change {
            PropertyChange::Subject(v) => self.subject = v.clone(),
            PropertyChange::Start(v) => self.start = *v,
            PropertyChange::End(v) => self.end = *v,
            PropertyChange::Description(v) => self.description = Some(v.clone()),
            PropertyChange::Location(v) => self.location = Some(v.clone()),
            PropertyChange::Status(v) => self.status = Some(v.clone()),
        }
    }

    /// The identity this event would have after `change` is applied.
    pub fn key_after(&self, change: &PropertyChange) -> EventKey {
        let mut key = self.key();
        match change {
            PropertyChange::Subject(v) => key.subject = v.clone(),
            PropertyChange::Start(v) => key.start = *v,
            PropertyChange::End(v) => key.end = *v,
            _ => {}
        }
        key
    }

    /// A copy of this event moved to `date`, keeping its clock times.
    ///
    /// End keeps its clock time too, so an event spanning midnight ends up
    /// ending before it starts on the new date.
    pub fn on_date(&self, date: NaiveDate) -> Event {
        let mut moved = self.clone();
        moved.start = date.and_time(self.start.time());
        moved.end = date.and_time(self.end.time());
        moved
    }

    /// A copy starting at `start` with the same duration. Fails if the end
    /// would fall outside the representable date range.
    pub fn starting_at(&self, start: NaiveDateTime) -> CalbookResult<Event> {
        let end = start.checked_add_signed(self.duration()).ok_or_else(|| {
            CalbookError::Validation(format!(
                "Event '{}' cannot start at {}: its end is out of range",
                self.subject, start
            ))
        })?;
        let mut moved = self.clone();
        moved.start = start;
        moved.end = end;
        Ok(moved)
    }

    /// Replace start and end in one step. Used by zone reinterpretation.
    pub(crate) fn set_times(&mut self, start: NaiveDateTime, end: NaiveDateTime) {
        self.start = start;
        self.end = end;
    }

    /// True when `instant` lies within `[start, end]`.
    pub fn occurs_at(&self, instant: NaiveDateTime) -> bool {
        self.start <= instant && instant <= self.end
    }

    /// Day-overlap test.
    ///
    /// An event overlaps `date` when it starts before the midnight that ends
    /// `date` and ends after 23:59 of the previous day. The lower bound is a
    /// minute early, so an event ending in the last minute of the previous
    /// day still matches.
    pub fn overlaps_date(&self, date: NaiveDate) -> bool {
        self.falls_within(date, date)
    }

    /// Range-overlap test. Ends strictly before the day after `to`, with the
    /// same last-minute slack as [`Event::overlaps_date`] before `from`.
    ///
    /// A bound beyond the representable date range leaves that side open.
    pub fn falls_within(&self, from: NaiveDate, to: NaiveDate) -> bool {
        let before_upper = start_of_day(to)
            .checked_add_signed(Duration::days(1))
            .is_none_or(|upper| self.start < upper);
        let after_lower = last_minute_of_day(from)
            .checked_sub_signed(Duration::days(1))
            .is_none_or(|lower| self.end > lower);
        before_upper && after_lower
    }
}

/// Events are equal when their identity tuples are.
impl PartialEq for Event {
    fn eq(&self, other: &Self) -> bool {
        self.conflicts_with(other)
    }
}

impl Eq for Event {}

/// The named, editable properties of an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventProperty {
    Subject,
    Start,
    End,
    Description,
    Location,
    Status,
}

impl EventProperty {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventProperty::Subject => "subject",
            EventProperty::Start => "start",
            EventProperty::End => "end",
            EventProperty::Description => "description",
            EventProperty::Location => "location",
            EventProperty::Status => "status",
        }
    }
}

impl FromStr for EventProperty {
    type Err = CalbookError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "subject" => Ok(EventProperty::Subject),
            "start" => Ok(EventProperty::Start),
            "end" => Ok(EventProperty::End),
            "description" => Ok(EventProperty::Description),
            "location" => Ok(EventProperty::Location),
            "status" => Ok(EventProperty::Status),
            other => Err(CalbookError::Validation(format!("Unknown property: {}", other))),
        }
    }
}

impl fmt::Display for EventProperty {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A validated property update, ready to be applied to any number of events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropertyChange {
    Subject(String),
    Start(NaiveDateTime),
    End(NaiveDateTime),
    Description(String),
    Location(String),
    Status(String),
}

impl PropertyChange {
    /// Parse a property name and its textual value.
    pub fn parse(property: &str, value: &str) -> CalbookResult<Self> {
        Self::new(property.parse()?, value)
    }

    pub fn new(property: EventProperty, value: &str) -> CalbookResult<Self> {
        Ok(match property {
            EventProperty::Subject => PropertyChange::Subject(value.to_string()),
            EventProperty::Start => PropertyChange::Start(parse_date_time(value)?),
            EventProperty::End => PropertyChange::End(parse_date_time(value)?),
            EventProperty::Description => PropertyChange::Description(value.to_string()),
            EventProperty::Location => PropertyChange::Location(value.to_string()),
            EventProperty::Status => PropertyChange::Status(value.to_string()),
        })
    }

    pub fn property(&self) -> EventProperty {
        match self {
            PropertyChange::Subject(_) => EventProperty::Subject,
            PropertyChange::Start(_) => EventProperty::Start,
            PropertyChange::End(_) => EventProperty::End,
            PropertyChange::Description(_) => EventProperty::Description,
            PropertyChange::Location(_) => EventProperty::Location,
            PropertyChange::Status(_) => EventProperty::Status,
        }
    }

    /// True for changes to the start, which detach occurrences from their series.
    pub fn moves_start(&self) -> bool {
        matches!(self, PropertyChange::Start(_))
    }
}

/// Parse an ISO local date-time such as `2024-03-15T10:00` or `2024-03-15T10:00:30`.
pub fn parse_date_time(value: &str) -> CalbookResult<NaiveDateTime> {
    DATE_TIME_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
        .ok_or_else(|| CalbookError::Validation(format!("Invalid date: {}", value)))
}

pub(crate) fn start_of_day(date: NaiveDate) -> NaiveDateTime {
    date.and_time(NaiveTime::MIN)
}

fn last_minute_of_day(date: NaiveDate) -> NaiveDateTime {
    start_of_day(date) + Duration::minutes(23 * 60 + 59)
}
