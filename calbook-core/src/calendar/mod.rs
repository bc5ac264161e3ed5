//! A named, timezoned collection of events.
//!
//! Event times are stored as wall-clock values in the calendar's zone.
//! Standalone events live in one list; recurring occurrences stay inside the
//! series that generated them until an edit promotes them.

mod edit;
pub mod zone;

use std::collections::HashSet;
use std::fmt;

use chrono::{NaiveDate, NaiveDateTime};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::date_range::DateRange;
use crate::error::{CalbookError, CalbookResult};
use crate::event::{Event, EventKey, start_of_day};
use crate::recurrence::RecurrenceRule;
use crate::series::EventSeries;

pub use edit::{EditScope, EventLocator};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Calendar {
    name: String,
    zone: Tz,
    events: Vec<Event>,
    series: Vec<EventSeries>,
}

impl Calendar {
    pub fn new(name: &str, zone: Tz) -> Self {
        Calendar {
            name: name.to_string(),
            zone,
            events: Vec::new(),
            series: Vec::new(),
        }
    }

    /// Create a calendar from an IANA zone name.
    pub fn with_zone_name(name: &str, zone: &str) -> CalbookResult<Self> {
        Ok(Self::new(name, zone::parse_zone(zone)?))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn zone(&self) -> Tz {
        self.zone
    }

    /// Only the registry renames calendars, so its keys stay in sync.
    pub(crate) fn set_name(&mut self, name: &str) {
        self.name = name.to_string();
    }

    // QUERIES:

    /// Every event: standalone events first, then each series' occurrences.
    pub fn events(&self) -> Vec<&Event> {
        self.events
            .iter()
            .chain(self.series.iter().flat_map(|s| s.occurrences()))
            .collect()
    }

    pub fn standalone_events(&self) -> &[Event] {
        &self.events
    }

    pub fn series(&self) -> &[EventSeries] {
        &self.series
    }

    pub fn event_count(&self) -> usize {
        self.events.len() + self.series.iter().map(EventSeries::len).sum::<usize>()
    }

    pub fn contains(&self, key: &EventKey) -> bool {
        self.events().into_iter().any(|e| e.has_key(key))
    }

    /// Events with this subject and start, whatever their end.
    pub fn find_at(&self, subject: &str, start: NaiveDateTime) -> Vec<&Event> {
        self.events()
            .into_iter()
            .filter(|e| e.is_at(subject, start))
            .collect()
    }

    pub fn events_on(&self, date: NaiveDate) -> Vec<&Event> {
        self.events()
            .into_iter()
            .filter(|e| e.overlaps_date(date))
            .collect()
    }

    pub fn events_between(&self, range: &DateRange) -> Vec<&Event> {
        self.events()
            .into_iter()
            .filter(|e| range.contains(e))
            .collect()
    }

    pub fn is_busy_at(&self, instant: NaiveDateTime) -> bool {
        self.events().into_iter().any(|e| e.occurs_at(instant))
    }

    /// Up to `limit` events starting on or after `date`, earliest first.
    pub fn schedule_from(&self, date: NaiveDate, limit: usize) -> Vec<&Event> {
        let from = start_of_day(date);
        let mut upcoming: Vec<&Event> = self
            .events()
            .into_iter()
            .filter(|e| e.start() >= from)
            .collect();
        upcoming.sort_by_key(|e| e.start());
        upcoming.truncate(limit);
        upcoming
    }

    // EVENT OPERATIONS:

    /// Add a standalone event. Fails if an event with the same identity exists.
    pub fn add_event(&mut self, event: Event) -> CalbookResult<()> {
        if let Some(existing) = self.events().into_iter().find(|e| e.conflicts_with(&event)) {
            return Err(CalbookError::Conflict(format!(
                "Event {} already exists in calendar '{}'",
                existing.key(),
                self.name
            )));
        }

        debug!(calendar = %self.name, event = %event.key(), "added event");
        self.events.push(event);
        Ok(())
    }

    /// Add a series. Fails without storing anything if any occurrence
    /// collides with an event already in the calendar.
    pub fn add_series(&mut self, series: EventSeries) -> CalbookResult<()> {
        let existing = self.events();
        if let Some(clash) = series
            .occurrences()
            .iter()
            .find(|o| existing.iter().any(|e| e.conflicts_with(o)))
        {
            return Err(CalbookError::Conflict(format!(
                "Series occurrence {} conflicts with an existing event in calendar '{}'",
                clash.key(),
                self.name
            )));
        }

        debug!(
            calendar = %self.name,
            series = series.id(),
            occurrences = series.len(),
            "added event series"
        );
        self.series.push(series);
        Ok(())
    }

    /// Expand `template` with `rule` and add the resulting series.
    /// Returns the new series id.
    pub fn create_series(
        &mut self,
        template: &Event,
        rule: &RecurrenceRule,
    ) -> CalbookResult<String> {
        let series = EventSeries::new(template, rule)?;
        let id = series.id().to_string();
        self.add_series(series)?;
        Ok(id)
    }

    /// Remove the event with `event`'s identity, standalone or in a series.
    /// Returns whether anything was removed.
    pub fn remove_event(&mut self, event: &Event) -> bool {
        self.remove(&event.key()).is_some()
    }

    pub fn remove(&mut self, key: &EventKey) -> Option<Event> {
        let removed = match self.events.iter().position(|e| e.has_key(key)) {
            Some(index) => Some(self.events.remove(index)),
            None => self.series.iter_mut().find_map(|s| s.remove(key)),
        };

        if removed.is_some() {
            debug!(calendar = %self.name, event = %key, "removed event");
        }
        removed
    }

    // TIMEZONE:

    /// Change the calendar's zone, rewriting every event so it keeps
    /// referring to the same instant.
    ///
    /// All new times are computed before any event is touched, so on error
    /// the calendar is unchanged.
    pub fn re_zone(&mut self, zone_name: &str) -> CalbookResult<()> {
        let new_zone = zone::parse_zone(zone_name)?;
        let old_zone = self.zone;

        let convert = |event: &Event| -> CalbookResult<(NaiveDateTime, NaiveDateTime)> {
            Ok((
                zone::reinterpret(event.start(), old_zone, new_zone)?,
                zone::reinterpret(event.end(), old_zone, new_zone)?,
            ))
        };

        let standalone = self
            .events
            .iter()
            .map(convert)
            .collect::<CalbookResult<Vec<_>>>()?;
        let occurrences = self
            .series
            .iter()
            .map(|s| {
                s.occurrences()
                    .iter()
                    .map(convert)
                    .collect::<CalbookResult<Vec<_>>>()
            })
            .collect::<CalbookResult<Vec<Vec<_>>>>()?;

        // Wall-clock times that repeat on a DST fall-back can merge two
        // events into one identity.
        let mut seen = HashSet::new();
        let new_times = standalone.iter().chain(occurrences.iter().flatten());
        for (event, &(start, end)) in self.events().into_iter().zip(new_times) {
            let key = EventKey {
                subject: event.subject().to_string(),
                start,
                end,
            };
            if seen.contains(&key) {
                return Err(CalbookError::Conflict(format!(
                    "Re-zoning calendar '{}' to {} would duplicate event {}",
                    self.name,
                    new_zone.name(),
                    key
                )));
            }
            seen.insert(key);
        }

        for (event, (start, end)) in self.events.iter_mut().zip(standalone) {
            event.set_times(start, end);
        }
        for (series, times) in self.series.iter_mut().zip(occurrences) {
            for (event, (start, end)) in series.occurrences_mut().iter_mut().zip(times) {
                event.set_times(start, end);
            }
        }
        self.zone = new_zone;

        info!(
            calendar = %self.name,
            from = old_zone.name(),
            to = new_zone.name(),
            events = self.event_count(),
            "re-zoned calendar"
        );
        Ok(())
    }
}

impl fmt::Display for Calendar {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}
