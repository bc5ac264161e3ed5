//! Recurring event series.
//!
//! A series owns its occurrences outright. An occurrence leaves the series
//! only by being moved out (promoted) to the calendar's standalone list, which
//! happens when its start is edited through a this-and-later or whole-series
//! edit.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::CalbookResult;
use crate::event::{Event, EventKey, PropertyChange};
use crate::recurrence::{RecurrenceRule, WeekdayMask};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventSeries {
    id: String,
    weekdays: WeekdayMask,
    occurrences: Vec<Event>,
}

impl EventSeries {
    /// Expand `template` with `rule` into a new series.
    pub fn new(template: &Event, rule: &RecurrenceRule) -> CalbookResult<Self> {
        let occurrences = rule.expand(template)?;
        let series = EventSeries {
            id: uuid::Uuid::new_v4().to_string(),
            weekdays: rule.weekdays(),
            occurrences,
        };

        debug!(
            series = %series.id,
            subject = template.subject(),
            weekdays = %series.weekdays,
            occurrences = series.occurrences.len(),
            "expanded event series"
        );
        Ok(series)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn weekdays(&self) -> WeekdayMask {
        self.weekdays
    }

    pub fn occurrences(&self) -> &[Event] {
        &self.occurrences
    }

    pub fn len(&self) -> usize {
        self.occurrences.len()
    }

    /// True once every occurrence has been promoted out (or none were generated).
    pub fn is_empty(&self) -> bool {
        self.occurrences.is_empty()
    }

    /// Index of the occurrence with this subject and start.
    pub fn position_at(&self, subject: &str, start: NaiveDateTime) -> Option<usize> {
        self.occurrences.iter().position(|e| e.is_at(subject, start))
    }

    pub fn position_of(&self, key: &EventKey) -> Option<usize> {
        self.occurrences.iter().position(|e| e.has_key(key))
    }

    pub fn contains(&self, key: &EventKey) -> bool {
        self.position_of(key).is_some()
    }

    pub(crate) fn occurrence_mut(&mut self, index: usize) -> Option<&mut Event> {
        self.occurrences.get_mut(index)
    }

    pub(crate) fn occurrences_mut(&mut self) -> &mut [Event] {
        &mut self.occurrences
    }

    pub(crate) fn remove(&mut self, key: &EventKey) -> Option<Event> {
        let index = self.position_of(key)?;
        Some(self.occurrences.remove(index))
    }

    /// Apply `change` to the occurrence at `index` and every later one.
    ///
    /// A start change breaks the weekday pattern, so the edited occurrences
    /// are moved out of the series and returned for promotion. Other changes
    /// leave membership alone and return nothing.
    pub(crate) fn edit_from(&mut self, index: usize, change: &PropertyChange) -> Vec<Event> {
        let index = index.min(self.occurrences.len());
        for occurrence in &mut self.occurrences[index..] {
            occurrence.apply(change);
        }

        if change.moves_start() {
            self.occurrences.drain(index..).collect()
        } else {
            Vec::new()
        }
    }

    /// Apply `change` to every occurrence. A start change dissolves the series.
    pub(crate) fn edit_all(&mut self, change: &PropertyChange) -> Vec<Event> {
        self.edit_from(0, change)
    }
}
