//! Scoped event edits.
//!
//! An edit first locates exactly one event, works out every event the edit
//! will touch, and checks that no resulting identity collides with another
//! stored event. Only then is anything mutated, so a failed edit leaves the
//! calendar as it was.

use std::collections::HashSet;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::Calendar;
use crate::error::{CalbookError, CalbookResult};
use crate::event::{Event, EventKey, PropertyChange};

/// Identifies the event an edit targets.
///
/// Without an end, the subject and start must be enough to pick out a single
/// event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventLocator {
    pub subject: String,
    pub start: NaiveDateTime,
    pub end: Option<NaiveDateTime>,
}

impl EventLocator {
    pub fn new(subject: impl Into<String>, start: NaiveDateTime) -> Self {
        EventLocator {
            subject: subject.into(),
            start,
            end: None,
        }
    }

    pub fn with_end(mut self, end: NaiveDateTime) -> Self {
        self.end = Some(end);
        self
    }

    fn matches(&self, event: &Event) -> bool {
        event.is_at(&self.subject, self.start) && self.end.is_none_or(|end| event.end() == end)
    }
}

impl From<EventKey> for EventLocator {
    fn from(key: EventKey) -> Self {
        EventLocator {
            subject: key.subject,
            start: key.start,
            end: Some(key.end),
        }
    }
}

/// How far an edit to one occurrence spreads through its series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EditScope {
    /// Only the located event.
    Single,
    /// The located occurrence and every later one in its series.
    ThisAndLater,
    /// Every occurrence of the located event's series.
    All,
}

/// Where an event is stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Slot {
    Standalone(usize),
    Series { series: usize, index: usize },
}

impl Calendar {
    pub fn edit_single(
        &mut self,
        locator: &EventLocator,
        property: &str,
        value: &str,
    ) -> CalbookResult<()> {
        let change = PropertyChange::parse(property, value)?;
        self.edit(locator, EditScope::Single, &change)
    }

    pub fn edit_this_and_later(
        &mut self,
        locator: &EventLocator,
        property: &str,
        value: &str,
    ) -> CalbookResult<()> {
        let change = PropertyChange::parse(property, value)?;
        self.edit(locator, EditScope::ThisAndLater, &change)
    }

    pub fn edit_all(
        &mut self,
        locator: &EventLocator,
        property: &str,
        value: &str,
    ) -> CalbookResult<()> {
        let change = PropertyChange::parse(property, value)?;
        self.edit(locator, EditScope::All, &change)
    }

    /// Apply `change` to the located event and, depending on `scope`, the
    /// rest of its series.
    ///
    /// A start change made with `ThisAndLater` or `All` promotes every edited
    /// occurrence to a standalone event. On a standalone event every scope
    /// behaves like `Single`.
    pub fn edit(
        &mut self,
        locator: &EventLocator,
        scope: EditScope,
        change: &PropertyChange,
    ) -> CalbookResult<()> {
        let slot = self.locate(locator)?;
        let targets = self.targets(slot, scope);
        self.check_edit(&targets, change)?;

        let promoted = match (slot, scope) {
            (Slot::Series { series, index }, EditScope::ThisAndLater) => {
                self.series[series].edit_from(index, change)
            }
            (Slot::Series { series, .. }, EditScope::All) => self.series[series].edit_all(change),
            _ => {
                if let Some(event) = self.event_at_mut(slot) {
                    event.apply(change);
                }
                Vec::new()
            }
        };

        debug!(
            calendar = %self.name,
            subject = %locator.subject,
            property = %change.property(),
            ?scope,
            edited = targets.len(),
            promoted = promoted.len(),
            "edited events"
        );
        self.events.extend(promoted);
        Ok(())
    }

    fn slots(&self) -> impl Iterator<Item = (Slot, &Event)> {
        let standalone = self
            .events
            .iter()
            .enumerate()
            .map(|(i, e)| (Slot::Standalone(i), e));
        let occurrences = self.series.iter().enumerate().flat_map(|(s, series)| {
            series
                .occurrences()
                .iter()
                .enumerate()
                .map(move |(index, e)| (Slot::Series { series: s, index }, e))
        });
        standalone.chain(occurrences)
    }

    fn locate(&self, locator: &EventLocator) -> CalbookResult<Slot> {
        let found: Vec<Slot> = self
            .slots()
            .filter(|(_, e)| locator.matches(e))
            .map(|(slot, _)| slot)
            .collect();

        match found.as_slice() {
            [slot] => Ok(*slot),
            [] => Err(CalbookError::NotFound(format!(
                "No event '{}' starting {} in calendar '{}'",
                locator.subject, locator.start, self.name
            ))),
            _ => Err(CalbookError::Ambiguous(format!(
                "{} events '{}' start at {} in calendar '{}'",
                found.len(),
                locator.subject,
                locator.start,
                self.name
            ))),
        }
    }

    fn targets(&self, slot: Slot, scope: EditScope) -> Vec<Slot> {
        let Slot::Series { series, index } = slot else {
            return vec![slot];
        };
        let first = match scope {
            EditScope::Single => return vec![slot],
            EditScope::ThisAndLater => index,
            EditScope::All => 0,
        };
        (first..self.series[series].len())
            .map(|index| Slot::Series { series, index })
            .collect()
    }

    fn event_at(&self, slot: Slot) -> Option<&Event> {
        match slot {
            Slot::Standalone(i) => self.events.get(i),
            Slot::Series { series, index } => self.series.get(series)?.occurrences().get(index),
        }
    }

    fn event_at_mut(&mut self, slot: Slot) -> Option<&mut Event> {
        match slot {
            Slot::Standalone(i) => self.events.get_mut(i),
            Slot::Series { series, index } => self.series.get_mut(series)?.occurrence_mut(index),
        }
    }

    /// Reject the edit if any edited event would end up sharing its identity
    /// with another edited event or with an event the edit leaves alone.
    fn check_edit(&self, targets: &[Slot], change: &PropertyChange) -> CalbookResult<()> {
        let new_keys: Vec<EventKey> = targets
            .iter()
            .filter_map(|slot| self.event_at(*slot))
            .map(|e| e.key_after(change))
            .collect();

        let mut seen = HashSet::new();
        if let Some(key) = new_keys.iter().find(|key| !seen.insert(*key)) {
            return Err(CalbookError::Conflict(format!(
                "Edit would create duplicate events {}",
                key
            )));
        }

        let target_set: HashSet<Slot> = targets.iter().copied().collect();
        if let Some((_, clash)) = self
            .slots()
            .filter(|(slot, _)| !target_set.contains(slot))
            .find(|(_, e)| seen.contains(&e.key()))
        {
            return Err(CalbookError::Conflict(format!(
                "Edit would duplicate existing event {}",
                clash.key()
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recurrence::{RecurrenceRule, Termination};
    use chrono::NaiveDate;

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, 0)
            .unwrap()
    }

    /// Mon/Wed/Fri lecture from 2024-03-18, three occurrences: 18th, 20th, 22nd.
    fn calendar_with_lectures() -> Calendar {
        let mut cal = Calendar::with_zone_name("school", "America/Chicago").unwrap();
        let template = Event::new("Lecture", at(2024, 3, 18, 14, 0), at(2024, 3, 18, 15, 0)).unwrap();
        let rule = RecurrenceRule::new("MWF", Termination::Count(3)).unwrap();
        cal.create_series(&template, &rule).unwrap();
        cal
    }

    fn lecture_on(day: u32) -> EventLocator {
        EventLocator::new("Lecture", at(2024, 3, day, 14, 0))
    }

    #[test]
    fn single_edit_changes_one_occurrence_in_place() {
        let mut cal = calendar_with_lectures();

        cal.edit_single(&lecture_on(20), "location", "Hall B").unwrap();

        let occurrences = cal.series()[0].occurrences();
        assert_eq!(occurrences[0].location(), None);
        assert_eq!(occurrences[1].location(), Some("Hall B"));
        assert_eq!(occurrences[2].location(), None);
    }

    #[test]
    fn single_start_edit_keeps_occurrence_in_series() {
        let mut cal = calendar_with_lectures();

        cal.edit_single(&lecture_on(20), "start", "2024-03-20T13:00").unwrap();

        assert_eq!(cal.series()[0].len(), 3);
        assert!(cal.standalone_events().is_empty());
        assert_eq!(cal.series()[0].occurrences()[1].start(), at(2024, 3, 20, 13, 0));
    }

    #[test]
    fn this_and_later_without_start_keeps_series() {
        let mut cal = calendar_with_lectures();

        cal.edit_this_and_later(&lecture_on(20), "subject", "Seminar")
            .unwrap();

        let subjects: Vec<_> = cal.series()[0]
            .occurrences()
            .iter()
            .map(|e| e.subject().to_string())
            .collect();
        assert_eq!(subjects, vec!["Lecture", "Seminar", "Seminar"]);
    }

    #[test]
    fn this_and_later_start_promotes_tail() {
        let mut cal = calendar_with_lectures();

        cal.edit_this_and_later(&lecture_on(20), "start", "2024-03-20T13:00")
            .unwrap();

        assert_eq!(cal.series()[0].len(), 1);
        assert_eq!(cal.series()[0].occurrences()[0].start(), at(2024, 3, 18, 14, 0));
        assert_eq!(cal.standalone_events().len(), 2);
        assert_eq!(cal.event_count(), 3);
    }

    #[test]
    fn all_without_start_touches_every_occurrence() {
        let mut cal = calendar_with_lectures();

        cal.edit_all(&lecture_on(22), "status", "cancelled").unwrap();

        assert_eq!(cal.series()[0].len(), 3);
        assert!(cal.series()[0]
            .occurrences()
            .iter()
            .all(|e| e.status() == Some("cancelled")));
    }

    #[test]
    fn all_with_start_dissolves_series() {
        let mut cal = calendar_with_lectures();

        cal.edit_all(&lecture_on(18), "start", "2024-03-18T13:30").unwrap();

        assert!(cal.series()[0].is_empty());
        assert_eq!(cal.standalone_events().len(), 3);
    }

    #[test]
    fn standalone_target_degrades_to_single() {
        let mut cal = calendar_with_lectures();
        cal.add_event(Event::new("Exam", at(2024, 3, 25, 9, 0), at(2024, 3, 25, 11, 0)).unwrap())
            .unwrap();

        let exam = EventLocator::new("Exam", at(2024, 3, 25, 9, 0));
        cal.edit_all(&exam, "start", "2024-03-25T08:00").unwrap();

        assert_eq!(cal.standalone_events()[0].start(), at(2024, 3, 25, 8, 0));
        assert_eq!(cal.series()[0].len(), 3);
    }

    #[test]
    fn missing_event_is_not_found() {
        let mut cal = calendar_with_lectures();
        let result = cal.edit_all(&lecture_on(19), "location", "Hall C");
        assert!(matches!(result, Err(CalbookError::NotFound(_))));
    }

    #[test]
    fn ambiguous_locator_mutates_nothing() {
        let mut cal = calendar_with_lectures();
        cal.add_event(Event::new("Lecture", at(2024, 3, 20, 14, 0), at(2024, 3, 20, 16, 0)).unwrap())
            .unwrap();

        let result = cal.edit_this_and_later(&lecture_on(20), "location", "Hall C");

        assert!(matches!(result, Err(CalbookError::Ambiguous(_))));
        assert!(cal.events().iter().all(|e| e.location().is_none()));

        // The end disambiguates.
        let exact = lecture_on(20).with_end(at(2024, 3, 20, 16, 0));
        cal.edit_single(&exact, "location", "Hall C").unwrap();
        assert_eq!(cal.standalone_events()[0].location(), Some("Hall C"));
    }

    #[test]
    fn bad_property_is_rejected_before_lookup() {
        let mut cal = calendar_with_lectures();
        let result = cal.edit_all(&lecture_on(18), "colour", "blue");
        assert!(matches!(result, Err(CalbookError::Validation(_))));
    }

    #[test]
    fn edit_creating_duplicate_is_rejected() {
        let mut cal = calendar_with_lectures();
        cal.add_event(Event::new("Review", at(2024, 3, 20, 14, 0), at(2024, 3, 20, 15, 0)).unwrap())
            .unwrap();

        let result = cal.edit_single(&lecture_on(20), "subject", "Review");

        assert!(matches!(result, Err(CalbookError::Conflict(_))));
        assert_eq!(cal.series()[0].occurrences()[1].subject(), "Lecture");
    }

    #[test]
    fn this_and_later_start_clash_leaves_series_intact() {
        let mut cal = calendar_with_lectures();
        // What the Friday lecture would become after moving every start to
        // Wednesday 13:00.
        let blocker = Event::new("Lecture", at(2024, 3, 20, 13, 0), at(2024, 3, 22, 15, 0)).unwrap();
        cal.add_event(blocker.clone()).unwrap();

        let result = cal.edit_this_and_later(&lecture_on(20), "start", "2024-03-20T13:00");

        assert!(matches!(result, Err(CalbookError::Conflict(_))));
        assert_eq!(cal.series()[0].len(), 3);
        let starts: Vec<_> = cal.series()[0].occurrences().iter().map(|e| e.start()).collect();
        assert_eq!(
            starts,
            vec![at(2024, 3, 18, 14, 0), at(2024, 3, 20, 14, 0), at(2024, 3, 22, 14, 0)]
        );
        assert_eq!(cal.standalone_events(), &[blocker]);
    }
}
