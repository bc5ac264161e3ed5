//! Copying events between calendars.
//!
//! Copies are taken from the session's selected calendar. Copying one event
//! to an explicit start keeps that start as given in the target calendar.
//! Copying by date or range moves each event by whole days and converts its
//! start from the source calendar's zone to the target's.

use chrono::{Duration, NaiveDate, NaiveDateTime};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::calendar::zone;
use crate::date_range::DateRange;
use crate::error::{CalbookError, CalbookResult};
use crate::event::{Event, EventKey};
use crate::registry::{CalendarRegistry, Session};

/// Outcome of a multi-event copy.
///
/// An event that collides with one already in the target is skipped; the
/// rest of the batch is still copied.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CopyReport {
    pub copied: Vec<EventKey>,
    pub skipped: Vec<EventKey>,
}

impl CalendarRegistry {
    /// Copy the event with `subject` starting at `source_start` so that it
    /// starts at `new_start` in `target`, keeping its duration.
    ///
    /// `new_start` is used as-is in the target calendar's zone; no zone
    /// conversion happens in this mode.
    pub fn copy_event(
        &mut self,
        session: &Session,
        subject: &str,
        source_start: NaiveDateTime,
        target: &str,
        new_start: NaiveDateTime,
    ) -> CalbookResult<EventKey> {
        self.get(target)?;
        let source = self.active(session)?;

        let copy = match source.find_at(subject, source_start).as_slice() {
            [event] => event.starting_at(new_start)?,
            [] => {
                return Err(CalbookError::NotFound(format!(
                    "No event '{}' starting {} in calendar '{}'",
                    subject,
                    source_start,
                    source.name()
                )));
            }
            found => {
                return Err(CalbookError::Ambiguous(format!(
                    "{} events '{}' start at {} in calendar '{}'",
                    found.len(),
                    subject,
                    source_start,
                    source.name()
                )));
            }
        };

        let key = copy.key();
        self.get_mut(target)?.add_event(copy)?;
        debug!(event = %key, target, "copied event");
        Ok(key)
    }

    /// Copy every event on `date` to `dest` in `target`.
    pub fn copy_events_on(
        &mut self,
        session: &Session,
        date: NaiveDate,
        target: &str,
        dest: NaiveDate,
    ) -> CalbookResult<CopyReport> {
        self.copy_shifted(session, DateRange::day(date), target, dest)
    }

    /// Copy every event in `range` to `target`, moving the range start to
    /// `dest` and every other event by the same number of days.
    pub fn copy_events_between(
        &mut self,
        session: &Session,
        range: &DateRange,
        target: &str,
        dest: NaiveDate,
    ) -> CalbookResult<CopyReport> {
        self.copy_shifted(session, *range, target, dest)
    }

    fn copy_shifted(
        &mut self,
        session: &Session,
        range: DateRange,
        target: &str,
        dest: NaiveDate,
    ) -> CalbookResult<CopyReport> {
        let target_zone = self.get(target)?.zone();
        let source = self.active(session)?;
        let days = (dest - range.from()).num_days();

        let copies = source
            .events_between(&range)
            .into_iter()
            .map(|event| shifted_copy(event, days, source.zone(), target_zone))
            .collect::<CalbookResult<Vec<_>>>()?;

        let calendar = self.get_mut(target)?;
        let mut report = CopyReport::default();
        for copy in copies {
            let key = copy.key();
            match calendar.add_event(copy) {
                Ok(()) => report.copied.push(key),
                Err(CalbookError::Conflict(reason)) => {
                    warn!(event = %key, target, %reason, "skipped copy");
                    report.skipped.push(key);
                }
                Err(e) => return Err(e),
            }
        }

        debug!(
            target,
            copied = report.copied.len(),
            skipped = report.skipped.len(),
            "copied events"
        );
        Ok(report)
    }
}

/// Move `event` by `days`, then re-express its start clock time from `from`
/// in `to`. The duration is kept.
fn shifted_copy(event: &Event, days: i64, from: Tz, to: Tz) -> CalbookResult<Event> {
    let date = event
        .date()
        .checked_add_signed(Duration::days(days))
        .ok_or_else(|| {
            CalbookError::Validation(format!("Cannot move {} by {} days", event.key(), days))
        })?;
    let start = zone::reinterpret(date.and_time(event.start().time()), from, to)?;
    event.starting_at(start)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, 0)
            .unwrap()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn setup() -> (CalendarRegistry, Session) {
        let mut registry = CalendarRegistry::default();
        let mut session = Session::new();
        registry.add("cal1", "America/New_York").unwrap();
        registry.add("cal2", "America/Los_Angeles").unwrap();
        registry.select(&mut session, "cal1").unwrap();
        (registry, session)
    }

    #[test]
    fn copy_event_keeps_duration_without_zone_conversion() {
        let (mut registry, session) = setup();
        registry
            .get_mut("cal1")
            .unwrap()
            .add_event(
                Event::new("Review", at(2024, 3, 15, 10, 0), at(2024, 3, 15, 11, 30))
                    .unwrap()
                    .with_location("Room 1"),
            )
            .unwrap();

        registry
            .copy_event(&session, "Review", at(2024, 3, 15, 10, 0), "cal2", at(2024, 3, 20, 10, 0))
            .unwrap();

        let copied = &registry.get("cal2").unwrap().standalone_events()[0];
        assert_eq!(copied.start(), at(2024, 3, 20, 10, 0));
        assert_eq!(copied.end(), at(2024, 3, 20, 11, 30));
        assert_eq!(copied.location(), Some("Room 1"));
    }

    #[test]
    fn copy_event_reports_missing_and_ambiguous_sources() {
        let (mut registry, session) = setup();
        let cal1 = registry.get_mut("cal1").unwrap();
        cal1.add_event(Event::new("Sync", at(2024, 3, 15, 10, 0), at(2024, 3, 15, 11, 0)).unwrap())
            .unwrap();
        cal1.add_event(Event::new("Sync", at(2024, 3, 15, 10, 0), at(2024, 3, 15, 12, 0)).unwrap())
            .unwrap();

        let missing =
            registry.copy_event(&session, "Other", at(2024, 3, 15, 10, 0), "cal2", at(2024, 3, 16, 10, 0));
        assert!(matches!(missing, Err(CalbookError::NotFound(_))));

        let ambiguous =
            registry.copy_event(&session, "Sync", at(2024, 3, 15, 10, 0), "cal2", at(2024, 3, 16, 10, 0));
        assert!(matches!(ambiguous, Err(CalbookError::Ambiguous(_))));
        assert_eq!(registry.get("cal2").unwrap().event_count(), 0);
    }

    #[test]
    fn copy_event_past_the_last_date_is_rejected() {
        let (mut registry, session) = setup();
        registry
            .get_mut("cal1")
            .unwrap()
            .add_event(Event::new("Review", at(2024, 3, 15, 10, 0), at(2024, 3, 15, 11, 0)).unwrap())
            .unwrap();

        let last = NaiveDate::MAX.and_hms_opt(23, 30, 0).unwrap();
        let result = registry.copy_event(&session, "Review", at(2024, 3, 15, 10, 0), "cal2", last);

        assert!(matches!(result, Err(CalbookError::Validation(_))));
        assert_eq!(registry.get("cal2").unwrap().event_count(), 0);
    }

    #[test]
    fn unknown_target_fails_first() {
        let (mut registry, session) = setup();
        let result = registry.copy_events_on(&session, date(2024, 3, 15), "nowhere", date(2024, 3, 15));
        assert!(matches!(result, Err(CalbookError::NotFound(_))));
    }

    #[test]
    fn copy_on_date_converts_zone() {
        let (mut registry, session) = setup();
        registry
            .get_mut("cal1")
            .unwrap()
            .add_event(Event::new("Review", at(2024, 3, 15, 10, 0), at(2024, 3, 15, 11, 0)).unwrap())
            .unwrap();

        let report = registry
            .copy_events_on(&session, date(2024, 3, 15), "cal2", date(2024, 3, 22))
            .unwrap();

        assert_eq!(report.copied.len(), 1);
        let copied = &registry.get("cal2").unwrap().standalone_events()[0];
        assert_eq!(copied.start(), at(2024, 3, 22, 7, 0));
        assert_eq!(copied.end(), at(2024, 3, 22, 8, 0));
    }

    #[test]
    fn copy_range_shifts_relative_to_range_start() {
        let (mut registry, session) = setup();
        let cal1 = registry.get_mut("cal1").unwrap();
        cal1.add_event(Event::new("A", at(2024, 3, 11, 9, 0), at(2024, 3, 11, 10, 0)).unwrap())
            .unwrap();
        cal1.add_event(Event::new("B", at(2024, 3, 13, 15, 0), at(2024, 3, 13, 16, 0)).unwrap())
            .unwrap();

        let range = DateRange::new(date(2024, 3, 11), date(2024, 3, 13)).unwrap();
        let report = registry
            .copy_events_between(&session, &range, "cal2", date(2024, 4, 1))
            .unwrap();

        assert_eq!(report.copied.len(), 2);
        let starts: Vec<_> = registry
            .get("cal2")
            .unwrap()
            .events()
            .iter()
            .map(|e| e.start())
            .collect();
        assert_eq!(starts, vec![at(2024, 4, 1, 6, 0), at(2024, 4, 3, 12, 0)]);
    }

    #[test]
    fn batch_conflict_skips_only_that_event() {
        let (mut registry, session) = setup();
        let cal1 = registry.get_mut("cal1").unwrap();
        cal1.add_event(Event::new("A", at(2024, 3, 15, 9, 0), at(2024, 3, 15, 10, 0)).unwrap())
            .unwrap();
        cal1.add_event(Event::new("B", at(2024, 3, 15, 13, 0), at(2024, 3, 15, 14, 0)).unwrap())
            .unwrap();
        // Already holds what "A" becomes in Los Angeles.
        registry
            .get_mut("cal2")
            .unwrap()
            .add_event(Event::new("A", at(2024, 3, 15, 6, 0), at(2024, 3, 15, 7, 0)).unwrap())
            .unwrap();

        let report = registry
            .copy_events_on(&session, date(2024, 3, 15), "cal2", date(2024, 3, 15))
            .unwrap();

        assert_eq!(report.skipped.len(), 1);
        assert_eq!(report.skipped[0].subject, "A");
        assert_eq!(report.copied.len(), 1);
        assert_eq!(report.copied[0].subject, "B");
        assert_eq!(registry.get("cal2").unwrap().event_count(), 2);
    }

    #[test]
    fn single_copy_conflict_is_an_error() {
        let (mut registry, session) = setup();
        registry
            .get_mut("cal1")
            .unwrap()
            .add_event(Event::new("A", at(2024, 3, 15, 9, 0), at(2024, 3, 15, 10, 0)).unwrap())
            .unwrap();

        let result =
            registry.copy_event(&session, "A", at(2024, 3, 15, 9, 0), "cal1", at(2024, 3, 15, 9, 0));
        assert!(matches!(result, Err(CalbookError::Conflict(_))));
        assert_eq!(registry.get("cal1").unwrap().event_count(), 1);
    }
}
