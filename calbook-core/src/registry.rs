//! The set of calendars a user works with.
//!
//! Which calendar is "in use" is not stored here. Callers hold a [`Session`]
//! and pass it to the operations that act on the selected calendar, so
//! several independent registries (and sessions) can coexist.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use tracing::info;

use crate::calbook_config::CalbookConfig;
use crate::calendar::Calendar;
use crate::error::{CalbookError, CalbookResult};
use crate::event::Event;
use crate::recurrence::{RecurrenceRule, Termination};

/// Caller-held selection of the calendar in use.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    selected: Option<String>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn selected(&self) -> Option<&str> {
        self.selected.as_deref()
    }
}

#[derive(Debug, Clone, Default)]
pub struct CalendarRegistry {
    calendars: BTreeMap<String, Calendar>,
    config: CalbookConfig,
}

impl CalendarRegistry {
    pub fn new(config: CalbookConfig) -> Self {
        CalendarRegistry {
            calendars: BTreeMap::new(),
            config,
        }
    }

    pub fn config(&self) -> &CalbookConfig {
        &self.config
    }

    /// Create a calendar. Fails if the name is taken or the zone is unknown.
    pub fn add(&mut self, name: &str, zone: &str) -> CalbookResult<&mut Calendar> {
        if self.calendars.contains_key(name) {
            return Err(CalbookError::Conflict(format!(
                "Calendar '{}' already exists",
                name
            )));
        }

        let calendar = Calendar::with_zone_name(name, zone)?;
        info!(calendar = name, zone, "created calendar");
        Ok(self.calendars.entry(name.to_string()).or_insert(calendar))
    }

    /// Create a calendar in the configured default zone.
    pub fn add_default_zone(&mut self, name: &str) -> CalbookResult<&mut Calendar> {
        let zone = self.config.default_timezone.clone();
        self.add(name, &zone)
    }

    /// Adopt an existing calendar under its own name.
    pub fn insert(&mut self, calendar: Calendar) -> CalbookResult<()> {
        if self.calendars.contains_key(calendar.name()) {
            return Err(CalbookError::Conflict(format!(
                "Calendar '{}' already exists",
                calendar.name()
            )));
        }
        self.calendars.insert(calendar.name().to_string(), calendar);
        Ok(())
    }

    pub fn get(&self, name: &str) -> CalbookResult<&Calendar> {
        self.calendars
            .get(name)
            .ok_or_else(|| CalbookError::NotFound(format!("Calendar '{}'", name)))
    }

    pub fn get_mut(&mut self, name: &str) -> CalbookResult<&mut Calendar> {
        self.calendars
            .get_mut(name)
            .ok_or_else(|| CalbookError::NotFound(format!("Calendar '{}'", name)))
    }

    /// Calendar names in sorted order.
    pub fn list(&self) -> Vec<&str> {
        self.calendars.keys().map(String::as_str).collect()
    }

    pub fn calendars(&self) -> impl Iterator<Item = &Calendar> {
        self.calendars.values()
    }

    // SESSION:

    /// A session with the configured default calendar selected, if it exists.
    pub fn default_session(&self) -> Session {
        let selected = self
            .config
            .default_calendar
            .as_ref()
            .filter(|name| self.calendars.contains_key(name.as_str()))
            .cloned();
        Session { selected }
    }

    pub fn select(&self, session: &mut Session, name: &str) -> CalbookResult<()> {
        self.get(name)?;
        session.selected = Some(name.to_string());
        Ok(())
    }

    pub fn active(&self, session: &Session) -> CalbookResult<&Calendar> {
        let name = session
            .selected()
            .ok_or_else(|| CalbookError::NotFound("No calendar selected".to_string()))?;
        self.get(name)
    }

    pub fn active_mut(&mut self, session: &Session) -> CalbookResult<&mut Calendar> {
        let name = session
            .selected()
            .ok_or_else(|| CalbookError::NotFound("No calendar selected".to_string()))?;
        self.get_mut(name)
    }

    // CALENDAR PROPERTIES:

    /// Rename a calendar, keeping `session`'s selection pointing at it.
    pub fn rename(&mut self, session: &mut Session, old: &str, new: &str) -> CalbookResult<()> {
        self.get(old)?;
        if old == new {
            return Ok(());
        }
        if self.calendars.contains_key(new) {
            return Err(CalbookError::Conflict(format!(
                "Calendar '{}' already exists",
                new
            )));
        }

        let mut calendar = self
            .calendars
            .remove(old)
            .ok_or_else(|| CalbookError::NotFound(format!("Calendar '{}'", old)))?;
        calendar.set_name(new);
        self.calendars.insert(new.to_string(), calendar);

        if session.selected() == Some(old) {
            session.selected = Some(new.to_string());
        }

        info!(from = old, to = new, "renamed calendar");
        Ok(())
    }

    pub fn re_zone(&mut self, name: &str, zone: &str) -> CalbookResult<()> {
        self.get_mut(name)?.re_zone(zone)
    }

    // HELPERS:

    /// A recurrence rule bounded by the configured walk limit.
    pub fn recurrence_rule(
        &self,
        weekdays: &str,
        termination: Termination,
    ) -> CalbookResult<RecurrenceRule> {
        Ok(RecurrenceRule::new(weekdays, termination)?
            .with_walk_limit(self.config.recurrence_walk_limit))
    }

    /// The selected calendar's upcoming events from `date`, as many as the
    /// configured schedule length.
    pub fn schedule(&self, session: &Session, date: NaiveDate) -> CalbookResult<Vec<&Event>> {
        Ok(self
            .active(session)?
            .schedule_from(date, self.config.schedule_length))
    }
}
