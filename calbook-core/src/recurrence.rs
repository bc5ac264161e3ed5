//! Weekday recurrence for event series.
//!
//! A rule walks forward one day at a time from the template event's date and
//! emits a re-dated copy of the template on every day in its weekday mask,
//! until the occurrence count or the cutoff date is reached.

use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

use crate::error::{CalbookError, CalbookResult};
use crate::event::Event;

/// Default upper bound on the number of days a single expansion may walk.
pub const DEFAULT_WALK_LIMIT: u32 = 36_600;

/// Weekday symbols, Monday first: `M T W R F S U`.
const WEEKDAY_LETTERS: [char; 7] = ['M', 'T', 'W', 'R', 'F', 'S', 'U'];

/// A non-empty set of weekdays, written as letters such as `"MWF"` or `"TR"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct WeekdayMask(u8);

impl WeekdayMask {
    pub fn contains(&self, weekday: Weekday) -> bool {
        self.0 & bit(weekday) != 0
    }

    pub fn weekdays(&self) -> Vec<Weekday> {
        std::iter::successors(Some(Weekday::Mon), |d| Some(d.succ()))
            .take(7)
            .filter(|d| self.contains(*d))
            .collect()
    }
}

fn bit(weekday: Weekday) -> u8 {
    1 << weekday.num_days_from_monday()
}

impl FromStr for WeekdayMask {
    type Err = CalbookError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(CalbookError::Validation(
                "Weekday mask cannot be empty".to_string(),
            ));
        }

        let mut mask = 0u8;
        for c in s.chars() {
            let index = WEEKDAY_LETTERS.iter().position(|l| *l == c).ok_or_else(|| {
                CalbookError::Validation(format!(
                    "Invalid weekday '{}' in '{}' (expected letters from MTWRFSU)",
                    c, s
                ))
            })?;
            mask |= 1 << index;
        }
        Ok(WeekdayMask(mask))
    }
}

impl TryFrom<String> for WeekdayMask {
    type Error = CalbookError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<WeekdayMask> for String {
    fn from(mask: WeekdayMask) -> Self {
        mask.to_string()
    }
}

impl fmt::Display for WeekdayMask {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for (i, letter) in WEEKDAY_LETTERS.iter().enumerate() {
            if self.0 & (1 << i) != 0 {
                write!(f, "{}", letter)?;
            }
        }
        Ok(())
    }
}

/// When a series stops repeating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Termination {
    /// Stop after this many occurrences. Zero yields an empty series.
    Count(u32),
    /// Stop after this date (inclusive).
    Until(NaiveDate),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecurrenceRule {
    weekdays: WeekdayMask,
    termination: Termination,
    walk_limit: u32,
}

impl RecurrenceRule {
    /// Build a rule from a weekday string such as `"MWF"`.
    pub fn new(weekdays: &str, termination: Termination) -> CalbookResult<Self> {
        Ok(Self::from_mask(weekdays.parse()?, termination))
    }

    pub fn from_mask(weekdays: WeekdayMask, termination: Termination) -> Self {
        RecurrenceRule {
            weekdays,
            termination,
            walk_limit: DEFAULT_WALK_LIMIT,
        }
    }

    /// Cap the number of days one expansion may walk.
    pub fn with_walk_limit(mut self, days: u32) -> Self {
        self.walk_limit = days;
        self
    }

    pub fn weekdays(&self) -> WeekdayMask {
        self.weekdays
    }

    pub fn termination(&self) -> Termination {
        self.termination
    }

    /// Expand `template` into its occurrences, in date order.
    ///
    /// Each occurrence keeps the template's clock times and descriptive
    /// fields. Fails if the walk would exceed the walk limit.
    pub fn expand(&self, template: &Event) -> CalbookResult<Vec<Event>> {
        let mut occurrences = Vec::new();
        let mut day = template.date();
        let mut walked = 0u32;

        while !self.is_finished(occurrences.len(), day) {
            if walked >= self.walk_limit {
                return Err(CalbookError::Validation(format!(
                    "Recurrence for '{}' did not finish within {} days",
                    template.subject(),
                    self.walk_limit
                )));
            }

            if self.weekdays.contains(day.weekday()) {
                occurrences.push(template.on_date(day));
            }

            day = day.succ_opt().ok_or_else(|| {
                CalbookError::Validation(format!(
                    "Recurrence for '{}' runs past the last supported date",
                    template.subject()
                ))
            })?;
            walked += 1;
        }

        Ok(occurrences)
    }

    fn is_finished(&self, emitted: usize, day: NaiveDate) -> bool {
        match self.termination {
            Termination::Count(count) => emitted >= count as usize,
            Termination::Until(cutoff) => day > cutoff,
        }
    }
}
