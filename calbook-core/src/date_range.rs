//! Inclusive date range for querying and copying events.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{CalbookError, CalbookResult};
use crate::event::Event;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    from: NaiveDate,
    to: NaiveDate,
}

impl DateRange {
    /// Fails if `from` is after `to`.
    pub fn new(from: NaiveDate, to: NaiveDate) -> CalbookResult<Self> {
        if from > to {
            return Err(CalbookError::Validation(format!(
                "Range start {} is after range end {}",
                from, to
            )));
        }
        Ok(DateRange { from, to })
    }

    /// A range covering a single day.
    pub fn day(date: NaiveDate) -> Self {
        DateRange { from: date, to: date }
    }

    /// Parse two YYYY-MM-DD strings.
    pub fn from_args(from: &str, to: &str) -> CalbookResult<Self> {
        Self::new(parse_date(from)?, parse_date(to)?)
    }

    pub fn from(&self) -> NaiveDate {
        self.from
    }

    pub fn to(&self) -> NaiveDate {
        self.to
    }

    /// Whether `event` falls within this range (see [`Event::falls_within`]).
    pub fn contains(&self, event: &Event) -> bool {
        event.falls_within(self.from, self.to)
    }
}

/// Parse YYYY-MM-DD.
pub fn parse_date(s: &str) -> CalbookResult<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|_| {
        CalbookError::Validation(format!("Invalid date format '{}'. Expected YYYY-MM-DD", s))
    })
}
