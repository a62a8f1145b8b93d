//! The visible date window.
//!
//! Signals outside the window are neither loaded nor aggregated; changing
//! the window means a full reload of the projection for the new range.

use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::constants::DAYS_WINDOW;

/// A contiguous, inclusive span of calendar dates.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct DateWindow {
    start: NaiveDate,
    days: u32,
}

impl DateWindow {
    /// A window of `days` dates starting at `start` (inclusive).
    ///
    /// `days` is clamped to at least 1; an empty window is never useful.
    pub fn new(start: NaiveDate, days: u32) -> Self {
        Self {
            start,
            days: days.max(1),
        }
    }

    /// The default rolling window: yesterday through `DAYS_WINDOW - 2`
    /// days ahead of `today`.
    pub fn around(today: NaiveDate) -> Self {
        Self::new(today - Duration::days(1), DAYS_WINDOW)
    }

    /// The calendar week containing `date`, starting on Sunday.
    pub fn week_of(date: NaiveDate) -> Self {
        let back = date.weekday().num_days_from_sunday() as i64;
        Self::new(date - Duration::days(back), 7)
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    /// Last date in the window, inclusive.
    pub fn end(&self) -> NaiveDate {
        self.start + Duration::days(self.days as i64 - 1)
    }

    pub fn days(&self) -> u32 {
        self.days
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end()
    }

    /// All dates in the window, in order.
    pub fn dates(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        let start = self.start;
        (0..self.days as i64).map(move |offset| start + Duration::days(offset))
    }

    /// The same-length window immediately after this one.
    pub fn next(&self) -> Self {
        Self::new(self.start + Duration::days(self.days as i64), self.days)
    }

    /// The same-length window immediately before this one.
    pub fn previous(&self) -> Self {
        Self::new(self.start - Duration::days(self.days as i64), self.days)
    }
}
