//! Resource availability windows.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime, TimeDelta};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use crate::time_range::LocalDateTimeRange;

/// Start bound written by files that leave the start of a window open.
pub fn start_date_na() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(1984, 1, 1)
        .unwrap_or(NaiveDate::MIN)
        .and_time(NaiveTime::MIN)
}

/// End bound written by files that leave the end of a window open.
pub fn end_date_na() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2049, 12, 31)
        .and_then(|date| date.and_hms_opt(23, 58, 0))
        .unwrap_or(NaiveDateTime::MAX)
}

fn open_start(start: Option<NaiveDateTime>) -> Option<NaiveDateTime> {
    start.filter(|start| *start > start_date_na())
}

fn open_end(end: Option<NaiveDateTime>) -> Option<NaiveDateTime> {
    end.filter(|end| *end < end_date_na())
}

/// Units of a resource available over a date-time window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Availability {
    pub range: LocalDateTimeRange,
    /// Percentage, 100.0 being one full unit.
    pub units: f64,
}

impl Availability {
    pub fn new(start: Option<NaiveDateTime>, end: Option<NaiveDateTime>, units: f64) -> Self {
        Self {
            range: LocalDateTimeRange { start, end },
            units,
        }
    }
}

enum Position<'a> {
    Before,
    Within(&'a Availability),
    Between(&'a Availability, &'a Availability),
    After(&'a Availability),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AvailabilityTable {
    entries: Vec<Availability>,
}

impl AvailabilityTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a window, keeping the table sorted by start.
    pub fn add(&mut self, availability: Availability) {
        self.entries.push(availability);
        self.entries.sort_by(|a, b| a.range.start.cmp(&b.range.start));
    }

    pub fn entries(&self) -> &[Availability] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The window containing `date`, both bounds included.
    pub fn entry_by_date(&self, date: NaiveDateTime) -> Option<&Availability> {
        self.entries
            .iter()
            .find(|entry| entry.range.contains_inclusive(&date))
    }

    fn locate(&self, date: NaiveDateTime) -> Position<'_> {
        if let Some(entry) = self.entry_by_date(date) {
            return Position::Within(entry);
        }
        let next = self
            .entries
            .iter()
            .position(|entry| entry.range.compare_to_point_inclusive(&date) == Ordering::Less);
        match next {
            Some(0) => Position::Before,
            Some(index) => Position::Between(&self.entries[index - 1], &self.entries[index]),
            None => match self.entries.last() {
                Some(last) => Position::After(last),
                None => Position::Before,
            },
        }
    }

    /// Earliest instant of the availability period around `date`.
    ///
    /// `None` means no restriction, including when `date` precedes every window.
    pub fn available_from(&self, date: NaiveDateTime) -> Option<NaiveDateTime> {
        match self.locate(date) {
            Position::Before => None,
            Position::Within(entry) => open_start(entry.range.start),
            Position::Between(previous, _) | Position::After(previous) => {
                open_end(previous.range.end).map(|end| end + TimeDelta::minutes(1))
            }
        }
    }

    /// Latest instant of the availability period around `date`.
    ///
    /// `None` means no restriction, including when `date` precedes every window.
    pub fn available_to(&self, date: NaiveDateTime) -> Option<NaiveDateTime> {
        match self.locate(date) {
            Position::Before | Position::After(_) => None,
            Position::Within(entry) => open_end(entry.range.end),
            Position::Between(_, next) => {
                open_start(next.range.start).map(|start| start - TimeDelta::minutes(1))
            }
        }
    }
}
