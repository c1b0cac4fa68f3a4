use chrono::{NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

pub const MILLIS_PER_MINUTE: i64 = 60_000;
pub const MILLIS_PER_HOUR: i64 = 60 * MILLIS_PER_MINUTE;
pub const MILLIS_PER_DAY: i64 = 24 * MILLIS_PER_HOUR;

/// A pair of optional bounds. Both bounds absent means "unbounded".
///
/// Ordering is lexicographic on `(start, end)`, with an absent bound sorting first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TimeRange<T> {
    pub start: Option<T>,
    pub end: Option<T>,
}

pub type LocalTimeRange = TimeRange<NaiveTime>;
pub type LocalDateRange = TimeRange<NaiveDate>;
pub type LocalDateTimeRange = TimeRange<NaiveDateTime>;

impl<T> TimeRange<T> {
    pub fn new(start: T, end: T) -> Self {
        Self {
            start: Some(start),
            end: Some(end),
        }
    }

    pub fn unbounded() -> Self {
        Self {
            start: None,
            end: None,
        }
    }

    pub fn is_unbounded(&self) -> bool {
        self.start.is_none() && self.end.is_none()
    }
}

impl<T: Copy> TimeRange<T> {
    pub fn bounds(&self) -> Option<(T, T)> {
        Some((self.start?, self.end?))
    }
}

impl<T: Ord> TimeRange<T> {
    /// Where `point` sits relative to the half-open range `[start, end)`.
    ///
    /// `Less` means the point precedes the range, `Greater` that it follows it.
    pub fn compare_to_point(&self, point: &T) -> Ordering {
        if matches!(&self.start, Some(start) if point < start) {
            return Ordering::Less;
        }
        if matches!(&self.end, Some(end) if point >= end) {
            return Ordering::Greater;
        }
        Ordering::Equal
    }

    /// Same as [`compare_to_point`](Self::compare_to_point) but the end bound is included.
    pub fn compare_to_point_inclusive(&self, point: &T) -> Ordering {
        if matches!(&self.start, Some(start) if point < start) {
            return Ordering::Less;
        }
        if matches!(&self.end, Some(end) if point > end) {
            return Ordering::Greater;
        }
        Ordering::Equal
    }

    pub fn contains(&self, point: &T) -> bool {
        self.compare_to_point(point) == Ordering::Equal
    }

    pub fn contains_inclusive(&self, point: &T) -> bool {
        self.compare_to_point_inclusive(point) == Ordering::Equal
    }
}

/// Milliseconds since midnight.
pub fn time_millis(time: NaiveTime) -> i64 {
    i64::from(time.num_seconds_from_midnight()) * 1000 + i64::from(time.nanosecond() / 1_000_000)
}

/// Milliseconds since midnight, reading 00:00 as the end of the day.
pub fn end_time_millis(time: NaiveTime) -> i64 {
    match time_millis(time) {
        0 => MILLIS_PER_DAY,
        millis => millis,
    }
}

/// Time of day for a millisecond offset; a full day wraps to midnight.
pub fn time_from_millis(millis: i64) -> NaiveTime {
    let millis = millis.rem_euclid(MILLIS_PER_DAY);
    let secs = (millis / 1000) as u32;
    let nanos = ((millis % 1000) * 1_000_000) as u32;
    NaiveTime::from_num_seconds_from_midnight_opt(secs, nanos).unwrap_or(NaiveTime::MIN)
}

impl LocalTimeRange {
    /// Bounds in milliseconds since midnight. An unbounded range covers the whole day.
    pub fn millis(&self) -> Option<(i64, i64)> {
        match (self.start, self.end) {
            (Some(start), Some(end)) => Some((time_millis(start), end_time_millis(end))),
            (None, None) => Some((0, MILLIS_PER_DAY)),
            _ => None,
        }
    }

    pub fn duration_millis(&self) -> i64 {
        self.millis()
            .map(|(start, end)| (end - start).max(0))
            .unwrap_or(0)
    }

    /// Whether a time of day falls in `[start, end)` with a midnight end meaning end of day.
    pub fn contains_time(&self, time: NaiveTime) -> bool {
        let point = time_millis(time);
        self.millis()
            .is_some_and(|(start, end)| point >= start && point < end)
    }
}

impl<T: fmt::Display> fmt::Display for TimeRange<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.start, &self.end) {
            (Some(start), Some(end)) => write!(f, "{start}-{end}"),
            (Some(start), None) => write!(f, "{start}-"),
            (None, Some(end)) => write!(f, "-{end}"),
            (None, None) => write!(f, "unbounded"),
        }
    }
}
