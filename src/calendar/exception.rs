use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::recurrence::RecurringData;
use crate::time_range::LocalTimeRange;

/// An override of the normal week for a date range or a recurring set of dates.
///
/// No working hours means the covered dates are non-working.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalendarException {
    from: NaiveDate,
    to: NaiveDate,
    recurring: Option<RecurringData>,
    hours: Vec<LocalTimeRange>,
    name: Option<String>,
}

impl CalendarException {
    pub fn new(from: NaiveDate, to: NaiveDate) -> Self {
        Self {
            from,
            to,
            recurring: None,
            hours: Vec::new(),
            name: None,
        }
    }

    pub fn single(date: NaiveDate) -> Self {
        Self::new(date, date)
    }

    /// The stored range is seeded from the rule's start date and is only
    /// used when the rule produces no dates.
    pub fn recurring(data: RecurringData) -> Self {
        let start = data.start_date();
        Self {
            recurring: Some(data),
            ..Self::new(start, start)
        }
    }

    pub fn with_hours(mut self, hours: impl IntoIterator<Item = LocalTimeRange>) -> Self {
        self.set_hours(hours);
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn recurrence(&self) -> Option<&RecurringData> {
        self.recurring.as_ref()
    }

    pub fn hours(&self) -> &[LocalTimeRange] {
        &self.hours
    }

    pub fn set_hours(&mut self, hours: impl IntoIterator<Item = LocalTimeRange>) {
        self.hours = hours.into_iter().collect();
        self.hours.sort();
    }

    pub fn add_hours(&mut self, range: LocalTimeRange) {
        self.hours.push(range);
        self.hours.sort();
    }

    pub fn is_working(&self) -> bool {
        !self.hours.is_empty()
    }

    pub fn from_date(&self) -> NaiveDate {
        self.recurring
            .as_ref()
            .and_then(RecurringData::calculated_first_date)
            .unwrap_or(self.from)
    }

    pub fn to_date(&self) -> NaiveDate {
        self.recurring
            .as_ref()
            .and_then(RecurringData::calculated_last_date)
            .unwrap_or(self.to)
    }

    /// Inclusive on both ends; an inverted range contains nothing.
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.from_date() <= date && date <= self.to_date()
    }

    pub fn overlaps(&self, other: &CalendarException) -> bool {
        !(self.to_date() < other.from_date() || other.to_date() < self.from_date())
    }

    /// One exception per concrete date for recurring rules, otherwise just this one.
    pub fn expanded_exceptions(&self) -> Vec<CalendarException> {
        match &self.recurring {
            Some(data) if data.is_expandable() => data
                .dates()
                .iter()
                .map(|date| CalendarException {
                    from: *date,
                    to: *date,
                    recurring: None,
                    hours: self.hours.clone(),
                    name: self.name.clone(),
                })
                .collect(),
            _ => vec![self.clone()],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, NaiveTime, Weekday};

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn t(h: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, 0, 0).unwrap()
    }

    #[test]
    fn contains_is_inclusive() {
        let exception = CalendarException::new(d(2024, 7, 1), d(2024, 7, 3));
        assert!(exception.contains(d(2024, 7, 1)));
        assert!(exception.contains(d(2024, 7, 3)));
        assert!(!exception.contains(d(2024, 7, 4)));
        assert!(!exception.is_working());
    }

    #[test]
    fn inverted_range_matches_nothing() {
        let exception = CalendarException::new(d(2024, 7, 3), d(2024, 7, 1));
        assert!(!exception.contains(d(2024, 7, 2)));
    }

    #[test]
    fn overlap_detection() {
        let a = CalendarException::new(d(2024, 7, 1), d(2024, 7, 3));
        let b = CalendarException::new(d(2024, 7, 3), d(2024, 7, 9));
        let c = CalendarException::new(d(2024, 7, 4), d(2024, 7, 9));
        assert!(a.overlaps(&b));
        assert!(!a.overlaps(&c));
    }

    #[test]
    fn weekly_rule_expands_to_single_days_sharing_hours() {
        let rule = RecurringData::weekly(d(2024, 1, 1), &[Weekday::Mon, Weekday::Wed])
            .until(d(2024, 1, 31));
        let exception = CalendarException::recurring(rule)
            .with_hours([LocalTimeRange::new(t(9), t(12))])
            .with_name("Short days");

        let expanded = exception.expanded_exceptions();
        assert_eq!(expanded.len(), 10);
        for single in &expanded {
            assert_eq!(single.from_date(), single.to_date());
            assert_eq!(single.hours(), exception.hours());
            assert!(matches!(single.from_date().weekday(), Weekday::Mon | Weekday::Wed));
        }
        assert!(exception.recurrence().is_some());
    }

    #[test]
    fn daily_rule_with_frequency_one_is_not_expanded() {
        let rule = RecurringData::daily(d(2024, 12, 24), 1).with_occurrences(3);
        let exception = CalendarException::recurring(rule);
        let expanded = exception.expanded_exceptions();
        assert_eq!(expanded, vec![exception.clone()]);
        assert_eq!(exception.from_date(), d(2024, 12, 24));
        assert_eq!(exception.to_date(), d(2024, 12, 26));
    }
}
