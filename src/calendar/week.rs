use chrono::{NaiveDate, NaiveTime, Weekday};
use serde::{Deserialize, Serialize};

use crate::time_range::{LocalDateRange, LocalTimeRange};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DayType {
    Working,
    NonWorking,
    /// Resolve through the next level: base week, then parent calendar.
    #[default]
    Default,
}

pub const ALL_WEEKDAYS: [Weekday; 7] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
    Weekday::Sun,
];

/// Per-weekday day types and working hours.
///
/// A week without a `date_range` is a calendar's base week; secondary weeks carry one.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct WorkWeek {
    pub name: Option<String>,
    pub date_range: Option<LocalDateRange>,
    day_types: [DayType; 7],
    hours: [Vec<LocalTimeRange>; 7],
}

fn index(day: Weekday) -> usize {
    day.num_days_from_monday() as usize
}

pub(crate) fn default_working_hours() -> Vec<LocalTimeRange> {
    let at = |h| NaiveTime::from_hms_opt(h, 0, 0).unwrap_or(NaiveTime::MIN);
    vec![
        LocalTimeRange::new(at(8), at(12)),
        LocalTimeRange::new(at(13), at(17)),
    ]
}

impl WorkWeek {
    /// Every day deferring to the next level.
    pub fn new() -> Self {
        Self::default()
    }

    /// Monday to Friday, 08:00-12:00 and 13:00-17:00.
    pub fn standard() -> Self {
        let mut week = Self::new();
        for day in ALL_WEEKDAYS {
            let working = !matches!(day, Weekday::Sat | Weekday::Sun);
            week.set_working_day(day, working);
            if working {
                week.set_hours(day, default_working_hours());
            }
        }
        week
    }

    pub fn scoped(start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            date_range: Some(LocalDateRange::new(start, end)),
            ..Self::default()
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn day_type(&self, day: Weekday) -> DayType {
        self.day_types[index(day)]
    }

    pub fn set_day_type(&mut self, day: Weekday, day_type: DayType) {
        self.day_types[index(day)] = day_type;
    }

    pub fn set_working_day(&mut self, day: Weekday, working: bool) {
        let day_type = if working {
            DayType::Working
        } else {
            DayType::NonWorking
        };
        self.set_day_type(day, day_type);
    }

    pub fn hours(&self, day: Weekday) -> &[LocalTimeRange] {
        &self.hours[index(day)]
    }

    pub fn set_hours(&mut self, day: Weekday, hours: impl IntoIterator<Item = LocalTimeRange>) {
        let slot = &mut self.hours[index(day)];
        *slot = hours.into_iter().collect();
        slot.sort();
    }

    pub fn add_hours(&mut self, day: Weekday, range: LocalTimeRange) {
        let slot = &mut self.hours[index(day)];
        slot.push(range);
        slot.sort();
    }

    /// Hours that apply on `day`, or `None` when the day type is `Default`.
    ///
    /// A non-working day resolves to no hours even if some are stored.
    pub fn resolved_hours(&self, day: Weekday) -> Option<&[LocalTimeRange]> {
        match self.day_type(day) {
            DayType::Default => None,
            DayType::NonWorking => Some(&[]),
            DayType::Working => Some(self.hours(day)),
        }
    }

    pub fn covers(&self, date: NaiveDate) -> bool {
        self.date_range
            .is_some_and(|range| range.contains_inclusive(&date))
    }

    pub fn start_date(&self) -> Option<NaiveDate> {
        self.date_range.and_then(|range| range.start)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_week_shape() {
        let week = WorkWeek::standard();
        assert_eq!(week.day_type(Weekday::Mon), DayType::Working);
        assert_eq!(week.day_type(Weekday::Sun), DayType::NonWorking);
        assert_eq!(week.hours(Weekday::Fri).len(), 2);
        assert_eq!(week.resolved_hours(Weekday::Sat), Some(&[][..]));
    }

    #[test]
    fn default_days_do_not_resolve() {
        let week = WorkWeek::new();
        assert_eq!(week.resolved_hours(Weekday::Wed), None);
    }

    #[test]
    fn scoped_week_covers_its_range_inclusively() {
        let start = NaiveDate::from_ymd_opt(2024, 8, 1).unwrap();
        let end = NaiveDate::from_ymd_opt(2024, 8, 31).unwrap();
        let week = WorkWeek::scoped(start, end);
        assert!(week.covers(start));
        assert!(week.covers(end));
        assert!(!week.covers(end.succ_opt().unwrap()));
        assert!(!WorkWeek::standard().covers(start));
    }
}
