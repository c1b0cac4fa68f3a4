pub mod container;
pub mod exception;
pub mod view;
pub mod week;
pub mod work;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::cell::OnceCell;
use std::collections::BTreeMap;
use std::fmt;

use crate::error::CalendarResult;
use crate::recurrence::RecurrenceType;

pub use container::CalendarContainer;
pub use exception::CalendarException;
pub use view::{CalendarVariant, CalendarView};
pub use week::{DayType, WorkWeek};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CalendarId(pub u32);

impl fmt::Display for CalendarId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Recurring rules are laid down in this order; later entries win on shared dates.
const RECURRENCE_PRIORITY: [RecurrenceType; 4] = [
    RecurrenceType::Weekly,
    RecurrenceType::Monthly,
    RecurrenceType::Yearly,
    RecurrenceType::Daily,
];

/// A working-time calendar.
///
/// The parent link is an ID into the owning [`CalendarContainer`], which is the
/// only place it can change so the chain stays acyclic.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Calendar {
    id: CalendarId,
    pub name: String,
    parent: Option<CalendarId>,
    week: WorkWeek,
    work_weeks: Vec<WorkWeek>,
    exceptions: Vec<CalendarException>,
    minutes_per_day: Option<u32>,
    minutes_per_week: Option<u32>,
    minutes_per_month: Option<u32>,
    minutes_per_year: Option<u32>,
    #[serde(skip)]
    expanded: OnceCell<BTreeMap<NaiveDate, CalendarException>>,
}

impl Calendar {
    pub fn new(id: CalendarId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            parent: None,
            week: WorkWeek::new(),
            work_weeks: Vec::new(),
            exceptions: Vec::new(),
            minutes_per_day: None,
            minutes_per_week: None,
            minutes_per_month: None,
            minutes_per_year: None,
            expanded: OnceCell::new(),
        }
    }

    /// Monday to Friday, 08:00-12:00 and 13:00-17:00.
    pub fn standard(id: CalendarId, name: impl Into<String>) -> Self {
        Self {
            week: WorkWeek::standard(),
            ..Self::new(id, name)
        }
    }

    /// A calendar whose every day defers to `parent`.
    ///
    /// Attach it with [`CalendarContainer::add`], which validates the link.
    pub fn derived(id: CalendarId, name: impl Into<String>, parent: CalendarId) -> Self {
        Self {
            parent: Some(parent),
            ..Self::new(id, name)
        }
    }

    pub fn id(&self) -> CalendarId {
        self.id
    }

    pub fn parent(&self) -> Option<CalendarId> {
        self.parent
    }

    pub fn is_derived(&self) -> bool {
        self.parent.is_some()
    }

    pub(crate) fn set_parent_unchecked(&mut self, parent: Option<CalendarId>) {
        self.parent = parent;
    }

    pub(crate) fn set_id(&mut self, id: CalendarId) {
        self.id = id;
    }

    pub fn week(&self) -> &WorkWeek {
        &self.week
    }

    pub fn week_mut(&mut self) -> &mut WorkWeek {
        &mut self.week
    }

    pub fn work_weeks(&self) -> &[WorkWeek] {
        &self.work_weeks
    }

    /// Adds a secondary week, keeping the list ordered by start date.
    ///
    /// Weeks without a date range can never match a date and are dropped.
    pub fn add_work_week(&mut self, week: WorkWeek) {
        if week.date_range.is_none() {
            tracing::warn!(calendar = %self.id, "ignoring secondary week without a date range");
            return;
        }
        self.work_weeks.push(week);
        self.work_weeks.sort_by_key(WorkWeek::start_date);
    }

    pub fn remove_work_week(&mut self, index: usize) -> Option<WorkWeek> {
        (index < self.work_weeks.len()).then(|| self.work_weeks.remove(index))
    }

    pub fn clear_work_weeks(&mut self) {
        self.work_weeks.clear();
    }

    pub fn exceptions(&self) -> &[CalendarException] {
        &self.exceptions
    }

    pub fn add_exception(&mut self, exception: CalendarException) -> &mut CalendarException {
        self.expanded = OnceCell::new();
        self.exceptions.push(exception);
        let last = self.exceptions.len() - 1;
        &mut self.exceptions[last]
    }

    pub fn remove_exception(&mut self, index: usize) -> Option<CalendarException> {
        if index >= self.exceptions.len() {
            return None;
        }
        self.expanded = OnceCell::new();
        Some(self.exceptions.remove(index))
    }

    pub fn clear_exceptions(&mut self) {
        self.expanded = OnceCell::new();
        self.exceptions.clear();
    }

    /// Exceptions with recurring rules expanded to single dates, keyed by start date.
    ///
    /// Exceptions that expand to a single entry override any recurring entry on the
    /// same date.
    pub fn expanded_exceptions(&self) -> &BTreeMap<NaiveDate, CalendarException> {
        self.expanded.get_or_init(|| self.populate_expanded_exceptions())
    }

    fn populate_expanded_exceptions(&self) -> BTreeMap<NaiveDate, CalendarException> {
        let mut single = Vec::new();
        let mut recurring: Vec<(RecurrenceType, Vec<CalendarException>)> = Vec::new();
        for exception in &self.exceptions {
            let mut expanded = exception.expanded_exceptions();
            match (expanded.len(), exception.recurrence()) {
                (1, _) | (_, None) => single.append(&mut expanded),
                (_, Some(data)) => recurring.push((data.recurrence_type(), expanded)),
            }
        }

        let mut map = BTreeMap::new();
        for priority in RECURRENCE_PRIORITY {
            for (_, expanded) in recurring.iter().filter(|(kind, _)| *kind == priority) {
                for exception in expanded {
                    map.insert(exception.from_date(), exception.clone());
                }
            }
        }
        for exception in single {
            map.insert(exception.from_date(), exception);
        }
        map
    }

    /// This calendar's own exception covering `date`. Parents are not consulted.
    pub fn exception_for(&self, date: NaiveDate) -> Option<&CalendarException> {
        self.expanded_exceptions()
            .range(..=date)
            .rev()
            .map(|(_, exception)| exception)
            .find(|exception| exception.contains(date))
    }

    pub fn work_week_for(&self, date: NaiveDate) -> Option<&WorkWeek> {
        self.work_weeks.iter().find(|week| week.covers(date))
    }

    pub fn calendar_minutes_per_day(&self) -> Option<u32> {
        self.minutes_per_day
    }

    pub fn calendar_minutes_per_week(&self) -> Option<u32> {
        self.minutes_per_week
    }

    pub fn calendar_minutes_per_month(&self) -> Option<u32> {
        self.minutes_per_month
    }

    pub fn calendar_minutes_per_year(&self) -> Option<u32> {
        self.minutes_per_year
    }

    pub fn set_calendar_minutes_per_day(&mut self, minutes: Option<u32>) {
        self.minutes_per_day = minutes;
    }

    pub fn set_calendar_minutes_per_week(&mut self, minutes: Option<u32>) {
        self.minutes_per_week = minutes;
    }

    pub fn set_calendar_minutes_per_month(&mut self, minutes: Option<u32>) {
        self.minutes_per_month = minutes;
    }

    pub fn set_calendar_minutes_per_year(&mut self, minutes: Option<u32>) {
        self.minutes_per_year = minutes;
    }

    pub fn to_json(&self) -> CalendarResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> CalendarResult<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recurrence::RecurringData;
    use crate::time_range::LocalTimeRange;
    use chrono::{NaiveTime, Weekday};

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn t(h: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, 0, 0).unwrap()
    }

    #[test]
    fn single_exception_overrides_recurring_on_same_date() {
        let mut calendar = Calendar::standard(CalendarId(1), "Standard");
        calendar.add_exception(
            CalendarException::recurring(
                RecurringData::weekly(d(2024, 1, 1), &[Weekday::Mon]).with_occurrences(4),
            )
            .with_hours([LocalTimeRange::new(t(9), t(10))]),
        );
        calendar.add_exception(CalendarException::single(d(2024, 1, 8)));

        assert!(!calendar.exception_for(d(2024, 1, 8)).unwrap().is_working());
        assert!(calendar.exception_for(d(2024, 1, 15)).unwrap().is_working());
        assert!(calendar.exception_for(d(2024, 1, 9)).is_none());
    }

    #[test]
    fn long_exception_found_behind_later_single_dates() {
        let mut calendar = Calendar::standard(CalendarId(1), "Standard");
        calendar.add_exception(CalendarException::new(d(2024, 8, 1), d(2024, 8, 20)));
        calendar.add_exception(
            CalendarException::single(d(2024, 8, 5)).with_hours([LocalTimeRange::new(t(8), t(9))]),
        );
        assert!(calendar.exception_for(d(2024, 8, 12)).is_some());
    }

    #[test]
    fn mutation_resets_expanded_index() {
        let mut calendar = Calendar::standard(CalendarId(1), "Standard");
        assert!(calendar.exception_for(d(2024, 7, 4)).is_none());
        calendar.add_exception(CalendarException::single(d(2024, 7, 4)));
        assert!(calendar.exception_for(d(2024, 7, 4)).is_some());
        calendar.clear_exceptions();
        assert!(calendar.exception_for(d(2024, 7, 4)).is_none());
    }

    #[test]
    fn json_round_trip_keeps_structure() {
        let mut calendar = Calendar::standard(CalendarId(3), "Night shift");
        calendar.add_exception(CalendarException::single(d(2024, 12, 25)).with_name("Christmas"));
        calendar.add_work_week(WorkWeek::scoped(d(2024, 8, 1), d(2024, 8, 31)));
        calendar.set_calendar_minutes_per_day(Some(420));

        let json = calendar.to_json().unwrap();
        let restored = Calendar::from_json(&json).unwrap();
        assert_eq!(restored.id(), CalendarId(3));
        assert_eq!(restored.exceptions(), calendar.exceptions());
        assert_eq!(restored.work_weeks(), calendar.work_weeks());
        assert_eq!(restored.calendar_minutes_per_day(), Some(420));
    }

    #[test]
    fn secondary_weeks_without_range_are_ignored() {
        let mut calendar = Calendar::standard(CalendarId(1), "Standard");
        calendar.add_work_week(WorkWeek::new());
        assert!(calendar.work_weeks().is_empty());
    }
}
