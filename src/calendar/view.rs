use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime, Weekday};

use crate::calendar::week::DayType;
use crate::calendar::{Calendar, CalendarContainer};
use crate::duration::TimeUnitDefaults;
use crate::time_range::{LocalTimeRange, time_from_millis};

/// Weekday order used when a manually scheduled boundary day has no working time.
const OVERLAY_SEARCH_ORDER: [Weekday; 7] = [
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
    Weekday::Sun,
    Weekday::Mon,
];

#[derive(Debug, Clone)]
pub enum CalendarVariant<'a> {
    Standard,
    /// Working time common to the primary calendar and this one.
    Combined(&'a Calendar),
    /// Boundary days stretched to an assignment's clock start and finish.
    ManuallyScheduled {
        inner: Box<CalendarView<'a>>,
        start: NaiveDateTime,
        finish: NaiveDateTime,
    },
}

/// Read-only handle answering working-time queries for one calendar.
#[derive(Debug, Clone)]
pub struct CalendarView<'a> {
    container: &'a CalendarContainer,
    calendar: &'a Calendar,
    variant: CalendarVariant<'a>,
}

impl<'a> CalendarView<'a> {
    pub fn new(container: &'a CalendarContainer, calendar: &'a Calendar) -> Self {
        Self {
            container,
            calendar,
            variant: CalendarVariant::Standard,
        }
    }

    pub fn combined(
        container: &'a CalendarContainer,
        calendar: &'a Calendar,
        other: &'a Calendar,
    ) -> Self {
        Self {
            container,
            calendar,
            variant: CalendarVariant::Combined(other),
        }
    }

    pub fn manually_scheduled(
        inner: CalendarView<'a>,
        start: NaiveDateTime,
        finish: NaiveDateTime,
    ) -> Self {
        Self {
            container: inner.container,
            calendar: inner.calendar,
            variant: CalendarVariant::ManuallyScheduled {
                inner: Box::new(inner),
                start,
                finish,
            },
        }
    }

    pub fn calendar(&self) -> &'a Calendar {
        self.calendar
    }

    pub fn variant(&self) -> &CalendarVariant<'a> {
        &self.variant
    }

    fn parent_of(&self, calendar: &Calendar) -> Option<&'a Calendar> {
        calendar.parent().and_then(|id| self.container.get(id))
    }

    /// Working hours on `date`, sorted by start.
    pub fn ranges(&self, date: NaiveDate) -> Vec<LocalTimeRange> {
        match &self.variant {
            CalendarVariant::Standard => self.calendar_ranges(self.calendar, date),
            CalendarVariant::Combined(other) => intersect(
                &self.calendar_ranges(self.calendar, date),
                &self.calendar_ranges(other, date),
            ),
            CalendarVariant::ManuallyScheduled {
                inner,
                start,
                finish,
            } => self.overlay_ranges(inner, *start, *finish, date),
        }
    }

    /// Own exception, then scoped week, then base week, then the parent.
    fn calendar_ranges(&self, calendar: &Calendar, date: NaiveDate) -> Vec<LocalTimeRange> {
        if let Some(exception) = calendar.exception_for(date) {
            tracing::trace!(calendar = %calendar.id(), %date, "resolved from exception");
            return exception.hours().to_vec();
        }

        let day = date.weekday();
        let scoped = calendar
            .work_week_for(date)
            .and_then(|week| week.resolved_hours(day));
        if let Some(hours) = scoped.or_else(|| calendar.week().resolved_hours(day)) {
            return hours.to_vec();
        }

        match self.parent_of(calendar) {
            Some(parent) => self.calendar_ranges(parent, date),
            None => Vec::new(),
        }
    }

    fn overlay_ranges(
        &self,
        inner: &CalendarView<'a>,
        start: NaiveDateTime,
        finish: NaiveDateTime,
        date: NaiveDate,
    ) -> Vec<LocalTimeRange> {
        let mut ranges = inner.ranges(date);
        let is_start = date == start.date();
        let is_finish = date == finish.date();
        if !is_start && !is_finish {
            return ranges;
        }

        if ranges.is_empty() {
            ranges = OVERLAY_SEARCH_ORDER
                .into_iter()
                .find(|day| inner.day_type(*day) == DayType::Working)
                .map(|day| inner.hours(day))
                .unwrap_or_default();
        }
        let bounded: Vec<(NaiveTime, NaiveTime)> =
            ranges.iter().filter_map(LocalTimeRange::bounds).collect();
        let (Some(first), Some(last)) = (bounded.first().copied(), bounded.last().copied()) else {
            return ranges;
        };

        let mut ranges = bounded;
        if is_start {
            let start_time = start.time();
            if start_time < first.0 {
                ranges[0] = (start_time, first.1);
            } else if last.1 != NaiveTime::MIN && start_time > last.1 {
                ranges = vec![(start_time, NaiveTime::MIN)];
            }
        }

        if is_finish {
            let finish_time = finish.time();
            let first = ranges[0];
            let last_index = ranges.len() - 1;
            let last = ranges[last_index];
            if finish_time < first.0 {
                ranges = vec![(NaiveTime::MIN, finish_time)];
            } else if last.1 != NaiveTime::MIN && finish_time > last.1 {
                ranges[last_index] = (last.0, finish_time);
            }
        }

        ranges
            .into_iter()
            .map(|(start, end)| LocalTimeRange::new(start, end))
            .collect()
    }

    pub fn is_working_date(&self, date: NaiveDate) -> bool {
        !self.ranges(date).is_empty()
    }

    /// Base-week day type, resolving `Default` through the parent chain.
    ///
    /// A root calendar treats a `Default` weekend as non-working and any other day as working.
    pub fn day_type(&self, day: Weekday) -> DayType {
        let mut calendar = self.calendar;
        loop {
            match calendar.week().day_type(day) {
                DayType::Default => match self.parent_of(calendar) {
                    Some(parent) => calendar = parent,
                    None if matches!(day, Weekday::Sat | Weekday::Sun) => {
                        return DayType::NonWorking;
                    }
                    None => return DayType::Working,
                },
                resolved => return resolved,
            }
        }
    }

    pub fn is_working_day(&self, day: Weekday) -> bool {
        self.day_type(day) == DayType::Working
    }

    /// Base-week hours for a weekday, deferring to the parent for `Default` days.
    pub fn hours(&self, day: Weekday) -> Vec<LocalTimeRange> {
        let mut calendar = self.calendar;
        loop {
            if let Some(hours) = calendar.week().resolved_hours(day) {
                return hours.to_vec();
            }
            match self.parent_of(calendar) {
                Some(parent) => calendar = parent,
                None => return Vec::new(),
            }
        }
    }

    pub fn start_time(&self, date: NaiveDate) -> Option<NaiveTime> {
        self.ranges(date).first().and_then(|range| range.start)
    }

    /// End of the last range; 00:00 stands for the end of the day.
    pub fn finish_time(&self, date: NaiveDate) -> Option<NaiveTime> {
        self.ranges(date).last().and_then(|range| range.end)
    }

    fn inherited(&self, pick: impl Fn(&Calendar) -> Option<u32>) -> Option<u32> {
        let mut current = Some(self.calendar);
        while let Some(calendar) = current {
            if let Some(value) = pick(calendar) {
                return Some(value);
            }
            current = self.parent_of(calendar);
        }
        None
    }
}

impl TimeUnitDefaults for CalendarView<'_> {
    fn minutes_per_day(&self) -> u32 {
        self.inherited(Calendar::calendar_minutes_per_day)
            .unwrap_or_else(|| self.container.config().minutes_per_day())
    }

    fn minutes_per_week(&self) -> u32 {
        self.inherited(Calendar::calendar_minutes_per_week)
            .unwrap_or_else(|| self.container.config().minutes_per_week())
    }

    fn minutes_per_month(&self) -> u32 {
        self.inherited(Calendar::calendar_minutes_per_month)
            .unwrap_or_else(|| self.container.config().minutes_per_month())
    }

    fn minutes_per_year(&self) -> u32 {
        self.inherited(Calendar::calendar_minutes_per_year)
            .unwrap_or_else(|| self.container.config().minutes_per_year())
    }

    fn days_per_month(&self) -> u32 {
        self.container.config().days_per_month()
    }
}

fn intersect(a: &[LocalTimeRange], b: &[LocalTimeRange]) -> Vec<LocalTimeRange> {
    let mut result = Vec::new();
    for (a_start, a_end) in a.iter().filter_map(LocalTimeRange::millis) {
        for (b_start, b_end) in b.iter().filter_map(LocalTimeRange::millis) {
            let start = a_start.max(b_start);
            let end = a_end.min(b_end);
            if start < end {
                result.push(LocalTimeRange::new(
                    time_from_millis(start),
                    time_from_millis(end),
                ));
            }
        }
    }
    result.sort();
    result
}

/// Milliseconds of `ranges` falling inside `[from, to)` of the same day.
pub(crate) fn overlap_millis(ranges: &[LocalTimeRange], from: i64, to: i64) -> i64 {
    ranges
        .iter()
        .filter_map(LocalTimeRange::millis)
        .map(|(start, end)| (end.min(to) - start.max(from)).max(0))
        .sum()
}
