//! Working-time arithmetic over a [`CalendarView`].

use chrono::{Days, NaiveDate, NaiveDateTime, Timelike};

use crate::calendar::view::{CalendarView, overlap_millis};
use crate::duration::{Duration, TimeUnit};
use crate::time_range::{LocalTimeRange, MILLIS_PER_DAY, MILLIS_PER_MINUTE, time_millis};

/// Upper bound on consecutive non-working days skipped while searching for work.
pub const MAX_NONWORKING_DAYS: u32 = 1000;

fn at(date: NaiveDate, millis: i64) -> NaiveDateTime {
    date.and_time(chrono::NaiveTime::MIN) + chrono::Duration::milliseconds(millis)
}

fn truncate_to_seconds(date: NaiveDateTime) -> NaiveDateTime {
    date.with_nanosecond(0).unwrap_or(date)
}

fn first_start_millis(ranges: &[LocalTimeRange]) -> Option<i64> {
    ranges.iter().find_map(LocalTimeRange::millis).map(|(start, _)| start)
}

fn last_end_millis(ranges: &[LocalTimeRange]) -> Option<i64> {
    ranges.iter().rev().find_map(LocalTimeRange::millis).map(|(_, end)| end)
}

impl CalendarView<'_> {
    /// Converts milliseconds of working time into `unit` using this calendar's constants.
    pub fn convert_format(&self, millis: i64, unit: TimeUnit) -> Duration {
        if matches!(unit, TimeUnit::Percent | TimeUnit::ElapsedPercent) {
            tracing::warn!(%unit, "percent is not a unit of working time");
            return Duration::zero(unit);
        }
        Duration::minutes(millis as f64 / MILLIS_PER_MINUTE as f64).convert_units(unit, self)
    }

    /// Working time on a single date.
    pub fn work_on(&self, date: NaiveDate, unit: TimeUnit) -> Duration {
        let millis = overlap_millis(&self.ranges(date), 0, MILLIS_PER_DAY);
        self.convert_format(millis, unit)
    }

    fn work_millis(&self, start: NaiveDateTime, end: NaiveDateTime) -> i64 {
        let (start, end, sign) = if start > end {
            (end, start, -1)
        } else {
            (start, end, 1)
        };

        let total = if start.date() == end.date() {
            overlap_millis(
                &self.ranges(start.date()),
                time_millis(start.time()),
                time_millis(end.time()),
            )
        } else {
            let last_day = end.date();
            let mut total = 0;

            let mut current = start.date();
            while !self.is_working_date(current) && current < last_day {
                current = current.succ_opt().unwrap_or(last_day);
            }

            if current < last_day {
                let from = if current == start.date() {
                    time_millis(start.time())
                } else {
                    0
                };
                total += overlap_millis(&self.ranges(current), from, MILLIS_PER_DAY);

                for date in current.iter_days().skip(1).take_while(|d| *d < last_day) {
                    total += overlap_millis(&self.ranges(date), 0, MILLIS_PER_DAY);
                }
            }

            total + overlap_millis(&self.ranges(last_day), 0, time_millis(end.time()))
        };

        sign * total
    }

    /// Working time between two instants. Swapped arguments give a negative result.
    pub fn work(&self, start: NaiveDateTime, end: NaiveDateTime, unit: TimeUnit) -> Duration {
        self.convert_format(self.work_millis(start, end), unit)
    }

    /// Working time between two optional instants; zero when either is missing.
    pub fn variance(
        &self,
        start: Option<NaiveDateTime>,
        end: Option<NaiveDateTime>,
        unit: TimeUnit,
    ) -> Duration {
        match (start, end) {
            (Some(start), Some(end)) => self.work(start, end, unit),
            _ => Duration::zero(unit),
        }
    }

    /// Number of working dates from `start` to `end`, both inclusive.
    pub fn duration_in_days(&self, start: NaiveDateTime, end: NaiveDateTime) -> Duration {
        let count = start
            .date()
            .iter_days()
            .take_while(|date| *date <= end.date())
            .filter(|date| self.is_working_date(*date))
            .count();
        Duration::days(count as f64)
    }

    /// The instant reached by adding `duration` of working time to `date`.
    ///
    /// Elapsed units are added as clock time. Results are truncated to whole seconds.
    pub fn date(&self, date: NaiveDateTime, duration: Duration) -> NaiveDateTime {
        if duration.unit.is_elapsed() {
            let minutes = duration.convert_units(TimeUnit::ElapsedMinutes, self).amount;
            return date + chrono::Duration::minutes(minutes as i64);
        }

        let minutes = duration.convert_units(TimeUnit::Minutes, self).amount;
        let millis = ((minutes * 100.0).round() / 100.0 * MILLIS_PER_MINUTE as f64).round() as i64;
        match millis {
            0 => date,
            m if m > 0 => truncate_to_seconds(self.date_forward(date, m)),
            m => truncate_to_seconds(self.date_backward(date, -m)),
        }
    }

    fn date_forward(&self, start: NaiveDateTime, mut remaining: i64) -> NaiveDateTime {
        let mut date = start.date();
        let mut from = time_millis(start.time());

        loop {
            let ranges = self.ranges(date);
            let working = overlap_millis(&ranges, from, MILLIS_PER_DAY);

            if remaining == working {
                return at(date, last_end_millis(&ranges).unwrap_or(from));
            }

            if remaining < working {
                let mut first = true;
                for (range_start, range_end) in ranges.iter().filter_map(LocalTimeRange::millis) {
                    if first && range_end < from {
                        continue;
                    }
                    let range_start = if first { range_start.max(from) } else { range_start };
                    first = false;

                    let length = (range_end - range_start).max(0);
                    if remaining > length {
                        remaining -= length;
                    } else {
                        return at(date, range_start + remaining);
                    }
                }
                return at(date, from);
            }

            remaining -= working;
            let Some(next) = self.next_working_date(date) else {
                tracing::warn!(%date, "no working time found within the search limit");
                return at(date + Days::new(1), 0);
            };
            date = next;
            from = first_start_millis(&self.ranges(date)).unwrap_or(0);
        }
    }

    fn date_backward(&self, end: NaiveDateTime, mut remaining: i64) -> NaiveDateTime {
        let (mut date, mut to) = if time_millis(end.time()) == 0 {
            (end.date() - Days::new(1), MILLIS_PER_DAY)
        } else {
            (end.date(), time_millis(end.time()))
        };

        loop {
            let ranges = self.ranges(date);
            let working = overlap_millis(&ranges, 0, to);

            if remaining == working {
                return at(date, first_start_millis(&ranges).unwrap_or(to));
            }

            if remaining < working {
                let mut last = true;
                for (range_start, range_end) in
                    ranges.iter().rev().filter_map(LocalTimeRange::millis)
                {
                    if to < range_start {
                        continue;
                    }
                    let range_end = if last { range_end.min(to) } else { range_end };
                    last = false;

                    let length = (range_end - range_start).max(0);
                    if remaining > length {
                        remaining -= length;
                    } else {
                        return at(date, range_end - remaining);
                    }
                }
                return at(date, to);
            }

            remaining -= working;
            let Some(previous) = self.previous_working_date(date) else {
                tracing::warn!(%date, "no working time found within the search limit");
                return at(date - Days::new(1), 0);
            };
            date = previous;
            to = last_end_millis(&self.ranges(date)).unwrap_or(MILLIS_PER_DAY);
        }
    }

    fn next_working_date(&self, date: NaiveDate) -> Option<NaiveDate> {
        std::iter::successors(date.succ_opt(), |d| d.succ_opt())
            .take(MAX_NONWORKING_DAYS as usize)
            .find(|candidate| self.is_working_date(*candidate))
    }

    fn previous_working_date(&self, date: NaiveDate) -> Option<NaiveDate> {
        std::iter::successors(date.pred_opt(), |d| d.pred_opt())
            .take(MAX_NONWORKING_DAYS as usize)
            .find(|candidate| self.is_working_date(*candidate))
    }

    /// The first working instant at or after `date`.
    ///
    /// Returns `date` unchanged when no working day exists within the search limit.
    pub fn next_work_start(&self, date: NaiveDateTime) -> NaiveDateTime {
        let time = time_millis(date.time());
        let today = self.ranges(date.date());
        if let Some((start, _)) = today
            .iter()
            .filter_map(LocalTimeRange::millis)
            .find(|(_, end)| time < *end)
        {
            return at(date.date(), start.max(time));
        }

        match self.next_working_date(date.date()) {
            Some(next) => at(next, first_start_millis(&self.ranges(next)).unwrap_or(0)),
            None => {
                tracing::warn!(%date, "no working day found within the search limit");
                date
            }
        }
    }

    /// The end of the last working range finishing at or before `date`.
    ///
    /// Returns `date` unchanged when no working day exists within the search limit.
    pub fn previous_work_finish(&self, date: NaiveDateTime) -> NaiveDateTime {
        let time = time_millis(date.time());
        let today = self.ranges(date.date());
        if let Some((_, end)) = today
            .iter()
            .rev()
            .filter_map(LocalTimeRange::millis)
            .find(|(_, end)| time >= *end)
        {
            return at(date.date(), end);
        }

        match self.previous_working_date(date.date()) {
            Some(previous) => at(
                previous,
                last_end_millis(&self.ranges(previous)).unwrap_or(MILLIS_PER_DAY),
            ),
            None => {
                tracing::warn!(%date, "no working day found within the search limit");
                date
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::{Calendar, CalendarContainer, CalendarId};
    use crate::config::ProjectConfig;
    use chrono::NaiveTime;

    fn dt(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_time(NaiveTime::from_hms_opt(h, min, 0).unwrap())
    }

    fn standard() -> CalendarContainer {
        let mut calendars = CalendarContainer::new(ProjectConfig::default());
        calendars
            .add(Calendar::standard(CalendarId(1), "Standard"))
            .unwrap();
        calendars
    }

    #[test]
    fn partial_day_forward_lands_inside_range() {
        let calendars = standard();
        let view = calendars.view(CalendarId(1)).unwrap();
        let result = view.date(dt(2024, 8, 5, 10, 0), Duration::hours(3.0));
        assert_eq!(result, dt(2024, 8, 5, 14, 0));
    }

    #[test]
    fn exact_day_finishes_at_end_of_last_range() {
        let calendars = standard();
        let view = calendars.view(CalendarId(1)).unwrap();
        let result = view.date(dt(2024, 8, 5, 8, 0), Duration::days(1.0));
        assert_eq!(result, dt(2024, 8, 5, 17, 0));
    }

    #[test]
    fn backward_from_midnight_uses_previous_day() {
        let calendars = standard();
        let view = calendars.view(CalendarId(1)).unwrap();
        let result = view.date(dt(2024, 8, 6, 0, 0), Duration::hours(-2.0));
        assert_eq!(result, dt(2024, 8, 5, 15, 0));
    }

    #[test]
    fn sub_second_results_are_truncated() {
        let calendars = standard();
        let view = calendars.view(CalendarId(1)).unwrap();
        let result = view.date(dt(2024, 8, 5, 8, 0), Duration::minutes(0.333));
        assert_eq!(result, dt(2024, 8, 5, 8, 0) + chrono::Duration::seconds(19));
    }

    #[test]
    fn empty_calendar_gives_up_after_search_limit() {
        let mut calendars = CalendarContainer::new(ProjectConfig::default());
        let mut closed = Calendar::new(CalendarId(1), "Closed");
        for day in crate::calendar::week::ALL_WEEKDAYS {
            closed.week_mut().set_working_day(day, false);
        }
        calendars.add(closed).unwrap();
        let view = calendars.view(CalendarId(1)).unwrap();
        let start = dt(2024, 8, 5, 9, 0);
        assert_eq!(view.next_work_start(start), start);
        assert_eq!(view.previous_work_finish(start), start);
        assert_eq!(view.date(start, Duration::hours(1.0)), dt(2024, 8, 6, 0, 0));
    }
}
