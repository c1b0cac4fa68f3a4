//! Recurrence rules for calendar exceptions.

use chrono::{Datelike, Days, Months, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};
use std::cell::OnceCell;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecurrenceType {
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

/// A rule generating concrete dates.
///
/// Monthly and yearly rules are either *relative* (`day_number` 1-4 selects the nth
/// `day_of_week` of the month, anything larger selects the last one) or *absolute*
/// (`day_number` is a day of the month, clamped to the month's length).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecurringData {
    recurrence_type: RecurrenceType,
    start_date: NaiveDate,
    finish_date: Option<NaiveDate>,
    occurrences: Option<u32>,
    use_end_date: bool,
    frequency: u32,
    relative: bool,
    days: Vec<Weekday>,
    day_number: Option<u32>,
    month_number: Option<u32>,
    #[serde(skip)]
    dates: OnceCell<Vec<NaiveDate>>,
}

impl PartialEq for RecurringData {
    fn eq(&self, other: &Self) -> bool {
        self.recurrence_type == other.recurrence_type
            && self.start_date == other.start_date
            && self.finish_date == other.finish_date
            && self.occurrences == other.occurrences
            && self.use_end_date == other.use_end_date
            && self.frequency == other.frequency
            && self.relative == other.relative
            && self.days == other.days
            && self.day_number == other.day_number
            && self.month_number == other.month_number
    }
}

impl RecurringData {
    pub fn new(recurrence_type: RecurrenceType, start_date: NaiveDate) -> Self {
        Self {
            recurrence_type,
            start_date,
            finish_date: None,
            occurrences: None,
            use_end_date: false,
            frequency: 1,
            relative: false,
            days: Vec::new(),
            day_number: None,
            month_number: None,
            dates: OnceCell::new(),
        }
    }

    pub fn daily(start_date: NaiveDate, frequency: u32) -> Self {
        Self::new(RecurrenceType::Daily, start_date).with_frequency(frequency)
    }

    pub fn weekly(start_date: NaiveDate, days: &[Weekday]) -> Self {
        let mut data = Self::new(RecurrenceType::Weekly, start_date);
        for day in days {
            data.set_weekly_day(*day, true);
        }
        data
    }

    /// The `day_number`th (1-4, or last when larger) `day_of_week` of every month.
    pub fn monthly_relative(start_date: NaiveDate, day_number: u32, day_of_week: Weekday) -> Self {
        let mut data = Self::new(RecurrenceType::Monthly, start_date);
        data.relative = true;
        data.day_number = Some(day_number);
        data.days = vec![day_of_week];
        data
    }

    pub fn monthly_absolute(start_date: NaiveDate, day_number: u32) -> Self {
        let mut data = Self::new(RecurrenceType::Monthly, start_date);
        data.day_number = Some(day_number);
        data
    }

    pub fn yearly_relative(
        start_date: NaiveDate,
        month_number: u32,
        day_number: u32,
        day_of_week: Weekday,
    ) -> Self {
        let mut data = Self::monthly_relative(start_date, day_number, day_of_week);
        data.recurrence_type = RecurrenceType::Yearly;
        data.month_number = Some(month_number);
        data
    }

    pub fn yearly_absolute(start_date: NaiveDate, month_number: u32, day_number: u32) -> Self {
        let mut data = Self::monthly_absolute(start_date, day_number);
        data.recurrence_type = RecurrenceType::Yearly;
        data.month_number = Some(month_number);
        data
    }

    pub fn with_frequency(mut self, frequency: u32) -> Self {
        self.set_frequency(frequency);
        self
    }

    pub fn with_occurrences(mut self, occurrences: u32) -> Self {
        self.set_occurrences(Some(occurrences));
        self
    }

    /// Bound the rule by a finish date instead of an occurrence count.
    pub fn until(mut self, finish_date: NaiveDate) -> Self {
        self.set_finish_date(Some(finish_date));
        self.set_use_end_date(true);
        self
    }

    pub fn recurrence_type(&self) -> RecurrenceType {
        self.recurrence_type
    }

    pub fn start_date(&self) -> NaiveDate {
        self.start_date
    }

    pub fn finish_date(&self) -> Option<NaiveDate> {
        self.finish_date
    }

    pub fn occurrences(&self) -> Option<u32> {
        self.occurrences
    }

    pub fn use_end_date(&self) -> bool {
        self.use_end_date
    }

    pub fn frequency(&self) -> u32 {
        self.frequency
    }

    pub fn relative(&self) -> bool {
        self.relative
    }

    pub fn day_number(&self) -> Option<u32> {
        self.day_number
    }

    pub fn month_number(&self) -> Option<u32> {
        self.month_number
    }

    pub fn weekly_day(&self, day: Weekday) -> bool {
        self.days.contains(&day)
    }

    pub fn day_of_week(&self) -> Option<Weekday> {
        self.days.first().copied()
    }

    pub fn set_recurrence_type(&mut self, recurrence_type: RecurrenceType) {
        self.recurrence_type = recurrence_type;
        self.clear_dates();
    }

    pub fn set_start_date(&mut self, start_date: NaiveDate) {
        self.start_date = start_date;
        self.clear_dates();
    }

    pub fn set_finish_date(&mut self, finish_date: Option<NaiveDate>) {
        self.finish_date = finish_date;
        self.clear_dates();
    }

    pub fn set_occurrences(&mut self, occurrences: Option<u32>) {
        self.occurrences = occurrences;
        self.clear_dates();
    }

    pub fn set_use_end_date(&mut self, use_end_date: bool) {
        self.use_end_date = use_end_date;
        self.clear_dates();
    }

    pub fn set_frequency(&mut self, frequency: u32) {
        self.frequency = frequency;
        self.clear_dates();
    }

    pub fn set_relative(&mut self, relative: bool) {
        self.relative = relative;
        self.clear_dates();
    }

    pub fn set_day_number(&mut self, day_number: Option<u32>) {
        self.day_number = day_number;
        self.clear_dates();
    }

    pub fn set_month_number(&mut self, month_number: Option<u32>) {
        self.month_number = month_number;
        self.clear_dates();
    }

    pub fn set_weekly_day(&mut self, day: Weekday, selected: bool) {
        self.days.retain(|d| *d != day);
        if selected {
            self.days.push(day);
        }
        self.clear_dates();
    }

    pub fn set_day_of_week(&mut self, day: Weekday) {
        self.days = vec![day];
        self.clear_dates();
    }

    fn clear_dates(&mut self) {
        self.dates = OnceCell::new();
    }

    /// Whether this rule expands to more than a single contiguous block of days.
    pub fn is_expandable(&self) -> bool {
        !(self.recurrence_type == RecurrenceType::Daily && self.effective_frequency() == 1)
    }

    /// The concrete dates, in ascending order. Computed once and reused until a setter runs.
    pub fn dates(&self) -> &[NaiveDate] {
        self.dates.get_or_init(|| self.populate_dates())
    }

    pub fn is_valid(&self) -> bool {
        !self.dates().is_empty()
    }

    pub fn calculated_first_date(&self) -> Option<NaiveDate> {
        self.dates().first().copied()
    }

    pub fn calculated_last_date(&self) -> Option<NaiveDate> {
        match self.finish_date {
            Some(finish) if self.use_end_date => Some(finish),
            _ => self.dates().last().copied(),
        }
    }

    fn effective_frequency(&self) -> u32 {
        self.frequency.max(1)
    }

    fn bound(&self) -> Bound {
        match self.finish_date {
            Some(finish) if self.use_end_date || self.occurrences.is_none() => Bound::Until(finish),
            _ => Bound::Count(self.occurrences.unwrap_or(1).max(1) as usize),
        }
    }

    fn populate_dates(&self) -> Vec<NaiveDate> {
        let frequency = self.effective_frequency();
        let bound = self.bound();
        let mut dates = Vec::new();
        match self.recurrence_type {
            RecurrenceType::Daily => self.daily_dates(frequency, bound, &mut dates),
            RecurrenceType::Weekly => self.weekly_dates(frequency, bound, &mut dates),
            RecurrenceType::Monthly if self.relative => {
                let first = first_of_month(self.start_date);
                self.relative_dates(first, frequency, bound, &mut dates);
            }
            RecurrenceType::Monthly => self.monthly_absolute_dates(frequency, bound, &mut dates),
            RecurrenceType::Yearly => {
                let Some(first) = self
                    .month_number
                    .and_then(|month| NaiveDate::from_ymd_opt(self.start_date.year(), month, 1))
                else {
                    tracing::warn!(
                        month = ?self.month_number,
                        "yearly recurrence without a valid month"
                    );
                    return dates;
                };
                if self.relative {
                    self.relative_dates(first, frequency * 12, bound, &mut dates);
                } else {
                    self.yearly_absolute_dates(first, frequency, bound, &mut dates);
                }
            }
        }
        dates
    }

    fn daily_dates(&self, frequency: u32, bound: Bound, dates: &mut Vec<NaiveDate>) {
        let mut date = Some(self.start_date);
        while let Some(current) = date.filter(|d| bound.more(*d, dates)) {
            dates.push(current);
            date = current.checked_add_days(Days::new(u64::from(frequency)));
        }
    }

    fn weekly_dates(&self, frequency: u32, bound: Bound, dates: &mut Vec<NaiveDate>) {
        if self.days.is_empty() {
            return;
        }

        // Walk whole weeks from the Sunday on or before the start date.
        let back = u64::from(self.start_date.weekday().num_days_from_sunday());
        let mut week = self.start_date.checked_sub_days(Days::new(back));
        while let Some(week_start) = week.filter(|d| bound.more(*d, dates)) {
            for date in week_start.iter_days().take(7) {
                if !self.weekly_day(date.weekday()) || date < self.start_date {
                    continue;
                }
                if !bound.more(date, dates) {
                    return;
                }
                dates.push(date);
            }
            week = week_start.checked_add_days(Days::new(7 * u64::from(frequency)));
        }
    }

    fn relative_dates(
        &self,
        first: NaiveDate,
        month_step: u32,
        bound: Bound,
        dates: &mut Vec<NaiveDate>,
    ) {
        let Some(day_of_week) = self.day_of_week() else {
            return;
        };
        let day_number = self.day_number.unwrap_or(1);

        let mut month = Some(first);
        while let Some(month_start) = month.filter(|d| bound.more(*d, dates)) {
            let date = if day_number > 4 {
                last_weekday_of_month(month_start, day_of_week)
            } else {
                nth_weekday_of_month(month_start, day_of_week, day_number.max(1))
            };
            if date >= self.start_date {
                if !bound.more(date, dates) {
                    return;
                }
                dates.push(date);
            }
            month = month_start.checked_add_months(Months::new(month_step));
        }
    }

    fn monthly_absolute_dates(&self, frequency: u32, bound: Bound, dates: &mut Vec<NaiveDate>) {
        let required = self.day_number.unwrap_or(1).max(1);
        let mut month = Some(first_of_month(self.start_date));
        if required < self.start_date.day() {
            month = month.and_then(|d| d.checked_add_months(Months::new(1)));
        }

        while let Some(month_start) = month.filter(|d| bound.more(*d, dates)) {
            let date = clamped_day(month_start, required);
            if !bound.more(date, dates) {
                return;
            }
            dates.push(date);
            month = month_start.checked_add_months(Months::new(frequency));
        }
    }

    fn yearly_absolute_dates(
        &self,
        first: NaiveDate,
        frequency: u32,
        bound: Bound,
        dates: &mut Vec<NaiveDate>,
    ) {
        let required = self.day_number.unwrap_or(1).max(1);
        let mut month = Some(first);
        while let Some(mut month_start) = month.filter(|d| bound.more(*d, dates)) {
            let mut date = clamped_day(month_start, required);
            if date < self.start_date {
                let Some(next) = month_start.checked_add_months(Months::new(12)) else {
                    return;
                };
                month_start = next;
                date = clamped_day(month_start, required);
            }
            if !bound.more(date, dates) {
                return;
            }
            dates.push(date);
            month = month_start.checked_add_months(Months::new(12 * frequency));
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Bound {
    Until(NaiveDate),
    Count(usize),
}

impl Bound {
    fn more(self, date: NaiveDate, dates: &[NaiveDate]) -> bool {
        match self {
            Bound::Until(finish) => date <= finish,
            Bound::Count(count) => dates.len() < count,
        }
    }
}

fn first_of_month(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

pub(crate) fn days_in_month(month_start: NaiveDate) -> u32 {
    month_start
        .checked_add_months(Months::new(1))
        .and_then(|next| next.pred_opt())
        .map(|last| last.day())
        .unwrap_or(28)
}

fn clamped_day(month_start: NaiveDate, day: u32) -> NaiveDate {
    let day = day.min(days_in_month(month_start));
    month_start.with_day(day).unwrap_or(month_start)
}

fn nth_weekday_of_month(month_start: NaiveDate, weekday: Weekday, n: u32) -> NaiveDate {
    let offset =
        (7 + weekday.num_days_from_sunday() - month_start.weekday().num_days_from_sunday()) % 7;
    month_start + chrono::Duration::days(i64::from(offset + 7 * (n - 1)))
}

fn last_weekday_of_month(month_start: NaiveDate, weekday: Weekday) -> NaiveDate {
    let last = clamped_day(month_start, 31);
    let offset = (7 + last.weekday().num_days_from_sunday() - weekday.num_days_from_sunday()) % 7;
    last - chrono::Duration::days(i64::from(offset))
}
