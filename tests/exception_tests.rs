use chrono::{Datelike, NaiveDate, NaiveTime, Weekday};
use schedule_calendar::{
    Calendar, CalendarContainer, CalendarException, CalendarId, LocalTimeRange, ProjectConfig,
    RecurringData, WorkWeek,
};

fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

fn t(h: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, 0, 0).unwrap()
}

fn morning() -> Vec<LocalTimeRange> {
    vec![LocalTimeRange::new(t(8), t(12))]
}

#[test]
fn weekly_rule_expands_to_each_matching_date() {
    let exception = CalendarException::recurring(
        RecurringData::weekly(d(2024, 1, 1), &[Weekday::Mon, Weekday::Wed]).until(d(2024, 1, 31)),
    )
    .with_hours(morning());

    let expanded = exception.expanded_exceptions();
    let dates: Vec<NaiveDate> = expanded.iter().map(CalendarException::from_date).collect();
    let expected: Vec<NaiveDate> = d(2024, 1, 1)
        .iter_days()
        .take_while(|date| *date <= d(2024, 1, 31))
        .filter(|date| matches!(date.weekday(), Weekday::Mon | Weekday::Wed))
        .collect();

    assert_eq!(dates, expected);
    assert_eq!(dates.len(), 10);
    for single in &expanded {
        assert_eq!(single.from_date(), single.to_date());
        assert_eq!(single.hours(), morning().as_slice());
        assert!(single.recurrence().is_none());
    }
}

#[test]
fn daily_rule_without_gaps_stays_whole() {
    let exception =
        CalendarException::recurring(RecurringData::daily(d(2024, 3, 4), 1).with_occurrences(5));
    let expanded = exception.expanded_exceptions();
    assert_eq!(expanded, vec![exception.clone()]);
    assert!(exception.contains(d(2024, 3, 8)));
    assert!(!exception.contains(d(2024, 3, 9)));
}

#[test]
fn recurring_holidays_apply_through_the_calendar() {
    let mut calendars = CalendarContainer::new(ProjectConfig::default());
    let mut calendar = Calendar::standard(CalendarId(1), "Standard");
    calendar.add_exception(
        CalendarException::recurring(
            RecurringData::monthly_relative(d(2024, 1, 1), 1, Weekday::Mon).with_occurrences(6),
        )
        .with_name("Maintenance Monday"),
    );
    calendar.add_exception(CalendarException::recurring(
        RecurringData::yearly_absolute(d(2024, 1, 1), 12, 25).with_occurrences(3),
    ));
    calendars.add(calendar).unwrap();

    let view = calendars.view(CalendarId(1)).unwrap();
    assert!(!view.is_working_date(d(2024, 2, 5)));
    assert!(view.is_working_date(d(2024, 2, 12)));
    assert!(!view.is_working_date(d(2025, 12, 25)));
    assert!(view.is_working_date(d(2027, 12, 27)));
}

#[test]
fn later_rules_win_on_shared_dates() {
    let mut calendar = Calendar::standard(CalendarId(1), "Standard");
    calendar.add_exception(
        CalendarException::recurring(RecurringData::daily(d(2024, 5, 1), 2).with_occurrences(5))
            .with_hours(morning()),
    );
    calendar.add_exception(CalendarException::recurring(
        RecurringData::weekly(d(2024, 5, 1), &[Weekday::Fri]).with_occurrences(2),
    ));

    // 2024-05-03 is produced by both rules; the daily rule is applied last.
    let shared = calendar.exception_for(d(2024, 5, 3)).unwrap();
    assert!(shared.is_working());
    let weekly_only = calendar.exception_for(d(2024, 5, 10)).unwrap();
    assert!(!weekly_only.is_working());
}

#[test]
fn flatten_keeps_child_overrides() {
    let mut calendars = CalendarContainer::new(ProjectConfig::default());
    let mut base = Calendar::standard(CalendarId(1), "Standard");
    base.add_exception(CalendarException::new(d(2024, 12, 24), d(2024, 12, 26)));
    calendars.add(base).unwrap();

    let mut child = Calendar::derived(CalendarId(2), "Support", CalendarId(1));
    child.add_exception(CalendarException::single(d(2024, 12, 24)).with_hours(morning()));
    calendars.add(child).unwrap();

    let flat = calendars.flatten(CalendarId(2)).unwrap();
    assert!(!flat.is_derived());
    assert!(flat.exception_for(d(2024, 12, 24)).unwrap().is_working());
    assert!(!flat.exception_for(d(2024, 12, 25)).unwrap().is_working());
    assert!(!flat.exception_for(d(2024, 12, 26)).unwrap().is_working());

    let mut flattened = CalendarContainer::new(ProjectConfig::default());
    flattened.add(flat).unwrap();
    let chained = calendars.view(CalendarId(2)).unwrap();
    let copy = flattened.view(CalendarId(2)).unwrap();
    for date in d(2024, 12, 20).iter_days().take(14) {
        assert_eq!(copy.ranges(date), chained.ranges(date), "{date}");
    }
}

#[test]
fn flatten_respects_days_the_child_decides() {
    let mut calendars = CalendarContainer::new(ProjectConfig::default());
    let mut base = Calendar::standard(CalendarId(1), "Standard");
    base.add_exception(CalendarException::single(d(2024, 7, 1)));
    base.add_exception(CalendarException::new(d(2024, 7, 3), d(2024, 7, 5)));
    let mut shutdown = WorkWeek::scoped(d(2024, 7, 15), d(2024, 7, 21));
    shutdown.set_working_day(Weekday::Mon, false);
    shutdown.set_working_day(Weekday::Tue, true);
    shutdown.set_hours(Weekday::Tue, [LocalTimeRange::new(t(10), t(14))]);
    base.add_work_week(shutdown);
    calendars.add(base).unwrap();

    let mut site = Calendar::derived(CalendarId(2), "Site", CalendarId(1));
    site.week_mut().set_working_day(Weekday::Wed, true);
    site.week_mut().set_hours(Weekday::Wed, [LocalTimeRange::new(t(9), t(12))]);
    calendars.add(site).unwrap();

    let mut early = Calendar::derived(CalendarId(3), "Early shift", CalendarId(2));
    early.week_mut().set_working_day(Weekday::Mon, true);
    early.week_mut().set_hours(Weekday::Mon, [LocalTimeRange::new(t(6), t(14))]);
    early.add_exception(CalendarException::single(d(2024, 7, 4)).with_hours(morning()));
    calendars.add(early).unwrap();

    let flat = calendars.flatten(CalendarId(3)).unwrap();
    assert!(flat.exception_for(d(2024, 7, 1)).is_none());
    assert!(flat.exception_for(d(2024, 7, 3)).is_none());
    assert!(flat.exception_for(d(2024, 7, 4)).unwrap().is_working());
    assert!(!flat.exception_for(d(2024, 7, 5)).unwrap().is_working());

    let mut flattened = CalendarContainer::new(ProjectConfig::default());
    flattened.add(flat).unwrap();
    let chained = calendars.view(CalendarId(3)).unwrap();
    let copy = flattened.view(CalendarId(3)).unwrap();
    for date in d(2024, 6, 24).iter_days().take(42) {
        assert_eq!(copy.ranges(date), chained.ranges(date), "{date}");
    }
    assert_eq!(copy.ranges(d(2024, 7, 1)), vec![LocalTimeRange::new(t(6), t(14))]);
    assert_eq!(copy.ranges(d(2024, 7, 16)), vec![LocalTimeRange::new(t(10), t(14))]);
}
