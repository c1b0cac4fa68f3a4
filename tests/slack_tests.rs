use chrono::{NaiveDate, NaiveDateTime};
use schedule_calendar::{
    ConstraintType, Duration, RelationType, Schedule, Task, TaskId, TimeUnit,
    TotalSlackCalculationType,
};

fn dt(y: i32, m: u32, d: u32, h: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(y, m, d)
        .unwrap()
        .and_hms_opt(h, 0, 0)
        .unwrap()
}

/// Two-day task, early Mon-Tue, late Wed-Thu of the week of 2024-08-05.
fn floating_task(name: &str) -> Task {
    Task::new(TaskId(0), name)
        .with_duration(Duration::days(2.0))
        .with_dates(
            dt(2024, 8, 5, 8),
            dt(2024, 8, 6, 17),
            dt(2024, 8, 7, 8),
            dt(2024, 8, 8, 17),
        )
}

/// Successor starting early on Thursday 2024-08-08.
fn successor(name: &str) -> Task {
    Task::new(TaskId(0), name)
        .with_duration(Duration::days(1.0))
        .with_dates(
            dt(2024, 8, 8, 8),
            dt(2024, 8, 8, 17),
            dt(2024, 8, 9, 8),
            dt(2024, 8, 9, 17),
        )
}

fn linked(lag: Duration) -> (Schedule, TaskId, TaskId) {
    let mut schedule = Schedule::default();
    let a = schedule.add_task(floating_task("A")).unwrap();
    let b = schedule.add_task(successor("B")).unwrap();
    schedule
        .add_relation(a, b, RelationType::FinishStart, lag)
        .unwrap();
    (schedule, a, b)
}

#[test]
fn start_and_finish_slack_measure_working_time() {
    let mut schedule = Schedule::default();
    let a = schedule.add_task(floating_task("A")).unwrap();
    assert_eq!(schedule.start_slack(a), Some(Duration::days(2.0)));
    assert_eq!(schedule.finish_slack(a), Some(Duration::days(2.0)));
    assert_eq!(schedule.total_slack(a), Some(Duration::days(2.0)));
}

#[test]
fn slack_needs_a_duration_and_is_zero_for_as_late_as_possible() {
    let mut schedule = Schedule::default();
    let a = schedule.add_task(floating_task("A")).unwrap();
    let b = schedule
        .add_task(Task::new(TaskId(0), "Milestone").with_dates(
            dt(2024, 8, 5, 8),
            dt(2024, 8, 5, 8),
            dt(2024, 8, 6, 8),
            dt(2024, 8, 6, 8),
        ))
        .unwrap();
    assert_eq!(schedule.start_slack(b), None);
    assert_eq!(schedule.total_slack(b), None);

    schedule
        .task_mut(a)
        .unwrap()
        .set_constraint_type(ConstraintType::AsLateAsPossible);
    assert_eq!(schedule.start_slack(a), Some(Duration::zero(TimeUnit::Days)));
    assert_eq!(schedule.finish_slack(a), Some(Duration::zero(TimeUnit::Days)));
}

#[test]
fn total_slack_follows_the_configured_policy() {
    let mut schedule = Schedule::default();
    let a = schedule.add_task(floating_task("A")).unwrap();
    // Late finish moves out a day: start slack 2d, finish slack 3d.
    schedule
        .task_mut(a)
        .unwrap()
        .set_late_finish(Some(dt(2024, 8, 9, 17)));
    assert_eq!(schedule.total_slack(a), Some(Duration::days(2.0)));

    schedule.config_mut().total_slack_calculation_type = TotalSlackCalculationType::FinishSlack;
    assert_eq!(schedule.total_slack(a), Some(Duration::days(3.0)));

    schedule.config_mut().total_slack_calculation_type = TotalSlackCalculationType::StartSlack;
    assert_eq!(schedule.total_slack(a), Some(Duration::days(2.0)));

    schedule.config_mut().total_slack_calculation_type = TotalSlackCalculationType::Smallest;
    schedule.set_actual_start(a, Some(dt(2024, 8, 5, 8))).unwrap();
    assert_eq!(schedule.total_slack(a), Some(Duration::days(3.0)));
}

#[test]
fn cached_slack_is_recalculated_after_edits() {
    let mut schedule = Schedule::default();
    let a = schedule.add_task(floating_task("A")).unwrap();
    assert_eq!(schedule.start_slack(a), Some(Duration::days(2.0)));

    schedule
        .task_mut(a)
        .unwrap()
        .set_late_start(Some(dt(2024, 8, 6, 8)));
    assert_eq!(schedule.start_slack(a), Some(Duration::days(1.0)));
    assert_eq!(schedule.total_slack(a), Some(Duration::days(1.0)));

    let calendar = schedule.default_calendar().unwrap();
    schedule
        .calendars_mut()
        .get_mut(calendar)
        .unwrap()
        .add_exception(schedule_calendar::CalendarException::single(
            NaiveDate::from_ymd_opt(2024, 8, 5).unwrap(),
        ));
    assert_eq!(schedule.start_slack(a), Some(Duration::days(0.0)));
}

#[test]
fn free_slack_is_the_gap_to_the_successor() {
    let (schedule, a, _) = linked(Duration::zero(TimeUnit::Days));
    assert_eq!(schedule.free_slack(a), Some(Duration::days(1.0)));
}

#[test]
fn free_slack_removes_lag() {
    let (schedule, a, _) = linked(Duration::hours(4.0));
    assert_eq!(schedule.free_slack(a), Some(Duration::days(0.5)));

    let (schedule, a, _) = linked(Duration::new(50.0, TimeUnit::Percent));
    assert_eq!(schedule.free_slack(a), Some(Duration::days(0.0)));

    let (schedule, a, _) = linked(Duration::days(2.0));
    assert_eq!(schedule.free_slack(a), Some(Duration::zero(TimeUnit::Hours)));
}

#[test]
fn free_slack_ignores_completed_successors() {
    let (mut schedule, a, b) = linked(Duration::zero(TimeUnit::Days));
    schedule.set_actual_finish(b, Some(dt(2024, 8, 8, 17))).unwrap();
    assert_eq!(schedule.free_slack(a), schedule.total_slack(a));
    assert_eq!(schedule.free_slack(b), Some(Duration::zero(TimeUnit::Days)));
}

#[test]
fn free_slack_without_successors_is_total_slack() {
    let (schedule, _, b) = linked(Duration::zero(TimeUnit::Days));
    assert_eq!(schedule.free_slack(b), Some(Duration::days(1.0)));
}

#[test]
fn summary_free_slack_uses_child_successors() {
    let (mut schedule, a, _) = linked(Duration::zero(TimeUnit::Days));
    let summary = schedule
        .add_task(Task::new(TaskId(0), "Phase").with_dates(
            dt(2024, 8, 5, 8),
            dt(2024, 8, 6, 17),
            dt(2024, 8, 7, 8),
            dt(2024, 8, 8, 17),
        ))
        .unwrap();
    schedule.set_task_parent(a, Some(summary)).unwrap();
    assert!(schedule.is_summary(summary));
    assert_eq!(schedule.free_slack(summary), Some(Duration::hours(8.0)));
}
