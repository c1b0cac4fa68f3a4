//! Slack (float) calculations over scheduled early and late dates.
//!
//! The dates themselves come from whichever scheduler filled in the tasks.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use crate::calendar::CalendarView;
use crate::duration::{Duration, TimeUnit};
use crate::schedule::Schedule;
use crate::task::{ConstraintType, Relation, RelationType, Task};

/// How total slack is derived from start and finish slack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TotalSlackCalculationType {
    /// The smaller of start and finish slack.
    #[default]
    Smallest,
    StartSlack,
    FinishSlack,
}

/// Pluggable slack policy.
///
/// Implementations read cached values back through the [`Schedule`] accessors so
/// dependent results are calculated once.
pub trait SlackCalculator {
    fn calculate_start_slack(&self, schedule: &Schedule, task: &Task) -> Option<Duration>;
    fn calculate_finish_slack(&self, schedule: &Schedule, task: &Task) -> Option<Duration>;
    fn calculate_free_slack(&self, schedule: &Schedule, task: &Task) -> Option<Duration>;
    fn calculate_total_slack(&self, schedule: &Schedule, task: &Task) -> Option<Duration>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct MicrosoftSlackCalculator;

fn shortest(durations: impl Iterator<Item = Duration>) -> Option<Duration> {
    durations.min_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal))
}

fn date_slack(
    schedule: &Schedule,
    task: &Task,
    early: Option<NaiveDateTime>,
    late: Option<NaiveDateTime>,
) -> Option<Duration> {
    let duration = task.duration()?;
    if task.constraint_type() == ConstraintType::AsLateAsPossible {
        return Some(Duration::zero(duration.unit));
    }
    let (early, late) = (early?, late?);
    let calendar = schedule.task_calendar(task.id())?;
    Some(calendar.work(early, late, duration.unit))
}

impl MicrosoftSlackCalculator {
    pub fn new() -> Self {
        Self
    }

    /// Gap between a summary task's early finish and a successor's early start.
    fn summary_variance(
        &self,
        schedule: &Schedule,
        task: &Task,
        successor: &Task,
    ) -> Option<Duration> {
        let calendar = schedule.task_calendar(task.id())?;
        let variance =
            calendar.variance(task.early_finish(), successor.early_start(), TimeUnit::Hours);
        (variance.amount >= 0.0).then_some(variance)
    }

    fn relation_free_slack(&self, schedule: &Schedule, relation: &Relation) -> Option<Duration> {
        let predecessor = schedule.task(relation.predecessor)?;
        let successor = schedule.task(relation.successor)?;

        let (predecessor_start, predecessor_finish) = predecessor.scheduling_dates();
        let (successor_start, successor_finish) = successor.scheduling_dates();

        let (from, to) = match relation.relation_type {
            RelationType::FinishStart => (predecessor_finish, successor_start),
            RelationType::StartStart => (predecessor_start, successor_start),
            RelationType::FinishFinish => (predecessor_finish, successor_finish),
            RelationType::StartFinish => (predecessor_start, successor_finish),
        };

        let unit = predecessor.duration().map_or(TimeUnit::Hours, |d| d.unit);
        let (Some(from), Some(to)) = (from, to) else {
            return Some(Duration::zero(unit));
        };

        let calendar = schedule.task_calendar(predecessor.id())?;
        let variance = calendar.work(from, to, unit);
        Some(remove_lag(relation, predecessor, &calendar, variance))
    }
}

/// Subtracts the relation lag, expressed in `duration`'s units.
///
/// Percentage lags are taken as a share of the predecessor's duration.
fn remove_lag(
    relation: &Relation,
    predecessor: &Task,
    calendar: &CalendarView<'_>,
    duration: Duration,
) -> Duration {
    let lag = relation.lag;
    if lag.amount == 0.0 {
        return duration;
    }

    let lag = if lag.unit == duration.unit {
        lag
    } else if lag.unit == TimeUnit::Percent {
        match predecessor.duration() {
            Some(base) => Duration::new(base.amount * lag.amount / 100.0, base.unit)
                .convert_units(duration.unit, calendar),
            None => Duration::zero(duration.unit),
        }
    } else {
        lag.convert_units(duration.unit, calendar)
    };

    Duration::new(duration.amount - lag.amount, duration.unit)
}

impl SlackCalculator for MicrosoftSlackCalculator {
    fn calculate_start_slack(&self, schedule: &Schedule, task: &Task) -> Option<Duration> {
        date_slack(schedule, task, task.early_start(), task.late_start())
    }

    fn calculate_finish_slack(&self, schedule: &Schedule, task: &Task) -> Option<Duration> {
        date_slack(schedule, task, task.early_finish(), task.late_finish())
    }

    fn calculate_free_slack(&self, schedule: &Schedule, task: &Task) -> Option<Duration> {
        if task.is_complete() {
            let unit = task.duration().map_or(TimeUnit::Hours, |d| d.unit);
            return Some(Duration::zero(unit));
        }

        if schedule.is_summary(task.id()) {
            let free = shortest(
                schedule
                    .child_tasks(task.id())
                    .flat_map(|child| schedule.successor_relations(child.id()))
                    .filter_map(|relation| schedule.task(relation.successor))
                    .filter(|successor| !successor.is_complete())
                    .filter_map(|successor| self.summary_variance(schedule, task, successor)),
            )
            .or_else(|| schedule.total_slack(task.id()))?;

            if free.amount < 0.0 {
                return Some(Duration::zero(free.unit));
            }
            return Some(free);
        }

        let free = shortest(
            schedule
                .successor_relations(task.id())
                .filter(|relation| {
                    schedule
                        .task(relation.successor)
                        .is_some_and(|successor| !successor.is_complete())
                })
                .filter_map(|relation| self.relation_free_slack(schedule, relation)),
        )
        .or_else(|| schedule.total_slack(task.id()))?;

        if free.amount < 0.0 {
            return Some(Duration::zero(TimeUnit::Hours));
        }
        Some(free)
    }

    fn calculate_total_slack(&self, schedule: &Schedule, task: &Task) -> Option<Duration> {
        let duration = task.duration();
        let start_slack = schedule.start_slack(task.id());
        let finish_slack = schedule.finish_slack(task.id());

        match schedule.config().total_slack_calculation_type {
            TotalSlackCalculationType::StartSlack => return start_slack,
            TotalSlackCalculationType::FinishSlack => return finish_slack,
            TotalSlackCalculationType::Smallest => {}
        }

        if task.actual_start().is_some() {
            return finish_slack;
        }

        let unit = duration?.unit;
        let config = schedule.config();
        let start_slack = start_slack?.convert_units(unit, config);
        let finish_slack = finish_slack?.convert_units(unit, config);

        if start_slack.amount < finish_slack.amount {
            Some(start_slack)
        } else {
            Some(finish_slack)
        }
    }
}
