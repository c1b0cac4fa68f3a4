use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::LazyLock;

use crate::calendar::CalendarId;
use crate::duration::{Duration, TimeUnit};
use crate::fields::{FieldCache, FieldDependencies};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TaskId(pub u32);

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConstraintType {
    #[default]
    AsSoonAsPossible,
    AsLateAsPossible,
    MustStartOn,
    MustFinishOn,
    StartNoEarlierThan,
    StartNoLaterThan,
    FinishNoEarlierThan,
    FinishNoLaterThan,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskMode {
    #[default]
    AutoScheduled,
    ManuallyScheduled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationType {
    #[default]
    FinishStart,
    StartStart,
    FinishFinish,
    StartFinish,
}

impl fmt::Display for RelationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let code = match self {
            RelationType::FinishStart => "FS",
            RelationType::StartStart => "SS",
            RelationType::FinishFinish => "FF",
            RelationType::StartFinish => "SF",
        };
        f.write_str(code)
    }
}

/// A dependency link between two tasks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relation {
    pub id: u32,
    pub predecessor: TaskId,
    pub successor: TaskId,
    pub relation_type: RelationType,
    pub lag: Duration,
}

impl Relation {
    pub fn new(
        id: u32,
        predecessor: TaskId,
        successor: TaskId,
        relation_type: RelationType,
    ) -> Self {
        Self {
            id,
            predecessor,
            successor,
            relation_type,
            lag: Duration::zero(TimeUnit::Days),
        }
    }

    pub fn with_lag(mut self, lag: Duration) -> Self {
        self.lag = lag;
        self
    }
}

/// Task attributes that feed or hold calculated values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskField {
    Duration,
    EarlyStart,
    EarlyFinish,
    LateStart,
    LateFinish,
    ActualStart,
    ActualFinish,
    ConstraintType,
    Calendar,
    StartSlack,
    FinishSlack,
    TotalSlack,
}

pub(crate) static TASK_DEPENDENCIES: LazyLock<FieldDependencies<TaskField>> = LazyLock::new(|| {
    FieldDependencies::new(&[
        (
            TaskField::StartSlack,
            &[
                TaskField::Duration,
                TaskField::EarlyStart,
                TaskField::LateStart,
                TaskField::ConstraintType,
                TaskField::Calendar,
            ],
        ),
        (
            TaskField::FinishSlack,
            &[
                TaskField::Duration,
                TaskField::EarlyFinish,
                TaskField::LateFinish,
                TaskField::ConstraintType,
                TaskField::Calendar,
            ],
        ),
        (
            TaskField::TotalSlack,
            &[
                TaskField::StartSlack,
                TaskField::FinishSlack,
                TaskField::ActualStart,
                TaskField::Duration,
            ],
        ),
    ])
});

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    id: TaskId,
    pub name: String,
    parent: Option<TaskId>,
    /// Scheduled dates, used by assignments of manually scheduled tasks.
    pub start: Option<NaiveDateTime>,
    pub finish: Option<NaiveDateTime>,
    duration: Option<Duration>,
    early_start: Option<NaiveDateTime>,
    early_finish: Option<NaiveDateTime>,
    late_start: Option<NaiveDateTime>,
    late_finish: Option<NaiveDateTime>,
    actual_start: Option<NaiveDateTime>,
    actual_finish: Option<NaiveDateTime>,
    constraint_type: ConstraintType,
    pub mode: TaskMode,
    calendar: Option<CalendarId>,
    /// Assignments work to the task calendar alone when set.
    #[serde(default)]
    pub ignore_resource_calendar: bool,
    pub percent_complete: f64,
    #[serde(skip)]
    cache: FieldCache<TaskField, Option<Duration>>,
}

impl Task {
    pub fn new(id: TaskId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            parent: None,
            start: None,
            finish: None,
            duration: None,
            early_start: None,
            early_finish: None,
            late_start: None,
            late_finish: None,
            actual_start: None,
            actual_finish: None,
            constraint_type: ConstraintType::default(),
            mode: TaskMode::default(),
            calendar: None,
            ignore_resource_calendar: false,
            percent_complete: 0.0,
            cache: FieldCache::new(),
        }
    }

    /// Sets early and late dates in one go.
    pub fn with_dates(
        mut self,
        early_start: NaiveDateTime,
        early_finish: NaiveDateTime,
        late_start: NaiveDateTime,
        late_finish: NaiveDateTime,
    ) -> Self {
        self.set_early_start(Some(early_start));
        self.set_early_finish(Some(early_finish));
        self.set_late_start(Some(late_start));
        self.set_late_finish(Some(late_finish));
        self.start = Some(early_start);
        self.finish = Some(early_finish);
        self
    }

    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.set_duration(Some(duration));
        self
    }

    pub fn id(&self) -> TaskId {
        self.id
    }

    pub(crate) fn set_id(&mut self, id: TaskId) {
        self.id = id;
    }

    pub fn parent(&self) -> Option<TaskId> {
        self.parent
    }

    pub(crate) fn set_parent(&mut self, parent: Option<TaskId>) {
        self.parent = parent;
    }

    fn touch(&self, field: TaskField) {
        self.cache.invalidate(field, &TASK_DEPENDENCIES);
    }

    pub fn duration(&self) -> Option<Duration> {
        self.duration
    }

    pub fn set_duration(&mut self, duration: Option<Duration>) {
        self.duration = duration;
        self.touch(TaskField::Duration);
    }

    pub fn early_start(&self) -> Option<NaiveDateTime> {
        self.early_start
    }

    pub fn set_early_start(&mut self, date: Option<NaiveDateTime>) {
        self.early_start = date;
        self.touch(TaskField::EarlyStart);
    }

    pub fn early_finish(&self) -> Option<NaiveDateTime> {
        self.early_finish
    }

    pub fn set_early_finish(&mut self, date: Option<NaiveDateTime>) {
        self.early_finish = date;
        self.touch(TaskField::EarlyFinish);
    }

    pub fn late_start(&self) -> Option<NaiveDateTime> {
        self.late_start
    }

    pub fn set_late_start(&mut self, date: Option<NaiveDateTime>) {
        self.late_start = date;
        self.touch(TaskField::LateStart);
    }

    pub fn late_finish(&self) -> Option<NaiveDateTime> {
        self.late_finish
    }

    pub fn set_late_finish(&mut self, date: Option<NaiveDateTime>) {
        self.late_finish = date;
        self.touch(TaskField::LateFinish);
    }

    pub fn actual_start(&self) -> Option<NaiveDateTime> {
        self.actual_start
    }

    pub fn set_actual_start(&mut self, date: Option<NaiveDateTime>) {
        self.actual_start = date;
        self.touch(TaskField::ActualStart);
    }

    pub fn actual_finish(&self) -> Option<NaiveDateTime> {
        self.actual_finish
    }

    pub fn set_actual_finish(&mut self, date: Option<NaiveDateTime>) {
        self.actual_finish = date;
        self.touch(TaskField::ActualFinish);
    }

    pub fn constraint_type(&self) -> ConstraintType {
        self.constraint_type
    }

    pub fn set_constraint_type(&mut self, constraint_type: ConstraintType) {
        self.constraint_type = constraint_type;
        self.touch(TaskField::ConstraintType);
    }

    pub fn calendar(&self) -> Option<CalendarId> {
        self.calendar
    }

    pub fn set_calendar(&mut self, calendar: Option<CalendarId>) {
        self.calendar = calendar;
        self.touch(TaskField::Calendar);
    }

    pub fn is_manually_scheduled(&self) -> bool {
        self.mode == TaskMode::ManuallyScheduled
    }

    pub fn is_complete(&self) -> bool {
        self.actual_finish.is_some()
    }

    /// Start and finish, switching to late dates for as-late-as-possible tasks.
    pub fn scheduling_dates(&self) -> (Option<NaiveDateTime>, Option<NaiveDateTime>) {
        if self.constraint_type == ConstraintType::AsLateAsPossible {
            (self.late_start, self.late_finish)
        } else {
            (self.early_start, self.early_finish)
        }
    }

    pub(crate) fn cache(&self) -> &FieldCache<TaskField, Option<Duration>> {
        &self.cache
    }

    /// Forgets every calculated value, for changes made outside this task.
    pub fn clear_calculated_fields(&self) {
        self.cache.clear();
    }
}
