pub mod availability;
pub mod calculations;
pub mod calendar;
pub mod config;
pub mod context;
pub mod duration;
pub mod error;
pub mod fields;
pub mod graph;
pub mod rate;
pub mod recurrence;
pub mod resource;
pub mod schedule;
pub mod task;
pub mod time_range;

pub use availability::{Availability, AvailabilityTable};
pub use calculations::slack::{MicrosoftSlackCalculator, SlackCalculator, TotalSlackCalculationType};
pub use calendar::{
    Calendar, CalendarContainer, CalendarException, CalendarId, CalendarVariant, CalendarView,
    DayType, WorkWeek,
};
pub use config::ProjectConfig;
pub use context::{EntityKind, ProjectContext};
pub use duration::{Duration, TimeUnit, TimeUnitDefaults};
pub use error::{CalendarError, CalendarResult};
pub use rate::{CostRateTable, CostRateTableEntry, Rate};
pub use recurrence::{RecurrenceType, RecurringData};
pub use resource::{AssignmentId, Resource, ResourceAssignment, ResourceId};
pub use schedule::Schedule;
pub use task::{ConstraintType, Relation, RelationType, Task, TaskId, TaskMode};
pub use time_range::{LocalDateRange, LocalDateTimeRange, LocalTimeRange, TimeRange};
