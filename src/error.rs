use crate::calendar::CalendarId;
use crate::resource::ResourceId;
use crate::task::TaskId;
use thiserror::Error;

/// Faults raised for caller misuse or outer-surface failures.
///
/// Lookups that simply find nothing return `None` instead.
#[derive(Debug, Error)]
pub enum CalendarError {
    #[error("calendar {calendar} cannot derive from {parent}: the parent chain would form a cycle")]
    CyclicParent {
        calendar: CalendarId,
        parent: CalendarId,
    },

    #[error("unknown calendar {0}")]
    UnknownCalendar(CalendarId),

    #[error("unknown task {0}")]
    UnknownTask(TaskId),

    #[error("unknown resource {0}")]
    UnknownResource(ResourceId),

    #[error("unsupported operation: {0}")]
    UnsupportedOperation(&'static str),

    #[error("configuration error: {0}")]
    Config(#[from] Box<figment::Error>),

    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for CalendarError {
    fn from(value: figment::Error) -> Self {
        Self::Config(Box::new(value))
    }
}

pub type CalendarResult<T> = Result<T, CalendarError>;
