use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::availability::AvailabilityTable;
use crate::calendar::CalendarId;
use crate::rate::{COST_RATE_TABLE_COUNT, CostRateTable};
use crate::task::TaskId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ResourceId(pub u32);

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AssignmentId(pub u32);

impl fmt::Display for AssignmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A person, machine or material that can be assigned to tasks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    id: ResourceId,
    pub name: String,
    /// Non-owning link into the schedule's calendar table.
    pub calendar: Option<CalendarId>,
    #[serde(default)]
    pub availability: AvailabilityTable,
    cost_rate_tables: [CostRateTable; COST_RATE_TABLE_COUNT],
}

impl Resource {
    pub fn new(id: ResourceId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            calendar: None,
            availability: AvailabilityTable::new(),
            cost_rate_tables: std::array::from_fn(|_| CostRateTable::with_default_entry()),
        }
    }

    pub fn with_calendar(mut self, calendar: CalendarId) -> Self {
        self.calendar = Some(calendar);
        self
    }

    pub fn id(&self) -> ResourceId {
        self.id
    }

    pub(crate) fn set_id(&mut self, id: ResourceId) {
        self.id = id;
    }

    /// Cost-rate table `index`, 0 being table A.
    pub fn cost_rate_table(&self, index: usize) -> Option<&CostRateTable> {
        self.cost_rate_tables.get(index)
    }

    pub fn cost_rate_table_mut(&mut self, index: usize) -> Option<&mut CostRateTable> {
        self.cost_rate_tables.get_mut(index)
    }

    pub fn cost_rate_tables(&self) -> &[CostRateTable] {
        &self.cost_rate_tables
    }

    pub fn available_from(&self, date: NaiveDateTime) -> Option<NaiveDateTime> {
        self.availability.available_from(date)
    }

    pub fn available_to(&self, date: NaiveDateTime) -> Option<NaiveDateTime> {
        self.availability.available_to(date)
    }
}

/// Work of one resource on one task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceAssignment {
    id: AssignmentId,
    pub task: TaskId,
    pub resource: Option<ResourceId>,
    pub start: Option<NaiveDateTime>,
    pub finish: Option<NaiveDateTime>,
    /// Index of the resource cost-rate table used for costing.
    #[serde(default)]
    pub cost_rate_table_index: usize,
}

impl ResourceAssignment {
    pub fn new(id: AssignmentId, task: TaskId, resource: Option<ResourceId>) -> Self {
        Self {
            id,
            task,
            resource,
            start: None,
            finish: None,
            cost_rate_table_index: 0,
        }
    }

    pub fn with_dates(mut self, start: NaiveDateTime, finish: NaiveDateTime) -> Self {
        self.start = Some(start);
        self.finish = Some(finish);
        self
    }

    pub fn id(&self) -> AssignmentId {
        self.id
    }

    pub(crate) fn set_id(&mut self, id: AssignmentId) {
        self.id = id;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_resources_carry_five_default_tables() {
        let resource = Resource::new(ResourceId(1), "Crane");
        assert_eq!(resource.cost_rate_tables().len(), 5);
        assert!(resource.cost_rate_tables().iter().all(|table| table.len() == 1));
        assert!(!resource.cost_rate_table(0).unwrap().table_is_populated());
        assert!(resource.cost_rate_table(5).is_none());
    }
}
