use chrono::NaiveDateTime;
use std::collections::BTreeMap;
use std::path::Path;
use std::rc::Rc;

use crate::calculations::slack::{MicrosoftSlackCalculator, SlackCalculator};
use crate::calendar::{Calendar, CalendarContainer, CalendarId, CalendarView};
use crate::config::ProjectConfig;
use crate::context::{EntityKind, ProjectContext};
use crate::duration::Duration;
use crate::error::{CalendarError, CalendarResult};
use crate::graph::schedule_dag::ScheduleDag;
use crate::resource::{AssignmentId, Resource, ResourceAssignment, ResourceId};
use crate::task::{Relation, RelationType, Task, TaskField, TaskId};

/// Owner of every calendar, task, resource, assignment and relation in a project.
///
/// Cross-references between entities are IDs resolved through this struct, so
/// removals only have to clear the IDs that point at the removed entity.
pub struct Schedule {
    context: Rc<ProjectContext>,
    calendars: CalendarContainer,
    default_calendar: Option<CalendarId>,
    tasks: BTreeMap<TaskId, Task>,
    resources: BTreeMap<ResourceId, Resource>,
    assignments: BTreeMap<AssignmentId, ResourceAssignment>,
    relations: Vec<Relation>,
    slack_calculator: Box<dyn SlackCalculator>,
}

impl Default for Schedule {
    fn default() -> Self {
        Self::new(ProjectConfig::default())
    }
}

impl Schedule {
    pub fn new(config: ProjectConfig) -> Self {
        Self::with_context(config, ProjectContext::new())
    }

    /// A schedule drawing unique IDs from a context shared with other schedules.
    ///
    /// Starts with a standard calendar named after `default_calendar_name`.
    pub fn with_context(config: ProjectConfig, context: Rc<ProjectContext>) -> Self {
        let name = config.default_calendar_name.clone();
        let mut schedule = Self {
            context,
            calendars: CalendarContainer::new(config),
            default_calendar: None,
            tasks: BTreeMap::new(),
            resources: BTreeMap::new(),
            assignments: BTreeMap::new(),
            relations: Vec::new(),
            slack_calculator: Box::new(MicrosoftSlackCalculator::new()),
        };
        let id = CalendarId(schedule.context.next_id(EntityKind::Calendar));
        if schedule.calendars.add(Calendar::standard(id, name)).is_ok() {
            schedule.default_calendar = Some(id);
        }
        schedule
    }

    /// Loads configuration from defaults, an optional TOML file and the environment.
    pub fn from_config_path(config_path: Option<&Path>) -> CalendarResult<Self> {
        Ok(Self::new(ProjectConfig::load_from(config_path)?))
    }

    pub fn context(&self) -> &Rc<ProjectContext> {
        &self.context
    }

    pub fn config(&self) -> &ProjectConfig {
        self.calendars.config()
    }

    pub fn config_mut(&mut self) -> &mut ProjectConfig {
        self.clear_calculated_fields();
        self.calendars.config_mut()
    }

    pub fn set_slack_calculator(&mut self, calculator: Box<dyn SlackCalculator>) {
        self.clear_calculated_fields();
        self.slack_calculator = calculator;
    }

    fn clear_calculated_fields(&self) {
        for task in self.tasks.values() {
            task.clear_calculated_fields();
        }
    }

    fn allocate(&self, kind: EntityKind, id: u32) -> u32 {
        if id == 0 && self.config().auto_unique_ids {
            self.context.next_id(kind)
        } else {
            self.context.reserve(kind, id);
            id
        }
    }

    // Calendars

    pub fn calendars(&self) -> &CalendarContainer {
        &self.calendars
    }

    /// Mutable access to the calendar table. Cached slack is dropped.
    pub fn calendars_mut(&mut self) -> &mut CalendarContainer {
        self.clear_calculated_fields();
        &mut self.calendars
    }

    pub fn calendar(&self, id: CalendarId) -> Option<&Calendar> {
        self.calendars.get(id)
    }

    pub fn default_calendar(&self) -> Option<CalendarId> {
        self.default_calendar
    }

    pub fn set_default_calendar(&mut self, id: Option<CalendarId>) -> CalendarResult<()> {
        if let Some(id) = id {
            if self.calendars.get(id).is_none() {
                return Err(CalendarError::UnknownCalendar(id));
            }
        }
        self.clear_calculated_fields();
        self.default_calendar = id;
        Ok(())
    }

    /// Adds a calendar; a zero ID is replaced with the next free one.
    pub fn add_calendar(&mut self, mut calendar: Calendar) -> CalendarResult<CalendarId> {
        let id = self.allocate(EntityKind::Calendar, calendar.id().0);
        calendar.set_id(CalendarId(id));
        self.calendars.add(calendar)
    }

    /// Adds an empty calendar that defers every day to `parent`.
    pub fn add_derived_calendar(
        &mut self,
        name: impl Into<String>,
        parent: CalendarId,
    ) -> CalendarResult<CalendarId> {
        self.add_calendar(Calendar::derived(CalendarId(0), name, parent))
    }

    /// Removes a calendar and every reference to it.
    ///
    /// Derived calendars lose their parent; tasks and resources fall back to no calendar.
    pub fn remove_calendar(&mut self, id: CalendarId) -> Option<Calendar> {
        let removed = self.calendars.remove(id)?;

        for task in self.tasks.values_mut() {
            if task.calendar() == Some(id) {
                tracing::debug!(task = %task.id(), calendar = %id, "cleared task calendar");
                task.set_calendar(None);
            }
        }
        for resource in self.resources.values_mut() {
            if resource.calendar == Some(id) {
                tracing::debug!(
                    resource = %resource.id(),
                    calendar = %id,
                    "cleared resource calendar"
                );
                resource.calendar = None;
            }
        }
        if self.default_calendar == Some(id) {
            tracing::debug!(calendar = %id, "removed the default calendar");
            self.default_calendar = None;
        }
        self.clear_calculated_fields();
        Some(removed)
    }

    // Tasks

    pub fn tasks(&self) -> impl Iterator<Item = &Task> {
        self.tasks.values()
    }

    pub fn task(&self, id: TaskId) -> Option<&Task> {
        self.tasks.get(&id)
    }

    pub fn task_mut(&mut self, id: TaskId) -> Option<&mut Task> {
        self.tasks.get_mut(&id)
    }

    pub fn add_task(&mut self, mut task: Task) -> CalendarResult<TaskId> {
        let id = TaskId(self.allocate(EntityKind::Task, task.id().0));
        if self.tasks.contains_key(&id) {
            return Err(CalendarError::UnsupportedOperation(
                "a task with this unique ID already exists",
            ));
        }
        if let Some(calendar) = task.calendar() {
            if self.calendars.get(calendar).is_none() {
                return Err(CalendarError::UnknownCalendar(calendar));
            }
        }
        task.set_id(id);
        task.set_parent(None);
        self.tasks.insert(id, task);
        Ok(id)
    }

    /// Moves `id` under `parent` in the outline, or to the top level.
    pub fn set_task_parent(&mut self, id: TaskId, parent: Option<TaskId>) -> CalendarResult<()> {
        if !self.tasks.contains_key(&id) {
            return Err(CalendarError::UnknownTask(id));
        }
        if let Some(parent) = parent {
            if !self.tasks.contains_key(&parent) {
                return Err(CalendarError::UnknownTask(parent));
            }
            let mut current = Some(parent);
            while let Some(ancestor) = current {
                if ancestor == id {
                    return Err(CalendarError::UnsupportedOperation(
                        "a task cannot be nested under itself",
                    ));
                }
                current = self.tasks.get(&ancestor).and_then(Task::parent);
            }
        }
        if let Some(task) = self.tasks.get_mut(&id) {
            task.set_parent(parent);
        }
        Ok(())
    }

    pub fn child_tasks(&self, id: TaskId) -> impl Iterator<Item = &Task> {
        self.tasks
            .values()
            .filter(move |task| task.parent() == Some(id))
    }

    pub fn is_summary(&self, id: TaskId) -> bool {
        self.child_tasks(id).next().is_some()
    }

    /// Removes a task with its relations and assignments. Child tasks move to the top level.
    pub fn remove_task(&mut self, id: TaskId) -> Option<Task> {
        let removed = self.tasks.remove(&id)?;

        for task in self.tasks.values_mut() {
            if task.parent() == Some(id) {
                task.set_parent(None);
            }
        }

        let before = self.relations.len();
        self.relations
            .retain(|relation| relation.predecessor != id && relation.successor != id);
        let relations = before - self.relations.len();

        let before = self.assignments.len();
        self.assignments.retain(|_, assignment| assignment.task != id);
        let assignments = before - self.assignments.len();

        tracing::debug!(task = %id, relations, assignments, "removed task");
        self.clear_calculated_fields();
        Some(removed)
    }

    pub fn set_actual_start(
        &mut self,
        id: TaskId,
        date: Option<NaiveDateTime>,
    ) -> CalendarResult<()> {
        self.tasks
            .get_mut(&id)
            .ok_or(CalendarError::UnknownTask(id))?
            .set_actual_start(date);
        Ok(())
    }

    pub fn set_actual_finish(
        &mut self,
        id: TaskId,
        date: Option<NaiveDateTime>,
    ) -> CalendarResult<()> {
        self.tasks
            .get_mut(&id)
            .ok_or(CalendarError::UnknownTask(id))?
            .set_actual_finish(date);
        Ok(())
    }

    // Relations

    pub fn relations(&self) -> &[Relation] {
        &self.relations
    }

    pub fn dag(&self) -> ScheduleDag {
        ScheduleDag::build(self.tasks.keys().copied(), &self.relations)
    }

    /// Links two tasks. Links that would make the network cyclic are rejected.
    pub fn add_relation(
        &mut self,
        predecessor: TaskId,
        successor: TaskId,
        relation_type: RelationType,
        lag: Duration,
    ) -> CalendarResult<u32> {
        for task in [predecessor, successor] {
            if !self.tasks.contains_key(&task) {
                return Err(CalendarError::UnknownTask(task));
            }
        }
        if self.dag().would_create_cycle(predecessor, successor) {
            return Err(CalendarError::UnsupportedOperation(
                "relation would make the task network cyclic",
            ));
        }
        let id = self.context.next_id(EntityKind::Relation);
        self.relations
            .push(Relation::new(id, predecessor, successor, relation_type).with_lag(lag));
        Ok(id)
    }

    pub fn remove_relation(&mut self, id: u32) -> Option<Relation> {
        let index = self.relations.iter().position(|relation| relation.id == id)?;
        Some(self.relations.remove(index))
    }

    pub fn successor_relations(&self, id: TaskId) -> impl Iterator<Item = &Relation> {
        self.relations
            .iter()
            .filter(move |relation| relation.predecessor == id)
    }

    pub fn predecessor_relations(&self, id: TaskId) -> impl Iterator<Item = &Relation> {
        self.relations
            .iter()
            .filter(move |relation| relation.successor == id)
    }

    // Resources and assignments

    pub fn resources(&self) -> impl Iterator<Item = &Resource> {
        self.resources.values()
    }

    pub fn resource(&self, id: ResourceId) -> Option<&Resource> {
        self.resources.get(&id)
    }

    pub fn resource_mut(&mut self, id: ResourceId) -> Option<&mut Resource> {
        self.resources.get_mut(&id)
    }

    pub fn add_resource(&mut self, mut resource: Resource) -> CalendarResult<ResourceId> {
        let id = ResourceId(self.allocate(EntityKind::Resource, resource.id().0));
        if self.resources.contains_key(&id) {
            return Err(CalendarError::UnsupportedOperation(
                "a resource with this unique ID already exists",
            ));
        }
        if let Some(calendar) = resource.calendar {
            if self.calendars.get(calendar).is_none() {
                return Err(CalendarError::UnknownCalendar(calendar));
            }
        }
        resource.set_id(id);
        self.resources.insert(id, resource);
        Ok(id)
    }

    /// Removes a resource. Its assignments stay on their tasks without a resource.
    pub fn remove_resource(&mut self, id: ResourceId) -> Option<Resource> {
        let removed = self.resources.remove(&id)?;
        for assignment in self.assignments.values_mut() {
            if assignment.resource == Some(id) {
                tracing::debug!(
                    assignment = %assignment.id(),
                    resource = %id,
                    "cleared assignment resource"
                );
                assignment.resource = None;
            }
        }
        Some(removed)
    }

    pub fn assignments(&self) -> impl Iterator<Item = &ResourceAssignment> {
        self.assignments.values()
    }

    pub fn assignment(&self, id: AssignmentId) -> Option<&ResourceAssignment> {
        self.assignments.get(&id)
    }

    pub fn assignment_mut(&mut self, id: AssignmentId) -> Option<&mut ResourceAssignment> {
        self.assignments.get_mut(&id)
    }

    pub fn add_assignment(
        &mut self,
        mut assignment: ResourceAssignment,
    ) -> CalendarResult<AssignmentId> {
        if !self.tasks.contains_key(&assignment.task) {
            return Err(CalendarError::UnknownTask(assignment.task));
        }
        if let Some(resource) = assignment.resource {
            if !self.resources.contains_key(&resource) {
                return Err(CalendarError::UnknownResource(resource));
            }
        }
        let id = AssignmentId(self.allocate(EntityKind::Assignment, assignment.id().0));
        if self.assignments.contains_key(&id) {
            return Err(CalendarError::UnsupportedOperation(
                "an assignment with this unique ID already exists",
            ));
        }
        assignment.set_id(id);
        self.assignments.insert(id, assignment);
        Ok(id)
    }

    pub fn remove_assignment(&mut self, id: AssignmentId) -> Option<ResourceAssignment> {
        self.assignments.remove(&id)
    }

    // Effective calendars

    pub fn calendar_view(&self, id: CalendarId) -> Option<CalendarView<'_>> {
        self.calendars.view(id)
    }

    /// The task's own calendar, else the default calendar.
    pub fn task_calendar(&self, id: TaskId) -> Option<CalendarView<'_>> {
        let task = self.tasks.get(&id)?;
        task.calendar()
            .or(self.default_calendar)
            .and_then(|calendar| self.calendars.view(calendar))
    }

    pub fn resource_calendar(&self, id: ResourceId) -> Option<CalendarView<'_>> {
        self.resources
            .get(&id)?
            .calendar
            .and_then(|calendar| self.calendars.view(calendar))
    }

    /// Calendar an assignment works to.
    ///
    /// A task calendar combined with a resource calendar yields the time both share;
    /// with only one of them that one applies, otherwise the task's effective
    /// calendar. Manually scheduled tasks stretch the result to the assignment dates.
    pub fn assignment_calendar(&self, id: AssignmentId) -> Option<CalendarView<'_>> {
        let assignment = self.assignments.get(&id)?;
        let task = self.tasks.get(&assignment.task)?;

        let task_calendar = task
            .calendar()
            .and_then(|calendar| self.calendars.get(calendar));
        let resource_calendar = assignment
            .resource
            .and_then(|resource| self.resources.get(&resource))
            .and_then(|resource| resource.calendar)
            .and_then(|calendar| self.calendars.get(calendar))
            .filter(|_| !task.ignore_resource_calendar);

        let view = match (task_calendar, resource_calendar) {
            (Some(primary), Some(other)) if primary.id() != other.id() => {
                CalendarView::combined(&self.calendars, primary, other)
            }
            (Some(calendar), _) | (None, Some(calendar)) => {
                CalendarView::new(&self.calendars, calendar)
            }
            (None, None) => self.task_calendar(task.id())?,
        };

        match (task.is_manually_scheduled(), assignment.start, assignment.finish) {
            (true, Some(start), Some(finish)) => {
                Some(CalendarView::manually_scheduled(view, start, finish))
            }
            _ => Some(view),
        }
    }

    // Slack

    pub fn start_slack(&self, id: TaskId) -> Option<Duration> {
        let task = self.tasks.get(&id)?;
        task.cache().get_or_insert_with(TaskField::StartSlack, || {
            self.slack_calculator.calculate_start_slack(self, task)
        })
    }

    pub fn finish_slack(&self, id: TaskId) -> Option<Duration> {
        let task = self.tasks.get(&id)?;
        task.cache().get_or_insert_with(TaskField::FinishSlack, || {
            self.slack_calculator.calculate_finish_slack(self, task)
        })
    }

    pub fn total_slack(&self, id: TaskId) -> Option<Duration> {
        let task = self.tasks.get(&id)?;
        task.cache().get_or_insert_with(TaskField::TotalSlack, || {
            self.slack_calculator.calculate_total_slack(self, task)
        })
    }

    /// Calculated on every call: it depends on the task's successors.
    pub fn free_slack(&self, id: TaskId) -> Option<Duration> {
        let task = self.tasks.get(&id)?;
        self.slack_calculator.calculate_free_slack(self, task)
    }
}
