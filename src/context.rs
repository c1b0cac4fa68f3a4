use serde::{Deserialize, Serialize};
use std::cell::Cell;
use std::rc::Rc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityKind {
    Calendar,
    Task,
    Resource,
    Assignment,
    Relation,
}

/// Unique-ID sequences shared by every schedule in one project group.
///
/// Single-threaded by construction: share it with `Rc`, not across threads.
#[derive(Debug, Default)]
pub struct ProjectContext {
    calendars: Cell<u32>,
    tasks: Cell<u32>,
    resources: Cell<u32>,
    assignments: Cell<u32>,
    relations: Cell<u32>,
}

impl ProjectContext {
    pub fn new() -> Rc<Self> {
        Rc::new(Self::default())
    }

    fn sequence(&self, kind: EntityKind) -> &Cell<u32> {
        match kind {
            EntityKind::Calendar => &self.calendars,
            EntityKind::Task => &self.tasks,
            EntityKind::Resource => &self.resources,
            EntityKind::Assignment => &self.assignments,
            EntityKind::Relation => &self.relations,
        }
    }

    /// Allocates the next ID for `kind`; the first ID handed out is 1.
    pub fn next_id(&self, kind: EntityKind) -> u32 {
        let cell = self.sequence(kind);
        let next = cell.get() + 1;
        cell.set(next);
        next
    }

    /// Records an externally assigned ID so later allocations never collide with it.
    pub fn reserve(&self, kind: EntityKind, id: u32) {
        let cell = self.sequence(kind);
        if id > cell.get() {
            cell.set(id);
        }
    }

    pub fn current(&self, kind: EntityKind) -> u32 {
        self.sequence(kind).get()
    }
}
