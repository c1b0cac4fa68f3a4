use chrono::{Datelike, NaiveDate};
use std::collections::BTreeMap;

use crate::calendar::view::CalendarView;
use crate::calendar::week::{ALL_WEEKDAYS, WorkWeek};
use crate::calendar::{Calendar, CalendarException, CalendarId};
use crate::config::ProjectConfig;
use crate::error::{CalendarError, CalendarResult};

/// Project-wide calendar table. Parent links are resolved through it.
#[derive(Debug, Clone, Default)]
pub struct CalendarContainer {
    config: ProjectConfig,
    calendars: BTreeMap<CalendarId, Calendar>,
}

impl CalendarContainer {
    pub fn new(config: ProjectConfig) -> Self {
        Self {
            config,
            calendars: BTreeMap::new(),
        }
    }

    pub fn config(&self) -> &ProjectConfig {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut ProjectConfig {
        &mut self.config
    }

    pub fn len(&self) -> usize {
        self.calendars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.calendars.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Calendar> {
        self.calendars.values()
    }

    pub fn get(&self, id: CalendarId) -> Option<&Calendar> {
        self.calendars.get(&id)
    }

    pub fn get_mut(&mut self, id: CalendarId) -> Option<&mut Calendar> {
        self.calendars.get_mut(&id)
    }

    pub fn by_name(&self, name: &str) -> Option<&Calendar> {
        self.calendars.values().find(|calendar| calendar.name == name)
    }

    pub fn next_id(&self) -> CalendarId {
        CalendarId(self.calendars.keys().last().map_or(1, |id| id.0 + 1))
    }

    /// Inserts a calendar, validating any parent link it carries.
    pub fn add(&mut self, calendar: Calendar) -> CalendarResult<CalendarId> {
        let id = calendar.id();
        if self.calendars.contains_key(&id) {
            return Err(CalendarError::UnsupportedOperation(
                "a calendar with this unique ID already exists",
            ));
        }
        if let Some(parent) = calendar.parent() {
            self.check_parent(id, parent)?;
        }
        tracing::debug!(calendar = %id, name = %calendar.name, "added calendar");
        self.calendars.insert(id, calendar);
        Ok(id)
    }

    fn check_parent(&self, id: CalendarId, parent: CalendarId) -> CalendarResult<()> {
        if !self.calendars.contains_key(&parent) {
            return Err(CalendarError::UnknownCalendar(parent));
        }
        let mut current = Some(parent);
        while let Some(ancestor) = current {
            if ancestor == id {
                return Err(CalendarError::CyclicParent {
                    calendar: id,
                    parent,
                });
            }
            current = self.calendars.get(&ancestor).and_then(Calendar::parent);
        }
        Ok(())
    }

    /// Swaps in `calendar` for the entry with the same ID, keeping derived calendars attached.
    ///
    /// Returns the replaced calendar. The new parent link is validated like [`add`](Self::add).
    pub fn replace(&mut self, calendar: Calendar) -> CalendarResult<Calendar> {
        let id = calendar.id();
        if !self.calendars.contains_key(&id) {
            return Err(CalendarError::UnknownCalendar(id));
        }
        if let Some(parent) = calendar.parent() {
            self.check_parent(id, parent)?;
        }
        let previous = self
            .calendars
            .insert(id, calendar)
            .ok_or(CalendarError::UnknownCalendar(id))?;
        tracing::debug!(calendar = %id, "replaced calendar");
        Ok(previous)
    }

    /// Reparents `id`, rejecting links that would make the chain cyclic.
    pub fn set_parent(&mut self, id: CalendarId, parent: Option<CalendarId>) -> CalendarResult<()> {
        if !self.calendars.contains_key(&id) {
            return Err(CalendarError::UnknownCalendar(id));
        }
        if let Some(parent) = parent {
            self.check_parent(id, parent)?;
        }
        if let Some(calendar) = self.calendars.get_mut(&id) {
            calendar.set_parent_unchecked(parent);
        }
        tracing::debug!(calendar = %id, parent = ?parent, "calendar parent changed");
        Ok(())
    }

    /// Calendars whose parent is `id`.
    pub fn derived_calendars(&self, id: CalendarId) -> Vec<CalendarId> {
        self.calendars
            .values()
            .filter(|calendar| calendar.parent() == Some(id))
            .map(Calendar::id)
            .collect()
    }

    /// Removes a calendar and clears the parent link of every calendar derived from it.
    pub fn remove(&mut self, id: CalendarId) -> Option<Calendar> {
        let removed = self.calendars.remove(&id)?;
        for calendar in self.calendars.values_mut() {
            if calendar.parent() == Some(id) {
                tracing::debug!(
                    calendar = %calendar.id(),
                    parent = %id,
                    "detached derived calendar"
                );
                calendar.set_parent_unchecked(None);
            }
        }
        tracing::debug!(calendar = %id, "removed calendar");
        Some(removed)
    }

    pub fn view(&self, id: CalendarId) -> Option<CalendarView<'_>> {
        self.get(id).map(|calendar| CalendarView::new(self, calendar))
    }

    /// A standalone copy of `id` with the parent chain folded in.
    ///
    /// Base-week day types and hours are resolved through the chain. An
    /// ancestor's exceptions and scoped weeks are kept only on dates where every
    /// nearer calendar defers, so the copy answers `ranges` like the chain does.
    pub fn flatten(&self, id: CalendarId) -> Option<Calendar> {
        let source = self.get(id)?;
        if !source.is_derived() {
            return Some(source.clone());
        }
        let view = CalendarView::new(self, source);

        let mut flat = Calendar::new(source.id(), source.name.clone());
        flat.set_calendar_minutes_per_day(source.calendar_minutes_per_day());
        flat.set_calendar_minutes_per_week(source.calendar_minutes_per_week());
        flat.set_calendar_minutes_per_month(source.calendar_minutes_per_month());
        flat.set_calendar_minutes_per_year(source.calendar_minutes_per_year());

        let mut week = WorkWeek::new();
        for day in ALL_WEEKDAYS {
            let hours = view.hours(day);
            week.set_working_day(day, !hours.is_empty());
            week.set_hours(day, hours);
        }
        *flat.week_mut() = week;

        for work_week in source.work_weeks() {
            flat.add_work_week(work_week.clone());
        }
        merge_exceptions(&mut flat, source.exceptions());

        let chain = self.chain(source);
        for (depth, ancestor) in chain.iter().enumerate().skip(1) {
            let reached = |date: NaiveDate| !chain[..depth].iter().any(|c| decides(c, date));
            let inherited: Vec<CalendarException> = ancestor
                .exceptions()
                .iter()
                .flat_map(CalendarException::expanded_exceptions)
                .flat_map(|exception| {
                    let days = split_days(&exception);
                    if days.iter().all(|day| reached(day.from_date())) {
                        vec![exception]
                    } else {
                        days.into_iter().filter(|day| reached(day.from_date())).collect()
                    }
                })
                .collect();
            merge_exceptions(&mut flat, &inherited);
        }

        // Ancestor scoped weeks have no counterpart in the flat week; pin their dates.
        let scoped_dates: Vec<NaiveDate> = chain
            .iter()
            .skip(1)
            .flat_map(|ancestor| ancestor.work_weeks())
            .filter_map(|work_week| work_week.date_range.and_then(|range| range.bounds()))
            .flat_map(|(start, end)| start.iter_days().take_while(move |date| *date <= end))
            .collect();
        let pinned: Vec<CalendarException> = {
            let copy = CalendarView::new(self, &flat);
            scoped_dates
                .into_iter()
                .filter_map(|date| {
                    let hours = view.ranges(date);
                    (copy.ranges(date) != hours)
                        .then(|| CalendarException::single(date).with_hours(hours))
                })
                .collect()
        };
        for exception in pinned {
            if flat.exception_for(exception.from_date()).is_none() {
                flat.add_exception(exception);
            }
        }
        Some(flat)
    }

    /// `calendar` followed by its ancestors, nearest first.
    fn chain<'a>(&'a self, calendar: &'a Calendar) -> Vec<&'a Calendar> {
        let mut chain = vec![calendar];
        let mut current = calendar.parent().and_then(|parent| self.get(parent));
        while let Some(ancestor) = current {
            chain.push(ancestor);
            current = ancestor.parent().and_then(|parent| self.get(parent));
        }
        chain
    }
}

/// Whether `calendar` answers `date` itself instead of deferring to its parent.
fn decides(calendar: &Calendar, date: NaiveDate) -> bool {
    let day = date.weekday();
    calendar.exception_for(date).is_some()
        || calendar
            .work_week_for(date)
            .and_then(|week| week.resolved_hours(day))
            .is_some()
        || calendar.week().resolved_hours(day).is_some()
}

/// Adds `source` exceptions to `target`, letting `target`'s own exceptions win.
///
/// A source exception that collides with the target is split into single days
/// and only the non-colliding ones are added.
pub fn merge_exceptions(target: &mut Calendar, source: &[CalendarException]) {
    let existing: Vec<CalendarException> = target.expanded_exceptions().values().cloned().collect();
    let collides = |candidate: &CalendarException| existing.iter().any(|e| e.overlaps(candidate));

    for exception in source {
        let expanded = exception.expanded_exceptions();
        if expanded.iter().any(&collides) {
            for single in expanded.iter().flat_map(split_days).filter(|e| !collides(e)) {
                target.add_exception(single);
            }
        } else {
            target.add_exception(exception.clone());
        }
    }
}

fn split_days(exception: &CalendarException) -> Vec<CalendarException> {
    exception
        .from_date()
        .iter_days()
        .take_while(|date| *date <= exception.to_date())
        .map(|date| {
            let mut single = CalendarException::single(date).with_hours(exception.hours().to_vec());
            if let Some(name) = exception.name() {
                single = single.with_name(name);
            }
            single
        })
        .collect()
}
