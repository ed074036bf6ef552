//! In-process calendar store.
//!
//! Backs the integration tests and lets embedders run the analytics
//! pipeline over events they already hold in memory. Failure injection
//! switches make the degraded and fatal paths reachable.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

use super::{Calendar, CalendarDataSource, Event, EventQuery, NewEvent};
use crate::error::DataSourceError;

#[derive(Debug, Default)]
struct Store {
    calendars: BTreeMap<String, Vec<Calendar>>,
    events: BTreeMap<(String, String), Vec<Event>>,
    failing_calendars: BTreeSet<String>,
    fail_listing: bool,
    create_budget: Option<usize>,
    next_id: u64,
    calls: usize,
}

/// [`CalendarDataSource`] holding calendars and events in memory, keyed by
/// identity.
#[derive(Debug, Default)]
pub struct InMemoryCalendar {
    store: Mutex<Store>,
}

impl InMemoryCalendar {
    pub fn new() -> Self {
        Self::default()
    }

    fn store(&self) -> MutexGuard<'_, Store> {
        self.store.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn add_calendar(&self, identity: &str, calendar: Calendar) {
        self.store()
            .calendars
            .entry(identity.to_string())
            .or_default()
            .push(calendar);
    }

    /// Store `event` under `calendar_id`, overwriting its `calendar_id` field.
    pub fn add_event(&self, identity: &str, calendar_id: &str, event: Event) {
        let event = event.with_calendar(calendar_id);
        self.store()
            .events
            .entry((identity.to_string(), calendar_id.to_string()))
            .or_default()
            .push(event);
    }

    /// Snapshot of the events stored for one calendar.
    pub fn events(&self, identity: &str, calendar_id: &str) -> Vec<Event> {
        self.store()
            .events
            .get(&(identity.to_string(), calendar_id.to_string()))
            .cloned()
            .unwrap_or_default()
    }

    /// Make every event listing for `calendar_id` fail.
    pub fn fail_events_for(&self, calendar_id: &str) {
        self.store().failing_calendars.insert(calendar_id.to_string());
    }

    /// Make calendar enumeration fail.
    pub fn fail_calendar_listing(&self) {
        self.store().fail_listing = true;
    }

    /// Allow `n` more successful creates, then reject the rest.
    pub fn fail_creates_after(&self, n: usize) {
        self.store().create_budget = Some(n);
    }

    /// Number of data source calls served so far.
    pub fn call_count(&self) -> usize {
        self.store().calls
    }
}

impl CalendarDataSource for InMemoryCalendar {
    fn list_calendars(&self, identity: &str) -> Result<Vec<Calendar>, DataSourceError> {
        let mut store = self.store();
        store.calls += 1;
        if store.fail_listing {
            return Err(DataSourceError::Unavailable("calendar listing disabled".into()));
        }
        Ok(store.calendars.get(identity).cloned().unwrap_or_default())
    }

    fn list_events(
        &self,
        identity: &str,
        calendar_id: &str,
        query: &EventQuery,
    ) -> Result<Vec<Event>, DataSourceError> {
        let mut store = self.store();
        store.calls += 1;
        if store.failing_calendars.contains(calendar_id) {
            return Err(DataSourceError::Unavailable(format!(
                "calendar {calendar_id} unreachable"
            )));
        }

        let mut matched: Vec<Event> = store
            .events
            .get(&(identity.to_string(), calendar_id.to_string()))
            .map(|events| {
                events
                    .iter()
                    .filter(|e| e.overlaps(query.start, query.end))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        matched.sort_by_key(|e| e.start);
        matched.truncate(query.limit);
        Ok(matched)
    }

    fn get_event(
        &self,
        identity: &str,
        calendar_id: &str,
        event_id: &str,
    ) -> Result<Event, DataSourceError> {
        let mut store = self.store();
        store.calls += 1;
        store
            .events
            .get(&(identity.to_string(), calendar_id.to_string()))
            .and_then(|events| events.iter().find(|e| e.id == event_id))
            .cloned()
            .ok_or_else(|| DataSourceError::NotFound {
                kind: "event".into(),
                id: event_id.to_string(),
            })
    }

    fn create_event(
        &self,
        identity: &str,
        calendar_id: &str,
        event: &NewEvent,
    ) -> Result<Event, DataSourceError> {
        let mut store = self.store();
        store.calls += 1;
        match store.create_budget {
            Some(0) => return Err(DataSourceError::Rejected("create quota exhausted".into())),
            Some(ref mut left) => *left -= 1,
            None => {}
        }

        store.next_id += 1;
        let mut created = Event::new(
            format!("{calendar_id}-evt-{}", store.next_id),
            event.title.clone(),
            event.start,
            event.end,
        )
        .with_calendar(calendar_id);
        created.busy = event.busy;
        created.recurrence = event.recurrence.clone();

        store
            .events
            .entry((identity.to_string(), calendar_id.to_string()))
            .or_default()
            .push(created.clone());
        Ok(created)
    }
}
