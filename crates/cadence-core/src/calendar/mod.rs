//! Calendar data model and the data source abstraction.
//!
//! The analytics components never talk to a provider directly. They consume a
//! [`CalendarDataSource`] and aggregate its results with [`collect_events`].

mod memory;

pub use memory::InMemoryCalendar;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::context::CallContext;
use crate::error::{CoreError, DataSourceError, Result};

/// Event status as reported by the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventStatus {
    #[default]
    Confirmed,
    Tentative,
    Cancelled,
}

/// A participant's reply to an invitation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RsvpStatus {
    Yes,
    No,
    Maybe,
    #[default]
    NoReply,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub status: RsvpStatus,
}

impl Participant {
    pub fn new(email: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            name: None,
            status: RsvpStatus::default(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_status(mut self, status: RsvpStatus) -> Self {
        self.status = status;
        self
    }
}

/// A calendar event. Read-only to the analytics core.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: String,
    #[serde(default)]
    pub calendar_id: String,
    pub title: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    #[serde(default)]
    pub status: EventStatus,
    #[serde(default)]
    pub participants: Vec<Participant>,
    /// IANA timezone tag of the start time, if the provider reported one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,
    #[serde(default = "default_busy")]
    pub busy: bool,
    #[serde(default)]
    pub read_only: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub recurrence: Vec<String>,
}

fn default_busy() -> bool {
    true
}

impl Event {
    /// Create a confirmed event with no participants.
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            calendar_id: String::new(),
            title: title.into(),
            start,
            end,
            status: EventStatus::Confirmed,
            participants: Vec::new(),
            timezone: None,
            busy: true,
            read_only: false,
            recurrence: Vec::new(),
        }
    }

    pub fn with_status(mut self, status: EventStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_participants<I, S>(mut self, emails: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.participants = emails.into_iter().map(Participant::new).collect();
        self
    }

    pub fn with_timezone(mut self, tz: impl Into<String>) -> Self {
        self.timezone = Some(tz.into());
        self
    }

    pub fn with_calendar(mut self, calendar_id: impl Into<String>) -> Self {
        self.calendar_id = calendar_id.into();
        self
    }

    pub fn read_only(mut self) -> Self {
        self.read_only = true;
        self
    }

    pub fn is_confirmed(&self) -> bool {
        self.status == EventStatus::Confirmed
    }

    pub fn is_cancelled(&self) -> bool {
        self.status == EventStatus::Cancelled
    }

    /// Scheduled length in whole minutes.
    pub fn duration_minutes(&self) -> i64 {
        (self.end - self.start).num_minutes()
    }

    /// Timezone tag, `"UTC"` when absent.
    pub fn timezone_or_utc(&self) -> &str {
        self.timezone.as_deref().unwrap_or("UTC")
    }

    /// Half-open overlap with `[start, end)`.
    pub fn overlaps(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        self.start < end && self.end > start
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Calendar {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub is_primary: bool,
    #[serde(default)]
    pub read_only: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,
}

impl Calendar {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            is_primary: false,
            read_only: false,
            timezone: None,
        }
    }

    pub fn primary(mut self) -> Self {
        self.is_primary = true;
        self
    }
}

/// Range query against one calendar. Matches events overlapping `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventQuery {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    /// Upper bound on results per calendar.
    pub limit: usize,
}

impl EventQuery {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>, limit: usize) -> Self {
        Self { start, end, limit }
    }
}

/// Request to create an event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewEvent {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub busy: bool,
    #[serde(default)]
    pub recurrence: Vec<String>,
}

/// External calendar provider consumed by the analytics core.
///
/// Implementations are expected to bound `list_events` results by
/// [`EventQuery::limit`].
pub trait CalendarDataSource: Send + Sync {
    fn list_calendars(&self, identity: &str) -> Result<Vec<Calendar>, DataSourceError>;

    fn list_events(
        &self,
        identity: &str,
        calendar_id: &str,
        query: &EventQuery,
    ) -> Result<Vec<Event>, DataSourceError>;

    fn get_event(
        &self,
        identity: &str,
        calendar_id: &str,
        event_id: &str,
    ) -> Result<Event, DataSourceError>;

    fn create_event(
        &self,
        identity: &str,
        calendar_id: &str,
        event: &NewEvent,
    ) -> Result<Event, DataSourceError>;
}

/// Fetch events from every calendar of `identity`, sorted by `(start, id)`.
///
/// Failing to enumerate calendars is fatal. A failed fetch for a single
/// calendar is logged and that calendar contributes no events.
pub fn collect_events(
    ctx: &CallContext,
    source: &dyn CalendarDataSource,
    identity: &str,
    query: &EventQuery,
) -> Result<Vec<Event>> {
    ctx.check()?;
    let calendars = source
        .list_calendars(identity)
        .map_err(|source| CoreError::CalendarEnumeration {
            identity: identity.to_string(),
            source,
        })?;

    let mut events = Vec::new();
    for calendar in &calendars {
        ctx.check()?;
        match source.list_events(identity, &calendar.id, query) {
            Ok(batch) => events.extend(batch),
            Err(err) => {
                warn!(
                    calendar = %calendar.id,
                    error = %err,
                    "skipping calendar after fetch failure"
                );
            }
        }
    }

    events.sort_by(|a, b| a.start.cmp(&b.start).then_with(|| a.id.cmp(&b.id)));
    debug!(
        calendars = calendars.len(),
        events = events.len(),
        "collected calendar events"
    );
    Ok(events)
}

/// Calendar that new events should be written to: the first primary
/// calendar, else the first one listed.
pub fn primary_calendar(
    ctx: &CallContext,
    source: &dyn CalendarDataSource,
    identity: &str,
) -> Result<Calendar> {
    ctx.check()?;
    let mut calendars = source
        .list_calendars(identity)
        .map_err(|source| CoreError::CalendarEnumeration {
            identity: identity.to_string(),
            source,
        })?;

    if calendars.is_empty() {
        return Err(CoreError::NoCalendars {
            identity: identity.to_string(),
        });
    }
    let index = calendars.iter().position(|c| c.is_primary).unwrap_or(0);
    Ok(calendars.swap_remove(index))
}
