//! External collaborator interfaces.
//!
//! The interpreter core talks to three live services — a task store, a
//! calendar store and a mail transport — plus a content drafter. Each is a
//! trait object so handlers can be exercised against in-memory fakes.
//! Results are typed records; handlers pattern-match instead of probing
//! response dictionaries.

pub mod calendar;
pub mod drafter;
pub mod gmail;
pub mod google;
pub mod tasks;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};

use crate::error::Result;

// ============================================================================
// Records
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskStatus {
    NeedsAction,
    Completed,
}

/// A task snapshot from the external store.
#[derive(Debug, Clone)]
pub struct TaskRecord {
    pub id: String,
    pub title: String,
    pub status: TaskStatus,
    pub due: Option<DateTime<Utc>>,
    pub list: String,
}

/// A calendar event snapshot. `title` already falls back through the
/// store's summary field; `start` is None for malformed payloads.
#[derive(Debug, Clone)]
pub struct EventRecord {
    pub id: String,
    pub title: String,
    pub start: Option<DateTime<Utc>>,
    pub all_day: bool,
}

#[derive(Debug, Clone)]
pub struct CreatedTask {
    pub title: String,
    pub list: String,
    pub due: Option<NaiveDateTime>,
}

#[derive(Debug, Clone)]
pub struct CreatedEvent {
    pub title: String,
    pub start: NaiveDateTime,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TaskStats {
    pub total: usize,
    pub completed: usize,
    pub pending: usize,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct CalendarStats {
    pub events_today: usize,
    pub events_tomorrow: usize,
    pub upcoming_week: usize,
}

/// Anything the fuzzy resolver can match against.
pub trait Candidate {
    fn display_title(&self) -> &str;
}

impl Candidate for TaskRecord {
    fn display_title(&self) -> &str {
        &self.title
    }
}

impl Candidate for EventRecord {
    fn display_title(&self) -> &str {
        &self.title
    }
}

// ============================================================================
// Collaborator traits
// ============================================================================

#[async_trait]
pub trait TaskStore: Send + Sync {
    /// Create a task, placing it on `list` (created on demand).
    async fn create(
        &self,
        title: &str,
        list: &str,
        due: Option<NaiveDateTime>,
    ) -> Result<CreatedTask>;

    async fn list_all(&self) -> Result<Vec<TaskRecord>>;

    /// Mark the task with this exact title completed; not-found if absent.
    async fn complete(&self, title: &str) -> Result<()>;

    /// Delete the task with this exact title; not-found if absent.
    async fn delete(&self, title: &str) -> Result<()>;

    /// Move the task's due date; not-found if absent.
    async fn update_due(&self, title: &str, due: NaiveDateTime) -> Result<()>;

    async fn search(&self, query: &str) -> Result<Vec<TaskRecord>>;

    async fn statistics(&self) -> Result<TaskStats>;
}

#[async_trait]
pub trait CalendarStore: Send + Sync {
    async fn create(&self, title: &str, start: NaiveDateTime) -> Result<CreatedEvent>;

    async fn list_upcoming(&self, days: i64) -> Result<Vec<EventRecord>>;

    /// Delete the event with this exact title; not-found if absent.
    async fn delete(&self, title: &str) -> Result<()>;

    /// Move the event with this exact title; not-found if absent.
    async fn reschedule(&self, title: &str, new_start: NaiveDateTime) -> Result<()>;

    async fn search(&self, query: &str) -> Result<Vec<EventRecord>>;

    async fn statistics(&self) -> Result<CalendarStats>;
}

#[async_trait]
pub trait MailTransport: Send + Sync {
    async fn send(
        &self,
        to: &[String],
        cc: &[String],
        bcc: &[String],
        subject: &str,
        body: &str,
    ) -> Result<()>;
}

#[async_trait]
pub trait ContentDrafter: Send + Sync {
    /// Draft an email body for a topic. Callers substitute the fallback
    /// template on error — a drafter failure never reaches the user.
    async fn draft(&self, topic: &str) -> Result<String>;
}
