//! Directive interpretation pipeline.
//!
//! Orchestrates: split → classify → extract → resolve → collaborator call.
//!
//! `Assistant::process` is the single entry point the shell calls. It
//! always returns a response string; every internal failure is rendered
//! at the routing boundary, so one bad directive never takes down the
//! loop or the directives after it.

pub mod classifier;
pub mod email;
pub mod extract;
pub mod resolver;
pub mod router;
pub mod splitter;
pub mod timeparse;

use std::sync::Arc;

use chrono::{Local, NaiveDateTime};
use parking_lot::Mutex;

use crate::cache::CacheSlot;
use crate::config::{AssistantConfig, Capability};
use crate::error::{AssistantError, Result};
use crate::scheduler::EmailScheduler;
use crate::services::{
    CalendarStore, ContentDrafter, EventRecord, MailTransport, TaskRecord, TaskStore,
};
use email::Confirmer;

/// The interpreter core. One instance per interactive session.
pub struct Assistant {
    pub(crate) tasks: Capability<dyn TaskStore>,
    pub(crate) calendar: Capability<dyn CalendarStore>,
    pub(crate) mail: Capability<dyn MailTransport>,
    pub(crate) drafter: Arc<dyn ContentDrafter>,
    pub(crate) scheduler: Arc<EmailScheduler>,
    pub(crate) confirmer: Arc<dyn Confirmer>,
    pub(crate) config: AssistantConfig,
    task_cache: Mutex<CacheSlot<Vec<TaskRecord>>>,
    event_cache: Mutex<CacheSlot<Vec<EventRecord>>>,
}

impl Assistant {
    pub fn new(
        tasks: Capability<dyn TaskStore>,
        calendar: Capability<dyn CalendarStore>,
        mail: Capability<dyn MailTransport>,
        drafter: Arc<dyn ContentDrafter>,
        scheduler: Arc<EmailScheduler>,
        confirmer: Arc<dyn Confirmer>,
        config: AssistantConfig,
    ) -> Self {
        let ttl = config.cache_ttl;
        Self {
            tasks,
            calendar,
            mail,
            drafter,
            scheduler,
            confirmer,
            config,
            task_cache: Mutex::new(CacheSlot::new(ttl)),
            event_cache: Mutex::new(CacheSlot::new(ttl)),
        }
    }

    /// Interpret one utterance against the wall clock.
    pub async fn process(&self, utterance: &str) -> String {
        self.process_at(utterance, Local::now().naive_local()).await
    }

    /// Interpret one utterance against an explicit reference clock.
    /// Directives run independently and in order; each failure stays
    /// confined to its own response line.
    pub async fn process_at(&self, utterance: &str, now: NaiveDateTime) -> String {
        let directives = splitter::split_directives(utterance);

        if directives.len() == 1 {
            return router::route(self, &directives[0], now).await;
        }

        let mut responses = Vec::with_capacity(directives.len());
        for directive in &directives {
            log::debug!("directive: {}", directive);
            responses.push(router::route(self, directive, now).await);
        }
        responses.join("\n")
    }

    pub(crate) fn task_store(&self) -> Result<&Arc<dyn TaskStore>> {
        self.tasks
            .get()
            .map_err(|reason| AssistantError::Unavailable("Tasks", reason.to_string()))
    }

    pub(crate) fn calendar_store(&self) -> Result<&Arc<dyn CalendarStore>> {
        self.calendar
            .get()
            .map_err(|reason| AssistantError::Unavailable("Calendar", reason.to_string()))
    }

    pub(crate) fn mail_transport(&self) -> Result<&Arc<dyn MailTransport>> {
        self.mail
            .get()
            .map_err(|reason| AssistantError::Unavailable("Email", reason.to_string()))
    }

    /// The full task list, served from the short-TTL cache when fresh.
    pub(crate) async fn cached_tasks(&self) -> Result<Vec<TaskRecord>> {
        if let Some(hit) = self.task_cache.lock().get() {
            return Ok(hit.clone());
        }
        let fetched = self.task_store()?.list_all().await?;
        self.task_cache.lock().put(fetched.clone());
        Ok(fetched)
    }

    /// Upcoming events, served from the short-TTL cache when fresh.
    pub(crate) async fn cached_events(&self) -> Result<Vec<EventRecord>> {
        if let Some(hit) = self.event_cache.lock().get() {
            return Ok(hit.clone());
        }
        let fetched = self
            .calendar_store()?
            .list_upcoming(self.config.upcoming_days)
            .await?;
        self.event_cache.lock().put(fetched.clone());
        Ok(fetched)
    }

    /// Drop cached tasks after a write so the next read is fresh.
    pub(crate) fn invalidate_tasks(&self) {
        self.task_cache.lock().invalidate();
    }

    /// Drop cached events after a write so the next read is fresh.
    pub(crate) fn invalidate_events(&self) {
        self.event_cache.lock().invalidate();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use chrono::{NaiveDate, TimeZone, Utc};

    use crate::services::drafter::TemplateDrafter;
    use crate::services::{
        CalendarStats, CreatedEvent, CreatedTask, TaskStats, TaskStatus,
    };

    struct FakeTasks {
        tasks: Mutex<Vec<TaskRecord>>,
        list_calls: AtomicUsize,
    }

    impl FakeTasks {
        fn new(titles: &[&str]) -> Arc<Self> {
            let tasks = titles
                .iter()
                .enumerate()
                .map(|(i, title)| TaskRecord {
                    id: format!("t{}", i),
                    title: title.to_string(),
                    status: TaskStatus::NeedsAction,
                    due: None,
                    list: "My Tasks".to_string(),
                })
                .collect();
            Arc::new(Self {
                tasks: Mutex::new(tasks),
                list_calls: AtomicUsize::new(0),
            })
        }

        fn titles(&self) -> Vec<String> {
            self.tasks.lock().iter().map(|t| t.title.clone()).collect()
        }

        fn status_of(&self, title: &str) -> Option<TaskStatus> {
            self.tasks
                .lock()
                .iter()
                .find(|t| t.title == title)
                .map(|t| t.status)
        }

        fn due_of(&self, title: &str) -> Option<chrono::DateTime<Utc>> {
            self.tasks
                .lock()
                .iter()
                .find(|t| t.title == title)
                .and_then(|t| t.due)
        }
    }

    #[async_trait]
    impl TaskStore for FakeTasks {
        async fn create(
            &self,
            title: &str,
            list: &str,
            due: Option<chrono::NaiveDateTime>,
        ) -> Result<CreatedTask> {
            let mut tasks = self.tasks.lock();
            let next = tasks.len();
            tasks.push(TaskRecord {
                id: format!("t{}", next),
                title: title.to_string(),
                status: TaskStatus::NeedsAction,
                due: due.map(|d| Utc.from_utc_datetime(&d)),
                list: list.to_string(),
            });
            Ok(CreatedTask {
                title: title.to_string(),
                list: list.to_string(),
                due,
            })
        }

        async fn list_all(&self) -> Result<Vec<TaskRecord>> {
            self.list_calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.tasks.lock().clone())
        }

        async fn complete(&self, title: &str) -> Result<()> {
            let mut tasks = self.tasks.lock();
            match tasks.iter_mut().find(|t| t.title == title) {
                Some(task) => {
                    task.status = TaskStatus::Completed;
                    Ok(())
                }
                None => Err(AssistantError::NotFound {
                    kind: "Task",
                    query: title.to_string(),
                }),
            }
        }

        async fn delete(&self, title: &str) -> Result<()> {
            let mut tasks = self.tasks.lock();
            let before = tasks.len();
            tasks.retain(|t| t.title != title);
            if tasks.len() == before {
                return Err(AssistantError::NotFound {
                    kind: "Task",
                    query: title.to_string(),
                });
            }
            Ok(())
        }

        async fn update_due(&self, title: &str, due: chrono::NaiveDateTime) -> Result<()> {
            let mut tasks = self.tasks.lock();
            match tasks.iter_mut().find(|t| t.title == title) {
                Some(task) => {
                    task.due = Some(Utc.from_utc_datetime(&due));
                    Ok(())
                }
                None => Err(AssistantError::NotFound {
                    kind: "Task",
                    query: title.to_string(),
                }),
            }
        }

        async fn search(&self, query: &str) -> Result<Vec<TaskRecord>> {
            let needle = query.to_lowercase();
            Ok(self
                .tasks
                .lock()
                .iter()
                .filter(|t| t.title.to_lowercase().contains(&needle))
                .cloned()
                .collect())
        }

        async fn statistics(&self) -> Result<TaskStats> {
            let tasks = self.tasks.lock();
            let completed = tasks
                .iter()
                .filter(|t| t.status == TaskStatus::Completed)
                .count();
            Ok(TaskStats {
                total: tasks.len(),
                completed,
                pending: tasks.len() - completed,
            })
        }
    }

    struct FakeCalendar {
        events: Mutex<Vec<EventRecord>>,
        list_calls: AtomicUsize,
    }

    impl FakeCalendar {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                events: Mutex::new(Vec::new()),
                list_calls: AtomicUsize::new(0),
            })
        }

        fn starts(&self) -> Vec<Option<chrono::DateTime<Utc>>> {
            self.events.lock().iter().map(|e| e.start).collect()
        }
    }

    #[async_trait]
    impl CalendarStore for FakeCalendar {
        async fn create(
            &self,
            title: &str,
            start: chrono::NaiveDateTime,
        ) -> Result<CreatedEvent> {
            let mut events = self.events.lock();
            let next = events.len();
            events.push(EventRecord {
                id: format!("e{}", next),
                title: title.to_string(),
                start: Some(Utc.from_utc_datetime(&start)),
                all_day: false,
            });
            Ok(CreatedEvent {
                title: title.to_string(),
                start,
            })
        }

        async fn list_upcoming(&self, _days: i64) -> Result<Vec<EventRecord>> {
            self.list_calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.events.lock().clone())
        }

        async fn delete(&self, title: &str) -> Result<()> {
            let mut events = self.events.lock();
            let before = events.len();
            events.retain(|e| e.title != title);
            if events.len() == before {
                return Err(AssistantError::NotFound {
                    kind: "Event",
                    query: title.to_string(),
                });
            }
            Ok(())
        }

        async fn reschedule(&self, title: &str, new_start: chrono::NaiveDateTime) -> Result<()> {
            let mut events = self.events.lock();
            match events.iter_mut().find(|e| e.title == title) {
                Some(event) => {
                    event.start = Some(Utc.from_utc_datetime(&new_start));
                    Ok(())
                }
                None => Err(AssistantError::NotFound {
                    kind: "Event",
                    query: title.to_string(),
                }),
            }
        }

        async fn search(&self, query: &str) -> Result<Vec<EventRecord>> {
            let needle = query.to_lowercase();
            Ok(self
                .events
                .lock()
                .iter()
                .filter(|e| e.title.to_lowercase().contains(&needle))
                .cloned()
                .collect())
        }

        async fn statistics(&self) -> Result<CalendarStats> {
            Ok(CalendarStats::default())
        }
    }

    struct FakeMailer {
        sends: Mutex<Vec<(Vec<String>, String, String)>>,
    }

    impl FakeMailer {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                sends: Mutex::new(Vec::new()),
            })
        }

        fn send_count(&self) -> usize {
            self.sends.lock().len()
        }

        fn last_body(&self) -> Option<String> {
            self.sends.lock().last().map(|(_, _, body)| body.clone())
        }
    }

    #[async_trait]
    impl MailTransport for FakeMailer {
        async fn send(
            &self,
            to: &[String],
            _cc: &[String],
            _bcc: &[String],
            subject: &str,
            body: &str,
        ) -> Result<()> {
            self.sends
                .lock()
                .push((to.to_vec(), subject.to_string(), body.to_string()));
            Ok(())
        }
    }

    struct FailingDrafter;

    #[async_trait]
    impl crate::services::ContentDrafter for FailingDrafter {
        async fn draft(&self, _topic: &str) -> Result<String> {
            Err(AssistantError::Unavailable(
                "Drafter",
                "model offline".to_string(),
            ))
        }
    }

    struct FixedConfirmer(bool);

    impl Confirmer for FixedConfirmer {
        fn confirm(&self, _prompt: &str) -> bool {
            self.0
        }
    }

    struct Fixture {
        tasks: Arc<FakeTasks>,
        calendar: Arc<FakeCalendar>,
        mailer: Arc<FakeMailer>,
        assistant: Assistant,
    }

    fn fixture_with(titles: &[&str], confirm: bool) -> Fixture {
        let tasks = FakeTasks::new(titles);
        let calendar = FakeCalendar::new();
        let mailer = FakeMailer::new();

        let tasks_cap: Capability<dyn TaskStore> = Capability::Available(tasks.clone());
        let calendar_cap: Capability<dyn CalendarStore> = Capability::Available(calendar.clone());
        let mail_cap: Capability<dyn MailTransport> = Capability::Available(mailer.clone());
        let scheduler = EmailScheduler::new(mailer.clone());

        let assistant = Assistant::new(
            tasks_cap,
            calendar_cap,
            mail_cap,
            Arc::new(TemplateDrafter),
            scheduler,
            Arc::new(FixedConfirmer(confirm)),
            AssistantConfig::default(),
        );
        Fixture {
            tasks,
            calendar,
            mailer,
            assistant,
        }
    }

    fn fixture(titles: &[&str]) -> Fixture {
        fixture_with(titles, true)
    }

    // 2026-08-19 is a Wednesday.
    fn wednesday_noon() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 8, 19)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
    }

    #[tokio::test]
    async fn test_create_event_resolves_weekday_and_clock() {
        let fx = fixture(&[]);
        let response = fx
            .assistant
            .process_at("create event team sync on friday at 3pm", wednesday_noon())
            .await;
        assert_eq!(response, "Event created: Team Sync on Friday, Aug 21 at 03:00 PM");

        let expected = NaiveDate::from_ymd_opt(2026, 8, 21)
            .unwrap()
            .and_hms_opt(15, 0, 0)
            .unwrap();
        assert_eq!(fx.calendar.starts(), vec![Some(Utc.from_utc_datetime(&expected))]);
    }

    #[tokio::test]
    async fn test_create_task_due_defaults_to_morning() {
        let fx = fixture(&[]);
        let response = fx
            .assistant
            .process_at("create task pay rent on friday", wednesday_noon())
            .await;
        assert_eq!(response, "Task created: Pay Rent");

        // No explicit clock: tasks land at 09:00, not the event default.
        let expected = NaiveDate::from_ymd_opt(2026, 8, 21)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap();
        assert_eq!(
            fx.tasks.due_of("Pay Rent"),
            Some(Utc.from_utc_datetime(&expected))
        );
    }

    #[tokio::test]
    async fn test_complete_task_resolves_case_insensitively() {
        let fx = fixture(&["Buy groceries", "Walk the dog"]);
        let response = fx
            .assistant
            .process_at("complete task buy groceries", wednesday_noon())
            .await;
        assert_eq!(response, "Completed: Buy groceries");
        assert_eq!(
            fx.tasks.status_of("Buy groceries"),
            Some(TaskStatus::Completed)
        );
    }

    #[tokio::test]
    async fn test_unresolved_delete_renders_not_found() {
        let fx = fixture(&["Dentist appointment"]);
        let response = fx
            .assistant
            .process_at("delete task submarine races", wednesday_noon())
            .await;
        // Not-found is a resolution outcome, so no "Error:" prefix.
        assert_eq!(response, "Task 'submarine races' not found");
        assert_eq!(fx.tasks.titles(), vec!["Dentist appointment"]);
    }

    #[tokio::test]
    async fn test_reads_within_ttl_hit_store_once_and_writes_invalidate() {
        let fx = fixture(&["Pay rent"]);
        let now = wednesday_noon();

        fx.assistant.process_at("show tasks", now).await;
        fx.assistant.process_at("show tasks", now).await;
        assert_eq!(fx.tasks.list_calls.load(Ordering::SeqCst), 1);

        let response = fx.assistant.process_at("create task buy milk", now).await;
        assert_eq!(response, "Task created: Buy Milk");

        let listing = fx.assistant.process_at("show tasks", now).await;
        assert_eq!(fx.tasks.list_calls.load(Ordering::SeqCst), 2);
        assert!(listing.contains("[ ] Buy Milk"));
    }

    #[tokio::test]
    async fn test_multi_directive_isolates_failures() {
        let tasks = FakeTasks::new(&[]);
        let mailer = FakeMailer::new();
        let tasks_cap: Capability<dyn TaskStore> = Capability::Available(tasks.clone());
        let calendar_cap: Capability<dyn CalendarStore> =
            Capability::Unavailable("no account connected".to_string());
        let mail_cap: Capability<dyn MailTransport> = Capability::Available(mailer.clone());
        let scheduler = EmailScheduler::new(mailer);
        let assistant = Assistant::new(
            tasks_cap,
            calendar_cap,
            mail_cap,
            Arc::new(TemplateDrafter),
            scheduler,
            Arc::new(FixedConfirmer(true)),
            AssistantConfig::default(),
        );

        let response = assistant
            .process_at("show calendar and show tasks", wednesday_noon())
            .await;
        let lines: Vec<&str> = response.lines().collect();
        assert_eq!(
            lines[0],
            "Error: Calendar not available: no account connected"
        );
        assert_eq!(lines[1], "No pending tasks");
    }

    #[tokio::test]
    async fn test_email_without_schedule_sends_immediately() {
        let fx = fixture(&[]);
        let response = fx
            .assistant
            .process_at(
                "send email to alice@example.com about the budget report",
                wednesday_noon(),
            )
            .await;
        assert_eq!(response, "Email sent successfully! (CC: none)");
        assert_eq!(fx.mailer.send_count(), 1);
        assert_eq!(fx.assistant.scheduler.pending_count(), 0);
    }

    #[tokio::test]
    async fn test_failing_drafter_falls_back_to_template() {
        let tasks = FakeTasks::new(&[]);
        let calendar = FakeCalendar::new();
        let mailer = FakeMailer::new();
        let tasks_cap: Capability<dyn TaskStore> = Capability::Available(tasks);
        let calendar_cap: Capability<dyn CalendarStore> = Capability::Available(calendar);
        let mail_cap: Capability<dyn MailTransport> = Capability::Available(mailer.clone());
        let scheduler = EmailScheduler::new(mailer.clone());
        let assistant = Assistant::new(
            tasks_cap,
            calendar_cap,
            mail_cap,
            Arc::new(FailingDrafter),
            scheduler,
            Arc::new(FixedConfirmer(true)),
            AssistantConfig::default(),
        );

        let response = assistant
            .process_at(
                "send email to alice@example.com about the budget report",
                wednesday_noon(),
            )
            .await;
        assert_eq!(response, "Email sent successfully! (CC: none)");

        let body = mailer.last_body().unwrap();
        assert!(body.starts_with("Dear [Recipient],"));
        assert!(body.ends_with("Best regards,\n[Your Name]"));
    }

    #[tokio::test]
    async fn test_email_cancellation_touches_nothing() {
        let fx = fixture_with(&[], false);
        let response = fx
            .assistant
            .process_at(
                "send email to alice@example.com about the budget report",
                wednesday_noon(),
            )
            .await;
        assert_eq!(response, "Email cancelled");
        assert_eq!(fx.mailer.send_count(), 0);
        assert_eq!(fx.assistant.scheduler.pending_count(), 0);
    }

    #[tokio::test]
    async fn test_email_with_clock_is_enqueued_then_flushed() {
        let fx = fixture(&[]);
        let now = wednesday_noon();
        let response = fx
            .assistant
            .process_at("send email to alice@example.com about the budget at 6pm", now)
            .await;
        assert_eq!(response, "Email scheduled for 2026-08-19 18:00 (CC: none)");
        assert_eq!(fx.mailer.send_count(), 0);
        assert_eq!(fx.assistant.scheduler.pending_count(), 1);

        let due = now.date().and_hms_opt(19, 0, 0).unwrap();
        let (sent, failed) = fx.assistant.scheduler.flush_due(due).await;
        assert_eq!((sent, failed), (1, 0));
        assert_eq!(fx.mailer.send_count(), 1);
    }

    #[tokio::test]
    async fn test_bare_create_without_domain_asks_for_clarification() {
        let fx = fixture(&[]);
        let response = fx
            .assistant
            .process_at("create a note for later", wednesday_noon())
            .await;
        assert_eq!(
            response,
            "Please specify what you want to create: 'create task' or 'create event'"
        );
    }

    #[tokio::test]
    async fn test_unknown_directive_points_at_help() {
        let fx = fixture(&[]);
        let response = fx
            .assistant
            .process_at("what is the weather", wednesday_noon())
            .await;
        assert_eq!(
            response,
            "I'm not sure what you want to do. Type 'help' for available commands."
        );
    }
}
