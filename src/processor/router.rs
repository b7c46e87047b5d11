//! Intent routing and response rendering.
//!
//! One handler per intent. Handlers return `Result<String>`; the single
//! `route` boundary renders errors into user-facing text, so nothing
//! escapes to the interactive loop. Response wording is stable: tests and
//! scripts match on the "Error:" / "Failed to ..." / "... not found"
//! prefixes.

use chrono::{Local, NaiveDateTime, NaiveTime};

use crate::error::{AssistantError, Result};
use crate::scheduler::ScheduleOutcome;
use crate::services::drafter::fallback_body;
use crate::services::{EventRecord, TaskStatus};

use super::classifier::{classify, Intent};
use super::{email, extract, resolver, timeparse, Assistant};

const HELP_TEXT: &str = "\
Available Commands:

Calendar/Events:
- create event [title] on [day/time] - Create new event
- show calendar / show events - View upcoming events
- show events today/tomorrow - View specific day events
- delete event [name] - Delete an event
- reschedule event [name] to [new time] - Move event to new time

Tasks:
- create task [description] - Add new task
- show tasks / show tasks today - View tasks
- complete task [name] - Mark task as done
- delete task [name] - Remove task

Email:
- send email to [address] [subject] [body] - Send email

General:
- stats - Show statistics
- help - Show this help message

Examples:
- \"create event team meeting on friday at 3pm\"
- \"create task finish report\"
- \"show events today\"
- \"complete task buy groceries\"";

/// Route one directive to its handler and render the outcome.
pub async fn route(assistant: &Assistant, directive: &str, now: NaiveDateTime) -> String {
    let text = directive.to_lowercase();
    let outcome = dispatch(assistant, &text, directive, now).await;
    match outcome {
        Ok(response) => response,
        Err(err) if err.is_not_found() => err.to_string(),
        Err(err) => format!("Error: {}", err),
    }
}

async fn dispatch(
    assistant: &Assistant,
    text: &str,
    input: &str,
    now: NaiveDateTime,
) -> Result<String> {
    match classify(text) {
        Intent::RescheduleTask => reschedule_task(assistant, text, input, now).await,
        Intent::RescheduleEvent => reschedule_event(assistant, text, input, now).await,
        Intent::RescheduleAmbiguous => Ok(
            "Please specify what you want to reschedule: 'reschedule event [name]' or 'reschedule task [name]'"
                .to_string(),
        ),
        Intent::EmailSend => send_email(assistant, input, now).await,
        Intent::CreateTask => create_task(assistant, input, now).await,
        Intent::ViewTasks => view_tasks(assistant, text, now).await,
        Intent::CompleteTask | Intent::CompleteItem => complete_task(assistant, text).await,
        Intent::DeleteTask => delete_task(assistant, text).await,
        Intent::DeleteItem => {
            if contains_any(text, &["event", "meeting", "appointment"]) {
                delete_event(assistant, text).await
            } else {
                delete_task(assistant, text).await
            }
        }
        Intent::CreateEvent => create_event(assistant, input, now).await,
        Intent::ViewCalendar => view_calendar(assistant, text, now).await,
        Intent::DeleteEvent => delete_event(assistant, text).await,
        Intent::CalendarOps => calendar_ops(assistant, text, input, now).await,
        Intent::ViewItems => {
            if contains_any(text, &["event", "meeting", "appointment", "calendar"]) {
                view_calendar(assistant, text, now).await
            } else {
                view_tasks(assistant, text, now).await
            }
        }
        Intent::CreateItem => create_item(assistant, text, input, now).await,
        Intent::SearchItems => {
            if contains_any(text, &["event", "meeting"]) {
                search_events(assistant, text).await
            } else {
                search_tasks(assistant, text).await
            }
        }
        Intent::Stats => Ok(show_stats(assistant).await),
        Intent::Help => Ok(HELP_TEXT.to_string()),
        Intent::Unknown => {
            Ok("I'm not sure what you want to do. Type 'help' for available commands.".to_string())
        }
    }
}

fn contains_any(text: &str, keywords: &[&str]) -> bool {
    keywords.iter().any(|kw| text.contains(kw))
}

// ============================================================================
// Tasks
// ============================================================================

async fn create_task(assistant: &Assistant, input: &str, now: NaiveDateTime) -> Result<String> {
    let title = extract::task_title(input);
    let list = extract::list_name(input);
    // Task scheduling defaults to 09:00, unlike events.
    let time = timeparse::parse_time_explicit(&input.to_lowercase())
        .unwrap_or_else(|| NaiveTime::from_hms_opt(9, 0, 0).unwrap());
    let due = timeparse::parse_date(&input.to_lowercase(), now).and_time(time);

    let store = assistant.task_store()?;
    match store.create(&title, &list, Some(due)).await {
        Ok(created) => {
            assistant.invalidate_tasks();
            Ok(format!("Task created: {}", created.title))
        }
        Err(err) => Ok(format!("Failed to create task: {}", err)),
    }
}

async fn view_tasks(assistant: &Assistant, text: &str, now: NaiveDateTime) -> Result<String> {
    let all = assistant.cached_tasks().await?;
    let today = now.date();

    let due_on = |task: &crate::services::TaskRecord, day: chrono::NaiveDate| {
        task.due.map(|d| d.date_naive() == day).unwrap_or(false)
    };

    let (header, tasks): (&str, Vec<_>) = if text.contains("today") {
        (
            "Today's Tasks",
            all.iter()
                .filter(|t| t.status == TaskStatus::NeedsAction && due_on(t, today))
                .collect(),
        )
    } else if text.contains("tomorrow") {
        (
            "Tomorrow's Tasks",
            all.iter()
                .filter(|t| {
                    t.status == TaskStatus::NeedsAction
                        && due_on(t, today + chrono::Duration::days(1))
                })
                .collect(),
        )
    } else if text.contains("completed") {
        (
            "Completed Tasks",
            all.iter()
                .filter(|t| t.status == TaskStatus::Completed)
                .collect(),
        )
    } else if text.contains("all") {
        ("All Tasks", all.iter().collect())
    } else {
        (
            "Pending Tasks",
            all.iter()
                .filter(|t| t.status == TaskStatus::NeedsAction)
                .collect(),
        )
    };

    if tasks.is_empty() {
        return Ok(format!("No {}", header.to_lowercase()));
    }

    let mut lines = vec![header.to_string()];
    for task in tasks.iter().take(10) {
        let marker = if task.status == TaskStatus::Completed {
            "[X]"
        } else {
            "[ ]"
        };
        lines.push(format!("{} {}", marker, task.title));
    }
    Ok(lines.join("\n"))
}

async fn complete_task(assistant: &Assistant, text: &str) -> Result<String> {
    let query = extract::strip_keywords(text, &["complete", "finish", "done", "task"]);
    if query.is_empty() {
        return Ok("Please specify task to complete".to_string());
    }

    let tasks = assistant.cached_tasks().await?;
    let found = resolver::resolve(&query, &tasks, assistant.config.fuzzy_threshold);

    match found.title {
        Some(title) => {
            assistant.task_store()?.complete(&title).await?;
            assistant.invalidate_tasks();
            Ok(format!("Completed: {}", title))
        }
        None => Err(AssistantError::NotFound {
            kind: "Task",
            query,
        }),
    }
}

async fn delete_task(assistant: &Assistant, text: &str) -> Result<String> {
    let query = extract::strip_keywords(text, &["delete", "remove", "cancel", "task"]);
    if query.is_empty() {
        return Ok("Please specify task to delete".to_string());
    }

    let tasks = assistant.cached_tasks().await?;
    let found = resolver::resolve(&query, &tasks, assistant.config.fuzzy_threshold);

    match found.title {
        Some(title) => {
            assistant.task_store()?.delete(&title).await?;
            assistant.invalidate_tasks();
            Ok(format!("Deleted: {}", title))
        }
        None => Err(AssistantError::NotFound {
            kind: "Task",
            query,
        }),
    }
}

async fn reschedule_task(
    assistant: &Assistant,
    text: &str,
    input: &str,
    now: NaiveDateTime,
) -> Result<String> {
    let query = clean_reschedule_query(text, &["task", "todo"]);
    if query.is_empty() {
        return Ok("Please specify which task to reschedule".to_string());
    }

    let new_due = timeparse::parse_datetime(&input.to_lowercase(), now);
    let tasks = assistant.cached_tasks().await?;
    let found = resolver::resolve(&query, &tasks, assistant.config.fuzzy_threshold);

    match found.title {
        Some(title) => {
            assistant.task_store()?.update_due(&title, new_due).await?;
            assistant.invalidate_tasks();
            Ok(format!(
                "Task '{}' due date updated to {}",
                title,
                new_due.format("%b %d, %Y")
            ))
        }
        None => Err(AssistantError::NotFound {
            kind: "Task",
            query,
        }),
    }
}

async fn search_tasks(assistant: &Assistant, text: &str) -> Result<String> {
    let query = extract::strip_keywords(text, &["search", "find", "task"]);
    if query.is_empty() {
        return Ok("Please specify search query".to_string());
    }

    let tasks = assistant.task_store()?.search(&query).await?;
    if tasks.is_empty() {
        return Ok(format!("No tasks found for '{}'", query));
    }

    let mut lines = vec![format!("Found {} tasks:", tasks.len())];
    for task in tasks.iter().take(5) {
        lines.push(format!("- {}", task.title));
    }
    Ok(lines.join("\n"))
}

// ============================================================================
// Calendar
// ============================================================================

async fn create_event(assistant: &Assistant, input: &str, now: NaiveDateTime) -> Result<String> {
    let title = extract::event_title(input);
    let start = timeparse::parse_datetime(&input.to_lowercase(), now);

    let store = assistant.calendar_store()?;
    match store.create(&title, start).await {
        Ok(created) => {
            assistant.invalidate_events();
            Ok(format!(
                "Event created: {} on {} at {}",
                created.title,
                created.start.format("%A, %b %d"),
                created.start.format("%I:%M %p")
            ))
        }
        Err(err) => Ok(format!("Failed to create event: {}", err)),
    }
}

fn event_day_line(event: &EventRecord) -> String {
    let time = if event.all_day {
        "All day".to_string()
    } else {
        match event.start {
            Some(start) => start
                .with_timezone(&Local)
                .format("%I:%M %p")
                .to_string(),
            None => "No time".to_string(),
        }
    };
    format!("- {}: {}", time, event.title)
}

async fn view_calendar(assistant: &Assistant, text: &str, now: NaiveDateTime) -> Result<String> {
    let today = now.date();
    let on_day = |event: &&EventRecord, day: chrono::NaiveDate| {
        event
            .start
            .map(|s| s.with_timezone(&Local).date_naive() == day)
            .unwrap_or(false)
    };

    let all = assistant.cached_events().await?;
    let (header, events): (String, Vec<&EventRecord>) = if text.contains("today") {
        (
            "Today's Events".to_string(),
            all.iter().filter(|e| on_day(e, today)).collect(),
        )
    } else if text.contains("tomorrow") {
        (
            "Tomorrow's Events".to_string(),
            all.iter()
                .filter(|e| on_day(e, today + chrono::Duration::days(1)))
                .collect(),
        )
    } else if text.contains("all") {
        ("All Events".to_string(), all.iter().collect())
    } else {
        let days = days_window(text);
        let horizon = today + chrono::Duration::days(days);
        (
            format!("Upcoming Events ({} days)", days),
            all.iter()
                .filter(|e| {
                    e.start
                        .map(|s| s.with_timezone(&Local).date_naive() <= horizon)
                        .unwrap_or(false)
                })
                .collect(),
        )
    };

    if events.is_empty() {
        return Ok(format!("No {}", header.to_lowercase()));
    }

    let mut lines = vec![header];
    for event in events.iter().take(10) {
        lines.push(event_day_line(event));
    }
    Ok(lines.join("\n"))
}

fn days_window(text: &str) -> i64 {
    static RE: std::sync::OnceLock<regex::Regex> = std::sync::OnceLock::new();
    let re = RE.get_or_init(|| regex::Regex::new(r"(\d+)\s*days?").unwrap());
    re.captures(text)
        .and_then(|caps| caps[1].parse().ok())
        .unwrap_or(7)
}

async fn delete_event(assistant: &Assistant, text: &str) -> Result<String> {
    let query = extract::strip_keywords(
        text,
        &["delete", "remove", "cancel", "event", "meeting", "appointment"],
    );
    if query.is_empty() {
        return Ok("Please specify which event to delete".to_string());
    }

    let events = assistant.cached_events().await?;
    if events.is_empty() {
        return Ok("No events found to delete".to_string());
    }

    let found = resolver::resolve(&query, &events, assistant.config.fuzzy_threshold);
    match found.title {
        Some(title) => {
            assistant.calendar_store()?.delete(&title).await?;
            assistant.invalidate_events();
            Ok(format!("Event deleted: {}", title))
        }
        None => Err(AssistantError::NotFound {
            kind: "Event",
            query,
        }),
    }
}

async fn reschedule_event(
    assistant: &Assistant,
    text: &str,
    input: &str,
    now: NaiveDateTime,
) -> Result<String> {
    let query = clean_reschedule_query(text, &["event", "meeting", "appointment"]);
    if query.is_empty() {
        return Ok("Please specify which event to reschedule".to_string());
    }

    let events = assistant.cached_events().await?;
    if events.is_empty() {
        return Ok("No events found to reschedule".to_string());
    }

    let new_start = timeparse::parse_datetime(&input.to_lowercase(), now);
    let found = resolver::resolve(&query, &events, assistant.config.fuzzy_threshold);

    match found.title {
        Some(title) => {
            assistant
                .calendar_store()?
                .reschedule(&title, new_start)
                .await?;
            assistant.invalidate_events();
            Ok(format!(
                "Event '{}' rescheduled to {} at {}",
                title,
                new_start.format("%A, %b %d"),
                new_start.format("%I:%M %p")
            ))
        }
        None => Err(AssistantError::NotFound {
            kind: "Event",
            query,
        }),
    }
}

async fn search_events(assistant: &Assistant, text: &str) -> Result<String> {
    let query = extract::strip_keywords(text, &["search", "find", "event", "meeting"]);
    if query.is_empty() {
        return Ok("Please specify search query".to_string());
    }

    let events = assistant.calendar_store()?.search(&query).await?;
    if events.is_empty() {
        return Ok(format!("No events found for '{}'", query));
    }

    let mut lines = vec![format!("Found {} events:", events.len())];
    for event in events.iter().take(5) {
        lines.push(format!("- {}", event.title));
    }
    Ok(lines.join("\n"))
}

async fn calendar_ops(
    assistant: &Assistant,
    text: &str,
    input: &str,
    now: NaiveDateTime,
) -> Result<String> {
    if contains_any(text, &["show", "list", "view"]) {
        view_calendar(assistant, text, now).await
    } else if contains_any(text, &["create", "add", "make", "schedule"]) {
        create_event(assistant, input, now).await
    } else if contains_any(text, &["delete", "remove", "cancel"]) {
        delete_event(assistant, text).await
    } else if contains_any(text, &["search", "find"]) {
        search_events(assistant, text).await
    } else if contains_any(text, &["stats", "statistics"]) {
        calendar_stats(assistant).await
    } else {
        Ok("Try: 'show calendar', 'create event', or 'delete event'".to_string())
    }
}

async fn calendar_stats(assistant: &Assistant) -> Result<String> {
    let stats = assistant.calendar_store()?.statistics().await?;
    Ok(format!(
        "Calendar Stats: {} today, {} tomorrow, {} this week",
        stats.events_today, stats.events_tomorrow, stats.upcoming_week
    ))
}

// ============================================================================
// Create dispatch
// ============================================================================

async fn create_item(
    assistant: &Assistant,
    text: &str,
    input: &str,
    now: NaiveDateTime,
) -> Result<String> {
    if text.contains("task") {
        return create_task(assistant, input, now).await;
    }
    if contains_any(text, &["event", "meeting", "appointment"]) {
        return create_event(assistant, input, now).await;
    }

    // A concrete time or "on <weekday>" implies a calendar entry. Word
    // boundaries matter: "create" must not read as an "at" hint.
    static TIME_HINT: std::sync::OnceLock<regex::Regex> = std::sync::OnceLock::new();
    let time_hint = TIME_HINT.get_or_init(|| {
        regex::Regex::new(
            r"(:|\b(at|am|pm|jan|feb|mar|apr|may|jun|jul|aug|sep|oct|nov|dec)\b)",
        )
        .unwrap()
    });
    let on_weekday = text.contains("on")
        && contains_any(
            text,
            &["monday", "tuesday", "wednesday", "thursday", "friday", "saturday", "sunday"],
        );
    if time_hint.is_match(text) || on_weekday {
        return create_event(assistant, input, now).await;
    }

    // Ambiguous domain: ask instead of guessing.
    Ok("Please specify what you want to create: 'create task' or 'create event'".to_string())
}

// ============================================================================
// Stats
// ============================================================================

async fn show_stats(assistant: &Assistant) -> String {
    let mut lines = Vec::new();

    match assistant.task_store() {
        Ok(store) => match store.statistics().await {
            Ok(s) => lines.push(format!(
                "Tasks: {} total, {} completed, {} pending",
                s.total, s.completed, s.pending
            )),
            Err(e) => lines.push(format!("Tasks: Error - {}", e)),
        },
        Err(_) => lines.push("Tasks: Module not available".to_string()),
    }

    match assistant.calendar_store() {
        Ok(store) => match store.statistics().await {
            Ok(s) => lines.push(format!(
                "Calendar: {} today, {} tomorrow, {} this week",
                s.events_today, s.events_tomorrow, s.upcoming_week
            )),
            Err(e) => lines.push(format!("Calendar: Error - {}", e)),
        },
        Err(_) => lines.push("Calendar: Module not available".to_string()),
    }

    lines.join("\n")
}

// ============================================================================
// Email
// ============================================================================

async fn send_email(assistant: &Assistant, input: &str, now: NaiveDateTime) -> Result<String> {
    let Some(recipients) = email::recipients(input) else {
        return Ok("Please specify a valid email address".to_string());
    };

    let scheduled = email::schedule_text(input)
        .map(|span| timeparse::parse_datetime_for_email(&span, now));

    let subject = extract::email_subject(input);
    let body = match assistant.drafter.draft(input).await {
        Ok(body) => body,
        Err(err) => {
            log::warn!("drafter failed, using fallback template: {}", err);
            fallback_body(input)
        }
    };

    let mut preview = format!(
        "Email Preview:\n   To: {}\n   Subject: {}",
        recipients.to, subject
    );
    if !recipients.cc.is_empty() {
        preview.push_str(&format!("\n   CC: {}", recipients.cc.join(", ")));
    }
    match scheduled {
        Some(at) => preview.push_str(&format!(
            "\n   Scheduled: {}",
            at.format("%I:%M %p on %A, %B %d, %Y")
        )),
        None => preview.push_str("\n   Sending: Immediately"),
    }
    preview.push_str(&format!("\n   Body preview: {:.100}", body));
    preview.push_str("\n\nSend this email? (y/n): ");

    if !assistant.confirmer.confirm(&preview) {
        return Ok("Email cancelled".to_string());
    }

    let cc_note = if recipients.cc.is_empty() {
        "none".to_string()
    } else {
        recipients.cc.join(", ")
    };

    match scheduled {
        Some(send_at) => {
            let outcome = assistant
                .scheduler
                .schedule(&recipients.to, &subject, &body, send_at, input, now)
                .await?;
            for cc in &recipients.cc {
                assistant
                    .scheduler
                    .schedule(cc, &format!("FW: {}", subject), &body, send_at, input, now)
                    .await?;
            }
            let status = match outcome {
                ScheduleOutcome::SentImmediately => "sent immediately".to_string(),
                ScheduleOutcome::Scheduled(at) => {
                    format!("scheduled for {}", at.format("%Y-%m-%d %H:%M"))
                }
            };
            Ok(format!("Email {} (CC: {})", status, cc_note))
        }
        None => {
            assistant
                .mail_transport()?
                .send(
                    &[recipients.to.clone()],
                    &recipients.cc,
                    &[],
                    &subject,
                    &body,
                )
                .await?;
            Ok(format!("Email sent successfully! (CC: {})", cc_note))
        }
    }
}

// ============================================================================
// Shared query cleaning
// ============================================================================

/// Strip reschedule phrasing, domain words, and trailing date/time spans
/// so only the entity name remains.
fn clean_reschedule_query(text: &str, domain_words: &[&str]) -> String {
    static TIME_SPANS: std::sync::OnceLock<Vec<regex::Regex>> = std::sync::OnceLock::new();
    let time_spans = TIME_SPANS.get_or_init(|| {
        [
            r"to\s+\d{1,2}\s+[a-z]+\s+\d{1,2}:?\d{0,2}\s*[ap]?m?",
            r"to\s+\d{1,2}\s+[a-z]+",
            r"to\s+\d{1,2}[/-]\d{1,2}",
            r"at\s+\d{1,2}:?\d{0,2}\s*[ap]m",
            r"for\s+.+",
        ]
        .iter()
        .map(|p| regex::Regex::new(p).unwrap())
        .collect()
    });

    let mut query =
        extract::strip_keywords(text, &["reschedule", "move", "change", "update"]);
    query = extract::strip_keywords(&query, domain_words);
    for re in time_spans {
        query = re.replace_all(&query, "").into_owned();
    }
    query = extract::strip_keywords(&query, &["to", "at", "on", "tomorrow", "today", "next"]);
    query.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_reschedule_query_strips_time_clause() {
        assert_eq!(
            clean_reschedule_query("reschedule event standup to 8 dec 8am", &["event"]),
            "standup"
        );
    }

    #[test]
    fn test_clean_reschedule_query_strips_at_clock() {
        assert_eq!(
            clean_reschedule_query("move meeting budget review at 3:30pm", &["event", "meeting"]),
            "budget review"
        );
    }

    #[test]
    fn test_days_window() {
        assert_eq!(days_window("show events for 14 days"), 14);
        assert_eq!(days_window("show events"), 7);
    }
}
