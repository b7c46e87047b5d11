//! Keyword-based intent classification for directives.
//!
//! A fixed precedence ladder: reschedule phrases first, then email, then
//! task and event domain checks, then a residual keyword table. Evaluation
//! order is load-bearing; reordering changes which intent wins for mixed
//! directives. Matching is substring containment over lowercased text.

use std::sync::OnceLock;

use regex::Regex;

/// Classified intent for one directive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    RescheduleTask,
    RescheduleEvent,
    /// Reschedule keyword with neither a task nor an event domain word.
    RescheduleAmbiguous,
    EmailSend,
    CreateTask,
    ViewTasks,
    CompleteTask,
    DeleteTask,
    CreateEvent,
    ViewCalendar,
    DeleteEvent,
    /// Calendar domain word with the action resolved by a sub-dispatch.
    CalendarOps,
    /// Generic view; the handler decides tasks vs calendar from the text.
    ViewItems,
    CompleteItem,
    DeleteItem,
    /// Create with the domain resolved by a sub-dispatch, or a
    /// clarification prompt when no domain is recognizable.
    CreateItem,
    SearchItems,
    Stats,
    Help,
    Unknown,
}

fn email_address_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"@[\w.\-]+\.\w+").unwrap())
}

fn contains_any(text: &str, keywords: &[&str]) -> bool {
    keywords.iter().any(|kw| text.contains(kw))
}

/// Classify a lowercased directive. Total: every input maps to an intent.
pub fn classify(text: &str) -> Intent {
    // Explicit two-word reschedule phrases outrank everything.
    if text.contains("reschedule task") || text.contains("update task") {
        return Intent::RescheduleTask;
    }
    if text.contains("reschedule event") || text.contains("update event") {
        return Intent::RescheduleEvent;
    }

    if contains_any(text, &["reschedule", "move", "change", "update"]) {
        if text.contains("task") {
            return Intent::RescheduleTask;
        }
        if contains_any(text, &["event", "meeting", "appointment"]) {
            return Intent::RescheduleEvent;
        }
        return Intent::RescheduleAmbiguous;
    }

    if email_address_re().is_match(text) && contains_any(text, &["send", "email"]) {
        return Intent::EmailSend;
    }

    // Task domain checks come before event checks, so a directive naming
    // both domains goes to the task handler.
    if contains_any(text, &["task", "todo", "reminder"]) {
        if contains_any(text, &["create", "add", "make", "new"]) {
            return Intent::CreateTask;
        }
        if contains_any(text, &["show", "list", "view"]) {
            return Intent::ViewTasks;
        }
        if contains_any(text, &["complete", "finish", "done"]) {
            return Intent::CompleteTask;
        }
        if contains_any(text, &["delete", "remove"]) {
            return Intent::DeleteTask;
        }
    }

    if contains_any(text, &["event", "meeting", "appointment", "calendar"]) {
        if contains_any(text, &["create", "add", "make", "new", "schedule"]) {
            return Intent::CreateEvent;
        }
        if contains_any(text, &["show", "list", "view"]) {
            return Intent::ViewCalendar;
        }
        if contains_any(text, &["delete", "remove", "cancel"]) {
            return Intent::DeleteEvent;
        }
    }

    // Residual table, scanned in order; first keyword present wins.
    const TABLE: [(&str, Intent); 18] = [
        ("calendar", Intent::CalendarOps),
        ("event", Intent::CalendarOps),
        ("meeting", Intent::CalendarOps),
        ("appointment", Intent::CalendarOps),
        ("show", Intent::ViewItems),
        ("list", Intent::ViewItems),
        ("view", Intent::ViewItems),
        ("complete", Intent::CompleteItem),
        ("finish", Intent::CompleteItem),
        ("delete", Intent::DeleteItem),
        ("remove", Intent::DeleteItem),
        ("cancel", Intent::DeleteItem),
        ("create", Intent::CreateItem),
        ("add", Intent::CreateItem),
        ("search", Intent::SearchItems),
        ("find", Intent::SearchItems),
        ("stats", Intent::Stats),
        ("statistics", Intent::Stats),
    ];
    for (keyword, intent) in TABLE {
        if text.contains(keyword) {
            return intent;
        }
    }
    if text.contains("help") {
        return Intent::Help;
    }

    Intent::Unknown
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reschedule_phrases_win() {
        assert_eq!(classify("reschedule task pay rent"), Intent::RescheduleTask);
        assert_eq!(
            classify("update event standup to 10am"),
            Intent::RescheduleEvent
        );
    }

    #[test]
    fn test_reschedule_family_with_domain() {
        assert_eq!(classify("move my dentist appointment"), Intent::RescheduleEvent);
        assert_eq!(classify("change task deadline"), Intent::RescheduleTask);
        assert_eq!(classify("reschedule it"), Intent::RescheduleAmbiguous);
    }

    #[test]
    fn test_email_address_plus_send_keyword() {
        assert_eq!(
            classify("send an email to bob@example.com about lunch"),
            Intent::EmailSend
        );
        // An address without a send keyword is not an email directive.
        assert_eq!(classify("bob@example.com"), Intent::Unknown);
    }

    #[test]
    fn test_email_outranks_task_keywords() {
        assert_eq!(
            classify("send email to bob@example.com about the task list"),
            Intent::EmailSend
        );
    }

    #[test]
    fn test_task_domain_actions() {
        assert_eq!(classify("create task buy milk"), Intent::CreateTask);
        assert_eq!(classify("show my tasks"), Intent::ViewTasks);
        assert_eq!(classify("complete task buy groceries"), Intent::CompleteTask);
        assert_eq!(classify("delete task old thing"), Intent::DeleteTask);
    }

    #[test]
    fn test_event_domain_actions() {
        assert_eq!(classify("create event team sync"), Intent::CreateEvent);
        assert_eq!(classify("show my calendar events"), Intent::ViewCalendar);
        assert_eq!(classify("cancel meeting with alex"), Intent::DeleteEvent);
    }

    #[test]
    fn test_task_wins_over_event_when_both_present() {
        assert_eq!(
            classify("create task about the meeting"),
            Intent::CreateTask
        );
    }

    #[test]
    fn test_residual_table_order() {
        assert_eq!(classify("calendar"), Intent::CalendarOps);
        assert_eq!(classify("show everything"), Intent::ViewItems);
        assert_eq!(classify("finish the report thing"), Intent::CompleteItem);
        assert_eq!(classify("search groceries"), Intent::SearchItems);
        assert_eq!(classify("stats"), Intent::Stats);
        assert_eq!(classify("help"), Intent::Help);
    }

    #[test]
    fn test_bare_create_goes_to_generic_dispatch() {
        assert_eq!(classify("create something"), Intent::CreateItem);
    }

    #[test]
    fn test_unknown_fallback() {
        assert_eq!(classify("what is the weather"), Intent::Unknown);
    }
}
