//! Title, subject and list-name extraction.
//!
//! Each extractor strips command phrasing and recognized date/time spans
//! from the directive, then normalizes whatever is left. Every one has a
//! literal default so downstream handlers always get a usable name.

use std::sync::OnceLock;

use regex::Regex;

const WEEKDAYS: [&str; 14] = [
    "monday", "tuesday", "wednesday", "thursday", "friday", "saturday", "sunday", "mon", "tue",
    "wed", "thu", "fri", "sat", "sun",
];

const MONTHS: [&str; 13] = [
    "jan", "feb", "mar", "apr", "may", "jun", "jul", "aug", "sep", "sept", "oct", "nov", "dec",
];

fn title_case(text: &str) -> String {
    text.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn collapse_ws(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Remove whole-word occurrences of each keyword.
pub fn strip_keywords(text: &str, keywords: &[&str]) -> String {
    let pattern = format!(r"\b({})\b", keywords.join("|"));
    match Regex::new(&pattern) {
        Ok(re) => collapse_ws(&re.replace_all(text, "")),
        Err(_) => collapse_ws(text),
    }
}

fn email_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[\w.\-]+@[\w.\-]+\.\w+").unwrap())
}

/// All email addresses in the text, in order of appearance.
pub fn email_addresses(text: &str) -> Vec<String> {
    email_re()
        .find_iter(text)
        .map(|m| m.as_str().to_string())
        .collect()
}

// ============================================================================
// Event title
// ============================================================================

fn word_is_time_like(word: &str) -> bool {
    static CLOCK: OnceLock<Regex> = OnceLock::new();
    static AMPM: OnceLock<Regex> = OnceLock::new();
    let clock = CLOCK.get_or_init(|| Regex::new(r"^\d{1,2}:\d{2}").unwrap());
    let ampm = AMPM.get_or_init(|| Regex::new(r"^\d{1,2}(am|pm)").unwrap());
    clock.is_match(word) || ampm.is_match(word) || matches!(word, "at" | "from" | "to")
}

fn word_is_date_like(word: &str) -> bool {
    static SLASH: OnceLock<Regex> = OnceLock::new();
    static MONTH: OnceLock<Regex> = OnceLock::new();
    let slash = SLASH.get_or_init(|| Regex::new(r"^\d{1,2}[/-]\d{1,2}[/-]\d{4}").unwrap());
    let month = MONTH
        .get_or_init(|| Regex::new(r"^(jan|feb|mar|apr|may|jun|jul|aug|sep|oct|nov|dec)").unwrap());
    slash.is_match(word) || month.is_match(word)
}

/// Extract an event title: strip the leading command verb, then collect
/// words left to right, stopping at the first date/time token, connector
/// word, or "on" followed by a weekday.
pub fn event_title(input: &str) -> String {
    static LEADING: OnceLock<Regex> = OnceLock::new();
    static INNER: OnceLock<Regex> = OnceLock::new();
    // Repeated group so "create event ..." drops both words.
    let leading = LEADING
        .get_or_init(|| Regex::new(r"^((create|add|make|new|schedule|event)\s+)+").unwrap());
    let inner = INNER.get_or_init(|| Regex::new(r"\s+(event|appointment)\s+").unwrap());

    let text = input.to_lowercase();
    let text = leading.replace(&text, "");
    let text = inner.replace_all(&text, " ").into_owned();

    let words: Vec<&str> = text.split_whitespace().collect();
    let mut title_words = Vec::new();

    for (i, word) in words.iter().enumerate() {
        if *word == "on" {
            if let Some(next) = words.get(i + 1) {
                if WEEKDAYS.contains(next) {
                    break;
                }
            }
        }
        if word_is_time_like(word) || word_is_date_like(word) {
            break;
        }
        title_words.push(*word);
    }

    let mut title = title_words.join(" ").trim().to_string();

    if title.is_empty() {
        title = strip_keywords(&text, &["on", "at", "from", "to", "today", "tomorrow", "next"]);
    }

    let title = title_case(&title);
    if title.is_empty() {
        "Event".to_string()
    } else {
        title
    }
}

// ============================================================================
// Task title and list name
// ============================================================================

/// Extract a task title by removing command verbs, list clauses, and every
/// recognizable date/time span, then title-casing the remainder.
pub fn task_title(input: &str) -> String {
    static VERBS: OnceLock<Regex> = OnceLock::new();
    static LIST_CLAUSE: OnceLock<Regex> = OnceLock::new();
    static ON_CLAUSE: OnceLock<Regex> = OnceLock::new();
    static NUMERIC_DATE: OnceLock<Regex> = OnceLock::new();
    static CLOCK: OnceLock<Regex> = OnceLock::new();
    static PUNCT: OnceLock<Regex> = OnceLock::new();

    let verbs = VERBS.get_or_init(|| {
        Regex::new(
            r"\b(create|add|make|set|please|task|todo|to-do|remind me to|remind me|remind|schedule)\b",
        )
        .unwrap()
    });
    let list_clause =
        LIST_CLAUSE.get_or_init(|| Regex::new(r"\b(in|under|into)\s+[a-z0-9\s/\-]+\b").unwrap());
    let on_clause = ON_CLAUSE.get_or_init(|| Regex::new(r"\bon\s+[a-z0-9\s/\-]+\b").unwrap());
    let numeric_date =
        NUMERIC_DATE.get_or_init(|| Regex::new(r"\d{1,2}([/-]\d{1,2}([/-]\d{2,4})?)?").unwrap());
    let clock = CLOCK.get_or_init(|| Regex::new(r"(at\s*)?\d{1,2}(:\d{2})?\s*(am|pm)?").unwrap());
    let punct = PUNCT.get_or_init(|| Regex::new(r"[^\w\s&_\-]").unwrap());

    let text = input.to_lowercase();
    let text = verbs.replace_all(&text, "");
    let text = list_clause.replace_all(&text, "");
    let text = on_clause.replace_all(&text, "");
    let text = strip_keywords(&text, &WEEKDAYS);
    let text = strip_keywords(&text, &MONTHS);
    // Clock spans first, so "at 5pm" goes as a unit instead of leaving
    // a dangling "at pm" after the digit strip.
    let text = clock.replace_all(&text, "");
    let text = numeric_date.replace_all(&text, "");
    let text = punct.replace_all(&text, " ");
    let text = collapse_ws(&text);

    if text.is_empty() {
        "Untitled Task".to_string()
    } else {
        title_case(&text)
    }
}

/// Extract a destination list name from "under/in/into/to <name>" phrasing.
pub fn list_name(input: &str) -> String {
    static CLAUSE: OnceLock<Regex> = OnceLock::new();
    static ON_CLAUSE: OnceLock<Regex> = OnceLock::new();
    static NUMERIC_DATE: OnceLock<Regex> = OnceLock::new();
    static PUNCT: OnceLock<Regex> = OnceLock::new();

    let clause =
        CLAUSE.get_or_init(|| Regex::new(r"\b(under|in|into|to)\s+([a-z0-9\s&_\-]+)").unwrap());
    let on_clause = ON_CLAUSE.get_or_init(|| Regex::new(r"\bon\s+[a-z0-9\s/\-]+\b").unwrap());
    let numeric_date =
        NUMERIC_DATE.get_or_init(|| Regex::new(r"\d{1,2}([/-]\d{1,2}([/-]\d{2,4})?)?").unwrap());
    let punct = PUNCT.get_or_init(|| Regex::new(r"[^\w\s&_\-]").unwrap());

    let text = input.to_lowercase();
    let Some(caps) = clause.captures(&text) else {
        return "My Tasks".to_string();
    };

    let raw = caps[2].trim().to_string();
    let raw = on_clause.replace_all(&raw, "").into_owned();
    let raw = strip_keywords(&raw, &WEEKDAYS);
    let raw = strip_keywords(&raw, &MONTHS);
    let raw = numeric_date.replace_all(&raw, "");
    let raw = punct.replace_all(&raw, "");
    let raw = collapse_ws(&raw);

    if raw.is_empty() {
        "My Tasks".to_string()
    } else {
        title_case(&raw)
    }
}

// ============================================================================
// Email subject
// ============================================================================

/// Extract an email subject: drop addresses and scheduling phrases, then
/// either take a trailing "for <rest>" clause or the first six meaningful
/// words. Only the first character is capitalized.
pub fn email_subject(input: &str) -> String {
    static SCHEDULING: OnceLock<Vec<Regex>> = OnceLock::new();
    static COMMANDS: OnceLock<Vec<Regex>> = OnceLock::new();
    static FOR_CLAUSE: OnceLock<Regex> = OnceLock::new();

    let scheduling = SCHEDULING.get_or_init(|| {
        [
            r"send\s+(mail|email)\s+on\s+.+",
            r"email\s+on\s+.+",
            r"mail\s+on\s+.+",
            r"schedule\s+(mail|email)\s+for\s+.+",
            r"send\s+(mail|email)\s+at\s+.+",
            r"remind\s+(him|her|them)\s+to\s+.+",
            r"keep\s+.+\s+in\s+cc",
            r"\bin\s+cc\b",
        ]
        .iter()
        .map(|p| Regex::new(p).unwrap())
        .collect()
    });
    let commands = COMMANDS.get_or_init(|| {
        [
            r"^write\s+a\s+",
            r"^send\s+",
            r"^email\s+",
            r"^mail\s+",
            r"\bto\s+",
            r"\bfor\s+",
            r"\bcc\b",
            r"\bbcc\b",
            r"\band\b",
        ]
        .iter()
        .map(|p| Regex::new(p).unwrap())
        .collect()
    });
    let for_clause = FOR_CLAUSE.get_or_init(|| Regex::new(r"for\s+(.+)").unwrap());

    let mut text = email_re().replace_all(&input.to_lowercase(), "").into_owned();
    for re in scheduling {
        text = re.replace_all(&text, "").into_owned();
    }
    for re in commands {
        text = re.replace_all(&text, "").into_owned();
    }

    let subject = if let Some(caps) = for_clause.captures(&text) {
        caps[1].trim().to_string()
    } else {
        let stop_words = [
            "a", "an", "the", "and", "or", "but", "on", "at", "in", "to", "of", "bring", "his",
            "her", "their",
        ];
        let mut meaningful = Vec::new();
        for word in text.split_whitespace() {
            if !stop_words.contains(&word) && word.len() > 2 {
                meaningful.push(word);
            }
            if meaningful.len() >= 6 {
                break;
            }
        }
        if meaningful.is_empty() {
            "Important Message".to_string()
        } else {
            meaningful.join(" ")
        }
    };

    let subject = collapse_ws(&subject);
    let mut chars = subject.chars();
    let capitalized = match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    };

    if capitalized.is_empty() {
        "Email".to_string()
    } else {
        capitalized
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_title_stops_at_weekday_on() {
        assert_eq!(
            event_title("create event team sync on friday at 3pm"),
            "Team Sync"
        );
    }

    #[test]
    fn test_event_title_stops_at_time_token() {
        assert_eq!(event_title("create event standup at 9am"), "Standup");
        assert_eq!(event_title("schedule dentist 3:30pm"), "Dentist");
    }

    #[test]
    fn test_event_title_strips_inner_domain_word() {
        assert_eq!(
            event_title("create event budget review appointment from 2pm"),
            "Budget Review"
        );
    }

    #[test]
    fn test_event_title_default() {
        assert_eq!(event_title("create event"), "Event");
    }

    #[test]
    fn test_event_title_time_only_rederives_remainder() {
        // Nothing collected before the time token; the stop-word strip
        // leaves the clock span as the best remaining name.
        assert_eq!(event_title("create event at 3pm"), "3pm");
    }

    #[test]
    fn test_task_title_strips_verbs() {
        assert_eq!(task_title("add todo finish report"), "Finish Report");
    }

    #[test]
    fn test_task_title_strips_clock_and_weekday() {
        assert_eq!(task_title("remind me to call mom friday at 5pm"), "Call Mom");
    }

    #[test]
    fn test_task_title_default() {
        assert_eq!(task_title("create task at 5pm"), "Untitled Task");
    }

    #[test]
    fn test_list_name_from_under_clause() {
        assert_eq!(list_name("add task buy milk under groceries"), "Groceries");
    }

    #[test]
    fn test_list_name_default() {
        assert_eq!(list_name("add task buy milk"), "My Tasks");
    }

    #[test]
    fn test_email_addresses_found_in_order() {
        let found = email_addresses("send to alice@example.com and cc bob@test.org");
        assert_eq!(found, vec!["alice@example.com", "bob@test.org"]);
    }

    #[test]
    fn test_email_subject_drops_connectors() {
        // "to"/"for" are connector words, "the" is a stop word.
        assert_eq!(
            email_subject("send email to bob@x.com for the quarterly numbers"),
            "Quarterly numbers"
        );
    }

    #[test]
    fn test_email_subject_meaningful_words() {
        let subject = email_subject("email alice@x.com about project deadline extension");
        assert_eq!(subject, "About project deadline extension");
    }

    #[test]
    fn test_email_subject_default() {
        assert_eq!(
            email_subject("send email to bob@x.com"),
            "Important Message"
        );
    }
}
