//! Email directive parsing.
//!
//! Pulls recipients, a cc list, and the scheduling span out of a send
//! directive. The scheduling span search mirrors the send path's priority:
//! "on <date>" phrases, then any date/time pattern (last occurrence wins),
//! then scheduling keywords, then trailing relative-day words.

use std::sync::OnceLock;

use regex::Regex;

use super::extract;

/// Human confirmation gate before any send or schedule commit.
///
/// Cancellation leaves all external state untouched; nothing is enqueued
/// or sent before this returns true.
pub trait Confirmer: Send + Sync {
    fn confirm(&self, prompt: &str) -> bool;
}

/// Recipients for one send directive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recipients {
    pub to: String,
    pub cc: Vec<String>,
}

/// Split found addresses into the primary recipient and the cc list.
/// Addresses appearing after a "cc" marker go to cc, and every address
/// past the first is cc'd regardless.
pub fn recipients(input: &str) -> Option<Recipients> {
    let addresses = extract::email_addresses(input);
    let to = addresses.first()?.clone();

    let lower = input.to_lowercase();
    let mut cc: Vec<String> = Vec::new();
    if let Some(idx) = lower.find("cc") {
        cc = extract::email_addresses(&input[idx + 2..]);
        cc.retain(|addr| *addr != to);
    }
    for addr in addresses.into_iter().skip(1) {
        if !cc.contains(&addr) {
            cc.push(addr);
        }
    }

    Some(Recipients { to, cc })
}

fn on_patterns() -> &'static Vec<Regex> {
    static RES: OnceLock<Vec<Regex>> = OnceLock::new();
    RES.get_or_init(|| {
        [
            r"on\s+(\d{1,2}\s+(jan|feb|mar|apr|may|jun|jul|aug|sep|oct|nov|dec)[a-z]*\s+\d{1,2}:\d{2}\s*(am|pm)?)",
            r"on\s+((jan|feb|mar|apr|may|jun|jul|aug|sep|oct|nov|dec)[a-z]*\s+\d{1,2}\s+\d{1,2}:\d{2}\s*(am|pm)?)",
            r"on\s+(\d{1,2}\s+(jan|feb|mar|apr|may|jun|jul|aug|sep|oct|nov|dec)[a-z]*)",
            r"on\s+((jan|feb|mar|apr|may|jun|jul|aug|sep|oct|nov|dec)[a-z]*\s+\d{1,2})",
            r"on\s+(\d{1,2}[/-]\d{1,2}([/-]\d{2,4})?\s+\d{1,2}:\d{2}\s*(am|pm)?)",
            r"on\s+(\d{1,2}:\d{2}\s*(am|pm)?)",
        ]
        .iter()
        .map(|p| Regex::new(p).unwrap())
        .collect()
    })
}

fn datetime_patterns() -> &'static Vec<Regex> {
    static RES: OnceLock<Vec<Regex>> = OnceLock::new();
    RES.get_or_init(|| {
        [
            r"(\d{1,2}\s+(jan|feb|mar|apr|may|jun|jul|aug|sep|oct|nov|dec)[a-z]*\s+\d{1,2}:\d{2}\s*(am|pm)?)",
            r"((jan|feb|mar|apr|may|jun|jul|aug|sep|oct|nov|dec)[a-z]*\s+\d{1,2}\s+\d{1,2}:\d{2}\s*(am|pm)?)",
            r"(\d{1,2}\s+(jan|feb|mar|apr|may|jun|jul|aug|sep|oct|nov|dec)[a-z]*)",
            r"((jan|feb|mar|apr|may|jun|jul|aug|sep|oct|nov|dec)[a-z]*\s+\d{1,2})",
            r"(\d{1,2}[/-]\d{1,2}([/-]\d{2,4})?)",
            r"(\d{1,2}:\d{2}\s*(am|pm)?)",
            r"(\d{1,2}\s*(am|pm))",
        ]
        .iter()
        .map(|p| Regex::new(p).unwrap())
        .collect()
    })
}

fn keyword_patterns() -> &'static Vec<Regex> {
    static RES: OnceLock<Vec<Regex>> = OnceLock::new();
    RES.get_or_init(|| {
        [
            r"(send|email|mail).*?\s+on\s+([^.,;]+)",
            r"(send|email|mail).*?\s+at\s+([^.,;]+)",
            r"(schedule).*?\s+for\s+([^.,;]+)",
        ]
        .iter()
        .map(|p| Regex::new(p).unwrap())
        .collect()
    })
}

fn date_only_patterns() -> &'static Vec<Regex> {
    static RES: OnceLock<Vec<Regex>> = OnceLock::new();
    RES.get_or_init(|| {
        [
            r"(\d{1,2}\s+(jan|feb|mar|apr|may|jun|jul|aug|sep|oct|nov|dec)[a-z]*)",
            r"((jan|feb|mar|apr|may|jun|jul|aug|sep|oct|nov|dec)[a-z]*\s+\d{1,2})",
            r"(\d{1,2}[/-]\d{1,2}([/-]\d{2,4})?)",
        ]
        .iter()
        .map(|p| Regex::new(p).unwrap())
        .collect()
    })
}

fn time_only_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\d{1,2}:?\d{0,2}\s*(am|pm)?$").unwrap())
}

const TIME_WORDS: [&str; 7] = [
    "today",
    "tomorrow",
    "next",
    "morning",
    "afternoon",
    "evening",
    "night",
];

fn trailing_time_words(text: &str) -> Option<String> {
    if !TIME_WORDS[..6].iter().any(|w| text.contains(w)) {
        return None;
    }
    let words: Vec<&str> = text.split_whitespace().collect();
    let mut collected: Vec<&str> = Vec::new();
    let mut found = false;

    for word in words.iter().rev() {
        if TIME_WORDS.contains(word) {
            found = true;
            collected.insert(0, word);
        } else if found {
            let is_stop = word.contains('@')
                || matches!(*word, "on" | "at" | "for" | "send" | "email" | "mail" | "about");
            if is_stop {
                break;
            }
            collected.insert(0, word);
        }
    }

    if collected.is_empty() {
        None
    } else {
        Some(collected.join(" "))
    }
}

/// Find the text span naming when to send, cleaned for the time parser.
/// None means no schedule was requested and the mail goes out now.
pub fn schedule_text(input: &str) -> Option<String> {
    let text = input.to_lowercase();

    let mut found: Option<String> = None;

    for pattern in on_patterns() {
        if let Some(last) = pattern.captures_iter(&text).last() {
            found = Some(last[1].to_string());
            break;
        }
    }

    if found.is_none() {
        let mut all: Vec<(usize, String)> = Vec::new();
        for pattern in datetime_patterns() {
            for caps in pattern.captures_iter(&text) {
                if let Some(m) = caps.get(1) {
                    all.push((m.end(), m.as_str().to_string()));
                }
            }
        }
        all.sort_by_key(|(end, _)| *end);
        found = all.pop().map(|(_, span)| span);
    }

    if found.is_none() {
        for pattern in keyword_patterns() {
            if let Some(last) = pattern.captures_iter(&text).last() {
                if let Some(m) = last.get(2) {
                    found = Some(m.as_str().to_string());
                    break;
                }
            }
        }
    }

    let mut span = match found {
        Some(span) => span,
        None => return trailing_time_words(&text),
    };

    if let Some(stripped) = span.strip_prefix("on ").or_else(|| span.strip_prefix("at ")) {
        span = stripped.to_string();
    }
    let span = span.trim().to_string();

    // A bare clock still needs a day; look for one elsewhere in the input.
    if time_only_re().is_match(&span) {
        for pattern in date_only_patterns() {
            if let Some(caps) = pattern.captures(&text) {
                return Some(format!("{} {}", &caps[1], span));
            }
        }
    }

    Some(span)
}
