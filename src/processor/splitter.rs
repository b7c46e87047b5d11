//! Utterance splitting into atomic directives.
//!
//! One user line may carry several instructions ("create task call mom,
//! and show my events"). Quoted spans are swapped for placeholders before
//! splitting so punctuation inside quotes never breaks a directive apart.

use std::sync::OnceLock;

use regex::Regex;

const MARKER: char = '\u{1}';

fn quote_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"["'][^"']*["']"#).unwrap())
}

fn sentence_break_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\.\s+([A-Z])").unwrap())
}

fn separator_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s+(and|also|then)\s+|\s*[,;]\s*|\u{1}").unwrap())
}

/// Split an utterance into ordered directives. Never returns an empty
/// list; an unsplittable input comes back whole.
pub fn split_directives(utterance: &str) -> Vec<String> {
    let mut quoted: Vec<String> = Vec::new();
    let protected = quote_re().replace_all(utterance, |caps: &regex::Captures| {
        quoted.push(caps[0].to_string());
        format!("__QUOTE_{}__", quoted.len() - 1)
    });

    // A period followed by an upper-case word starts a new directive. The
    // marker stands in for a lookahead so the letter is kept.
    let protected = sentence_break_re().replace_all(&protected, format!("{}$1", MARKER).as_str());

    let mut directives: Vec<String> = separator_re()
        .split(&protected)
        .map(|part| {
            let mut restored = part.to_string();
            for (i, original) in quoted.iter().enumerate() {
                restored = restored.replace(&format!("__QUOTE_{}__", i), original);
            }
            restored.trim().to_string()
        })
        .filter(|part| !part.is_empty())
        .collect();

    if directives.is_empty() {
        directives.push(utterance.trim().to_string());
    }
    directives
}
