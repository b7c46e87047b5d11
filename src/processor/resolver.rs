//! Fuzzy resolution of free-text queries against live candidate titles.
//!
//! Three tiers, strongest first: exact case-insensitive equality (100),
//! substring containment (90), then a partial-ratio similarity score. The
//! tier order guarantees an exact match is never displaced by a fuzzy
//! score from an unrelated candidate.

use strsim::normalized_levenshtein;

use crate::services::Candidate;

/// Outcome of a resolution attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub title: Option<String>,
    pub score: u32,
}

impl Resolution {
    fn none() -> Self {
        Self {
            title: None,
            score: 0,
        }
    }
}

/// Best similarity between the shorter string and any equal-length window
/// of the longer one, scaled to 0-100.
pub fn partial_ratio(a: &str, b: &str) -> u32 {
    let a_chars: Vec<char> = a.chars().collect();
    let b_chars: Vec<char> = b.chars().collect();
    let (shorter, longer) = if a_chars.len() <= b_chars.len() {
        (a_chars, b_chars)
    } else {
        (b_chars, a_chars)
    };

    if shorter.is_empty() {
        return 0;
    }
    if shorter.len() == longer.len() {
        let a_str: String = shorter.iter().collect();
        let b_str: String = longer.iter().collect();
        return (normalized_levenshtein(&a_str, &b_str) * 100.0).round() as u32;
    }

    let needle: String = shorter.iter().collect();
    let mut best = 0.0f64;
    for window in longer.windows(shorter.len()) {
        let haystack: String = window.iter().collect();
        let score = normalized_levenshtein(&needle, &haystack);
        if score > best {
            best = score;
        }
    }
    (best * 100.0).round() as u32
}

/// Resolve a query against candidate titles.
pub fn resolve<C: Candidate>(query: &str, candidates: &[C], threshold: u32) -> Resolution {
    if candidates.is_empty() {
        return Resolution::none();
    }

    let query_lower = query.to_lowercase();

    for candidate in candidates {
        if candidate.display_title().to_lowercase() == query_lower {
            return Resolution {
                title: Some(candidate.display_title().to_string()),
                score: 100,
            };
        }
    }

    for candidate in candidates {
        if candidate
            .display_title()
            .to_lowercase()
            .contains(&query_lower)
        {
            return Resolution {
                title: Some(candidate.display_title().to_string()),
                score: 90,
            };
        }
    }

    let mut best: Option<(&str, u32)> = None;
    for candidate in candidates {
        let title = candidate.display_title();
        if title.is_empty() {
            continue;
        }
        let score = partial_ratio(&query_lower, &title.to_lowercase());
        if best.map_or(true, |(_, s)| score > s) {
            best = Some((title, score));
        }
    }

    match best {
        Some((title, score)) if score >= threshold => Resolution {
            title: Some(title.to_string()),
            score,
        },
        Some((_, score)) => Resolution { title: None, score },
        None => Resolution::none(),
    }
}
