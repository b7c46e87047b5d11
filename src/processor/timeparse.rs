//! Date and time extraction from free-form directives.
//!
//! Both parsers are ordered cascades: each rule either produces a value or
//! passes to the next, and the final rule is a default, so parsing never
//! fails. All functions take the reference clock as an argument; nothing
//! here reads the system time.

use std::sync::OnceLock;

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime};
use regex::Regex;

fn weekday_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // Full names before abbreviations so the whole word is captured. The
    // word boundary keeps "next month" from reading as "mon".
    RE.get_or_init(|| {
        Regex::new(
            r"\b(monday|tuesday|wednesday|thursday|friday|saturday|sunday|mon|tue|tues|wed|thu|thur|thurs|fri|sat|sun)\b",
        )
        .unwrap()
    })
}

fn day_month_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\b(\d{1,2})\s+(jan|feb|mar|apr|may|jun|jul|aug|sep|oct|nov|dec)[a-z]*\b")
            .unwrap()
    })
}

fn month_day_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\b(jan|feb|mar|apr|may|jun|jul|aug|sep|oct|nov|dec)[a-z]*\s+(\d{1,2})\b")
            .unwrap()
    })
}

fn month_token_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\b(jan|feb|mar|apr|may|jun|jul|aug|sep|oct|nov|dec)[a-z]*\b").unwrap()
    })
}

fn clock_ampm_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\b(\d{1,2}):(\d{2})\s*(am|pm)\b").unwrap())
}

fn hour_ampm_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\b(\d{1,2})\s*(am|pm)\b").unwrap())
}

fn bare_clock_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\b(\d{1,2}):(\d{2})\b").unwrap())
}

fn at_hour_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\bat\s+(\d{1,2})(?::(\d{2}))?\s*(am|pm)?\b").unwrap())
}

fn slash_date_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\b\d{1,2}[/-]\d{1,2}\b").unwrap())
}

fn weekday_index(name: &str) -> u32 {
    match &name[..3.min(name.len())] {
        "mon" => 0,
        "tue" => 1,
        "wed" => 2,
        "thu" => 3,
        "fri" => 4,
        "sat" => 5,
        _ => 6,
    }
}

fn month_number(prefix: &str) -> u32 {
    match prefix {
        "jan" => 1,
        "feb" => 2,
        "mar" => 3,
        "apr" => 4,
        "may" => 5,
        "jun" => 6,
        "jul" => 7,
        "aug" => 8,
        "sep" => 9,
        "oct" => 10,
        "nov" => 11,
        _ => 12,
    }
}

/// Resolve a day-of-month + month pair against the current year, rolling
/// into next year when the date has already passed. Invalid combinations
/// (e.g. "31 feb") yield None so the cascade continues.
fn resolve_day_month(day: u32, month: u32, today: NaiveDate) -> Option<NaiveDate> {
    let this_year = NaiveDate::from_ymd_opt(today.year(), month, day)?;
    if this_year < today {
        NaiveDate::from_ymd_opt(today.year() + 1, month, day)
    } else {
        Some(this_year)
    }
}

/// Extract a date from lowercased directive text.
///
/// Cascade order: named weekday, explicit day + month, relative words,
/// then today as the terminal default.
pub fn parse_date(text: &str, now: NaiveDateTime) -> NaiveDate {
    let today = now.date();

    // Named weekday. "next friday" skips a full week past the nearest one;
    // a plain weekday means the nearest strictly-future occurrence, so the
    // same weekday as today rolls a week ahead.
    if let Some(caps) = weekday_re().captures(text) {
        let target = weekday_index(&caps[1]);
        let current = today.weekday().num_days_from_monday();
        let mut days_ahead = (target as i64 - current as i64).rem_euclid(7);
        if days_ahead == 0 {
            days_ahead = 7;
        }
        if text.contains(&format!("next {}", &caps[1])) {
            days_ahead += 7;
        }
        return today + Duration::days(days_ahead);
    }

    // "28 aug" / "aug 28" with year rollover.
    if let Some(caps) = day_month_re().captures(text) {
        let day: u32 = caps[1].parse().unwrap_or(0);
        let month = month_number(&caps[2][..3]);
        if let Some(date) = resolve_day_month(day, month, today) {
            return date;
        }
    }
    if let Some(caps) = month_day_re().captures(text) {
        let month = month_number(&caps[1][..3]);
        let day: u32 = caps[2].parse().unwrap_or(0);
        if let Some(date) = resolve_day_month(day, month, today) {
            return date;
        }
    }

    // Relative words. "day after tomorrow" must win over "tomorrow".
    if text.contains("day after tomorrow") {
        return today + Duration::days(2);
    }
    if text.contains("tomorrow") {
        return today + Duration::days(1);
    }
    if text.contains("today") {
        return today;
    }
    if text.contains("yesterday") {
        return today - Duration::days(1);
    }
    if text.contains("next week") {
        return today + Duration::days(7);
    }
    if text.contains("next month") {
        return today + Duration::days(30);
    }

    today
}

fn normalize_ampm(hour: u32, suffix: &str) -> Option<u32> {
    if hour == 0 || hour > 12 {
        return None;
    }
    Some(match (suffix, hour) {
        ("pm", h) if h < 12 => h + 12,
        ("am", 12) => 0,
        (_, h) => h,
    })
}

/// Extract an explicitly stated time of day, if any.
///
/// Cascade order: clock with am/pm, bare hour with am/pm, 24-hour clock
/// (only when no am/pm appears anywhere), "at N", then part-of-day words.
/// Out-of-range numbers are treated as non-matches, not errors.
pub fn parse_time_explicit(text: &str) -> Option<NaiveTime> {
    if let Some(caps) = clock_ampm_re().captures(text) {
        let hour: u32 = caps[1].parse().ok()?;
        let minute: u32 = caps[2].parse().ok()?;
        if minute < 60 {
            if let Some(h) = normalize_ampm(hour, &caps[3]) {
                return NaiveTime::from_hms_opt(h, minute, 0);
            }
        }
    }

    if let Some(caps) = hour_ampm_re().captures(text) {
        if let Ok(hour) = caps[1].parse::<u32>() {
            if let Some(h) = normalize_ampm(hour, &caps[2]) {
                return NaiveTime::from_hms_opt(h, 0, 0);
            }
        }
    }

    let has_ampm = text.contains("am") || text.contains("pm");
    if !has_ampm {
        if let Some(caps) = bare_clock_re().captures(text) {
            let hour: u32 = caps[1].parse().ok()?;
            let minute: u32 = caps[2].parse().ok()?;
            if hour < 24 && minute < 60 {
                return NaiveTime::from_hms_opt(hour, minute, 0);
            }
        }
    }

    if let Some(caps) = at_hour_re().captures(text) {
        let hour: u32 = caps[1].parse().ok()?;
        let minute: u32 = caps
            .get(2)
            .map(|m| m.as_str().parse().unwrap_or(0))
            .unwrap_or(0);
        // An out-of-range hour is a non-match; later rules still apply.
        let resolved = match caps.get(3) {
            Some(suffix) => normalize_ampm(hour, suffix.as_str()),
            // No am/pm: small hours read as afternoon.
            None if hour <= 11 => Some(hour + 12),
            None => Some(hour),
        };
        if let Some(h) = resolved {
            if h < 24 && minute < 60 {
                return NaiveTime::from_hms_opt(h, minute, 0);
            }
        }
    }

    let part_of_day: &[(&str, (u32, u32))] = &[
        ("noon", (12, 0)),
        ("midday", (12, 0)),
        ("midnight", (0, 0)),
        ("lunch", (12, 30)),
        ("dinner", (19, 0)),
        ("morning", (9, 0)),
        ("afternoon", (14, 0)),
        ("evening", (18, 0)),
        ("tonight", (20, 0)),
        ("night", (20, 0)),
    ];
    for (word, (h, m)) in part_of_day {
        if text.contains(word) {
            return NaiveTime::from_hms_opt(*h, *m, 0);
        }
    }

    None
}

/// Time of day, defaulting to 14:00 when nothing explicit is present.
pub fn parse_time(text: &str) -> NaiveTime {
    parse_time_explicit(text).unwrap_or_else(|| NaiveTime::from_hms_opt(14, 0, 0).unwrap())
}

fn has_anchor_token(text: &str, email_mode: bool) -> bool {
    // Scheduled sends only treat written dates as anchors, so "today at
    // 9am" after 9am still rolls to tomorrow instead of firing at once.
    if email_mode {
        return month_token_re().is_match(text) || slash_date_re().is_match(text);
    }
    text.contains("tomorrow") || text.contains("today") || month_token_re().is_match(text)
}

fn combine(text: &str, now: NaiveDateTime, email_mode: bool) -> NaiveDateTime {
    let combined = parse_date(text, now).and_time(parse_time(text));
    // A past result with no explicit date anchor means the nearest future
    // occurrence of that time.
    if combined < now && !has_anchor_token(text, email_mode) {
        combined + Duration::days(1)
    } else {
        combined
    }
}

/// Full date + time for event directives.
pub fn parse_datetime(text: &str, now: NaiveDateTime) -> NaiveDateTime {
    combine(text, now, false)
}

/// Date + time for scheduled sends. Only written dates anchor — a month
/// name or a slash date like `28/8` — so a past result is honored instead
/// of bumped; relative words like "today" do not pin the date.
pub fn parse_datetime_for_email(text: &str, now: NaiveDateTime) -> NaiveDateTime {
    combine(text, now, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    // 2026-08-19 is a Wednesday.
    fn wednesday_noon() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 8, 19)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_plain_weekday_is_nearest_future() {
        let now = wednesday_noon();
        assert_eq!(parse_date("meeting on monday", now), date(2026, 8, 24));
        assert_eq!(parse_date("meeting on friday", now), date(2026, 8, 21));
    }

    #[test]
    fn test_same_weekday_rolls_a_week() {
        let now = wednesday_noon();
        assert_eq!(parse_date("on wednesday", now), date(2026, 8, 26));
    }

    #[test]
    fn test_next_weekday_skips_a_week() {
        let now = wednesday_noon();
        assert_eq!(parse_date("next monday", now), date(2026, 8, 31));
        assert_eq!(parse_date("next wednesday", now), date(2026, 9, 2));
    }

    #[test]
    fn test_weekday_abbreviations() {
        let now = wednesday_noon();
        assert_eq!(parse_date("due fri", now), date(2026, 8, 21));
        assert_eq!(parse_date("next mon", now), date(2026, 8, 31));
    }

    #[test]
    fn test_next_month_does_not_read_as_monday() {
        let now = wednesday_noon();
        assert_eq!(parse_date("sometime next month", now), date(2026, 9, 18));
    }

    #[test]
    fn test_day_month_both_orders() {
        let now = wednesday_noon();
        assert_eq!(parse_date("on 28 august", now), date(2026, 8, 28));
        assert_eq!(parse_date("on august 28", now), date(2026, 8, 28));
        assert_eq!(parse_date("on aug 28", now), date(2026, 8, 28));
    }

    #[test]
    fn test_passed_date_rolls_to_next_year() {
        let now = wednesday_noon();
        assert_eq!(parse_date("on 3 january", now), date(2027, 1, 3));
    }

    #[test]
    fn test_invalid_day_month_falls_through() {
        let now = wednesday_noon();
        // "31 feb" never exists in either year; cascade lands on default.
        assert_eq!(parse_date("due 31 feb", now), date(2026, 8, 19));
    }

    #[test]
    fn test_relative_words() {
        let now = wednesday_noon();
        assert_eq!(parse_date("today please", now), date(2026, 8, 19));
        assert_eq!(parse_date("tomorrow", now), date(2026, 8, 20));
        assert_eq!(parse_date("day after tomorrow", now), date(2026, 8, 21));
        assert_eq!(parse_date("since yesterday", now), date(2026, 8, 18));
        assert_eq!(parse_date("next week", now), date(2026, 8, 26));
    }

    #[test]
    fn test_date_default_is_today() {
        let now = wednesday_noon();
        assert_eq!(parse_date("do the thing", now), date(2026, 8, 19));
    }

    #[test]
    fn test_clock_with_ampm() {
        assert_eq!(
            parse_time_explicit("at 3:30 pm"),
            NaiveTime::from_hms_opt(15, 30, 0)
        );
        assert_eq!(
            parse_time_explicit("at 3:30pm"),
            NaiveTime::from_hms_opt(15, 30, 0)
        );
    }

    #[test]
    fn test_hour_with_ampm() {
        assert_eq!(
            parse_time_explicit("at 9 pm"),
            NaiveTime::from_hms_opt(21, 0, 0)
        );
        assert_eq!(
            parse_time_explicit("at 9am"),
            NaiveTime::from_hms_opt(9, 0, 0)
        );
    }

    #[test]
    fn test_ampm_edge_hours() {
        assert_eq!(
            parse_time_explicit("12am sharp"),
            NaiveTime::from_hms_opt(0, 0, 0)
        );
        assert_eq!(
            parse_time_explicit("12pm sharp"),
            NaiveTime::from_hms_opt(12, 0, 0)
        );
    }

    #[test]
    fn test_bare_clock_without_ampm_token() {
        assert_eq!(
            parse_time_explicit("meet at 16:45"),
            NaiveTime::from_hms_opt(16, 45, 0)
        );
    }

    #[test]
    fn test_at_hour_assumes_afternoon() {
        assert_eq!(
            parse_time_explicit("meeting at 3"),
            NaiveTime::from_hms_opt(15, 0, 0)
        );
        assert_eq!(
            parse_time_explicit("meeting at 14"),
            NaiveTime::from_hms_opt(14, 0, 0)
        );
    }

    #[test]
    fn test_part_of_day_words() {
        assert_eq!(
            parse_time_explicit("around noon"),
            NaiveTime::from_hms_opt(12, 0, 0)
        );
        assert_eq!(
            parse_time_explicit("in the evening"),
            NaiveTime::from_hms_opt(18, 0, 0)
        );
        assert_eq!(
            parse_time_explicit("at lunch"),
            NaiveTime::from_hms_opt(12, 30, 0)
        );
        assert_eq!(
            parse_time_explicit("tonight"),
            NaiveTime::from_hms_opt(20, 0, 0)
        );
    }

    #[test]
    fn test_time_default() {
        assert_eq!(parse_time("no time here"), NaiveTime::from_hms_opt(14, 0, 0).unwrap());
        assert_eq!(parse_time_explicit("no time here"), None);
    }

    #[test]
    fn test_out_of_range_hour_falls_through() {
        // 25pm is nonsense; the cascade keeps going and finds nothing.
        assert_eq!(parse_time_explicit("at 25pm"), None);
    }

    #[test]
    fn test_out_of_range_hour_still_reaches_later_rules() {
        assert_eq!(
            parse_time_explicit("dinner at 25pm"),
            NaiveTime::from_hms_opt(19, 0, 0)
        );
    }

    #[test]
    fn test_past_combination_bumps_a_day() {
        let now = wednesday_noon(); // 12:00
        let dt = parse_datetime("call at 9am", now);
        assert_eq!(dt.date(), date(2026, 8, 20));
        assert_eq!(dt.time(), NaiveTime::from_hms_opt(9, 0, 0).unwrap());
    }

    #[test]
    fn test_today_anchor_suppresses_bump() {
        let now = wednesday_noon();
        let dt = parse_datetime("today at 9am", now);
        assert_eq!(dt.date(), date(2026, 8, 19));
    }

    #[test]
    fn test_yesterday_can_land_on_today() {
        let now = wednesday_noon();
        let dt = parse_datetime("yesterday at 9am", now);
        // Past with no anchor word rolls forward to the nearest future slot.
        assert_eq!(dt.date(), date(2026, 8, 19));
        assert_eq!(dt.time(), NaiveTime::from_hms_opt(9, 0, 0).unwrap());
    }

    #[test]
    fn test_email_mode_today_does_not_anchor() {
        let now = wednesday_noon();
        // A morning time spoken after it has passed schedules for tomorrow,
        // even with "today" in the text.
        let dt = parse_datetime_for_email("send today at 9am", now);
        assert_eq!(dt.date(), date(2026, 8, 20));
        assert_eq!(
            parse_datetime("today at 9am", now).date(),
            date(2026, 8, 19)
        );
    }

    #[test]
    fn test_email_mode_slash_date_anchors() {
        let now = wednesday_noon();
        let dt = parse_datetime_for_email("send on 15/8 at 9am", now);
        // Slash date is an explicit anchor; the past result stands.
        assert_eq!(dt.date(), date(2026, 8, 19));
        let plain = parse_datetime("send on 15/8 at 9am", now);
        assert_eq!(plain.date(), date(2026, 8, 20));
    }
}
