//! Google Calendar collaborator.
//!
//! Client over the Calendar v3 REST API implementing `CalendarStore`.
//! Only the primary calendar is touched; event lookup scans the upcoming
//! window because the API has no exact-title query.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Local, NaiveDateTime, TimeZone, Utc};
use serde::Deserialize;

use crate::error::{AssistantError, Result};
use crate::services::google::{error_for_response, send_with_retry, GoogleAuth, RetryPolicy};
use crate::services::{CalendarStats, CalendarStore, CreatedEvent, EventRecord};

const CALENDAR_BASE: &str = "https://www.googleapis.com/calendar/v3";

// ============================================================================
// Raw API shapes
// ============================================================================

#[derive(Debug, Deserialize)]
struct RawEvents {
    #[serde(default)]
    items: Vec<RawEvent>,
    #[serde(rename = "nextPageToken")]
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawEvent {
    id: String,
    #[serde(default)]
    summary: Option<String>,
    #[serde(default)]
    start: Option<RawEventTime>,
    #[serde(default)]
    status: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawEventTime {
    #[serde(rename = "dateTime")]
    date_time: Option<String>,
    date: Option<String>,
}

fn record_from_raw(raw: RawEvent) -> EventRecord {
    let (start, all_day) = match raw.start {
        Some(RawEventTime {
            date_time: Some(dt),
            ..
        }) => (
            DateTime::parse_from_rfc3339(&dt)
                .ok()
                .map(|d| d.with_timezone(&Utc)),
            false,
        ),
        Some(RawEventTime {
            date: Some(d),
            date_time: None,
        }) => (
            chrono::NaiveDate::parse_from_str(&d, "%Y-%m-%d")
                .ok()
                .and_then(|nd| nd.and_hms_opt(0, 0, 0))
                .map(|ndt| ndt.and_utc()),
            true,
        ),
        _ => (None, false),
    };

    EventRecord {
        id: raw.id,
        title: raw.summary.unwrap_or_else(|| "(no title)".to_string()),
        start,
        all_day,
    }
}

/// Interpret a wall-clock time in the machine's local zone, RFC 3339.
fn local_rfc3339(naive: NaiveDateTime) -> String {
    match Local.from_local_datetime(&naive) {
        chrono::LocalResult::Single(dt) | chrono::LocalResult::Ambiguous(dt, _) => dt.to_rfc3339(),
        // DST gap: shift forward an hour and take whatever that maps to.
        chrono::LocalResult::None => {
            let shifted = naive + Duration::hours(1);
            match Local.from_local_datetime(&shifted) {
                chrono::LocalResult::Single(dt) | chrono::LocalResult::Ambiguous(dt, _) => {
                    dt.to_rfc3339()
                }
                chrono::LocalResult::None => naive.and_utc().to_rfc3339(),
            }
        }
    }
}

// ============================================================================
// Client
// ============================================================================

pub struct GoogleCalendar {
    auth: Arc<GoogleAuth>,
    client: reqwest::Client,
    retry: RetryPolicy,
}

impl GoogleCalendar {
    pub fn new(auth: Arc<GoogleAuth>) -> Self {
        Self {
            auth,
            client: reqwest::Client::new(),
            retry: RetryPolicy::default(),
        }
    }

    async fn events_between(
        &self,
        time_min: DateTime<Utc>,
        time_max: DateTime<Utc>,
    ) -> Result<Vec<EventRecord>> {
        let token = self.auth.access_token().await?;
        let mut records = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut request = self
                .client
                .get(format!("{}/calendars/primary/events", CALENDAR_BASE))
                .bearer_auth(&token)
                .query(&[
                    ("timeMin", time_min.to_rfc3339()),
                    ("timeMax", time_max.to_rfc3339()),
                    ("singleEvents", "true".to_string()),
                    ("orderBy", "startTime".to_string()),
                    ("maxResults", "250".to_string()),
                ]);
            if let Some(ref pt) = page_token {
                request = request.query(&[("pageToken", pt.as_str())]);
            }

            let resp = send_with_retry(request, &self.retry).await?;
            if !resp.status().is_success() {
                return Err(error_for_response(resp).await);
            }
            let page: RawEvents = resp.json().await?;
            records.extend(
                page.items
                    .into_iter()
                    .filter(|e| e.status.as_deref() != Some("cancelled"))
                    .map(record_from_raw),
            );
            match page.next_page_token {
                Some(pt) => page_token = Some(pt),
                None => break,
            }
        }

        Ok(records)
    }

    /// Locate an upcoming event by exact title.
    async fn find_by_title(&self, title: &str) -> Result<String> {
        let now = Utc::now();
        let events = self.events_between(now, now + Duration::days(365)).await?;
        events
            .into_iter()
            .find(|e| e.title == title)
            .map(|e| e.id)
            .ok_or_else(|| AssistantError::NotFound {
                kind: "Event",
                query: title.to_string(),
            })
    }
}

#[async_trait]
impl CalendarStore for GoogleCalendar {
    async fn create(&self, title: &str, start: NaiveDateTime) -> Result<CreatedEvent> {
        let end = start + Duration::hours(1);
        let body = serde_json::json!({
            "summary": title,
            "start": { "dateTime": local_rfc3339(start) },
            "end": { "dateTime": local_rfc3339(end) },
        });

        let token = self.auth.access_token().await?;
        let resp = send_with_retry(
            self.client
                .post(format!("{}/calendars/primary/events", CALENDAR_BASE))
                .bearer_auth(&token)
                .json(&body),
            &self.retry,
        )
        .await?;
        if !resp.status().is_success() {
            return Err(error_for_response(resp).await);
        }

        Ok(CreatedEvent {
            title: title.to_string(),
            start,
        })
    }

    async fn list_upcoming(&self, days: i64) -> Result<Vec<EventRecord>> {
        let now = Utc::now();
        self.events_between(now, now + Duration::days(days)).await
    }

    async fn delete(&self, title: &str) -> Result<()> {
        let event_id = self.find_by_title(title).await?;
        let token = self.auth.access_token().await?;
        let resp = send_with_retry(
            self.client
                .delete(format!(
                    "{}/calendars/primary/events/{}",
                    CALENDAR_BASE, event_id
                ))
                .bearer_auth(&token),
            &self.retry,
        )
        .await?;
        if !resp.status().is_success() {
            return Err(error_for_response(resp).await);
        }
        Ok(())
    }

    async fn reschedule(&self, title: &str, new_start: NaiveDateTime) -> Result<()> {
        let event_id = self.find_by_title(title).await?;
        let new_end = new_start + Duration::hours(1);
        let body = serde_json::json!({
            "start": { "dateTime": local_rfc3339(new_start) },
            "end": { "dateTime": local_rfc3339(new_end) },
        });

        let token = self.auth.access_token().await?;
        let resp = send_with_retry(
            self.client
                .patch(format!(
                    "{}/calendars/primary/events/{}",
                    CALENDAR_BASE, event_id
                ))
                .bearer_auth(&token)
                .json(&body),
            &self.retry,
        )
        .await?;
        if !resp.status().is_success() {
            return Err(error_for_response(resp).await);
        }
        Ok(())
    }

    async fn search(&self, query: &str) -> Result<Vec<EventRecord>> {
        let needle = query.to_lowercase();
        let events = self.list_upcoming(365).await?;
        Ok(events
            .into_iter()
            .filter(|e| e.title.to_lowercase().contains(&needle))
            .collect())
    }

    async fn statistics(&self) -> Result<CalendarStats> {
        let now = Utc::now();
        let local_today = Local::now().date_naive();
        let events = self.events_between(now, now + Duration::days(7)).await?;

        let mut stats = CalendarStats::default();
        stats.upcoming_week = events.len();
        for event in &events {
            let Some(start) = event.start else { continue };
            let event_day = start.with_timezone(&Local).date_naive();
            if event_day == local_today {
                stats.events_today += 1;
            } else if event_day == local_today + Duration::days(1) {
                stats.events_tomorrow += 1;
            }
        }
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timed_event_parses_start() {
        let json = r#"{
            "id": "evt1",
            "summary": "Team Sync",
            "start": { "dateTime": "2026-08-28T15:00:00+00:00" }
        }"#;
        let raw: RawEvent = serde_json::from_str(json).unwrap();
        let record = record_from_raw(raw);
        assert_eq!(record.title, "Team Sync");
        assert!(!record.all_day);
        assert_eq!(
            record.start.unwrap().format("%H:%M").to_string(),
            "15:00"
        );
    }

    #[test]
    fn test_all_day_event_detected() {
        let json = r#"{
            "id": "evt2",
            "summary": "Company Holiday",
            "start": { "date": "2026-09-07" }
        }"#;
        let raw: RawEvent = serde_json::from_str(json).unwrap();
        let record = record_from_raw(raw);
        assert!(record.all_day);
        assert!(record.start.is_some());
    }

    #[test]
    fn test_missing_summary_falls_back() {
        let json = r#"{"id": "evt3"}"#;
        let raw: RawEvent = serde_json::from_str(json).unwrap();
        let record = record_from_raw(raw);
        assert_eq!(record.title, "(no title)");
        assert!(record.start.is_none());
    }

    #[test]
    fn test_local_rfc3339_keeps_wall_clock() {
        let naive = chrono::NaiveDate::from_ymd_opt(2026, 8, 28)
            .unwrap()
            .and_hms_opt(15, 0, 0)
            .unwrap();
        let rendered = local_rfc3339(naive);
        assert!(rendered.starts_with("2026-08-28T15:00:00"));
    }
}
