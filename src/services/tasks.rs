//! Google Tasks collaborator.
//!
//! Thin client over the Tasks v1 REST API implementing `TaskStore`. Tasks
//! are addressed by exact title; fuzzy matching happens upstream in the
//! resolver, so by the time a call lands here the title is canonical.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Deserialize;

use crate::error::{AssistantError, Result};
use crate::services::google::{error_for_response, send_with_retry, GoogleAuth, RetryPolicy};
use crate::services::{CreatedTask, TaskRecord, TaskStats, TaskStatus, TaskStore};

const TASKS_BASE: &str = "https://tasks.googleapis.com/tasks/v1";
const DEFAULT_LIST: &str = "My Tasks";

// ============================================================================
// Raw API shapes
// ============================================================================

#[derive(Debug, Deserialize)]
struct RawTaskLists {
    #[serde(default)]
    items: Vec<RawTaskList>,
}

#[derive(Debug, Deserialize)]
struct RawTaskList {
    id: String,
    #[serde(default)]
    title: String,
}

#[derive(Debug, Deserialize)]
struct RawTasks {
    #[serde(default)]
    items: Vec<RawTask>,
    #[serde(rename = "nextPageToken")]
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawTask {
    id: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    due: Option<String>,
}

fn parse_due(raw: Option<&str>) -> Option<DateTime<Utc>> {
    raw.and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&Utc))
}

fn record_from_raw(raw: RawTask, list_title: &str) -> TaskRecord {
    let status = match raw.status.as_deref() {
        Some("completed") => TaskStatus::Completed,
        _ => TaskStatus::NeedsAction,
    };
    TaskRecord {
        id: raw.id,
        title: raw.title,
        status,
        due: parse_due(raw.due.as_deref()),
        list: list_title.to_string(),
    }
}

// ============================================================================
// Client
// ============================================================================

pub struct GoogleTasks {
    auth: Arc<GoogleAuth>,
    client: reqwest::Client,
    retry: RetryPolicy,
}

impl GoogleTasks {
    pub fn new(auth: Arc<GoogleAuth>) -> Self {
        Self {
            auth,
            client: reqwest::Client::new(),
            retry: RetryPolicy::default(),
        }
    }

    async fn task_lists(&self) -> Result<Vec<RawTaskList>> {
        let token = self.auth.access_token().await?;
        let resp = send_with_retry(
            self.client
                .get(format!("{}/users/@me/lists", TASKS_BASE))
                .bearer_auth(&token),
            &self.retry,
        )
        .await?;
        if !resp.status().is_success() {
            return Err(error_for_response(resp).await);
        }
        let lists: RawTaskLists = resp.json().await?;
        Ok(lists.items)
    }

    /// The list id for `name`, creating the list when it does not exist.
    async fn ensure_list(&self, name: &str) -> Result<String> {
        let lists = self.task_lists().await?;
        if let Some(found) = lists
            .iter()
            .find(|l| l.title.eq_ignore_ascii_case(name))
        {
            return Ok(found.id.clone());
        }

        log::info!("creating task list '{}'", name);
        let token = self.auth.access_token().await?;
        let resp = send_with_retry(
            self.client
                .post(format!("{}/users/@me/lists", TASKS_BASE))
                .bearer_auth(&token)
                .json(&serde_json::json!({ "title": name })),
            &self.retry,
        )
        .await?;
        if !resp.status().is_success() {
            return Err(error_for_response(resp).await);
        }
        let created: RawTaskList = resp.json().await?;
        Ok(created.id)
    }

    async fn tasks_in_list(&self, list_id: &str, list_title: &str) -> Result<Vec<TaskRecord>> {
        let token = self.auth.access_token().await?;
        let mut records = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut request = self
                .client
                .get(format!("{}/lists/{}/tasks", TASKS_BASE, list_id))
                .bearer_auth(&token)
                .query(&[
                    ("showCompleted", "true"),
                    ("showHidden", "true"),
                    ("maxResults", "100"),
                ]);
            if let Some(ref pt) = page_token {
                request = request.query(&[("pageToken", pt.as_str())]);
            }

            let resp = send_with_retry(request, &self.retry).await?;
            if !resp.status().is_success() {
                return Err(error_for_response(resp).await);
            }
            let page: RawTasks = resp.json().await?;
            records.extend(
                page.items
                    .into_iter()
                    .map(|raw| record_from_raw(raw, list_title)),
            );
            match page.next_page_token {
                Some(pt) => page_token = Some(pt),
                None => break,
            }
        }

        Ok(records)
    }

    /// Locate a task by exact title across every list.
    async fn find_by_title(&self, title: &str) -> Result<(String, String)> {
        for list in self.task_lists().await? {
            for task in self.tasks_in_list(&list.id, &list.title).await? {
                if task.title == title {
                    return Ok((list.id, task.id));
                }
            }
        }
        Err(AssistantError::NotFound {
            kind: "Task",
            query: title.to_string(),
        })
    }

    async fn patch_task(
        &self,
        list_id: &str,
        task_id: &str,
        body: serde_json::Value,
    ) -> Result<()> {
        let token = self.auth.access_token().await?;
        let resp = send_with_retry(
            self.client
                .patch(format!("{}/lists/{}/tasks/{}", TASKS_BASE, list_id, task_id))
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
}

#[async_trait]
impl TaskStore for GoogleTasks {
    async fn create(
        &self,
        title: &str,
        list: &str,
        due: Option<NaiveDateTime>,
    ) -> Result<CreatedTask> {
        let list_name = if list.is_empty() { DEFAULT_LIST } else { list };
        let list_id = self.ensure_list(list_name).await?;

        let mut body = serde_json::json!({ "title": title });
        if let Some(due) = due {
            // Tasks API keeps the date component only but expects RFC 3339.
            body["due"] = serde_json::Value::String(due.and_utc().to_rfc3339());
        }

        let token = self.auth.access_token().await?;
        let resp = send_with_retry(
            self.client
                .post(format!("{}/lists/{}/tasks", TASKS_BASE, list_id))
                .bearer_auth(&token)
                .json(&body),
            &self.retry,
        )
        .await?;
        if !resp.status().is_success() {
            return Err(error_for_response(resp).await);
        }

        Ok(CreatedTask {
            title: title.to_string(),
            list: list_name.to_string(),
            due,
        })
    }

    async fn list_all(&self) -> Result<Vec<TaskRecord>> {
        let mut all = Vec::new();
        for list in self.task_lists().await? {
            all.extend(self.tasks_in_list(&list.id, &list.title).await?);
        }
        Ok(all)
    }

    async fn complete(&self, title: &str) -> Result<()> {
        let (list_id, task_id) = self.find_by_title(title).await?;
        self.patch_task(&list_id, &task_id, serde_json::json!({ "status": "completed" }))
            .await
    }

    async fn delete(&self, title: &str) -> Result<()> {
        let (list_id, task_id) = self.find_by_title(title).await?;
        let token = self.auth.access_token().await?;
        let resp = send_with_retry(
            self.client
                .delete(format!("{}/lists/{}/tasks/{}", TASKS_BASE, list_id, task_id))
                .bearer_auth(&token),
            &self.retry,
        )
        .await?;
        if !resp.status().is_success() {
            return Err(error_for_response(resp).await);
        }
        Ok(())
    }

    async fn update_due(&self, title: &str, due: NaiveDateTime) -> Result<()> {
        let (list_id, task_id) = self.find_by_title(title).await?;
        self.patch_task(
            &list_id,
            &task_id,
            serde_json::json!({ "due": due.and_utc().to_rfc3339() }),
        )
        .await
    }

    async fn search(&self, query: &str) -> Result<Vec<TaskRecord>> {
        let needle = query.to_lowercase();
        let all = self.list_all().await?;
        Ok(all
            .into_iter()
            .filter(|t| t.title.to_lowercase().contains(&needle))
            .collect())
    }

    async fn statistics(&self) -> Result<TaskStats> {
        let all = self.list_all().await?;
        let completed = all
            .iter()
            .filter(|t| t.status == TaskStatus::Completed)
            .count();
        Ok(TaskStats {
            total: all.len(),
            completed,
            pending: all.len() - completed,
        })
    }
}
