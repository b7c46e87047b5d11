//! Shared Google API plumbing: OAuth token storage, refresh, retrying HTTP.
//!
//! The token file format matches what google-auth writes, so a token minted
//! by any standard OAuth helper works as-is. All three Google-backed
//! collaborators (tasks, calendar, gmail) share one `GoogleAuth`.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::error::{AssistantError, Result};

/// OAuth2 token payload persisted at `~/.deskmate/google/token.json`.
///
/// Both `token` and `access_token` are accepted on read for compatibility
/// with tokens written by other tooling.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GoogleToken {
    #[serde(alias = "access_token")]
    pub token: String,
    pub refresh_token: Option<String>,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
    pub client_id: String,
    #[serde(default)]
    pub client_secret: Option<String>,
    #[serde(default)]
    pub scopes: Vec<String>,
    /// Token expiry time (ISO 8601).
    #[serde(default)]
    pub expiry: Option<String>,
    /// Authenticated user email.
    #[serde(default, alias = "email")]
    pub account: Option<String>,
}

fn default_token_uri() -> String {
    "https://oauth2.googleapis.com/token".to_string()
}

/// Path to the persisted token file.
pub fn token_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_default()
        .join(".deskmate")
        .join("google")
        .join("token.json")
}

/// Check if a token is expired (60 s clock-skew margin).
pub fn is_token_expired(token: &GoogleToken) -> bool {
    match &token.expiry {
        None => true, // No expiry = assume expired, try refresh
        Some(expiry_str) => {
            match chrono::DateTime::parse_from_rfc3339(&expiry_str.replace('Z', "+00:00"))
                .or_else(|_| chrono::DateTime::parse_from_rfc3339(expiry_str))
            {
                Ok(expiry) => expiry <= chrono::Utc::now() + chrono::Duration::seconds(60),
                Err(_) => true,
            }
        }
    }
}

/// Token holder shared by the Google-backed collaborators.
///
/// Refreshes are serialized behind a tokio Mutex so concurrent callers
/// never race two refresh requests against the same refresh token.
pub struct GoogleAuth {
    token: Mutex<GoogleToken>,
    client: reqwest::Client,
}

impl GoogleAuth {
    /// Load the token from disk. Errors if the file is missing — callers
    /// turn that into an `Unavailable` capability, not a crash.
    pub fn load() -> Result<Self> {
        let path = token_path();
        if !path.exists() {
            return Err(AssistantError::TokenNotFound(path));
        }
        let content = std::fs::read_to_string(&path)?;
        let token: GoogleToken = serde_json::from_str(&content)?;
        Ok(Self {
            token: Mutex::new(token),
            client: reqwest::Client::new(),
        })
    }

    /// The authenticated account email, if the token carries one.
    pub async fn account(&self) -> Option<String> {
        self.token.lock().await.account.clone()
    }

    /// A valid access token, refreshing first when expired.
    pub async fn access_token(&self) -> Result<String> {
        let mut guard = self.token.lock().await;
        if is_token_expired(&guard) {
            let refreshed = self.refresh(&guard).await?;
            *guard = refreshed;
        }
        Ok(guard.token.clone())
    }

    async fn refresh(&self, token: &GoogleToken) -> Result<GoogleToken> {
        let refresh_token = token
            .refresh_token
            .as_deref()
            .ok_or(AssistantError::AuthExpired)?;

        let mut form = vec![
            ("client_id", token.client_id.as_str()),
            ("refresh_token", refresh_token),
            ("grant_type", "refresh_token"),
        ];
        if let Some(secret) = token.client_secret.as_deref() {
            form.push(("client_secret", secret));
        }

        let resp = self.client.post(&token.token_uri).form(&form).send().await?;
        let status = resp.status();
        let body_text = resp.text().await.unwrap_or_default();

        if !status.is_success() {
            let lowered = body_text.to_lowercase();
            if (status.as_u16() == 400 || status.as_u16() == 401)
                && lowered.contains("invalid_grant")
            {
                return Err(AssistantError::AuthExpired);
            }
            return Err(AssistantError::RefreshFailed(format!(
                "HTTP {}: {}",
                status, body_text
            )));
        }

        let body: serde_json::Value = serde_json::from_str(&body_text)?;
        let access_token = body["access_token"]
            .as_str()
            .ok_or_else(|| AssistantError::RefreshFailed("No access_token in response".into()))?;
        let expires_in = body["expires_in"].as_u64().unwrap_or(3600);
        let expiry = chrono::Utc::now() + chrono::Duration::seconds(expires_in as i64);

        let mut new_token = token.clone();
        new_token.token = access_token.to_string();
        new_token.expiry = Some(expiry.to_rfc3339());

        // Best-effort persist; a read-only home dir only costs a refresh
        // on the next start.
        let path = token_path();
        if let Some(parent) = path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        if let Ok(json) = serde_json::to_string_pretty(&new_token) {
            if let Err(e) = std::fs::write(&path, json) {
                log::warn!("could not persist refreshed token: {}", e);
            }
        }

        Ok(new_token)
    }
}

// ============================================================================
// Retrying HTTP
// ============================================================================

/// Retry budget for one logical API call.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub base: Duration,
    pub ceiling: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            base: Duration::from_millis(200),
            ceiling: Duration::from_secs(3),
        }
    }
}

impl RetryPolicy {
    /// Wait before the next try: a Retry-After hint when the server sent
    /// one, otherwise doubling backoff under the ceiling, plus jitter so
    /// parallel callers spread out.
    fn backoff(
        &self,
        attempt: u32,
        retry_after: Option<&reqwest::header::HeaderValue>,
    ) -> Duration {
        let hinted = retry_after
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<u64>().ok());
        if let Some(secs) = hinted {
            return Duration::from_secs(secs.clamp(1, 30));
        }

        let doubled = self
            .base
            .saturating_mul(1u32 << attempt.saturating_sub(1).min(16));
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.subsec_nanos())
            .unwrap_or(0);
        doubled.min(self.ceiling) + Duration::from_millis(u64::from(nanos % 125))
    }
}

fn retryable_status(status: reqwest::StatusCode) -> bool {
    status == reqwest::StatusCode::TOO_MANY_REQUESTS
        || status == reqwest::StatusCode::REQUEST_TIMEOUT
        || status.is_server_error()
}

/// Send a request, retrying on 429/408/5xx and transport errors.
pub async fn send_with_retry(
    request: reqwest::RequestBuilder,
    policy: &RetryPolicy,
) -> Result<reqwest::Response> {
    let budget = policy.attempts.max(1);
    let mut attempt = 0;
    loop {
        attempt += 1;
        let exhausted = attempt >= budget;

        // A streaming body cannot be replayed; single shot.
        let Some(this_try) = request.try_clone() else {
            return request.send().await.map_err(AssistantError::Http);
        };

        let wait = match this_try.send().await {
            Ok(resp) if exhausted || !retryable_status(resp.status()) => return Ok(resp),
            Ok(resp) => {
                let wait =
                    policy.backoff(attempt, resp.headers().get(reqwest::header::RETRY_AFTER));
                log::warn!(
                    "google api returned {}; try {}/{}, waiting {:?}",
                    resp.status(),
                    attempt,
                    budget,
                    wait
                );
                wait
            }
            Err(err) if exhausted || !(err.is_timeout() || err.is_connect()) => {
                return Err(AssistantError::Http(err));
            }
            Err(err) => {
                let wait = policy.backoff(attempt, None);
                log::warn!(
                    "google api transport error: {}; try {}/{}, waiting {:?}",
                    err,
                    attempt,
                    budget,
                    wait
                );
                wait
            }
        };
        tokio::time::sleep(wait).await;
    }
}

/// Map a non-success response to an error, draining the body for context.
pub async fn error_for_response(resp: reqwest::Response) -> AssistantError {
    let status = resp.status();
    if status == reqwest::StatusCode::UNAUTHORIZED {
        return AssistantError::AuthExpired;
    }
    let body = resp.text().await.unwrap_or_default();
    AssistantError::Api {
        status: status.as_u16(),
        message: body,
    }
}
