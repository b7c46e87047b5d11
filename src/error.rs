//! Error types for the assistant core.
//!
//! Everything that can go wrong in a collaborator call funnels into
//! `AssistantError`; handlers render it to a user-facing string at the
//! routing boundary, so nothing propagates past `Assistant::process`.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AssistantError {
    #[error("HTTP: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Token expired or revoked")]
    AuthExpired,

    #[error("Token not found at {0}")]
    TokenNotFound(PathBuf),

    #[error("Token refresh failed: {0}")]
    RefreshFailed(String),

    #[error("{kind} '{query}' not found")]
    NotFound { kind: &'static str, query: String },

    #[error("{0} not available: {1}")]
    Unavailable(&'static str, String),

    #[error("IO: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON: {0}")]
    Json(#[from] serde_json::Error),
}

impl AssistantError {
    /// Not-found errors render without the "Error:" prefix — they are a
    /// resolution outcome, not a collaborator failure.
    pub fn is_not_found(&self) -> bool {
        matches!(self, AssistantError::NotFound { .. })
    }
}

pub type Result<T> = std::result::Result<T, AssistantError>;
