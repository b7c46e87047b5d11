//! Gmail collaborator.
//!
//! Sends plain-text mail through the Gmail v1 `messages/send` endpoint.
//! The message is assembled as RFC 2822 text and base64url-encoded into
//! the `raw` field; Gmail fills in From and Date itself.

use std::sync::Arc;

use async_trait::async_trait;
use base64::Engine;

use crate::error::Result;
use crate::services::google::{error_for_response, send_with_retry, GoogleAuth, RetryPolicy};
use crate::services::MailTransport;

const GMAIL_SEND: &str = "https://gmail.googleapis.com/gmail/v1/users/me/messages/send";

fn build_rfc2822(
    to: &[String],
    cc: &[String],
    bcc: &[String],
    subject: &str,
    body: &str,
) -> String {
    let mut message = String::new();
    message.push_str(&format!("To: {}\r\n", to.join(", ")));
    if !cc.is_empty() {
        message.push_str(&format!("Cc: {}\r\n", cc.join(", ")));
    }
    if !bcc.is_empty() {
        message.push_str(&format!("Bcc: {}\r\n", bcc.join(", ")));
    }
    message.push_str(&format!("Subject: {}\r\n", subject));
    message.push_str("MIME-Version: 1.0\r\n");
    message.push_str("Content-Type: text/plain; charset=\"UTF-8\"\r\n");
    message.push_str("\r\n");
    message.push_str(body);
    message
}

pub struct GmailTransport {
    auth: Arc<GoogleAuth>,
    client: reqwest::Client,
    retry: RetryPolicy,
}

impl GmailTransport {
    pub fn new(auth: Arc<GoogleAuth>) -> Self {
        Self {
            auth,
            client: reqwest::Client::new(),
            retry: RetryPolicy::default(),
        }
    }
}

#[async_trait]
impl MailTransport for GmailTransport {
    async fn send(
        &self,
        to: &[String],
        cc: &[String],
        bcc: &[String],
        subject: &str,
        body: &str,
    ) -> Result<()> {
        let rfc2822 = build_rfc2822(to, cc, bcc, subject, body);
        let raw = base64::engine::general_purpose::URL_SAFE.encode(rfc2822.as_bytes());

        let token = self.auth.access_token().await?;
        let resp = send_with_retry(
            self.client
                .post(GMAIL_SEND)
                .bearer_auth(&token)
                .json(&serde_json::json!({ "raw": raw })),
            &self.retry,
        )
        .await?;
        if !resp.status().is_success() {
            return Err(error_for_response(resp).await);
        }

        log::info!("mail sent to {}", to.join(", "));
        Ok(())
    }
}
