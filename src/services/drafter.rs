//! Email body drafting.
//!
//! `ContentDrafter` is a seam for richer generators; the shipped
//! implementation wraps the topic in a plain letter skeleton the user
//! edits before confirming the send.

use async_trait::async_trait;

use crate::error::Result;
use crate::services::ContentDrafter;

/// Skeleton used when no generator is wired in, and as the fallback when
/// one fails.
pub fn fallback_body(topic: &str) -> String {
    format!(
        "Dear [Recipient],\n\n{}\n\nBest regards,\n[Your Name]",
        topic
    )
}

pub struct TemplateDrafter;

#[async_trait]
impl ContentDrafter for TemplateDrafter {
    async fn draft(&self, topic: &str) -> Result<String> {
        Ok(fallback_body(topic))
    }
}
