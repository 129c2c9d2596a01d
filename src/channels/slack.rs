//! Slack incoming-webhook notifier.
//!
//! Posts the reminder payload as JSON to the webhook URL in the target.
//! There is no retry; a failed post is reported and left for the next run.

use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use crate::channels::Notifier;
use crate::config::NotifyTarget;
use crate::error::NotifyError;
use crate::pipeline::types::NotificationMessage;

pub struct SlackWebhookNotifier {
    client: reqwest::Client,
}

impl SlackWebhookNotifier {
    pub fn new(request_timeout: Duration) -> Result<Self, NotifyError> {
        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| NotifyError::Transport(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Notifier for SlackWebhookNotifier {
    fn name(&self) -> &str {
        "slack"
    }

    async fn send(
        &self,
        target: &NotifyTarget,
        message: &NotificationMessage,
    ) -> Result<(), NotifyError> {
        let body = serde_json::to_vec(message).map_err(|e| NotifyError::Payload(e.to_string()))?;

        let resp = self
            .client
            .post(target.url())
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    NotifyError::TimedOut
                } else {
                    NotifyError::Transport(e.without_url().to_string())
                }
            })?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(NotifyError::Status {
                status: status.as_u16(),
                body,
            });
        }

        debug!(conversation_id = %message.conversation_id, "Webhook accepted reminder");
        Ok(())
    }
}
