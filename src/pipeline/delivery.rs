//! Delivery coordinator: fans reminders out to the notifier.
//!
//! Every send runs concurrently and independently. A failure is recorded
//! against its conversation and never cancels the other sends. Nothing is
//! retried within a run.

use futures::stream::FuturesUnordered;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::channels::Notifier;
use crate::config::NotifyTarget;
use crate::error::NotifyError;
use crate::pipeline::join_until;
use crate::pipeline::types::NotificationMessage;

/// Result of one send attempt.
#[derive(Debug)]
pub enum DeliveryOutcome {
    Delivered,
    Failed(NotifyError),
}

#[derive(Debug)]
pub struct DeliveryFailure {
    pub conversation_id: String,
    pub reason: NotifyError,
}

/// Per-batch delivery summary.
#[derive(Debug, Default)]
pub struct DeliveryReport {
    /// Conversation ids whose reminder was accepted.
    pub delivered: Vec<String>,
    pub failures: Vec<DeliveryFailure>,
    /// Sends still in flight when the deadline passed.
    pub unresolved: Vec<String>,
}

impl DeliveryReport {
    pub fn delivered_count(&self) -> usize {
        self.delivered.len()
    }

    pub fn attempted(&self) -> usize {
        self.delivered.len() + self.failures.len() + self.unresolved.len()
    }
}

/// Send every message to `target`, waiting for all sends to resolve or
/// for `deadline` to pass, whichever comes first.
pub async fn deliver(
    messages: &[NotificationMessage],
    target: &NotifyTarget,
    notifier: &dyn Notifier,
    deadline: Option<Instant>,
) -> DeliveryReport {
    let sends: FuturesUnordered<_> = messages
        .iter()
        .map(|message| async move {
            let outcome = match notifier.send(target, message).await {
                Ok(()) => DeliveryOutcome::Delivered,
                Err(e) => DeliveryOutcome::Failed(e),
            };
            (message.conversation_id.as_str(), outcome)
        })
        .collect();

    let (resolved, timed_out) = join_until(sends, deadline).await;

    let mut report = DeliveryReport::default();
    for (conversation_id, outcome) in resolved {
        match outcome {
            DeliveryOutcome::Delivered => {
                debug!(conversation_id, notifier = notifier.name(), "Reminder delivered");
                report.delivered.push(conversation_id.to_string());
            }
            DeliveryOutcome::Failed(reason) => {
                warn!(
                    conversation_id,
                    notifier = notifier.name(),
                    error = %reason,
                    "Reminder delivery failed"
                );
                report.failures.push(DeliveryFailure {
                    conversation_id: conversation_id.to_string(),
                    reason,
                });
            }
        }
    }

    if timed_out {
        report.unresolved = messages
            .iter()
            .map(|m| m.conversation_id.clone())
            .filter(|id| {
                !report.delivered.contains(id)
                    && !report.failures.iter().any(|f| &f.conversation_id == id)
            })
            .collect();
        warn!(
            unresolved = report.unresolved.len(),
            "Deadline passed with reminder deliveries still in flight"
        );
    }

    report.delivered.sort();
    report.failures.sort_by(|a, b| a.conversation_id.cmp(&b.conversation_id));
    report.unresolved.sort();
    report
}
