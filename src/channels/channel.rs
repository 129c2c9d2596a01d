//! Collaborator traits.
//!
//! Both traits are pure I/O seams: no triage or formatting logic lives
//! behind them, which keeps the pipeline testable with in-memory stubs.

use async_trait::async_trait;

use crate::config::NotifyTarget;
use crate::error::{FetchError, NotifyError};
use crate::pipeline::types::{Conversation, ConversationRef, NotificationMessage};

/// Read-only access to one owner's mailbox.
#[async_trait]
pub trait MailboxReader: Send + Sync {
    /// Reader name for logging (e.g. "gmail").
    fn name(&self) -> &str;

    /// List inbox threads, most recent activity first, at most `max_results`.
    async fn list_conversations(
        &self,
        max_results: u32,
    ) -> Result<Vec<ConversationRef>, FetchError>;

    /// Fetch one thread with all of its messages in chronological order.
    async fn get_conversation(&self, id: &str) -> Result<Conversation, FetchError>;
}

/// Outbound delivery of reminders.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Notifier name for logging (e.g. "slack").
    fn name(&self) -> &str;

    /// Deliver one reminder. `Ok` means the destination accepted it.
    async fn send(
        &self,
        target: &NotifyTarget,
        message: &NotificationMessage,
    ) -> Result<(), NotifyError>;
}
