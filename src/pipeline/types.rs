//! Shared types for the reminder pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::FetchError;

// ── Mailbox snapshot ────────────────────────────────────────────────

/// Lightweight thread reference returned by a mailbox listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationRef {
    pub id: String,
}

/// A single message header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Header {
    pub name: String,
    pub value: String,
}

/// One email within a conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub sent_at: DateTime<Utc>,
    /// Carries the mailbox's "sent by owner" marker.
    pub is_outbound: bool,
    pub snippet: String,
    pub headers: Vec<Header>,
}

impl Message {
    /// Case-insensitive header lookup. The first matching header wins.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|h| h.name.eq_ignore_ascii_case(name))
            .map(|h| h.value.as_str())
    }
}

/// One mailbox thread. Always holds at least one message, in
/// chronological order.
#[derive(Debug, Clone, Serialize)]
pub struct Conversation {
    id: String,
    messages: Vec<Message>,
}

impl Conversation {
    pub fn new(id: impl Into<String>, messages: Vec<Message>) -> Result<Self, FetchError> {
        let id = id.into();
        if messages.is_empty() {
            return Err(FetchError::EmptyConversation { id });
        }
        Ok(Self { id, messages })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn last_message(&self) -> &Message {
        // Non-empty by construction.
        &self.messages[self.messages.len() - 1]
    }
}

// ── Triage output ───────────────────────────────────────────────────

/// A conversation judged due for a reminder in this run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriageResult {
    pub conversation_id: String,
    /// Whole days since the last message.
    pub age_days: u32,
    pub matched_threshold_days: u32,
    pub is_first_threshold: bool,
}

// ── Notification payload ────────────────────────────────────────────

/// Escalation level of a reminder.
///
/// Serialized as the attachment color understood by chat webhooks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Severity {
    /// First threshold crossed.
    #[serde(rename = "warning")]
    First,
    /// Any later threshold crossed.
    #[serde(rename = "danger")]
    Overdue,
}

/// Structured reminder ready for a notifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationMessage {
    /// Originating conversation; used for reporting, never sent.
    #[serde(skip)]
    pub conversation_id: String,
    pub text: String,
    pub attachments: Vec<NotificationAttachment>,
}

impl NotificationMessage {
    /// Severity of the primary attachment.
    pub fn severity(&self) -> Option<Severity> {
        self.attachments.first().map(|a| a.color)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationAttachment {
    pub author_name: String,
    pub callback_id: String,
    pub fallback: String,
    pub title: String,
    pub text: String,
    pub color: Severity,
    /// Epoch seconds of the last message.
    pub ts: i64,
    pub actions: Vec<NotificationAction>,
}

/// Call-to-action button.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationAction {
    #[serde(rename = "type")]
    pub kind: String,
    pub text: String,
    pub url: String,
}
