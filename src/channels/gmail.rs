//! Gmail mailbox reader: REST API with a delegated bearer token.
//!
//! Token acquisition and refresh happen elsewhere; this reader only uses
//! the access token it is given. Listing reads a single page.

use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::channels::MailboxReader;
use crate::error::FetchError;
use crate::pipeline::types::{Conversation, ConversationRef, Header, Message};

/// Label Gmail puts on messages the owner sent.
const SENT_LABEL: &str = "SENT";
const INBOX_LABEL: &str = "INBOX";

// ── Wire types ──────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct ThreadList {
    #[serde(default)]
    threads: Vec<ThreadRef>,
}

#[derive(Debug, Deserialize)]
struct ThreadRef {
    id: String,
}

#[derive(Debug, Deserialize)]
struct GmailThread {
    id: String,
    #[serde(default)]
    messages: Vec<GmailMessage>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GmailMessage {
    #[serde(default)]
    label_ids: Vec<String>,
    #[serde(default)]
    snippet: String,
    internal_date: Option<String>,
    #[serde(default)]
    payload: Option<GmailPayload>,
}

#[derive(Debug, Deserialize)]
struct GmailPayload {
    #[serde(default)]
    headers: Vec<Header>,
}

// ── Reader ──────────────────────────────────────────────────────────

/// Reads the owner's inbox through the Gmail REST API.
pub struct GmailReader {
    client: reqwest::Client,
    api_base: String,
    access_token: SecretString,
}

impl GmailReader {
    pub fn new(
        access_token: SecretString,
        api_base: impl Into<String>,
        request_timeout: Duration,
    ) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| FetchError::Http(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            access_token,
        })
    }

    fn api_url(&self, path: &str) -> String {
        format!("{}/gmail/v1/users/me/{path}", self.api_base)
    }

    /// `threads/{id}`, with the id escaped as a single path segment.
    fn thread_url(&self, id: &str) -> Result<reqwest::Url, FetchError> {
        let mut url = reqwest::Url::parse(&self.api_url("threads"))
            .map_err(|e| FetchError::Http(format!("Invalid API base: {e}")))?;
        url.path_segments_mut()
            .map_err(|_| FetchError::Http("API base cannot hold a path".into()))?
            .push(id);
        Ok(url)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<T, FetchError> {
        let resp = self
            .client
            .get(url)
            .bearer_auth(self.access_token.expose_secret())
            .query(query)
            .send()
            .await
            .map_err(|e| FetchError::Http(e.to_string()))?;

        let status = resp.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN
        {
            return Err(FetchError::Unauthorized);
        }
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(FetchError::Status {
                status: status.as_u16(),
                body,
            });
        }

        resp.json::<T>()
            .await
            .map_err(|e| FetchError::Http(format!("Invalid response body: {e}")))
    }
}

#[async_trait]
impl MailboxReader for GmailReader {
    fn name(&self) -> &str {
        "gmail"
    }

    async fn list_conversations(
        &self,
        max_results: u32,
    ) -> Result<Vec<ConversationRef>, FetchError> {
        let list: ThreadList = self
            .get_json(
                &self.api_url("threads"),
                &[
                    ("maxResults", max_results.to_string()),
                    ("labelIds", INBOX_LABEL.to_string()),
                ],
            )
            .await?;

        debug!(count = list.threads.len(), "Listed inbox threads");

        Ok(list
            .threads
            .into_iter()
            .take(max_results as usize)
            .map(|t| ConversationRef { id: t.id })
            .collect())
    }

    async fn get_conversation(&self, id: &str) -> Result<Conversation, FetchError> {
        let thread: GmailThread = self
            .get_json(self.thread_url(id)?.as_str(), &[])
            .await?;
        thread_to_conversation(thread)
    }
}

/// Convert a Gmail thread into a `Conversation`, ordering messages by
/// their internal date.
fn thread_to_conversation(thread: GmailThread) -> Result<Conversation, FetchError> {
    let mut messages = thread
        .messages
        .into_iter()
        .map(|m| gmail_to_message(&thread.id, m))
        .collect::<Result<Vec<_>, _>>()?;
    messages.sort_by_key(|m| m.sent_at);
    Conversation::new(thread.id, messages)
}

fn gmail_to_message(thread_id: &str, msg: GmailMessage) -> Result<Message, FetchError> {
    let malformed = |reason: String| FetchError::Malformed {
        id: thread_id.to_string(),
        reason,
    };

    let raw = msg
        .internal_date
        .ok_or_else(|| malformed("message without internalDate".into()))?;
    let millis: i64 = raw
        .parse()
        .map_err(|_| malformed(format!("unparsable internalDate {raw:?}")))?;
    let sent_at = chrono::DateTime::from_timestamp_millis(millis)
        .ok_or_else(|| malformed(format!("internalDate out of range: {millis}")))?;

    Ok(Message {
        sent_at,
        is_outbound: msg.label_ids.iter().any(|l| l == SENT_LABEL),
        snippet: msg.snippet,
        headers: msg.payload.map(|p| p.headers).unwrap_or_default(),
    })
}
