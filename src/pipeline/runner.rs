//! One reminder run: list → fetch → triage → format → deliver.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::stream::FuturesUnordered;
use tokio::time::Instant;
use tracing::{Instrument, info, info_span, warn};
use uuid::Uuid;

use crate::channels::{MailboxReader, Notifier};
use crate::config::{ReminderPolicy, RunSettings};
use crate::error::{Error, FetchError, Result};
use crate::pipeline::delivery::{self, DeliveryReport};
use crate::pipeline::types::{Conversation, NotificationMessage};
use crate::pipeline::{escalation, join_until, triage};

/// A conversation that could not be fetched and was left out of triage.
#[derive(Debug)]
pub struct FetchFailure {
    pub conversation_id: String,
    pub reason: FetchError,
}

/// What a run did.
#[derive(Debug)]
pub struct RunSummary {
    pub owner: String,
    /// Threads returned by the listing.
    pub listed: usize,
    /// Threads fetched successfully.
    pub fetched: usize,
    pub fetch_failures: Vec<FetchFailure>,
    /// Threads found due for a reminder.
    pub triaged: usize,
    pub delivery: DeliveryReport,
    /// The run deadline passed before every step resolved.
    pub timed_out: bool,
    pub deadline: Duration,
}

impl RunSummary {
    fn new(owner: &str, deadline: Duration) -> Self {
        Self {
            owner: owner.to_string(),
            listed: 0,
            fetched: 0,
            fetch_failures: Vec::new(),
            triaged: 0,
            delivery: DeliveryReport::default(),
            timed_out: false,
            deadline,
        }
    }

    /// One-line, user-facing result.
    pub fn headline(&self) -> String {
        format!(
            "Sent {} reminder(s) for {}",
            self.delivery.delivered_count(),
            self.owner
        )
    }

    /// Turn a timed-out run into `Error::Timeout`.
    pub fn ensure_complete(self) -> Result<Self> {
        if !self.timed_out {
            return Ok(self);
        }
        let fetches_resolved = self.fetched + self.fetch_failures.len();
        let deliveries_resolved = self.delivery.delivered.len() + self.delivery.failures.len();
        Err(Error::Timeout {
            deadline: self.deadline,
            completed: fetches_resolved + deliveries_resolved,
            pending: self.listed.saturating_sub(fetches_resolved) + self.delivery.unresolved.len(),
        })
    }
}

/// Runs the pipeline for one owner against one reader and one notifier.
pub struct ReminderRun {
    reader: Arc<dyn MailboxReader>,
    notifier: Arc<dyn Notifier>,
    policy: Arc<ReminderPolicy>,
    settings: RunSettings,
}

impl ReminderRun {
    pub fn new(
        reader: Arc<dyn MailboxReader>,
        notifier: Arc<dyn Notifier>,
        policy: Arc<ReminderPolicy>,
        settings: RunSettings,
    ) -> Self {
        Self {
            reader,
            notifier,
            policy,
            settings,
        }
    }

    /// Execute one run as of `now`.
    ///
    /// Only a failed listing is an error; per-conversation fetch failures
    /// and delivery failures are recorded in the summary. A run that hits
    /// its deadline returns a summary with `timed_out` set.
    pub async fn execute(&self, now: DateTime<Utc>) -> Result<RunSummary> {
        let span = info_span!(
            "reminder_run",
            owner = %self.policy.owner_identity(),
            run_id = %Uuid::new_v4()
        );
        self.execute_inner(now).instrument(span).await
    }

    async fn execute_inner(&self, now: DateTime<Utc>) -> Result<RunSummary> {
        let deadline = Instant::now() + self.settings.run_timeout;
        let mut summary = RunSummary::new(self.policy.owner_identity(), self.settings.run_timeout);

        // ── List ────────────────────────────────────────────────────
        let listing = tokio::time::timeout_at(
            deadline,
            self.reader.list_conversations(self.settings.max_results),
        )
        .await;
        let refs = match listing {
            Ok(Ok(refs)) => refs,
            Ok(Err(e)) => {
                warn!(reader = self.reader.name(), error = %e, "Failed to list conversations");
                return Err(e.into());
            }
            Err(_) => {
                warn!(reader = self.reader.name(), "Deadline passed while listing conversations");
                summary.timed_out = true;
                return Ok(summary);
            }
        };
        summary.listed = refs.len();
        info!(count = refs.len(), "Listed conversations");

        // ── Fetch (fan-out, join) ───────────────────────────────────
        let reader = self.reader.as_ref();
        let fetches: FuturesUnordered<_> = refs
            .iter()
            .map(|r| async move { (r.id.as_str(), reader.get_conversation(&r.id).await) })
            .collect();
        let (fetched, timed_out) = join_until(fetches, Some(deadline)).await;

        let mut conversations: Vec<Conversation> = Vec::with_capacity(fetched.len());
        for (id, result) in fetched {
            match result {
                Ok(conversation) => conversations.push(conversation),
                Err(e) => {
                    warn!(conversation_id = id, error = %e, "Dropping conversation that failed to fetch");
                    summary.fetch_failures.push(FetchFailure {
                        conversation_id: id.to_string(),
                        reason: e,
                    });
                }
            }
        }
        summary.fetched = conversations.len();
        summary
            .fetch_failures
            .sort_by(|a, b| a.conversation_id.cmp(&b.conversation_id));

        if timed_out {
            warn!(
                fetched = summary.fetched,
                listed = summary.listed,
                "Deadline passed while fetching conversations"
            );
            summary.timed_out = true;
            return Ok(summary);
        }

        // ── Triage + format ─────────────────────────────────────────
        let due = triage::filter(&conversations, &self.policy, now);
        summary.triaged = due.len();

        let by_id: HashMap<&str, &Conversation> =
            conversations.iter().map(|c| (c.id(), c)).collect();
        let messages: Vec<NotificationMessage> = due
            .iter()
            .filter_map(|result| {
                by_id
                    .get(result.conversation_id.as_str())
                    .map(|conversation| escalation::format(result, conversation, &self.policy))
            })
            .collect();

        // ── Deliver (fan-out, join) ─────────────────────────────────
        summary.delivery = delivery::deliver(
            &messages,
            self.policy.notify_target(),
            self.notifier.as_ref(),
            Some(deadline),
        )
        .await;
        summary.timed_out = !summary.delivery.unresolved.is_empty();

        info!(
            listed = summary.listed,
            due = summary.triaged,
            sent = summary.delivery.delivered_count(),
            failed = summary.delivery.failures.len(),
            "Reminder run finished"
        );

        Ok(summary)
    }
}
