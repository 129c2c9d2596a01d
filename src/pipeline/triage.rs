//! Triage filter: picks the conversations that are due for a reminder.
//!
//! A conversation is due when its last message is inbound (the owner has
//! not replied) and its age falls into one of the policy's threshold
//! windows. The filter is pure: `now` is always passed in.

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::config::ReminderPolicy;
use crate::pipeline::age;
use crate::pipeline::types::{Conversation, TriageResult};

/// Return the due conversations, sorted by conversation id.
pub fn filter(
    conversations: &[Conversation],
    policy: &ReminderPolicy,
    now: DateTime<Utc>,
) -> Vec<TriageResult> {
    let mut due: Vec<TriageResult> = conversations
        .iter()
        .filter_map(|conversation| triage_one(conversation, policy, now))
        .collect();
    due.sort_by(|a, b| a.conversation_id.cmp(&b.conversation_id));
    due
}

fn triage_one(
    conversation: &Conversation,
    policy: &ReminderPolicy,
    now: DateTime<Utc>,
) -> Option<TriageResult> {
    let last = conversation.last_message();

    if last.is_outbound {
        debug!(conversation_id = %conversation.id(), "Owner already replied, skipping");
        return None;
    }

    let Some(matched) = age::classify(last.sent_at, now, policy.thresholds_days()) else {
        debug!(conversation_id = %conversation.id(), "Outside every reminder window");
        return None;
    };

    debug!(
        conversation_id = %conversation.id(),
        age_days = matched.age_days,
        threshold = matched.matched_threshold_days,
        "Conversation due for reminder"
    );

    Some(TriageResult {
        conversation_id: conversation.id().to_string(),
        age_days: matched.age_days,
        matched_threshold_days: matched.matched_threshold_days,
        is_first_threshold: matched.matched_threshold_days == policy.first_threshold(),
    })
}
