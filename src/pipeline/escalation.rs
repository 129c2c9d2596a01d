//! Escalation formatter: turns a triage result into a chat payload.
//!
//! Reminders are written in German, like the inbox they are about.

use crate::config::ReminderPolicy;
use crate::pipeline::types::{
    Conversation, NotificationAction, NotificationAttachment, NotificationMessage, Severity,
    TriageResult,
};

const MAILBOX_WEB_BASE: &str = "https://mail.google.com/mail/u";
const OPEN_BUTTON_LABEL: &str = "Öffnen";

/// Build the reminder for one due conversation.
///
/// Missing `Subject`/`From` headers produce empty fields.
pub fn format(
    result: &TriageResult,
    conversation: &Conversation,
    policy: &ReminderPolicy,
) -> NotificationMessage {
    let last = conversation.last_message();
    let owner = policy.owner_identity();
    let url = conversation_link(owner, conversation.id());

    let severity = if result.is_first_threshold {
        Severity::First
    } else {
        Severity::Overdue
    };

    let text = format!(
        "Folgende E-Mail ist seit {} unbeantwortet im Posteingang von {owner}. \
         Kann bitte jemand die Mail beantworten oder sie archivieren, \
         wenn keine Antwort notwendig ist.",
        age_label(result.age_days),
    );

    NotificationMessage {
        conversation_id: conversation.id().to_string(),
        text,
        attachments: vec![NotificationAttachment {
            author_name: last.header("from").unwrap_or_default().to_string(),
            callback_id: conversation.id().to_string(),
            fallback: url.clone(),
            title: last.header("subject").unwrap_or_default().to_string(),
            text: last.snippet.clone(),
            color: severity,
            ts: last.sent_at.timestamp(),
            actions: vec![NotificationAction {
                kind: "button".into(),
                text: OPEN_BUTTON_LABEL.into(),
                url,
            }],
        }],
    }
}

/// "1 Tag", "3 Tagen".
pub fn age_label(age_days: u32) -> String {
    if age_days == 1 {
        format!("{age_days} Tag")
    } else {
        format!("{age_days} Tagen")
    }
}

/// Deep link to the conversation in the owner's web inbox.
pub fn conversation_link(owner: &str, conversation_id: &str) -> String {
    format!("{MAILBOX_WEB_BASE}/{owner}/#inbox/{conversation_id}")
}

#[cfg(test)]
mod tests {
    use chrono::DateTime;

    use super::*;
    use crate::config::NotifyTarget;
    use crate::pipeline::types::{Header, Message};

    fn policy() -> ReminderPolicy {
        ReminderPolicy::new(
            "owner@example.com",
            vec![3, 7],
            NotifyTarget::new("https://hooks.example.com/x"),
        )
        .unwrap()
    }

    fn conversation(headers: Vec<Header>) -> Conversation {
        Conversation::new(
            "18c2f0a",
            vec![Message {
                sent_at: DateTime::from_timestamp_millis(1_700_000_123_456).unwrap(),
                is_outbound: false,
                snippet: "Could you send the signed contract?".into(),
                headers,
            }],
        )
        .unwrap()
    }

    fn headers() -> Vec<Header> {
        vec![
            Header {
                name: "SUBJECT".into(),
                value: "Contract".into(),
            },
            Header {
                name: "from".into(),
                value: "Alice <alice@example.com>".into(),
            },
        ]
    }

    fn result(age_days: u32, threshold: u32, first: bool) -> TriageResult {
        TriageResult {
            conversation_id: "18c2f0a".into(),
            age_days,
            matched_threshold_days: threshold,
            is_first_threshold: first,
        }
    }

    #[test]
    fn first_threshold_is_warning() {
        let msg = format(&result(3, 3, true), &conversation(headers()), &policy());
        assert_eq!(msg.severity(), Some(Severity::First));
        assert!(msg.text.contains("seit 3 Tagen unbeantwortet"));
        assert!(msg.text.contains("owner@example.com"));
    }

    #[test]
    fn later_threshold_is_overdue() {
        let msg = format(&result(7, 7, false), &conversation(headers()), &policy());
        assert_eq!(msg.severity(), Some(Severity::Overdue));
    }

    #[test]
    fn singular_day() {
        assert_eq!(age_label(1), "1 Tag");
        assert_eq!(age_label(0), "0 Tagen");
        assert_eq!(age_label(2), "2 Tagen");
    }

    #[test]
    fn attachment_carries_headers_and_link() {
        let msg = format(&result(3, 3, true), &conversation(headers()), &policy());
        let att = &msg.attachments[0];
        let link = "https://mail.google.com/mail/u/owner@example.com/#inbox/18c2f0a";

        assert_eq!(att.title, "Contract");
        assert_eq!(att.author_name, "Alice <alice@example.com>");
        assert_eq!(att.text, "Could you send the signed contract?");
        assert_eq!(att.callback_id, "18c2f0a");
        assert_eq!(att.fallback, link);
        assert_eq!(att.ts, 1_700_000_123);
        assert_eq!(att.actions.len(), 1);
        assert_eq!(att.actions[0].url, link);
        assert_eq!(att.actions[0].text, "Öffnen");
        assert_eq!(msg.conversation_id, "18c2f0a");
    }

    #[test]
    fn missing_headers_become_empty() {
        let msg = format(&result(3, 3, true), &conversation(vec![]), &policy());
        assert_eq!(msg.attachments[0].title, "");
        assert_eq!(msg.attachments[0].author_name, "");
    }

    #[test]
    fn formatting_is_deterministic() {
        let conv = conversation(headers());
        let triaged = result(7, 7, false);
        let first = serde_json::to_vec(&format(&triaged, &conv, &policy())).unwrap();
        let second = serde_json::to_vec(&format(&triaged, &conv, &policy())).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn payload_shape() {
        let msg = format(&result(3, 3, true), &conversation(headers()), &policy());
        let json = serde_json::to_value(&msg).unwrap();
        assert!(json["text"].is_string());
        assert_eq!(json["attachments"][0]["color"], "warning");
        assert_eq!(json["attachments"][0]["actions"][0]["type"], "button");
        assert!(json.get("conversation_id").is_none());
    }
}
