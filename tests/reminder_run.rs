//! End-to-end tests for a reminder run.
//!
//! Each test starts Axum servers on random ports that impersonate the
//! Gmail REST API and a Slack incoming webhook, then runs the real
//! `GmailReader` + `SlackWebhookNotifier` through the pipeline.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use secrecy::SecretString;
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio::time::timeout;

use inbox_reminder::channels::{GmailReader, SlackWebhookNotifier};
use inbox_reminder::config::{NotifyTarget, ReminderPolicy, RunSettings};
use inbox_reminder::error::{Error, FetchError, NotifyError};
use inbox_reminder::pipeline::ReminderRun;

/// Maximum time any test is allowed to run before we consider it hung.
const TEST_TIMEOUT: Duration = Duration::from_secs(10);

const TOKEN: &str = "test-access-token";
const OWNER: &str = "owner@example.com";

// ── Fake Gmail ──────────────────────────────────────────────────────

struct FakeGmail {
    threads: HashMap<String, Value>,
    order: Vec<String>,
    list_queries: Mutex<Vec<HashMap<String, String>>>,
}

fn authorized(headers: &HeaderMap) -> bool {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == format!("Bearer {TOKEN}"))
}

async fn list_threads(
    State(gmail): State<Arc<FakeGmail>>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    if !authorized(&headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    gmail.list_queries.lock().unwrap().push(query);
    let threads: Vec<Value> = gmail
        .order
        .iter()
        .map(|id| json!({ "id": id, "snippet": "", "historyId": "1" }))
        .collect();
    let estimate = threads.len();
    Json(json!({ "threads": threads, "resultSizeEstimate": estimate })).into_response()
}

async fn get_thread(
    State(gmail): State<Arc<FakeGmail>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Response {
    if !authorized(&headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    match gmail.threads.get(&id) {
        Some(thread) => Json(thread.clone()).into_response(),
        None => (StatusCode::INTERNAL_SERVER_ERROR, "backend error").into_response(),
    }
}

fn gmail_message(thread_id: &str, sent_at: DateTime<Utc>, labels: &[&str], subject: &str) -> Value {
    json!({
        "id": format!("{thread_id}-{}", sent_at.timestamp_millis()),
        "threadId": thread_id,
        "labelIds": labels,
        "snippet": format!("Snippet of {subject}"),
        "internalDate": sent_at.timestamp_millis().to_string(),
        "payload": {
            "headers": [
                { "name": "Subject", "value": subject },
                { "name": "From", "value": "Customer <customer@example.org>" }
            ]
        }
    })
}

// ── Fake Slack ──────────────────────────────────────────────────────

#[derive(Default)]
struct FakeSlack {
    received: Mutex<Vec<Value>>,
    reject_callback_ids: Vec<String>,
}

async fn slack_hook(State(slack): State<Arc<FakeSlack>>, Json(body): Json<Value>) -> Response {
    let callback_id = body["attachments"][0]["callback_id"]
        .as_str()
        .unwrap_or_default()
        .to_string();
    slack.received.lock().unwrap().push(body);
    if slack.reject_callback_ids.contains(&callback_id) {
        return (StatusCode::INTERNAL_SERVER_ERROR, "invalid_payload").into_response();
    }
    "ok".into_response()
}

// ── Harness ─────────────────────────────────────────────────────────

async fn serve(app: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

async fn start_gmail(threads: Vec<(String, Value)>) -> (String, Arc<FakeGmail>) {
    let gmail = Arc::new(FakeGmail {
        order: threads.iter().map(|(id, _)| id.clone()).collect(),
        threads: threads.into_iter().filter(|(_, t)| !t.is_null()).collect(),
        list_queries: Mutex::new(Vec::new()),
    });
    let app = Router::new()
        .route("/gmail/v1/users/me/threads", get(list_threads))
        .route("/gmail/v1/users/me/threads/{id}", get(get_thread))
        .with_state(Arc::clone(&gmail));
    (serve(app).await, gmail)
}

async fn start_slack(reject: &[&str]) -> (String, Arc<FakeSlack>) {
    let slack = Arc::new(FakeSlack {
        received: Mutex::new(Vec::new()),
        reject_callback_ids: reject.iter().map(|s| s.to_string()).collect(),
    });
    let app = Router::new()
        .route("/services/hook", post(slack_hook))
        .with_state(Arc::clone(&slack));
    (format!("{}/services/hook", serve(app).await), slack)
}

fn reminder_run(gmail_base: &str, webhook: &str, token: &str) -> ReminderRun {
    let reader = GmailReader::new(
        SecretString::from(token.to_string()),
        gmail_base,
        Duration::from_secs(2),
    )
    .unwrap();
    let notifier = SlackWebhookNotifier::new(Duration::from_secs(2)).unwrap();
    let policy = ReminderPolicy::new(OWNER, vec![3, 7], NotifyTarget::new(webhook)).unwrap();
    ReminderRun::new(
        Arc::new(reader),
        Arc::new(notifier),
        Arc::new(policy),
        RunSettings {
            max_results: 100,
            run_timeout: Duration::from_secs(5),
        },
    )
}

// ── Tests ───────────────────────────────────────────────────────────

#[tokio::test]
async fn unanswered_thread_gets_first_reminder() {
    timeout(TEST_TIMEOUT, async {
        let now = Utc::now();
        let open_at = now - chrono::Duration::days(3) - chrono::Duration::hours(2);
        let answered_in = now - chrono::Duration::days(4);
        let answered_out = now - chrono::Duration::hours(1);

        let (gmail_base, gmail) = start_gmail(vec![
            (
                "t-open".into(),
                json!({ "id": "t-open", "messages": [gmail_message("t-open", open_at, &["INBOX", "UNREAD"], "Offer")] }),
            ),
            (
                "t-answered".into(),
                json!({ "id": "t-answered", "messages": [
                    gmail_message("t-answered", answered_in, &["INBOX"], "Question"),
                    gmail_message("t-answered", answered_out, &["SENT"], "Re: Question")
                ] }),
            ),
        ])
        .await;
        let (webhook, slack) = start_slack(&[]).await;

        let summary = reminder_run(&gmail_base, &webhook, TOKEN)
            .execute(now)
            .await
            .unwrap();

        assert_eq!(summary.headline(), "Sent 1 reminder(s) for owner@example.com");
        assert!(summary.fetch_failures.is_empty());
        assert!(!summary.timed_out);

        let queries = gmail.list_queries.lock().unwrap();
        assert_eq!(queries[0].get("maxResults").map(String::as_str), Some("100"));
        assert_eq!(queries[0].get("labelIds").map(String::as_str), Some("INBOX"));

        let received = slack.received.lock().unwrap();
        assert_eq!(received.len(), 1);
        let payload = &received[0];
        assert!(payload["text"].as_str().unwrap().contains("seit 3 Tagen unbeantwortet"));
        let attachment = &payload["attachments"][0];
        assert_eq!(attachment["color"], "warning");
        assert_eq!(attachment["title"], "Offer");
        assert_eq!(attachment["author_name"], "Customer <customer@example.org>");
        assert_eq!(attachment["callback_id"], "t-open");
        assert_eq!(attachment["ts"], open_at.timestamp());
        assert_eq!(
            attachment["actions"][0]["url"],
            "https://mail.google.com/mail/u/owner@example.com/#inbox/t-open"
        );
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn partial_failures_are_reported_not_fatal() {
    timeout(TEST_TIMEOUT, async {
        let now = Utc::now();
        let overdue_at = now - chrono::Duration::days(7) - chrono::Duration::hours(5);
        let flaky_at = now - chrono::Duration::days(3) - chrono::Duration::minutes(30);

        let (gmail_base, _gmail) = start_gmail(vec![
            (
                "t-overdue".into(),
                json!({ "id": "t-overdue", "messages": [gmail_message("t-overdue", overdue_at, &["INBOX"], "Invoice")] }),
            ),
            (
                "t-flaky".into(),
                json!({ "id": "t-flaky", "messages": [gmail_message("t-flaky", flaky_at, &["INBOX"], "Meeting")] }),
            ),
            // Listed but not retrievable.
            ("t-broken".into(), Value::Null),
        ])
        .await;
        let (webhook, slack) = start_slack(&["t-flaky"]).await;

        let summary = reminder_run(&gmail_base, &webhook, TOKEN)
            .execute(now)
            .await
            .unwrap();

        assert_eq!(summary.listed, 3);
        assert_eq!(summary.fetch_failures.len(), 1);
        assert_eq!(summary.fetch_failures[0].conversation_id, "t-broken");
        assert!(matches!(
            summary.fetch_failures[0].reason,
            FetchError::Status { status: 500, .. }
        ));

        assert_eq!(summary.delivery.delivered, vec!["t-overdue"]);
        assert_eq!(summary.delivery.failures.len(), 1);
        assert_eq!(summary.delivery.failures[0].conversation_id, "t-flaky");
        assert!(matches!(
            summary.delivery.failures[0].reason,
            NotifyError::Status { status: 500, .. }
        ));

        let received = slack.received.lock().unwrap();
        assert_eq!(received.len(), 2);
        let overdue = received
            .iter()
            .find(|p| p["attachments"][0]["callback_id"] == "t-overdue")
            .unwrap();
        assert_eq!(overdue["attachments"][0]["color"], "danger");
        assert!(overdue["text"].as_str().unwrap().contains("seit 7 Tagen"));

        assert!(summary.ensure_complete().is_ok());
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn rejected_token_fails_the_run() {
    timeout(TEST_TIMEOUT, async {
        let (gmail_base, _gmail) = start_gmail(vec![]).await;
        let (webhook, slack) = start_slack(&[]).await;

        let err = reminder_run(&gmail_base, &webhook, "expired-token")
            .execute(Utc::now())
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Fetch(FetchError::Unauthorized)));
        assert!(slack.received.lock().unwrap().is_empty());
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn empty_inbox_sends_nothing() {
    timeout(TEST_TIMEOUT, async {
        let (gmail_base, _gmail) = start_gmail(vec![]).await;
        let (webhook, slack) = start_slack(&[]).await;

        let summary = reminder_run(&gmail_base, &webhook, TOKEN)
            .execute(Utc::now())
            .await
            .unwrap();

        assert_eq!(summary.listed, 0);
        assert_eq!(summary.headline(), "Sent 0 reminder(s) for owner@example.com");
        assert!(slack.received.lock().unwrap().is_empty());
    })
    .await
    .expect("test timed out");
}
