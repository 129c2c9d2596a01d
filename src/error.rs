//! Error types for inbox-reminder.

use std::time::Duration;

/// Run-level failures. Configuration and per-item delivery errors are
/// reported through their own types.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Mailbox error: {0}")]
    Fetch(#[from] FetchError),

    #[error("Run exceeded deadline of {deadline:?}: {completed} step(s) completed, {pending} still pending")]
    Timeout {
        deadline: Duration,
        completed: usize,
        pending: usize,
    },
}

/// Configuration-related errors. All of them are fatal and raised before
/// any network activity.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required configuration: {key}. {hint}")]
    MissingRequired { key: String, hint: String },

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    #[error("Reminder thresholds must not be empty")]
    EmptyThresholds,

    #[error("Reminder thresholds must be ascending: {next} follows {previous}")]
    UnsortedThresholds { previous: u32, next: u32 },

    #[error("Reminder threshold {0} is listed more than once")]
    DuplicateThreshold(u32),

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Mailbox reader errors.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Mailbox returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Mailbox rejected the access token")]
    Unauthorized,

    #[error("Malformed conversation {id}: {reason}")]
    Malformed { id: String, reason: String },

    #[error("Conversation {id} has no messages")]
    EmptyConversation { id: String },
}

/// Notifier delivery errors.
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("Transport failure: {0}")]
    Transport(String),

    #[error("Notifier returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Malformed payload: {0}")]
    Payload(String),

    #[error("Notifier request timed out")]
    TimedOut,
}

/// Result type alias for inbox-reminder.
pub type Result<T> = std::result::Result<T, Error>;
