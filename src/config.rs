//! Configuration types.
//!
//! A run is configured from an optional JSON file (same shape as the
//! mailbox owner's credentials file) overlaid with environment variables.
//! The result is validated once and then handed to the pipeline as an
//! immutable [`ReminderPolicy`] plus [`RunSettings`].

use std::path::Path;
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use crate::error::ConfigError;

/// Default page size for the conversation listing.
pub const DEFAULT_MAX_RESULTS: u32 = 100;

/// Gmail refuses pages larger than this.
pub const MAX_RESULTS_CAP: u32 = 500;

pub const DEFAULT_RUN_TIMEOUT_SECS: u64 = 60;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 15;
pub const DEFAULT_GMAIL_API_BASE: &str = "https://gmail.googleapis.com";

// ── Policy ──────────────────────────────────────────────────────────

/// Delivery destination for reminders (a webhook URL).
///
/// Webhook URLs embed their credential, so the value is kept secret and
/// redacted from `Debug` output.
#[derive(Debug, Clone)]
pub struct NotifyTarget(SecretString);

impl NotifyTarget {
    pub fn new(url: impl Into<String>) -> Self {
        Self(SecretString::from(url.into()))
    }

    pub fn url(&self) -> &str {
        self.0.expose_secret()
    }
}

/// Who to remind on behalf of, when, and where.
///
/// Construct with [`ReminderPolicy::new`], which rejects threshold lists
/// that are empty, unsorted or contain duplicates.
#[derive(Debug, Clone)]
pub struct ReminderPolicy {
    owner_identity: String,
    thresholds_days: Vec<u32>,
    notify_target: NotifyTarget,
}

impl ReminderPolicy {
    pub fn new(
        owner_identity: impl Into<String>,
        thresholds_days: Vec<u32>,
        notify_target: NotifyTarget,
    ) -> Result<Self, ConfigError> {
        validate_thresholds(&thresholds_days)?;
        Ok(Self {
            owner_identity: owner_identity.into(),
            thresholds_days,
            notify_target,
        })
    }

    pub fn owner_identity(&self) -> &str {
        &self.owner_identity
    }

    /// Thresholds in ascending order, never empty.
    pub fn thresholds_days(&self) -> &[u32] {
        &self.thresholds_days
    }

    pub fn first_threshold(&self) -> u32 {
        self.thresholds_days[0]
    }

    pub fn notify_target(&self) -> &NotifyTarget {
        &self.notify_target
    }
}

/// Check that thresholds are non-empty and strictly ascending.
pub fn validate_thresholds(thresholds: &[u32]) -> Result<(), ConfigError> {
    if thresholds.is_empty() {
        return Err(ConfigError::EmptyThresholds);
    }
    for pair in thresholds.windows(2) {
        let (previous, next) = (pair[0], pair[1]);
        if next == previous {
            return Err(ConfigError::DuplicateThreshold(next));
        }
        if next < previous {
            return Err(ConfigError::UnsortedThresholds { previous, next });
        }
    }
    Ok(())
}

// ── Run configuration ───────────────────────────────────────────────

/// Limits applied to a single run.
#[derive(Debug, Clone, Copy)]
pub struct RunSettings {
    /// Maximum number of conversations listed per run.
    pub max_results: u32,
    /// Overall deadline for the run, fetch through delivery.
    pub run_timeout: Duration,
}

impl Default for RunSettings {
    fn default() -> Self {
        Self {
            max_results: DEFAULT_MAX_RESULTS,
            run_timeout: Duration::from_secs(DEFAULT_RUN_TIMEOUT_SECS),
        }
    }
}

/// Fully resolved configuration for one run.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub policy: ReminderPolicy,
    pub settings: RunSettings,
    /// Delegated read token for the mailbox.
    pub access_token: SecretString,
    /// Per-request timeout for mailbox and notifier HTTP calls.
    pub request_timeout: Duration,
    pub gmail_api_base: String,
}

/// On-disk shape. Unknown keys (such as an OAuth client block) are ignored.
#[derive(Debug, Default, Deserialize)]
struct FileConfig {
    email: Option<String>,
    webhook: Option<String>,
    reminders: Option<Vec<u32>>,
    access_token: Option<String>,
    max_results: Option<u32>,
    run_timeout_secs: Option<u64>,
    request_timeout_secs: Option<u64>,
    gmail_api_base: Option<String>,
}

impl RunConfig {
    /// Load from an optional JSON file, then apply process environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        Self::load_with(path, |key| std::env::var(key).ok())
    }

    /// Load with an explicit environment lookup.
    pub fn load_with<F>(path: Option<&Path>, env: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let file = match path {
            Some(path) => {
                let content = std::fs::read_to_string(path)?;
                serde_json::from_str::<FileConfig>(&content).map_err(|e| {
                    ConfigError::ParseError(format!("{}: {e}", path.display()))
                })?
            }
            None => FileConfig::default(),
        };

        let owner = env("REMINDER_OWNER")
            .or(file.email)
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| missing("email", "Set \"email\" in the config file or REMINDER_OWNER"))?;

        let webhook = env("REMINDER_WEBHOOK")
            .or(file.webhook)
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| {
                missing("webhook", "Set \"webhook\" in the config file or REMINDER_WEBHOOK")
            })?;

        let thresholds = match env("REMINDER_THRESHOLDS") {
            Some(raw) => parse_thresholds(&raw)?,
            None => file.reminders.ok_or_else(|| {
                missing(
                    "reminders",
                    "Set \"reminders\" in the config file or REMINDER_THRESHOLDS (e.g. 3,7)",
                )
            })?,
        };

        let access_token = env("GMAIL_ACCESS_TOKEN")
            .or(file.access_token)
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| {
                missing(
                    "access_token",
                    "Set \"access_token\" in the config file or GMAIL_ACCESS_TOKEN",
                )
            })?;

        let max_results = match env("REMINDER_MAX_RESULTS") {
            Some(raw) => parse_number("REMINDER_MAX_RESULTS", &raw)?,
            None => file.max_results.unwrap_or(DEFAULT_MAX_RESULTS),
        };
        if max_results == 0 || max_results > MAX_RESULTS_CAP {
            return Err(ConfigError::InvalidValue {
                key: "max_results".into(),
                message: format!("must be between 1 and {MAX_RESULTS_CAP}, got {max_results}"),
            });
        }

        let run_timeout_secs = match env("REMINDER_RUN_TIMEOUT_SECS") {
            Some(raw) => parse_number("REMINDER_RUN_TIMEOUT_SECS", &raw)?,
            None => file.run_timeout_secs.unwrap_or(DEFAULT_RUN_TIMEOUT_SECS),
        };
        let request_timeout_secs = match env("REMINDER_REQUEST_TIMEOUT_SECS") {
            Some(raw) => parse_number("REMINDER_REQUEST_TIMEOUT_SECS", &raw)?,
            None => file
                .request_timeout_secs
                .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS),
        };
        for (key, value) in [
            ("run_timeout_secs", run_timeout_secs),
            ("request_timeout_secs", request_timeout_secs),
        ] {
            if value == 0 {
                return Err(ConfigError::InvalidValue {
                    key: key.into(),
                    message: "must be greater than zero".into(),
                });
            }
        }

        let gmail_api_base = env("GMAIL_API_BASE")
            .or(file.gmail_api_base)
            .unwrap_or_else(|| DEFAULT_GMAIL_API_BASE.to_string())
            .trim_end_matches('/')
            .to_string();

        let policy = ReminderPolicy::new(owner, thresholds, NotifyTarget::new(webhook))?;

        Ok(Self {
            policy,
            settings: RunSettings {
                max_results,
                run_timeout: Duration::from_secs(run_timeout_secs),
            },
            access_token: SecretString::from(access_token),
            request_timeout: Duration::from_secs(request_timeout_secs),
            gmail_api_base,
        })
    }
}

fn missing(key: &str, hint: &str) -> ConfigError {
    ConfigError::MissingRequired {
        key: key.into(),
        hint: hint.into(),
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, raw: &str) -> Result<T, ConfigError> {
    raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key: key.into(),
        message: format!("expected a non-negative integer, got {raw:?}"),
    })
}

/// Parse a comma-separated threshold list such as `"3, 7"`.
fn parse_thresholds(raw: &str) -> Result<Vec<u32>, ConfigError> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| parse_number("REMINDER_THRESHOLDS", s))
        .collect()
}
