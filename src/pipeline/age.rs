//! Age classification against day thresholds.
//!
//! A threshold `T` matches when the time since the last activity lies in
//! the half-open window `[T, T+1)` days, so a conversation is reminded on
//! the day it crosses each threshold and not on the days after.

use chrono::{DateTime, Utc};

pub const ONE_DAY_MILLIS: i64 = 24 * 60 * 60 * 1000;

/// Outcome of a successful classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AgeMatch {
    pub age_days: u32,
    pub matched_threshold_days: u32,
}

/// Classify `last_activity` against `thresholds_days`, relative to `now`.
///
/// Returns `None` when no threshold window contains the elapsed time, or
/// when `last_activity` lies in the future (clock skew, bad timestamps).
/// If several thresholds match, the first one in list order is reported.
pub fn classify(
    last_activity: DateTime<Utc>,
    now: DateTime<Utc>,
    thresholds_days: &[u32],
) -> Option<AgeMatch> {
    let elapsed = now.signed_duration_since(last_activity).num_milliseconds();
    if elapsed < 0 {
        return None;
    }

    let matched = thresholds_days.iter().copied().find(|&t| {
        let start = i64::from(t) * ONE_DAY_MILLIS;
        let end = start + ONE_DAY_MILLIS;
        (start..end).contains(&elapsed)
    })?;

    Some(AgeMatch {
        age_days: u32::try_from(elapsed / ONE_DAY_MILLIS).unwrap_or(u32::MAX),
        matched_threshold_days: matched,
    })
}
