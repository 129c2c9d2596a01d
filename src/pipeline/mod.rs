//! Reminder pipeline.
//!
//! One run flows through:
//! 1. `MailboxReader`: list inbox threads, fetch each one concurrently
//! 2. `triage::filter()`: unanswered threads inside a threshold window
//! 3. `escalation::format()`: one chat payload per due thread
//! 4. `delivery::deliver()`: concurrent sends, per-item outcomes
//!
//! The fetch and delivery fan-outs both join under the run deadline.

pub mod age;
pub mod delivery;
pub mod escalation;
pub mod runner;
pub mod triage;
pub mod types;

pub use runner::{ReminderRun, RunSummary};

use futures::StreamExt;
use futures::stream::FuturesUnordered;
use tokio::time::Instant;

/// Drain `pending` until it is empty or `deadline` passes.
///
/// Returns the resolved outputs in completion order and whether the
/// deadline cut the join short.
pub(crate) async fn join_until<F>(
    mut pending: FuturesUnordered<F>,
    deadline: Option<Instant>,
) -> (Vec<F::Output>, bool)
where
    F: Future,
{
    let mut resolved = Vec::with_capacity(pending.len());
    loop {
        let next = match deadline {
            Some(deadline) => match tokio::time::timeout_at(deadline, pending.next()).await {
                Ok(next) => next,
                Err(_) => return (resolved, true),
            },
            None => pending.next().await,
        };
        match next {
            Some(output) => resolved.push(output),
            None => return (resolved, false),
        }
    }
}
