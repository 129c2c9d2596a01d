//! Collaborators at the edges of the pipeline: where conversations come
//! from and where reminders go.

pub mod channel;
pub mod gmail;
pub mod slack;

pub use channel::*;
pub use gmail::GmailReader;
pub use slack::SlackWebhookNotifier;
