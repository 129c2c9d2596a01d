//! inbox-reminder: nudges a chat channel about unanswered inbox threads.

pub mod channels;
pub mod config;
pub mod error;
pub mod pipeline;
