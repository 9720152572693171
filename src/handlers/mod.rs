//! Webhook event handlers.

pub mod events;

pub use events::{handle_issue_event, handle_pull_request_event, post_summary, Outcome};
