//! GitHub webhook mirror service.
//!
//! This crate provides:
//! - Webhook signature verification and payload parsing
//! - Idempotent reconciliation of issue/pull-request events into Postgres
//! - GitHub REST client for webhook registration and comment posting
//! - Gemini client for best-effort summary generation
//! - HTTP server for webhook handling (standalone service)

#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)] // Many async API methods can fail

pub mod config;
pub mod error;
pub mod gemini;
pub mod github_client;
pub mod handlers;
pub mod models;
pub mod server;
pub mod store;
pub mod webhooks;

pub use config::Config;
pub use error::{MirrorError, StoreError};
pub use gemini::GeminiClient;
pub use github_client::{ensure_github_webhooks, GitHubClient};
pub use models::{IssueRecord, ItemStatus, LocalUser, PullRequestRecord};
pub use store::{PgStore, Store};
pub use webhooks::{verify_webhook_signature, IssuesEvent, PullRequestEvent};
