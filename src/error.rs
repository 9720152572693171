//! Error types for webhook event processing.

use thiserror::Error;

/// Errors from the persisted store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Database query failed
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Errors that can occur while reconciling a webhook event.
#[derive(Debug, Error)]
pub enum MirrorError {
    /// Event type this service does not dispatch on
    #[error("Unhandled event: {0}")]
    UnsupportedEvent(String),

    /// The acting GitHub user has no local account mapping
    #[error("no local user mapped to GitHub id {0}")]
    ActorUnresolved(String),

    /// Store lookup or upsert failed
    #[error(transparent)]
    Store(#[from] StoreError),
}
