//! Local mirror record types.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A user account created by the OAuth sign-in flow.
///
/// Read-only to webhook processing: events reference users, never create them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct LocalUser {
    /// Local identifier
    pub id: i64,
    /// GitHub account identifier
    pub github_id: String,
    /// Display name
    pub name: Option<String>,
    /// Whether the account signed in through GitHub OAuth
    pub github_auth: bool,
}

/// Lifecycle status of a mirrored issue or pull request.
///
/// `Merged` is only legal for pull requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ItemStatus {
    /// Entity is open
    Open,
    /// Entity is closed
    Closed,
    /// Pull request was merged
    Merged,
}

impl ItemStatus {
    /// Stable string form, used as the TEXT column value.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Open => "Open",
            Self::Closed => "Closed",
            Self::Merged => "Merged",
        }
    }
}

impl fmt::Display for ItemStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A mirrored GitHub issue.
///
/// The local id equals the GitHub issue id, which makes the upsert natively
/// idempotent: redeliveries land on the same row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssueRecord {
    /// GitHub issue id (also the local primary key)
    pub id: i64,
    /// Title, captured at first sight and never refreshed
    pub title: String,
    /// Body, captured at first sight and never refreshed
    pub description: Option<String>,
    /// Current status (Open or Closed)
    pub status: ItemStatus,
    /// Owning local user
    pub user_id: i64,
}

/// A mirrored GitHub pull request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullRequestRecord {
    /// GitHub pull request id (also the local primary key)
    pub id: i64,
    /// Title, captured at first sight and never refreshed
    pub title: String,
    /// Body, captured at first sight and never refreshed
    pub description: Option<String>,
    /// Current status (Open, Closed, or Merged)
    pub status: ItemStatus,
    /// Whether the pull request was merged
    pub merged: bool,
    /// Owning local user
    pub user_id: i64,
}
