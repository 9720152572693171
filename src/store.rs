//! Persisted store for the local mirror.
//!
//! The store is the atomic unit of event processing: each upsert is a single
//! statement, so concurrent deliveries for the same entity id are serialized
//! by Postgres and last-write-wins.

use async_trait::async_trait;
use sqlx::PgPool;

use crate::error::StoreError;
use crate::models::{IssueRecord, LocalUser, PullRequestRecord};

/// Store operations needed by event reconciliation.
#[async_trait]
pub trait Store: Send + Sync {
    /// Look up a local user by their GitHub account id.
    async fn find_user_by_github_id(
        &self,
        github_id: &str,
    ) -> Result<Option<LocalUser>, StoreError>;

    /// Create-or-update an issue keyed by its GitHub id.
    ///
    /// On update only the status changes; title and description keep their
    /// first-seen snapshot.
    async fn upsert_issue(&self, record: &IssueRecord) -> Result<(), StoreError>;

    /// Create-or-update a pull request keyed by its GitHub id.
    ///
    /// On update only status and merged change.
    async fn upsert_pull_request(&self, record: &PullRequestRecord) -> Result<(), StoreError>;
}

/// Postgres-backed store.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Create a store over an existing connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Store for PgStore {
    async fn find_user_by_github_id(
        &self,
        github_id: &str,
    ) -> Result<Option<LocalUser>, StoreError> {
        sqlx::query_as::<_, LocalUser>(
            "SELECT id, github_id, name, github_auth FROM users WHERE github_id = $1",
        )
        .bind(github_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(Into::into)
    }

    async fn upsert_issue(&self, record: &IssueRecord) -> Result<(), StoreError> {
        sqlx::query(
            r"
            INSERT INTO issues (id, title, description, status, user_id)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (id) DO UPDATE SET
                status = EXCLUDED.status
            ",
        )
        .bind(record.id)
        .bind(&record.title)
        .bind(&record.description)
        .bind(record.status.as_str())
        .bind(record.user_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn upsert_pull_request(&self, record: &PullRequestRecord) -> Result<(), StoreError> {
        sqlx::query(
            r"
            INSERT INTO pull_requests (id, title, description, status, merged, user_id)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (id) DO UPDATE SET
                status = EXCLUDED.status,
                merged = EXCLUDED.merged
            ",
        )
        .bind(record.id)
        .bind(&record.title)
        .bind(&record.description)
        .bind(record.status.as_str())
        .bind(record.merged)
        .bind(record.user_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[cfg(test)]
pub mod testing {
    //! In-memory store with the same update semantics as `PgStore`.

    use std::collections::HashMap;
    use std::sync::Mutex;

    use super::{async_trait, IssueRecord, LocalUser, PullRequestRecord, Store, StoreError};

    /// In-memory stand-in for the Postgres store.
    #[derive(Debug, Default)]
    pub struct MemStore {
        /// Known local users
        pub users: Mutex<Vec<LocalUser>>,
        /// Mirrored issues keyed by GitHub id
        pub issues: Mutex<HashMap<i64, IssueRecord>>,
        /// Mirrored pull requests keyed by GitHub id
        pub pull_requests: Mutex<HashMap<i64, PullRequestRecord>>,
    }

    impl MemStore {
        /// Store with a single known user mapping.
        pub fn with_user(github_id: &str, local_id: i64) -> Self {
            let store = Self::default();
            store.users.lock().unwrap().push(LocalUser {
                id: local_id,
                github_id: github_id.to_string(),
                name: Some("Test User".to_string()),
                github_auth: true,
            });
            store
        }
    }

    #[async_trait]
    impl Store for MemStore {
        async fn find_user_by_github_id(
            &self,
            github_id: &str,
        ) -> Result<Option<LocalUser>, StoreError> {
            Ok(self
                .users
                .lock()
                .unwrap()
                .iter()
                .find(|u| u.github_id == github_id)
                .cloned())
        }

        async fn upsert_issue(&self, record: &IssueRecord) -> Result<(), StoreError> {
            let mut issues = self.issues.lock().unwrap();
            if let Some(existing) = issues.get_mut(&record.id) {
                // Match ON CONFLICT semantics: only status moves on update
                existing.status = record.status;
            } else {
                issues.insert(record.id, record.clone());
            }
            Ok(())
        }

        async fn upsert_pull_request(&self, record: &PullRequestRecord) -> Result<(), StoreError> {
            let mut prs = self.pull_requests.lock().unwrap();
            if let Some(existing) = prs.get_mut(&record.id) {
                existing.status = record.status;
                existing.merged = record.merged;
            } else {
                prs.insert(record.id, record.clone());
            }
            Ok(())
        }
    }
}
