//! Event reconciliation: map validated webhook payloads onto mirror records.
//!
//! Both branches share one shape: translate the action into a status, resolve
//! the actor to a local user, then upsert keyed by the GitHub entity id.
//! Redelivery of the same event lands on the same row, so replays are safe.

use tracing::{debug, info, warn};

use crate::error::MirrorError;
use crate::gemini::GeminiClient;
use crate::github_client::GitHubClient;
use crate::models::{IssueRecord, ItemStatus, LocalUser, PullRequestRecord};
use crate::store::Store;
use crate::webhooks::{EventAction, EventEntity, EventRepository, IssuesEvent, PullRequestEvent};

/// What reconciliation did with an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Recognized action, record upserted
    Applied,
    /// Unrecognized action, no store mutation (still a success)
    Ignored,
}

/// Reconcile an `issues` event.
///
/// Recognized actions: `opened` (status Open) and `closed` (status Closed).
/// Everything else is a no-op.
pub async fn handle_issue_event(
    store: &dyn Store,
    event: &IssuesEvent,
) -> Result<Outcome, MirrorError> {
    let status = match event.action {
        EventAction::Opened => ItemStatus::Open,
        EventAction::Closed => ItemStatus::Closed,
        _ => {
            debug!(
                action = ?event.action,
                issue_id = event.issue.id,
                "Ignoring unhandled issue action"
            );
            return Ok(Outcome::Ignored);
        }
    };

    let actor = resolve_actor(store, &event.issue.user.id).await?;

    store
        .upsert_issue(&IssueRecord {
            id: event.issue.id,
            title: event.issue.title.clone(),
            description: event.issue.body.clone(),
            status,
            user_id: actor.id,
        })
        .await?;

    info!(
        issue_id = event.issue.id,
        status = %status,
        user_id = actor.id,
        "Issue mirrored"
    );
    Ok(Outcome::Applied)
}

/// Reconcile a `pull_request` event.
///
/// Recognized actions: `opened`, `closed`, and `merged` (which also sets the
/// merged flag). Everything else is a no-op.
pub async fn handle_pull_request_event(
    store: &dyn Store,
    event: &PullRequestEvent,
) -> Result<Outcome, MirrorError> {
    let status = match event.action {
        EventAction::Opened => ItemStatus::Open,
        EventAction::Closed => ItemStatus::Closed,
        EventAction::Merged => ItemStatus::Merged,
        EventAction::Unknown => {
            debug!(
                action = ?event.action,
                pull_request_id = event.pull_request.id,
                "Ignoring unhandled pull request action"
            );
            return Ok(Outcome::Ignored);
        }
    };

    let actor = resolve_actor(store, &event.pull_request.user.id).await?;

    store
        .upsert_pull_request(&PullRequestRecord {
            id: event.pull_request.id,
            title: event.pull_request.title.clone(),
            description: event.pull_request.body.clone(),
            status,
            merged: status == ItemStatus::Merged,
            user_id: actor.id,
        })
        .await?;

    info!(
        pull_request_id = event.pull_request.id,
        status = %status,
        user_id = actor.id,
        "Pull request mirrored"
    );
    Ok(Outcome::Applied)
}

/// Resolve the acting GitHub user to a local account.
///
/// Every mirrored record must reference a valid owner, so an unknown actor
/// fails the event rather than storing an orphaned reference. GitHub's own
/// redelivery is the retry path.
async fn resolve_actor(store: &dyn Store, github_id: &str) -> Result<LocalUser, MirrorError> {
    store
        .find_user_by_github_id(github_id)
        .await?
        .ok_or_else(|| MirrorError::ActorUnresolved(github_id.to_string()))
}

/// Generate a summary for the entity and post it back as a comment.
///
/// Best-effort: the upsert has already committed, so failures here are logged
/// and swallowed. Never affects the response.
pub async fn post_summary(
    gemini: &GeminiClient,
    github: &GitHubClient,
    repository: &EventRepository,
    kind: &str,
    entity: &EventEntity,
) {
    let Some(number) = entity.number else {
        debug!(entity_id = entity.id, "No entity number in payload, skipping summary");
        return;
    };

    let prompt = format!(
        "Write a two or three sentence summary of this GitHub {kind} for a project dashboard.\n\n\
         Title: {}\n\n{}",
        entity.title,
        entity.body.as_deref().unwrap_or("(no description)")
    );

    let Some(text) = gemini.generate(&prompt).await else {
        warn!(entity_id = entity.id, "Summary generation returned nothing");
        return;
    };

    let Some((owner, repo)) = repository.full_name.split_once('/') else {
        warn!(
            repository = %repository.full_name,
            "Invalid repository format (expected owner/repo)"
        );
        return;
    };

    match github.post_issue_comment(owner, repo, number, &text).await {
        Ok(()) => {
            info!(
                repository = %repository.full_name,
                number = number,
                "Posted summary comment"
            );
        }
        Err(e) => {
            warn!(
                repository = %repository.full_name,
                number = number,
                error = %e,
                "Failed to post summary comment"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::testing::MemStore;
    use crate::webhooks::{EventUser, IssuesEvent, PullRequestEvent};

    fn issue_event(action: EventAction, id: i64, title: &str, body: &str, actor: &str) -> IssuesEvent {
        IssuesEvent {
            action,
            issue: EventEntity {
                id,
                number: Some(id),
                title: title.to_string(),
                body: Some(body.to_string()),
                user: EventUser {
                    id: actor.to_string(),
                },
            },
            repository: None,
        }
    }

    fn pr_event(action: EventAction, id: i64, title: &str, actor: &str) -> PullRequestEvent {
        PullRequestEvent {
            action,
            pull_request: EventEntity {
                id,
                number: Some(id),
                title: title.to_string(),
                body: None,
                user: EventUser {
                    id: actor.to_string(),
                },
            },
            repository: None,
        }
    }

    #[tokio::test]
    async fn test_issue_opened_creates_record() {
        let store = MemStore::with_user("u1", 7);
        let event = issue_event(EventAction::Opened, 42, "Bug", "desc", "u1");

        let outcome = handle_issue_event(&store, &event).await.unwrap();
        assert_eq!(outcome, Outcome::Applied);

        let issues = store.issues.lock().unwrap();
        let record = issues.get(&42).unwrap();
        assert_eq!(record.id, 42);
        assert_eq!(record.title, "Bug");
        assert_eq!(record.description.as_deref(), Some("desc"));
        assert_eq!(record.status, ItemStatus::Open);
        assert_eq!(record.user_id, 7);
    }

    #[tokio::test]
    async fn test_issue_opened_is_idempotent() {
        let store = MemStore::with_user("u1", 7);
        let event = issue_event(EventAction::Opened, 42, "Bug", "desc", "u1");

        handle_issue_event(&store, &event).await.unwrap();
        handle_issue_event(&store, &event).await.unwrap();

        let issues = store.issues.lock().unwrap();
        assert_eq!(issues.len(), 1);
        let record = issues.get(&42).unwrap();
        assert_eq!(record.title, "Bug");
        assert_eq!(record.status, ItemStatus::Open);
    }

    #[tokio::test]
    async fn test_issue_reopen_preserves_first_snapshot() {
        let store = MemStore::with_user("u1", 7);

        handle_issue_event(
            &store,
            &issue_event(EventAction::Opened, 42, "Bug", "desc", "u1"),
        )
        .await
        .unwrap();
        handle_issue_event(
            &store,
            &issue_event(EventAction::Closed, 42, "Bug (edited)", "changed", "u1"),
        )
        .await
        .unwrap();
        handle_issue_event(
            &store,
            &issue_event(EventAction::Opened, 42, "Bug (edited again)", "changed", "u1"),
        )
        .await
        .unwrap();

        let issues = store.issues.lock().unwrap();
        assert_eq!(issues.len(), 1);
        let record = issues.get(&42).unwrap();
        assert_eq!(record.status, ItemStatus::Open);
        // Title/description are not refreshed on update, by design
        assert_eq!(record.title, "Bug");
        assert_eq!(record.description.as_deref(), Some("desc"));
    }

    #[tokio::test]
    async fn test_issue_unhandled_action_is_noop_success() {
        let store = MemStore::with_user("u1", 7);
        let event = issue_event(EventAction::Unknown, 42, "Bug", "desc", "u1");

        let outcome = handle_issue_event(&store, &event).await.unwrap();
        assert_eq!(outcome, Outcome::Ignored);
        assert!(store.issues.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_issue_merged_action_is_noop_for_issues() {
        // "merged" is only recognized on the pull request branch
        let store = MemStore::with_user("u1", 7);
        let event = issue_event(EventAction::Merged, 42, "Bug", "desc", "u1");

        let outcome = handle_issue_event(&store, &event).await.unwrap();
        assert_eq!(outcome, Outcome::Ignored);
        assert!(store.issues.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_issue_unresolved_actor_fails_without_record() {
        let store = MemStore::default();
        let event = issue_event(EventAction::Opened, 42, "Bug", "desc", "ghost");

        let err = handle_issue_event(&store, &event).await.unwrap_err();
        assert!(matches!(err, MirrorError::ActorUnresolved(id) if id == "ghost"));
        assert!(store.issues.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_pull_request_merge_sequence() {
        let store = MemStore::with_user("u1", 7);

        handle_pull_request_event(&store, &pr_event(EventAction::Opened, 99, "Refactor", "u1"))
            .await
            .unwrap();
        {
            let prs = store.pull_requests.lock().unwrap();
            let record = prs.get(&99).unwrap();
            assert_eq!(record.status, ItemStatus::Open);
            assert!(!record.merged);
        }

        // A differing title on the merge event must not overwrite the snapshot
        handle_pull_request_event(
            &store,
            &pr_event(EventAction::Merged, 99, "Refactor v2", "u1"),
        )
        .await
        .unwrap();

        let prs = store.pull_requests.lock().unwrap();
        assert_eq!(prs.len(), 1);
        let record = prs.get(&99).unwrap();
        assert_eq!(record.status, ItemStatus::Merged);
        assert!(record.merged);
        assert_eq!(record.title, "Refactor");
    }

    #[tokio::test]
    async fn test_pull_request_closed() {
        let store = MemStore::with_user("u1", 7);

        handle_pull_request_event(&store, &pr_event(EventAction::Opened, 5, "WIP", "u1"))
            .await
            .unwrap();
        handle_pull_request_event(&store, &pr_event(EventAction::Closed, 5, "WIP", "u1"))
            .await
            .unwrap();

        let prs = store.pull_requests.lock().unwrap();
        let record = prs.get(&5).unwrap();
        assert_eq!(record.status, ItemStatus::Closed);
        assert!(!record.merged);
    }

    #[tokio::test]
    async fn test_pull_request_unhandled_action_is_noop_success() {
        let store = MemStore::with_user("u1", 7);
        let event = pr_event(EventAction::Unknown, 5, "WIP", "u1");

        let outcome = handle_pull_request_event(&store, &event).await.unwrap();
        assert_eq!(outcome, Outcome::Ignored);
        assert!(store.pull_requests.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_pull_request_unresolved_actor() {
        let store = MemStore::default();
        let event = pr_event(EventAction::Opened, 5, "WIP", "ghost");

        let err = handle_pull_request_event(&store, &event).await.unwrap_err();
        assert!(matches!(err, MirrorError::ActorUnresolved(_)));
        assert!(store.pull_requests.lock().unwrap().is_empty());
    }
}
