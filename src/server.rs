//! HTTP server for GitHub webhooks.

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::Json,
    routing::{get, post},
    Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::error::MirrorError;
use crate::gemini::GeminiClient;
use crate::github_client::GitHubClient;
use crate::handlers::{handle_issue_event, handle_pull_request_event, post_summary, Outcome};
use crate::store::Store;
use crate::webhooks::{verify_webhook_signature, IssuesEvent, PullRequestEvent};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Configuration.
    pub config: Config,
    /// Persisted store.
    pub store: Arc<dyn Store>,
    /// GitHub API client, when a token is configured.
    pub github_client: Option<GitHubClient>,
    /// Gemini client, when an API key is configured.
    pub gemini_client: Option<GeminiClient>,
}

/// Build the HTTP router for the mirror service.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/webhooks/github", post(github_webhook_handler))
        // Health check
        .route("/health", get(health_check))
        .route("/ready", get(readiness_check))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check endpoint.
async fn health_check() -> Json<Value> {
    Json(json!({ "status": "healthy" }))
}

/// Readiness check endpoint.
async fn readiness_check() -> Json<Value> {
    Json(json!({ "status": "ready" }))
}

/// Handle incoming GitHub webhooks.
///
/// This handler:
/// 1. Verifies the delivery signature over the raw body (fail closed)
/// 2. Dispatches on the `X-GitHub-Event` header
/// 3. Reconciles the event into the store
/// 4. Best-effort: posts an AI summary comment back to GitHub
async fn github_webhook_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> (StatusCode, Json<Value>) {
    let event_type = headers
        .get("X-GitHub-Event")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown");

    let delivery_id = headers
        .get("X-GitHub-Delivery")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown");

    info!(
        event_type = %event_type,
        delivery_id = %delivery_id,
        "Received GitHub webhook"
    );

    // Verify signature before any parsing or processing
    let Some(signature) = headers
        .get("X-Hub-Signature-256")
        .and_then(|v| v.to_str().ok())
    else {
        warn!("Missing X-Hub-Signature-256 header");
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "error": "Invalid signature" })),
        );
    };

    if !verify_webhook_signature(&body, signature, &state.config.webhook_secret) {
        warn!(delivery_id = %delivery_id, "Invalid webhook signature");
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "error": "Invalid signature" })),
        );
    }

    match dispatch_event(&state, event_type, &body).await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({ "message": "Event handled successfully" })),
        ),
        Err(DispatchError::InvalidPayload(e)) => {
            error!(error = %e, "Failed to parse webhook payload");
            (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": "Invalid payload" })),
            )
        }
        Err(DispatchError::Mirror(e)) => {
            match &e {
                MirrorError::UnsupportedEvent(_) => {
                    warn!(event_type = %event_type, "Unhandled event type");
                    (
                        StatusCode::BAD_REQUEST,
                        Json(json!({ "error": e.to_string() })),
                    )
                }
                MirrorError::ActorUnresolved(_) | MirrorError::Store(_) => {
                    error!(error = %e, delivery_id = %delivery_id, "Error handling event");
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        Json(json!({ "error": "Internal Server Error" })),
                    )
                }
            }
        }
    }
}

enum DispatchError {
    InvalidPayload(serde_json::Error),
    Mirror(MirrorError),
}

impl From<MirrorError> for DispatchError {
    fn from(e: MirrorError) -> Self {
        Self::Mirror(e)
    }
}

/// Route a verified delivery to the matching reconciler.
async fn dispatch_event(
    state: &AppState,
    event_type: &str,
    body: &[u8],
) -> Result<(), DispatchError> {
    match event_type {
        "issues" => {
            let event: IssuesEvent =
                serde_json::from_slice(body).map_err(DispatchError::InvalidPayload)?;

            if handle_issue_event(state.store.as_ref(), &event).await? == Outcome::Applied {
                maybe_post_summary(state, event.repository.as_ref(), "issue", &event.issue).await;
            }
            Ok(())
        }
        "pull_request" => {
            let event: PullRequestEvent =
                serde_json::from_slice(body).map_err(DispatchError::InvalidPayload)?;

            if handle_pull_request_event(state.store.as_ref(), &event).await? == Outcome::Applied {
                maybe_post_summary(
                    state,
                    event.repository.as_ref(),
                    "pull request",
                    &event.pull_request,
                )
                .await;
            }
            Ok(())
        }
        other => Err(MirrorError::UnsupportedEvent(other.to_string()).into()),
    }
}

/// Post a summary comment when both clients are configured and the payload
/// names its repository. Failures never reach the caller.
async fn maybe_post_summary(
    state: &AppState,
    repository: Option<&crate::webhooks::EventRepository>,
    kind: &str,
    entity: &crate::webhooks::EventEntity,
) {
    let (Some(gemini), Some(github)) = (&state.gemini_client, &state.github_client) else {
        return;
    };
    let Some(repository) = repository else {
        return;
    };

    post_summary(gemini, github, repository, kind, entity).await;
}
