//! GitHub API client for webhook management and comment posting.

use anyhow::{anyhow, Context, Result};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, USER_AGENT};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, info, warn};

const GITHUB_API_URL: &str = "https://api.github.com";

/// Events this service subscribes to when registering a hook.
const WEBHOOK_EVENTS: &[&str] = &["issues", "pull_request"];

/// GitHub API client.
#[derive(Debug, Clone)]
pub struct GitHubClient {
    client: reqwest::Client,
    token: String,
    base_url: String,
}

/// GitHub webhook configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookConfig {
    pub url: String,
    pub content_type: String,
    /// Shared signing secret. GitHub never echoes it back on reads.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub secret: Option<String>,
    #[serde(default)]
    pub insecure_ssl: String,
}

/// GitHub webhook response.
#[derive(Debug, Clone, Deserialize)]
pub struct Webhook {
    pub id: u64,
    pub name: String,
    pub active: bool,
    pub events: Vec<String>,
    pub config: WebhookConfig,
}

/// Request to create or update a webhook.
#[derive(Debug, Serialize)]
struct CreateWebhookRequest {
    name: String,
    active: bool,
    events: Vec<String>,
    config: WebhookConfig,
}

impl GitHubClient {
    /// Create a new GitHub client.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn new(token: &str) -> Result<Self> {
        Self::with_base_url(token, GITHUB_API_URL)
    }

    /// Create a client against a non-default API endpoint (used in tests).
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn with_base_url(token: &str, base_url: &str) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/vnd.github+json"),
        );
        headers.insert(
            "X-GitHub-Api-Version",
            HeaderValue::from_static("2022-11-28"),
        );
        headers.insert(USER_AGENT, HeaderValue::from_static("hubmirror/1.0"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            token: token.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// List webhooks for a repository.
    ///
    /// # Errors
    ///
    /// Returns an error if the API call fails.
    pub async fn list_webhooks(&self, owner: &str, repo: &str) -> Result<Vec<Webhook>> {
        let url = format!("{}/repos/{owner}/{repo}/hooks", self.base_url);

        let response = self
            .client
            .get(&url)
            .header(AUTHORIZATION, format!("Bearer {}", self.token))
            .send()
            .await
            .context("Failed to send request")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow!("GitHub API error: {status} - {body}"));
        }

        response
            .json()
            .await
            .context("Failed to parse webhook list response")
    }

    /// Create a webhook for a repository.
    ///
    /// # Errors
    ///
    /// Returns an error if the API call fails.
    pub async fn create_webhook(
        &self,
        owner: &str,
        repo: &str,
        webhook_url: &str,
        secret: &str,
    ) -> Result<Webhook> {
        let url = format!("{}/repos/{owner}/{repo}/hooks", self.base_url);

        let request = CreateWebhookRequest {
            name: "web".to_string(),
            active: true,
            events: WEBHOOK_EVENTS.iter().map(ToString::to_string).collect(),
            config: WebhookConfig {
                url: webhook_url.to_string(),
                content_type: "json".to_string(),
                secret: Some(secret.to_string()),
                insecure_ssl: "0".to_string(),
            },
        };

        let response = self
            .client
            .post(&url)
            .header(AUTHORIZATION, format!("Bearer {}", self.token))
            .json(&request)
            .send()
            .await
            .context("Failed to send create webhook request")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow!(
                "GitHub API error creating webhook: {status} - {body}"
            ));
        }

        response
            .json()
            .await
            .context("Failed to parse create webhook response")
    }

    /// Update a webhook's configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the API call fails.
    pub async fn update_webhook(
        &self,
        owner: &str,
        repo: &str,
        hook_id: u64,
        webhook_url: &str,
        secret: &str,
    ) -> Result<Webhook> {
        let url = format!("{}/repos/{owner}/{repo}/hooks/{hook_id}", self.base_url);

        let request = CreateWebhookRequest {
            name: "web".to_string(),
            active: true,
            events: WEBHOOK_EVENTS.iter().map(ToString::to_string).collect(),
            config: WebhookConfig {
                url: webhook_url.to_string(),
                content_type: "json".to_string(),
                secret: Some(secret.to_string()),
                insecure_ssl: "0".to_string(),
            },
        };

        let response = self
            .client
            .patch(&url)
            .header(AUTHORIZATION, format!("Bearer {}", self.token))
            .json(&request)
            .send()
            .await
            .context("Failed to send update webhook request")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow!(
                "GitHub API error updating webhook: {status} - {body}"
            ));
        }

        response
            .json()
            .await
            .context("Failed to parse update webhook response")
    }

    /// Ensure a webhook exists for the repository pointing to the given URL.
    ///
    /// If a webhook with the same URL already exists, it is updated when its
    /// event subscriptions drift. Otherwise a new one is created.
    ///
    /// # Errors
    ///
    /// Returns an error if the API calls fail.
    pub async fn ensure_webhook(
        &self,
        owner: &str,
        repo: &str,
        webhook_url: &str,
        secret: &str,
    ) -> Result<Webhook> {
        debug!(
            owner = %owner,
            repo = %repo,
            webhook_url = %webhook_url,
            "Ensuring GitHub webhook exists"
        );

        let existing = self.list_webhooks(owner, repo).await?;

        if let Some(hook) = existing.iter().find(|h| h.config.url == webhook_url) {
            let events_match = WEBHOOK_EVENTS
                .iter()
                .all(|e| hook.events.iter().any(|have| have == e));

            if events_match && hook.active {
                info!(
                    owner = %owner,
                    repo = %repo,
                    hook_id = hook.id,
                    "GitHub webhook already exists and is configured correctly"
                );
                return Ok(hook.clone());
            }

            info!(
                owner = %owner,
                repo = %repo,
                hook_id = hook.id,
                "Updating existing GitHub webhook"
            );
            return self
                .update_webhook(owner, repo, hook.id, webhook_url, secret)
                .await;
        }

        info!(
            owner = %owner,
            repo = %repo,
            "Creating new GitHub webhook"
        );
        self.create_webhook(owner, repo, webhook_url, secret).await
    }

    /// Post a comment on an issue or pull request.
    ///
    /// Pull requests share the issues comment endpoint.
    ///
    /// # Errors
    ///
    /// Returns an error if the API call fails.
    pub async fn post_issue_comment(
        &self,
        owner: &str,
        repo: &str,
        number: i64,
        body: &str,
    ) -> Result<()> {
        let url = format!(
            "{}/repos/{owner}/{repo}/issues/{number}/comments",
            self.base_url
        );

        let response = self
            .client
            .post(&url)
            .header(AUTHORIZATION, format!("Bearer {}", self.token))
            .json(&json!({ "body": body }))
            .send()
            .await
            .context("Failed to send comment request")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow!("GitHub API error posting comment: {status} - {body}"));
        }

        Ok(())
    }
}

/// Ensure GitHub webhooks are configured for the given repositories.
///
/// Called on service startup so every configured repository has a hook
/// pointing back at this service.
///
/// # Errors
///
/// Individual repository failures are logged but don't fail the entire operation.
pub async fn ensure_github_webhooks(
    token: &str,
    callback_url: &str,
    secret: &str,
    repos: &[String],
) -> Result<Vec<(String, bool)>> {
    if repos.is_empty() {
        debug!("No GitHub repos configured for webhook setup");
        return Ok(vec![]);
    }

    let client = GitHubClient::new(token)?;
    let webhook_url = format!("{}/webhooks/github", callback_url.trim_end_matches('/'));

    let mut results = Vec::new();

    for repo in repos {
        let Some((owner, repo_name)) = repo.split_once('/') else {
            warn!(repo = %repo, "Invalid repository format (expected owner/repo)");
            results.push((repo.clone(), false));
            continue;
        };

        match client
            .ensure_webhook(owner, repo_name, &webhook_url, secret)
            .await
        {
            Ok(hook) => {
                info!(
                    repo = %repo,
                    hook_id = hook.id,
                    "GitHub webhook configured successfully"
                );
                results.push((repo.clone(), true));
            }
            Err(e) => {
                warn!(
                    repo = %repo,
                    error = %e,
                    "Failed to configure GitHub webhook"
                );
                results.push((repo.clone(), false));
            }
        }
    }

    let success_count = results.iter().filter(|(_, ok)| *ok).count();
    info!(
        total = repos.len(),
        success = success_count,
        "GitHub webhook initialization complete"
    );

    Ok(results)
}
