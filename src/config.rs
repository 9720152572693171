//! Configuration for the mirror service.

use std::env;

/// Webhook mirror service configuration, read from the environment.
#[derive(Clone)]
pub struct Config {
    /// HTTP server port.
    pub port: u16,
    /// Postgres connection string.
    pub database_url: Option<String>,
    /// Webhook signing secret. An empty secret still verifies, but is a
    /// deployment misconfiguration; the binary warns about it at startup.
    pub webhook_secret: String,
    /// GitHub token for API calls (webhook registration, comment posting).
    pub github_token: Option<String>,
    /// Gemini API key for summary generation.
    pub gemini_api_key: Option<String>,
    /// Public base URL of this service, used when registering webhooks.
    pub webhook_handler_url: Option<String>,
    /// Repositories to auto-configure webhooks on (comma-separated `owner/repo`).
    pub github_webhook_repos: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: env::var("PORT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(8080),
            database_url: env::var("DATABASE_URL").ok().filter(|s| !s.is_empty()),
            webhook_secret: env::var("GITHUB_WEBHOOK_SECRET").unwrap_or_default(),
            github_token: env::var("GITHUB_TOKEN").ok().filter(|s| !s.is_empty()),
            gemini_api_key: env::var("GEMINI_API_KEY").ok().filter(|s| !s.is_empty()),
            webhook_handler_url: env::var("WEBHOOK_HANDLER_URL").ok(),
            github_webhook_repos: env::var("GITHUB_WEBHOOK_REPOS")
                .ok()
                .map(|s| {
                    s.split(',')
                        .map(|r| r.trim().to_string())
                        .filter(|r| !r.is_empty())
                        .collect()
                })
                .unwrap_or_default(),
        }
    }
}
