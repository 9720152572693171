//! Mirror service binary.
//!
//! Standalone HTTP service for GitHub webhook handling.

use anyhow::{Context, Result};
use sqlx::postgres::PgPoolOptions;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use hubmirror::{
    config::Config, ensure_github_webhooks, server, GeminiClient, GitHubClient, PgStore,
};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env().add_directive("hubmirror=info".parse()?))
        .init();

    info!("Starting mirror service...");

    // Load configuration
    let config = Config::default();

    if config.webhook_secret.is_empty() {
        warn!("GITHUB_WEBHOOK_SECRET is empty - signature verification is effectively defeated");
    }

    // Connect to Postgres and run migrations
    let database_url = config
        .database_url
        .clone()
        .context("DATABASE_URL must be set")?;
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await
        .context("Failed to connect to Postgres")?;
    sqlx::migrate!()
        .run(&pool)
        .await
        .context("Failed to run database migrations")?;

    info!("Connected to Postgres");

    // Initialize GitHub client
    let github_client = if let Some(token) = &config.github_token {
        match GitHubClient::new(token) {
            Ok(client) => {
                info!("GitHub API client configured");
                Some(client)
            }
            Err(e) => {
                warn!(error = %e, "Failed to create GitHub client");
                None
            }
        }
    } else {
        info!("No GITHUB_TOKEN configured - webhook registration and comments disabled");
        None
    };

    // Initialize Gemini client
    let gemini_client = if let Some(api_key) = &config.gemini_api_key {
        match GeminiClient::new(api_key) {
            Ok(client) => {
                info!("Gemini client configured");
                Some(client)
            }
            Err(e) => {
                warn!(error = %e, "Failed to create Gemini client");
                None
            }
        }
    } else {
        info!("No GEMINI_API_KEY configured - summary comments disabled");
        None
    };

    // Ensure GitHub webhooks are configured
    if let (Some(token), Some(handler_url)) = (&config.github_token, &config.webhook_handler_url) {
        if config.github_webhook_repos.is_empty() {
            info!("No GITHUB_WEBHOOK_REPOS configured - skipping GitHub webhook setup");
        } else {
            match ensure_github_webhooks(
                token,
                handler_url,
                &config.webhook_secret,
                &config.github_webhook_repos,
            )
            .await
            {
                Ok(results) => {
                    let success = results.iter().filter(|(_, ok)| *ok).count();
                    let failed = results.len() - success;
                    if failed > 0 {
                        info!(
                            success = success,
                            failed = failed,
                            "GitHub webhooks initialization completed with some failures"
                        );
                    } else {
                        info!(count = success, "GitHub webhooks initialized successfully");
                    }
                }
                Err(e) => {
                    // Non-fatal - continue starting the service
                    info!(error = %e, "Could not initialize GitHub webhooks");
                }
            }
        }
    } else if config.webhook_handler_url.is_none() {
        info!("No WEBHOOK_HANDLER_URL configured - skipping GitHub webhook setup");
    }

    // Build application state
    let state = server::AppState {
        config: config.clone(),
        store: Arc::new(PgStore::new(pool)),
        github_client,
        gemini_client,
    };

    // Build router
    let app = server::build_router(state);

    // Bind and serve
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    info!(port = config.port, "Mirror service listening");

    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}
