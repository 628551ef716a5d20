//! Valet MCP server binary.
//!
//! Wires the in-memory stores, token lifecycle, tool registry, and HTTP
//! transport together from environment configuration. Swap the in-memory
//! stores for a relational implementation by providing different
//! `valet_store` trait objects.

use anyhow::Context;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;
use valet_auth::{HttpTokenRefresher, OAuthConfig, OAuthProvider, TokenLifecycle};
use valet_mcp::tools::{all_tools, ToolDependencies};
use valet_mcp::{transport, AuthorizationGate, McpServer, ServiceConfig, ToolRegistry};
use valet_store::{
    InMemoryArtifactStore, InMemoryCredentialStore, InMemorySubscriptionStore, SubscriptionStore,
    ToolSubscription,
};

/// Tools refreshed against the Google token endpoint.
const GOOGLE_TOOLS: [&str; 3] = [
    "gmail_send_email",
    "calendar_create_event",
    "analytics_run_report",
];

/// Tools refreshed against the ride provider token endpoint.
const RIDE_TOOLS: [&str; 2] = ["ride_price_estimate", "ride_request"];

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("valet_mcp=info,valet_auth=info")),
        )
        .init();

    let config = ServiceConfig::from_env();
    let subscriptions = Arc::new(InMemorySubscriptionStore::new());
    let credentials = Arc::new(InMemoryCredentialStore::new());
    let artifacts = Arc::new(InMemoryArtifactStore::new());

    let refresher = Arc::new(HttpTokenRefresher::new(config.timeout()));
    let mut lifecycle = TokenLifecycle::new(credentials, refresher);
    if let Some(google) = oauth_config_from_env("GOOGLE", OAuthProvider::Google) {
        for tool in GOOGLE_TOOLS {
            lifecycle = lifecycle.register_provider(tool, google.clone());
        }
    }
    if let Some(rides) = oauth_config_from_env("UBER", OAuthProvider::Uber) {
        for tool in RIDE_TOOLS {
            lifecycle = lifecycle.register_provider(tool, rides.clone());
        }
    }

    let deps = ToolDependencies {
        config,
        lifecycle: Arc::new(lifecycle),
        artifacts,
    };
    let mut registry = ToolRegistry::new();
    registry.register_all(all_tools(&deps));

    // Local development affordance: enroll one user in every tool.
    if let Ok(user) = std::env::var("VALET_DEMO_USER") {
        for definition in registry.list() {
            subscriptions
                .upsert(ToolSubscription::new(user.clone(), definition.name))
                .await
                .context("failed to enroll demo user")?;
        }
        info!(user, "enrolled demo user in all tools");
    }

    let gate = AuthorizationGate::new(subscriptions);
    let server = McpServer::new("valet-mcp", env!("CARGO_PKG_VERSION"), registry, gate);

    let bind = std::env::var("VALET_BIND").unwrap_or_else(|_| "127.0.0.1:8790".to_string());
    transport::serve(&bind, Arc::new(server))
        .await
        .context("server terminated")?;

    Ok(())
}

/// Build one provider's OAuth settings from `<PREFIX>_CLIENT_ID`,
/// `<PREFIX>_CLIENT_SECRET`, `<PREFIX>_REDIRECT_URI`, and optionally
/// `<PREFIX>_TOKEN_URL`. Returns None when the provider is not
/// configured; its tools then report re-authentication required.
fn oauth_config_from_env(prefix: &str, provider: OAuthProvider) -> Option<OAuthConfig> {
    let client_id = std::env::var(format!("{prefix}_CLIENT_ID")).ok()?;
    let client_secret = std::env::var(format!("{prefix}_CLIENT_SECRET")).ok()?;
    let redirect_uri = std::env::var(format!("{prefix}_REDIRECT_URI")).ok()?;

    let mut config = OAuthConfig::new(provider, client_id, client_secret, redirect_uri);
    if let Ok(url) = std::env::var(format!("{prefix}_TOKEN_URL")) {
        config = config.with_token_url(url);
    }
    Some(config)
}
