//! Provider token-endpoint client.
//!
//! Performs the `grant_type=refresh_token` exchange. The trait seam exists
//! so the lifecycle manager can be driven by a scripted refresher in tests.

use crate::error::{AuthError, AuthResult};
use crate::provider::{OAuthConfig, TokenResponse};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, instrument, warn};

/// Exchanges refresh tokens for new access tokens.
#[async_trait]
pub trait TokenRefresher: Send + Sync {
    /// Exchange a refresh token against the provider's token endpoint.
    async fn refresh(
        &self,
        config: &OAuthConfig,
        refresh_token: &str,
    ) -> AuthResult<TokenResponse>;
}

/// HTTP token refresher backed by reqwest.
#[derive(Clone)]
pub struct HttpTokenRefresher {
    /// HTTP client instance.
    client: Client,
}

impl HttpTokenRefresher {
    /// Create a refresher with the given request timeout.
    pub fn new(timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .expect("Failed to build HTTP client");

        Self { client }
    }
}

#[async_trait]
impl TokenRefresher for HttpTokenRefresher {
    #[instrument(skip(self, config, refresh_token), fields(provider = config.provider.as_str()))]
    async fn refresh(
        &self,
        config: &OAuthConfig,
        refresh_token: &str,
    ) -> AuthResult<TokenResponse> {
        let url = config.get_token_url()?;
        debug!("Requesting token refresh");

        let params = [
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
            ("client_id", config.client_id.as_str()),
            ("client_secret", config.client_secret.as_str()),
        ];

        let response = self
            .client
            .post(&url)
            .form(&params)
            .send()
            .await
            .map_err(|e| AuthError::RefreshFailed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), "Token endpoint rejected refresh");
            return Err(AuthError::RefreshFailed(format!(
                "token endpoint returned {}: {}",
                status.as_u16(),
                body
            )));
        }

        response
            .json::<TokenResponse>()
            .await
            .map_err(|e| AuthError::RefreshFailed(format!("invalid token response: {e}")))
    }
}
