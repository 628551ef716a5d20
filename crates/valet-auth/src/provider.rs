//! OAuth 2.0 provider configuration.
//!
//! Supports the providers Valet's built-in tools talk to, plus custom
//! endpoints for self-hosted deployments. Only the token-refresh surface
//! lives here; the interactive consent flow that mints the first credential
//! runs outside the server.

use crate::error::{AuthError, AuthResult};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Access token lifetime assumed when the provider omits `expires_in`.
pub const DEFAULT_TOKEN_LIFETIME_SECS: i64 = 3600;

/// Supported OAuth providers.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum OAuthProvider {
    /// Google (Gmail, Calendar, Analytics)
    Google,
    /// Uber rides
    Uber,
    /// Custom OAuth provider
    Custom,
}

impl OAuthProvider {
    /// Get the string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            OAuthProvider::Google => "google",
            OAuthProvider::Uber => "uber",
            OAuthProvider::Custom => "custom",
        }
    }

    /// Parse from string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "google" => Some(OAuthProvider::Google),
            "uber" => Some(OAuthProvider::Uber),
            "custom" => Some(OAuthProvider::Custom),
            _ => None,
        }
    }

    /// Get the default token URL for the provider.
    pub fn token_url(&self) -> Option<&'static str> {
        match self {
            OAuthProvider::Google => Some("https://oauth2.googleapis.com/token"),
            OAuthProvider::Uber => Some("https://auth.uber.com/oauth/v2/token"),
            OAuthProvider::Custom => None,
        }
    }
}

/// OAuth provider configuration for one tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OAuthConfig {
    /// Provider type
    pub provider: OAuthProvider,

    /// Client ID
    pub client_id: String,

    /// Client secret
    pub client_secret: String,

    /// Redirect URL registered with the provider
    pub redirect_url: String,

    /// Token URL (optional, uses the provider default when absent)
    pub token_url: Option<String>,
}

impl OAuthConfig {
    /// Create a new OAuth configuration.
    pub fn new(
        provider: OAuthProvider,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        redirect_url: impl Into<String>,
    ) -> Self {
        Self {
            provider,
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            redirect_url: redirect_url.into(),
            token_url: None,
        }
    }

    /// Override the token endpoint URL.
    pub fn with_token_url(mut self, url: impl Into<String>) -> Self {
        self.token_url = Some(url.into());
        self
    }

    /// Get the token URL.
    pub fn get_token_url(&self) -> AuthResult<String> {
        self.token_url
            .clone()
            .or_else(|| self.provider.token_url().map(String::from))
            .ok_or_else(|| AuthError::Config("Token URL not configured".to_string()))
    }
}

/// Token response from a provider token endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    /// New access token
    pub access_token: String,

    /// Token type (usually "Bearer")
    #[serde(default)]
    pub token_type: Option<String>,

    /// Lifetime in seconds, when the provider declares one
    pub expires_in: Option<i64>,

    /// Rotated refresh token, when the provider issued one
    pub refresh_token: Option<String>,

    /// Granted scopes
    #[serde(default)]
    pub scope: Option<String>,
}

impl TokenResponse {
    /// Expiry instant implied by this response, measured from now.
    pub fn expires_at(&self) -> DateTime<Utc> {
        let lifetime = self.expires_in.unwrap_or(DEFAULT_TOKEN_LIFETIME_SECS);
        Utc::now() + Duration::seconds(lifetime)
    }
}
