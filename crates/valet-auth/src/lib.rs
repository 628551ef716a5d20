//! # Valet Auth
//!
//! OAuth2 token lifecycle management for the Valet platform. Provider-backed
//! tools (Gmail, Calendar, Analytics, rides) authenticate with per-user
//! access tokens stored in [`valet_store::CredentialStore`]; this crate
//! decides when those tokens are stale, refreshes them against the
//! provider's token endpoint, and persists the result.
//!
//! ## Overview
//!
//! - [`OAuthProvider`] / [`OAuthConfig`]: provider settings (client id,
//!   secret, token endpoint) loaded from the environment by the server.
//! - [`TokenRefresher`] / [`HttpTokenRefresher`]: the
//!   `grant_type=refresh_token` exchange against the provider.
//! - [`TokenLifecycle`]: the state machine. `ensure_fresh` returns a stored
//!   credential unchanged while it is valid, refreshes it when it is inside
//!   the guard window, and raises [`AuthError::ReauthRequired`] when no
//!   refresh is possible. Refreshes for the same `(user, tool)` pair are
//!   serialized so concurrent callers reuse one refresh instead of racing.
//! - [`call_with_reauth`]: the retry contract for provider calls. A call
//!   rejected as unauthenticated triggers exactly one forced refresh and
//!   exactly one retry; a second failure is terminal.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use valet_auth::{HttpTokenRefresher, OAuthConfig, OAuthProvider, TokenLifecycle};
//! use valet_store::InMemoryCredentialStore;
//!
//! async fn setup() {
//!     let lifecycle = TokenLifecycle::new(
//!         Arc::new(InMemoryCredentialStore::new()),
//!         Arc::new(HttpTokenRefresher::new(std::time::Duration::from_secs(30))),
//!     )
//!     .register_provider(
//!         "gmail_send_email",
//!         OAuthConfig::new(OAuthProvider::Google, "id", "secret", "http://localhost/cb"),
//!     );
//!
//!     let credential = lifecycle.ensure_fresh("u1", "gmail_send_email").await;
//!     println!("fresh: {}", credential.is_ok());
//! }
//! ```

pub mod error;
pub mod lifecycle;
pub mod provider;
pub mod refresh;

// Re-export main types
pub use error::{message_indicates_auth_failure, AuthError, AuthFailure, AuthResult};
pub use lifecycle::{call_with_reauth, ProviderCallError, TokenLifecycle, STALE_GUARD_SECS};
pub use provider::{OAuthConfig, OAuthProvider, TokenResponse, DEFAULT_TOKEN_LIFETIME_SECS};
pub use refresh::{HttpTokenRefresher, TokenRefresher};
