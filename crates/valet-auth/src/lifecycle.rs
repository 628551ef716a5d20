//! Token lifecycle management.
//!
//! A stored credential is **valid** while its expiry is more than the guard
//! window away, and **stale** once it is inside the window, already past
//! it, or missing an access token. Stale credentials are refreshed against
//! the provider and the result is persisted; a failed refresh leaves the
//! stored row untouched and surfaces [`AuthError::ReauthRequired`].
//!
//! Refreshes for the same `(user, tool)` pair are serialized through a
//! keyed mutex: a caller that waited on an in-flight refresh re-reads the
//! store and reuses the winner's result instead of issuing a duplicate
//! refresh call.

use crate::error::{AuthError, AuthFailure, AuthResult};
use crate::provider::OAuthConfig;
use crate::refresh::TokenRefresher;
use chrono::{Duration, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use valet_store::{Credential, CredentialStore};

/// Lead time before expiry at which a token is treated as stale.
pub const STALE_GUARD_SECS: i64 = 300;

/// Why a serialized refresh is running.
enum RefreshMode<'a> {
    /// Proactive refresh; skip if a concurrent caller already produced a
    /// credential outside the guard window.
    IfStale,
    /// Forced refresh after a provider rejected `rejected_token`; skip only
    /// if the stored token has already been rotated away from it.
    UnlessRotated { rejected_token: &'a str },
}

/// Manages stored OAuth credentials for provider-backed tools.
pub struct TokenLifecycle {
    /// Credential persistence.
    credentials: Arc<dyn CredentialStore>,

    /// Token endpoint client.
    refresher: Arc<dyn TokenRefresher>,

    /// OAuth settings per tool name.
    providers: HashMap<String, OAuthConfig>,

    /// Staleness lead time.
    guard_window: Duration,

    /// Per-(user, tool) refresh serialization.
    refresh_locks: Mutex<HashMap<(String, String), Arc<Mutex<()>>>>,
}

impl TokenLifecycle {
    /// Create a lifecycle manager with the default guard window.
    pub fn new(credentials: Arc<dyn CredentialStore>, refresher: Arc<dyn TokenRefresher>) -> Self {
        Self {
            credentials,
            refresher,
            providers: HashMap::new(),
            guard_window: Duration::seconds(STALE_GUARD_SECS),
            refresh_locks: Mutex::new(HashMap::new()),
        }
    }

    /// Override the guard window.
    pub fn with_guard_window(mut self, secs: i64) -> Self {
        self.guard_window = Duration::seconds(secs);
        self
    }

    /// Register the OAuth settings used to refresh a tool's credentials.
    pub fn register_provider(mut self, tool_name: impl Into<String>, config: OAuthConfig) -> Self {
        self.providers.insert(tool_name.into(), config);
        self
    }

    /// Return a credential guaranteed to be outside the guard window.
    ///
    /// Valid credentials are returned unchanged; stale ones are refreshed
    /// and persisted first. Missing credentials, missing refresh tokens,
    /// and provider rejections surface as [`AuthError::ReauthRequired`].
    pub async fn ensure_fresh(&self, user_id: &str, tool_name: &str) -> AuthResult<Credential> {
        let credential = self
            .credentials
            .get(user_id, tool_name)
            .await?
            .ok_or_else(|| reauth(tool_name, "no stored credential"))?;

        if !self.is_stale(&credential) {
            debug!(user_id, tool_name, "access token still valid");
            return Ok(credential);
        }

        self.refresh_serialized(user_id, tool_name, RefreshMode::IfStale)
            .await
    }

    /// Refresh regardless of the cached expiry.
    ///
    /// Used after a provider rejected `rejected_token` as unauthenticated
    /// even though it looked valid. If a concurrent caller already rotated
    /// the stored token away from `rejected_token`, that result is reused.
    pub async fn force_refresh(
        &self,
        user_id: &str,
        tool_name: &str,
        rejected_token: &str,
    ) -> AuthResult<Credential> {
        self.refresh_serialized(user_id, tool_name, RefreshMode::UnlessRotated { rejected_token })
            .await
    }

    /// Whether a credential needs refreshing before use.
    fn is_stale(&self, credential: &Credential) -> bool {
        credential.access_token.is_empty()
            || Utc::now() + self.guard_window >= credential.expires_at
    }

    fn provider_for(&self, tool_name: &str) -> AuthResult<&OAuthConfig> {
        self.providers
            .get(tool_name)
            .ok_or_else(|| AuthError::Config(format!("no OAuth provider registered for {tool_name}")))
    }

    async fn lock_for(&self, user_id: &str, tool_name: &str) -> Arc<Mutex<()>> {
        let mut locks = self.refresh_locks.lock().await;
        locks
            .entry((user_id.to_string(), tool_name.to_string()))
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    async fn refresh_serialized(
        &self,
        user_id: &str,
        tool_name: &str,
        mode: RefreshMode<'_>,
    ) -> AuthResult<Credential> {
        let lock = self.lock_for(user_id, tool_name).await;
        let _guard = lock.lock().await;

        // Re-read under the lock: a concurrent caller may have finished a
        // refresh while we waited.
        let current = self
            .credentials
            .get(user_id, tool_name)
            .await?
            .ok_or_else(|| reauth(tool_name, "no stored credential"))?;

        let reusable = match mode {
            RefreshMode::IfStale => !self.is_stale(&current),
            RefreshMode::UnlessRotated { rejected_token } => {
                current.access_token != rejected_token && !self.is_stale(&current)
            }
        };
        if reusable {
            debug!(user_id, tool_name, "reusing refresh completed by a concurrent caller");
            return Ok(current);
        }

        let refresh_token = current
            .refresh_token
            .clone()
            .ok_or_else(|| reauth(tool_name, "no refresh token on file"))?;
        let config = self.provider_for(tool_name)?;

        let response = match self.refresher.refresh(config, &refresh_token).await {
            Ok(response) => response,
            Err(e @ AuthError::Config(_)) => return Err(e),
            // Stored row stays untouched; the user must re-consent.
            Err(e) => return Err(reauth(tool_name, e.to_string())),
        };

        let updated = Credential {
            user_id: current.user_id.clone(),
            tool_name: current.tool_name.clone(),
            access_token: response.access_token.clone(),
            refresh_token: response.refresh_token.clone().or(current.refresh_token),
            expires_at: response.expires_at(),
        };
        self.credentials.upsert(updated.clone()).await?;
        info!(user_id, tool_name, "access token refreshed");

        Ok(updated)
    }
}

fn reauth(tool_name: &str, reason: impl Into<String>) -> AuthError {
    AuthError::ReauthRequired {
        tool_name: tool_name.to_string(),
        reason: reason.into(),
    }
}

/// Error from a provider call wrapped by [`call_with_reauth`].
#[derive(Debug, Error)]
pub enum ProviderCallError<E: std::fmt::Debug + std::fmt::Display> {
    /// The credential could not be made fresh.
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// The provider call itself failed.
    #[error("{0}")]
    Provider(E),
}

/// Run a provider call with a fresh access token, refreshing and retrying
/// exactly once if the provider rejects the token as unauthenticated.
///
/// The first attempt uses the credential from
/// [`TokenLifecycle::ensure_fresh`]. If the operation fails with an
/// authentication error (per [`AuthFailure`]), the token is force-refreshed
/// and the operation is retried once. A second failure is returned to the
/// caller; no further automatic retries occur.
pub async fn call_with_reauth<T, E, F, Fut>(
    lifecycle: &TokenLifecycle,
    user_id: &str,
    tool_name: &str,
    mut operation: F,
) -> Result<T, ProviderCallError<E>>
where
    F: FnMut(String) -> Fut,
    Fut: std::future::Future<Output = Result<T, E>>,
    E: AuthFailure + std::fmt::Debug + std::fmt::Display,
{
    let credential = lifecycle.ensure_fresh(user_id, tool_name).await?;

    match operation(credential.access_token.clone()).await {
        Ok(value) => Ok(value),
        Err(e) if e.is_auth_failure() => {
            warn!(
                user_id,
                tool_name,
                error = %e,
                "provider rejected access token, refreshing and retrying once"
            );
            let refreshed = lifecycle
                .force_refresh(user_id, tool_name, &credential.access_token)
                .await?;
            operation(refreshed.access_token)
                .await
                .map_err(ProviderCallError::Provider)
        }
        Err(e) => Err(ProviderCallError::Provider(e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::{OAuthProvider, TokenResponse};
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicU32, Ordering};
    use valet_store::InMemoryCredentialStore;

    struct ScriptedRefresher {
        calls: AtomicU32,
        responses: std::sync::Mutex<VecDeque<AuthResult<TokenResponse>>>,
    }

    impl ScriptedRefresher {
        fn new(responses: Vec<AuthResult<TokenResponse>>) -> Self {
            Self {
                calls: AtomicU32::new(0),
                responses: std::sync::Mutex::new(responses.into()),
            }
        }

        fn call_count(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl TokenRefresher for ScriptedRefresher {
        async fn refresh(
            &self,
            _config: &OAuthConfig,
            _refresh_token: &str,
        ) -> AuthResult<TokenResponse> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .expect("unexpected refresh call")
        }
    }

    fn token_response(access_token: &str, rotated: Option<&str>) -> TokenResponse {
        TokenResponse {
            access_token: access_token.to_string(),
            token_type: Some("Bearer".to_string()),
            expires_in: Some(3600),
            refresh_token: rotated.map(String::from),
            scope: None,
        }
    }

    fn credential(token: &str, refresh: Option<&str>, expires_in_secs: i64) -> Credential {
        Credential {
            user_id: "u1".to_string(),
            tool_name: "gmail_send_email".to_string(),
            access_token: token.to_string(),
            refresh_token: refresh.map(String::from),
            expires_at: Utc::now() + Duration::seconds(expires_in_secs),
        }
    }

    async fn lifecycle_with(
        stored: Option<Credential>,
        refresher: Arc<ScriptedRefresher>,
    ) -> (TokenLifecycle, Arc<InMemoryCredentialStore>) {
        let store = Arc::new(InMemoryCredentialStore::new());
        if let Some(credential) = stored {
            store.upsert(credential).await.unwrap();
        }
        let lifecycle = TokenLifecycle::new(store.clone(), refresher).register_provider(
            "gmail_send_email",
            OAuthConfig::new(OAuthProvider::Google, "cid", "csecret", "http://cb"),
        );
        (lifecycle, store)
    }

    #[tokio::test]
    async fn test_valid_token_is_returned_unchanged() {
        let refresher = Arc::new(ScriptedRefresher::new(vec![]));
        let (lifecycle, _) =
            lifecycle_with(Some(credential("t-1", Some("r-1"), 600)), refresher.clone()).await;

        let result = lifecycle.ensure_fresh("u1", "gmail_send_email").await.unwrap();
        assert_eq!(result.access_token, "t-1");
        assert_eq!(refresher.call_count(), 0);
    }

    #[tokio::test]
    async fn test_token_inside_guard_window_is_refreshed_once() {
        let refresher = Arc::new(ScriptedRefresher::new(vec![Ok(token_response(
            "t-2",
            Some("r-2"),
        ))]));
        let (lifecycle, store) =
            lifecycle_with(Some(credential("t-1", Some("r-1"), 60)), refresher.clone()).await;

        let result = lifecycle.ensure_fresh("u1", "gmail_send_email").await.unwrap();
        assert_eq!(result.access_token, "t-2");
        assert_eq!(result.refresh_token.as_deref(), Some("r-2"));
        assert_eq!(refresher.call_count(), 1);

        let stored = store.get("u1", "gmail_send_email").await.unwrap().unwrap();
        assert_eq!(stored.access_token, "t-2");
    }

    #[tokio::test]
    async fn test_refresh_retains_old_refresh_token_when_not_rotated() {
        let refresher = Arc::new(ScriptedRefresher::new(vec![Ok(token_response("t-2", None))]));
        let (lifecycle, store) =
            lifecycle_with(Some(credential("t-1", Some("r-1"), 60)), refresher).await;

        lifecycle.ensure_fresh("u1", "gmail_send_email").await.unwrap();

        let stored = store.get("u1", "gmail_send_email").await.unwrap().unwrap();
        assert_eq!(stored.refresh_token.as_deref(), Some("r-1"));
    }

    #[tokio::test]
    async fn test_missing_credential_requires_reauth() {
        let refresher = Arc::new(ScriptedRefresher::new(vec![]));
        let (lifecycle, _) = lifecycle_with(None, refresher.clone()).await;

        let result = lifecycle.ensure_fresh("u1", "gmail_send_email").await;
        assert!(matches!(result, Err(AuthError::ReauthRequired { .. })));
        assert_eq!(refresher.call_count(), 0);
    }

    #[tokio::test]
    async fn test_stale_token_without_refresh_token_requires_reauth() {
        let refresher = Arc::new(ScriptedRefresher::new(vec![]));
        let (lifecycle, _) =
            lifecycle_with(Some(credential("t-1", None, 60)), refresher.clone()).await;

        let result = lifecycle.ensure_fresh("u1", "gmail_send_email").await;
        assert!(matches!(result, Err(AuthError::ReauthRequired { .. })));
        assert_eq!(refresher.call_count(), 0);
    }

    #[tokio::test]
    async fn test_refresh_failure_leaves_credential_unchanged() {
        let refresher = Arc::new(ScriptedRefresher::new(vec![Err(AuthError::RefreshFailed(
            "token endpoint returned 400: invalid_grant".to_string(),
        ))]));
        let (lifecycle, store) =
            lifecycle_with(Some(credential("t-1", Some("r-dead"), 60)), refresher).await;

        let result = lifecycle.ensure_fresh("u1", "gmail_send_email").await;
        assert!(matches!(result, Err(AuthError::ReauthRequired { .. })));

        let stored = store.get("u1", "gmail_send_email").await.unwrap().unwrap();
        assert_eq!(stored.access_token, "t-1");
        assert_eq!(stored.refresh_token.as_deref(), Some("r-dead"));
    }

    #[tokio::test]
    async fn test_force_refresh_reuses_concurrent_rotation() {
        // The stored token has already been rotated away from the one the
        // provider rejected, so no second refresh happens.
        let refresher = Arc::new(ScriptedRefresher::new(vec![]));
        let (lifecycle, _) =
            lifecycle_with(Some(credential("t-2", Some("r-1"), 3600)), refresher.clone()).await;

        let result = lifecycle
            .force_refresh("u1", "gmail_send_email", "t-1")
            .await
            .unwrap();
        assert_eq!(result.access_token, "t-2");
        assert_eq!(refresher.call_count(), 0);
    }

    #[tokio::test]
    async fn test_force_refresh_refreshes_rejected_token() {
        let refresher = Arc::new(ScriptedRefresher::new(vec![Ok(token_response(
            "t-2",
            None,
        ))]));
        let (lifecycle, _) =
            lifecycle_with(Some(credential("t-1", Some("r-1"), 3600)), refresher.clone()).await;

        let result = lifecycle
            .force_refresh("u1", "gmail_send_email", "t-1")
            .await
            .unwrap();
        assert_eq!(result.access_token, "t-2");
        assert_eq!(refresher.call_count(), 1);
    }

    #[derive(Debug)]
    struct FakeProviderError {
        auth: bool,
    }

    impl std::fmt::Display for FakeProviderError {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "provider call failed (auth: {})", self.auth)
        }
    }

    impl AuthFailure for FakeProviderError {
        fn is_auth_failure(&self) -> bool {
            self.auth
        }
    }

    #[tokio::test]
    async fn test_call_with_reauth_retries_once_after_auth_failure() {
        let refresher = Arc::new(ScriptedRefresher::new(vec![Ok(token_response(
            "t-2",
            None,
        ))]));
        let (lifecycle, _) =
            lifecycle_with(Some(credential("t-1", Some("r-1"), 3600)), refresher.clone()).await;

        let attempts = Arc::new(AtomicU32::new(0));
        let attempts_clone = attempts.clone();

        let result = call_with_reauth(&lifecycle, "u1", "gmail_send_email", |token| {
            let attempts = attempts_clone.clone();
            async move {
                attempts.fetch_add(1, Ordering::SeqCst);
                if token == "t-2" {
                    Ok(42)
                } else {
                    Err(FakeProviderError { auth: true })
                }
            }
        })
        .await;

        assert!(matches!(result, Ok(42)));
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
        assert_eq!(refresher.call_count(), 1);
    }

    #[tokio::test]
    async fn test_call_with_reauth_second_failure_is_terminal() {
        let refresher = Arc::new(ScriptedRefresher::new(vec![Ok(token_response(
            "t-2",
            None,
        ))]));
        let (lifecycle, _) =
            lifecycle_with(Some(credential("t-1", Some("r-1"), 3600)), refresher.clone()).await;

        let attempts = Arc::new(AtomicU32::new(0));
        let attempts_clone = attempts.clone();

        let result: Result<i32, _> =
            call_with_reauth(&lifecycle, "u1", "gmail_send_email", |_token| {
                let attempts = attempts_clone.clone();
                async move {
                    attempts.fetch_add(1, Ordering::SeqCst);
                    Err(FakeProviderError { auth: true })
                }
            })
            .await;

        assert!(matches!(result, Err(ProviderCallError::Provider(_))));
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
        assert_eq!(refresher.call_count(), 1);
    }

    #[tokio::test]
    async fn test_call_with_reauth_does_not_retry_other_errors() {
        let refresher = Arc::new(ScriptedRefresher::new(vec![]));
        let (lifecycle, _) =
            lifecycle_with(Some(credential("t-1", Some("r-1"), 3600)), refresher.clone()).await;

        let attempts = Arc::new(AtomicU32::new(0));
        let attempts_clone = attempts.clone();

        let result: Result<i32, _> =
            call_with_reauth(&lifecycle, "u1", "gmail_send_email", |_token| {
                let attempts = attempts_clone.clone();
                async move {
                    attempts.fetch_add(1, Ordering::SeqCst);
                    Err(FakeProviderError { auth: false })
                }
            })
            .await;

        assert!(matches!(result, Err(ProviderCallError::Provider(_))));
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
        assert_eq!(refresher.call_count(), 0);
    }
}
