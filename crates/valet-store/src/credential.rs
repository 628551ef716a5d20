//! Stored OAuth credentials.
//!
//! One credential row per `(user_id, tool_name)` pair. Rows are written by
//! the token lifecycle manager when a refresh succeeds and read on every
//! provider-backed tool call. The core never deletes credentials; removal
//! is an administrative action outside this crate.

use crate::error::StoreResult;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tokio::sync::RwLock;

/// A stored OAuth access/refresh token pair for a user and tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credential {
    /// Owning user.
    pub user_id: String,

    /// Tool this credential authenticates.
    pub tool_name: String,

    /// Bearer token presented to the provider.
    pub access_token: String,

    /// Refresh token, when the provider issued one.
    pub refresh_token: Option<String>,

    /// Instant after which the provider stops accepting the access token.
    pub expires_at: DateTime<Utc>,
}

/// Storage for OAuth credentials.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Fetch the credential for a `(user, tool)` pair.
    async fn get(&self, user_id: &str, tool_name: &str) -> StoreResult<Option<Credential>>;

    /// Insert or replace the credential for its `(user, tool)` pair.
    async fn upsert(&self, credential: Credential) -> StoreResult<()>;
}

/// In-memory credential store.
#[derive(Default)]
pub struct InMemoryCredentialStore {
    rows: RwLock<HashMap<(String, String), Credential>>,
}

impl InMemoryCredentialStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CredentialStore for InMemoryCredentialStore {
    async fn get(&self, user_id: &str, tool_name: &str) -> StoreResult<Option<Credential>> {
        let rows = self.rows.read().await;
        Ok(rows
            .get(&(user_id.to_string(), tool_name.to_string()))
            .cloned())
    }

    async fn upsert(&self, credential: Credential) -> StoreResult<()> {
        let key = (credential.user_id.clone(), credential.tool_name.clone());
        let mut rows = self.rows.write().await;
        rows.insert(key, credential);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn credential(user: &str, tool: &str, token: &str) -> Credential {
        Credential {
            user_id: user.to_string(),
            tool_name: tool.to_string(),
            access_token: token.to_string(),
            refresh_token: Some("refresh-1".to_string()),
            expires_at: Utc::now() + Duration::hours(1),
        }
    }

    #[tokio::test]
    async fn test_upsert_and_get() {
        let store = InMemoryCredentialStore::new();
        store
            .upsert(credential("u1", "gmail_send_email", "token-1"))
            .await
            .unwrap();

        let row = store.get("u1", "gmail_send_email").await.unwrap().unwrap();
        assert_eq!(row.access_token, "token-1");
        assert!(store.get("u1", "ride_request").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_upsert_replaces_token() {
        let store = InMemoryCredentialStore::new();
        store
            .upsert(credential("u1", "gmail_send_email", "token-1"))
            .await
            .unwrap();
        store
            .upsert(credential("u1", "gmail_send_email", "token-2"))
            .await
            .unwrap();

        let row = store.get("u1", "gmail_send_email").await.unwrap().unwrap();
        assert_eq!(row.access_token, "token-2");
    }
}
