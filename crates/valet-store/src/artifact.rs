//! User-scoped artifact records.
//!
//! Artifacts are small documents (notes, drafts, generated content) owned
//! by a single user and managed through the artifact tools. Rows are keyed
//! by `(user_id, artifact_id)`; a user can never read or mutate another
//! user's artifacts through this interface.

use crate::error::{StoreError, StoreResult};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

/// A stored artifact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Artifact {
    /// Unique identifier.
    pub id: Uuid,

    /// Owning user.
    pub user_id: String,

    /// Short human-readable title.
    pub title: String,

    /// Artifact body.
    pub content: String,

    /// MIME-ish content type, e.g. `text/markdown`.
    pub content_type: String,

    /// Creation timestamp.
    pub created_at: DateTime<Utc>,

    /// Last modification timestamp.
    pub updated_at: DateTime<Utc>,
}

impl Artifact {
    /// Create a new artifact owned by `user_id`.
    pub fn new(
        user_id: impl Into<String>,
        title: impl Into<String>,
        content: impl Into<String>,
        content_type: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id: user_id.into(),
            title: title.into(),
            content: content.into(),
            content_type: content_type.into(),
            created_at: now,
            updated_at: now,
        }
    }
}

/// Storage for artifacts.
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Insert a new artifact.
    async fn insert(&self, artifact: Artifact) -> StoreResult<()>;

    /// Fetch one of the user's artifacts by id.
    async fn get(&self, user_id: &str, id: Uuid) -> StoreResult<Option<Artifact>>;

    /// All artifacts belonging to a user, oldest first.
    async fn list_for_user(&self, user_id: &str) -> StoreResult<Vec<Artifact>>;

    /// Replace an existing artifact. Fails with [`StoreError::NotFound`]
    /// when no row exists for the artifact's `(user, id)` pair.
    async fn update(&self, artifact: Artifact) -> StoreResult<()>;

    /// Delete one of the user's artifacts. Fails with
    /// [`StoreError::NotFound`] when no such row exists.
    async fn delete(&self, user_id: &str, id: Uuid) -> StoreResult<()>;
}

/// In-memory artifact store.
#[derive(Default)]
pub struct InMemoryArtifactStore {
    rows: RwLock<HashMap<(String, Uuid), Artifact>>,
}

impl InMemoryArtifactStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ArtifactStore for InMemoryArtifactStore {
    async fn insert(&self, artifact: Artifact) -> StoreResult<()> {
        let key = (artifact.user_id.clone(), artifact.id);
        let mut rows = self.rows.write().await;
        rows.insert(key, artifact);
        Ok(())
    }

    async fn get(&self, user_id: &str, id: Uuid) -> StoreResult<Option<Artifact>> {
        let rows = self.rows.read().await;
        Ok(rows.get(&(user_id.to_string(), id)).cloned())
    }

    async fn list_for_user(&self, user_id: &str) -> StoreResult<Vec<Artifact>> {
        let rows = self.rows.read().await;
        let mut matching: Vec<Artifact> = rows
            .values()
            .filter(|artifact| artifact.user_id == user_id)
            .cloned()
            .collect();
        matching.sort_by_key(|artifact| artifact.created_at);
        Ok(matching)
    }

    async fn update(&self, artifact: Artifact) -> StoreResult<()> {
        let key = (artifact.user_id.clone(), artifact.id);
        let mut rows = self.rows.write().await;
        match rows.get_mut(&key) {
            Some(existing) => {
                *existing = artifact;
                Ok(())
            }
            None => Err(StoreError::NotFound(format!("artifact {}", artifact.id))),
        }
    }

    async fn delete(&self, user_id: &str, id: Uuid) -> StoreResult<()> {
        let mut rows = self.rows.write().await;
        rows.remove(&(user_id.to_string(), id))
            .map(|_| ())
            .ok_or_else(|| StoreError::NotFound(format!("artifact {id}")))
    }
}
