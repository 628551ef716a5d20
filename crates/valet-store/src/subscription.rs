//! Tool subscription records.
//!
//! A subscription row records that a user has enabled a tool. At most one
//! row exists per `(user_id, tool_name)` pair; an upsert replaces the prior
//! row. Enrollment itself happens outside the server core (dashboard,
//! admin tooling); the core only reads these rows when listing and
//! executing tools.

use crate::error::StoreResult;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tokio::sync::RwLock;

/// A user's enrollment in a single tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolSubscription {
    /// Owning user.
    pub user_id: String,

    /// Tool this row grants access to.
    pub tool_name: String,

    /// Whether access is currently active. A row with `authorized: false`
    /// keeps the enrollment on record but suspends access.
    pub authorized: bool,

    /// When the enrollment was created.
    pub created_at: DateTime<Utc>,
}

impl ToolSubscription {
    /// Create an active subscription for a user and tool.
    pub fn new(user_id: impl Into<String>, tool_name: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            tool_name: tool_name.into(),
            authorized: true,
            created_at: Utc::now(),
        }
    }

    /// Mark the subscription as suspended.
    pub fn suspended(mut self) -> Self {
        self.authorized = false;
        self
    }
}

/// Storage for tool subscriptions.
#[async_trait]
pub trait SubscriptionStore: Send + Sync {
    /// Fetch the subscription row for a `(user, tool)` pair.
    async fn get(&self, user_id: &str, tool_name: &str) -> StoreResult<Option<ToolSubscription>>;

    /// Insert or replace the subscription row for its `(user, tool)` pair.
    async fn upsert(&self, subscription: ToolSubscription) -> StoreResult<()>;

    /// All subscription rows belonging to a user.
    async fn list_for_user(&self, user_id: &str) -> StoreResult<Vec<ToolSubscription>>;
}

/// In-memory subscription store.
#[derive(Default)]
pub struct InMemorySubscriptionStore {
    rows: RwLock<HashMap<(String, String), ToolSubscription>>,
}

impl InMemorySubscriptionStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SubscriptionStore for InMemorySubscriptionStore {
    async fn get(&self, user_id: &str, tool_name: &str) -> StoreResult<Option<ToolSubscription>> {
        let rows = self.rows.read().await;
        Ok(rows
            .get(&(user_id.to_string(), tool_name.to_string()))
            .cloned())
    }

    async fn upsert(&self, subscription: ToolSubscription) -> StoreResult<()> {
        let key = (
            subscription.user_id.clone(),
            subscription.tool_name.clone(),
        );
        let mut rows = self.rows.write().await;
        rows.insert(key, subscription);
        Ok(())
    }

    async fn list_for_user(&self, user_id: &str) -> StoreResult<Vec<ToolSubscription>> {
        let rows = self.rows.read().await;
        let mut matching: Vec<ToolSubscription> = rows
            .values()
            .filter(|row| row.user_id == user_id)
            .cloned()
            .collect();
        matching.sort_by(|a, b| a.tool_name.cmp(&b.tool_name));
        Ok(matching)
    }
}
