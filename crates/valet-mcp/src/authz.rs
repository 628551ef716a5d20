//! Authorization gate for per-user tool access.
//!
//! A tool is visible to a user, and invocable by them, iff an authorized
//! subscription row exists for the `(user, tool)` pair. This one rule is
//! applied by `tools/list` and again before every `tools/call` handler
//! invocation. Denials are tool results, not protocol errors, so clients
//! render them as ordinary messages.

use crate::server::McpServerResult;
use crate::types::{ToolDefinition, ToolResult};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::debug;
use valet_store::SubscriptionStore;

/// Decides whether a user may see or invoke a tool.
pub struct AuthorizationGate {
    /// Subscription persistence.
    subscriptions: Arc<dyn SubscriptionStore>,
}

impl AuthorizationGate {
    /// Create a gate backed by the given subscription store.
    pub fn new(subscriptions: Arc<dyn SubscriptionStore>) -> Self {
        Self { subscriptions }
    }

    /// The subset of `tools` the user may see, preserving input order.
    pub async fn filter_visible(
        &self,
        user_id: &str,
        tools: Vec<ToolDefinition>,
    ) -> McpServerResult<Vec<ToolDefinition>> {
        let allowed: HashSet<String> = self
            .subscriptions
            .list_for_user(user_id)
            .await?
            .into_iter()
            .filter(|row| row.authorized)
            .map(|row| row.tool_name)
            .collect();

        let visible: Vec<ToolDefinition> = tools
            .into_iter()
            .filter(|tool| allowed.contains(&tool.name))
            .collect();
        debug!(user_id, count = visible.len(), "filtered visible tools");
        Ok(visible)
    }

    /// Whether the user may invoke the named tool.
    pub async fn authorize(&self, user_id: &str, tool_name: &str) -> McpServerResult<bool> {
        let row = self.subscriptions.get(user_id, tool_name).await?;
        Ok(row.map(|subscription| subscription.authorized).unwrap_or(false))
    }

    /// Uniform denial payload for an unauthorized call.
    pub fn denial(tool_name: &str) -> ToolResult {
        ToolResult::error(format!(
            "❌ Access denied: you are not subscribed to '{tool_name}'. \
             Enable it from your Valet dashboard and try again."
        ))
    }
}
