//! MCP server implementation.
//!
//! This module provides the JSON-RPC dispatcher at the heart of Valet:
//! envelope validation, request/notification classification, method
//! routing, and the per-call authorization check. The server is stateless
//! between requests; the registry and the gate are built once at startup
//! and only read afterwards.

use crate::authz::AuthorizationGate;
use crate::registry::ToolRegistry;
use crate::types::*;
use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, error, info};

/// MCP protocol revision advertised by `initialize`.
pub const PROTOCOL_VERSION: &str = "2024-11-05";

/// MCP server error types.
#[derive(Debug, Error)]
pub enum McpServerError {
    /// Invalid parameters
    #[error("Invalid parameters: {0}")]
    InvalidParams(String),

    /// Transport failure
    #[error("Transport error: {0}")]
    Transport(String),

    /// Storage failure
    #[error(transparent)]
    Store(#[from] valet_store::StoreError),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type for MCP server operations.
pub type McpServerResult<T> = Result<T, McpServerError>;

/// Trait for tool implementations.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Get the tool definition.
    fn definition(&self) -> ToolDefinition;

    /// Execute the tool with given arguments.
    async fn execute(&self, args: Value, context: &ToolContext) -> McpServerResult<ToolResult>;
}

/// Context for tool execution.
#[derive(Debug, Clone)]
pub struct ToolContext {
    /// User the call executes on behalf of.
    pub user_id: String,
}

impl ToolContext {
    /// Create a context for a user.
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
        }
    }
}

/// Valet MCP server.
///
/// Owns the tool registry and authorization gate and dispatches inbound
/// JSON-RPC envelopes to them.
pub struct McpServer {
    /// Server info
    info: ServerInfo,

    /// Server capabilities
    capabilities: ServerCapabilities,

    /// Registered tools
    registry: ToolRegistry,

    /// Per-user access decisions
    gate: AuthorizationGate,
}

impl McpServer {
    /// Create a new MCP server.
    pub fn new(
        name: impl Into<String>,
        version: impl Into<String>,
        registry: ToolRegistry,
        gate: AuthorizationGate,
    ) -> Self {
        Self {
            info: ServerInfo {
                name: name.into(),
                version: version.into(),
            },
            capabilities: ServerCapabilities {
                tools: Some(ToolCapabilities { list_changed: false }),
            },
            registry,
            gate,
        }
    }

    /// Get server info.
    pub fn info(&self) -> &ServerInfo {
        &self.info
    }

    /// Get server capabilities.
    pub fn capabilities(&self) -> &ServerCapabilities {
        &self.capabilities
    }

    /// Number of registered tools.
    pub fn tool_count(&self) -> usize {
        self.registry.len()
    }

    /// Handle a raw request body.
    ///
    /// Returns `None` for notifications, which produce no response body.
    pub async fn handle_payload(&self, body: &[u8], user_id: Option<&str>) -> Option<McpResponse> {
        let value: Value = match serde_json::from_slice(body) {
            Ok(value) => value,
            Err(_) => {
                return Some(McpResponse::error(RequestId::Null, McpError::parse_error()))
            }
        };
        if !value.is_object() {
            return Some(McpResponse::error(RequestId::Null, McpError::parse_error()));
        }

        let envelope: RpcEnvelope = match serde_json::from_value(value) {
            Ok(envelope) => envelope,
            Err(e) => {
                return Some(McpResponse::error(
                    RequestId::Null,
                    McpError::invalid_request(e.to_string()),
                ))
            }
        };

        self.handle_envelope(envelope, user_id).await
    }

    /// Handle a classified envelope.
    pub async fn handle_envelope(
        &self,
        envelope: RpcEnvelope,
        user_id: Option<&str>,
    ) -> Option<McpResponse> {
        if envelope.jsonrpc.as_deref() != Some("2.0") {
            return Some(McpResponse::error(
                envelope.id.unwrap_or(RequestId::Null),
                McpError::invalid_request("missing or unsupported jsonrpc version"),
            ));
        }

        match (envelope.method, envelope.id) {
            (Some(method), Some(id)) => {
                Some(self.dispatch(&method, id, envelope.params, user_id).await)
            }
            (Some(method), None) => {
                self.handle_notification(&method);
                None
            }
            (None, id) => Some(McpResponse::error(
                id.unwrap_or(RequestId::Null),
                McpError::invalid_request("method is required"),
            )),
        }
    }

    /// Acknowledge a notification. No response body is produced.
    fn handle_notification(&self, method: &str) {
        match method {
            "notifications/cancelled" => info!(method, "request cancelled by client"),
            _ => debug!(method, "notification acknowledged"),
        }
    }

    async fn dispatch(
        &self,
        method: &str,
        id: RequestId,
        params: Option<Value>,
        user_id: Option<&str>,
    ) -> McpResponse {
        debug!(method, "dispatching request");
        match method {
            "initialize" => self.handle_initialize(id),
            "tools/list" => self.handle_tools_list(id, user_id).await,
            "tools/call" => self.handle_tools_call(id, params, user_id).await,
            other => McpResponse::error(id, McpError::method_not_found(other)),
        }
    }

    fn handle_initialize(&self, id: RequestId) -> McpResponse {
        McpResponse::success(
            id,
            serde_json::json!({
                "protocolVersion": PROTOCOL_VERSION,
                "capabilities": self.capabilities,
                "serverInfo": self.info
            }),
        )
    }

    async fn handle_tools_list(&self, id: RequestId, user_id: Option<&str>) -> McpResponse {
        let Some(user_id) = user_id else {
            return McpResponse::error(id, McpError::invalid_params("userId is required"));
        };

        match self.gate.filter_visible(user_id, self.registry.list()).await {
            Ok(tools) => McpResponse::success(id, serde_json::json!({ "tools": tools })),
            Err(e) => McpResponse::error(id, McpError::internal_error(e.to_string())),
        }
    }

    async fn handle_tools_call(
        &self,
        id: RequestId,
        params: Option<Value>,
        user_id: Option<&str>,
    ) -> McpResponse {
        let Some(params) = params else {
            return McpResponse::error(id, McpError::invalid_params("Missing params"));
        };
        let call: ToolCall = match serde_json::from_value(params) {
            Ok(call) => call,
            Err(e) => return McpResponse::error(id, McpError::invalid_params(e.to_string())),
        };
        let Some(user_id) = user_id else {
            return McpResponse::error(id, McpError::invalid_params("userId is required"));
        };

        // The authorization check runs before any handler lookup or
        // invocation; a denial is a successful JSON-RPC response.
        match self.gate.authorize(user_id, &call.name).await {
            Ok(true) => {}
            Ok(false) => {
                info!(user_id, tool = %call.name, "tool call denied");
                return tool_response(id, AuthorizationGate::denial(&call.name));
            }
            Err(e) => return McpResponse::error(id, McpError::internal_error(e.to_string())),
        }

        let Some(tool) = self.registry.lookup(&call.name) else {
            return tool_response(
                id,
                ToolResult::error(format!("Tool '{}' is not implemented", call.name)),
            );
        };

        let mut arguments = call.arguments;
        if let Some(object) = arguments.as_object_mut() {
            object.insert("userId".to_string(), Value::String(user_id.to_string()));
        }
        let context = ToolContext::new(user_id);

        match tool.execute(arguments, &context).await {
            Ok(result) => tool_response(id, result),
            Err(e) => {
                error!(tool = %call.name, error = %e, "tool execution failed");
                McpResponse::error(id, McpError::internal_error(e.to_string()))
            }
        }
    }
}

fn tool_response(id: RequestId, result: ToolResult) -> McpResponse {
    match serde_json::to_value(result) {
        Ok(value) => McpResponse::success(id, value),
        Err(e) => McpResponse::error(id, McpError::internal_error(e.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;
    use valet_store::{InMemorySubscriptionStore, SubscriptionStore, ToolSubscription};

    struct CountingTool {
        name: &'static str,
        calls: Arc<AtomicU32>,
    }

    #[async_trait]
    impl Tool for CountingTool {
        fn definition(&self) -> ToolDefinition {
            ToolDefinition::new(self.name, "test tool")
        }

        async fn execute(&self, args: Value, context: &ToolContext) -> McpServerResult<ToolResult> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let injected = args["userId"].as_str().unwrap_or_default().to_string();
            assert_eq!(injected, context.user_id);
            Ok(ToolResult::text(format!("ran for {injected}")))
        }
    }

    async fn server_with_subscriptions(
        subscriptions: Vec<ToolSubscription>,
        calls: Arc<AtomicU32>,
    ) -> McpServer {
        let store = Arc::new(InMemorySubscriptionStore::new());
        for row in subscriptions {
            store.upsert(row).await.unwrap();
        }

        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(CountingTool {
            name: "get_time",
            calls: calls.clone(),
        }));
        registry.register(Arc::new(CountingTool {
            name: "calculate",
            calls,
        }));

        McpServer::new("valet-mcp", "0.1.0", registry, AuthorizationGate::new(store))
    }

    fn request(method: &str, id: i64) -> RpcEnvelope {
        RpcEnvelope::request(id, method)
    }

    #[tokio::test]
    async fn test_initialize() {
        let server =
            server_with_subscriptions(vec![], Arc::new(AtomicU32::new(0))).await;

        let response = server
            .handle_envelope(request("initialize", 1), Some("u1"))
            .await
            .unwrap();

        let result = response.result.unwrap();
        assert_eq!(result["protocolVersion"], PROTOCOL_VERSION);
        assert_eq!(result["serverInfo"]["name"], "valet-mcp");
    }

    #[tokio::test]
    async fn test_tools_list_shows_only_subscribed_tools() {
        let server = server_with_subscriptions(
            vec![ToolSubscription::new("u1", "get_time")],
            Arc::new(AtomicU32::new(0)),
        )
        .await;

        let response = server
            .handle_envelope(request("tools/list", 2), Some("u1"))
            .await
            .unwrap();

        let tools = response.result.unwrap()["tools"].as_array().unwrap().clone();
        assert_eq!(tools.len(), 1);
        assert_eq!(tools[0]["name"], "get_time");
    }

    #[tokio::test]
    async fn test_tools_list_requires_user() {
        let server =
            server_with_subscriptions(vec![], Arc::new(AtomicU32::new(0))).await;

        let response = server
            .handle_envelope(request("tools/list", 3), None)
            .await
            .unwrap();

        assert_eq!(response.error.unwrap().code, McpError::INVALID_PARAMS);
    }

    #[tokio::test]
    async fn test_tools_call_executes_subscribed_tool() {
        let calls = Arc::new(AtomicU32::new(0));
        let server = server_with_subscriptions(
            vec![ToolSubscription::new("u1", "get_time")],
            calls.clone(),
        )
        .await;

        let envelope = request("tools/call", 7)
            .with_params(serde_json::json!({"name": "get_time", "arguments": {}}));
        let response = server.handle_envelope(envelope, Some("u1")).await.unwrap();

        assert_eq!(response.id, RequestId::Number(7));
        let result = response.result.unwrap();
        assert_eq!(result["content"][0]["text"], "ran for u1");
        assert!(result.get("isError").is_none());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_tools_call_denied_without_subscription() {
        let calls = Arc::new(AtomicU32::new(0));
        let server = server_with_subscriptions(vec![], calls.clone()).await;

        let envelope = request("tools/call", 7)
            .with_params(serde_json::json!({"name": "get_time", "arguments": {}}));
        let response = server.handle_envelope(envelope, Some("u1")).await.unwrap();

        // Denial is a successful JSON-RPC response carrying a tool error.
        assert!(response.error.is_none());
        let result = response.result.unwrap();
        assert_eq!(result["isError"], true);
        assert!(result["content"][0]["text"]
            .as_str()
            .unwrap()
            .contains("Access denied"));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_tools_call_unregistered_tool_is_reported() {
        let server = server_with_subscriptions(
            vec![ToolSubscription::new("u1", "mystery")],
            Arc::new(AtomicU32::new(0)),
        )
        .await;

        let envelope = request("tools/call", 4)
            .with_params(serde_json::json!({"name": "mystery", "arguments": {}}));
        let response = server.handle_envelope(envelope, Some("u1")).await.unwrap();

        let result = response.result.unwrap();
        assert_eq!(result["isError"], true);
        assert!(result["content"][0]["text"]
            .as_str()
            .unwrap()
            .contains("not implemented"));
    }

    #[tokio::test]
    async fn test_tools_call_missing_params() {
        let server =
            server_with_subscriptions(vec![], Arc::new(AtomicU32::new(0))).await;

        let response = server
            .handle_envelope(request("tools/call", 5), Some("u1"))
            .await
            .unwrap();

        assert_eq!(response.error.unwrap().code, McpError::INVALID_PARAMS);
    }

    #[tokio::test]
    async fn test_unknown_method_preserves_request_id() {
        let server =
            server_with_subscriptions(vec![], Arc::new(AtomicU32::new(0))).await;

        let response = server
            .handle_envelope(request("resources/list", 42), Some("u1"))
            .await
            .unwrap();

        assert_eq!(response.id, RequestId::Number(42));
        assert_eq!(response.error.unwrap().code, McpError::METHOD_NOT_FOUND);
    }

    #[tokio::test]
    async fn test_notification_produces_no_response() {
        let server =
            server_with_subscriptions(vec![], Arc::new(AtomicU32::new(0))).await;

        let response = server
            .handle_envelope(
                RpcEnvelope::notification("notifications/cancelled"),
                Some("u1"),
            )
            .await;

        assert!(response.is_none());
    }

    #[tokio::test]
    async fn test_unparseable_body_is_a_parse_error() {
        let server =
            server_with_subscriptions(vec![], Arc::new(AtomicU32::new(0))).await;

        let response = server.handle_payload(b"not json", Some("u1")).await.unwrap();
        assert_eq!(response.error.unwrap().code, McpError::PARSE_ERROR);

        let response = server.handle_payload(b"[1, 2]", Some("u1")).await.unwrap();
        assert_eq!(response.error.unwrap().code, McpError::PARSE_ERROR);
    }

    #[tokio::test]
    async fn test_empty_object_is_an_invalid_request() {
        let server =
            server_with_subscriptions(vec![], Arc::new(AtomicU32::new(0))).await;

        let response = server.handle_payload(b"{}", Some("u1")).await.unwrap();

        assert_eq!(response.id, RequestId::Null);
        assert_eq!(response.error.unwrap().code, McpError::INVALID_REQUEST);
    }

    #[tokio::test]
    async fn test_wrong_jsonrpc_version_is_rejected() {
        let server =
            server_with_subscriptions(vec![], Arc::new(AtomicU32::new(0))).await;

        let response = server
            .handle_payload(
                br#"{"jsonrpc": "1.0", "id": 1, "method": "initialize"}"#,
                Some("u1"),
            )
            .await
            .unwrap();

        assert_eq!(response.id, RequestId::Number(1));
        assert_eq!(response.error.unwrap().code, McpError::INVALID_REQUEST);
    }
}
