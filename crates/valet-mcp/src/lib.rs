//! # Valet MCP
//!
//! This crate provides the Valet MCP (Model Context Protocol) server: a
//! JSON-RPC dispatch layer that exposes assistant tools over HTTP and
//! Server-Sent Events, gated per user by subscription records.
//!
//! ## Overview
//!
//! The valet-mcp crate handles:
//! - **JSON-RPC**: envelope validation, request/notification
//!   classification, and method routing
//! - **Tools**: the registry and all built-in tool implementations
//! - **Authorization**: per-user tool visibility and execution checks
//! - **Clients**: HTTP clients for the external providers tools call
//! - **Transport**: the axum HTTP/SSE surface and the `valet-server`
//!   binary
//!
//! ## Supported methods
//!
//! - `initialize`: protocol/version handshake
//! - `tools/list`: tools visible to the calling user
//! - `tools/call`: execute a tool on the user's behalf
//!
//! Notifications (envelopes without an id) are acknowledged without a
//! response body. Unknown methods, malformed envelopes, and bad
//! parameters map to the standard JSON-RPC error codes.
//!
//! ## Available tools
//!
//! ### Utility
//! - `get_time`: current UTC timestamp
//! - `calculate`: arithmetic expression evaluation
//! - `get_weather`: current conditions for a coordinate
//!
//! ### Workspace (OAuth-backed)
//! - `gmail_send_email`: send mail as the user
//! - `calendar_create_event`: create a calendar event
//!
//! ### Analytics (OAuth-backed)
//! - `analytics_run_report`: run a metrics report
//!
//! ### Rides (OAuth-backed)
//! - `ride_price_estimate`, `ride_request`: trip pricing and booking
//!
//! ### Artifacts
//! - `artifact_create` / `artifact_get` / `artifact_list` /
//!   `artifact_update` / `artifact_delete`: user-scoped document CRUD
//!
//! OAuth-backed tools run through [`valet_auth::TokenLifecycle`]: stale
//! access tokens are refreshed before the provider call, and a token the
//! provider rejects triggers exactly one refresh and one retry.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use valet_mcp::{AuthorizationGate, McpServer, ToolRegistry};
//! use valet_store::InMemorySubscriptionStore;
//!
//! async fn handle(json: &[u8]) {
//!     let registry = ToolRegistry::new();
//!     let gate = AuthorizationGate::new(Arc::new(InMemorySubscriptionStore::new()));
//!     let server = McpServer::new("valet-mcp", "0.1.0", registry, gate);
//!
//!     if let Some(response) = server.handle_payload(json, Some("u1")).await {
//!         println!("{}", serde_json::to_string(&response).unwrap());
//!     }
//! }
//! ```

pub mod authz;
pub mod clients;
pub mod health;
pub mod registry;
pub mod server;
pub mod tools;
pub mod transport;
pub mod types;

// Re-export main types
pub use authz::AuthorizationGate;
pub use health::{HealthReport, HealthStatus};
pub use registry::ToolRegistry;
pub use server::{
    McpServer, McpServerError, McpServerResult, Tool, ToolContext, PROTOCOL_VERSION,
};
pub use types::{
    ContentBlock, McpError, McpResponse, RequestId, RpcEnvelope, ServerCapabilities, ServerInfo,
    ToolCall, ToolCapabilities, ToolDefinition, ToolResult,
};

// Re-export tool collections
pub use tools::{all_tools, ToolDependencies};

// Re-export service clients
pub use clients::ServiceConfig;
