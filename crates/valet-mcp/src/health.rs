//! Health reporting for the Valet MCP server.
//!
//! The `/health` endpoint serves a liveness snapshot: overall status, the
//! number of registered tools, and the endpoint list.

use crate::server::McpServer;
use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Overall health status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    /// Server is serving tools.
    Ok,
    /// Server is up but has nothing registered.
    Degraded,
}

/// Liveness snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthReport {
    /// Overall status.
    pub status: HealthStatus,

    /// Timestamp of the check (ISO 8601).
    pub timestamp: String,

    /// Number of registered tools.
    pub tool_count: usize,

    /// Served endpoints.
    pub endpoints: Vec<String>,

    /// Server version.
    pub version: String,
}

impl HealthReport {
    /// Snapshot the server's current state.
    pub fn for_server(server: &McpServer) -> Self {
        let tool_count = server.tool_count();
        Self {
            status: if tool_count > 0 {
                HealthStatus::Ok
            } else {
                HealthStatus::Degraded
            },
            timestamp: Utc::now().to_rfc3339(),
            tool_count,
            endpoints: vec![
                "/mcp".to_string(),
                "/sse".to_string(),
                "/messages".to_string(),
                "/health".to_string(),
            ],
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}
