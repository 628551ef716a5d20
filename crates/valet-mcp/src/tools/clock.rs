//! Clock tool.

use crate::server::{McpServerResult, Tool, ToolContext};
use crate::types::{ToolDefinition, ToolResult};
use async_trait::async_trait;
use chrono::Utc;

/// Tool returning the current UTC time.
pub struct GetTimeTool;

#[async_trait]
impl Tool for GetTimeTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new("get_time", "Get the current UTC time as an RFC 3339 timestamp")
    }

    async fn execute(
        &self,
        _args: serde_json::Value,
        _context: &ToolContext,
    ) -> McpServerResult<ToolResult> {
        Ok(ToolResult::text(Utc::now().to_rfc3339()))
    }
}
