//! Analytics reporting tool.

use crate::clients::{AnalyticsClient, ReportRequest};
use crate::server::{McpServerError, McpServerResult, Tool, ToolContext};
use crate::types::{ToolDefinition, ToolResult};
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use tracing::error;
use valet_auth::{call_with_reauth, ProviderCallError, TokenLifecycle};

/// Tool name, also the credential key in the token lifecycle.
pub const ANALYTICS_REPORT_TOOL: &str = "analytics_run_report";

#[derive(Debug, Deserialize)]
struct RunReportParams {
    property_id: String,
    start_date: String,
    end_date: String,
    metrics: Vec<String>,
    #[serde(default)]
    dimensions: Vec<String>,
}

/// Tool running a metrics report against the user's analytics property.
pub struct AnalyticsReportTool {
    lifecycle: Arc<TokenLifecycle>,
    client: AnalyticsClient,
}

impl AnalyticsReportTool {
    /// Create the tool around a token lifecycle and analytics client.
    pub fn new(lifecycle: Arc<TokenLifecycle>, client: AnalyticsClient) -> Self {
        Self { lifecycle, client }
    }
}

#[async_trait]
impl Tool for AnalyticsReportTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new(
            ANALYTICS_REPORT_TOOL,
            "Run a metrics report against the user's analytics property",
        )
        .with_schema(serde_json::json!({
            "type": "object",
            "properties": {
                "property_id": {
                    "type": "string",
                    "description": "Analytics property to query"
                },
                "start_date": {
                    "type": "string",
                    "description": "Start of the date range, YYYY-MM-DD"
                },
                "end_date": {
                    "type": "string",
                    "description": "End of the date range, YYYY-MM-DD"
                },
                "metrics": {
                    "type": "array",
                    "items": {"type": "string"},
                    "description": "Metric names, e.g. activeUsers"
                },
                "dimensions": {
                    "type": "array",
                    "items": {"type": "string"},
                    "description": "Dimension names, e.g. country"
                }
            },
            "required": ["property_id", "start_date", "end_date", "metrics"]
        }))
        .with_output_schema(serde_json::json!({
            "type": "object",
            "properties": {
                "row_count": {"type": "integer"},
                "rows": {"type": "array"}
            }
        }))
    }

    async fn execute(
        &self,
        args: serde_json::Value,
        context: &ToolContext,
    ) -> McpServerResult<ToolResult> {
        let params: RunReportParams = serde_json::from_value(args)
            .map_err(|e| McpServerError::InvalidParams(e.to_string()))?;

        let request = ReportRequest {
            property_id: params.property_id,
            start_date: params.start_date,
            end_date: params.end_date,
            metrics: params.metrics,
            dimensions: params.dimensions,
        };

        let outcome = call_with_reauth(
            &self.lifecycle,
            &context.user_id,
            ANALYTICS_REPORT_TOOL,
            |token| {
                let client = self.client.clone();
                let request = request.clone();
                async move { client.run_report(&token, &request).await }
            },
        )
        .await;

        match outcome {
            Ok(report) => Ok(ToolResult::json(serde_json::json!({
                "row_count": report.row_count,
                "rows": report.rows
            }))),
            Err(ProviderCallError::Auth(e)) => Ok(ToolResult::error(format!(
                "🔐 {e}. Please re-connect your analytics account from the Valet dashboard."
            ))),
            Err(ProviderCallError::Provider(e)) => {
                error!("Failed to run report: {}", e);
                Ok(ToolResult::error(format!("Failed to run report: {e}")))
            }
        }
    }
}
