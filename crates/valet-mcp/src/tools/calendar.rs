//! Calendar event tool.

use crate::clients::{CalendarClient, NewEvent};
use crate::server::{McpServerError, McpServerResult, Tool, ToolContext};
use crate::types::{ToolDefinition, ToolResult};
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use tracing::error;
use valet_auth::{call_with_reauth, ProviderCallError, TokenLifecycle};

/// Tool name, also the credential key in the token lifecycle.
pub const CALENDAR_CREATE_TOOL: &str = "calendar_create_event";

#[derive(Debug, Deserialize)]
struct CreateEventParams {
    summary: String,
    #[serde(default)]
    description: Option<String>,
    start_time: String,
    end_time: String,
    #[serde(default)]
    attendees: Vec<String>,
}

/// Tool creating an event on the user's primary calendar.
pub struct CalendarCreateTool {
    lifecycle: Arc<TokenLifecycle>,
    client: CalendarClient,
}

impl CalendarCreateTool {
    /// Create the tool around a token lifecycle and calendar client.
    pub fn new(lifecycle: Arc<TokenLifecycle>, client: CalendarClient) -> Self {
        Self { lifecycle, client }
    }
}

#[async_trait]
impl Tool for CalendarCreateTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new(
            CALENDAR_CREATE_TOOL,
            "Create an event on the user's primary calendar",
        )
        .with_schema(serde_json::json!({
            "type": "object",
            "properties": {
                "summary": {
                    "type": "string",
                    "description": "Event title"
                },
                "description": {
                    "type": "string",
                    "description": "Longer event description"
                },
                "start_time": {
                    "type": "string",
                    "description": "Start instant, RFC 3339"
                },
                "end_time": {
                    "type": "string",
                    "description": "End instant, RFC 3339"
                },
                "attendees": {
                    "type": "array",
                    "items": {"type": "string"},
                    "description": "Attendee email addresses"
                }
            },
            "required": ["summary", "start_time", "end_time"]
        }))
    }

    async fn execute(
        &self,
        args: serde_json::Value,
        context: &ToolContext,
    ) -> McpServerResult<ToolResult> {
        let params: CreateEventParams = serde_json::from_value(args)
            .map_err(|e| McpServerError::InvalidParams(e.to_string()))?;

        let event = NewEvent {
            summary: params.summary,
            description: params.description,
            start_time: params.start_time,
            end_time: params.end_time,
            attendees: params.attendees,
        };

        let outcome = call_with_reauth(
            &self.lifecycle,
            &context.user_id,
            CALENDAR_CREATE_TOOL,
            |token| {
                let client = self.client.clone();
                let event = event.clone();
                async move { client.create_event(&token, &event).await }
            },
        )
        .await;

        match outcome {
            Ok(created) => Ok(ToolResult::json(serde_json::json!({
                "status": created.status.unwrap_or_else(|| "confirmed".to_string()),
                "id": created.id,
                "link": created.html_link
            }))),
            Err(ProviderCallError::Auth(e)) => Ok(ToolResult::error(format!(
                "🔐 {e}. Please re-connect your Google account from the Valet dashboard."
            ))),
            Err(ProviderCallError::Provider(e)) => {
                error!("Failed to create event: {}", e);
                Ok(ToolResult::error(format!("Failed to create event: {e}")))
            }
        }
    }
}
