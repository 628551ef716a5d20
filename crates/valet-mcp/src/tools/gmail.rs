//! Email sending tool.
//!
//! Provider-backed: the call runs with a fresh access token from the
//! token lifecycle, and a token rejected by the provider triggers exactly
//! one refresh and one retry.

use crate::clients::{GmailClient, OutgoingMessage};
use crate::server::{McpServerError, McpServerResult, Tool, ToolContext};
use crate::types::{ToolDefinition, ToolResult};
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use tracing::error;
use valet_auth::{call_with_reauth, ProviderCallError, TokenLifecycle};

/// Tool name, also the credential key in the token lifecycle.
pub const GMAIL_SEND_TOOL: &str = "gmail_send_email";

#[derive(Debug, Deserialize)]
struct SendEmailParams {
    to: String,
    subject: String,
    body: String,
}

/// Tool sending email as the calling user.
pub struct GmailSendTool {
    lifecycle: Arc<TokenLifecycle>,
    client: GmailClient,
}

impl GmailSendTool {
    /// Create the tool around a token lifecycle and Gmail client.
    pub fn new(lifecycle: Arc<TokenLifecycle>, client: GmailClient) -> Self {
        Self { lifecycle, client }
    }
}

#[async_trait]
impl Tool for GmailSendTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new(GMAIL_SEND_TOOL, "Send an email from the user's Gmail account")
            .with_schema(serde_json::json!({
                "type": "object",
                "properties": {
                    "to": {
                        "type": "string",
                        "description": "Recipient email address"
                    },
                    "subject": {
                        "type": "string",
                        "description": "Subject line"
                    },
                    "body": {
                        "type": "string",
                        "description": "Plain-text message body"
                    }
                },
                "required": ["to", "subject", "body"]
            }))
    }

    async fn execute(
        &self,
        args: serde_json::Value,
        context: &ToolContext,
    ) -> McpServerResult<ToolResult> {
        let params: SendEmailParams = serde_json::from_value(args)
            .map_err(|e| McpServerError::InvalidParams(e.to_string()))?;

        let message = OutgoingMessage {
            to: params.to,
            subject: params.subject,
            body: params.body,
        };

        let outcome = call_with_reauth(
            &self.lifecycle,
            &context.user_id,
            GMAIL_SEND_TOOL,
            |token| {
                let client = self.client.clone();
                let message = message.clone();
                async move { client.send_message(&token, &message).await }
            },
        )
        .await;

        match outcome {
            Ok(sent) => Ok(ToolResult::json(serde_json::json!({
                "status": "sent",
                "id": sent.id,
                "thread_id": sent.thread_id
            }))),
            Err(ProviderCallError::Auth(e)) => Ok(ToolResult::error(format!(
                "🔐 {e}. Please re-connect your Google account from the Valet dashboard."
            ))),
            Err(ProviderCallError::Provider(e)) => {
                error!("Failed to send email: {}", e);
                Ok(ToolResult::error(format!("Failed to send email: {e}")))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::ServiceEndpoint;
    use std::time::Duration;
    use valet_auth::HttpTokenRefresher;
    use valet_store::InMemoryCredentialStore;

    fn tool() -> GmailSendTool {
        let lifecycle = TokenLifecycle::new(
            Arc::new(InMemoryCredentialStore::new()),
            Arc::new(HttpTokenRefresher::new(Duration::from_secs(5))),
        );
        GmailSendTool::new(
            Arc::new(lifecycle),
            GmailClient::new(
                ServiceEndpoint {
                    base_url: "http://localhost".to_string(),
                    api_key: None,
                },
                Duration::from_secs(5),
            ),
        )
    }

    #[test]
    fn test_definition() {
        let definition = tool().definition();
        assert_eq!(definition.name, GMAIL_SEND_TOOL);
        assert_eq!(
            definition.input_schema["required"],
            serde_json::json!(["to", "subject", "body"])
        );
    }

    #[tokio::test]
    async fn test_missing_credential_is_a_tool_error() {
        let result = tool()
            .execute(
                serde_json::json!({"to": "a@b.c", "subject": "hi", "body": "text"}),
                &ToolContext::new("u1"),
            )
            .await
            .unwrap();

        assert!(result.is_error);
        assert!(result.first_text().unwrap().contains("re-connect"));
    }
}
