//! Artifact CRUD tools.
//!
//! Five tools over the user-scoped artifact store. No external provider
//! is involved; storage failures other than "not found" propagate to the
//! dispatcher as internal errors.

use crate::server::{McpServerError, McpServerResult, Tool, ToolContext};
use crate::types::{ToolDefinition, ToolResult};
use async_trait::async_trait;
use chrono::Utc;
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;
use valet_store::{Artifact, ArtifactStore, StoreError};

fn parse_id(raw: &str) -> Result<Uuid, ToolResult> {
    Uuid::parse_str(raw).map_err(|_| ToolResult::error(format!("Invalid artifact id '{raw}'")))
}

fn artifact_summary(artifact: &Artifact) -> serde_json::Value {
    serde_json::json!({
        "id": artifact.id,
        "title": artifact.title,
        "content_type": artifact.content_type,
        "created_at": artifact.created_at.to_rfc3339(),
        "updated_at": artifact.updated_at.to_rfc3339()
    })
}

#[derive(Debug, Deserialize)]
struct CreateParams {
    title: String,
    content: String,
    #[serde(default = "default_content_type")]
    content_type: String,
}

fn default_content_type() -> String {
    "text/markdown".to_string()
}

/// Tool creating a new artifact.
pub struct ArtifactCreateTool {
    store: Arc<dyn ArtifactStore>,
}

impl ArtifactCreateTool {
    /// Create the tool around an artifact store.
    pub fn new(store: Arc<dyn ArtifactStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for ArtifactCreateTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new("artifact_create", "Create a new artifact owned by the user")
            .with_schema(serde_json::json!({
                "type": "object",
                "properties": {
                    "title": {"type": "string"},
                    "content": {"type": "string"},
                    "content_type": {
                        "type": "string",
                        "description": "Content type, defaults to text/markdown"
                    }
                },
                "required": ["title", "content"]
            }))
    }

    async fn execute(
        &self,
        args: serde_json::Value,
        context: &ToolContext,
    ) -> McpServerResult<ToolResult> {
        let params: CreateParams = serde_json::from_value(args)
            .map_err(|e| McpServerError::InvalidParams(e.to_string()))?;

        let artifact = Artifact::new(
            &context.user_id,
            params.title,
            params.content,
            params.content_type,
        );
        let summary = artifact_summary(&artifact);
        self.store.insert(artifact).await?;

        Ok(ToolResult::json(summary))
    }
}

#[derive(Debug, Deserialize)]
struct IdParams {
    id: String,
}

/// Tool fetching one artifact with its content.
pub struct ArtifactGetTool {
    store: Arc<dyn ArtifactStore>,
}

impl ArtifactGetTool {
    /// Create the tool around an artifact store.
    pub fn new(store: Arc<dyn ArtifactStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for ArtifactGetTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new("artifact_get", "Fetch one of the user's artifacts by id")
            .with_schema(serde_json::json!({
                "type": "object",
                "properties": {
                    "id": {"type": "string"}
                },
                "required": ["id"]
            }))
    }

    async fn execute(
        &self,
        args: serde_json::Value,
        context: &ToolContext,
    ) -> McpServerResult<ToolResult> {
        let params: IdParams = serde_json::from_value(args)
            .map_err(|e| McpServerError::InvalidParams(e.to_string()))?;
        let id = match parse_id(&params.id) {
            Ok(id) => id,
            Err(result) => return Ok(result),
        };

        match self.store.get(&context.user_id, id).await? {
            Some(artifact) => {
                let mut value = artifact_summary(&artifact);
                value["content"] = serde_json::Value::String(artifact.content);
                Ok(ToolResult::json(value))
            }
            None => Ok(ToolResult::error(format!("Artifact {id} not found"))),
        }
    }
}

/// Tool listing the user's artifacts.
pub struct ArtifactListTool {
    store: Arc<dyn ArtifactStore>,
}

impl ArtifactListTool {
    /// Create the tool around an artifact store.
    pub fn new(store: Arc<dyn ArtifactStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for ArtifactListTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new("artifact_list", "List the user's artifacts, oldest first")
    }

    async fn execute(
        &self,
        _args: serde_json::Value,
        context: &ToolContext,
    ) -> McpServerResult<ToolResult> {
        let artifacts = self.store.list_for_user(&context.user_id).await?;
        let listed: Vec<serde_json::Value> = artifacts.iter().map(artifact_summary).collect();

        Ok(ToolResult::json(serde_json::json!({
            "count": listed.len(),
            "artifacts": listed
        })))
    }
}

#[derive(Debug, Deserialize)]
struct UpdateParams {
    id: String,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    content: Option<String>,
}

/// Tool updating an artifact's title and/or content.
pub struct ArtifactUpdateTool {
    store: Arc<dyn ArtifactStore>,
}

impl ArtifactUpdateTool {
    /// Create the tool around an artifact store.
    pub fn new(store: Arc<dyn ArtifactStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for ArtifactUpdateTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new(
            "artifact_update",
            "Update the title and/or content of one of the user's artifacts",
        )
        .with_schema(serde_json::json!({
            "type": "object",
            "properties": {
                "id": {"type": "string"},
                "title": {"type": "string"},
                "content": {"type": "string"}
            },
            "required": ["id"]
        }))
    }

    async fn execute(
        &self,
        args: serde_json::Value,
        context: &ToolContext,
    ) -> McpServerResult<ToolResult> {
        let params: UpdateParams = serde_json::from_value(args)
            .map_err(|e| McpServerError::InvalidParams(e.to_string()))?;
        let id = match parse_id(&params.id) {
            Ok(id) => id,
            Err(result) => return Ok(result),
        };

        let Some(mut artifact) = self.store.get(&context.user_id, id).await? else {
            return Ok(ToolResult::error(format!("Artifact {id} not found")));
        };

        if let Some(title) = params.title {
            artifact.title = title;
        }
        if let Some(content) = params.content {
            artifact.content = content;
        }
        artifact.updated_at = Utc::now();

        let summary = artifact_summary(&artifact);
        match self.store.update(artifact).await {
            Ok(()) => Ok(ToolResult::json(summary)),
            Err(StoreError::NotFound(_)) => {
                Ok(ToolResult::error(format!("Artifact {id} not found")))
            }
            Err(e) => Err(e.into()),
        }
    }
}

/// Tool deleting one of the user's artifacts.
pub struct ArtifactDeleteTool {
    store: Arc<dyn ArtifactStore>,
}

impl ArtifactDeleteTool {
    /// Create the tool around an artifact store.
    pub fn new(store: Arc<dyn ArtifactStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for ArtifactDeleteTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new("artifact_delete", "Delete one of the user's artifacts")
            .with_schema(serde_json::json!({
                "type": "object",
                "properties": {
                    "id": {"type": "string"}
                },
                "required": ["id"]
            }))
    }

    async fn execute(
        &self,
        args: serde_json::Value,
        context: &ToolContext,
    ) -> McpServerResult<ToolResult> {
        let params: IdParams = serde_json::from_value(args)
            .map_err(|e| McpServerError::InvalidParams(e.to_string()))?;
        let id = match parse_id(&params.id) {
            Ok(id) => id,
            Err(result) => return Ok(result),
        };

        match self.store.delete(&context.user_id, id).await {
            Ok(()) => Ok(ToolResult::text(format!("Artifact {id} deleted"))),
            Err(StoreError::NotFound(_)) => {
                Ok(ToolResult::error(format!("Artifact {id} not found")))
            }
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use valet_store::InMemoryArtifactStore;

    fn store() -> Arc<dyn ArtifactStore> {
        Arc::new(InMemoryArtifactStore::new())
    }

    fn extract_id(result: &ToolResult) -> String {
        let value: serde_json::Value =
            serde_json::from_str(result.first_text().unwrap()).unwrap();
        value["id"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn test_create_get_update_delete_flow() {
        let store = store();
        let context = ToolContext::new("u1");

        let created = ArtifactCreateTool::new(store.clone())
            .execute(
                serde_json::json!({"title": "Notes", "content": "hello"}),
                &context,
            )
            .await
            .unwrap();
        assert!(!created.is_error);
        let id = extract_id(&created);

        let fetched = ArtifactGetTool::new(store.clone())
            .execute(serde_json::json!({"id": id}), &context)
            .await
            .unwrap();
        let value: serde_json::Value =
            serde_json::from_str(fetched.first_text().unwrap()).unwrap();
        assert_eq!(value["content"], "hello");
        assert_eq!(value["content_type"], "text/markdown");

        let updated = ArtifactUpdateTool::new(store.clone())
            .execute(
                serde_json::json!({"id": id, "content": "revised"}),
                &context,
            )
            .await
            .unwrap();
        assert!(!updated.is_error);

        let listed = ArtifactListTool::new(store.clone())
            .execute(serde_json::json!({}), &context)
            .await
            .unwrap();
        let value: serde_json::Value =
            serde_json::from_str(listed.first_text().unwrap()).unwrap();
        assert_eq!(value["count"], 1);

        let deleted = ArtifactDeleteTool::new(store.clone())
            .execute(serde_json::json!({"id": id}), &context)
            .await
            .unwrap();
        assert!(!deleted.is_error);

        let missing = ArtifactGetTool::new(store)
            .execute(serde_json::json!({"id": id}), &context)
            .await
            .unwrap();
        assert!(missing.is_error);
    }

    #[tokio::test]
    async fn test_artifacts_are_user_scoped() {
        let store = store();

        let created = ArtifactCreateTool::new(store.clone())
            .execute(
                serde_json::json!({"title": "Private", "content": "secret"}),
                &ToolContext::new("u1"),
            )
            .await
            .unwrap();
        let id = extract_id(&created);

        let other_user = ArtifactGetTool::new(store)
            .execute(serde_json::json!({"id": id}), &ToolContext::new("u2"))
            .await
            .unwrap();
        assert!(other_user.is_error);
    }

    #[tokio::test]
    async fn test_invalid_id_is_a_tool_error() {
        let result = ArtifactGetTool::new(store())
            .execute(
                serde_json::json!({"id": "not-a-uuid"}),
                &ToolContext::new("u1"),
            )
            .await
            .unwrap();

        assert!(result.is_error);
        assert!(result.first_text().unwrap().contains("Invalid artifact id"));
    }
}
