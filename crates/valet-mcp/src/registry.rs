//! Tool capability registry.
//!
//! Built once at startup from the explicit registration table in
//! [`crate::tools::all_tools`] and read-only afterwards. Registration
//! order is preserved for `tools/list`; registering a name twice replaces
//! the earlier handler (last registration wins) and logs a warning.

use crate::server::Tool;
use crate::types::ToolDefinition;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::warn;

/// Registry mapping tool names to their handlers.
#[derive(Default)]
pub struct ToolRegistry {
    /// Names in registration order.
    order: Vec<String>,

    /// Handlers by name.
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool under its definition name.
    ///
    /// A repeated name replaces the earlier registration and keeps its
    /// original position in the listing order.
    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        let name = tool.definition().name;
        if self.tools.insert(name.clone(), tool).is_some() {
            warn!(tool = %name, "duplicate tool registration, last one wins");
        } else {
            self.order.push(name);
        }
    }

    /// Register multiple tools.
    pub fn register_all(&mut self, tools: Vec<Arc<dyn Tool>>) {
        for tool in tools {
            self.register(tool);
        }
    }

    /// Look up a handler by name.
    pub fn lookup(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    /// All tool definitions in registration order.
    pub fn list(&self) -> Vec<ToolDefinition> {
        self.order
            .iter()
            .filter_map(|name| self.tools.get(name))
            .map(|tool| tool.definition())
            .collect()
    }

    /// Number of registered tools.
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// True when no tools are registered.
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}
