//! Tool trait and registry.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use super::{CmfTool, QueryKind, ToolError};
use crate::context::ServerContext;
use crate::dispatch::TargetResult;
use crate::protocol::McpToolDefinition;

/// A tool callable through `tools/call`.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Get the unique name of this tool.
    fn name(&self) -> &str;

    /// Get the tool definition including its input schema.
    fn definition(&self) -> McpToolDefinition;

    /// Run the tool and return one result per targeted connection.
    async fn call(&self, arguments: &Value, ctx: &ServerContext)
        -> Result<Vec<TargetResult>, ToolError>;

    /// Validate the arguments before the call.
    ///
    /// Default implementation does no validation.
    fn validate(&self, _arguments: &Value) -> Result<(), ToolError> {
        Ok(())
    }
}

/// Registry of available tools, kept in registration order.
#[derive(Default)]
pub struct ToolRegistry {
    tools: Vec<Arc<dyn Tool>>,
}

impl ToolRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self { tools: Vec::new() }
    }

    /// Registry holding one tool per CMF query.
    pub fn with_cmf_tools() -> Self {
        let mut registry = Self::new();
        for kind in QueryKind::ALL {
            registry.register(Arc::new(CmfTool::new(kind)));
        }
        registry
    }

    /// Register a tool, replacing any tool of the same name in place.
    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        match self.tools.iter_mut().find(|t| t.name() == tool.name()) {
            Some(existing) => *existing = tool,
            None => self.tools.push(tool),
        }
    }

    /// Get a tool by name.
    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.iter().find(|t| t.name() == name).cloned()
    }

    /// List all tool names.
    pub fn list(&self) -> Vec<&str> {
        self.tools.iter().map(|t| t.name()).collect()
    }

    /// Get all tool definitions.
    pub fn definitions(&self) -> Vec<McpToolDefinition> {
        self.tools.iter().map(|t| t.definition()).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Look up, validate and run a tool.
    pub async fn call(
        &self,
        name: &str,
        arguments: &Value,
        ctx: &ServerContext,
    ) -> Result<Vec<TargetResult>, ToolError> {
        let tool = self
            .get(name)
            .ok_or_else(|| ToolError::NotFound(name.to_string()))?;

        tool.validate(arguments)?;
        tool.call(arguments, ctx).await
    }
}
