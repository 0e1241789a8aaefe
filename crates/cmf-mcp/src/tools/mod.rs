//! Tools exposed over MCP.
//!
//! A [`Tool`] turns JSON arguments into a fan-out over the CMF connections;
//! [`ToolRegistry`] holds the tools in the order `tools/list` reports them.

mod cmf;
mod registry;

pub use cmf::{CmfTool, QueryKind};
pub use registry::{Tool, ToolRegistry};

use thiserror::Error;

/// Errors raised before a tool reaches any CMF connection.
#[derive(Debug, Error)]
pub enum ToolError {
    /// Tool was not found in the registry.
    #[error("tool not found: {0}")]
    NotFound(String),

    /// Invalid arguments provided to the tool.
    #[error("invalid arguments: {0}")]
    InvalidArguments(String),

    /// Required parameter is missing.
    #[error("missing required parameter: {0}")]
    MissingParameter(String),

    /// Parameter has wrong type.
    #[error("parameter '{0}' has wrong type: expected {1}")]
    WrongType(String, String),
}

impl ToolError {
    pub fn invalid_args(msg: impl Into<String>) -> Self {
        Self::InvalidArguments(msg.into())
    }

    pub fn missing_param(name: impl Into<String>) -> Self {
        Self::MissingParameter(name.into())
    }

    pub fn wrong_type(param: impl Into<String>, expected: impl Into<String>) -> Self {
        Self::WrongType(param.into(), expected.into())
    }
}
