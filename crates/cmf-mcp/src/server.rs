//! MCP server: JSON-RPC request handling and the stdio serve loop.

use std::sync::Arc;

use cmf_core::{Config, Result as CoreResult};
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::context::ServerContext;
use crate::error::{McpError, TransportError};
use crate::protocol::{
    methods, negotiate_protocol_version, CallToolParams, CallToolResult, Implementation,
    InitializeParams, InitializeResult, JsonRpcError, JsonRpcNotification, JsonRpcRequest,
    JsonRpcResponse, ListToolsResult, RequestId, ServerCapabilities, ToolsCapability,
    MCP_PROTOCOL_VERSION,
};
use crate::tools::{ToolError, ToolRegistry};
use crate::transport::Transport;

/// Instructions sent to clients on `initialize`.
pub const SERVER_INSTRUCTIONS: &str = "You are a helpful assistant that can help with Common \
Metadata Framework (CMF) server tasks. You can show pipelines, artifacts, executions, and more \
on a Common Metadata Framework (CMF) server";

/// MCP server exposing CMF tools.
pub struct McpServer {
    info: Implementation,
    instructions: String,
    tools: ToolRegistry,
    context: Arc<ServerContext>,
}

impl McpServer {
    /// Server named `name` with the CMF tools registered.
    pub fn new(name: impl Into<String>, context: Arc<ServerContext>) -> Self {
        Self::with_tools(name, context, ToolRegistry::with_cmf_tools())
    }

    pub fn with_tools(
        name: impl Into<String>,
        context: Arc<ServerContext>,
        tools: ToolRegistry,
    ) -> Self {
        Self {
            info: Implementation::server(name),
            instructions: SERVER_INSTRUCTIONS.to_string(),
            tools,
            context,
        }
    }

    /// Build the connection registry and server from configuration.
    pub fn from_config(config: &Config) -> CoreResult<Self> {
        let context = ServerContext::from_config(config)?;
        Ok(Self::new(config.server.name.clone(), context))
    }

    pub fn info(&self) -> &Implementation {
        &self.info
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    pub fn context(&self) -> &Arc<ServerContext> {
        &self.context
    }

    /// Handle one raw JSON-RPC message.
    ///
    /// Returns the serialized response, or `None` for notifications.
    pub async fn handle_line(&self, line: &str) -> Option<String> {
        let response = match serde_json::from_str::<Value>(line) {
            Ok(message) => self.handle_message(message).await?,
            Err(e) => {
                warn!(error = %e, "Invalid JSON-RPC message");
                JsonRpcResponse::error(None, JsonRpcError::parse_error("Invalid JSON"))
            }
        };
        Some(encode_response(&response))
    }

    /// Handle one decoded JSON-RPC message.
    pub async fn handle_message(&self, message: Value) -> Option<JsonRpcResponse> {
        let is_request = message.get("id").is_some_and(|id| !id.is_null());

        if is_request {
            let id = message
                .get("id")
                .and_then(|id| serde_json::from_value::<RequestId>(id.clone()).ok());
            return Some(match serde_json::from_value::<JsonRpcRequest>(message) {
                Ok(request) => self.handle_request(request).await,
                Err(e) => JsonRpcResponse::error(
                    id,
                    JsonRpcError::invalid_request(format!("Invalid request: {}", e)),
                ),
            });
        }

        match serde_json::from_value::<JsonRpcNotification>(message) {
            Ok(notification) => {
                self.handle_notification(notification).await;
                None
            }
            Err(e) => Some(JsonRpcResponse::error(
                None,
                JsonRpcError::invalid_request(format!("Invalid request: {}", e)),
            )),
        }
    }

    /// Handle a JSON-RPC request.
    pub async fn handle_request(&self, request: JsonRpcRequest) -> JsonRpcResponse {
        debug!(method = %request.method, id = %request.id, "Handling request");

        let result = match request.method.as_str() {
            methods::INITIALIZE => self.handle_initialize(request.params),
            methods::PING => Ok(json!({})),
            methods::TOOLS_LIST => self.handle_list_tools(),
            methods::TOOLS_CALL => self.handle_call_tool(request.params).await,
            _ => Err(JsonRpcError::method_not_found(&request.method)),
        };

        match result {
            Ok(value) => JsonRpcResponse::success(request.id, value),
            Err(error) => JsonRpcResponse::error(Some(request.id), error),
        }
    }

    /// Handle a JSON-RPC notification.
    pub async fn handle_notification(&self, notification: JsonRpcNotification) {
        match notification.method.as_str() {
            methods::INITIALIZED => info!("Client initialized"),
            methods::CANCELLED => debug!(params = ?notification.params, "Request cancelled"),
            other => debug!(method = other, "Ignoring notification"),
        }
    }

    fn handle_initialize(&self, params: Option<Value>) -> Result<Value, JsonRpcError> {
        let init_params: Option<InitializeParams> = params
            .filter(|p| !p.is_null())
            .map(serde_json::from_value)
            .transpose()
            .map_err(|e| JsonRpcError::invalid_params(format!("Invalid params: {}", e)))?;

        let protocol_version = match &init_params {
            Some(p) => {
                info!(
                    client = %p.client_info.name,
                    version = %p.client_info.version,
                    protocol = %p.protocol_version,
                    "Client connected"
                );
                negotiate_protocol_version(&p.protocol_version)
            }
            None => MCP_PROTOCOL_VERSION,
        };

        let result = InitializeResult {
            protocol_version: protocol_version.to_string(),
            capabilities: ServerCapabilities {
                tools: Some(ToolsCapability {
                    list_changed: false,
                }),
            },
            server_info: self.info.clone(),
            instructions: Some(self.instructions.clone()),
        };
        serde_json::to_value(result).map_err(|e| JsonRpcError::internal_error(e.to_string()))
    }

    fn handle_list_tools(&self) -> Result<Value, JsonRpcError> {
        let result = ListToolsResult {
            tools: self.tools.definitions(),
            next_cursor: None,
        };
        serde_json::to_value(result).map_err(|e| JsonRpcError::internal_error(e.to_string()))
    }

    async fn handle_call_tool(&self, params: Option<Value>) -> Result<Value, JsonRpcError> {
        let call_params: CallToolParams = params
            .ok_or_else(|| JsonRpcError::invalid_params("Missing params"))
            .and_then(|p| {
                serde_json::from_value(p)
                    .map_err(|e| JsonRpcError::invalid_params(format!("Invalid params: {}", e)))
            })?;

        let arguments = call_params.arguments.unwrap_or_else(|| json!({}));
        debug!(tool = %call_params.name, "Calling tool");

        let result = match self
            .tools
            .call(&call_params.name, &arguments, &self.context)
            .await
        {
            Ok(results) => {
                let failed = results.iter().filter(|r| !r.is_success()).count();
                info!(
                    tool = %call_params.name,
                    targets = results.len(),
                    failed,
                    "Tool call completed"
                );
                let value = serde_json::to_value(&results)
                    .map_err(|e| JsonRpcError::internal_error(e.to_string()))?;
                CallToolResult::json(value)
            }
            Err(ToolError::NotFound(name)) => {
                return Err(JsonRpcError::invalid_params(format!("Unknown tool: {}", name)));
            }
            Err(e) => {
                warn!(tool = %call_params.name, error = %e, "Tool call rejected");
                CallToolResult::error(e.to_string())
            }
        };

        serde_json::to_value(result).map_err(|e| JsonRpcError::internal_error(e.to_string()))
    }

    /// Serve requests from `transport` until the peer disconnects or `cancel`
    /// fires.
    pub async fn serve<T: Transport>(
        &self,
        transport: &mut T,
        cancel: CancellationToken,
    ) -> Result<(), McpError> {
        info!(server = %self.info.name, "MCP server listening");

        loop {
            let line = tokio::select! {
                _ = cancel.cancelled() => {
                    debug!("Serve loop cancelled");
                    break;
                }
                received = transport.receive() => match received {
                    Ok(line) => line,
                    Err(TransportError::ConnectionClosed) => {
                        debug!("EOF received, shutting down");
                        break;
                    }
                    Err(e) => return Err(e.into()),
                },
            };

            if let Some(response) = self.handle_line(&line).await {
                transport.send(&response).await?;
            }
        }

        transport.close().await?;
        info!("MCP server stopped");
        Ok(())
    }
}

/// Serialize a response, degrading to an internal error if that fails.
fn encode_response(response: &JsonRpcResponse) -> String {
    serde_json::to_string(response).unwrap_or_else(|e| {
        json!({
            "jsonrpc": "2.0",
            "id": response.id,
            "error": {"code": JsonRpcError::INTERNAL_ERROR, "message": e.to_string()}
        })
        .to_string()
    })
}
