//! MCP server for CMF (Common Metadata Framework).
//!
//! Exposes CMF queries as MCP tools. Every tool call is fanned out to the
//! configured CMF servers (or a caller-chosen subset) and answered with one
//! record per server, so one unreachable server never hides the others:
//!
//! ```json
//! [
//!   {"cmfClient": "http://h1", "data": [{"id": 1}]},
//!   {"cmfClient": "http://h2", "error": "timeout"}
//! ]
//! ```
//!
//! The server speaks newline-delimited JSON-RPC over stdio. Over HTTP it
//! answers one message per `POST /mcp`, or streams answers over SSE
//! (`GET /sse` plus `POST /messages?session_id=`).

pub mod context;
pub mod dispatch;
pub mod error;
pub mod http;
pub mod protocol;
pub mod registry;
pub mod server;
pub mod tools;
pub mod transport;

pub use context::ServerContext;
pub use dispatch::{dispatch, TargetResult};
pub use error::{McpError, TransportError};
pub use http::{router, serve_http};
pub use registry::{Connection, ConnectionRegistry};
pub use server::McpServer;
pub use tools::{CmfTool, QueryKind, Tool, ToolError, ToolRegistry};
pub use transport::{StdioTransport, Transport};
