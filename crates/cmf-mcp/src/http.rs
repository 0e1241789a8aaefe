//! HTTP transports.
//!
//! - `POST /mcp` answers one JSON-RPC message in the response body.
//! - `GET /sse` opens an event stream whose first `endpoint` event names
//!   `/messages?session_id=<id>`; messages posted there are answered as
//!   `message` events on that stream.

use std::collections::HashMap;
use std::convert::Infallible;
use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Response,
    },
    routing::{get, post},
    Json, Router,
};
use futures::stream::{self, Stream, StreamExt};
use parking_lot::Mutex;
use serde::Deserialize;
use serde_json::json;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::McpError;
use crate::server::McpServer;

/// Responses buffered per SSE session before posting blocks.
const SESSION_BUFFER: usize = 32;

type Sessions = Arc<Mutex<HashMap<String, mpsc::Sender<String>>>>;

#[derive(Clone)]
struct HttpState {
    server: Arc<McpServer>,
    sessions: Sessions,
    cancel: CancellationToken,
}

/// Routes served over HTTP. Open SSE streams end when `cancel` fires.
pub fn router(server: Arc<McpServer>, cancel: CancellationToken) -> Router {
    let state = HttpState {
        server,
        sessions: Arc::default(),
        cancel,
    };
    Router::new()
        .route("/mcp", post(handle_mcp))
        .route("/sse", get(handle_sse))
        .route("/messages", post(handle_session_message))
        .route("/health", get(health))
        .with_state(state)
}

async fn handle_mcp(State(state): State<HttpState>, body: String) -> Response {
    match state.server.handle_line(body.trim()).await {
        Some(response) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "application/json")],
            response,
        )
            .into_response(),
        None => StatusCode::ACCEPTED.into_response(),
    }
}

/// Removes its session from the table when the stream is dropped.
struct SessionGuard {
    id: String,
    sessions: Sessions,
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        self.sessions.lock().remove(&self.id);
        debug!(session = %self.id, "SSE session closed");
    }
}

async fn handle_sse(
    State(state): State<HttpState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let id = Uuid::new_v4().simple().to_string();
    let (tx, rx) = mpsc::channel::<String>(SESSION_BUFFER);
    state.sessions.lock().insert(id.clone(), tx);
    info!(session = %id, "SSE session opened");

    let endpoint = Event::default()
        .event("endpoint")
        .data(format!("/messages?session_id={}", id));
    let guard = SessionGuard {
        id,
        sessions: Arc::clone(&state.sessions),
    };

    let messages = stream::unfold(
        (rx, state.cancel, guard),
        |(mut rx, cancel, guard)| async move {
            let message = tokio::select! {
                () = cancel.cancelled() => None,
                message = rx.recv() => message,
            };
            let event = Event::default().event("message").data(message?);
            Some((Ok(event), (rx, cancel, guard)))
        },
    );

    let stream = stream::once(async move { Ok::<_, Infallible>(endpoint) }).chain(messages);
    Sse::new(stream).keep_alive(KeepAlive::default())
}

#[derive(Deserialize)]
struct SessionParams {
    session_id: String,
}

async fn handle_session_message(
    State(state): State<HttpState>,
    Query(params): Query<SessionParams>,
    body: String,
) -> Response {
    let sender = state.sessions.lock().get(&params.session_id).cloned();
    let Some(sender) = sender else {
        return (StatusCode::NOT_FOUND, "unknown session").into_response();
    };

    let server = Arc::clone(&state.server);
    tokio::spawn(async move {
        if let Some(response) = server.handle_line(body.trim()).await {
            if sender.send(response).await.is_err() {
                debug!(session = %params.session_id, "SSE session gone before response");
            }
        }
    });
    StatusCode::ACCEPTED.into_response()
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({"status": "ok"}))
}

/// Serve on `listener` until `cancel` fires, then let in-flight requests
/// finish.
pub async fn serve_http(
    server: Arc<McpServer>,
    listener: TcpListener,
    cancel: CancellationToken,
) -> Result<(), McpError> {
    let addr = listener.local_addr()?;
    info!(server = %server.info().name, addr = %addr, "MCP server listening on HTTP");

    axum::serve(listener, router(server, cancel.clone()))
        .with_graceful_shutdown(async move {
            cancel.cancelled().await;
        })
        .await?;

    info!("HTTP server stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::ServerContext;
    use crate::registry::tests::{registry_of, FakeCmf};
    use serde_json::Value;

    async fn spawn() -> (String, CancellationToken, tokio::task::JoinHandle<()>) {
        let ctx = ServerContext::new(registry_of(vec![FakeCmf::ok(
            "http://h1",
            json!(["train"]),
        )]));
        let server = Arc::new(McpServer::new("cmf-mcp-server", ctx));
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let handle = tokio::spawn(async move {
            serve_http(server, listener, token).await.unwrap();
        });
        (base, cancel, handle)
    }

    #[tokio::test]
    async fn test_health() {
        let (base, cancel, handle) = spawn().await;
        let body: Value = reqwest::get(format!("{}/health", base))
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(body, json!({"status": "ok"}));
        cancel.cancel();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_post_request_and_notification() {
        let (base, cancel, handle) = spawn().await;
        let client = reqwest::Client::new();

        let response = client
            .post(format!("{}/mcp", base))
            .body(
                r#"{"jsonrpc":"2.0","id":1,"method":"tools/call",
                   "params":{"name":"cmf_show_pipelines"}}"#,
            )
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::OK);
        let body: Value = response.json().await.unwrap();
        assert_eq!(
            body["result"]["structuredContent"]["result"],
            json!([{"cmfClient": "http://h1", "data": ["train"]}])
        );

        let response = client
            .post(format!("{}/mcp", base))
            .body(r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#)
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::ACCEPTED);
        assert!(response.text().await.unwrap().is_empty());

        cancel.cancel();
        handle.await.unwrap();
    }

    /// Read the next SSE event as `(event, data)`, skipping keep-alives.
    async fn next_event(response: &mut reqwest::Response, buffer: &mut String) -> (String, String) {
        loop {
            if let Some(end) = buffer.find("\n\n") {
                let block: String = buffer.drain(..end + 2).collect();
                let mut event = "message".to_string();
                let mut data = String::new();
                for line in block.lines() {
                    if let Some(value) = line.strip_prefix("event:") {
                        event = value.trim().to_string();
                    } else if let Some(value) = line.strip_prefix("data:") {
                        data.push_str(value.trim_start());
                    }
                }
                if data.is_empty() {
                    continue;
                }
                return (event, data);
            }
            let chunk = response.chunk().await.unwrap().expect("stream ended");
            buffer.push_str(std::str::from_utf8(&chunk).unwrap());
        }
    }

    #[tokio::test]
    async fn test_sse_session_round_trip() {
        let (base, cancel, handle) = spawn().await;
        let client = reqwest::Client::new();

        let mut stream = client.get(format!("{}/sse", base)).send().await.unwrap();
        assert_eq!(stream.status(), reqwest::StatusCode::OK);
        let mut buffer = String::new();

        let (event, endpoint) = next_event(&mut stream, &mut buffer).await;
        assert_eq!(event, "endpoint");
        assert!(endpoint.starts_with("/messages?session_id="));

        let response = client
            .post(format!("{}{}", base, endpoint))
            .body(
                r#"{"jsonrpc":"2.0","id":7,"method":"tools/call",
                   "params":{"name":"cmf_show_pipelines"}}"#,
            )
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::ACCEPTED);

        let (event, data) = next_event(&mut stream, &mut buffer).await;
        assert_eq!(event, "message");
        let message: Value = serde_json::from_str(&data).unwrap();
        assert_eq!(message["id"], 7);
        assert_eq!(
            message["result"]["structuredContent"]["result"],
            json!([{"cmfClient": "http://h1", "data": ["train"]}])
        );

        // Notifications are accepted and produce no event.
        let response = client
            .post(format!("{}{}", base, endpoint))
            .body(r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#)
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::ACCEPTED);

        let response = client
            .post(format!("{}{}", base, endpoint))
            .body(r#"{"jsonrpc":"2.0","id":8,"method":"ping"}"#)
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::ACCEPTED);
        let (_, data) = next_event(&mut stream, &mut buffer).await;
        let message: Value = serde_json::from_str(&data).unwrap();
        assert_eq!(message["id"], 8);
        assert_eq!(message["result"], json!({}));

        cancel.cancel();
        let ended = tokio::time::timeout(std::time::Duration::from_secs(5), async {
            while stream.chunk().await.unwrap_or(None).is_some() {}
        })
        .await;
        assert!(ended.is_ok());
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_message_to_unknown_session_is_not_found() {
        let (base, cancel, handle) = spawn().await;
        let client = reqwest::Client::new();

        let response = client
            .post(format!("{}/messages?session_id=nope", base))
            .body(r#"{"jsonrpc":"2.0","id":1,"method":"ping"}"#)
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::NOT_FOUND);

        let response = client
            .post(format!("{}/messages", base))
            .body(r#"{"jsonrpc":"2.0","id":1,"method":"ping"}"#)
            .send()
            .await
            .unwrap();
        assert!(response.status().is_client_error());

        cancel.cancel();
        handle.await.unwrap();
    }
}
