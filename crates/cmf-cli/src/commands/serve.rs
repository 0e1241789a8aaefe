//! Run the MCP server.

use std::future::Future;
use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use cmf_core::{Config, TransportKind};
use cmf_mcp::{serve_http, McpServer, ServerContext, StdioTransport};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::ServeArgs;

pub async fn run(config_path: Option<&Path>, args: ServeArgs) -> anyhow::Result<()> {
    let mut config = super::load_config(config_path)?;
    apply_overrides(&mut config, args);

    let server = Arc::new(McpServer::from_config(&config)?);
    let cancel = CancellationToken::new();
    spawn_shutdown_watcher(cancel.clone(), Arc::clone(server.context()));

    info!(
        transport = %config.server.transport,
        connections = server.context().registry().len(),
        "Starting CMF MCP server"
    );

    let served = match config.server.transport {
        TransportKind::Stdio => {
            let mut transport = StdioTransport::stdio();
            server.serve(&mut transport, cancel.clone()).await
        }
        TransportKind::Http => {
            let addr = format!("{}:{}", config.server.host, config.server.port);
            let listener = tokio::net::TcpListener::bind(&addr)
                .await
                .with_context(|| format!("bind HTTP address '{}'", addr))?;
            serve_http(Arc::clone(&server), listener, cancel.clone()).await
        }
    };

    cancel.cancel();
    server.context().shutdown().await;
    served?;
    Ok(())
}

fn apply_overrides(config: &mut Config, args: ServeArgs) {
    if let Some(transport) = args.transport {
        config.server.transport = transport;
    }
    if let Some(host) = args.host {
        config.server.host = host;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }
}

/// Cancel serving and close CMF sessions on Ctrl+C or SIGTERM.
fn spawn_shutdown_watcher(ct: CancellationToken, context: Arc<ServerContext>) {
    tokio::spawn(async move {
        #[cfg(unix)]
        let terminate = async {
            match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(mut signal) => {
                    signal.recv().await;
                }
                Err(e) => {
                    warn!(error = %e, "Failed to install SIGTERM handler");
                    std::future::pending::<()>().await;
                }
            }
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            () = interrupted(tokio::signal::ctrl_c()) => {
                info!("Received Ctrl+C, shutting down");
            }
            () = terminate => {
                info!("Received SIGTERM, shutting down");
            }
        }

        ct.cancel();
        context.shutdown().await;
    });
}

/// Resolves when `ctrl_c` reports an interrupt. A failed listener never
/// resolves.
async fn interrupted<F>(ctrl_c: F)
where
    F: Future<Output = std::io::Result<()>>,
{
    if let Err(e) = ctrl_c.await {
        warn!(error = %e, "Failed to listen for Ctrl+C");
        std::future::pending::<()>().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_failed_ctrl_c_listener_does_not_trigger_shutdown() {
        let listener = async { Err(std::io::Error::other("no signal handler")) };
        let fired = tokio::time::timeout(Duration::from_millis(50), interrupted(listener)).await;
        assert!(fired.is_err());

        let fired =
            tokio::time::timeout(Duration::from_millis(50), interrupted(async { Ok(()) })).await;
        assert!(fired.is_ok());
    }

    #[test]
    fn test_overrides_only_replace_given_fields() {
        let mut config = Config::default();
        apply_overrides(
            &mut config,
            ServeArgs {
                transport: Some(TransportKind::Http),
                host: None,
                port: Some(9001),
            },
        );
        assert_eq!(config.server.transport, TransportKind::Http);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 9001);
    }
}
