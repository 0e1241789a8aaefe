//! Process-wide server state: the connection registry and its shutdown.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use cmf_core::{Config, Result};
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::registry::ConnectionRegistry;

/// State shared by every request handler.
///
/// Built once before serving and torn down once by [`ServerContext::shutdown`].
#[derive(Debug)]
pub struct ServerContext {
    registry: ConnectionRegistry,
    shut_down: AtomicBool,
    /// Number of connections whose session close has finished.
    closed: Mutex<usize>,
}

impl ServerContext {
    pub fn new(registry: ConnectionRegistry) -> Arc<Self> {
        Arc::new(Self {
            registry,
            shut_down: AtomicBool::new(false),
            closed: Mutex::new(0),
        })
    }

    /// Build the registry from configuration.
    pub fn from_config(config: &Config) -> Result<Arc<Self>> {
        let registry = ConnectionRegistry::from_config(config)?;
        info!(connections = registry.len(), "CMF connections registered");
        Ok(Self::new(registry))
    }

    pub fn registry(&self) -> &ConnectionRegistry {
        &self.registry
    }

    pub fn is_shut_down(&self) -> bool {
        self.shut_down.load(Ordering::SeqCst)
    }

    /// Close every connection's session.
    ///
    /// Returns `true` for the call that closed the sessions. Concurrent
    /// callers wait until closing has finished and then return `false`. If
    /// the closing call is dropped midway, the next call resumes at the first
    /// connection not yet closed. A failure to close one session is logged
    /// and the rest are still closed.
    pub async fn shutdown(&self) -> bool {
        self.shut_down.store(true, Ordering::SeqCst);

        let mut closed = self.closed.lock().await;
        if *closed >= self.registry.len() {
            return false;
        }

        info!("Shutting down CMF connections");
        for conn in self.registry.iter().skip(*closed) {
            match conn.client.close_session().await {
                Ok(()) => info!(url = %conn.id, "CMF client session closed"),
                Err(e) => warn!(url = %conn.id, error = %e, "Failed to close CMF client session"),
            }
            *closed += 1;
        }
        true
    }
}
