//! Registry of configured CMF connections.

use std::sync::Arc;

use cmf_client::{CmfApi, CmfClient};
use cmf_core::{Config, Error, Result};
use tracing::info;

/// One registered CMF server.
#[derive(Clone)]
pub struct Connection {
    /// Identifier callers use to target this connection (its base address).
    pub id: String,
    /// Client handle.
    pub client: Arc<dyn CmfApi>,
}

impl Connection {
    /// Register `client` under its own base address.
    pub fn new(client: Arc<dyn CmfApi>) -> Self {
        Self {
            id: client.base_url().to_string(),
            client,
        }
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection").field("id", &self.id).finish()
    }
}

/// Ordered, immutable set of connections built once at startup.
#[derive(Debug, Clone)]
pub struct ConnectionRegistry {
    connections: Vec<Connection>,
}

impl ConnectionRegistry {
    /// Build a registry from connections, primary first.
    ///
    /// Fails when there are no connections or two share an identifier.
    pub fn new(connections: Vec<Connection>) -> Result<Self> {
        if connections.is_empty() {
            return Err(Error::missing_primary_url());
        }
        for (i, conn) in connections.iter().enumerate() {
            if connections[..i].iter().any(|c| c.id == conn.id) {
                return Err(Error::Config(format!(
                    "duplicate CMF connection identifier: {}",
                    conn.id
                )));
            }
        }
        Ok(Self { connections })
    }

    /// Create one HTTP client per configured CMF address.
    pub fn from_config(config: &Config) -> Result<Self> {
        if config.cmf.primary().is_none() {
            return Err(Error::missing_primary_url());
        }

        let mut connections = Vec::new();
        for url in config.cmf.connection_urls() {
            let client = CmfClient::from_config(&url, &config.http)?;
            info!(url = %url, "CMF client initialized");
            connections.push(Connection::new(Arc::new(client)));
        }
        Self::new(connections)
    }

    /// Look up a client by identifier.
    pub fn get(&self, id: &str) -> Option<&Arc<dyn CmfApi>> {
        self.connections
            .iter()
            .find(|c| c.id == id)
            .map(|c| &c.client)
    }

    /// Connection identifiers in registration order.
    pub fn ids(&self) -> Vec<&str> {
        self.connections.iter().map(|c| c.id.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Connection> {
        self.connections.iter()
    }

    /// Connections a call should go to.
    ///
    /// Without a filter this is every connection in registration order. With
    /// one, it is the filter's entries that are registered, in filter order,
    /// each at most once. Unknown identifiers are dropped.
    pub fn resolve_targets(&self, filter: Option<&[String]>) -> Vec<&Connection> {
        match filter {
            None => self.connections.iter().collect(),
            Some(ids) => {
                let mut targets: Vec<&Connection> = Vec::new();
                for id in ids {
                    let Some(conn) = self.connections.iter().find(|c| &c.id == id) else {
                        continue;
                    };
                    if !targets.iter().any(|t| t.id == conn.id) {
                        targets.push(conn);
                    }
                }
                targets
            }
        }
    }
}
