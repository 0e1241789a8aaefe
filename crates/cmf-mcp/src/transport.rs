//! MCP transport implementations.
//!
//! The stdio transport reads newline-delimited JSON messages from the client
//! on one stream and writes responses to another. Logging never goes to the
//! output stream.

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::debug;

use crate::error::TransportError;

/// Trait for MCP transport implementations.
#[async_trait]
pub trait Transport: Send {
    /// Send a message to the client.
    async fn send(&mut self, message: &str) -> Result<(), TransportError>;

    /// Receive a message from the client.
    async fn receive(&mut self) -> Result<String, TransportError>;

    /// Close the transport connection.
    async fn close(&mut self) -> Result<(), TransportError>;

    /// Check if the transport is connected.
    fn is_connected(&self) -> bool;
}

/// Line-oriented transport over a reader/writer pair.
pub struct StdioTransport<R, W> {
    reader: BufReader<R>,
    writer: W,
    connected: bool,
}

impl StdioTransport<tokio::io::Stdin, tokio::io::Stdout> {
    /// Transport over the process's stdin and stdout.
    pub fn stdio() -> Self {
        Self::new(tokio::io::stdin(), tokio::io::stdout())
    }
}

impl<R, W> StdioTransport<R, W>
where
    R: AsyncRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    /// Wrap a reader and a writer.
    pub fn new(reader: R, writer: W) -> Self {
        Self {
            reader: BufReader::new(reader),
            writer,
            connected: true,
        }
    }
}

#[async_trait]
impl<R, W> Transport for StdioTransport<R, W>
where
    R: AsyncRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    async fn send(&mut self, message: &str) -> Result<(), TransportError> {
        if !self.connected {
            return Err(TransportError::NotConnected);
        }

        debug!(message = message, "Sending message to MCP client");

        self.writer
            .write_all(message.as_bytes())
            .await
            .map_err(TransportError::WriteError)?;
        self.writer
            .write_all(b"\n")
            .await
            .map_err(TransportError::WriteError)?;
        self.writer
            .flush()
            .await
            .map_err(TransportError::WriteError)?;

        Ok(())
    }

    async fn receive(&mut self) -> Result<String, TransportError> {
        if !self.connected {
            return Err(TransportError::NotConnected);
        }

        loop {
            let mut line = String::new();
            let bytes_read = self
                .reader
                .read_line(&mut line)
                .await
                .map_err(TransportError::ReadError)?;

            if bytes_read == 0 {
                self.connected = false;
                return Err(TransportError::ConnectionClosed);
            }

            let message = line.trim();
            if message.is_empty() {
                continue;
            }

            debug!(message = message, "Received message from MCP client");
            return Ok(message.to_string());
        }
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        if !self.connected {
            return Ok(());
        }
        debug!("Closing MCP transport");
        self.connected = false;
        self.writer
            .shutdown()
            .await
            .map_err(TransportError::WriteError)
    }

    fn is_connected(&self) -> bool {
        self.connected
    }
}
