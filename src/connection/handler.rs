//! Connection Handler
//!
//! One handler owns one accepted socket for its whole lifetime and runs
//! in its own spawned task.
//!
//! ## Connection Lifecycle
//!
//! ```text
//! 1. Client connects, handler task spawned (never joined)
//!        │
//!        ▼
//! 2. ┌──────────────────────────────┐
//!    │  Read up to one buffer       │
//!    │  Decode the first frame      │──── bad frame ──> error reply
//!    │  Execute command             │
//!    │  Send reply                  │
//!    │         [Loop back]          │
//!    └──────────────────────────────┘
//!        │
//!        ▼
//! 3. Peer closes (0-byte read) or I/O error: socket dropped, task ends
//! ```
//!
//! Each read is treated as one request. Only the first frame in a read is
//! executed; anything after it in the same read is discarded.

use crate::commands::CommandHandler;
use crate::protocol::{parse_request, RespValue};
use crate::storage::StorageEngine;
use bytes::BytesMut;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt, BufWriter};
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, error, info, trace, warn};

/// Size of the per-connection read buffer (64 KB).
pub const READ_BUFFER_SIZE: usize = 64 * 1024;

/// Counters shared by every connection.
#[derive(Debug, Default)]
pub struct ConnectionStats {
    /// Total number of connections accepted
    pub connections_accepted: AtomicU64,
    /// Currently active connections
    pub active_connections: AtomicU64,
    /// Requests decoded and executed
    pub commands_processed: AtomicU64,
    /// Reads that did not decode as a request
    pub protocol_errors: AtomicU64,
    /// Total bytes read
    pub bytes_read: AtomicU64,
    /// Total bytes written
    pub bytes_written: AtomicU64,
}

impl ConnectionStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn connection_opened(&self) {
        self.connections_accepted.fetch_add(1, Ordering::Relaxed);
        self.active_connections.fetch_add(1, Ordering::Relaxed);
    }

    pub fn connection_closed(&self) {
        self.active_connections.fetch_sub(1, Ordering::Relaxed);
    }

    pub fn command_processed(&self) {
        self.commands_processed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn protocol_error(&self) {
        self.protocol_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn bytes_read(&self, count: usize) {
        self.bytes_read.fetch_add(count as u64, Ordering::Relaxed);
    }

    pub fn bytes_written(&self, count: usize) {
        self.bytes_written.fetch_add(count as u64, Ordering::Relaxed);
    }
}

/// Handles a single client connection.
pub struct ConnectionHandler {
    stream: BufWriter<TcpStream>,

    /// Client's address (for logging)
    addr: SocketAddr,

    /// Holds the bytes of the current read only
    buffer: BytesMut,

    command_handler: CommandHandler,

    stats: Arc<ConnectionStats>,
}

impl ConnectionHandler {
    pub fn new(
        stream: TcpStream,
        addr: SocketAddr,
        command_handler: CommandHandler,
        stats: Arc<ConnectionStats>,
    ) -> Self {
        stats.connection_opened();

        Self {
            stream: BufWriter::new(stream),
            addr,
            buffer: BytesMut::with_capacity(READ_BUFFER_SIZE),
            command_handler,
            stats,
        }
    }

    /// Runs the read-execute-reply loop until the client goes away, then
    /// logs how the connection ended.
    pub async fn run(mut self) {
        info!(client = %self.addr, "Client connected");

        let result = self.main_loop().await;

        match result {
            Ok(()) | Err(ConnectionError::ClientDisconnected) => {
                info!(client = %self.addr, "Client disconnected")
            }
            Err(ConnectionError::Io(io_err))
                if io_err.kind() == std::io::ErrorKind::ConnectionReset =>
            {
                debug!(client = %self.addr, "Connection reset by client")
            }
            Err(e) => warn!(client = %self.addr, error = %e, "Connection error"),
        }

        self.stats.connection_closed();
    }

    async fn main_loop(&mut self) -> Result<(), ConnectionError> {
        loop {
            self.read_request().await?;
            let response = self.process_request();
            self.send_response(&response).await?;
        }
    }

    /// Replaces the buffer contents with the next read from the socket.
    async fn read_request(&mut self) -> Result<(), ConnectionError> {
        self.buffer.clear();

        let n = self.stream.get_mut().read_buf(&mut self.buffer).await?;
        if n == 0 {
            return Err(ConnectionError::ClientDisconnected);
        }

        self.stats.bytes_read(n);
        trace!(client = %self.addr, bytes = n, "Read data");
        Ok(())
    }

    /// Decodes the first frame in the buffer and executes it.
    ///
    /// A frame that does not decode produces an error reply; the connection
    /// stays open.
    fn process_request(&mut self) -> RespValue {
        match parse_request(&self.buffer) {
            Ok((tokens, consumed)) => {
                if consumed < self.buffer.len() {
                    debug!(
                        client = %self.addr,
                        discarded = self.buffer.len() - consumed,
                        "Ignoring bytes after the first frame"
                    );
                }
                self.stats.command_processed();
                self.command_handler.execute(&tokens)
            }
            Err(e) => {
                warn!(client = %self.addr, error = %e, "Invalid request");
                self.stats.protocol_error();
                RespValue::error(format!("ERR invalid RESP format: {}", e))
            }
        }
    }

    async fn send_response(&mut self, response: &RespValue) -> Result<(), ConnectionError> {
        let bytes = response.serialize();
        self.stream.write_all(&bytes).await?;
        self.stream.flush().await?;
        self.stats.bytes_written(bytes.len());
        trace!(client = %self.addr, bytes = bytes.len(), "Sent response");
        Ok(())
    }
}

/// Reasons a connection loop ends.
#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The peer closed its side of the socket
    #[error("Client disconnected")]
    ClientDisconnected,
}

/// Runs a [`ConnectionHandler`] to completion.
///
/// Meant to be handed straight to `tokio::spawn`.
pub async fn handle_connection(
    stream: TcpStream,
    addr: SocketAddr,
    command_handler: CommandHandler,
    stats: Arc<ConnectionStats>,
) {
    ConnectionHandler::new(stream, addr, command_handler, stats)
        .run()
        .await;
}

/// Accepts clients until the future is dropped, spawning one detached task
/// per connection.
///
/// There is no cap on concurrent connections. A failed `accept` is logged
/// and the loop keeps going.
pub async fn accept_loop(
    listener: TcpListener,
    storage: Arc<StorageEngine>,
    stats: Arc<ConnectionStats>,
) {
    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                let handler = CommandHandler::new(Arc::clone(&storage));
                tokio::spawn(handle_connection(stream, addr, handler, Arc::clone(&stats)));
            }
            Err(e) => {
                error!(error = %e, "Failed to accept connection");
            }
        }
    }
}
