//! Connection Module
//!
//! Each accepted client gets its own task running a [`ConnectionHandler`].
//! Tasks are spawned and never joined; the only state they share is the
//! storage engine (through the [`CommandHandler`](crate::CommandHandler))
//! and the [`ConnectionStats`] counters.
//!
//! ```text
//!  TcpListener ── accept() ──> tokio::spawn(handle_connection(..))
//!                                   │
//!                                   ▼
//!               read ─> decode ─> execute ─> reply ─> (loop)
//! ```

pub mod handler;

pub use handler::{
    accept_loop, handle_connection, ConnectionError, ConnectionHandler, ConnectionStats,
    READ_BUFFER_SIZE,
};
