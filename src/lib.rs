//! # TideKV - An In-Memory Key-Value Store
//!
//! TideKV speaks a subset of the Redis wire protocol (RESP) over TCP and
//! keeps string and list values in memory, with optional per-key expiry at
//! millisecond resolution.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────┐
//! │                            TideKV                             │
//! │                                                               │
//! │  ┌─────────────┐    ┌─────────────┐    ┌─────────────┐        │
//! │  │ TCP Server  │───>│ Connection  │───>│  Command    │        │
//! │  │ (Listener)  │    │  Handler    │    │  Handler    │        │
//! │  └─────────────┘    └──────┬──────┘    └──────┬──────┘        │
//! │                            │                  │               │
//! │                            ▼                  ▼               │
//! │                     ┌─────────────┐   ┌──────────────────┐    │
//! │                     │   RESP      │   │  StorageEngine   │    │
//! │                     │   Codec     │   │  (64 RwLock      │    │
//! │                     └─────────────┘   │   shards)        │    │
//! │                                       └──────────────────┘    │
//! └───────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```no_run
//! use tidekv::connection::{accept_loop, ConnectionStats};
//! use tidekv::storage::StorageEngine;
//! use std::sync::Arc;
//! use tokio::net::TcpListener;
//!
//! #[tokio::main]
//! async fn main() -> std::io::Result<()> {
//!     let storage = Arc::new(StorageEngine::new());
//!     let stats = Arc::new(ConnectionStats::new());
//!
//!     let listener = TcpListener::bind("127.0.0.1:6379").await?;
//!     accept_loop(listener, storage, stats).await;
//!     Ok(())
//! }
//! ```
//!
//! ## Supported Commands
//!
//! - `PING`
//! - `ECHO message`
//! - `SET key value [PX milliseconds | EX seconds]`
//! - `GET key`
//! - `RPUSH key value [value ...]` / `LPUSH key value [value ...]`
//! - `LRANGE key start stop`
//! - `LLEN key`
//!
//! ## Expiry
//!
//! Expiry is lazy: a key whose deadline has passed is removed the next
//! time any command touches it. Nothing sweeps in the background.

pub mod commands;
pub mod config;
pub mod connection;
pub mod protocol;
pub mod storage;

pub use commands::CommandHandler;
pub use config::{Config, ConfigError};
pub use connection::{accept_loop, handle_connection, ConnectionStats};
pub use protocol::{ParseError, RespValue};
pub use storage::{StorageEngine, StoreError};

/// The default port TideKV listens on (same as Redis)
pub const DEFAULT_PORT: u16 = 6379;

/// The default host TideKV binds to
pub const DEFAULT_HOST: &str = "0.0.0.0";

/// Version of TideKV
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
