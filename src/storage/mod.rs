//! Storage Module
//!
//! The keyspace shared by all client connections: a sharded, lock-protected
//! map from key to a string or list value, with lazy millisecond expiry.
//!
//! ## Example
//!
//! ```
//! use tidekv::storage::{StorageEngine, StoreError};
//! use bytes::Bytes;
//! use std::sync::Arc;
//!
//! let engine = Arc::new(StorageEngine::new());
//!
//! engine.set(Bytes::from("greeting"), Bytes::from("hello"), None);
//! assert_eq!(engine.get(b"greeting"), Ok(Some(Bytes::from("hello"))));
//!
//! // Lists and strings never convert into each other
//! assert_eq!(
//!     engine.push_back(Bytes::from("greeting"), vec![Bytes::from("x")]),
//!     Err(StoreError::WrongType)
//! );
//! ```

pub mod engine;
pub mod list;

pub use engine::{StorageEngine, StorageStats, StoreError, StoredValue};
pub use list::List;
