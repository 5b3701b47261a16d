//! Command Module
//!
//! Turns decoded request tokens into replies.
//!
//! ```text
//! tokens ──> Command::identify ──> arity check ──> StorageEngine ──> RespValue
//! ```

pub mod handler;

pub use handler::{Command, CommandHandler};
