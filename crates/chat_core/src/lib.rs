//! chat_core - Core types for the SQL chat service
//!
//! This crate provides the foundational types shared by every other crate:
//! - `connection` - Connection, Engine, Schema, Table and execution results
//! - `conversation` - Conversation, Message and the per-conversation table selection
//! - `query` - executed query context and history
//! - `config` - process configuration and feature flags
//! - `sql` - small SQL statement helpers

pub mod config;
pub mod connection;
pub mod conversation;
pub mod paths;
pub mod query;
pub mod sql;

// Re-export commonly used types
pub use config::{Config, Environment, Features};
pub use connection::{Connection, Database, Engine, ExecutionResult, Schema, SslOptions, Table};
pub use conversation::{Conversation, CreatorRole, Message, MessageStatus, SelectionState};
pub use query::{ExecuteQueryContext, QueryHistory};
pub use sql::check_statement_is_select;

/// Opaque identifier used for connections, conversations and messages.
pub type Id = String;

/// Generate a fresh opaque identifier.
pub fn generate_id() -> Id {
    uuid::Uuid::new_v4().to_string()
}
