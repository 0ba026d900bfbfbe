//! Database collaborators.
//!
//! A [`Connector`] is built per call from a [`Connection`] and owns no pooled
//! state. Statement failures are folded into [`ExecutionResult::error`];
//! connection and introspection failures surface as [`ConnectorError`].

pub mod error;
pub mod postgres;

use async_trait::async_trait;
use chat_core::{Connection, Engine, ExecutionResult, Schema};

pub use error::{ConnectorError, Result};
pub use postgres::PostgresConnector;

#[async_trait]
pub trait Connector: Send + Sync {
    async fn test_connection(&self) -> Result<bool>;

    async fn execute(&self, database_name: &str, statement: &str) -> ExecutionResult;

    async fn get_databases(&self) -> Result<Vec<String>>;

    async fn get_table_schema(&self, database_name: &str) -> Result<Vec<Schema>>;
}

/// Build the connector for the connection's engine.
pub fn new_connector(connection: &Connection) -> Result<Box<dyn Connector>> {
    match connection.engine_type {
        Engine::PostgreSQL => Ok(Box::new(PostgresConnector::new(connection.clone())?)),
    }
}

/// Seam for swapping real databases out in tests.
pub trait ConnectorFactory: Send + Sync {
    fn connector(&self, connection: &Connection) -> Result<Box<dyn Connector>>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultConnectorFactory;

impl ConnectorFactory for DefaultConnectorFactory {
    fn connector(&self, connection: &Connection) -> Result<Box<dyn Connector>> {
        new_connector(connection)
    }
}
