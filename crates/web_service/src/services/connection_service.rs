//! Connections and the database/schema data fetched through them.
//!
//! Fetched data is cached for the session. Concurrent fetches for the same
//! key are not coalesced: each one hits the database and the last write wins.

use std::collections::HashMap;

use chat_core::{Connection, Database, Id, Schema};
use db_connector::ConnectorFactory;
use prompt_budget::TokenCounter;
use tokio::sync::RwLock;

use crate::error::Result;

type SchemaKey = (Id, String);

#[derive(Default)]
pub struct ConnectionService {
    connections: RwLock<Vec<Connection>>,
    databases: RwLock<HashMap<Id, Vec<Database>>>,
    schemas: RwLock<HashMap<SchemaKey, Vec<Schema>>>,
}

impl ConnectionService {
    pub fn new(connections: Vec<Connection>) -> Self {
        Self {
            connections: RwLock::new(connections),
            ..Self::default()
        }
    }

    pub async fn list(&self) -> Vec<Connection> {
        self.connections.read().await.clone()
    }

    pub async fn get(&self, id: &str) -> Option<Connection> {
        self.connections
            .read()
            .await
            .iter()
            .find(|connection| connection.id == id)
            .cloned()
    }

    pub async fn create(&self, connection: Connection) -> Connection {
        tracing::info!(connection_id = %connection.id, "Connection created");
        self.connections.write().await.push(connection.clone());
        connection
    }

    /// Replace a connection. Cached data of the old target is dropped.
    pub async fn update(&self, connection: Connection) -> Option<Connection> {
        {
            let mut connections = self.connections.write().await;
            let slot = connections.iter_mut().find(|c| c.id == connection.id)?;
            *slot = connection.clone();
        }
        self.invalidate(&connection.id).await;
        Some(connection)
    }

    pub async fn delete(&self, id: &str) -> bool {
        let removed = {
            let mut connections = self.connections.write().await;
            let before = connections.len();
            connections.retain(|connection| connection.id != id);
            connections.len() != before
        };
        if removed {
            self.invalidate(id).await;
            tracing::info!(connection_id = %id, "Connection deleted");
        }
        removed
    }

    async fn invalidate(&self, id: &str) {
        self.databases.write().await.remove(id);
        self.schemas
            .write()
            .await
            .retain(|(connection_id, _), _| connection_id != id);
    }

    pub async fn cached_databases(&self, connection_id: &str) -> Option<Vec<Database>> {
        self.databases.read().await.get(connection_id).cloned()
    }

    pub async fn cached_schemas(
        &self,
        connection_id: &str,
        database_name: &str,
    ) -> Option<Vec<Schema>> {
        self.schemas
            .read()
            .await
            .get(&(connection_id.to_string(), database_name.to_string()))
            .cloned()
    }

    pub async fn databases(
        &self,
        connection: &Connection,
        factory: &dyn ConnectorFactory,
    ) -> Result<Vec<Database>> {
        if let Some(databases) = self.cached_databases(&connection.id).await {
            return Ok(databases);
        }
        self.fetch_databases(connection, factory).await
    }

    async fn fetch_databases(
        &self,
        connection: &Connection,
        factory: &dyn ConnectorFactory,
    ) -> Result<Vec<Database>> {
        let connector = factory.connector(connection)?;
        let databases: Vec<Database> = connector
            .get_databases()
            .await?
            .into_iter()
            .map(|name| Database {
                connection_id: connection.id.clone(),
                name,
            })
            .collect();

        tracing::info!(
            connection_id = %connection.id,
            database_count = databases.len(),
            "Fetched databases"
        );
        self.databases
            .write()
            .await
            .insert(connection.id.clone(), databases.clone());
        Ok(databases)
    }

    /// Schemas of a database. Table token counts are computed once when the
    /// list is cached and stay fixed until the next refresh.
    pub async fn schemas(
        &self,
        connection: &Connection,
        database_name: &str,
        factory: &dyn ConnectorFactory,
        counter: &dyn TokenCounter,
    ) -> Result<Vec<Schema>> {
        if let Some(schemas) = self.cached_schemas(&connection.id, database_name).await {
            return Ok(schemas);
        }
        self.fetch_schemas(connection, database_name, factory, counter)
            .await
    }

    async fn fetch_schemas(
        &self,
        connection: &Connection,
        database_name: &str,
        factory: &dyn ConnectorFactory,
        counter: &dyn TokenCounter,
    ) -> Result<Vec<Schema>> {
        let connector = factory.connector(connection)?;
        let mut schemas = connector.get_table_schema(database_name).await?;
        for table in schemas.iter_mut().flat_map(|schema| schema.tables.iter_mut()) {
            table.freeze_token_with(|structure| counter.count_text(structure));
        }

        tracing::info!(
            connection_id = %connection.id,
            database = %database_name,
            schema_count = schemas.len(),
            "Fetched schemas"
        );
        self.schemas.write().await.insert(
            (connection.id.clone(), database_name.to_string()),
            schemas.clone(),
        );
        Ok(schemas)
    }

    /// Drop and refetch the databases of a connection, plus the schemas of
    /// every database that was cached before.
    pub async fn refresh(
        &self,
        connection: &Connection,
        factory: &dyn ConnectorFactory,
        counter: &dyn TokenCounter,
    ) -> Result<Vec<Database>> {
        let cached_databases: Vec<String> = self
            .schemas
            .read()
            .await
            .keys()
            .filter(|(connection_id, _)| connection_id == &connection.id)
            .map(|(_, database)| database.clone())
            .collect();

        self.invalidate(&connection.id).await;
        let databases = self.fetch_databases(connection, factory).await?;
        for database in cached_databases {
            if databases.iter().any(|d| d.name == database) {
                self.fetch_schemas(connection, &database, factory, counter)
                    .await?;
            }
        }
        Ok(databases)
    }
}
