//! PostgreSQL connector.
//!
//! Every call opens its own client and lets it drop afterwards. Statements go
//! through the simple-query protocol so any result column renders as text.

pub mod schema;
pub mod tls;

use async_trait::async_trait;
use chat_core::{Connection, ExecutionResult, Schema};
use serde_json::{Map, Value};
use tokio_postgres::{config::SslMode, Client, NoTls, SimpleQueryMessage, SimpleQueryRow};

use crate::error::{ConnectorError, Result};
use crate::Connector;
use schema::{group_columns_into_schemas, ColumnInfo, COLUMNS_QUERY};

/// Database used when the connection does not name one.
const DEFAULT_DATABASE: &str = "postgres";

const DATABASES_QUERY: &str =
    "SELECT datname FROM pg_database WHERE datistemplate = false ORDER BY datname";

pub struct PostgresConnector {
    connection: Connection,
    port: u16,
}

impl PostgresConnector {
    pub fn new(connection: Connection) -> Result<Self> {
        let port = connection.port.trim().parse::<u16>().map_err(|_| {
            ConnectorError::InvalidConfig(format!("invalid port '{}'", connection.port))
        })?;
        if connection.host.trim().is_empty() {
            return Err(ConnectorError::InvalidConfig("host is empty".to_string()));
        }
        Ok(Self { connection, port })
    }

    fn default_database(&self) -> &str {
        self.connection
            .database
            .as_deref()
            .filter(|db| !db.is_empty())
            .unwrap_or(DEFAULT_DATABASE)
    }

    fn config(&self, database: &str) -> tokio_postgres::Config {
        let mut config = tokio_postgres::Config::new();
        config
            .host(&self.connection.host)
            .port(self.port)
            .user(&self.connection.username)
            .dbname(database)
            .application_name("sql-chat");
        if !self.connection.password.is_empty() {
            config.password(&self.connection.password);
        }
        config
    }

    async fn connect(&self, database: &str) -> Result<Client> {
        let mut config = self.config(database);
        tracing::debug!(
            host = %self.connection.host,
            port = %self.port,
            database = %database,
            tls = self.connection.ssl.is_some(),
            "connecting to PostgreSQL"
        );

        match &self.connection.ssl {
            Some(ssl) => {
                config.ssl_mode(SslMode::Require);
                let connector = tls::build_tls_connector(ssl)?;
                let (client, connection) = config.connect(connector).await?;
                tokio::spawn(async move {
                    if let Err(e) = connection.await {
                        tracing::error!(error = %e, "PostgreSQL connection error");
                    }
                });
                Ok(client)
            }
            None => {
                config.ssl_mode(SslMode::Disable);
                let (client, connection) = config.connect(NoTls).await?;
                tokio::spawn(async move {
                    if let Err(e) = connection.await {
                        tracing::error!(error = %e, "PostgreSQL connection error");
                    }
                });
                Ok(client)
            }
        }
    }

    async fn simple_query_rows(&self, database: &str, sql: &str) -> Result<Vec<SimpleQueryRow>> {
        let client = self.connect(database).await?;
        let messages = client.simple_query(sql).await?;
        Ok(messages
            .into_iter()
            .filter_map(|message| match message {
                SimpleQueryMessage::Row(row) => Some(row),
                _ => None,
            })
            .collect())
    }
}

fn row_to_object(row: &SimpleQueryRow) -> Map<String, Value> {
    row.columns()
        .iter()
        .enumerate()
        .map(|(idx, column)| {
            let value = match row.get(idx) {
                Some(text) => Value::String(text.to_string()),
                None => Value::Null,
            };
            (column.name().to_string(), value)
        })
        .collect()
}

fn text(row: &SimpleQueryRow, idx: usize) -> String {
    row.get(idx).unwrap_or_default().to_string()
}

fn row_to_column(row: &SimpleQueryRow) -> ColumnInfo {
    ColumnInfo {
        schema: text(row, 0),
        table: text(row, 1),
        name: text(row, 2),
        data_type: text(row, 3),
        nullable: row.get(4) != Some("NO"),
        default: row.get(5).map(str::to_string),
    }
}

#[async_trait]
impl Connector for PostgresConnector {
    async fn test_connection(&self) -> Result<bool> {
        let client = self.connect(self.default_database()).await?;
        client.simple_query("SELECT 1").await?;
        Ok(true)
    }

    async fn execute(&self, database_name: &str, statement: &str) -> ExecutionResult {
        let database = if database_name.is_empty() {
            self.default_database()
        } else {
            database_name
        };

        let client = match self.connect(database).await {
            Ok(client) => client,
            Err(e) => return ExecutionResult::failed(e.to_string()),
        };

        match client.simple_query(statement).await {
            Ok(messages) => {
                let mut result = ExecutionResult::default();
                for message in messages {
                    match message {
                        SimpleQueryMessage::Row(row) => result.raw_result.push(row_to_object(&row)),
                        SimpleQueryMessage::CommandComplete(rows) => {
                            result.affected_rows = Some(rows)
                        }
                        _ => {}
                    }
                }
                result
            }
            Err(e) => {
                tracing::warn!(database = %database, error = %e, "statement failed");
                ExecutionResult::failed(e.to_string())
            }
        }
    }

    async fn get_databases(&self) -> Result<Vec<String>> {
        let rows = self
            .simple_query_rows(self.default_database(), DATABASES_QUERY)
            .await?;
        Ok(rows.iter().map(|row| text(row, 0)).collect())
    }

    async fn get_table_schema(&self, database_name: &str) -> Result<Vec<Schema>> {
        let rows = self.simple_query_rows(database_name, COLUMNS_QUERY).await?;
        let columns: Vec<ColumnInfo> = rows.iter().map(row_to_column).collect();
        let schemas = group_columns_into_schemas(columns);
        tracing::info!(
            database = %database_name,
            schemas = schemas.len(),
            "fetched table schema"
        );
        Ok(schemas)
    }
}
