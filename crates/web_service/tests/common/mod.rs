#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chat_core::{Config, Connection, ExecutionResult, Schema, Table};
use db_connector::{Connector, ConnectorError, ConnectorFactory};
use llm_relay::{OpenAIRelay, RelayConfig};
use prompt_budget::HeuristicTokenCounter;
use serde_json::{json, Map, Value};
use web_service::AppState;

/// Connector answering from fixed data. Statements are recorded; those
/// starting with `BAD` fail inside the result. Schema reads wait
/// `schema_delay` first, standing in for a slow database.
#[derive(Clone)]
pub struct FakeConnector {
    pub databases: Vec<String>,
    pub schemas: Vec<Schema>,
    pub executed: Arc<Mutex<Vec<(String, String)>>>,
    pub schema_delay: Duration,
}

#[async_trait]
impl Connector for FakeConnector {
    async fn test_connection(&self) -> db_connector::Result<bool> {
        Ok(true)
    }

    async fn execute(&self, database_name: &str, statement: &str) -> ExecutionResult {
        self.executed
            .lock()
            .unwrap()
            .push((database_name.to_string(), statement.to_string()));
        if statement.starts_with("BAD") {
            return ExecutionResult::failed("syntax error at or near \"BAD\"");
        }
        let mut row = Map::new();
        row.insert("one".to_string(), Value::String("1".to_string()));
        ExecutionResult {
            raw_result: vec![row],
            affected_rows: Some(1),
            error: None,
        }
    }

    async fn get_databases(&self) -> db_connector::Result<Vec<String>> {
        Ok(self.databases.clone())
    }

    async fn get_table_schema(&self, _database_name: &str) -> db_connector::Result<Vec<Schema>> {
        if !self.schema_delay.is_zero() {
            tokio::time::sleep(self.schema_delay).await;
        }
        Ok(self.schemas.clone())
    }
}

pub struct FakeConnectorFactory {
    pub connector: FakeConnector,
}

impl ConnectorFactory for FakeConnectorFactory {
    fn connector(&self, connection: &Connection) -> db_connector::Result<Box<dyn Connector>> {
        if connection.host == "unreachable" {
            return Err(ConnectorError::InvalidConfig("host is unreachable".to_string()));
        }
        Ok(Box::new(self.connector.clone()))
    }
}

fn table(name: &str, tokens: u32) -> Table {
    Table {
        name: name.to_string(),
        structure: format!("CREATE TABLE {name} (\n  id integer NOT NULL\n);"),
        token: Some(tokens),
    }
}

/// One `public` schema with tables of 500, 3600 and 5 tokens.
pub fn fake_connector() -> FakeConnector {
    FakeConnector {
        databases: vec!["app".to_string(), "postgres".to_string()],
        schemas: vec![Schema {
            name: "public".to_string(),
            tables: vec![table("t1", 500), table("t2", 3600), table("t3", 5)],
        }],
        executed: Arc::new(Mutex::new(Vec::new())),
        schema_delay: Duration::ZERO,
    }
}

/// State counting one token per character, relaying to `endpoint`.
pub fn test_state(endpoint: &str, api_key: Option<&str>, connector: FakeConnector) -> AppState {
    let mut config = Config::default();
    config.openai_api_key = api_key.map(str::to_string);
    config.openai_api_endpoint = endpoint.to_string();

    let mut state = AppState::new(
        config,
        Arc::new(HeuristicTokenCounter::new(1.0, 1.0)),
        Arc::new(FakeConnectorFactory { connector }),
    );
    state.relay = OpenAIRelay::new(RelayConfig::from(&state.config))
        .with_client(reqwest::Client::builder().no_proxy().build().unwrap());
    state
}

pub fn connection_body() -> Value {
    json!({
        "title": "local",
        "engineType": "POSTGRESQL",
        "host": "localhost",
        "port": "5432",
        "username": "postgres",
        "password": "secret"
    })
}

pub fn sse_body(events: &[&str]) -> String {
    events
        .iter()
        .map(|data| format!("data: {data}\n\n"))
        .collect()
}

pub fn delta(text: &str) -> String {
    json!({"choices": [{"delta": {"content": text}}]}).to_string()
}
