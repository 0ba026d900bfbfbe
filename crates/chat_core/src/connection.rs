//! Connection targets and the schema objects fetched from them.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

use crate::Id;

/// Relational database product a connection targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Engine {
    #[serde(rename = "POSTGRESQL")]
    PostgreSQL,
}

impl Engine {
    pub fn as_str(&self) -> &'static str {
        match self {
            Engine::PostgreSQL => "POSTGRESQL",
        }
    }

    /// Whether the engine exposes a schema namespace inside a database.
    pub fn has_schema_property(&self) -> bool {
        matches!(self, Engine::PostgreSQL)
    }
}

impl fmt::Display for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// TLS material for a connection, PEM encoded.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SslOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ca: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cert: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reject_unauthorized: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Connection {
    pub id: Id,
    pub title: String,
    pub engine_type: Engine,
    pub host: String,
    pub port: String,
    pub username: String,
    pub password: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ssl: Option<SslOptions>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Database {
    pub connection_id: Id,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Table {
    pub name: String,
    /// Rendered DDL-like description of the table.
    pub structure: String,
    /// Cached token count of `structure`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<u32>,
}

impl Table {
    pub fn new(name: impl Into<String>, structure: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            structure: structure.into(),
            token: None,
        }
    }

    /// Cached token count, or `count(structure)` when the cache is empty.
    /// Older cached schemas may not carry a count.
    pub fn token_count_with<F>(&self, count: F) -> u32
    where
        F: FnOnce(&str) -> u32,
    {
        self.token.unwrap_or_else(|| count(&self.structure))
    }

    /// Fill the cache once; an existing count is never replaced.
    pub fn freeze_token_with<F>(&mut self, count: F) -> u32
    where
        F: FnOnce(&str) -> u32,
    {
        *self.token.get_or_insert_with(|| count(&self.structure))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schema {
    pub name: String,
    pub tables: Vec<Table>,
}

impl Schema {
    pub fn table(&self, name: &str) -> Option<&Table> {
        self.tables.iter().find(|table| table.name == name)
    }
}

/// Outcome of running a statement. Failures are carried in `error` rather
/// than raised, so transport and SQL errors render the same way.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionResult {
    pub raw_result: Vec<Map<String, Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub affected_rows: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ExecutionResult {
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            raw_result: Vec::new(),
            affected_rows: None,
            error: Some(error.into()),
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}
