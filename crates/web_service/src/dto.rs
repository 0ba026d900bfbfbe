//! Request and response bodies of the HTTP surface.
use chat_core::{generate_id, Connection, Engine, Id, SslOptions};
use llm_relay::ChatMessage;
use serde::{Deserialize, Serialize};

/// Connection as entered by the user. The id is assigned by the server.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionPayload {
    pub title: String,
    pub engine_type: Engine,
    pub host: String,
    pub port: String,
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub database: Option<String>,
    #[serde(default)]
    pub ssl: Option<SslOptions>,
}

impl ConnectionPayload {
    pub fn into_connection(self, id: Option<Id>) -> Connection {
        Connection {
            id: id.unwrap_or_else(generate_id),
            title: self.title,
            engine_type: self.engine_type,
            host: self.host,
            port: self.port,
            username: self.username,
            password: self.password,
            database: self.database.filter(|name| !name.is_empty()),
            ssl: self.ssl,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecuteRequest {
    pub database_name: Option<String>,
    pub statement: String,
    #[serde(default)]
    pub message_id: Option<Id>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateConversationRequest {
    pub title: Option<String>,
    pub assistant_id: Option<Id>,
    pub connection_id: Option<Id>,
    pub database_name: Option<String>,
}

/// Partial update. Moving a conversation to another connection or database
/// resets its table selection.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateConversationRequest {
    pub title: Option<String>,
    pub assistant_id: Option<Id>,
    pub connection_id: Option<Id>,
    pub database_name: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectSchemaRequest {
    pub schema_name: String,
}

#[derive(Debug, Deserialize)]
#[serde(untagged, rename_all = "camelCase")]
pub enum TableSelectionRequest {
    #[serde(rename_all = "camelCase")]
    Toggle { table_name: String, selected: bool },
    #[serde(rename_all = "camelCase")]
    Replace { table_names: Vec<String> },
}

#[derive(Debug, Default, Deserialize)]
pub struct ModelQuery {
    pub model: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct QuestionRequest {
    pub question: String,
    #[serde(default)]
    pub model: Option<String>,
}

/// Body of the raw relay endpoint.
#[derive(Debug, Deserialize)]
pub struct RelayChatRequest {
    pub messages: Vec<ChatMessage>,
}

/// `used/max` indicator next to the table list.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct TokenUsage {
    pub used: u32,
    pub max: u32,
}
