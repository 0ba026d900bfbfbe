//! Persisted session state.
//!
//! Loading goes through [`SessionSnapshot::rehydrate`], which applies a fixed
//! reset list to fields that must not survive a restart:
//! - `query_context` is cleared;
//! - messages still `LOADING` become `FAILED`, since their stream is gone.

use chat_core::{
    Connection, Conversation, ExecuteQueryContext, Message, MessageStatus, QueryHistory,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    #[serde(default)]
    pub connections: Vec<Connection>,
    #[serde(default)]
    pub conversations: Vec<Conversation>,
    #[serde(default)]
    pub messages: Vec<Message>,
    #[serde(default)]
    pub query_history: Vec<QueryHistory>,
    #[serde(default)]
    pub query_context: Option<ExecuteQueryContext>,
}

impl SessionSnapshot {
    pub fn rehydrate(mut self) -> Self {
        self.query_context = None;
        for message in &mut self.messages {
            if message.status == MessageStatus::Loading {
                message.status = MessageStatus::Failed;
            }
        }
        self
    }
}
