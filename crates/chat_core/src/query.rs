use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Connection, Database, Id};

/// What a statement was run against, and from which message it came.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecuteQueryContext {
    pub connection: Connection,
    #[serde(default)]
    pub database: Option<Database>,
    #[serde(default)]
    pub message_id: Option<Id>,
    pub statement: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryHistory {
    pub context: ExecuteQueryContext,
    /// Whether the statement was a read-only SELECT.
    #[serde(default)]
    pub is_select: bool,
    pub created_at: DateTime<Utc>,
}

impl QueryHistory {
    pub fn new(context: ExecuteQueryContext) -> Self {
        let is_select = crate::sql::check_statement_is_select(&context.statement);
        Self {
            context,
            is_select,
            created_at: Utc::now(),
        }
    }
}
