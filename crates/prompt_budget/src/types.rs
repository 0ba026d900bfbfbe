//! Core types for prompt budgeting.

use chat_core::Table;
use serde::Serialize;
use thiserror::Error;

/// Token accounting for one composed prompt. Recomputed on every call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptBudget {
    /// Tokens of the question plus every included table.
    pub used: i64,
    /// `budget - used`; negative when the last included table overshot.
    pub remaining: i64,
    /// Tables whose structure made it into the prompt, in order.
    pub included_tables: Vec<Table>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ComposedPrompt {
    pub prompt: String,
    pub budget: PromptBudget,
}

/// Errors that can occur during prompt composition.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum BudgetError {
    /// A selected table name does not exist in the selected schema.
    #[error("table '{table}' not found in schema '{schema}'")]
    TableNotFound { schema: String, table: String },
}

#[derive(Debug, Error)]
pub enum TokenizerError {
    #[error("failed to load tokenizer: {0}")]
    Init(String),
}
