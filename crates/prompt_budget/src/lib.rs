//! Prompt budgeting for schema-aware chat.
//!
//! Decides which table definitions of a database schema fit into the prompt
//! for a given model, without any network round-trip.
//!
//! # Key Components
//!
//! - [`counter`]: Token counting (tiktoken `r50k_base`; a heuristic estimator behind `test-utils`)
//! - [`models`]: Registry of model variants and their context budgets
//! - [`selection`]: Default table selection (greedy declaration-order prefix)
//! - [`composer`]: Final prompt composition under the half-budget rule
//! - [`history`]: Earlier conversation turns that fit next to the prompt
//! - [`assistants`]: Prompt-generating assistant personas

pub mod assistants;
pub mod composer;
pub mod counter;
pub mod history;
pub mod models;
pub mod selection;
pub mod types;

pub use assistants::{Assistant, AssistantRegistry, PromptGenerator, DEFAULT_ASSISTANT_ID};
pub use composer::{generate_db_prompt_from_context, resolve_schema, PromptRequest};
#[cfg(any(test, feature = "test-utils"))]
pub use counter::HeuristicTokenCounter;
pub use counter::{SharedTokenCounter, TiktokenCounter, TokenCounter};
pub use history::fit_history;
pub use models::{get_model, models, ModelSpec, DEFAULT_MODEL_NAME};
pub use selection::{apply_default_selection, select_default_tables, selected_token_total};
pub use types::{BudgetError, ComposedPrompt, PromptBudget, TokenizerError};
