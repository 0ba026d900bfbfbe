//! Final prompt composition.
//!
//! Accounting starts with the question's tokens. Tables are walked in order
//! and each one is included while the running total is still below half of
//! the budget; the other half stays free for the generated preamble and the
//! model's answer. The walk stops at the first table that finds the total at
//! or above the half mark.

use chat_core::{Engine, Schema, Table};

use crate::assistants::PromptGenerator;
use crate::counter::TokenCounter;
use crate::types::{BudgetError, ComposedPrompt, PromptBudget};

/// Separator between table structures in the rendered schema text.
const TABLE_SEPARATOR: &str = "\n\n";

/// Inputs of one prompt composition.
#[derive(Clone, Copy)]
pub struct PromptRequest<'a> {
    pub prompt_generator: PromptGenerator,
    pub engine: Option<Engine>,
    pub schemas: &'a [Schema],
    pub selected_schema_name: &'a str,
    /// `Some` selects exactly these tables (possibly none); `None` selects
    /// every table of the schema.
    pub selected_table_names: Option<&'a [String]>,
    pub budget: i64,
    pub question: &'a str,
}

/// Find a schema by name. An empty name never matches.
pub fn resolve_schema<'a>(schemas: &'a [Schema], name: &str) -> Option<&'a Schema> {
    if name.is_empty() {
        return None;
    }
    schemas.iter().find(|schema| schema.name == name)
}

fn candidate_tables<'a>(
    schema: Option<&'a Schema>,
    schema_name: &str,
    table_names: Option<&[String]>,
) -> Result<Vec<&'a Table>, BudgetError> {
    match table_names {
        Some(names) => names
            .iter()
            .map(|name| {
                schema
                    .and_then(|schema| schema.table(name))
                    .ok_or_else(|| BudgetError::TableNotFound {
                        schema: schema_name.to_string(),
                        table: name.clone(),
                    })
            })
            .collect(),
        None => Ok(schema
            .map(|schema| schema.tables.iter().collect())
            .unwrap_or_default()),
    }
}

/// Select the tables that fit and render the final prompt.
///
/// # Errors
///
/// [`BudgetError::TableNotFound`] when a selected table name does not exist
/// in the resolved schema. Callers own the selection, so this is a contract
/// violation and is not skipped silently.
pub fn generate_db_prompt_from_context(
    request: &PromptRequest<'_>,
    counter: &dyn TokenCounter,
) -> Result<ComposedPrompt, BudgetError> {
    let schema = resolve_schema(request.schemas, request.selected_schema_name);
    let candidates = candidate_tables(
        schema,
        request.selected_schema_name,
        request.selected_table_names,
    )?;

    let mut used = i64::from(counter.count_text(request.question));
    let mut included_tables = Vec::new();
    for table in candidates {
        // used < budget / 2, without integer truncation of the half
        if 2 * used >= request.budget {
            break;
        }
        used += i64::from(table.token_count_with(|s| counter.count_text(s)));
        included_tables.push(table.clone());
    }

    let schema_text = included_tables
        .iter()
        .map(|table| table.structure.as_str())
        .collect::<Vec<_>>()
        .join(TABLE_SEPARATOR);
    let schema_text = (!schema_text.is_empty()).then_some(schema_text.as_str());

    log::debug!(
        "Composed prompt with {} tables, {} of {} tokens used",
        included_tables.len(),
        used,
        request.budget
    );

    Ok(ComposedPrompt {
        prompt: (request.prompt_generator)(request.engine, schema_text),
        budget: PromptBudget {
            used,
            remaining: request.budget - used,
            included_tables,
        },
    })
}
