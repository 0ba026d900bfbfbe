//! Default table selection.
//!
//! Selection is a greedy prefix in declaration order, not a knapsack: the
//! first table that would push the running total over the budget ends the
//! selection, even if a later table is small enough to fit.

use chat_core::{Schema, SelectionState, Table};

use crate::composer::resolve_schema;
use crate::counter::TokenCounter;

/// Longest prefix of `tables` whose cumulative token count stays within `budget`.
pub fn select_default_tables<'a>(
    tables: &'a [Table],
    budget: i64,
    counter: &dyn TokenCounter,
) -> Vec<&'a Table> {
    if budget <= 0 {
        return Vec::new();
    }

    let mut used: i64 = 0;
    let mut selected = Vec::new();
    for table in tables {
        used += i64::from(table.token_count_with(|s| counter.count_text(s)));
        if used > budget {
            break;
        }
        selected.push(table);
    }
    selected
}

/// Fill an untouched selection with the default tables of its schema.
///
/// Runs once per schema of a conversation. Returns `false` without changing
/// anything when the user already chose tables (an explicit empty choice
/// included) or when the schema is not loaded yet.
pub fn apply_default_selection(
    state: &mut SelectionState,
    schemas: &[Schema],
    budget: i64,
    counter: &dyn TokenCounter,
) -> bool {
    if !state.needs_default_selection() {
        return false;
    }
    let Some(schema) = resolve_schema(schemas, &state.selected_schema_name) else {
        return false;
    };

    let names: Vec<String> = select_default_tables(&schema.tables, budget, counter)
        .into_iter()
        .map(|table| table.name.clone())
        .collect();
    log::debug!(
        "Default selection for schema '{}': {} of {} tables",
        schema.name,
        names.len(),
        schema.tables.len()
    );
    state.set_tables(names);
    true
}

/// Tokens of the currently selected tables, shown as `used/max` next to the
/// table list. Names missing from the schema count as zero.
pub fn selected_token_total(
    state: &SelectionState,
    schemas: &[Schema],
    counter: &dyn TokenCounter,
) -> u32 {
    let Some(schema) = resolve_schema(schemas, &state.selected_schema_name) else {
        return 0;
    };
    let count = |table: &Table| table.token_count_with(|s| counter.count_text(s));

    match state.table_names() {
        Some(names) => names
            .iter()
            .filter_map(|name| schema.table(name))
            .map(count)
            .fold(0u32, |acc, x| acc.saturating_add(x)),
        None => schema
            .tables
            .iter()
            .map(count)
            .fold(0u32, |acc, x| acc.saturating_add(x)),
    }
}
