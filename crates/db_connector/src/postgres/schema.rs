//! Turning `information_schema.columns` rows into [`Schema`] values.

use chat_core::{Schema, Table};

/// Columns of every user table, in the order they are grouped.
pub(crate) const COLUMNS_QUERY: &str = "SELECT table_schema, table_name, column_name, data_type, is_nullable, column_default \
     FROM information_schema.columns \
     WHERE table_schema NOT IN ('pg_catalog', 'information_schema') \
     AND table_schema NOT LIKE 'pg_toast%' \
     ORDER BY table_schema, table_name, ordinal_position";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnInfo {
    pub schema: String,
    pub table: String,
    pub name: String,
    pub data_type: String,
    pub nullable: bool,
    pub default: Option<String>,
}

/// Render a table as a `CREATE TABLE` statement, one column per line.
pub fn render_table_structure(table: &str, columns: &[ColumnInfo]) -> String {
    let lines: Vec<String> = columns
        .iter()
        .map(|column| {
            let mut line = format!("  {} {}", column.name, column.data_type);
            if !column.nullable {
                line.push_str(" NOT NULL");
            }
            if let Some(default) = &column.default {
                line.push_str(" DEFAULT ");
                line.push_str(default);
            }
            line
        })
        .collect();

    format!("CREATE TABLE {} (\n{}\n);", table, lines.join(",\n"))
}

fn flush_table(pending: &mut Vec<ColumnInfo>, schemas: &mut Vec<Schema>) {
    let Some(first) = pending.first() else {
        return;
    };
    let table = Table::new(first.table.clone(), render_table_structure(&first.table, pending));
    match schemas.last_mut() {
        Some(schema) if schema.name == first.schema => schema.tables.push(table),
        _ => schemas.push(Schema {
            name: first.schema.clone(),
            tables: vec![table],
        }),
    }
    pending.clear();
}

/// Group columns by schema then table. Input must be sorted by schema and
/// table; schemas and tables keep their first-seen order.
pub fn group_columns_into_schemas(columns: Vec<ColumnInfo>) -> Vec<Schema> {
    let mut schemas: Vec<Schema> = Vec::new();
    let mut pending: Vec<ColumnInfo> = Vec::new();

    for column in columns {
        let same_table = pending
            .first()
            .map(|first| first.schema == column.schema && first.table == column.table)
            .unwrap_or(true);
        if !same_table {
            flush_table(&mut pending, &mut schemas);
        }
        pending.push(column);
    }
    flush_table(&mut pending, &mut schemas);

    schemas
}
