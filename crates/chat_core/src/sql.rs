/// Whether the statement is a SELECT, ignoring case and surrounding whitespace.
pub fn check_statement_is_select(statement: &str) -> bool {
    statement.trim().to_uppercase().starts_with("SELECT")
}
