//! Conversations, their messages and the per-conversation table selection.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{generate_id, Id};

/// Which schema and which tables are in scope for a conversation.
///
/// `selected_table_name_list` distinguishes two states that used to be
/// conflated: `Some(vec![])` selects no tables, while `None` (only seen on
/// conversations saved before the field existed) means every table of the
/// selected schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectionState {
    #[serde(default)]
    pub selected_schema_name: String,
    #[serde(default)]
    pub selected_table_name_list: Option<Vec<String>>,
    /// Schemas whose table selection has been initialized, either by the
    /// default selection or by the user.
    #[serde(default)]
    pub initialized_schemas: Vec<String>,
}

impl Default for SelectionState {
    fn default() -> Self {
        Self {
            selected_schema_name: String::new(),
            selected_table_name_list: Some(Vec::new()),
            initialized_schemas: Vec::new(),
        }
    }
}

impl SelectionState {
    /// Switch schema. Table names only make sense inside their schema, so the
    /// table selection is always cleared.
    pub fn select_schema(&mut self, schema_name: impl Into<String>) {
        self.selected_schema_name = schema_name.into();
        self.selected_table_name_list = Some(Vec::new());
    }

    /// Check or uncheck a single table.
    pub fn toggle_table(&mut self, table_name: &str, selected: bool) {
        let list = self.selected_table_name_list.get_or_insert_with(Vec::new);
        if selected {
            if !list.iter().any(|name| name == table_name) {
                list.push(table_name.to_string());
            }
        } else {
            list.retain(|name| name != table_name);
        }
        self.mark_initialized();
    }

    /// Replace the whole table selection. An empty list is a valid choice.
    pub fn set_tables(&mut self, table_names: Vec<String>) {
        self.selected_table_name_list = Some(table_names);
        self.mark_initialized();
    }

    pub fn mark_initialized(&mut self) {
        if !self.is_initialized() {
            self.initialized_schemas
                .push(self.selected_schema_name.clone());
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized_schemas
            .iter()
            .any(|name| name == &self.selected_schema_name)
    }

    /// The default selection may only fill a selection nobody has touched yet.
    pub fn needs_default_selection(&self) -> bool {
        !self.is_initialized()
            && self
                .selected_table_name_list
                .as_ref()
                .map_or(true, |list| list.is_empty())
    }

    pub fn table_names(&self) -> Option<&[String]> {
        self.selected_table_name_list.as_deref()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    pub id: Id,
    pub title: String,
    pub assistant_id: Id,
    #[serde(default)]
    pub connection_id: Option<Id>,
    #[serde(default)]
    pub database_name: Option<String>,
    #[serde(flatten)]
    pub selection: SelectionState,
    pub created_at: DateTime<Utc>,
}

impl Conversation {
    pub fn new(assistant_id: impl Into<Id>, title: impl Into<String>) -> Self {
        Self {
            id: generate_id(),
            title: title.into(),
            assistant_id: assistant_id.into(),
            connection_id: None,
            database_name: None,
            selection: SelectionState::default(),
            created_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CreatorRole {
    System,
    User,
    Assistant,
}

impl CreatorRole {
    /// Role name on the provider wire format.
    pub fn as_str(&self) -> &'static str {
        match self {
            CreatorRole::System => "system",
            CreatorRole::User => "user",
            CreatorRole::Assistant => "assistant",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MessageStatus {
    Loading,
    Done,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: Id,
    pub conversation_id: Id,
    pub creator_role: CreatorRole,
    pub content: String,
    pub status: MessageStatus,
    pub created_at: DateTime<Utc>,
}

impl Message {
    pub fn new(
        conversation_id: impl Into<Id>,
        creator_role: CreatorRole,
        content: impl Into<String>,
        status: MessageStatus,
    ) -> Self {
        Self {
            id: generate_id(),
            conversation_id: conversation_id.into(),
            creator_role,
            content: content.into(),
            status,
            created_at: Utc::now(),
        }
    }

    pub fn user(conversation_id: impl Into<Id>, content: impl Into<String>) -> Self {
        Self::new(conversation_id, CreatorRole::User, content, MessageStatus::Done)
    }

    /// Placeholder for a reply that is still streaming in.
    pub fn pending_reply(conversation_id: impl Into<Id>) -> Self {
        Self::new(
            conversation_id,
            CreatorRole::Assistant,
            String::new(),
            MessageStatus::Loading,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn schema_switch_clears_tables() {
        let mut state = SelectionState::default();
        state.select_schema("public");
        state.set_tables(vec!["users".to_string(), "orders".to_string()]);

        state.select_schema("sales");

        assert_eq!(state.selected_schema_name, "sales");
        assert_eq!(state.table_names(), Some(&[][..]));
    }

    #[test]
    fn switching_to_same_schema_still_clears_tables() {
        let mut state = SelectionState::default();
        state.select_schema("public");
        state.toggle_table("users", true);

        state.select_schema("public");

        assert_eq!(state.table_names(), Some(&[][..]));
    }

    #[test]
    fn toggle_adds_once_and_removes() {
        let mut state = SelectionState::default();
        state.toggle_table("users", true);
        state.toggle_table("users", true);
        state.toggle_table("orders", true);
        assert_eq!(
            state.table_names(),
            Some(&["users".to_string(), "orders".to_string()][..])
        );

        state.toggle_table("users", false);
        assert_eq!(state.table_names(), Some(&["orders".to_string()][..]));
    }

    #[test]
    fn manual_empty_selection_blocks_defaults() {
        let mut state = SelectionState::default();
        state.select_schema("public");
        assert!(state.needs_default_selection());

        state.toggle_table("users", true);
        state.toggle_table("users", false);

        assert_eq!(state.table_names(), Some(&[][..]));
        assert!(!state.needs_default_selection());
    }

    #[test]
    fn legacy_conversation_without_table_list_means_all_tables() {
        let conversation: Conversation = serde_json::from_value(json!({
            "id": "conv-1",
            "title": "old",
            "assistantId": "sql-chat-bot",
            "selectedSchemaName": "public",
            "createdAt": "2023-05-01T00:00:00Z"
        }))
        .unwrap();

        assert_eq!(conversation.selection.table_names(), None);
        assert!(conversation.selection.initialized_schemas.is_empty());
    }

    #[test]
    fn selection_is_flattened_on_the_wire() {
        let mut conversation = Conversation::new("sql-chat-bot", "New chat");
        conversation.selection.select_schema("public");

        let value = serde_json::to_value(&conversation).unwrap();
        assert_eq!(value["selectedSchemaName"], json!("public"));
        assert_eq!(value["selectedTableNameList"], json!([]));
    }

    #[test]
    fn message_status_uses_uppercase() {
        let message = Message::pending_reply("conv-1");
        let value = serde_json::to_value(&message).unwrap();
        assert_eq!(value["status"], json!("LOADING"));
        assert_eq!(value["creatorRole"], json!("assistant"));
    }
}
