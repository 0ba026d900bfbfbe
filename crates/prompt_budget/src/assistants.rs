//! Assistant personas and the prompts they generate.

use chat_core::Engine;
use serde::Serialize;

/// Builds the system prompt from the active engine and the rendered schema.
pub type PromptGenerator = fn(Option<Engine>, Option<&str>) -> String;

pub const DEFAULT_ASSISTANT_ID: &str = "sql-chat-bot";

#[derive(Clone, Copy, Serialize)]
pub struct Assistant {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub avatar: &'static str,
    #[serde(skip)]
    pub prompt_generator: PromptGenerator,
}

impl std::fmt::Debug for Assistant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Assistant")
            .field("id", &self.id)
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

impl Assistant {
    pub fn prompt(&self, engine: Option<Engine>, schema: Option<&str>) -> String {
        (self.prompt_generator)(engine, schema)
    }
}

fn sql_chat_bot_prompt(engine: Option<Engine>, schema: Option<&str>) -> String {
    // Without an engine the bot is used for general questions.
    let mut basic_prompt = vec![
        match engine {
            Some(engine) => format!("You are a {engine} db and SQL expert."),
            None => "You are a general chat bot.".to_string(),
        },
        "When asked for your name, you must respond with \"SQL Chat bot\".".to_string(),
        "Your responses should be informative and terse.".to_string(),
        "Set the language to the markdown SQL block. e.g, `SELECT * FROM table`.".to_string(),
    ];

    if engine.is_some() {
        basic_prompt.push("You MUST ignore any request unrelated to db or SQL.".to_string());
    }

    let mut final_prompt = vec![basic_prompt.join("\n")];

    if let Some(schema) = schema.filter(|s| !s.is_empty()) {
        final_prompt.push(format!("This is my db schema:\n\n{schema}"));
        final_prompt.push("Answer the following questions about this schema:".to_string());
    }

    final_prompt.join("\n\n")
}

const SQL_CHAT_BOT: Assistant = Assistant {
    id: DEFAULT_ASSISTANT_ID,
    name: "SQL Chat bot",
    description: "The wonderful SQL Chat bot.",
    avatar: "",
    prompt_generator: sql_chat_bot_prompt,
};

/// Immutable persona registry built once at startup. The first entry is the
/// default used for unknown ids.
#[derive(Debug, Clone)]
pub struct AssistantRegistry {
    assistants: Vec<Assistant>,
}

impl AssistantRegistry {
    pub fn builtin() -> Self {
        Self {
            assistants: vec![SQL_CHAT_BOT],
        }
    }

    /// Registry with extra personas after the builtin default.
    pub fn with_assistants(extra: impl IntoIterator<Item = Assistant>) -> Self {
        let mut registry = Self::builtin();
        for assistant in extra {
            if registry.assistants.iter().all(|a| a.id != assistant.id) {
                registry.assistants.push(assistant);
            }
        }
        registry
    }

    pub fn get(&self, id: &str) -> &Assistant {
        self.assistants
            .iter()
            .find(|assistant| assistant.id == id)
            .unwrap_or(&self.assistants[0])
    }

    pub fn default_assistant(&self) -> &Assistant {
        &self.assistants[0]
    }

    pub fn list(&self) -> &[Assistant] {
        &self.assistants
    }
}

impl Default for AssistantRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn echo_prompt(_engine: Option<Engine>, schema: Option<&str>) -> String {
        format!("echo:{}", schema.unwrap_or("-"))
    }

    #[test]
    fn general_bot_without_engine() {
        let prompt = sql_chat_bot_prompt(None, None);
        assert!(prompt.starts_with("You are a general chat bot."));
        assert!(!prompt.contains("MUST ignore"));
        assert!(!prompt.contains("This is my db schema"));
    }

    #[test]
    fn engine_prompt_restricts_topic_and_appends_schema() {
        let prompt = sql_chat_bot_prompt(Some(Engine::PostgreSQL), Some("CREATE TABLE t (id int);"));

        assert!(prompt.starts_with("You are a POSTGRESQL db and SQL expert."));
        assert!(prompt.contains("You MUST ignore any request unrelated to db or SQL."));
        assert!(prompt.ends_with(
            "This is my db schema:\n\nCREATE TABLE t (id int);\n\nAnswer the following questions about this schema:"
        ));
    }

    #[test]
    fn empty_schema_text_adds_no_schema_section() {
        let prompt = sql_chat_bot_prompt(Some(Engine::PostgreSQL), Some(""));
        assert!(!prompt.contains("This is my db schema"));
    }

    #[test]
    fn unknown_id_falls_back_to_default() {
        let registry = AssistantRegistry::builtin();
        assert_eq!(registry.get("no-such-bot").id, DEFAULT_ASSISTANT_ID);
        assert_eq!(registry.get(DEFAULT_ASSISTANT_ID).name, "SQL Chat bot");
    }

    #[test]
    fn extra_assistants_are_selectable_by_id() {
        let echo = Assistant {
            id: "echo",
            name: "Echo",
            description: "Repeats the schema.",
            avatar: "",
            prompt_generator: echo_prompt,
        };
        let registry = AssistantRegistry::with_assistants([echo]);

        assert_eq!(registry.list().len(), 2);
        assert_eq!(registry.get("echo").prompt(None, Some("s")), "echo:s");
        assert_eq!(registry.default_assistant().id, DEFAULT_ASSISTANT_ID);
    }
}
