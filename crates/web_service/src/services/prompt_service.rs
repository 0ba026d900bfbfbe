//! Glue between a conversation and the prompt budgeter.

use chat_core::{Conversation, Engine, Message, Schema};
use llm_relay::ChatMessage;
use prompt_budget::{
    fit_history, generate_db_prompt_from_context, ComposedPrompt, ModelSpec, PromptRequest,
    TokenCounter,
};

use crate::error::Result;
use crate::server::AppState;

/// Engine and schema list a conversation's prompt is built from.
#[derive(Debug, Clone, Default)]
pub struct SchemaContext {
    pub engine: Option<Engine>,
    pub schemas: Vec<Schema>,
}

/// Resolve the conversation's connection and fetch (or reuse) the schemas of
/// its database. A conversation without a connection, or whose connection
/// was deleted, chats as a general bot.
pub async fn load_schema_context(
    state: &AppState,
    conversation: &Conversation,
) -> Result<SchemaContext> {
    let Some(connection_id) = conversation.connection_id.as_deref() else {
        return Ok(SchemaContext::default());
    };
    let Some(connection) = state.connections.get(connection_id).await else {
        tracing::warn!(
            conversation_id = %conversation.id,
            connection_id = %connection_id,
            "Conversation refers to a missing connection"
        );
        return Ok(SchemaContext::default());
    };

    let schemas = match conversation.database_name.as_deref() {
        Some(database) if !database.is_empty() => {
            state
                .connections
                .schemas(
                    &connection,
                    database,
                    state.connectors.as_ref(),
                    state.counter.as_ref(),
                )
                .await?
        }
        _ => Vec::new(),
    };

    Ok(SchemaContext {
        engine: Some(connection.engine_type),
        schemas,
    })
}

/// Compose the system prompt for `question` under the model's budget.
pub fn compose_prompt(
    state: &AppState,
    conversation: &Conversation,
    context: &SchemaContext,
    model: &ModelSpec,
    question: &str,
) -> Result<ComposedPrompt> {
    let assistant = state.assistants.get(&conversation.assistant_id);
    let request = PromptRequest {
        prompt_generator: assistant.prompt_generator,
        engine: context.engine,
        schemas: &context.schemas,
        selected_schema_name: &conversation.selection.selected_schema_name,
        selected_table_names: conversation.selection.table_names(),
        budget: model.budget(),
        question,
    };
    Ok(generate_db_prompt_from_context(
        &request,
        state.counter.as_ref(),
    )?)
}

/// Message list sent upstream: the system prompt, then as many earlier
/// completed turns as still fit, then the question.
pub fn build_chat_messages(
    system_prompt: &str,
    history: &[Message],
    question: &str,
    budget: i64,
    counter: &dyn TokenCounter,
) -> Vec<ChatMessage> {
    let used = i64::from(counter.count_text(system_prompt)) + i64::from(counter.count_text(question));

    let mut messages = vec![ChatMessage::system(system_prompt)];
    messages.extend(
        fit_history(history, used, budget, counter)
            .into_iter()
            .map(|message| ChatMessage::new(message.creator_role, message.content.clone())),
    );
    messages.push(ChatMessage::user(question));
    messages
}
