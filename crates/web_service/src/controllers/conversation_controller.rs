use actix_web::{delete, get, post, put, web, HttpRequest, HttpResponse};
use bytes::Bytes;
use chat_core::{Conversation, Message, MessageStatus};
use futures_util::StreamExt;
use llm_relay::RelayOutcome;
use prompt_budget::{apply_default_selection, get_model, selected_token_total, DEFAULT_ASSISTANT_ID};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

use super::chat_controller::{relay_request, upstream_response};
use crate::{
    dto::{
        CreateConversationRequest, ModelQuery, QuestionRequest, SelectSchemaRequest,
        TableSelectionRequest, TokenUsage, UpdateConversationRequest,
    },
    error::{AppError, Result},
    server::AppState,
    services::prompt_service::{build_chat_messages, compose_prompt, load_schema_context},
};

const DEFAULT_CONVERSATION_TITLE: &str = "SQL Chat";
const MESSAGE_ID_HEADER: &str = "x-message-id";

async fn find_conversation(state: &AppState, id: &str) -> Result<Conversation> {
    state
        .conversations
        .get(id)
        .await
        .ok_or_else(|| AppError::NotFound(format!("Conversation {id}")))
}

async fn ensure_connection_exists(state: &AppState, connection_id: Option<&str>) -> Result<()> {
    if let Some(id) = connection_id {
        if state.connections.get(id).await.is_none() {
            return Err(AppError::BadRequest(format!("unknown connection {id}")));
        }
    }
    Ok(())
}

/// Apply `f` to a stored conversation, persist, and answer with the result.
async fn update_and_respond<F>(state: &AppState, id: &str, f: F) -> Result<HttpResponse>
where
    F: FnOnce(&mut Conversation),
{
    let conversation = state
        .conversations
        .update(id, f)
        .await
        .ok_or_else(|| AppError::NotFound(format!("Conversation {id}")))?;
    state.persist().await?;
    Ok(HttpResponse::Ok().json(conversation))
}

#[get("/conversations")]
pub async fn list_conversations(state: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok().json(state.conversations.list().await)
}

#[post("/conversations")]
pub async fn create_conversation(
    state: web::Data<AppState>,
    body: web::Json<CreateConversationRequest>,
) -> Result<HttpResponse> {
    let request = body.into_inner();
    ensure_connection_exists(&state, request.connection_id.as_deref()).await?;

    let mut conversation = Conversation::new(
        request
            .assistant_id
            .unwrap_or_else(|| DEFAULT_ASSISTANT_ID.to_string()),
        request
            .title
            .filter(|title| !title.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_CONVERSATION_TITLE.to_string()),
    );
    conversation.connection_id = request.connection_id;
    conversation.database_name = request.database_name;

    let conversation = state.conversations.create(conversation).await;
    state.persist().await?;
    Ok(HttpResponse::Created().json(conversation))
}

#[get("/conversations/{id}")]
pub async fn get_conversation(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse> {
    let conversation = find_conversation(&state, &path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(conversation))
}

#[put("/conversations/{id}")]
pub async fn update_conversation(
    state: web::Data<AppState>,
    path: web::Path<String>,
    body: web::Json<UpdateConversationRequest>,
) -> Result<HttpResponse> {
    let id = path.into_inner();
    let request = body.into_inner();
    ensure_connection_exists(&state, request.connection_id.as_deref()).await?;

    update_and_respond(&state, &id, move |conversation| {
        if let Some(title) = request.title {
            conversation.title = title;
        }
        if let Some(assistant_id) = request.assistant_id {
            conversation.assistant_id = assistant_id;
        }

        let mut moved = false;
        if request.connection_id.is_some() && request.connection_id != conversation.connection_id {
            conversation.connection_id = request.connection_id;
            conversation.database_name = None;
            moved = true;
        }
        if request.database_name.is_some() && request.database_name != conversation.database_name {
            conversation.database_name = request.database_name;
            moved = true;
        }
        if moved {
            conversation.selection = Default::default();
        }
    })
    .await
}

#[delete("/conversations/{id}")]
pub async fn delete_conversation(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse> {
    let id = path.into_inner();
    if !state.conversations.delete(&id).await {
        return Err(AppError::NotFound(format!("Conversation {id}")));
    }
    state.persist().await?;
    Ok(HttpResponse::NoContent().finish())
}

#[put("/conversations/{id}/schema")]
pub async fn select_schema(
    state: web::Data<AppState>,
    path: web::Path<String>,
    body: web::Json<SelectSchemaRequest>,
) -> Result<HttpResponse> {
    let schema_name = body.into_inner().schema_name;
    update_and_respond(&state, &path.into_inner(), move |conversation| {
        conversation.selection.select_schema(schema_name);
    })
    .await
}

#[put("/conversations/{id}/tables")]
pub async fn select_tables(
    state: web::Data<AppState>,
    path: web::Path<String>,
    body: web::Json<TableSelectionRequest>,
) -> Result<HttpResponse> {
    let request = body.into_inner();
    update_and_respond(&state, &path.into_inner(), move |conversation| match request {
        TableSelectionRequest::Toggle {
            table_name,
            selected,
        } => conversation.selection.toggle_table(&table_name, selected),
        TableSelectionRequest::Replace { table_names } => {
            conversation.selection.set_tables(table_names)
        }
    })
    .await
}

/// Fill an untouched selection with the tables that fit the model budget.
#[post("/conversations/{id}/default-selection")]
pub async fn default_selection(
    state: web::Data<AppState>,
    path: web::Path<String>,
    query: web::Query<ModelQuery>,
) -> Result<HttpResponse> {
    let id = path.into_inner();
    let conversation = find_conversation(&state, &id).await?;
    let context = load_schema_context(&state, &conversation).await?;
    let model = get_model(query.model.as_deref().unwrap_or_default());

    // The schema fetch above may take a while; apply against the stored
    // selection so a choice made in the meantime wins.
    let mut applied = false;
    let current = state
        .conversations
        .update(&id, |current| {
            if current.connection_id != conversation.connection_id
                || current.database_name != conversation.database_name
            {
                return;
            }
            applied = apply_default_selection(
                &mut current.selection,
                &context.schemas,
                model.budget(),
                state.counter.as_ref(),
            );
        })
        .await
        .ok_or_else(|| AppError::NotFound(format!("Conversation {id}")))?;

    if applied {
        state.persist().await?;
    }
    Ok(HttpResponse::Ok().json(current))
}

#[get("/conversations/{id}/token-usage")]
pub async fn token_usage(
    state: web::Data<AppState>,
    path: web::Path<String>,
    query: web::Query<ModelQuery>,
) -> Result<HttpResponse> {
    let conversation = find_conversation(&state, &path.into_inner()).await?;
    let context = load_schema_context(&state, &conversation).await?;
    let model = get_model(query.model.as_deref().unwrap_or_default());

    Ok(HttpResponse::Ok().json(TokenUsage {
        used: selected_token_total(
            &conversation.selection,
            &context.schemas,
            state.counter.as_ref(),
        ),
        max: model.max_token,
    }))
}

#[post("/conversations/{id}/prompt")]
pub async fn compose(
    state: web::Data<AppState>,
    path: web::Path<String>,
    body: web::Json<QuestionRequest>,
) -> Result<HttpResponse> {
    let conversation = find_conversation(&state, &path.into_inner()).await?;
    let request = body.into_inner();
    let context = load_schema_context(&state, &conversation).await?;
    let model = get_model(request.model.as_deref().unwrap_or_default());

    let composed = compose_prompt(&state, &conversation, &context, model, &request.question)?;
    Ok(HttpResponse::Ok().json(composed))
}

#[get("/conversations/{id}/messages")]
pub async fn list_messages(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse> {
    let conversation = find_conversation(&state, &path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(state.conversations.messages(&conversation.id).await))
}

/// Ask a question inside a conversation. The reply is streamed back as plain
/// text and stored as an assistant message once the stream ends.
#[post("/conversations/{id}/chat")]
pub async fn chat(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<String>,
    body: web::Json<QuestionRequest>,
) -> Result<HttpResponse> {
    let conversation = find_conversation(&state, &path.into_inner()).await?;
    let QuestionRequest { question, model } = body.into_inner();
    if question.trim().is_empty() {
        return Err(AppError::BadRequest("question is empty".to_string()));
    }

    let mut request = relay_request(&req, Vec::new());
    request.model = model.or(request.model);
    let model = get_model(request.model.as_deref().unwrap_or_default());

    let context = load_schema_context(&state, &conversation).await?;
    let composed = compose_prompt(&state, &conversation, &context, model, &question)?;
    let history = state.conversations.messages(&conversation.id).await;
    request.messages = build_chat_messages(
        &composed.prompt,
        &history,
        &question,
        model.budget(),
        state.counter.as_ref(),
    );

    let reply = Message::pending_reply(conversation.id.clone());
    let reply_id = reply.id.clone();
    state
        .conversations
        .push_message(Message::user(conversation.id.clone(), question))
        .await;
    state.conversations.push_message(reply).await;
    state.persist().await?;

    tracing::info!(
        conversation_id = %conversation.id,
        message_id = %reply_id,
        model = model.name,
        included_tables = composed.budget.included_tables.len(),
        "Relaying conversation question"
    );

    let response = match state.relay.send(request).await {
        Ok(response) => response,
        Err(e) => {
            fail_reply(&state, &reply_id).await;
            return Err(e.into());
        }
    };

    let mut tokens = match response.outcome {
        RelayOutcome::Upstream {
            status,
            content_type,
            body,
        } => {
            fail_reply(&state, &reply_id).await;
            return Ok(upstream_response(status, content_type, body));
        }
        RelayOutcome::Stream(tokens) => tokens,
    };

    let (tx, rx) = mpsc::channel::<std::result::Result<Bytes, AppError>>(16);
    let task_state = state.clone();
    let task_reply_id = reply_id.clone();
    tokio::spawn(async move {
        let mut content = String::new();
        let mut status = MessageStatus::Done;

        while let Some(item) = tokens.next().await {
            match item {
                Ok(delta) => {
                    content.push_str(&delta);
                    if tx.send(Ok(Bytes::from(delta))).await.is_err() {
                        // Client went away; dropping `tokens` closes upstream.
                        tracing::info!(message_id = %task_reply_id, "Client disconnected mid-stream");
                        status = MessageStatus::Failed;
                        break;
                    }
                }
                Err(e) => {
                    tracing::error!(message_id = %task_reply_id, error = %e, "Reply stream failed");
                    status = MessageStatus::Failed;
                    let _ = tx.send(Err(AppError::from(e))).await;
                    break;
                }
            }
        }
        drop(tokens);

        task_state
            .conversations
            .finish_message(&task_reply_id, content, status)
            .await;
        if let Err(e) = task_state.persist().await {
            tracing::error!(error = %e, "Failed to persist session after reply");
        }
        // The response body ends only once the reply is stored.
        drop(tx);
    });

    Ok(HttpResponse::Ok()
        .content_type("text/plain; charset=utf-8")
        .insert_header((MESSAGE_ID_HEADER, reply_id))
        .streaming(ReceiverStream::new(rx)))
}

async fn fail_reply(state: &AppState, reply_id: &str) {
    state
        .conversations
        .finish_message(reply_id, String::new(), MessageStatus::Failed)
        .await;
    if let Err(e) = state.persist().await {
        tracing::error!(error = %e, "Failed to persist session after failed reply");
    }
}

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(list_conversations)
        .service(create_conversation)
        .service(get_conversation)
        .service(update_conversation)
        .service(delete_conversation)
        .service(select_schema)
        .service(select_tables)
        .service(default_selection)
        .service(token_usage)
        .service(compose)
        .service(list_messages)
        .service(chat);
}
