use actix_web::{delete, get, post, put, web, HttpResponse};
use chat_core::{Connection, Database, ExecuteQueryContext};

use crate::{
    dto::{ConnectionPayload, ExecuteRequest},
    error::{AppError, Result},
    server::AppState,
};

async fn find_connection(state: &AppState, id: &str) -> Result<Connection> {
    state
        .connections
        .get(id)
        .await
        .ok_or_else(|| AppError::NotFound(format!("Connection {id}")))
}

#[post("/connection/test")]
pub async fn test_connection(
    state: web::Data<AppState>,
    payload: web::Json<ConnectionPayload>,
) -> Result<HttpResponse> {
    let connection = payload.into_inner().into_connection(None);
    let connector = state.connectors.connector(&connection)?;

    match connector.test_connection().await {
        Ok(true) => Ok(HttpResponse::Ok().json(true)),
        Ok(false) => Ok(HttpResponse::BadRequest().json(false)),
        Err(e) => {
            tracing::warn!(host = %connection.host, error = %e, "Connection test failed");
            Ok(HttpResponse::BadRequest().json(false))
        }
    }
}

#[get("/connections")]
pub async fn list_connections(state: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok().json(state.connections.list().await)
}

#[post("/connections")]
pub async fn create_connection(
    state: web::Data<AppState>,
    payload: web::Json<ConnectionPayload>,
) -> Result<HttpResponse> {
    let connection = state
        .connections
        .create(payload.into_inner().into_connection(None))
        .await;
    state.persist().await?;
    Ok(HttpResponse::Created().json(connection))
}

#[put("/connections/{id}")]
pub async fn update_connection(
    state: web::Data<AppState>,
    path: web::Path<String>,
    payload: web::Json<ConnectionPayload>,
) -> Result<HttpResponse> {
    let id = path.into_inner();
    let connection = state
        .connections
        .update(payload.into_inner().into_connection(Some(id.clone())))
        .await
        .ok_or_else(|| AppError::NotFound(format!("Connection {id}")))?;
    state.persist().await?;
    Ok(HttpResponse::Ok().json(connection))
}

#[delete("/connections/{id}")]
pub async fn delete_connection(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse> {
    let id = path.into_inner();
    if !state.connections.delete(&id).await {
        return Err(AppError::NotFound(format!("Connection {id}")));
    }
    let detached = state.conversations.detach_connection(&id).await;
    tracing::info!(connection_id = %id, detached, "Connection deleted");
    state.persist().await?;
    Ok(HttpResponse::NoContent().finish())
}

#[get("/connections/{id}/databases")]
pub async fn list_databases(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse> {
    let connection = find_connection(&state, &path.into_inner()).await?;
    let databases: Vec<Database> = state
        .connections
        .databases(&connection, state.connectors.as_ref())
        .await?;
    Ok(HttpResponse::Ok().json(databases))
}

#[get("/connections/{id}/databases/{database}/schemas")]
pub async fn list_schemas(
    state: web::Data<AppState>,
    path: web::Path<(String, String)>,
) -> Result<HttpResponse> {
    let (id, database) = path.into_inner();
    let connection = find_connection(&state, &id).await?;
    let schemas = state
        .connections
        .schemas(
            &connection,
            &database,
            state.connectors.as_ref(),
            state.counter.as_ref(),
        )
        .await?;
    Ok(HttpResponse::Ok().json(schemas))
}

#[post("/connections/{id}/refresh")]
pub async fn refresh_connection(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse> {
    let connection = find_connection(&state, &path.into_inner()).await?;
    let databases = state
        .connections
        .refresh(
            &connection,
            state.connectors.as_ref(),
            state.counter.as_ref(),
        )
        .await?;
    Ok(HttpResponse::Ok().json(databases))
}

/// Run a statement. Statement errors come back inside the result with a 200;
/// the statement is recorded in the query history either way.
#[post("/connections/{id}/execute")]
pub async fn execute_statement(
    state: web::Data<AppState>,
    path: web::Path<String>,
    body: web::Json<ExecuteRequest>,
) -> Result<HttpResponse> {
    let connection = find_connection(&state, &path.into_inner()).await?;
    let ExecuteRequest {
        database_name,
        statement,
        message_id,
    } = body.into_inner();
    if statement.trim().is_empty() {
        return Err(AppError::BadRequest("statement is empty".to_string()));
    }

    let database_name = database_name.filter(|name| !name.is_empty());
    let connector = state.connectors.connector(&connection)?;
    let result = connector
        .execute(database_name.as_deref().unwrap_or_default(), &statement)
        .await;

    let context = ExecuteQueryContext {
        database: database_name.map(|name| Database {
            connection_id: connection.id.clone(),
            name,
        }),
        connection,
        message_id,
        statement,
    };
    state.queries.set_context(Some(context.clone())).await;
    let entry = state.queries.record(context).await;
    tracing::info!(
        connection_id = %entry.context.connection.id,
        is_select = entry.is_select,
        failed = result.is_error(),
        "Statement executed"
    );

    state.persist().await?;
    Ok(HttpResponse::Ok().json(result))
}

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(test_connection)
        .service(list_connections)
        .service(create_connection)
        .service(update_connection)
        .service(delete_connection)
        .service(list_databases)
        .service(list_schemas)
        .service(refresh_connection)
        .service(execute_statement);
}
