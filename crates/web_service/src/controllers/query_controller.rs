use actix_web::{get, put, web, HttpResponse};
use chat_core::ExecuteQueryContext;

use crate::{error::Result, server::AppState};

#[get("/query/history")]
pub async fn query_history(state: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok().json(state.queries.history().await)
}

#[get("/query/context")]
pub async fn query_context(state: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok().json(state.queries.context().await)
}

/// Replace the current query context; `null` clears it.
#[put("/query/context")]
pub async fn set_query_context(
    state: web::Data<AppState>,
    body: web::Json<Option<ExecuteQueryContext>>,
) -> Result<HttpResponse> {
    state.queries.set_context(body.into_inner()).await;
    state.persist().await?;
    Ok(HttpResponse::Ok().json(state.queries.context().await))
}

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(query_history)
        .service(query_context)
        .service(set_query_context);
}
