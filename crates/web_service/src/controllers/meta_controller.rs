use actix_web::{get, web, HttpResponse, Responder};
use prompt_budget::models;

use crate::server::AppState;

#[get("/ping")]
pub async fn ping() -> impl Responder {
    HttpResponse::Ok().body("Alive!")
}

#[get("/models")]
pub async fn list_models() -> impl Responder {
    HttpResponse::Ok().json(models())
}

#[get("/assistants")]
pub async fn list_assistants(state: web::Data<AppState>) -> impl Responder {
    HttpResponse::Ok().json(state.assistants.list())
}

#[get("/features")]
pub async fn features(state: web::Data<AppState>) -> impl Responder {
    HttpResponse::Ok().json(state.config.features())
}

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(ping)
        .service(list_models)
        .service(list_assistants)
        .service(features);
}
