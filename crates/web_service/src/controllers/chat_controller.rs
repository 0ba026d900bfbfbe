use actix_web::{http::StatusCode, post, web, HttpRequest, HttpResponse};
use bytes::Bytes;
use futures_util::StreamExt;
use llm_relay::{ChatMessage, RelayOutcome, RelayRequest};

use crate::{dto::RelayChatRequest, error::AppError, server::AppState};

const OPENAI_KEY_HEADER: &str = "x-openai-key";
const OPENAI_ENDPOINT_HEADER: &str = "x-openai-endpoint";
const OPENAI_MODEL_HEADER: &str = "x-openai-model";

fn header_value(req: &HttpRequest, name: &str) -> Option<String> {
    req.headers()
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

/// Relay request carrying the caller's overrides and client address.
pub(crate) fn relay_request(req: &HttpRequest, messages: Vec<ChatMessage>) -> RelayRequest {
    RelayRequest {
        messages,
        api_key: header_value(req, OPENAI_KEY_HEADER),
        api_endpoint: header_value(req, OPENAI_ENDPOINT_HEADER),
        model: header_value(req, OPENAI_MODEL_HEADER),
        user: req
            .connection_info()
            .realip_remote_addr()
            .map(str::to_string),
    }
}

/// Upstream error response, passed through with its status and body intact.
pub(crate) fn upstream_response(
    status: u16,
    content_type: Option<String>,
    body: Bytes,
) -> HttpResponse {
    let status = StatusCode::from_u16(status).unwrap_or(StatusCode::BAD_GATEWAY);
    let mut builder = HttpResponse::build(status);
    if let Some(content_type) = content_type {
        builder.content_type(content_type);
    }
    builder.body(body)
}

#[post("/chat")]
pub async fn chat(
    state: web::Data<AppState>,
    req: HttpRequest,
    body: web::Json<RelayChatRequest>,
) -> Result<HttpResponse, AppError> {
    let request = relay_request(&req, body.into_inner().messages);
    let response = state.relay.send(request).await?;

    match response.outcome {
        RelayOutcome::Upstream {
            status,
            content_type,
            body,
        } => Ok(upstream_response(status, content_type, body)),
        RelayOutcome::Stream(tokens) => {
            let stream = tokens.map(|token| token.map(Bytes::from).map_err(AppError::from));
            Ok(HttpResponse::Ok()
                .content_type("text/plain; charset=utf-8")
                .streaming(stream))
        }
    }
}

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(chat);
}
