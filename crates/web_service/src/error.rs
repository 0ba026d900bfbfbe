use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use db_connector::ConnectorError;
use llm_relay::RelayError;
use prompt_budget::BudgetError;
use serde::Serialize;
use thiserror::Error;

use crate::storage::StoreError;

pub type Result<T, E = AppError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error(transparent)]
    Budget(#[from] BudgetError),

    #[error("{}", llm_relay::MISSING_API_KEY_MESSAGE)]
    MissingApiKey,

    #[error("Upstream relay error: {0}")]
    Relay(RelayError),

    #[error("Database connector error: {0}")]
    Connector(#[from] ConnectorError),

    #[error("Storage error: {0}")]
    StorageError(#[from] StoreError),

    #[error("Internal server error: {0}")]
    InternalError(#[from] anyhow::Error),
}

impl From<RelayError> for AppError {
    fn from(err: RelayError) -> Self {
        match err {
            RelayError::MissingApiKey => AppError::MissingApiKey,
            RelayError::InvalidEndpoint { .. } => AppError::BadRequest(err.to_string()),
            other => AppError::Relay(other),
        }
    }
}

#[derive(Serialize)]
struct JsonError {
    message: String,
    r#type: String,
}

#[derive(Serialize)]
struct JsonErrorWrapper {
    error: JsonError,
}

impl AppError {
    fn error_type(&self) -> &'static str {
        match self {
            AppError::NotFound(_) => "not_found_error",
            AppError::BadRequest(_) | AppError::Budget(_) => "invalid_request_error",
            AppError::MissingApiKey => "authentication_error",
            AppError::Relay(_) => "upstream_error",
            AppError::Connector(_) => "database_error",
            AppError::StorageError(_) | AppError::InternalError(_) => "api_error",
        }
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Budget(_) => StatusCode::BAD_REQUEST,
            AppError::MissingApiKey => StatusCode::UNAUTHORIZED,
            AppError::Relay(_) => StatusCode::BAD_GATEWAY,
            AppError::Connector(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::StorageError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status_code = self.status_code();
        let error_response = JsonErrorWrapper {
            error: JsonError {
                message: self.to_string(),
                r#type: self.error_type().to_string(),
            },
        };
        HttpResponse::build(status_code).json(error_response)
    }
}
