use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConnectorError {
    #[error("Invalid connection config: {0}")]
    InvalidConfig(String),

    #[error("TLS configuration error: {0}")]
    Tls(String),

    #[error("Database error: {0}")]
    Database(#[from] tokio_postgres::Error),
}

pub type Result<T> = std::result::Result<T, ConnectorError>;
