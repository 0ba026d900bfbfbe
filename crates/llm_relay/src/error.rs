use thiserror::Error;

/// Shown to the user when neither the request nor the server carries a key.
pub const MISSING_API_KEY_MESSAGE: &str =
    "OpenAI API Key is missing. You can supply your own key via [Setting](/setting).";

#[derive(Error, Debug)]
pub enum RelayError {
    #[error("{}", MISSING_API_KEY_MESSAGE)]
    MissingApiKey,

    #[error("Invalid API endpoint '{endpoint}': {source}")]
    InvalidEndpoint {
        endpoint: String,
        #[source]
        source: url::ParseError,
    },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Failed to decode stream event: {0}")]
    Decode(String),

    #[error("Stream error: {0}")]
    Stream(String),
}

pub type Result<T> = std::result::Result<T, RelayError>;
