use chat_core::Config;
use prompt_budget::get_model;
use reqwest::{header::CONTENT_TYPE, Client};
use url::Url;

use crate::error::{RelayError, Result};
use crate::stream::relay_tokens;
use crate::types::{
    ChatCompletionRequest, RelayHandle, RelayOutcome, RelayRequest, RelayResponse, RelayState,
};

const CHAT_COMPLETIONS_PATH: &str = "/v1/chat/completions";

/// Process-wide provider settings. Requests may override key and endpoint.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    pub api_key: Option<String>,
    pub api_endpoint: String,
    pub organization: Option<String>,
}

impl From<&Config> for RelayConfig {
    fn from(config: &Config) -> Self {
        Self {
            api_key: config.openai_api_key.clone(),
            api_endpoint: config.openai_api_endpoint.clone(),
            organization: config.openai_organization.clone(),
        }
    }
}

/// Replace the path of `endpoint` with the chat completions path. Any path the
/// endpoint already carries is discarded; host, port and scheme are kept.
pub fn chat_completions_url(endpoint: &str) -> Result<Url> {
    let mut url = Url::parse(endpoint).map_err(|source| RelayError::InvalidEndpoint {
        endpoint: endpoint.to_string(),
        source,
    })?;
    url.set_path(CHAT_COMPLETIONS_PATH);
    Ok(url)
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

pub struct OpenAIRelay {
    client: Client,
    config: RelayConfig,
}

impl OpenAIRelay {
    pub fn new(config: RelayConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    pub fn with_client(mut self, client: Client) -> Self {
        self.client = client;
        self
    }

    pub fn config(&self) -> &RelayConfig {
        &self.config
    }

    /// Send one chat completion upstream and relay the reply.
    ///
    /// The key check happens before any network activity. A non-success
    /// upstream status is not an error here: status and body come back as
    /// [`RelayOutcome::Upstream`] for the caller to forward unchanged.
    pub async fn send(&self, request: RelayRequest) -> Result<RelayResponse> {
        let handle = RelayHandle::new();

        let api_key = non_empty(request.api_key.as_deref())
            .or_else(|| non_empty(self.config.api_key.as_deref()))
            .ok_or(RelayError::MissingApiKey)?;
        let endpoint = non_empty(request.api_endpoint.as_deref())
            .unwrap_or(self.config.api_endpoint.as_str());
        let url = chat_completions_url(endpoint)?;
        let model = get_model(request.model.as_deref().unwrap_or_default());

        let body = ChatCompletionRequest {
            model: model.name,
            messages: &request.messages,
            temperature: model.temperature,
            frequency_penalty: model.frequency_penalty,
            presence_penalty: model.presence_penalty,
            stream: true,
            user: request.user.as_deref(),
        };

        handle.advance(RelayState::Sending);
        log::info!(
            "Relaying {} messages to {} with model {}",
            request.messages.len(),
            url,
            model.name
        );

        let mut builder = self
            .client
            .post(url)
            .header("Authorization", format!("Bearer {api_key}"))
            .json(&body);
        if let Some(organization) = non_empty(self.config.organization.as_deref()) {
            builder = builder.header("OpenAI-Organization", organization);
        }

        let response = match builder.send().await {
            Ok(response) => response,
            Err(e) => {
                log::error!("Upstream request failed: {}", e);
                handle.advance(RelayState::Failed);
                return Err(RelayError::Http(e));
            }
        };

        let status = response.status();
        if !status.is_success() {
            let content_type = response
                .headers()
                .get(CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string);
            let body = response.bytes().await;
            handle.advance(RelayState::Failed);
            let body = body?;
            log::warn!("Upstream responded with {}, passing it through", status);
            return Ok(RelayResponse {
                handle,
                outcome: RelayOutcome::Upstream {
                    status: status.as_u16(),
                    content_type,
                    body,
                },
            });
        }

        handle.advance(RelayState::Streaming);
        let stream = relay_tokens(response, handle.clone());
        Ok(RelayResponse {
            handle,
            outcome: RelayOutcome::Stream(stream),
        })
    }
}
