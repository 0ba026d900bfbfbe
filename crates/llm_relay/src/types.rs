use std::sync::{Arc, Mutex};

use bytes::Bytes;
use chat_core::CreatorRole;
use serde::{Deserialize, Serialize};

use crate::stream::TokenStream;

/// Relay lifecycle: `Idle -> Sending -> Streaming -> {Done, Failed}`.
/// A non-success upstream status goes straight from `Sending` to `Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RelayState {
    Idle,
    Sending,
    Streaming,
    Done,
    Failed,
}

impl RelayState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, RelayState::Done | RelayState::Failed)
    }
}

/// Shared view of one relay's state transitions. Clones observe the same log.
#[derive(Debug, Clone)]
pub struct RelayHandle {
    transitions: Arc<Mutex<Vec<RelayState>>>,
}

impl RelayHandle {
    pub fn new() -> Self {
        Self {
            transitions: Arc::new(Mutex::new(vec![RelayState::Idle])),
        }
    }

    pub fn state(&self) -> RelayState {
        let log = self.transitions.lock().unwrap_or_else(|e| e.into_inner());
        log.last().copied().unwrap_or(RelayState::Idle)
    }

    /// Every state the relay has been in, oldest first.
    pub fn transitions(&self) -> Vec<RelayState> {
        self.transitions
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Terminal states are final; later transitions are ignored.
    pub(crate) fn advance(&self, next: RelayState) {
        let mut log = self.transitions.lock().unwrap_or_else(|e| e.into_inner());
        let current = log.last().copied().unwrap_or(RelayState::Idle);
        if current.is_terminal() {
            log::warn!("Ignoring relay transition {:?} -> {:?}", current, next);
            return;
        }
        log::debug!("Relay state {:?} -> {:?}", current, next);
        log.push(next);
    }
}

impl Default for RelayHandle {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: CreatorRole,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: CreatorRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(CreatorRole::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(CreatorRole::User, content)
    }
}

/// Body sent to the provider's chat completions endpoint.
#[derive(Debug, Serialize)]
pub struct ChatCompletionRequest<'a> {
    pub model: &'a str,
    pub messages: &'a [ChatMessage],
    pub temperature: f32,
    pub frequency_penalty: f32,
    pub presence_penalty: f32,
    pub stream: bool,
    /// End-user address, forwarded so the provider can detect abuse.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<&'a str>,
}

/// One relay call. The optional fields are per-request overrides of the
/// process configuration.
#[derive(Debug, Clone, Default)]
pub struct RelayRequest {
    pub messages: Vec<ChatMessage>,
    pub api_key: Option<String>,
    pub api_endpoint: Option<String>,
    pub model: Option<String>,
    pub user: Option<String>,
}

pub enum RelayOutcome {
    /// Upstream rejected the request; status and body are passed through as is.
    Upstream {
        status: u16,
        content_type: Option<String>,
        body: Bytes,
    },
    /// Text deltas in arrival order.
    Stream(TokenStream),
}

impl std::fmt::Debug for RelayOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RelayOutcome::Upstream { status, body, .. } => f
                .debug_struct("Upstream")
                .field("status", status)
                .field("body_len", &body.len())
                .finish(),
            RelayOutcome::Stream(_) => f.write_str("Stream(..)"),
        }
    }
}

#[derive(Debug)]
pub struct RelayResponse {
    /// Follows the relay through its states until a terminal one.
    pub handle: RelayHandle,
    pub outcome: RelayOutcome,
}
