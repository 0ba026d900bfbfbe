//! Provider SSE stream -> text deltas.

use std::pin::Pin;

use eventsource_stream::Eventsource;
use futures::Stream;
use futures_util::StreamExt;
use reqwest::Response;
use serde::Deserialize;

use crate::error::{RelayError, Result};
use crate::types::{RelayHandle, RelayState};

/// Payload that marks the end of the provider stream.
const DONE_SENTINEL: &str = "[DONE]";

pub type TokenStream = Pin<Box<dyn Stream<Item = Result<String>> + Send>>;

#[derive(Debug, PartialEq, Eq)]
pub enum StreamEvent {
    Delta(Option<String>),
    Done,
}

#[derive(Debug, Deserialize)]
struct StreamChunk {
    choices: Vec<StreamChoice>,
}

#[derive(Debug, Deserialize)]
struct StreamChoice {
    #[serde(default)]
    delta: Option<StreamDelta>,
}

#[derive(Debug, Deserialize)]
struct StreamDelta {
    #[serde(default)]
    content: Option<String>,
}

/// Decode one SSE data payload. The text lives at `choices[0].delta.content`;
/// a chunk without a first choice is malformed.
pub fn parse_stream_event(data: &str) -> Result<StreamEvent> {
    if data.trim() == DONE_SENTINEL {
        return Ok(StreamEvent::Done);
    }

    let chunk: StreamChunk =
        serde_json::from_str(data).map_err(|e| RelayError::Decode(e.to_string()))?;
    let choice = chunk
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| RelayError::Decode("stream chunk has no choices".to_string()))?;

    Ok(StreamEvent::Delta(choice.delta.and_then(|d| d.content)))
}

/// Relay the text deltas of a successful provider response.
///
/// The stream ends after `[DONE]` (state `Done`) or after yielding the first
/// error (state `Failed`). Dropping the stream drops the upstream body.
pub(crate) fn relay_tokens(response: Response, handle: RelayHandle) -> TokenStream {
    Box::pin(async_stream::stream! {
        let mut events = response.bytes_stream().eventsource();
        while let Some(event) = events.next().await {
            let event = match event {
                Ok(event) => event,
                Err(e) => {
                    log::error!("Error in SSE stream: {}", e);
                    handle.advance(RelayState::Failed);
                    yield Err(RelayError::Stream(e.to_string()));
                    return;
                }
            };

            if event.data.trim().is_empty() {
                continue;
            }

            match parse_stream_event(&event.data) {
                Ok(StreamEvent::Done) => {
                    log::info!("Received [DONE] signal, closing stream.");
                    handle.advance(RelayState::Done);
                    return;
                }
                Ok(StreamEvent::Delta(Some(text))) => yield Ok(text),
                Ok(StreamEvent::Delta(None)) => {}
                Err(e) => {
                    log::error!("Failed to parse stream chunk: {}, data: {}", e, event.data);
                    handle.advance(RelayState::Failed);
                    yield Err(e);
                    return;
                }
            }
        }

        log::warn!("Upstream stream closed without [DONE]");
        handle.advance(RelayState::Done);
    })
}
