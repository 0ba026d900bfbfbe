pub mod error;
pub mod relay;
pub mod stream;
pub mod types;

pub use error::{RelayError, MISSING_API_KEY_MESSAGE};
pub use relay::{chat_completions_url, OpenAIRelay, RelayConfig};
pub use stream::{parse_stream_event, StreamEvent, TokenStream};
pub use types::{
    ChatCompletionRequest, ChatMessage, RelayHandle, RelayOutcome, RelayRequest, RelayResponse,
    RelayState,
};
