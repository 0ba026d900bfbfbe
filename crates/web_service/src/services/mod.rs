pub mod connection_service;
pub mod conversation_service;
pub mod prompt_service;
pub mod query_service;

pub use connection_service::ConnectionService;
pub use conversation_service::ConversationService;
pub use query_service::QueryService;
