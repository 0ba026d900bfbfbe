pub mod chat_controller;
pub mod connection_controller;
pub mod conversation_controller;
pub mod meta_controller;
pub mod query_controller;
