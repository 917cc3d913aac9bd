pub mod chat;
pub mod config;
pub mod errors;

pub use chat::{ChatMessage, ChatModel, Role};
pub use errors::PipelineError;
