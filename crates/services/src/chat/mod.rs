pub mod openai_client;
pub mod ports;
pub mod prompts;
pub mod service;

pub use openai_client::OpenAiCompatibleClient;
pub use ports::{
    Agent, ChatMessage, ChatReply, ChatRequest, ChatService, LlmClient, LlmError, ReplySource,
};
pub use service::ChatServiceImpl;
