use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::UserId;

/// Assistant persona selected by the client
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "utoipa", derive(utoipa::ToSchema))]
pub enum Agent {
    #[default]
    Chat,
    Coding,
}

impl Agent {
    /// The coding agent is reserved for unlimited (pro) plans
    pub fn requires_premium(&self) -> bool {
        matches!(self, Self::Coding)
    }
}

/// One message in OpenAI chat format
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "utoipa", derive(utoipa::ToSchema))]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ChatRequest {
    pub messages: Vec<ChatMessage>,
    pub user_id: Option<UserId>,
    pub agent: Agent,
}

/// Where the reply text came from; only provider replies consume quota
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplySource {
    Provider,
    Placeholder,
    Diagnostic,
}

#[derive(Debug, Clone)]
pub struct ChatReply {
    pub response: String,
    pub source: ReplySource,
}

#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("LLM provider is not configured")]
    NotConfigured,
    #[error("LLM provider rejected the credentials (status {0})")]
    Unauthorized(u16),
    #[error("LLM provider rate limited the request")]
    RateLimited,
    #[error("LLM provider unavailable (status {status}): {body}")]
    Unavailable { status: u16, body: String },
    #[error("LLM provider error (status {status}): {body}")]
    Upstream { status: u16, body: String },
    #[error("Failed to reach LLM provider: {0}")]
    Transport(String),
    #[error("Invalid LLM provider response: {0}")]
    InvalidResponse(String),
}

impl LlmError {
    /// Classify a non-success HTTP status from the provider
    pub fn from_status(status: u16, body: String) -> Self {
        match status {
            401 | 403 => Self::Unauthorized(status),
            429 => Self::RateLimited,
            500..=599 => Self::Unavailable { status, body },
            _ => Self::Upstream { status, body },
        }
    }
}

/// OpenAI-compatible chat completion backend
#[async_trait]
pub trait LlmClient: Send + Sync {
    fn is_configured(&self) -> bool;

    /// Send the full conversation (system prompt included) and return the assistant text
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String, LlmError>;
}

#[async_trait]
pub trait ChatService: Send + Sync {
    /// Produce a reply. Provider failures become diagnostic text instead of errors.
    async fn reply(&self, request: ChatRequest) -> ChatReply;
}
