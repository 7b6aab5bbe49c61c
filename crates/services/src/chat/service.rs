use async_trait::async_trait;
use std::sync::Arc;

use super::ports::{ChatMessage, ChatReply, ChatRequest, ChatService, LlmClient, LlmError, ReplySource};
use super::prompts::{
    placeholder_reply, system_prompt, AUTH_FAILED_REPLY, GENERIC_FAILURE_REPLY,
    PROVIDER_UNAVAILABLE_REPLY, RATE_LIMITED_REPLY,
};
use crate::entitlement::EntitlementService;

pub struct ChatServiceImpl {
    llm: Arc<dyn LlmClient>,
    entitlement: Arc<dyn EntitlementService>,
}

impl ChatServiceImpl {
    pub fn new(llm: Arc<dyn LlmClient>, entitlement: Arc<dyn EntitlementService>) -> Self {
        Self { llm, entitlement }
    }
}

fn diagnostic_reply(error: &LlmError) -> &'static str {
    match error {
        LlmError::Unauthorized(_) => AUTH_FAILED_REPLY,
        LlmError::RateLimited => RATE_LIMITED_REPLY,
        LlmError::Unavailable { .. } | LlmError::Transport(_) => PROVIDER_UNAVAILABLE_REPLY,
        _ => GENERIC_FAILURE_REPLY,
    }
}

#[async_trait]
impl ChatService for ChatServiceImpl {
    async fn reply(&self, request: ChatRequest) -> ChatReply {
        if !self.llm.is_configured() {
            let last = request
                .messages
                .last()
                .map(|m| m.content.as_str())
                .unwrap_or_default();
            return ChatReply {
                response: placeholder_reply(last),
                source: ReplySource::Placeholder,
            };
        }

        let mut conversation = Vec::with_capacity(request.messages.len() + 1);
        conversation.push(ChatMessage::new("system", system_prompt(request.agent)));
        conversation.extend(request.messages);

        match self.llm.complete(&conversation).await {
            Ok(response) => {
                // Only a delivered provider reply counts against the daily quota
                if let Some(user_id) = request.user_id {
                    self.entitlement.record_message(user_id).await;
                }
                ChatReply {
                    response,
                    source: ReplySource::Provider,
                }
            }
            Err(e) => {
                tracing::error!(error = ?e, agent = ?request.agent, "LLM completion failed");
                ChatReply {
                    response: diagnostic_reply(&e).to_string(),
                    source: ReplySource::Diagnostic,
                }
            }
        }
    }
}
