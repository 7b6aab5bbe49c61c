use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::ports::{ChatMessage, LlmClient, LlmError};

#[derive(Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
}

#[derive(Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Client for any OpenAI-compatible `chat/completions` endpoint
pub struct OpenAiCompatibleClient {
    endpoint: String,
    api_key: String,
    model: String,
    http_client: reqwest::Client,
}

impl OpenAiCompatibleClient {
    pub fn new(
        endpoint: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            endpoint: endpoint.into(),
            api_key: api_key.into(),
            model: model.into(),
            http_client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl LlmClient for OpenAiCompatibleClient {
    fn is_configured(&self) -> bool {
        !self.api_key.is_empty() && !self.endpoint.is_empty()
    }

    async fn complete(&self, messages: &[ChatMessage]) -> Result<String, LlmError> {
        if !self.is_configured() {
            return Err(LlmError::NotConfigured);
        }

        tracing::debug!(
            "Forwarding {} messages to LLM provider model={}",
            messages.len(),
            self.model
        );

        let response = self
            .http_client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&CompletionRequest {
                model: &self.model,
                messages,
            })
            .send()
            .await
            .map_err(|e| LlmError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::from_status(status.as_u16(), body));
        }

        let completion: CompletionResponse = response
            .json()
            .await
            .map_err(|e| LlmError::InvalidResponse(e.to_string()))?;

        completion
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or_else(|| LlmError::InvalidResponse("completion has no content".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> OpenAiCompatibleClient {
        OpenAiCompatibleClient::new(
            format!("{}/v1/chat/completions", server.uri()),
            "sk-test",
            "gpt-4o-mini",
        )
    }

    #[tokio::test]
    async fn test_returns_first_choice() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(header("authorization", "Bearer sk-test"))
            .and(body_partial_json(json!({
                "model": "gpt-4o-mini",
                "messages": [{"role": "user", "content": "hi"}]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{"message": {"role": "assistant", "content": "hello!"}}]
            })))
            .mount(&mock_server)
            .await;

        let reply = client(&mock_server)
            .complete(&[ChatMessage::new("user", "hi")])
            .await
            .unwrap();
        assert_eq!(reply, "hello!");
    }

    #[tokio::test]
    async fn test_status_classification() {
        for (status, check) in [
            (401u16, "unauthorized"),
            (403, "unauthorized"),
            (429, "rate_limited"),
            (503, "unavailable"),
            (400, "upstream"),
        ] {
            let mock_server = MockServer::start().await;
            Mock::given(method("POST"))
                .respond_with(ResponseTemplate::new(status).set_body_string("nope"))
                .mount(&mock_server)
                .await;

            let err = client(&mock_server)
                .complete(&[ChatMessage::new("user", "hi")])
                .await
                .unwrap_err();
            let matched = match check {
                "unauthorized" => matches!(err, LlmError::Unauthorized(s) if s == status),
                "rate_limited" => matches!(err, LlmError::RateLimited),
                "unavailable" => matches!(err, LlmError::Unavailable { .. }),
                _ => matches!(err, LlmError::Upstream { status: 400, .. }),
            };
            assert!(matched, "status {} gave {:?}", status, err);
        }
    }

    #[tokio::test]
    async fn test_empty_choices_are_invalid() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"choices": []})))
            .mount(&mock_server)
            .await;

        let err = client(&mock_server)
            .complete(&[ChatMessage::new("user", "hi")])
            .await
            .unwrap_err();
        assert!(matches!(err, LlmError::InvalidResponse(_)));
    }

    #[tokio::test]
    async fn test_not_configured_without_key() {
        let client = OpenAiCompatibleClient::new("https://api.openai.com/v1/chat/completions", "", "m");
        assert!(!client.is_configured());
        assert!(matches!(
            client.complete(&[]).await,
            Err(LlmError::NotConfigured)
        ));
    }
}
