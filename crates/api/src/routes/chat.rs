use crate::{error::ApiError, models::*, state::AppState};
use axum::{extract::State, routing::post, Json, Router};
use services::chat::ChatRequest;

pub fn create_chat_router() -> Router<AppState> {
    Router::new().route("/v1/chat", post(chat))
}

/// Send a conversation to the assistant
///
/// Provider failures are reported as assistant text with status 200. The daily quota is not
/// enforced here; clients consult `/v1/plans/{user_id}/can-send` first.
#[utoipa::path(
    post,
    path = "/v1/chat",
    tag = "Chat",
    request_body = ChatRequestBody,
    responses(
        (status = 200, description = "Assistant reply", body = ChatResponseBody),
        (status = 400, description = "No messages", body = crate::error::ApiErrorResponse)
    )
)]
pub async fn chat(
    State(app_state): State<AppState>,
    Json(request): Json<ChatRequestBody>,
) -> Result<Json<ChatResponseBody>, ApiError> {
    if request.messages.is_empty() {
        return Err(ApiError::bad_request("At least one message is required"));
    }

    tracing::debug!(
        "Chat request with {} messages, agent={:?}, user_id={:?}",
        request.messages.len(),
        request.agent,
        request.user_id
    );

    let reply = app_state
        .chat_service
        .reply(ChatRequest {
            messages: request.messages,
            user_id: request.user_id,
            agent: request.agent,
        })
        .await;

    Ok(Json(ChatResponseBody {
        response: reply.response,
    }))
}
