use crate::{error::ApiError, models::*, state::AppState};
use axum::{
    body::Bytes,
    extract::State,
    http::HeaderMap,
    routing::post,
    Json, Router,
};
use services::account::AccountError;
use services::payments::{ResyncError, WebhookAck, WebhookError, SIGNATURE_HEADER};
use services::reconciliation::ReconciliationError;

pub fn create_payments_router() -> Router<AppState> {
    Router::new()
        .route("/whop/webhook", post(handle_whop_webhook))
        .route("/whop/sync", post(sync_whop_subscription))
}

/// Map an account store failure; a missing provider configuration is a server fault
pub(crate) fn account_error_to_api(err: AccountError, context: &str) -> ApiError {
    match err {
        AccountError::NotFound => ApiError::not_found("User not found"),
        AccountError::NotConfigured => {
            tracing::error!("Auth provider credentials not configured ({})", context);
            ApiError::internal_server_error("Auth provider credentials not configured")
        }
        e => {
            tracing::error!(error = ?e, "Account store error ({})", context);
            ApiError::internal_server_error(format!("Failed to {}", context))
        }
    }
}

pub(crate) fn reconciliation_error_to_api(err: ReconciliationError) -> ApiError {
    match err {
        ReconciliationError::MetadataWriteFailed(e) => {
            tracing::error!(error = ?e, "Failed to update user metadata");
            ApiError::internal_server_error("Failed to update user metadata")
        }
    }
}

/// Handle Whop webhook events (public endpoint - authenticated by signature)
#[utoipa::path(
    post,
    path = "/v1/payments/whop/webhook",
    tag = "Payments",
    request_body(content = String, description = "Raw Whop event JSON", content_type = "application/json"),
    params(
        ("x-whop-signature" = String, Header, description = "Hex HMAC-SHA256 of the raw body")
    ),
    responses(
        (status = 200, description = "Event acknowledged", body = WebhookAck),
        (status = 400, description = "Malformed payload or missing customer email", body = crate::error::ApiErrorResponse),
        (status = 401, description = "Invalid signature", body = crate::error::ApiErrorResponse),
        (status = 500, description = "Webhook secret not configured or metadata write failed", body = crate::error::ApiErrorResponse)
    )
)]
pub async fn handle_whop_webhook(
    State(app_state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<WebhookAck>, ApiError> {
    tracing::info!("Received Whop webhook");

    let signature = headers.get(SIGNATURE_HEADER).and_then(|v| v.to_str().ok());

    let ack = app_state
        .payment_sync_service
        .handle_whop_webhook(&body, signature)
        .await
        .map_err(|e| match e {
            WebhookError::SecretNotConfigured => {
                tracing::error!("WHOP_WEBHOOK_SECRET is not configured, rejecting webhook");
                ApiError::internal_server_error("Webhook secret not configured")
            }
            WebhookError::InvalidSignature => {
                tracing::warn!("Webhook signature verification failed");
                ApiError::unauthorized("Invalid signature")
            }
            WebhookError::InvalidPayload(msg) => {
                tracing::warn!(error = ?msg, "Malformed webhook payload");
                ApiError::bad_request("Invalid webhook payload")
            }
            WebhookError::MissingCustomerEmail => {
                ApiError::bad_request("No customer email found in webhook")
            }
            WebhookError::Account(e) => account_error_to_api(e, "process webhook"),
            WebhookError::Reconciliation(e) => reconciliation_error_to_api(e),
        })?;

    Ok(Json(ack))
}

/// Re-derive a user's premium status from Whop
///
/// Looks the account up by email, checks Whop for a matching membership when an API key is
/// configured, and writes the resulting plan to metadata and the `user_plans` table.
#[utoipa::path(
    post,
    path = "/v1/payments/whop/sync",
    tag = "Payments",
    request_body = EmailRequest,
    responses(
        (status = 200, description = "Account synced", body = SyncResponse),
        (status = 400, description = "Email is required", body = crate::error::ApiErrorResponse),
        (status = 404, description = "No account with this email", body = crate::error::ApiErrorResponse),
        (status = 500, description = "Internal server error", body = crate::error::ApiErrorResponse)
    )
)]
pub async fn sync_whop_subscription(
    State(app_state): State<AppState>,
    Json(request): Json<EmailRequest>,
) -> Result<Json<SyncResponse>, ApiError> {
    let email = request
        .email
        .as_deref()
        .map(str::trim)
        .filter(|e| !e.is_empty())
        .ok_or_else(|| ApiError::bad_request("Email is required"))?;

    tracing::info!("Manual Whop sync requested");

    let outcome = app_state
        .payment_sync_service
        .resync_by_email(email)
        .await
        .map_err(|e| match e {
            ResyncError::AccountNotFound => ApiError::not_found(format!(
                "User with email {} not found. Please make sure you've signed up first.",
                email
            )),
            ResyncError::Account(e) => account_error_to_api(e, "list users"),
            ResyncError::Reconciliation(e) => reconciliation_error_to_api(e),
        })?;

    Ok(Json(SyncResponse {
        success: true,
        message: format!("User {} synced to {} plan", email, outcome.plan_type),
        whop_subscription_found: outcome.whop_subscription_found,
        metadata_updated: outcome.metadata_updated,
        user_plans_updated: outcome.user_plans_updated,
        warning: outcome.warning,
        user: AccountSummary {
            id: outcome.user_id,
            email: outcome.email,
            plan_type: Some(outcome.plan_type.to_string()),
            subscription_status: outcome.subscription_status,
        },
        verification: outcome.verification,
        note: RELOGIN_NOTE.to_string(),
    }))
}
