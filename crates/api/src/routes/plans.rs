use crate::{error::ApiError, models::*, routes::payments::account_error_to_api, state::AppState};
use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use services::account::AccountRecord;
use services::entitlement::{QuotaDecision, ResolvedPlan};
use services::UserId;

pub fn create_plans_router() -> Router<AppState> {
    Router::new()
        .route("/v1/plans/{user_id}", get(get_plan))
        .route("/v1/plans/{user_id}/can-send", get(can_send_message))
        .route("/v1/checkout", get(get_checkout_links))
}

async fn load_account(app_state: &AppState, user_id: UserId) -> Result<AccountRecord, ApiError> {
    app_state
        .account_store
        .get_by_id(user_id)
        .await
        .map_err(|e| account_error_to_api(e, "look up user"))?
        .ok_or_else(|| ApiError::not_found("User not found"))
}

/// Resolve a user's plan and today's usage
#[utoipa::path(
    get,
    path = "/v1/plans/{user_id}",
    tag = "Plans",
    params(
        ("user_id" = UserId, Path, description = "Account ID")
    ),
    responses(
        (status = 200, description = "Resolved plan", body = ResolvedPlan),
        (status = 404, description = "User not found", body = crate::error::ApiErrorResponse)
    )
)]
pub async fn get_plan(
    State(app_state): State<AppState>,
    Path(user_id): Path<UserId>,
) -> Result<Json<ResolvedPlan>, ApiError> {
    let account = load_account(&app_state, user_id).await?;
    let plan = app_state
        .entitlement_service
        .resolve_plan(Some(&account))
        .await;
    Ok(Json(plan))
}

/// Check whether a user may send another message today
#[utoipa::path(
    get,
    path = "/v1/plans/{user_id}/can-send",
    tag = "Plans",
    params(
        ("user_id" = UserId, Path, description = "Account ID")
    ),
    responses(
        (status = 200, description = "Quota decision", body = QuotaDecision),
        (status = 404, description = "User not found", body = crate::error::ApiErrorResponse)
    )
)]
pub async fn can_send_message(
    State(app_state): State<AppState>,
    Path(user_id): Path<UserId>,
) -> Result<Json<QuotaDecision>, ApiError> {
    let account = load_account(&app_state, user_id).await?;
    let decision = app_state
        .entitlement_service
        .can_send_message(Some(&account))
        .await;
    Ok(Json(decision))
}

/// Hosted checkout links for the monthly and lifetime plans
#[utoipa::path(
    get,
    path = "/v1/checkout",
    tag = "Plans",
    responses(
        (status = 200, description = "Checkout links", body = CheckoutLinks)
    )
)]
pub async fn get_checkout_links(State(app_state): State<AppState>) -> Json<CheckoutLinks> {
    Json(app_state.checkout_links.clone())
}
