use crate::{
    error::ApiError,
    models::*,
    routes::payments::{account_error_to_api, reconciliation_error_to_api},
    state::AppState,
};
use axum::{extract::State, routing::post, Json, Router};
use services::admin::{ActivationOutcome, AdminError};
use services::UserId;

/// Operator routes, guarded by the admin token middleware
pub fn create_admin_router() -> Router<AppState> {
    Router::new()
        .route("/upgrade-user", post(upgrade_user))
        .route("/check-user", post(check_user))
}

/// Code redemption is reached by end users and is authorized by the code itself
pub fn create_activation_router() -> Router<AppState> {
    Router::new().route("/activate-code", post(activate_code))
}

fn admin_error_to_api(err: AdminError) -> ApiError {
    match err {
        AdminError::InvalidPlanType(plan) => ApiError::bad_request(format!(
            "Invalid plan type: {}. Expected pro or pro_lifetime",
            plan
        )),
        AdminError::InvalidCode => ApiError::bad_request("Invalid code"),
        AdminError::UserNotFound => ApiError::not_found("User not found"),
        AdminError::Account(e) => account_error_to_api(e, "look up user"),
        AdminError::Reconciliation(e) => reconciliation_error_to_api(e),
    }
}

fn required(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Grant premium to a user
///
/// Unconditional upgrade for support and testing. Requires the admin token when configured.
#[utoipa::path(
    post,
    path = "/v1/admin/upgrade-user",
    tag = "Admin",
    request_body = UpgradeUserRequest,
    responses(
        (status = 200, description = "User upgraded", body = UpgradeUserResponse),
        (status = 400, description = "Missing email or invalid plan type", body = crate::error::ApiErrorResponse),
        (status = 401, description = "Unauthorized", body = crate::error::ApiErrorResponse),
        (status = 404, description = "User not found", body = crate::error::ApiErrorResponse),
        (status = 500, description = "Internal server error", body = crate::error::ApiErrorResponse)
    ),
    security(
        ("admin_token" = [])
    )
)]
pub async fn upgrade_user(
    State(app_state): State<AppState>,
    Json(request): Json<UpgradeUserRequest>,
) -> Result<Json<UpgradeUserResponse>, ApiError> {
    let email = required(request.email.as_deref())
        .ok_or_else(|| ApiError::bad_request("Email is required"))?;

    let outcome = app_state
        .admin_service
        .upgrade_user(email, request.plan_type.as_deref())
        .await
        .map_err(admin_error_to_api)?;

    Ok(Json(UpgradeUserResponse {
        success: true,
        message: format!("User {} upgraded to {}", email, outcome.plan_type),
        metadata_updated: outcome.metadata_updated,
        user_plans_updated: outcome.user_plans_updated,
        warning: outcome.warning,
        user: AccountSummary::from(&outcome.account),
        verification: outcome.verification,
    }))
}

/// Inspect every premium signal for a user
#[utoipa::path(
    post,
    path = "/v1/admin/check-user",
    tag = "Admin",
    request_body = EmailRequest,
    responses(
        (status = 200, description = "Diagnostic view", body = CheckUserResponse),
        (status = 400, description = "Email is required", body = crate::error::ApiErrorResponse),
        (status = 401, description = "Unauthorized", body = crate::error::ApiErrorResponse),
        (status = 404, description = "User not found", body = crate::error::ApiErrorResponse)
    ),
    security(
        ("admin_token" = [])
    )
)]
pub async fn check_user(
    State(app_state): State<AppState>,
    Json(request): Json<EmailRequest>,
) -> Result<Json<CheckUserResponse>, ApiError> {
    let email = required(request.email.as_deref())
        .ok_or_else(|| ApiError::bad_request("Email is required"))?;

    let inspection = app_state
        .admin_service
        .check_user(email)
        .await
        .map_err(admin_error_to_api)?;

    let account = inspection.account;
    let metadata = &account.user_metadata;
    Ok(Json(CheckUserResponse {
        metadata: MetadataView {
            plan: metadata.plan().map(str::to_string),
            plan_type: metadata.plan_type().map(str::to_string),
            subscription_status: metadata.subscription_status().map(str::to_string),
            full_metadata: serde_json::Value::Object(metadata.as_map().clone()),
        },
        user: CheckedUser {
            id: account.id,
            email: account.email.clone(),
            created_at: account.created_at.map(|t| t.to_rfc3339()),
        },
        user_plans_table: MirrorView {
            data: inspection.mirror,
            error: inspection.mirror_error,
        },
        is_premium: inspection.is_premium,
    }))
}

/// Redeem an activation code
///
/// One code grants lifetime pro, the other clears today's message count.
#[utoipa::path(
    post,
    path = "/v1/admin/activate-code",
    tag = "Admin",
    request_body = ActivateCodeRequest,
    responses(
        (status = 200, description = "Code applied", body = ActivateCodeResponse),
        (status = 400, description = "Missing fields or invalid code", body = crate::error::ApiErrorResponse),
        (status = 404, description = "User not found", body = crate::error::ApiErrorResponse),
        (status = 500, description = "Internal server error", body = crate::error::ApiErrorResponse)
    )
)]
pub async fn activate_code(
    State(app_state): State<AppState>,
    Json(request): Json<ActivateCodeRequest>,
) -> Result<Json<ActivateCodeResponse>, ApiError> {
    let (Some(user_id), Some(code)) = (
        required(request.user_id.as_deref()),
        required(request.code.as_deref()),
    ) else {
        return Err(ApiError::bad_request("User ID and code are required"));
    };

    let user_id: UserId = user_id
        .parse()
        .map_err(|_| ApiError::bad_request("Invalid user ID"))?;

    let outcome = app_state
        .admin_service
        .activate_code(user_id, code)
        .await
        .map_err(admin_error_to_api)?;

    let action = outcome.action().to_string();
    let response = match outcome {
        ActivationOutcome::ProUpgrade(upgrade) => ActivateCodeResponse {
            success: true,
            action,
            message: "User upgraded to Pro successfully".to_string(),
            user: AccountSummary::from(&upgrade.account),
            user_plans_updated: Some(upgrade.user_plans_updated),
            warning: upgrade.warning,
            note: RELOGIN_NOTE.to_string(),
        },
        ActivationOutcome::MessageLimitReset { user_id, email, .. } => ActivateCodeResponse {
            success: true,
            action,
            message: "Daily message limit reset successfully".to_string(),
            user: AccountSummary {
                id: user_id,
                email,
                plan_type: None,
                subscription_status: None,
            },
            user_plans_updated: None,
            warning: None,
            note: "Please refresh the page to see the updated message count".to_string(),
        },
    };

    Ok(Json(response))
}
