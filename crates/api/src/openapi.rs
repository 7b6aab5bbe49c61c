use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::OpenApi;

/// OpenAPI documentation configuration
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Duna API",
        description = "Entitlement, quota and payment reconciliation backend for Duna.",
        version = "1.0.0",
        license(name = "MIT",)
    ),
    paths(
        crate::routes::health_check,
        // Payment endpoints
        crate::routes::payments::handle_whop_webhook,
        crate::routes::payments::sync_whop_subscription,
        // Admin endpoints
        crate::routes::admin::upgrade_user,
        crate::routes::admin::check_user,
        crate::routes::admin::activate_code,
        // Chat endpoints
        crate::routes::chat::chat,
        // Plan endpoints
        crate::routes::plans::get_plan,
        crate::routes::plans::can_send_message,
        crate::routes::plans::get_checkout_links,
    ),
    components(schemas(
        crate::routes::HealthResponse,
        crate::error::ApiErrorResponse,
        // Request/Response models
        crate::models::AccountSummary,
        crate::models::EmailRequest,
        crate::models::SyncResponse,
        crate::models::UpgradeUserRequest,
        crate::models::UpgradeUserResponse,
        crate::models::CheckedUser,
        crate::models::MetadataView,
        crate::models::MirrorView,
        crate::models::CheckUserResponse,
        crate::models::ActivateCodeRequest,
        crate::models::ActivateCodeResponse,
        crate::models::ChatRequestBody,
        crate::models::ChatResponseBody,
        crate::models::CheckoutLinks,
        // Service models
        services::UserId,
        services::chat::Agent,
        services::chat::ChatMessage,
        services::entitlement::PlanTier,
        services::entitlement::ResolvedPlan,
        services::entitlement::QuotaDecision,
        services::payments::WebhookAck,
        services::payments::WebhookAction,
        services::plan::PlanType,
        services::plan::UserPlanRow,
        services::reconciliation::Verification,
    )),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Service health"),
        (name = "Payments", description = "Whop webhook and manual subscription sync"),
        (name = "Admin", description = "Operator actions and activation codes"),
        (name = "Chat", description = "Assistant chat completions"),
        (name = "Plans", description = "Plan resolution, daily quota and checkout links")
    )
)]
pub struct ApiDoc;

/// Security scheme addon for the admin bearer token
struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "admin_token",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .description(Some("Value of ADMIN_API_TOKEN"))
                        .build(),
                ),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openapi_lists_all_routes() {
        let doc = ApiDoc::openapi();
        for path in [
            "/health",
            "/v1/payments/whop/webhook",
            "/v1/payments/whop/sync",
            "/v1/admin/upgrade-user",
            "/v1/admin/check-user",
            "/v1/admin/activate-code",
            "/v1/chat",
            "/v1/plans/{user_id}",
            "/v1/plans/{user_id}/can-send",
            "/v1/checkout",
        ] {
            assert!(doc.paths.paths.contains_key(path), "missing {}", path);
        }
    }
}
