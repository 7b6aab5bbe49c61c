pub mod admin;
pub mod chat;
pub mod payments;
pub mod plans;

use axum::{middleware::from_fn_with_state, routing::get, Json, Router};
use http::HeaderValue;
use serde::Serialize;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::ToSchema;

use crate::{middleware::AdminAuthState, state::AppState};

#[derive(Serialize, ToSchema)]
pub struct HealthResponse {
    /// Service status
    pub status: &'static str,
    /// API version
    pub version: &'static str,
}

/// Health check endpoint
///
/// Returns the health status of the API service. This endpoint is typically used by
/// load balancers, monitoring systems, and orchestration tools to verify service availability.
#[utoipa::path(
    get,
    path = "/health",
    tag = "Health",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse)
    )
)]
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

fn is_origin_allowed(origin_str: &str, cors_config: &config::CorsConfig) -> bool {
    if cors_config.exact_matches.iter().any(|o| o == origin_str) {
        return true;
    }

    if let Some(remainder) = origin_str.strip_prefix("http://localhost") {
        if remainder.is_empty() || remainder.starts_with(':') {
            return true;
        }
    }

    if let Some(remainder) = origin_str.strip_prefix("http://127.0.0.1") {
        if remainder.is_empty() || remainder.starts_with(':') {
            return true;
        }
    }

    if origin_str.starts_with("https://")
        && cors_config
            .wildcard_suffixes
            .iter()
            .any(|suffix| origin_str.ends_with(suffix))
    {
        return true;
    }

    false
}

/// Create the main API router with CORS configuration
pub fn create_router(app_state: AppState, cors_config: config::CorsConfig) -> Router {
    let admin_state = AdminAuthState {
        api_token: app_state.admin_api_token.clone(),
    };

    // Operator routes (admin token when configured); the layer only covers routes added before it
    let admin_routes = admin::create_admin_router()
        .layer(from_fn_with_state(
            admin_state,
            crate::middleware::admin_token_middleware,
        ))
        .merge(admin::create_activation_router());

    let router = Router::new()
        .route("/health", get(health_check))
        .nest("/v1/admin", admin_routes)
        .nest("/v1/payments", payments::create_payments_router())
        .merge(chat::create_chat_router())
        .merge(plans::create_plans_router())
        .with_state(app_state);

    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::predicate(
            move |origin: &HeaderValue, _request_parts: &http::request::Parts| {
                let origin_str = match origin.to_str() {
                    Ok(s) => s,
                    Err(_) => return false,
                };
                is_origin_allowed(origin_str, &cors_config)
            },
        ))
        .allow_methods(Any)
        .allow_headers(Any)
        .expose_headers(Any);

    router.layer(cors).layer(TraceLayer::new_for_http())
}
