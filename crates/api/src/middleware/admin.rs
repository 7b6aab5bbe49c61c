use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::sync::Arc;

use crate::error::ApiError;

type HmacSha256 = Hmac<Sha256>;

const TOKEN_DIGEST_KEY: &[u8] = b"duna-admin-token";

fn token_digest(token: &str) -> Option<HmacSha256> {
    let mut mac = HmacSha256::new_from_slice(TOKEN_DIGEST_KEY).ok()?;
    mac.update(token.as_bytes());
    Some(mac)
}

/// Constant-time token comparison over fixed-length digests
fn token_matches(provided: &str, expected: &str) -> bool {
    let (Some(provided), Some(expected)) = (token_digest(provided), token_digest(expected)) else {
        return false;
    };
    provided
        .verify_slice(&expected.finalize().into_bytes())
        .is_ok()
}

/// State for the admin token middleware
#[derive(Clone)]
pub struct AdminAuthState {
    pub api_token: Option<Arc<String>>,
}

fn extract_bearer_token(request: &Request) -> Result<&str, ApiError> {
    let auth_value = request
        .headers()
        .get("authorization")
        .and_then(|h| h.to_str().ok())
        .ok_or_else(|| {
            tracing::warn!("No authorization header found on admin route");
            ApiError::unauthorized("Missing authorization header")
                .with_details("Request must include an Authorization header with a Bearer token")
        })?;

    auth_value.strip_prefix("Bearer ").ok_or_else(|| {
        tracing::warn!("Admin authorization header does not start with 'Bearer '");
        ApiError::unauthorized("Invalid authorization header format")
            .with_details("Authorization header must be in the format: 'Bearer <token>'")
    })
}

/// Require `Authorization: Bearer <ADMIN_API_TOKEN>` when a token is configured
pub async fn admin_token_middleware(
    State(state): State<AdminAuthState>,
    request: Request,
    next: Next,
) -> Response {
    let Some(expected) = state.api_token.as_deref() else {
        return next.run(request).await;
    };

    match extract_bearer_token(&request) {
        Ok(token) if token_matches(token, expected.as_str()) => next.run(request).await,
        Ok(_) => {
            tracing::warn!("Rejected admin request with invalid token");
            ApiError::unauthorized("Invalid admin token").into_response()
        }
        Err(e) => e.into_response(),
    }
}
