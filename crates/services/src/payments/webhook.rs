//! Whop webhook signature verification and payload extraction.

use hmac::{Hmac, Mac};
use serde_json::Value;
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

pub const SIGNATURE_HEADER: &str = "x-whop-signature";

/// Check a hex HMAC-SHA256 signature of `payload` in constant time.
///
/// An optional `sha256=` prefix on the header value is accepted.
pub fn verify_signature(secret: &str, payload: &[u8], signature: &str) -> bool {
    let signature = signature.trim();
    let signature = signature.strip_prefix("sha256=").unwrap_or(signature);

    let expected = match hex::decode(signature) {
        Ok(bytes) => bytes,
        Err(_) => return false,
    };

    let mut mac = match HmacSha256::new_from_slice(secret.as_bytes()) {
        Ok(mac) => mac,
        Err(_) => return false,
    };
    mac.update(payload);
    mac.verify_slice(&expected).is_ok()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WebhookEventKind {
    Activate,
    Deactivate,
    Other,
}

pub fn classify_event(event_type: &str) -> WebhookEventKind {
    match event_type {
        "checkout.completed"
        | "subscription.created"
        | "subscription.activated"
        | "membership.went_valid"
        | "membership.activated" => WebhookEventKind::Activate,
        "subscription.cancelled"
        | "subscription.expired"
        | "subscription.deactivated"
        | "membership.went_invalid"
        | "membership.cancelled"
        | "membership.deactivated" => WebhookEventKind::Deactivate,
        _ => WebhookEventKind::Other,
    }
}

/// Fields of interest pulled out of a webhook body
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WebhookPayload {
    pub event_type: String,
    pub email: Option<String>,
    pub plan_id: Option<String>,
    pub plan_name: Option<String>,
    pub subscription_id: Option<String>,
}

const EMAIL_PATHS: &[&str] = &[
    "/data/customer/email",
    "/data/customer_email",
    "/data/email",
    "/data/user/email",
    "/data/membership/user/email",
    "/data/membership/customer/email",
    "/data/subscription/user/email",
    "/data/subscription/customer/email",
];

const PLAN_ID_PATHS: &[&str] = &[
    "/data/plan/id",
    "/data/plan_id",
    "/data/membership/plan/id",
    "/data/membership/plan_id",
    "/data/subscription/plan/id",
    "/data/subscription/plan_id",
];

const PLAN_NAME_PATHS: &[&str] = &["/data/plan/name", "/data/plan_name"];

const SUBSCRIPTION_ID_PATHS: &[&str] = &[
    "/data/subscription/id",
    "/data/subscription_id",
    "/data/membership/id",
    "/data/id",
];

/// First non-empty string found at any of `paths`
fn first_string(event: &Value, paths: &[&str]) -> Option<String> {
    paths
        .iter()
        .filter_map(|p| event.pointer(p))
        .filter_map(Value::as_str)
        .map(str::trim)
        .find(|s| !s.is_empty())
        .map(str::to_string)
}

pub fn parse_payload(payload: &[u8]) -> Result<WebhookPayload, serde_json::Error> {
    let event: Value = serde_json::from_slice(payload)?;

    Ok(WebhookPayload {
        event_type: event
            .get("type")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        email: first_string(&event, EMAIL_PATHS),
        plan_id: first_string(&event, PLAN_ID_PATHS),
        plan_name: first_string(&event, PLAN_NAME_PATHS),
        subscription_id: first_string(&event, SUBSCRIPTION_ID_PATHS),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const SECRET: &str = "whsec_test";

    fn sign_payload(secret: &str, payload: &[u8]) -> String {
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(payload);
        hex::encode(mac.finalize().into_bytes())
    }

    #[test]
    fn test_signature_accepts_matching_digest() {
        let body = br#"{"type":"checkout.completed"}"#;
        let signature = sign_payload(SECRET, body);
        assert!(verify_signature(SECRET, body, &signature));
        assert!(verify_signature(SECRET, body, &format!("sha256={}", signature)));
        assert!(verify_signature(SECRET, body, &signature.to_uppercase()));
    }

    #[test]
    fn test_signature_rejects_tampering() {
        let body = br#"{"type":"checkout.completed"}"#;
        let signature = sign_payload(SECRET, body);
        assert!(!verify_signature(SECRET, br#"{"type":"checkout.completed "}"#, &signature));
        assert!(!verify_signature("other-secret", body, &signature));
        assert!(!verify_signature(SECRET, body, ""));
        assert!(!verify_signature(SECRET, body, "not-hex"));
        assert!(!verify_signature(SECRET, body, &signature[..signature.len() - 2]));
    }

    #[test]
    fn test_event_classes() {
        for t in [
            "checkout.completed",
            "subscription.created",
            "subscription.activated",
            "membership.went_valid",
            "membership.activated",
        ] {
            assert_eq!(classify_event(t), WebhookEventKind::Activate, "{}", t);
        }
        for t in [
            "subscription.cancelled",
            "subscription.expired",
            "subscription.deactivated",
            "membership.went_invalid",
            "membership.cancelled",
            "membership.deactivated",
        ] {
            assert_eq!(classify_event(t), WebhookEventKind::Deactivate, "{}", t);
        }
        assert_eq!(classify_event("payment.succeeded"), WebhookEventKind::Other);
        assert_eq!(classify_event(""), WebhookEventKind::Other);
    }

    fn parse(value: Value) -> WebhookPayload {
        parse_payload(value.to_string().as_bytes()).unwrap()
    }

    #[test]
    fn test_top_level_shape() {
        let payload = parse(json!({
            "type": "checkout.completed",
            "data": {
                "customer": {"email": "buyer@example.com"},
                "plan": {"id": "plan_nAv9o4mMRgV37", "name": "Lifetime"},
                "subscription": {"id": "sub_1"},
                "id": "evt_data_1"
            }
        }));
        assert_eq!(payload.event_type, "checkout.completed");
        assert_eq!(payload.email.as_deref(), Some("buyer@example.com"));
        assert_eq!(payload.plan_id.as_deref(), Some("plan_nAv9o4mMRgV37"));
        assert_eq!(payload.plan_name.as_deref(), Some("Lifetime"));
        assert_eq!(payload.subscription_id.as_deref(), Some("sub_1"));
    }

    #[test]
    fn test_flat_shape() {
        let payload = parse(json!({
            "type": "subscription.created",
            "data": {
                "customer_email": "flat@example.com",
                "plan_id": "plan_x",
                "plan_name": "Monthly",
                "subscription_id": "sub_flat"
            }
        }));
        assert_eq!(payload.email.as_deref(), Some("flat@example.com"));
        assert_eq!(payload.plan_id.as_deref(), Some("plan_x"));
        assert_eq!(payload.plan_name.as_deref(), Some("Monthly"));
        assert_eq!(payload.subscription_id.as_deref(), Some("sub_flat"));
    }

    #[test]
    fn test_membership_shape() {
        let payload = parse(json!({
            "type": "membership.went_valid",
            "data": {
                "membership": {
                    "id": "mem_123",
                    "user": {"email": "member@example.com"},
                    "plan_id": "plan_m"
                }
            }
        }));
        assert_eq!(payload.email.as_deref(), Some("member@example.com"));
        assert_eq!(payload.plan_id.as_deref(), Some("plan_m"));
        assert_eq!(payload.subscription_id.as_deref(), Some("mem_123"));
    }

    #[test]
    fn test_subscription_shape() {
        let payload = parse(json!({
            "type": "subscription.cancelled",
            "data": {
                "subscription": {
                    "customer": {"email": "sub@example.com"},
                    "plan": {"id": "plan_s"}
                },
                "id": "data_id"
            }
        }));
        assert_eq!(payload.email.as_deref(), Some("sub@example.com"));
        assert_eq!(payload.plan_id.as_deref(), Some("plan_s"));
        assert_eq!(payload.subscription_id.as_deref(), Some("data_id"));
    }

    #[test]
    fn test_blank_values_are_skipped() {
        let payload = parse(json!({
            "type": "checkout.completed",
            "data": {"customer": {"email": "  "}, "email": "fallback@example.com"}
        }));
        assert_eq!(payload.email.as_deref(), Some("fallback@example.com"));
    }

    #[test]
    fn test_missing_fields() {
        let payload = parse(json!({"data": {}}));
        assert_eq!(payload, WebhookPayload::default());
        assert!(parse_payload(b"not json").is_err());
    }
}
