use async_trait::async_trait;
use serde::Serialize;
use std::fmt;

use crate::account::AccountError;
use crate::plan::PlanType;
use crate::reconciliation::{ReconciliationError, Verification};
use crate::UserId;

/// Membership statuses that still grant access
pub const LIVE_MEMBERSHIP_STATUSES: [&str; 3] = ["active", "trialing", "completed"];

/// Membership as listed by the payment platform
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Membership {
    pub id: Option<String>,
    pub plan_id: Option<String>,
    pub plan_name: Option<String>,
    pub status: Option<String>,
    /// Platform's own access flag, when present
    pub valid: Option<bool>,
}

impl Membership {
    /// Whether this membership currently grants access. An explicit `valid` flag wins over `status`.
    pub fn is_live(&self) -> bool {
        if let Some(valid) = self.valid {
            return valid;
        }
        self.status
            .as_deref()
            .map(|status| {
                LIVE_MEMBERSHIP_STATUSES
                    .iter()
                    .any(|live| status.eq_ignore_ascii_case(live))
            })
            .unwrap_or(false)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PaymentsError {
    #[error("Payment platform API key is not configured")]
    NotConfigured,
    #[error("Failed to reach payment platform: {0}")]
    Transport(String),
    #[error("Payment platform returned status {status}: {body}")]
    Upstream { status: u16, body: String },
    #[error("Invalid payment platform response: {0}")]
    InvalidResponse(String),
}

/// Read access to the payment platform's membership records
#[async_trait]
pub trait PaymentsClient: Send + Sync {
    fn is_configured(&self) -> bool;

    /// First live membership whose user or customer email matches (case-insensitive)
    async fn find_membership_by_email(
        &self,
        email: &str,
    ) -> Result<Option<Membership>, PaymentsError>;
}

/// What a webhook delivery did to the account
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "utoipa", derive(utoipa::ToSchema))]
pub enum WebhookAction {
    Upgraded,
    Downgraded,
    Ignored,
}

/// Acknowledgement body returned to the payment platform
#[derive(Debug, Clone, Serialize)]
#[cfg_attr(feature = "utoipa", derive(utoipa::ToSchema))]
pub struct WebhookAck {
    pub received: bool,
    pub event_type: String,
    pub action: WebhookAction,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<UserId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plan_type: Option<PlanType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_plans_updated: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl WebhookAck {
    pub fn ignored(event_type: impl Into<String>) -> Self {
        Self {
            received: true,
            event_type: event_type.into(),
            action: WebhookAction::Ignored,
            user_id: None,
            plan_type: None,
            user_plans_updated: None,
            warning: None,
            email: None,
        }
    }

    pub fn with_warning(mut self, warning: impl Into<String>) -> Self {
        self.warning = Some(warning.into());
        self
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }
}

/// Error types for webhook processing
#[derive(Debug)]
pub enum WebhookError {
    /// No shared secret configured; every delivery is rejected
    SecretNotConfigured,
    /// Signature missing or not matching the body
    InvalidSignature,
    /// Body is not the expected JSON envelope
    InvalidPayload(String),
    /// Activation event without any customer email
    MissingCustomerEmail,
    Account(AccountError),
    Reconciliation(ReconciliationError),
}

impl fmt::Display for WebhookError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SecretNotConfigured => write!(f, "Webhook secret is not configured"),
            Self::InvalidSignature => write!(f, "Invalid webhook signature"),
            Self::InvalidPayload(msg) => write!(f, "Invalid webhook payload: {}", msg),
            Self::MissingCustomerEmail => write!(f, "Missing customer email"),
            Self::Account(e) => write!(f, "{}", e),
            Self::Reconciliation(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for WebhookError {}

/// Result of a manual resync
#[derive(Debug, Clone)]
pub struct ResyncOutcome {
    pub user_id: UserId,
    pub email: Option<String>,
    pub plan_type: PlanType,
    pub subscription_status: Option<String>,
    pub whop_subscription_found: bool,
    pub metadata_updated: bool,
    pub user_plans_updated: bool,
    pub warning: Option<String>,
    pub verification: Option<Verification>,
}

#[derive(Debug)]
pub enum ResyncError {
    AccountNotFound,
    Account(AccountError),
    Reconciliation(ReconciliationError),
}

impl fmt::Display for ResyncError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AccountNotFound => write!(f, "Account not found"),
            Self::Account(e) => write!(f, "{}", e),
            Self::Reconciliation(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for ResyncError {}

/// Entry points that turn payment-platform state into premium entitlements
#[async_trait]
pub trait PaymentSyncService: Send + Sync {
    /// Verify and apply one webhook delivery. `payload` is the raw request body.
    async fn handle_whop_webhook(
        &self,
        payload: &[u8],
        signature: Option<&str>,
    ) -> Result<WebhookAck, WebhookError>;

    /// Re-derive premium status for an account from the payment platform
    async fn resync_by_email(&self, email: &str) -> Result<ResyncOutcome, ResyncError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn membership(status: Option<&str>, valid: Option<bool>) -> Membership {
        Membership {
            id: Some("mem_1".to_string()),
            plan_id: None,
            plan_name: None,
            status: status.map(str::to_string),
            valid,
        }
    }

    #[test]
    fn test_membership_liveness() {
        assert!(membership(Some("active"), None).is_live());
        assert!(membership(Some("Trialing"), None).is_live());
        assert!(membership(Some("completed"), None).is_live());
        assert!(!membership(Some("expired"), None).is_live());
        assert!(!membership(Some("canceled"), None).is_live());
        assert!(!membership(None, None).is_live());
        assert!(membership(Some("past_due"), Some(true)).is_live());
        assert!(!membership(Some("active"), Some(false)).is_live());
    }
}
