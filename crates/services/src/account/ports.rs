use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

use crate::plan::{PlanType, SubscriptionStatus};
use crate::UserId;

pub const META_PLAN: &str = "plan";
pub const META_PLAN_TYPE: &str = "plan_type";
pub const META_SUBSCRIPTION_STATUS: &str = "subscription_status";
pub const META_SUBSCRIPTION_ID: &str = "subscription_id";
pub const META_EXTERNAL_PLAN_ID: &str = "whop_plan_id";
pub const META_UPGRADED_AT: &str = "upgraded_at";
pub const META_SYNCED_AT: &str = "synced_at";
pub const META_CODE_ACTIVATED: &str = "code_activated";

/// Free-form metadata blob attached to an account.
///
/// Unknown keys are preserved; writers merge by key instead of replacing the blob.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountMetadata(pub Map<String, Value>);

impl AccountMetadata {
    pub fn new() -> Self {
        Self(Map::new())
    }

    fn str_field(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }

    pub fn plan(&self) -> Option<&str> {
        self.str_field(META_PLAN)
    }

    pub fn plan_type(&self) -> Option<&str> {
        self.str_field(META_PLAN_TYPE)
    }

    pub fn subscription_status(&self) -> Option<&str> {
        self.str_field(META_SUBSCRIPTION_STATUS)
    }

    pub fn subscription_id(&self) -> Option<&str> {
        self.str_field(META_SUBSCRIPTION_ID)
    }

    pub fn external_plan_id(&self) -> Option<&str> {
        self.str_field(META_EXTERNAL_PLAN_ID)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn set(&mut self, key: &str, value: impl Into<Value>) {
        self.0.insert(key.to_string(), value.into());
    }

    /// Overwrite every key present in `patch`, leaving the others untouched
    pub fn merge(&mut self, patch: AccountMetadata) {
        for (key, value) in patch.0 {
            self.0.insert(key, value);
        }
    }

    /// Lenient premium reading used by the resolver: any one premium marker is enough.
    pub fn indicates_premium(&self) -> bool {
        self.plan() == Some(PlanType::Pro.as_str())
            || self.subscription_status() == Some(SubscriptionStatus::Active.as_str())
            || self.plan_type().map(PlanType::is_premium_str).unwrap_or(false)
    }

    /// Strict reading: premium plan type with an active subscription.
    pub fn is_active_premium(&self) -> bool {
        self.plan_type().map(PlanType::is_premium_str).unwrap_or(false)
            && self.subscription_status() == Some(SubscriptionStatus::Active.as_str())
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }
}

/// Auth record of one user as held by the external account store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountRecord {
    pub id: UserId,
    pub email: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub user_metadata: AccountMetadata,
}

impl AccountRecord {
    pub fn email_matches(&self, email: &str) -> bool {
        self.email
            .as_deref()
            .map(|e| e.eq_ignore_ascii_case(email.trim()))
            .unwrap_or(false)
    }
}

/// Error types for account store operations
#[derive(Debug, Clone, PartialEq)]
pub enum AccountError {
    /// Auth provider URL or service key missing
    NotConfigured,
    /// No account with the given identifier
    NotFound,
    /// Transport failure or non-success status from the provider
    Provider(String),
    /// Provider answered with a body we could not decode
    InvalidResponse(String),
}

impl fmt::Display for AccountError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotConfigured => write!(f, "Auth provider is not configured"),
            Self::NotFound => write!(f, "Account not found"),
            Self::Provider(msg) => write!(f, "Auth provider error: {}", msg),
            Self::InvalidResponse(msg) => write!(f, "Invalid auth provider response: {}", msg),
        }
    }
}

impl std::error::Error for AccountError {}

/// Port to the external account store (auth provider admin API)
#[async_trait]
pub trait AccountStore: Send + Sync {
    async fn get_by_id(&self, user_id: UserId) -> Result<Option<AccountRecord>, AccountError>;

    /// Case-insensitive lookup by email
    async fn find_by_email(&self, email: &str) -> Result<Option<AccountRecord>, AccountError>;

    /// Replace the account's metadata with `metadata` and return the updated record
    async fn update_metadata(
        &self,
        user_id: UserId,
        metadata: &AccountMetadata,
    ) -> Result<AccountRecord, AccountError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn metadata(value: Value) -> AccountMetadata {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_any_premium_marker_counts() {
        assert!(metadata(json!({"plan": "pro"})).indicates_premium());
        assert!(metadata(json!({"subscription_status": "active"})).indicates_premium());
        assert!(metadata(json!({"plan_type": "pro_lifetime"})).indicates_premium());
        assert!(!metadata(json!({"plan": "free", "plan_type": "free"})).indicates_premium());
        assert!(!AccountMetadata::new().indicates_premium());
    }

    #[test]
    fn test_strict_reading_needs_type_and_status() {
        assert!(metadata(json!({"plan_type": "pro", "subscription_status": "active"}))
            .is_active_premium());
        assert!(!metadata(json!({"plan": "pro", "subscription_status": "active"}))
            .is_active_premium());
        assert!(!metadata(json!({"plan_type": "pro", "subscription_status": "cancelled"}))
            .is_active_premium());
    }

    #[test]
    fn test_merge_preserves_unknown_keys() {
        let mut base = metadata(json!({"full_name": "Ada", "plan": "free"}));
        base.merge(metadata(json!({"plan": "pro", "plan_type": "pro"})));
        assert_eq!(base.get("full_name"), Some(&json!("Ada")));
        assert_eq!(base.plan(), Some("pro"));
        assert_eq!(base.plan_type(), Some("pro"));
    }

    #[test]
    fn test_non_string_values_are_ignored_by_accessors() {
        let meta = metadata(json!({"plan": 1, "subscription_status": null}));
        assert_eq!(meta.plan(), None);
        assert_eq!(meta.subscription_status(), None);
    }

    #[test]
    fn test_email_matches_case_insensitively() {
        let account = AccountRecord {
            id: UserId::new(),
            email: Some("Ada@Example.com".to_string()),
            created_at: None,
            user_metadata: AccountMetadata::new(),
        };
        assert!(account.email_matches("ada@example.COM"));
        assert!(account.email_matches(" ada@example.com "));
        assert!(!account.email_matches("bob@example.com"));
    }
}
