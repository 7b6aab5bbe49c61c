use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::account::{AccountError, AccountRecord};
use crate::plan::PlanType;

/// Request to grant premium to an account
#[derive(Debug, Clone)]
pub struct UpgradeRequest {
    pub account: AccountRecord,
    pub plan_type: PlanType,
    /// Left unchanged in metadata when `None`
    pub subscription_id: Option<String>,
    /// Payment-platform plan identifier; left unchanged in metadata when `None`
    pub external_plan_id: Option<String>,
    /// Stamp `synced_at` (manual resync)
    pub mark_synced: bool,
    /// Stamp `code_activated` (activation code)
    pub code_activated: bool,
    /// Re-read both stores after writing and report what they hold
    pub verify: bool,
}

impl UpgradeRequest {
    pub fn new(account: AccountRecord, plan_type: PlanType) -> Self {
        Self {
            account,
            plan_type,
            subscription_id: None,
            external_plan_id: None,
            mark_synced: false,
            code_activated: false,
            verify: false,
        }
    }

    pub fn with_subscription_id(mut self, subscription_id: Option<String>) -> Self {
        self.subscription_id = subscription_id;
        self
    }

    pub fn with_external_plan_id(mut self, external_plan_id: Option<String>) -> Self {
        self.external_plan_id = external_plan_id;
        self
    }

    pub fn synced(mut self) -> Self {
        self.mark_synced = true;
        self
    }

    pub fn code_activated(mut self) -> Self {
        self.code_activated = true;
        self
    }

    pub fn verified(mut self) -> Self {
        self.verify = true;
        self
    }
}

/// What both stores hold after an upgrade
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "utoipa", derive(utoipa::ToSchema))]
pub struct Verification {
    pub metadata_plan_type: Option<String>,
    pub mirror_plan_type: Option<String>,
    pub metadata_matches: bool,
    pub mirror_matches: bool,
}

#[derive(Debug, Clone)]
pub struct UpgradeOutcome {
    /// Account as returned by the metadata write
    pub account: AccountRecord,
    pub plan_type: PlanType,
    pub metadata_updated: bool,
    pub user_plans_updated: bool,
    /// Set when the mirror table could not be written
    pub warning: Option<String>,
    pub verification: Option<Verification>,
}

#[derive(Debug, Clone)]
pub struct DowngradeOutcome {
    pub account: AccountRecord,
    pub metadata_updated: bool,
    pub user_plans_updated: bool,
    pub warning: Option<String>,
}

#[derive(Debug)]
pub enum ReconciliationError {
    /// The account store rejected the metadata write; nothing else was attempted
    MetadataWriteFailed(AccountError),
}

impl fmt::Display for ReconciliationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MetadataWriteFailed(e) => write!(f, "Failed to update account metadata: {}", e),
        }
    }
}

impl std::error::Error for ReconciliationError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::MetadataWriteFailed(e) => Some(e),
        }
    }
}

/// Writes premium state to the account metadata and the `user_plans` mirror.
#[async_trait]
pub trait ReconciliationService: Send + Sync {
    async fn upgrade(&self, request: UpgradeRequest) -> Result<UpgradeOutcome, ReconciliationError>;

    async fn downgrade(
        &self,
        account: &AccountRecord,
    ) -> Result<DowngradeOutcome, ReconciliationError>;
}
