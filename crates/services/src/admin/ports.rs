use async_trait::async_trait;
use std::fmt;

use crate::account::AccountError;
use crate::entitlement::UserInspection;
use crate::plan::PlanType;
use crate::reconciliation::{ReconciliationError, UpgradeOutcome};
use crate::UserId;

/// Plan type granted by the admin upgrade when none is given
pub const DEFAULT_ADMIN_PLAN_TYPE: PlanType = PlanType::ProLifetime;

/// Effect of a redeemed activation code
#[derive(Debug, Clone)]
pub enum ActivationOutcome {
    ProUpgrade(UpgradeOutcome),
    MessageLimitReset {
        user_id: UserId,
        email: Option<String>,
        ledger_rows_removed: u64,
    },
}

impl ActivationOutcome {
    pub fn action(&self) -> &'static str {
        match self {
            Self::ProUpgrade(_) => "pro_upgrade",
            Self::MessageLimitReset { .. } => "reset_message_limit",
        }
    }
}

#[derive(Debug)]
pub enum AdminError {
    /// Requested plan type is not a premium plan type
    InvalidPlanType(String),
    /// Activation code matches neither known code
    InvalidCode,
    UserNotFound,
    Account(AccountError),
    Reconciliation(ReconciliationError),
}

impl fmt::Display for AdminError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidPlanType(plan) => write!(f, "Invalid plan type: {}", plan),
            Self::InvalidCode => write!(f, "Invalid activation code"),
            Self::UserNotFound => write!(f, "User not found"),
            Self::Account(e) => write!(f, "{}", e),
            Self::Reconciliation(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for AdminError {}

impl From<AccountError> for AdminError {
    fn from(err: AccountError) -> Self {
        Self::Account(err)
    }
}

impl From<ReconciliationError> for AdminError {
    fn from(err: ReconciliationError) -> Self {
        Self::Reconciliation(err)
    }
}

/// Operator and support actions on premium state
#[async_trait]
pub trait AdminService: Send + Sync {
    /// Grant premium unconditionally. `plan_type` defaults to lifetime.
    async fn upgrade_user(
        &self,
        email: &str,
        plan_type: Option<&str>,
    ) -> Result<UpgradeOutcome, AdminError>;

    async fn check_user(&self, email: &str) -> Result<UserInspection, AdminError>;

    async fn activate_code(
        &self,
        user_id: UserId,
        code: &str,
    ) -> Result<ActivationOutcome, AdminError>;
}
