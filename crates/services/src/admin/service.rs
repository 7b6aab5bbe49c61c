use async_trait::async_trait;
use std::sync::Arc;

use super::ports::{ActivationOutcome, AdminError, AdminService, DEFAULT_ADMIN_PLAN_TYPE};
use crate::account::{AccountRecord, AccountStore};
use crate::entitlement::{EntitlementService, UserInspection};
use crate::plan::PlanType;
use crate::reconciliation::{ReconciliationService, UpgradeOutcome, UpgradeRequest};
use crate::UserId;

/// Configuration for AdminServiceImpl
pub struct AdminServiceConfig {
    pub account_store: Arc<dyn AccountStore>,
    pub reconciliation: Arc<dyn ReconciliationService>,
    pub entitlement: Arc<dyn EntitlementService>,
    pub pro_upgrade_code: String,
    pub reset_message_limit_code: String,
}

pub struct AdminServiceImpl {
    account_store: Arc<dyn AccountStore>,
    reconciliation: Arc<dyn ReconciliationService>,
    entitlement: Arc<dyn EntitlementService>,
    pro_upgrade_code: String,
    reset_message_limit_code: String,
}

impl AdminServiceImpl {
    pub fn new(config: AdminServiceConfig) -> Self {
        Self {
            account_store: config.account_store,
            reconciliation: config.reconciliation,
            entitlement: config.entitlement,
            pro_upgrade_code: config.pro_upgrade_code,
            reset_message_limit_code: config.reset_message_limit_code,
        }
    }

    async fn account_by_email(&self, email: &str) -> Result<AccountRecord, AdminError> {
        self.account_store
            .find_by_email(email)
            .await?
            .ok_or(AdminError::UserNotFound)
    }
}

fn parse_premium_plan_type(plan_type: Option<&str>) -> Result<PlanType, AdminError> {
    let Some(raw) = plan_type.map(str::trim).filter(|p| !p.is_empty()) else {
        return Ok(DEFAULT_ADMIN_PLAN_TYPE);
    };
    raw.parse::<PlanType>()
        .ok()
        .filter(PlanType::is_premium)
        .ok_or_else(|| AdminError::InvalidPlanType(raw.to_string()))
}

#[async_trait]
impl AdminService for AdminServiceImpl {
    async fn upgrade_user(
        &self,
        email: &str,
        plan_type: Option<&str>,
    ) -> Result<UpgradeOutcome, AdminError> {
        let plan_type = parse_premium_plan_type(plan_type)?;
        let account = self.account_by_email(email).await?;
        tracing::info!(
            "Admin upgrade for user_id={} plan_type={}",
            account.id,
            plan_type
        );

        let outcome = self
            .reconciliation
            .upgrade(UpgradeRequest::new(account, plan_type).verified())
            .await?;
        Ok(outcome)
    }

    async fn check_user(&self, email: &str) -> Result<UserInspection, AdminError> {
        let account = self.account_by_email(email).await?;
        Ok(self.entitlement.inspect(&account).await)
    }

    async fn activate_code(
        &self,
        user_id: UserId,
        code: &str,
    ) -> Result<ActivationOutcome, AdminError> {
        let code = code.trim();
        let is_upgrade = !self.pro_upgrade_code.is_empty() && code == self.pro_upgrade_code;
        let is_reset =
            !self.reset_message_limit_code.is_empty() && code == self.reset_message_limit_code;
        if !is_upgrade && !is_reset {
            tracing::warn!("Rejected activation code for user_id={}", user_id);
            return Err(AdminError::InvalidCode);
        }

        let account = self
            .account_store
            .get_by_id(user_id)
            .await?
            .ok_or(AdminError::UserNotFound)?;

        if is_upgrade {
            tracing::info!("Activation code upgrade for user_id={}", user_id);
            let outcome = self
                .reconciliation
                .upgrade(UpgradeRequest::new(account, PlanType::ProLifetime).code_activated())
                .await?;
            return Ok(ActivationOutcome::ProUpgrade(outcome));
        }

        let ledger_rows_removed = self.entitlement.reset_today(user_id).await;
        Ok(ActivationOutcome::MessageLimitReset {
            user_id,
            email: account.email,
            ledger_rows_removed,
        })
    }
}
