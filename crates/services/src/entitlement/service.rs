use async_trait::async_trait;
use std::sync::Arc;

use super::ports::{
    EntitlementService, QuotaCounter, QuotaDecision, ResolvedPlan, UserInspection,
    FREE_DAILY_MESSAGE_LIMIT,
};
use crate::account::AccountRecord;
use crate::chat::ports::Agent;
use crate::plan::{PlanStoreError, UserPlanRepository};
use crate::UserId;

pub struct EntitlementServiceImpl {
    plan_repository: Arc<dyn UserPlanRepository>,
    ledger: Arc<dyn QuotaCounter>,
    fallback_counter: Arc<dyn QuotaCounter>,
    daily_limit: u32,
}

impl EntitlementServiceImpl {
    pub fn new(
        plan_repository: Arc<dyn UserPlanRepository>,
        ledger: Arc<dyn QuotaCounter>,
        fallback_counter: Arc<dyn QuotaCounter>,
    ) -> Self {
        Self {
            plan_repository,
            ledger,
            fallback_counter,
            daily_limit: FREE_DAILY_MESSAGE_LIMIT,
        }
    }

    pub fn with_daily_limit(mut self, daily_limit: u32) -> Self {
        self.daily_limit = daily_limit;
        self
    }

    /// Mirror row first, then metadata. Mirror read failures count as "no row".
    async fn is_premium(&self, account: &AccountRecord) -> bool {
        match self.plan_repository.get_plan(account.id).await {
            Ok(Some(row)) if row.is_active_premium() => {
                tracing::debug!("user_id={} is premium per user_plans", account.id);
                return true;
            }
            Ok(_) => {}
            Err(PlanStoreError::TableMissing) => {
                tracing::debug!("user_plans table missing, using account metadata only");
            }
            Err(e) => {
                tracing::warn!(error = %e, user_id = %account.id, "Failed to read user_plans row");
            }
        }

        account.user_metadata.indicates_premium()
    }

    async fn messages_used_today(&self, user_id: UserId) -> u32 {
        match self.ledger.count_today(user_id).await {
            Ok(count) => count,
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    user_id = %user_id,
                    "Message ledger unavailable, using local counter"
                );
                self.fallback_counter
                    .count_today(user_id)
                    .await
                    .unwrap_or_default()
            }
        }
    }
}

#[async_trait]
impl EntitlementService for EntitlementServiceImpl {
    async fn resolve_plan(&self, account: Option<&AccountRecord>) -> ResolvedPlan {
        let Some(account) = account else {
            return ResolvedPlan::free(0, self.daily_limit);
        };

        let is_pro = self.is_premium(account).await;
        let messages_used = self.messages_used_today(account.id).await;

        if is_pro {
            ResolvedPlan::pro(messages_used)
        } else {
            ResolvedPlan::free(messages_used, self.daily_limit)
        }
    }

    async fn can_send_message(&self, account: Option<&AccountRecord>) -> QuotaDecision {
        let plan = self.resolve_plan(account).await;
        if plan.can_send() {
            QuotaDecision::allowed()
        } else {
            QuotaDecision::daily_limit_reached()
        }
    }

    fn can_use_agent(&self, plan: &ResolvedPlan, agent: Agent) -> bool {
        !agent.requires_premium() || plan.is_unlimited
    }

    async fn record_message(&self, user_id: UserId) {
        if let Err(e) = self.ledger.record_message(user_id).await {
            tracing::warn!(
                error = %e,
                user_id = %user_id,
                "Failed to append to message ledger, counting locally"
            );
            if let Err(e) = self.fallback_counter.record_message(user_id).await {
                tracing::error!(error = %e, user_id = %user_id, "Local quota counter failed");
            }
        }
    }

    async fn reset_today(&self, user_id: UserId) -> u64 {
        let removed = match self.ledger.reset_today(user_id).await {
            Ok(removed) => removed,
            Err(e) => {
                tracing::warn!(error = %e, user_id = %user_id, "Failed to reset message ledger");
                0
            }
        };

        if let Err(e) = self.fallback_counter.reset_today(user_id).await {
            tracing::warn!(error = %e, user_id = %user_id, "Failed to reset local counter");
        }

        tracing::info!(
            "Reset today's message count for user_id={} (ledger rows removed: {})",
            user_id,
            removed
        );
        removed
    }

    async fn inspect(&self, account: &AccountRecord) -> UserInspection {
        let (mirror, mirror_error) = match self.plan_repository.get_plan(account.id).await {
            Ok(row) => (row, None),
            Err(e) => (None, Some(e.to_string())),
        };

        let is_premium = account.user_metadata.is_active_premium()
            || mirror
                .as_ref()
                .map(|row| row.is_active_premium())
                .unwrap_or(false);

        UserInspection {
            account: account.clone(),
            mirror,
            mirror_error,
            is_premium,
        }
    }
}
