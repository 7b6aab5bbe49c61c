use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;

use super::ports::{
    DowngradeOutcome, ReconciliationError, ReconciliationService, UpgradeOutcome, UpgradeRequest,
    Verification,
};
use crate::account::ports::{
    META_CODE_ACTIVATED, META_EXTERNAL_PLAN_ID, META_PLAN, META_PLAN_TYPE,
    META_SUBSCRIPTION_ID, META_SUBSCRIPTION_STATUS, META_SYNCED_AT, META_UPGRADED_AT,
};
use crate::account::{AccountMetadata, AccountRecord, AccountStore};
use crate::plan::{PlanType, SubscriptionStatus, UserPlanRepository, UserPlanWrite};
use crate::UserId;

pub struct ReconciliationServiceImpl {
    account_store: Arc<dyn AccountStore>,
    plan_repository: Arc<dyn UserPlanRepository>,
}

impl ReconciliationServiceImpl {
    pub fn new(
        account_store: Arc<dyn AccountStore>,
        plan_repository: Arc<dyn UserPlanRepository>,
    ) -> Self {
        Self {
            account_store,
            plan_repository,
        }
    }

    async fn write_metadata(
        &self,
        account: &AccountRecord,
        patch: AccountMetadata,
    ) -> Result<AccountRecord, ReconciliationError> {
        let mut metadata = account.user_metadata.clone();
        metadata.merge(patch);

        self.account_store
            .update_metadata(account.id, &metadata)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, user_id = %account.id, "Failed to update account metadata");
                ReconciliationError::MetadataWriteFailed(e)
            })
    }

    /// Upsert the mirror row; on failure delete and re-insert it.
    ///
    /// Returns the last error text when both paths fail.
    async fn write_mirror(&self, plan: &UserPlanWrite) -> Result<(), String> {
        let upsert_err = match self.plan_repository.upsert_plan(plan).await {
            Ok(()) => {
                tracing::debug!(
                    "Upserted user_plans row for user_id={} plan_type={}",
                    plan.user_id,
                    plan.plan_type
                );
                return Ok(());
            }
            Err(e) => e,
        };

        tracing::warn!(
            error = %upsert_err,
            user_id = %plan.user_id,
            "user_plans upsert failed, retrying as delete + insert"
        );

        if let Err(e) = self.plan_repository.delete_plan(plan.user_id).await {
            tracing::debug!(error = %e, "user_plans delete before re-insert failed");
        }

        match self.plan_repository.insert_plan(plan).await {
            Ok(()) => {
                tracing::info!("Re-inserted user_plans row for user_id={}", plan.user_id);
                Ok(())
            }
            Err(e) => {
                tracing::error!(error = %e, user_id = %plan.user_id, "user_plans insert failed");
                Err(e.to_string())
            }
        }
    }

    async fn mirror_plan_type(&self, user_id: UserId) -> Option<String> {
        match self.plan_repository.get_plan(user_id).await {
            Ok(row) => row.map(|r| r.plan_type),
            Err(e) => {
                tracing::debug!(error = %e, "Could not read back user_plans row");
                None
            }
        }
    }

    async fn verify(&self, user_id: UserId, intended: PlanType) -> Verification {
        let metadata_plan_type = match self.account_store.get_by_id(user_id).await {
            Ok(account) => account.and_then(|a| a.user_metadata.plan_type().map(str::to_string)),
            Err(e) => {
                tracing::warn!(error = %e, user_id = %user_id, "Could not read back account metadata");
                None
            }
        };
        let mirror_plan_type = self.mirror_plan_type(user_id).await;

        Verification {
            metadata_matches: metadata_plan_type.as_deref() == Some(intended.as_str()),
            mirror_matches: mirror_plan_type.as_deref() == Some(intended.as_str()),
            metadata_plan_type,
            mirror_plan_type,
        }
    }
}

#[async_trait]
impl ReconciliationService for ReconciliationServiceImpl {
    async fn upgrade(&self, request: UpgradeRequest) -> Result<UpgradeOutcome, ReconciliationError> {
        let user_id = request.account.id;
        let now = Utc::now().to_rfc3339();
        tracing::info!(
            "Upgrading user_id={} to plan_type={}",
            user_id,
            request.plan_type
        );

        let mut patch = AccountMetadata::new();
        patch.set(META_PLAN, PlanType::Pro.as_str());
        patch.set(META_PLAN_TYPE, request.plan_type.as_str());
        patch.set(META_SUBSCRIPTION_STATUS, SubscriptionStatus::Active.as_str());
        if let Some(subscription_id) = &request.subscription_id {
            patch.set(META_SUBSCRIPTION_ID, subscription_id.as_str());
        }
        if let Some(external_plan_id) = &request.external_plan_id {
            patch.set(META_EXTERNAL_PLAN_ID, external_plan_id.as_str());
        }
        patch.set(META_UPGRADED_AT, now.as_str());
        if request.mark_synced {
            patch.set(META_SYNCED_AT, now.as_str());
        }
        if request.code_activated {
            patch.set(META_CODE_ACTIVATED, true);
        }

        let account = self.write_metadata(&request.account, patch).await?;

        // Ids come from the merged metadata so earlier values carry over
        let mirror_write = UserPlanWrite {
            user_id,
            plan_type: request.plan_type,
            subscription_status: SubscriptionStatus::Active,
            subscription_id: account.user_metadata.subscription_id().map(str::to_string),
            whop_plan_id: account.user_metadata.external_plan_id().map(str::to_string),
        };

        let mut warning = None;
        let mut user_plans_updated = match self.write_mirror(&mirror_write).await {
            Ok(()) => true,
            Err(e) => {
                warning = Some(format!(
                    "Metadata updated but user_plans table update failed: {}",
                    e
                ));
                false
            }
        };

        let verification = if request.verify {
            Some(self.verify(user_id, request.plan_type).await)
        } else {
            None
        };

        // A failed write path can still have landed; trust a matching read-back
        if !user_plans_updated {
            let mirror_matches = match &verification {
                Some(v) => v.mirror_matches,
                None => {
                    self.mirror_plan_type(user_id).await.as_deref()
                        == Some(request.plan_type.as_str())
                }
            };
            if mirror_matches {
                tracing::info!("Verified user_plans row for user_id={} after write error", user_id);
                user_plans_updated = true;
                warning = None;
            }
        }

        Ok(UpgradeOutcome {
            account,
            plan_type: request.plan_type,
            metadata_updated: true,
            user_plans_updated,
            warning,
            verification,
        })
    }

    async fn downgrade(
        &self,
        account: &AccountRecord,
    ) -> Result<DowngradeOutcome, ReconciliationError> {
        tracing::info!("Downgrading user_id={} to free", account.id);

        let mut patch = AccountMetadata::new();
        patch.set(META_PLAN, PlanType::Free.as_str());
        patch.set(META_PLAN_TYPE, PlanType::Free.as_str());
        patch.set(META_SUBSCRIPTION_STATUS, SubscriptionStatus::Cancelled.as_str());

        let updated = self.write_metadata(account, patch).await?;

        let mirror_write = UserPlanWrite {
            user_id: account.id,
            plan_type: PlanType::Free,
            subscription_status: SubscriptionStatus::Cancelled,
            subscription_id: updated.user_metadata.subscription_id().map(str::to_string),
            whop_plan_id: updated.user_metadata.external_plan_id().map(str::to_string),
        };

        let (user_plans_updated, warning) = match self.write_mirror(&mirror_write).await {
            Ok(()) => (true, None),
            Err(e) => {
                tracing::warn!(user_id = %account.id, "Downgrade not mirrored to user_plans");
                (
                    false,
                    Some(format!(
                        "Metadata updated but user_plans table update failed: {}",
                        e
                    )),
                )
            }
        };

        Ok(DowngradeOutcome {
            account: updated,
            metadata_updated: true,
            user_plans_updated,
            warning,
        })
    }
}
