use crate::pool::DbPool;
use async_trait::async_trait;
use services::plan::{PlanStoreError, UserPlanRepository, UserPlanRow, UserPlanWrite};
use services::UserId;
use tokio_postgres::error::SqlState;

pub struct PostgresUserPlanRepository {
    pool: DbPool,
}

impl PostgresUserPlanRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    async fn client(&self) -> Result<deadpool_postgres::Object, PlanStoreError> {
        self.pool
            .get()
            .await
            .map_err(|e| PlanStoreError::Database(e.to_string()))
    }
}

/// Undefined table (42P01) is reported separately so callers can fail open
pub(crate) fn map_db_error(err: tokio_postgres::Error) -> PlanStoreError {
    if err.code() == Some(&SqlState::UNDEFINED_TABLE) {
        return PlanStoreError::TableMissing;
    }
    let message = err
        .as_db_error()
        .map(|db| db.message().to_string())
        .unwrap_or_else(|| err.to_string());
    PlanStoreError::Database(message)
}

#[async_trait]
impl UserPlanRepository for PostgresUserPlanRepository {
    async fn get_plan(&self, user_id: UserId) -> Result<Option<UserPlanRow>, PlanStoreError> {
        tracing::debug!("Repository: Fetching user plan for user_id={}", user_id);

        let client = self.client().await?;
        let row = client
            .query_opt(
                "SELECT user_id, plan_type, subscription_status, subscription_id, whop_plan_id,
                        updated_at
                 FROM user_plans
                 WHERE user_id = $1",
                &[&user_id],
            )
            .await
            .map_err(map_db_error)?;

        Ok(row.map(|r| UserPlanRow {
            user_id: r.get("user_id"),
            plan_type: r.get("plan_type"),
            subscription_status: r.get("subscription_status"),
            subscription_id: r.get("subscription_id"),
            whop_plan_id: r.get("whop_plan_id"),
            updated_at: r.get("updated_at"),
        }))
    }

    async fn upsert_plan(&self, plan: &UserPlanWrite) -> Result<(), PlanStoreError> {
        tracing::info!(
            "Repository: Upserting user plan - user_id={}, plan_type={}, status={}",
            plan.user_id,
            plan.plan_type,
            plan.subscription_status
        );

        let client = self.client().await?;
        client
            .execute(
                "INSERT INTO user_plans (
                    user_id, plan_type, subscription_status, subscription_id, whop_plan_id,
                    updated_at
                 )
                 VALUES ($1, $2, $3, $4, $5, NOW())
                 ON CONFLICT (user_id)
                 DO UPDATE SET
                     plan_type = EXCLUDED.plan_type,
                     subscription_status = EXCLUDED.subscription_status,
                     subscription_id = EXCLUDED.subscription_id,
                     whop_plan_id = EXCLUDED.whop_plan_id,
                     updated_at = NOW()",
                &[
                    &plan.user_id,
                    &plan.plan_type.as_str(),
                    &plan.subscription_status.as_str(),
                    &plan.subscription_id,
                    &plan.whop_plan_id,
                ],
            )
            .await
            .map_err(map_db_error)?;
        Ok(())
    }

    async fn delete_plan(&self, user_id: UserId) -> Result<(), PlanStoreError> {
        tracing::debug!("Repository: Deleting user plan for user_id={}", user_id);

        let client = self.client().await?;
        client
            .execute("DELETE FROM user_plans WHERE user_id = $1", &[&user_id])
            .await
            .map_err(map_db_error)?;
        Ok(())
    }

    async fn insert_plan(&self, plan: &UserPlanWrite) -> Result<(), PlanStoreError> {
        tracing::debug!(
            "Repository: Inserting user plan - user_id={}, plan_type={}",
            plan.user_id,
            plan.plan_type
        );

        let client = self.client().await?;
        client
            .execute(
                "INSERT INTO user_plans (
                    user_id, plan_type, subscription_status, subscription_id, whop_plan_id,
                    updated_at
                 )
                 VALUES ($1, $2, $3, $4, $5, NOW())",
                &[
                    &plan.user_id,
                    &plan.plan_type.as_str(),
                    &plan.subscription_status.as_str(),
                    &plan.subscription_id,
                    &plan.whop_plan_id,
                ],
            )
            .await
            .map_err(map_db_error)?;
        Ok(())
    }
}
