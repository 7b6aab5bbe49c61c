use crate::pool::DbPool;
use async_trait::async_trait;
use chrono::Utc;
use services::entitlement::{utc_day_bounds, QuotaCounter};
use services::UserId;

/// `user_messages` table: one row per answered chat message
pub struct PostgresMessageLedger {
    pool: DbPool,
}

impl PostgresMessageLedger {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl QuotaCounter for PostgresMessageLedger {
    async fn count_today(&self, user_id: UserId) -> anyhow::Result<u32> {
        let (start, end) = utc_day_bounds(Utc::now());
        let client = self.pool.get().await?;
        let row = client
            .query_one(
                "SELECT COUNT(*) AS used
                 FROM user_messages
                 WHERE user_id = $1 AND created_at >= $2 AND created_at < $3",
                &[&user_id, &start, &end],
            )
            .await?;

        let used: i64 = row.get("used");
        Ok(u32::try_from(used).unwrap_or(u32::MAX))
    }

    async fn record_message(&self, user_id: UserId) -> anyhow::Result<()> {
        tracing::debug!("Repository: Recording message for user_id={}", user_id);

        let client = self.pool.get().await?;
        client
            .execute(
                "INSERT INTO user_messages (user_id, created_at) VALUES ($1, NOW())",
                &[&user_id],
            )
            .await?;
        Ok(())
    }

    async fn reset_today(&self, user_id: UserId) -> anyhow::Result<u64> {
        let (start, end) = utc_day_bounds(Utc::now());
        let client = self.pool.get().await?;
        let removed = client
            .execute(
                "DELETE FROM user_messages
                 WHERE user_id = $1 AND created_at >= $2 AND created_at < $3",
                &[&user_id, &start, &end],
            )
            .await?;

        tracing::info!(
            "Repository: Removed {} message rows for user_id={}",
            removed,
            user_id
        );
        Ok(removed)
    }
}
