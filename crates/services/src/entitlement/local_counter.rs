use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;

use super::ports::QuotaCounter;
use crate::UserId;

/// Process-local message counter keyed by `(user, UTC date)`.
///
/// Used when the message ledger is unavailable. Not authoritative and lost on restart.
#[derive(Default)]
pub struct LocalQuotaCounter {
    counts: RwLock<HashMap<(UserId, NaiveDate), u32>>,
}

impl LocalQuotaCounter {
    pub fn new() -> Self {
        Self::default()
    }

    fn today() -> NaiveDate {
        Utc::now().date_naive()
    }

    pub async fn count_on(&self, user_id: UserId, date: NaiveDate) -> u32 {
        self.counts
            .read()
            .await
            .get(&(user_id, date))
            .copied()
            .unwrap_or(0)
    }

    pub async fn increment_on(&self, user_id: UserId, date: NaiveDate) -> u32 {
        let mut counts = self.counts.write().await;
        // Entries from previous days can never be read again
        counts.retain(|(_, day), _| *day >= date);
        let count = counts.entry((user_id, date)).or_insert(0);
        *count = count.saturating_add(1);
        *count
    }
}

#[async_trait]
impl QuotaCounter for LocalQuotaCounter {
    async fn count_today(&self, user_id: UserId) -> anyhow::Result<u32> {
        Ok(self.count_on(user_id, Self::today()).await)
    }

    async fn record_message(&self, user_id: UserId) -> anyhow::Result<()> {
        let count = self.increment_on(user_id, Self::today()).await;
        tracing::debug!(
            "Local quota counter for user_id={} is now {}",
            user_id,
            count
        );
        Ok(())
    }

    async fn reset_today(&self, user_id: UserId) -> anyhow::Result<u64> {
        let removed = self
            .counts
            .write()
            .await
            .remove(&(user_id, Self::today()))
            .unwrap_or(0);
        Ok(u64::from(removed))
    }
}
