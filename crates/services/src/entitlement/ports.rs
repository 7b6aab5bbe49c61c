use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use crate::account::AccountRecord;
use crate::chat::ports::Agent;
use crate::plan::UserPlanRow;
use crate::UserId;

/// Messages per UTC day for free accounts
pub const FREE_DAILY_MESSAGE_LIMIT: u32 = 20;

pub const DAILY_LIMIT_REACHED_REASON: &str =
    "You've reached your daily limit. Upgrade to Duna Pro for unlimited access.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "utoipa", derive(utoipa::ToSchema))]
pub enum PlanTier {
    Free,
    Pro,
}

/// Entitlement computed per request; never persisted
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "utoipa", derive(utoipa::ToSchema))]
pub struct ResolvedPlan {
    #[serde(rename = "type")]
    pub tier: PlanTier,
    pub messages_used: u32,
    /// `None` means unlimited
    pub messages_limit: Option<u32>,
    pub is_unlimited: bool,
}

impl ResolvedPlan {
    pub fn free(messages_used: u32, limit: u32) -> Self {
        Self {
            tier: PlanTier::Free,
            messages_used,
            messages_limit: Some(limit),
            is_unlimited: false,
        }
    }

    pub fn pro(messages_used: u32) -> Self {
        Self {
            tier: PlanTier::Pro,
            messages_used,
            messages_limit: None,
            is_unlimited: true,
        }
    }

    pub fn can_send(&self) -> bool {
        if self.is_unlimited {
            return true;
        }
        self.messages_limit
            .map(|limit| self.messages_used < limit)
            .unwrap_or(true)
    }

    pub fn remaining(&self) -> Option<u32> {
        self.messages_limit
            .map(|limit| limit.saturating_sub(self.messages_used))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "utoipa", derive(utoipa::ToSchema))]
pub struct QuotaDecision {
    pub can_send: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl QuotaDecision {
    pub fn allowed() -> Self {
        Self {
            can_send: true,
            reason: None,
        }
    }

    pub fn daily_limit_reached() -> Self {
        Self {
            can_send: false,
            reason: Some(DAILY_LIMIT_REACHED_REASON.to_string()),
        }
    }
}

/// Diagnostic view of every premium signal held for one account
#[derive(Debug, Clone, Serialize)]
pub struct UserInspection {
    pub account: AccountRecord,
    pub mirror: Option<UserPlanRow>,
    /// Set when the mirror table could not be read
    pub mirror_error: Option<String>,
    /// Strict reading: premium type and active status in metadata or in the mirror row
    pub is_premium: bool,
}

/// `[start, end)` of the UTC day containing `now`
pub fn utc_day_bounds(now: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
    let start = now.date_naive().and_time(NaiveTime::MIN).and_utc();
    (start, start + Duration::days(1))
}

/// Counter of messages sent by a user during the current UTC day
#[async_trait]
pub trait QuotaCounter: Send + Sync {
    async fn count_today(&self, user_id: UserId) -> anyhow::Result<u32>;

    async fn record_message(&self, user_id: UserId) -> anyhow::Result<()>;

    /// Forget today's messages; returns how many were removed
    async fn reset_today(&self, user_id: UserId) -> anyhow::Result<u64>;
}

#[async_trait]
pub trait EntitlementService: Send + Sync {
    /// Resolve the plan for an account, or the anonymous free plan for `None`.
    async fn resolve_plan(&self, account: Option<&AccountRecord>) -> ResolvedPlan;

    async fn can_send_message(&self, account: Option<&AccountRecord>) -> QuotaDecision;

    fn can_use_agent(&self, plan: &ResolvedPlan, agent: Agent) -> bool;

    /// Append one message to today's count, falling back to the local counter
    async fn record_message(&self, user_id: UserId);

    /// Clear today's count in both counters; returns ledger rows removed
    async fn reset_today(&self, user_id: UserId) -> u64;

    async fn inspect(&self, account: &AccountRecord) -> UserInspection;
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_day_bounds_cover_utc_day() {
        let now = Utc.with_ymd_and_hms(2025, 3, 9, 23, 59, 59).unwrap();
        let (start, end) = utc_day_bounds(now);
        assert_eq!(start, Utc.with_ymd_and_hms(2025, 3, 9, 0, 0, 0).unwrap());
        assert_eq!(end, Utc.with_ymd_and_hms(2025, 3, 10, 0, 0, 0).unwrap());
        assert!(start <= now && now < end);
    }

    #[test]
    fn test_resolved_plan_serialization() {
        let json = serde_json::to_value(ResolvedPlan::pro(7)).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "type": "pro",
                "messagesUsed": 7,
                "messagesLimit": null,
                "isUnlimited": true
            })
        );

        let json = serde_json::to_value(ResolvedPlan::free(3, 20)).unwrap();
        assert_eq!(json["type"], "free");
        assert_eq!(json["messagesLimit"], 20);
    }

    #[test]
    fn test_quota_boundary() {
        assert!(ResolvedPlan::free(19, 20).can_send());
        assert!(!ResolvedPlan::free(20, 20).can_send());
        assert!(!ResolvedPlan::free(25, 20).can_send());
        assert!(ResolvedPlan::pro(10_000).can_send());
        assert_eq!(ResolvedPlan::free(25, 20).remaining(), Some(0));
    }

    #[test]
    fn test_decision_reason_omitted_when_allowed() {
        let json = serde_json::to_value(QuotaDecision::allowed()).unwrap();
        assert_eq!(json, serde_json::json!({"canSend": true}));

        let json = serde_json::to_value(QuotaDecision::daily_limit_reached()).unwrap();
        assert_eq!(json["canSend"], false);
        assert_eq!(json["reason"], DAILY_LIMIT_REACHED_REASON);
    }
}
