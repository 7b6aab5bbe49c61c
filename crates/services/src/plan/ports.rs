use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::UserId;

/// Plan type as written to account metadata and the `user_plans` table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "utoipa", derive(utoipa::ToSchema))]
pub enum PlanType {
    Free,
    Pro,
    ProLifetime,
}

impl PlanType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Free => "free",
            Self::Pro => "pro",
            Self::ProLifetime => "pro_lifetime",
        }
    }

    pub fn is_premium(&self) -> bool {
        matches!(self, Self::Pro | Self::ProLifetime)
    }

    /// True for the raw strings "pro" and "pro_lifetime"
    pub fn is_premium_str(value: &str) -> bool {
        value
            .parse::<PlanType>()
            .map(|p| p.is_premium())
            .unwrap_or(false)
    }
}

impl fmt::Display for PlanType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PlanType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "free" => Ok(Self::Free),
            "pro" => Ok(Self::Pro),
            "pro_lifetime" => Ok(Self::ProLifetime),
            other => Err(format!("Invalid plan type: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    Active,
    Cancelled,
}

impl SubscriptionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for SubscriptionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Row of the `user_plans` mirror table.
///
/// Columns are kept as raw strings: the table is shared with other writers and may hold
/// values this service does not produce.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "utoipa", derive(utoipa::ToSchema))]
pub struct UserPlanRow {
    pub user_id: UserId,
    pub plan_type: String,
    pub subscription_status: String,
    pub subscription_id: Option<String>,
    pub whop_plan_id: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl UserPlanRow {
    /// Premium plan type with an active subscription
    pub fn is_active_premium(&self) -> bool {
        PlanType::is_premium_str(&self.plan_type)
            && self.subscription_status == SubscriptionStatus::Active.as_str()
    }
}

/// Values written to `user_plans`; `updated_at` is stamped by the repository
#[derive(Debug, Clone, PartialEq)]
pub struct UserPlanWrite {
    pub user_id: UserId,
    pub plan_type: PlanType,
    pub subscription_status: SubscriptionStatus,
    pub subscription_id: Option<String>,
    pub whop_plan_id: Option<String>,
}

/// Error types for mirror table operations
#[derive(Debug, Clone, PartialEq)]
pub enum PlanStoreError {
    /// The `user_plans` table does not exist in this deployment
    TableMissing,
    /// Any other database failure (connection, constraint, ...)
    Database(String),
}

impl fmt::Display for PlanStoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TableMissing => write!(f, "user_plans table does not exist"),
            Self::Database(msg) => write!(f, "Database error: {}", msg),
        }
    }
}

impl std::error::Error for PlanStoreError {}

impl From<anyhow::Error> for PlanStoreError {
    fn from(err: anyhow::Error) -> Self {
        Self::Database(err.to_string())
    }
}

/// Repository trait for the `user_plans` mirror table
#[async_trait]
pub trait UserPlanRepository: Send + Sync {
    async fn get_plan(&self, user_id: UserId) -> Result<Option<UserPlanRow>, PlanStoreError>;

    /// Insert or overwrite the row keyed by `user_id`
    async fn upsert_plan(&self, plan: &UserPlanWrite) -> Result<(), PlanStoreError>;

    async fn delete_plan(&self, user_id: UserId) -> Result<(), PlanStoreError>;

    /// Plain insert; fails if a row for the user already exists
    async fn insert_plan(&self, plan: &UserPlanWrite) -> Result<(), PlanStoreError>;
}
