use serde::{Deserialize, Serialize};
use services::account::AccountRecord;
use services::chat::{Agent, ChatMessage};
use services::plan::UserPlanRow;
use services::reconciliation::Verification;
use services::UserId;
use utoipa::ToSchema;

/// Shown after any premium change: the client caches the session's metadata
pub const RELOGIN_NOTE: &str =
    "User must log out and log back in for changes to take effect in the app.";

/// Account identity plus the plan fields held in its metadata
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AccountSummary {
    pub id: UserId,
    pub email: Option<String>,
    pub plan_type: Option<String>,
    pub subscription_status: Option<String>,
}

impl From<&AccountRecord> for AccountSummary {
    fn from(account: &AccountRecord) -> Self {
        Self {
            id: account.id,
            email: account.email.clone(),
            plan_type: account.user_metadata.plan_type().map(str::to_string),
            subscription_status: account
                .user_metadata
                .subscription_status()
                .map(str::to_string),
        }
    }
}

/// Request body carrying only an email
#[derive(Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct EmailRequest {
    #[serde(default)]
    pub email: Option<String>,
}

/// Manual resync result
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SyncResponse {
    pub success: bool,
    pub message: String,
    pub whop_subscription_found: bool,
    pub metadata_updated: bool,
    pub user_plans_updated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
    pub user: AccountSummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verification: Option<Verification>,
    pub note: String,
}

#[derive(Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct UpgradeUserRequest {
    #[serde(default)]
    pub email: Option<String>,
    /// `pro` or `pro_lifetime` (default)
    #[serde(default, rename = "planType")]
    pub plan_type: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UpgradeUserResponse {
    pub success: bool,
    pub message: String,
    pub metadata_updated: bool,
    pub user_plans_updated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
    pub user: AccountSummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verification: Option<Verification>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CheckedUser {
    pub id: UserId,
    pub email: Option<String>,
    pub created_at: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct MetadataView {
    pub plan: Option<String>,
    pub plan_type: Option<String>,
    pub subscription_status: Option<String>,
    #[schema(value_type = Object)]
    pub full_metadata: serde_json::Value,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct MirrorView {
    pub data: Option<UserPlanRow>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Every premium signal held for one account
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CheckUserResponse {
    pub user: CheckedUser,
    pub metadata: MetadataView,
    pub user_plans_table: MirrorView,
    #[serde(rename = "isPremium")]
    pub is_premium: bool,
}

#[derive(Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct ActivateCodeRequest {
    #[serde(default, rename = "userId")]
    pub user_id: Option<String>,
    #[serde(default)]
    pub code: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ActivateCodeResponse {
    pub success: bool,
    /// `pro_upgrade` or `reset_message_limit`
    pub action: String,
    pub message: String,
    pub user: AccountSummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_plans_updated: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
    pub note: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ChatRequestBody {
    pub messages: Vec<ChatMessage>,
    #[serde(default, rename = "userId")]
    pub user_id: Option<UserId>,
    #[serde(default)]
    pub agent: Agent,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ChatResponseBody {
    pub response: String,
}

/// Hosted checkout pages for the two premium plans
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CheckoutLinks {
    pub monthly_url: String,
    pub lifetime_url: String,
}
