//! In-memory implementations of the service ports, shared by unit tests and the api tests.

use async_trait::async_trait;
use chrono::Utc;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tokio::sync::RwLock;

use crate::account::{AccountError, AccountMetadata, AccountRecord, AccountStore};
use crate::chat::ports::{ChatMessage, LlmClient, LlmError};
use crate::entitlement::QuotaCounter;
use crate::payments::{Membership, PaymentsClient, PaymentsError};
use crate::plan::{PlanStoreError, UserPlanRepository, UserPlanRow, UserPlanWrite};
use crate::UserId;

/// Account with a fresh id and the given metadata object
pub fn account_with_metadata(email: &str, metadata: serde_json::Value) -> AccountRecord {
    let user_metadata = match metadata {
        serde_json::Value::Object(map) => AccountMetadata(map),
        _ => AccountMetadata::default(),
    };
    AccountRecord {
        id: UserId::new(),
        email: Some(email.to_string()),
        created_at: Some(Utc::now()),
        user_metadata,
    }
}

/// Hex HMAC-SHA256 signature as sent in `x-whop-signature`
pub fn sign_webhook(secret: &str, body: &[u8]) -> String {
    match Hmac::<Sha256>::new_from_slice(secret.as_bytes()) {
        Ok(mut mac) => {
            mac.update(body);
            hex::encode(mac.finalize().into_bytes())
        }
        Err(_) => String::new(),
    }
}

/// Mock account store backed by a map
#[derive(Default)]
pub struct MockAccountStore {
    accounts: RwLock<HashMap<UserId, AccountRecord>>,
    fail_updates: RwLock<bool>,
    updates: AtomicUsize,
}

impl MockAccountStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, account: AccountRecord) {
        self.accounts.write().await.insert(account.id, account);
    }

    pub async fn get(&self, user_id: UserId) -> Option<AccountRecord> {
        self.accounts.read().await.get(&user_id).cloned()
    }

    /// Make every metadata update fail with a provider error
    pub async fn set_fail_updates(&self, fail: bool) {
        *self.fail_updates.write().await = fail;
    }

    /// Number of successful metadata updates
    pub async fn update_count(&self) -> usize {
        self.updates.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AccountStore for MockAccountStore {
    async fn get_by_id(&self, user_id: UserId) -> Result<Option<AccountRecord>, AccountError> {
        Ok(self.get(user_id).await)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<AccountRecord>, AccountError> {
        Ok(self
            .accounts
            .read()
            .await
            .values()
            .find(|account| account.email_matches(email))
            .cloned())
    }

    async fn update_metadata(
        &self,
        user_id: UserId,
        metadata: &AccountMetadata,
    ) -> Result<AccountRecord, AccountError> {
        if *self.fail_updates.read().await {
            return Err(AccountError::Provider("status 500".to_string()));
        }

        let mut accounts = self.accounts.write().await;
        let account = accounts.get_mut(&user_id).ok_or(AccountError::NotFound)?;
        account.user_metadata = metadata.clone();
        self.updates.fetch_add(1, Ordering::SeqCst);
        Ok(account.clone())
    }
}

/// Mock `user_plans` table with switchable failure modes
#[derive(Default)]
pub struct MockUserPlanRepository {
    rows: RwLock<HashMap<UserId, UserPlanRow>>,
    table_missing: bool,
    fail_upserts: RwLock<bool>,
    fail_reads: RwLock<bool>,
    phantom_insert_failures: RwLock<bool>,
    calls: RwLock<Vec<&'static str>>,
}

impl MockUserPlanRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every operation reports the table as missing
    pub fn missing_table() -> Self {
        Self {
            table_missing: true,
            ..Self::default()
        }
    }

    pub async fn set_fail_upserts(&self, fail: bool) {
        *self.fail_upserts.write().await = fail;
    }

    /// Reads fail with a generic database error, as on a dropped connection
    pub async fn set_fail_reads(&self, fail: bool) {
        *self.fail_reads.write().await = fail;
    }

    /// Inserts store the row but still report an error
    pub async fn set_phantom_insert_failures(&self, enabled: bool) {
        *self.phantom_insert_failures.write().await = enabled;
    }

    pub async fn row(&self, user_id: UserId) -> Option<UserPlanRow> {
        self.rows.read().await.get(&user_id).cloned()
    }

    pub async fn row_count(&self) -> usize {
        self.rows.read().await.len()
    }

    /// Write operations in the order they were attempted
    pub async fn calls(&self) -> Vec<&'static str> {
        self.calls.read().await.clone()
    }

    async fn record_call(&self, call: &'static str) -> Result<(), PlanStoreError> {
        self.calls.write().await.push(call);
        if self.table_missing {
            return Err(PlanStoreError::TableMissing);
        }
        Ok(())
    }

    fn to_row(plan: &UserPlanWrite) -> UserPlanRow {
        UserPlanRow {
            user_id: plan.user_id,
            plan_type: plan.plan_type.as_str().to_string(),
            subscription_status: plan.subscription_status.as_str().to_string(),
            subscription_id: plan.subscription_id.clone(),
            whop_plan_id: plan.whop_plan_id.clone(),
            updated_at: Utc::now(),
        }
    }
}

#[async_trait]
impl UserPlanRepository for MockUserPlanRepository {
    async fn get_plan(&self, user_id: UserId) -> Result<Option<UserPlanRow>, PlanStoreError> {
        if self.table_missing {
            return Err(PlanStoreError::TableMissing);
        }
        if *self.fail_reads.read().await {
            return Err(PlanStoreError::Database(
                "connection closed while reading user_plans".to_string(),
            ));
        }
        Ok(self.row(user_id).await)
    }

    async fn upsert_plan(&self, plan: &UserPlanWrite) -> Result<(), PlanStoreError> {
        self.record_call("upsert").await?;
        if *self.fail_upserts.read().await {
            return Err(PlanStoreError::Database(
                "there is no unique or exclusion constraint matching the ON CONFLICT specification"
                    .to_string(),
            ));
        }
        self.rows
            .write()
            .await
            .insert(plan.user_id, Self::to_row(plan));
        Ok(())
    }

    async fn delete_plan(&self, user_id: UserId) -> Result<(), PlanStoreError> {
        self.record_call("delete").await?;
        self.rows.write().await.remove(&user_id);
        Ok(())
    }

    async fn insert_plan(&self, plan: &UserPlanWrite) -> Result<(), PlanStoreError> {
        self.record_call("insert").await?;
        let mut rows = self.rows.write().await;
        if rows.contains_key(&plan.user_id) {
            return Err(PlanStoreError::Database(
                "duplicate key value violates unique constraint".to_string(),
            ));
        }
        rows.insert(plan.user_id, Self::to_row(plan));
        if *self.phantom_insert_failures.read().await {
            return Err(PlanStoreError::Database("connection reset".to_string()));
        }
        Ok(())
    }
}

/// Mock message ledger holding today's count per user
#[derive(Default)]
pub struct MockQuotaCounter {
    counts: RwLock<HashMap<UserId, u32>>,
    failing: bool,
}

impl MockQuotaCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every operation fails, as when the ledger table is unreachable
    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Self::default()
        }
    }

    pub async fn set_count(&self, user_id: UserId, count: u32) {
        self.counts.write().await.insert(user_id, count);
    }

    pub async fn count(&self, user_id: UserId) -> u32 {
        self.counts
            .read()
            .await
            .get(&user_id)
            .copied()
            .unwrap_or_default()
    }

    fn check(&self) -> anyhow::Result<()> {
        if self.failing {
            anyhow::bail!("relation \"user_messages\" does not exist");
        }
        Ok(())
    }
}

#[async_trait]
impl QuotaCounter for MockQuotaCounter {
    async fn count_today(&self, user_id: UserId) -> anyhow::Result<u32> {
        self.check()?;
        Ok(self.count(user_id).await)
    }

    async fn record_message(&self, user_id: UserId) -> anyhow::Result<()> {
        self.check()?;
        *self.counts.write().await.entry(user_id).or_default() += 1;
        Ok(())
    }

    async fn reset_today(&self, user_id: UserId) -> anyhow::Result<u64> {
        self.check()?;
        let removed = self.counts.write().await.remove(&user_id).unwrap_or_default();
        Ok(u64::from(removed))
    }
}

/// Mock payment platform keyed by lowercase email
pub struct MockPaymentsClient {
    configured: bool,
    failing: AtomicBool,
    memberships: RwLock<HashMap<String, Membership>>,
}

impl Default for MockPaymentsClient {
    fn default() -> Self {
        Self::new()
    }
}

impl MockPaymentsClient {
    pub fn new() -> Self {
        Self {
            configured: true,
            failing: AtomicBool::new(false),
            memberships: RwLock::new(HashMap::new()),
        }
    }

    pub fn not_configured() -> Self {
        Self {
            configured: false,
            ..Self::new()
        }
    }

    pub async fn add_membership(&self, email: &str, membership: Membership) {
        self.memberships
            .write()
            .await
            .insert(email.trim().to_lowercase(), membership);
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

#[async_trait]
impl PaymentsClient for MockPaymentsClient {
    fn is_configured(&self) -> bool {
        self.configured
    }

    async fn find_membership_by_email(
        &self,
        email: &str,
    ) -> Result<Option<Membership>, PaymentsError> {
        if !self.configured {
            return Err(PaymentsError::NotConfigured);
        }
        if self.failing.load(Ordering::SeqCst) {
            return Err(PaymentsError::Upstream {
                status: 502,
                body: "bad gateway".to_string(),
            });
        }
        Ok(self
            .memberships
            .read()
            .await
            .get(&email.trim().to_lowercase())
            .filter(|m| m.is_live())
            .cloned())
    }
}

/// Mock LLM backend with a canned reply or a canned failure status
pub struct MockLlmClient {
    configured: bool,
    reply: Result<String, u16>,
    calls: AtomicUsize,
    last_messages: RwLock<Vec<ChatMessage>>,
}

impl MockLlmClient {
    fn build(configured: bool, reply: Result<String, u16>) -> Self {
        Self {
            configured,
            reply,
            calls: AtomicUsize::new(0),
            last_messages: RwLock::new(Vec::new()),
        }
    }

    pub fn replying(text: impl Into<String>) -> Self {
        Self::build(true, Ok(text.into()))
    }

    pub fn not_configured() -> Self {
        Self::build(false, Ok(String::new()))
    }

    /// Fail every completion as the provider would with this HTTP status
    pub fn failing_with(status: u16) -> Self {
        Self::build(true, Err(status))
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Conversation passed to the most recent completion
    pub async fn last_messages(&self) -> Vec<ChatMessage> {
        self.last_messages.read().await.clone()
    }
}

#[async_trait]
impl LlmClient for MockLlmClient {
    fn is_configured(&self) -> bool {
        self.configured
    }

    async fn complete(&self, messages: &[ChatMessage]) -> Result<String, LlmError> {
        if !self.configured {
            return Err(LlmError::NotConfigured);
        }
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_messages.write().await = messages.to_vec();
        match &self.reply {
            Ok(text) => Ok(text.clone()),
            Err(status) => Err(LlmError::from_status(*status, "mock failure".to_string())),
        }
    }
}
