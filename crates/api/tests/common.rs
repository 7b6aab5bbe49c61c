#![allow(dead_code)]

use api::{create_router, AppState, CheckoutLinks};
use axum_test::TestServer;
use services::account::AccountRecord;
use services::admin::{AdminServiceConfig, AdminServiceImpl};
use services::chat::{ChatServiceImpl, LlmClient};
use services::entitlement::{EntitlementServiceImpl, LocalQuotaCounter};
use services::payments::{PaymentSyncServiceConfig, PaymentSyncServiceImpl, PaymentsClient};
use services::reconciliation::ReconciliationServiceImpl;
use services::test_helpers::{
    account_with_metadata, MockAccountStore, MockLlmClient, MockPaymentsClient, MockQuotaCounter,
    MockUserPlanRepository,
};
use std::sync::Arc;

pub const WEBHOOK_SECRET: &str = "whsec_test_secret";
pub const LIFETIME_PLAN_ID: &str = "plan_nAv9o4mMRgV37";
pub const PRO_UPGRADE_CODE: &str = "IzEgQWkgRHVuZXdvcmtzIDY3";
pub const RESET_MESSAGE_LIMIT_CODE: &str = "RHVuZXdvcmtzIElzICMxIERldiBTZXJ2ZXI=";

/// Configuration for the in-memory test server
pub struct TestServerConfig {
    pub admin_api_token: Option<String>,
    pub webhook_secret: String,
    pub llm: Arc<dyn LlmClient>,
    pub plans: MockUserPlanRepository,
    pub ledger: MockQuotaCounter,
    pub payments: MockPaymentsClient,
    /// Replaces the mock payments client, e.g. with a `WhopClient` against wiremock
    pub payments_client: Option<Arc<dyn PaymentsClient>>,
}

impl Default for TestServerConfig {
    fn default() -> Self {
        Self {
            admin_api_token: None,
            webhook_secret: WEBHOOK_SECRET.to_string(),
            llm: Arc::new(MockLlmClient::not_configured()),
            plans: MockUserPlanRepository::new(),
            ledger: MockQuotaCounter::new(),
            payments: MockPaymentsClient::new(),
            payments_client: None,
        }
    }
}

/// Test server plus handles on the in-memory stores behind it
pub struct TestContext {
    pub server: TestServer,
    pub accounts: Arc<MockAccountStore>,
    pub plans: Arc<MockUserPlanRepository>,
    pub ledger: Arc<MockQuotaCounter>,
    pub payments: Arc<MockPaymentsClient>,
}

impl TestContext {
    /// Register an account with the given email and metadata
    pub async fn add_account(&self, email: &str, metadata: serde_json::Value) -> AccountRecord {
        let account = account_with_metadata(email, metadata);
        self.accounts.insert(account.clone()).await;
        account
    }
}

pub fn test_cors_config() -> config::CorsConfig {
    config::CorsConfig {
        exact_matches: vec!["https://duna.ai".to_string()],
        wildcard_suffixes: vec![".duna.ai".to_string()],
    }
}

/// Create a test server with default mocks
pub fn create_test_context() -> TestContext {
    create_test_context_with_config(TestServerConfig::default())
}

/// Create a test server wired exactly like `main`, with mocks in place of external systems
pub fn create_test_context_with_config(test_config: TestServerConfig) -> TestContext {
    let accounts = Arc::new(MockAccountStore::new());
    let plans = Arc::new(test_config.plans);
    let ledger = Arc::new(test_config.ledger);
    let payments = Arc::new(test_config.payments);
    let payments_client: Arc<dyn PaymentsClient> = test_config
        .payments_client
        .unwrap_or_else(|| payments.clone());

    let reconciliation = Arc::new(ReconciliationServiceImpl::new(
        accounts.clone(),
        plans.clone(),
    ));

    let entitlement_service = Arc::new(EntitlementServiceImpl::new(
        plans.clone(),
        ledger.clone(),
        Arc::new(LocalQuotaCounter::new()),
    ));

    let payment_sync_service = Arc::new(PaymentSyncServiceImpl::new(PaymentSyncServiceConfig {
        account_store: accounts.clone(),
        reconciliation: reconciliation.clone(),
        payments_client,
        webhook_secret: test_config.webhook_secret,
        lifetime_plan_id: LIFETIME_PLAN_ID.to_string(),
    }));

    let admin_service = Arc::new(AdminServiceImpl::new(AdminServiceConfig {
        account_store: accounts.clone(),
        reconciliation,
        entitlement: entitlement_service.clone(),
        pro_upgrade_code: PRO_UPGRADE_CODE.to_string(),
        reset_message_limit_code: RESET_MESSAGE_LIMIT_CODE.to_string(),
    }));

    let chat_service = Arc::new(ChatServiceImpl::new(
        test_config.llm,
        entitlement_service.clone(),
    ));

    let app_state = AppState {
        account_store: accounts.clone(),
        entitlement_service,
        payment_sync_service,
        admin_service,
        chat_service,
        checkout_links: CheckoutLinks {
            monthly_url: "https://whop.com/checkout/plan_vhBLiFWs6AJNx?d2c=true".to_string(),
            lifetime_url: "https://whop.com/checkout/plan_nAv9o4mMRgV37?d2c=true".to_string(),
        },
        admin_api_token: test_config.admin_api_token.map(Arc::new),
    };

    let app = create_router(app_state, test_cors_config());
    let server = TestServer::new(app).expect("Failed to create test server");

    TestContext {
        server,
        accounts,
        plans,
        ledger,
        payments,
    }
}
